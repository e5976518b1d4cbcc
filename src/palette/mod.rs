mod color;
mod legend;
mod threshold;

pub use color::{interpolate_blues, Rgb, FALLBACK_GRAY};
pub use legend::{tick_label, LegendAxis};
pub use threshold::ThresholdScale;

use tracing::debug;

use crate::error::{ChoroplethError, Result};

/// Default spacing between quantile breakpoints
pub const DEFAULT_STEP: f64 = 0.15;

/// Finest breakpoint spacing accepted, at most 101 breakpoints
pub const MIN_STEP: f64 = 0.01;

/// Breakpoints 0, step, 2*step, ... below 1.0, followed by 1.0 itself.
///
/// The last bucket is narrower whenever 1.0 is not a multiple of `step`.
/// Steps outside `[MIN_STEP, 1]` collapse to a single bucket.
pub fn breakpoints(step: f64) -> Vec<f64> {
    if !(step >= MIN_STEP && step <= 1.0) {
        return vec![0.0, 1.0];
    }
    let count = (1.0 / step).ceil() as usize;
    let mut points: Vec<f64> = (0..count).map(|i| i as f64 * step).filter(|&q| q < 1.0).collect();
    points.push(1.0);
    points
}

/// Linearly interpolated quantile of an ascending sample, `None` if empty
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || p.is_nan() {
        return None;
    }
    if p <= 0.0 || n < 2 {
        return Some(sorted[0]);
    }
    if p >= 1.0 {
        return Some(sorted[n - 1]);
    }
    let i = (n - 1) as f64 * p;
    let i0 = i.floor() as usize;
    let v0 = sorted[i0];
    let v1 = sorted[i0 + 1];
    Some(v0 + (v1 - v0) * (i - i0 as f64))
}

/// One legend entry: a colour and the value interval it covers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendBucket {
    pub low: f64,
    pub high: f64,
    pub color: Rgb,
}

/// Colour mapping for one dataset load
#[derive(Debug, Clone, PartialEq)]
pub struct PaletteResult {
    pub scale: ThresholdScale,
    /// (min, max) of the finite sample
    pub extent: (f64, f64),
    /// Quantile value at every breakpoint, including the first
    pub quantiles: Vec<f64>,
}

impl PaletteResult {
    /// Fill for a possibly missing log-count
    pub fn color_for(&self, value: Option<f64>) -> Rgb {
        match value.filter(|v| v.is_finite()) {
            Some(v) => self.scale.color(v),
            None => FALLBACK_GRAY,
        }
    }

    /// Bucket for a possibly missing log-count
    pub fn bucket_for(&self, value: Option<f64>) -> Option<usize> {
        value.filter(|v| v.is_finite()).map(|v| self.scale.bucket(v))
    }

    /// Buckets with their open ends closed by the sample extent
    pub fn legend_buckets(&self) -> Vec<LegendBucket> {
        self.scale
            .range()
            .iter()
            .enumerate()
            .filter_map(|(i, &color)| {
                let (low, high) = self.scale.bucket_extent(i)?;
                Some(LegendBucket {
                    low: low.unwrap_or(self.extent.0),
                    high: high.unwrap_or(self.extent.1),
                    color,
                })
            })
            .collect()
    }
}

/// Build the threshold palette from raw log-count values.
///
/// Non-finite values are dropped first; an empty remainder is an error.
pub fn generate(values: impl IntoIterator<Item = f64>, step: f64) -> Result<PaletteResult> {
    let mut sample: Vec<f64> = values.into_iter().filter(|v| v.is_finite()).collect();
    if sample.is_empty() {
        return Err(ChoroplethError::EmptySample);
    }
    sample.sort_by(f64::total_cmp);

    let extent = (sample[0], sample[sample.len() - 1]);
    let points = breakpoints(step);
    let quantiles: Vec<f64> = points
        .iter()
        .filter_map(|&q| quantile_sorted(&sample, q))
        .collect();

    let last = (quantiles.len() - 1).max(1) as f64;
    let colors: Vec<Rgb> = (0..quantiles.len())
        .map(|i| interpolate_blues(i as f64 / last))
        .collect();

    debug!(?points, ?quantiles, ?extent, "generated quantile palette");

    let scale = ThresholdScale::new(quantiles[1..].to_vec(), colors);
    Ok(PaletteResult { scale, extent, quantiles })
}
