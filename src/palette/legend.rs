use crate::palette::PaletteResult;

/// Power-law axis that compresses the long right tail of log-counts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LegendAxis {
    pub exponent: f64,
    pub domain: (f64, f64),
    pub range: (f64, f64),
}

#[inline(always)]
fn signed_pow(x: f64, exponent: f64) -> f64 {
    if x < 0.0 {
        -(-x).powf(exponent)
    } else {
        x.powf(exponent)
    }
}

impl LegendAxis {
    pub fn new(exponent: f64, domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { exponent, domain, range }
    }

    /// Axis over a palette's extent, `width` pixels long
    pub fn for_palette(palette: &PaletteResult, exponent: f64, width: f64) -> Self {
        Self::new(exponent, palette.extent, (0.0, width))
    }

    /// Position of `value` along the axis
    pub fn apply(&self, value: f64) -> f64 {
        let d0 = signed_pow(self.domain.0, self.exponent);
        let d1 = signed_pow(self.domain.1, self.exponent);
        let span = d1 - d0;
        let t = if span == 0.0 || !span.is_finite() {
            0.5
        } else {
            (signed_pow(value, self.exponent) - d0) / span
        };
        self.range.0 + t * (self.range.1 - self.range.0)
    }

    /// Tick positions and values at each palette threshold
    pub fn ticks(&self, palette: &PaletteResult) -> Vec<(f64, f64)> {
        palette
            .scale
            .domain()
            .iter()
            .map(|&v| (self.apply(v), v))
            .collect()
    }
}

/// Listing count behind a log10 value, as shown on legend ticks
pub fn tick_label(log_value: f64) -> String {
    format!("{}", 10f64.powf(log_value).round())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::palette::generate;
    use approx::assert_relative_eq;

    #[test]
    fn test_axis_endpoints() {
        let axis = LegendAxis::new(1.2, (0.5, 3.0), (0.0, 350.0));
        assert_relative_eq!(axis.apply(0.5), 0.0, epsilon = 1e-9);
        assert_relative_eq!(axis.apply(3.0), 350.0, epsilon = 1e-9);
        let mid = axis.apply(1.75);
        // Exponent > 1 pushes the midpoint left of the linear midpoint
        assert!(mid < 175.0 && mid > 0.0);
    }

    #[test]
    fn test_flat_domain_maps_to_middle() {
        let axis = LegendAxis::new(1.2, (2.0, 2.0), (0.0, 350.0));
        assert_eq!(axis.apply(2.0), 175.0);
    }

    #[test]
    fn test_ticks_follow_thresholds() {
        let palette = generate([0.0, 1.0, 2.0, 3.0], 0.15).unwrap();
        let axis = LegendAxis::for_palette(&palette, 1.2, 350.0);
        let ticks = axis.ticks(&palette);
        assert_eq!(ticks.len(), palette.scale.domain().len());
        assert!(ticks.windows(2).all(|w| w[0].0 <= w[1].0));
        assert_relative_eq!(ticks.last().unwrap().0, 350.0, epsilon = 1e-9);
    }

    #[test]
    fn test_tick_label() {
        assert_eq!(tick_label(2.0), "100");
        assert_eq!(tick_label(0.0), "1");
        assert_eq!(tick_label(1.5), "32");
    }
}
