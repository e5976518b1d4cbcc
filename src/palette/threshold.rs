use crate::palette::color::Rgb;

/// Step function from a sorted numeric domain to `domain.len() + 1` colours.
///
/// A value below `domain[0]` gets `range[0]`, a value in
/// `[domain[i], domain[i + 1])` gets `range[i + 1]`, anything at or above the
/// last threshold gets the last colour.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdScale {
    domain: Vec<f64>,
    range: Vec<Rgb>,
}

impl ThresholdScale {
    pub(crate) fn new(domain: Vec<f64>, range: Vec<Rgb>) -> Self {
        debug_assert_eq!(domain.len() + 1, range.len());
        Self { domain, range }
    }

    /// Thresholds, ascending
    pub fn domain(&self) -> &[f64] {
        &self.domain
    }

    /// Colours, one more than there are thresholds
    pub fn range(&self) -> &[Rgb] {
        &self.range
    }

    /// Index of the bucket `value` falls into
    pub fn bucket(&self, value: f64) -> usize {
        self.domain.partition_point(|&t| t <= value)
    }

    pub fn color(&self, value: f64) -> Rgb {
        self.range[self.bucket(value)]
    }

    /// `[low, high)` interval of a bucket; `None` marks an unbounded end
    pub fn bucket_extent(&self, bucket: usize) -> Option<(Option<f64>, Option<f64>)> {
        if bucket >= self.range.len() {
            return None;
        }
        let low = bucket.checked_sub(1).map(|i| self.domain[i]);
        let high = self.domain.get(bucket).copied();
        Some((low, high))
    }

    /// Interval of values that map to `color`, `None` if the colour is not in the range
    pub fn invert_extent(&self, color: Rgb) -> Option<(Option<f64>, Option<f64>)> {
        let bucket = self.range.iter().position(|&c| c == color)?;
        self.bucket_extent(bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale() -> ThresholdScale {
        ThresholdScale::new(
            vec![1.0, 2.0, 3.0],
            vec![
                Rgb::new(0, 0, 0),
                Rgb::new(1, 1, 1),
                Rgb::new(2, 2, 2),
                Rgb::new(3, 3, 3),
            ],
        )
    }

    #[test]
    fn test_buckets_are_right_closed() {
        let s = scale();
        assert_eq!(s.bucket(0.5), 0);
        assert_eq!(s.bucket(1.0), 1);
        assert_eq!(s.bucket(1.5), 1);
        assert_eq!(s.bucket(2.0), 2);
        assert_eq!(s.bucket(3.0), 3);
        assert_eq!(s.bucket(100.0), 3);
        assert_eq!(s.color(2.5), Rgb::new(2, 2, 2));
    }

    #[test]
    fn test_invert_extent_open_ends() {
        let s = scale();
        assert_eq!(s.invert_extent(Rgb::new(0, 0, 0)), Some((None, Some(1.0))));
        assert_eq!(s.invert_extent(Rgb::new(2, 2, 2)), Some((Some(2.0), Some(3.0))));
        assert_eq!(s.invert_extent(Rgb::new(3, 3, 3)), Some((Some(3.0), None)));
        assert_eq!(s.invert_extent(Rgb::new(9, 9, 9)), None);
        assert_eq!(s.bucket_extent(4), None);
    }
}
