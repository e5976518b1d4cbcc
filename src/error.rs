use thiserror::Error;

/// Result type alias using ChoroplethError.
pub type Result<T> = std::result::Result<T, ChoroplethError>;

/// Fatal failures of a single pipeline run.
///
/// Per-feature data defects never show up here; they resolve to fallback
/// values on the feature itself.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ChoroplethError {
    /// Malformed bounding box or canvas.
    #[error("Invalid region: {0}")]
    InvalidRegion(String),

    /// No finite log-count value across all features.
    #[error("No usable log-count values in the dataset")]
    EmptySample,

    /// The dataset bounds collapse to a point, so no scale bar can be derived.
    #[error("Degenerate dataset extent: {0}")]
    DegenerateExtent(String),
}
