pub mod geometry;
mod layer;
mod projection;
mod scale;
pub mod spatial;

pub use layer::{ProjectedFeature, ProjectedLayer};
pub use projection::{BoundingBox, Canvas, Projection};
pub use scale::DistanceScale;
