use crate::error::{ChoroplethError, Result};
use crate::geo::{angular_distance, to_linear_distance, GeoBounds};
use crate::map::projection::Projection;

/// On-screen length of a fixed real-world distance under one projection
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceScale {
    /// Bar length in pixels
    pub length_px: f64,
    /// Real-world distance the bar represents
    pub reference_km: f64,
    pub pixels_per_km: f64,
    /// Great-circle length of the dataset diagonal the factor was derived from
    pub ground_arc_km: f64,
}

impl DistanceScale {
    /// Derive the pixel length of `reference_km` from the dataset diagonal.
    ///
    /// The ratio between the projected diagonal and its great-circle length is
    /// only exact locally for a conformal projection.
    pub fn compute(
        projection: &Projection,
        bounds: &GeoBounds,
        reference_km: f64,
        sphere_radius_km: f64,
    ) -> Result<Self> {
        let (sw, ne) = (bounds.south_west(), bounds.north_east());

        let ground_arc_km = to_linear_distance(angular_distance(sw, ne), sphere_radius_km);
        if ground_arc_km == 0.0 || !ground_arc_km.is_finite() {
            return Err(ChoroplethError::DegenerateExtent(format!(
                "dataset bounds {:?} have no ground extent",
                bounds
            )));
        }

        let projected_hyp = projection.project(sw).distance(projection.project(ne));
        let pixels_per_km = projected_hyp / ground_arc_km;
        if !pixels_per_km.is_finite() {
            return Err(ChoroplethError::DegenerateExtent(format!(
                "projected diagonal of {:?} is not finite",
                bounds
            )));
        }

        Ok(Self {
            length_px: pixels_per_km * reference_km,
            reference_km,
            pixels_per_km,
            ground_arc_km,
        })
    }
}
