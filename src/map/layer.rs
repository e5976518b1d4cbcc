use glam::DVec2;
use rayon::prelude::*;
use tracing::debug;

use crate::choropleth::Scene;
use crate::map::geometry::{rings_bbox, rings_contain};
use crate::map::spatial::FeatureGrid;

/// Grid cell size for hit testing, in pixels
const GRID_CELL_PX: f64 = 16.0;

/// A feature's rings in canvas pixels
pub struct ProjectedFeature {
    pub rings: Vec<Vec<DVec2>>,
    pub min: DVec2,
    pub max: DVec2,
}

/// Every feature of a scene projected once, with a grid for point lookups
pub struct ProjectedLayer {
    pub features: Vec<ProjectedFeature>,
    grid: FeatureGrid,
}

impl ProjectedLayer {
    /// Project all feature rings through the scene's projection.
    ///
    /// The projection is immutable, so features are projected in parallel.
    pub fn build(scene: &Scene) -> Self {
        let projection = &scene.projection;
        let features: Vec<ProjectedFeature> = scene
            .features
            .par_iter()
            .map(|styled| {
                let rings: Vec<Vec<DVec2>> = styled
                    .feature
                    .rings
                    .iter()
                    .map(|ring| ring.iter().map(|&p| projection.project(p)).collect())
                    .collect();
                let (min, max) = rings_bbox(&rings);
                ProjectedFeature { rings, min, max }
            })
            .collect();

        let extent = DVec2::new(scene.canvas.width, scene.canvas.height);
        let grid = FeatureGrid::build(features.iter().map(|f| (f.min, f.max)), GRID_CELL_PX, extent);
        debug!(features = features.len(), cells = grid.cell_count(), "built hit-test grid");
        Self { features, grid }
    }

    /// Index of the topmost feature containing pixel `p`
    pub fn feature_at(&self, p: DVec2) -> Option<usize> {
        self.grid
            .query_point(p)
            .iter()
            .rev()
            .copied()
            .find(|&idx| {
                let f = &self.features[idx];
                p.x >= f.min.x && p.x <= f.max.x && p.y >= f.min.y && p.y <= f.max.y && rings_contain(&f.rings, p)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::choropleth::{Choropleth, ChoroplethConfig};
    use crate::data::{Feature, ListingStats};
    use crate::geo::GeoPoint;

    fn square(lon: f64, lat: f64, size: f64) -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(lon, lat),
            GeoPoint::new(lon + size, lat),
            GeoPoint::new(lon + size, lat + size),
            GeoPoint::new(lon, lat + size),
            GeoPoint::new(lon, lat),
        ]
    }

    #[test]
    fn test_feature_at() {
        let features = vec![
            Feature::new(
                Some("west".into()),
                vec![square(-43.7, -23.0, 0.2)],
                ListingStats {
                    log_n: Some(1.0),
                    ..Default::default()
                },
            ),
            Feature::new(
                Some("east".into()),
                vec![square(-43.3, -23.0, 0.2)],
                ListingStats {
                    log_n: Some(2.0),
                    ..Default::default()
                },
            ),
        ];
        let scene = Choropleth::new(ChoroplethConfig::default()).build(features).unwrap();
        let layer = ProjectedLayer::build(&scene);

        let west = scene.projection.project(GeoPoint::new(-43.6, -22.9));
        let east = scene.projection.project(GeoPoint::new(-43.2, -22.9));
        let gap = scene.projection.project(GeoPoint::new(-43.4, -22.9));

        assert_eq!(layer.feature_at(west), Some(0));
        assert_eq!(layer.feature_at(east), Some(1));
        assert_eq!(layer.feature_at(gap), None);
    }

    #[test]
    fn test_far_feature_stays_bounded() {
        let features = vec![
            Feature::new(
                Some("rio".into()),
                vec![square(-43.7, -23.0, 0.2)],
                ListingStats {
                    log_n: Some(1.0),
                    ..Default::default()
                },
            ),
            Feature::new(
                Some("far".into()),
                vec![square(-40.0, -40.0, 20.0)],
                ListingStats {
                    log_n: Some(2.0),
                    ..Default::default()
                },
            ),
        ];
        let scene = Choropleth::new(ChoroplethConfig::default()).build(features).unwrap();
        let layer = ProjectedLayer::build(&scene);

        let cols = (scene.canvas.width / GRID_CELL_PX).floor() as usize + 1;
        let rows = (scene.canvas.height / GRID_CELL_PX).floor() as usize + 1;
        assert!(layer.grid.cell_count() <= cols * rows);

        let inside = scene.projection.project(GeoPoint::new(-43.6, -22.9));
        assert_eq!(layer.feature_at(inside), Some(0));
    }
}
