use std::sync::Arc;

use glam::DVec2;
use tracing::{info, warn};

use crate::data::{dataset_bounds, Feature};
use crate::error::{ChoroplethError, Result};
use crate::geo::EARTH_RADIUS_KM;
use crate::map::{BoundingBox, Canvas, DistanceScale, Projection};
use crate::palette::{self, PaletteResult, Rgb, DEFAULT_STEP};

/// Everything one pipeline run needs; passed in explicitly, never global
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChoroplethConfig {
    pub region: BoundingBox,
    pub canvas: Canvas,
    /// Distance the scale bar represents
    pub reference_distance_km: f64,
    pub sphere_radius_km: f64,
    /// Spacing of the quantile breakpoints
    pub breakpoint_step: f64,
}

impl Default for ChoroplethConfig {
    fn default() -> Self {
        Self {
            region: BoundingBox::rio(),
            canvas: Canvas::new(800.0, 450.0),
            reference_distance_km: 5.0,
            sphere_radius_km: EARTH_RADIUS_KM,
            breakpoint_step: DEFAULT_STEP,
        }
    }
}

/// A feature with the fill the palette assigned to it
#[derive(Debug, Clone, PartialEq)]
pub struct StyledFeature {
    /// Position in the scene's feature list
    pub index: usize,
    pub feature: Feature,
    pub fill: Rgb,
    /// Palette bucket, `None` for the fallback fill
    pub bucket: Option<usize>,
}

/// Finished visual parameters for one dataset and canvas
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub projection: Projection,
    pub palette: PaletteResult,
    pub features: Vec<StyledFeature>,
    pub scale: DistanceScale,
    pub reference_distance_km: f64,
    /// Sum of `n` over features that have it
    pub total_listings: f64,
    pub canvas: Canvas,
}

/// Presentation side of the pipeline.
///
/// The UI layer that owns input events calls the hover callbacks; the
/// pipeline itself only ever calls `draw`.
pub trait Renderer {
    /// Take a finished scene. Earlier scenes may still be held elsewhere.
    fn draw(&mut self, scene: Arc<Scene>);

    /// Pointer moved over `feature`, in canvas pixels
    fn on_feature_hover(&mut self, feature: &StyledFeature, pointer: DVec2);

    /// Pointer left every feature
    fn on_feature_leave(&mut self);
}

/// Orchestrates projection, palette and distance scale for a dataset
#[derive(Debug, Clone)]
pub struct Choropleth {
    config: ChoroplethConfig,
}

impl Choropleth {
    pub fn new(config: ChoroplethConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ChoroplethConfig {
        &self.config
    }

    /// Run the pipeline. Builds fresh results on every call.
    pub fn build(&self, mut features: Vec<Feature>) -> Result<Arc<Scene>> {
        let cfg = &self.config;

        for feature in &mut features {
            feature.derive_entire_share();
        }

        let projection = Projection::fit(&cfg.region, cfg.canvas)?;

        let palette = palette::generate(
            features.iter().filter_map(|f| f.stats.log_n),
            cfg.breakpoint_step,
        )?;

        let bounds = dataset_bounds(&features).ok_or_else(|| {
            ChoroplethError::DegenerateExtent("dataset has no coordinates".to_string())
        })?;
        let scale = DistanceScale::compute(
            &projection,
            &bounds,
            cfg.reference_distance_km,
            cfg.sphere_radius_km,
        )?;

        let missing = features.iter().filter(|f| f.stats.log_n.is_none()).count();
        if missing > 0 {
            warn!(missing, "features without log_n get the fallback fill");
        }

        let total_listings = features.iter().filter_map(|f| f.stats.n).sum();

        let features: Vec<StyledFeature> = features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| StyledFeature {
                index,
                fill: palette.color_for(feature.stats.log_n),
                bucket: palette.bucket_for(feature.stats.log_n),
                feature,
            })
            .collect();

        info!(
            features = features.len(),
            extent_min = palette.extent.0,
            extent_max = palette.extent.1,
            scale_px = scale.length_px,
            "built choropleth scene"
        );

        Ok(Arc::new(Scene {
            projection,
            palette,
            features,
            scale,
            reference_distance_km: cfg.reference_distance_km,
            total_listings,
            canvas: cfg.canvas,
        }))
    }

    /// Build a scene and hand it to `renderer`
    pub fn run<R: Renderer + ?Sized>(&self, features: Vec<Feature>, renderer: &mut R) -> Result<Arc<Scene>> {
        let scene = self.build(features)?;
        renderer.draw(Arc::clone(&scene));
        Ok(scene)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::ListingStats;
    use crate::geo::GeoPoint;
    use crate::palette::FALLBACK_GRAY;

    fn square(lon: f64, lat: f64, size: f64) -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(lon, lat),
            GeoPoint::new(lon + size, lat),
            GeoPoint::new(lon + size, lat + size),
            GeoPoint::new(lon, lat + size),
            GeoPoint::new(lon, lat),
        ]
    }

    fn feature(lon: f64, log_n: Option<f64>, n: f64, entire: f64) -> Feature {
        Feature::new(
            None,
            vec![square(lon, -23.0, 0.1)],
            ListingStats {
                n: Some(n),
                entire: Some(entire),
                log_n,
                ..Default::default()
            },
        )
    }

    #[derive(Default)]
    struct Recorder {
        drawn: Vec<Arc<Scene>>,
        hovered: Option<usize>,
    }

    impl Renderer for Recorder {
        fn draw(&mut self, scene: Arc<Scene>) {
            self.drawn.push(scene);
        }

        fn on_feature_hover(&mut self, feature: &StyledFeature, _pointer: DVec2) {
            self.hovered = Some(feature.index);
        }

        fn on_feature_leave(&mut self) {
            self.hovered = None;
        }
    }

    #[test]
    fn test_rio_scenario() {
        let choropleth = Choropleth::new(ChoroplethConfig::default());
        let scene = choropleth
            .build(vec![
                feature(-43.6, Some(1.0), 20.0, 5.0),
                feature(-43.3, Some(3.0), 50.0, 40.0),
            ])
            .unwrap();

        assert_eq!(scene.features[0].feature.stats.entp, Some(0.25));
        assert_eq!(scene.features[1].feature.stats.entp, Some(0.8));
        assert_eq!(scene.palette.extent, (1.0, 3.0));
        assert_ne!(scene.features[0].fill, scene.features[1].fill);
        assert_ne!(scene.features[0].fill, FALLBACK_GRAY);
        assert_ne!(scene.features[1].fill, FALLBACK_GRAY);
        assert_eq!(scene.total_listings, 70.0);
    }

    #[test]
    fn test_missing_log_n_is_gray() {
        let choropleth = Choropleth::new(ChoroplethConfig::default());
        let scene = choropleth
            .build(vec![
                feature(-43.6, Some(1.0), 20.0, 5.0),
                feature(-43.5, None, 10.0, 1.0),
                feature(-43.3, Some(3.0), 50.0, 40.0),
            ])
            .unwrap();

        assert_eq!(scene.features[1].fill, FALLBACK_GRAY);
        assert_eq!(scene.features[1].bucket, None);
        assert_eq!(scene.palette.extent, (1.0, 3.0));
    }

    #[test]
    fn test_fatal_errors_surface() {
        let choropleth = Choropleth::new(ChoroplethConfig::default());
        assert_eq!(
            choropleth.build(vec![feature(-43.6, None, 1.0, 1.0)]),
            Err(ChoroplethError::EmptySample)
        );

        let point = Feature::new(
            None,
            vec![vec![GeoPoint::new(-43.2, -22.9); 4]],
            ListingStats {
                log_n: Some(1.0),
                ..Default::default()
            },
        );
        assert!(matches!(
            choropleth.build(vec![point]),
            Err(ChoroplethError::DegenerateExtent(_))
        ));

        let bad = Choropleth::new(ChoroplethConfig {
            canvas: Canvas::new(0.0, 10.0),
            ..Default::default()
        });
        assert!(matches!(
            bad.build(vec![feature(-43.6, Some(1.0), 1.0, 1.0)]),
            Err(ChoroplethError::InvalidRegion(_))
        ));
    }

    #[test]
    fn test_run_hands_scene_to_renderer() {
        let choropleth = Choropleth::new(ChoroplethConfig::default());
        let features = vec![
            feature(-43.6, Some(1.0), 20.0, 5.0),
            feature(-43.3, Some(3.0), 50.0, 40.0),
        ];
        let mut recorder = Recorder::default();

        let first = choropleth.run(features.clone(), &mut recorder).unwrap();
        let second = choropleth.run(features, &mut recorder).unwrap();

        // Each run produces a new scene; the old one stays valid
        assert_eq!(recorder.drawn.len(), 2);
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);

        recorder.on_feature_hover(&second.features[1], DVec2::new(10.0, 10.0));
        assert_eq!(recorder.hovered, Some(1));
        recorder.on_feature_leave();
        assert_eq!(recorder.hovered, None);
    }
}
