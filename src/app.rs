use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use glam::DVec2;
use ratatui::layout::Rect;
use tracing::{info, warn};

use listing_map::braille::BrailleCanvas;
use listing_map::config::AppConfig;
use listing_map::data::{self, Feature};
use listing_map::map::geometry::draw_ring;
use listing_map::map::{Canvas, ProjectedLayer};
use listing_map::palette::Rgb;
use listing_map::render::Tooltip;
use listing_map::{Choropleth, Renderer, Scene, StyledFeature};

use crate::ui;

/// Terminal view state. Also the [`Renderer`] that receives each new scene.
pub struct App {
    pub config: AppConfig,
    pub data_path: PathBuf,
    features: Vec<Feature>,
    pub scene: Option<Arc<Scene>>,
    layer: Option<ProjectedLayer>,
    /// Inner map area in terminal cells
    pub map_area: Rect,
    /// Fill per map cell, row-major; `None` where no feature covers the cell
    cell_fills: Vec<Option<Rgb>>,
    pub outlines: BrailleCanvas,
    pub highlight: BrailleCanvas,
    pub hovered: Option<usize>,
    pub tooltip: Option<Tooltip>,
    /// Current mouse position for cursor marker
    pub mouse_pos: Option<(u16, u16)>,
    /// Last pipeline or reload failure, shown in the status bar
    pub error: Option<String>,
    pub should_quit: bool,
}

impl App {
    pub fn new(config: AppConfig, data_path: PathBuf, features: Vec<Feature>, terminal: Rect) -> Self {
        let mut app = Self {
            config,
            data_path,
            features,
            scene: None,
            layer: None,
            map_area: Rect::default(),
            cell_fills: Vec::new(),
            outlines: BrailleCanvas::new(0, 0),
            highlight: BrailleCanvas::new(0, 0),
            hovered: None,
            tooltip: None,
            mouse_pos: None,
            error: None,
            should_quit: false,
        };
        app.resize(terminal);
        app
    }

    /// Recompute the map area for a new terminal size and rebuild the scene
    pub fn resize(&mut self, terminal: Rect) {
        self.map_area = ui::layout(terminal).map_inner;
        self.rebuild();
    }

    /// Run the pipeline for the current dataset and map area
    pub fn rebuild(&mut self) {
        let canvas = Canvas::new(
            self.map_area.width as f64 * 2.0,
            self.map_area.height as f64 * 4.0,
        );
        let choropleth = Choropleth::new(self.config.choropleth(canvas));
        let features = self.features.clone();
        match choropleth.run(features, self) {
            Ok(_) => self.error = None,
            Err(e) => {
                warn!("scene rebuild failed: {}", e);
                self.clear_scene();
                self.error = Some(e.to_string());
            }
        }
    }

    /// Re-read the dataset from disk; the previous data stays on failure
    pub fn reload(&mut self) -> Result<()> {
        let features = data::load_features(&self.data_path)?;
        info!(features = features.len(), "reloaded dataset");
        self.features = features;
        self.rebuild();
        Ok(())
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    fn clear_scene(&mut self) {
        self.scene = None;
        self.layer = None;
        self.cell_fills.clear();
        self.outlines = BrailleCanvas::new(0, 0);
        self.on_feature_leave();
    }

    /// Track the mouse and dispatch hover events for the feature under it
    pub fn pointer_moved(&mut self, col: u16, row: u16) {
        self.mouse_pos = Some((col, row));

        let hit = self.mouse_pixel_pos().and_then(|p| {
            let idx = self.layer.as_ref()?.feature_at(p)?;
            Some((idx, p))
        });
        let scene = self.scene.clone();

        match (hit, scene) {
            (Some((idx, p)), Some(scene)) => {
                if let Some(feature) = scene.features.get(idx) {
                    self.on_feature_hover(feature, p);
                }
            }
            _ => self.on_feature_leave(),
        }
    }

    /// Mouse position as the canvas pixel at the centre of its cell
    pub fn mouse_pixel_pos(&self) -> Option<DVec2> {
        let (col, row) = self.mouse_pos?;
        let area = self.map_area;
        if col < area.x || row < area.y || col >= area.x + area.width || row >= area.y + area.height {
            return None;
        }
        Some(cell_center(col - area.x, row - area.y))
    }

    /// Fill of the feature under a map cell
    pub fn cell_fill(&self, col: u16, row: u16) -> Option<Rgb> {
        if col >= self.map_area.width || row >= self.map_area.height {
            return None;
        }
        let idx = row as usize * self.map_area.width as usize + col as usize;
        self.cell_fills.get(idx).copied().flatten()
    }

    pub fn hovered_feature(&self) -> Option<&StyledFeature> {
        let scene = self.scene.as_ref()?;
        scene.features.get(self.hovered?)
    }

    pub fn feature_count(&self) -> usize {
        self.features.len()
    }
}

/// Pixel at the centre of a cell's 2x4 braille block
fn cell_center(col: u16, row: u16) -> DVec2 {
    DVec2::new(col as f64 * 2.0 + 1.0, row as f64 * 4.0 + 2.0)
}

impl Renderer for App {
    fn draw(&mut self, scene: Arc<Scene>) {
        let cols = self.map_area.width as usize;
        let rows = self.map_area.height as usize;
        let layer = ProjectedLayer::build(&scene);

        let mut cell_fills = Vec::with_capacity(cols * rows);
        for row in 0..rows {
            for col in 0..cols {
                let p = cell_center(col as u16, row as u16);
                let fill = layer
                    .feature_at(p)
                    .and_then(|idx| scene.features.get(idx))
                    .map(|f| f.fill);
                cell_fills.push(fill);
            }
        }

        let mut outlines = BrailleCanvas::new(cols, rows);
        for feature in &layer.features {
            for ring in &feature.rings {
                draw_ring(&mut outlines, ring);
            }
        }

        self.cell_fills = cell_fills;
        self.outlines = outlines;
        self.layer = Some(layer);
        self.scene = Some(scene);
        self.on_feature_leave();
    }

    fn on_feature_hover(&mut self, feature: &StyledFeature, _pointer: DVec2) {
        if self.hovered == Some(feature.index) {
            return;
        }
        let (Some(scene), Some(layer)) = (self.scene.as_ref(), self.layer.as_ref()) else {
            return;
        };

        let mut highlight = BrailleCanvas::new(self.map_area.width as usize, self.map_area.height as usize);
        if let Some(projected) = layer.features.get(feature.index) {
            for ring in &projected.rings {
                draw_ring(&mut highlight, ring);
            }
        }

        self.tooltip = Some(Tooltip::for_feature(feature, scene.total_listings));
        self.highlight = highlight;
        self.hovered = Some(feature.index);
    }

    fn on_feature_leave(&mut self) {
        self.hovered = None;
        self.tooltip = None;
        self.highlight = BrailleCanvas::new(0, 0);
    }
}
