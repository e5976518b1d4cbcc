use std::fmt::{self, Write};
use std::sync::Arc;

use glam::DVec2;
use tracing::{info, warn};

use crate::choropleth::{Renderer, Scene, StyledFeature};
use crate::map::ProjectedLayer;
use crate::palette::{tick_label, LegendAxis};
use crate::render::tooltip::Tooltip;

const FILL_OPACITY: f64 = 0.7;
const HOVER_OPACITY: f64 = 0.9;
const LEGEND_OFFSET_Y: f64 = 40.0;
const LEGEND_BAR_HEIGHT: f64 = 6.0;
const TICK_SIZE: f64 = 15.0;
const SCALE_BAR_MARGIN: f64 = 25.0;

/// Renders scenes into an SVG document kept in memory.
///
/// Hover is served by each path's `<title>`, so the hover callbacks do nothing.
pub struct SvgRenderer {
    legend_exponent: f64,
    legend_width: f64,
    document: Option<String>,
}

impl SvgRenderer {
    pub fn new(legend_exponent: f64, legend_width: f64) -> Self {
        Self {
            legend_exponent,
            legend_width,
            document: None,
        }
    }

    /// The document for the most recent scene
    pub fn document(&self) -> Option<&str> {
        self.document.as_deref()
    }

    pub fn into_document(self) -> Option<String> {
        self.document
    }

    fn render(&self, scene: &Scene) -> Result<String, fmt::Error> {
        let layer = ProjectedLayer::build(scene);
        let mut svg = String::new();

        writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.0}" height="{:.0}">"#,
            scene.canvas.width, scene.canvas.height
        )?;
        writeln!(svg, "  <style>path:hover{{fill-opacity:{}}}</style>", HOVER_OPACITY)?;

        for (styled, projected) in scene.features.iter().zip(&layer.features) {
            write_feature(&mut svg, styled, &projected.rings, scene.total_listings)?;
        }

        self.write_legend(&mut svg, scene)?;
        write_scale_bar(&mut svg, scene)?;

        writeln!(svg, "</svg>")?;
        Ok(svg)
    }

    fn write_legend(&self, svg: &mut String, scene: &Scene) -> fmt::Result {
        let palette = &scene.palette;
        let axis = LegendAxis::for_palette(palette, self.legend_exponent, self.legend_width);

        writeln!(svg, r#"  <g transform="translate(0 {:.0})" font-size="10">"#, LEGEND_OFFSET_Y)?;
        for bucket in palette.legend_buckets() {
            let x0 = axis.apply(bucket.low);
            let x1 = axis.apply(bucket.high);
            writeln!(
                svg,
                r#"    <rect x="{:.2}" width="{:.2}" height="{:.0}" fill="{}" fill-opacity="{}"/>"#,
                x0,
                (x1 - x0).max(0.0),
                LEGEND_BAR_HEIGHT,
                bucket.color,
                FILL_OPACITY
            )?;
        }
        for (x, value) in axis.ticks(palette) {
            writeln!(
                svg,
                r##"    <line x1="{x:.2}" x2="{x:.2}" y2="{:.0}" stroke="#000" stroke-width="1"/>"##,
                TICK_SIZE
            )?;
            writeln!(
                svg,
                r#"    <text x="{:.2}" y="{:.0}" dy="0.71em" text-anchor="middle">{}</text>"#,
                x,
                TICK_SIZE + 3.0,
                tick_label(value)
            )?;
        }
        writeln!(
            svg,
            r##"    <text y="-5" fill="#000" text-anchor="start" font-size="12">Number of listed properties</text>"##
        )?;
        writeln!(svg, "  </g>")
    }
}

fn write_feature(svg: &mut String, styled: &StyledFeature, rings: &[Vec<DVec2>], total: f64) -> fmt::Result {
    let mut d = String::new();
    for ring in rings {
        for (i, p) in ring.iter().enumerate() {
            let cmd = if i == 0 { 'M' } else { 'L' };
            write!(d, "{}{:.2},{:.2}", cmd, p.x, p.y)?;
        }
        d.push('Z');
    }
    let tooltip = Tooltip::for_feature(styled, total);
    writeln!(
        svg,
        r##"  <path d="{}" fill="{}" fill-opacity="{}" fill-rule="evenodd" stroke="#fff" stroke-width="0.5"><title>{}</title></path>"##,
        d,
        styled.fill,
        FILL_OPACITY,
        escape_xml(&tooltip.to_text())
    )
}

fn write_scale_bar(svg: &mut String, scene: &Scene) -> fmt::Result {
    writeln!(
        svg,
        r#"  <g transform="translate(0 {:.0})">"#,
        scene.canvas.height - SCALE_BAR_MARGIN
    )?;
    writeln!(svg, r##"    <rect height="1" width="{:.2}" fill="#000"/>"##, scene.scale.length_px)?;
    writeln!(
        svg,
        r##"    <text y="-5" fill="#000" text-anchor="start" font-size="12">{} km</text>"##,
        scene.reference_distance_km
    )?;
    writeln!(svg, "  </g>")
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

impl Renderer for SvgRenderer {
    fn draw(&mut self, scene: Arc<Scene>) {
        match self.render(&scene) {
            Ok(doc) => {
                info!(bytes = doc.len(), "rendered svg document");
                self.document = Some(doc);
            }
            Err(e) => warn!("failed to format svg document: {}", e),
        }
    }

    fn on_feature_hover(&mut self, _feature: &StyledFeature, _pointer: DVec2) {}

    fn on_feature_leave(&mut self) {}
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
    fn test_document_structure() {
        let features = vec![
            Feature::new(
                Some("Tijuca & Co".into()),
                vec![square(-43.6, -23.0, 0.1)],
                ListingStats {
                    n: Some(20.0),
                    entire: Some(5.0),
                    log_n: Some(1.0),
                    ..Default::default()
                },
            ),
            Feature::new(
                Some("Centro".into()),
                vec![square(-43.3, -23.0, 0.1)],
                ListingStats {
                    n: Some(50.0),
                    entire: Some(40.0),
                    log_n: Some(3.0),
                    ..Default::default()
                },
            ),
        ];

        let mut renderer = SvgRenderer::new(1.2, 350.0);
        Choropleth::new(ChoroplethConfig::default())
            .run(features, &mut renderer)
            .unwrap();

        let doc = renderer.document().unwrap();
        assert!(doc.starts_with("<svg"));
        assert!(doc.trim_end().ends_with("</svg>"));
        assert_eq!(doc.matches("<path").count(), 2);
        assert_eq!(doc.matches("<rect").count(), 8 + 1);
        assert!(doc.contains("Tijuca &amp; Co"));
        assert!(doc.contains("Number of listed properties"));
        assert!(doc.contains(">5 km</text>"));
        assert!(doc.contains("translate(0 425)"));
        assert!(doc.contains(r##"stroke="#fff""##));
    }

    #[test]
    fn test_legend_ticks_and_hover_style() {
        let features = vec![
            Feature::new(
                None,
                vec![square(-43.6, -23.0, 0.1)],
                ListingStats {
                    log_n: Some(0.5),
                    ..Default::default()
                },
            ),
            Feature::new(
                None,
                vec![square(-43.3, -23.0, 0.1)],
                ListingStats {
                    log_n: Some(2.5),
                    ..Default::default()
                },
            ),
        ];

        let mut renderer = SvgRenderer::new(1.2, 350.0);
        Choropleth::new(ChoroplethConfig::default())
            .run(features, &mut renderer)
            .unwrap();

        let doc = renderer.document().unwrap();
        assert!(doc.contains("<style>path:hover{fill-opacity:0.9}</style>"));
        // One tick per threshold, each stroked black
        assert_eq!(doc.matches(r##"stroke="#000""##).count(), 7);
        assert_eq!(doc.matches("<line").count(), 7);
    }

    #[test]
    fn test_escape_xml() {
        assert_eq!(escape_xml(r#"<a href="x">&'"#), "&lt;a href=&quot;x&quot;&gt;&amp;&apos;");
    }
}
