use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::choropleth::ChoroplethConfig;
use crate::geo::EARTH_RADIUS_KM;
use crate::map::{BoundingBox, Canvas};
use crate::palette::{DEFAULT_STEP, MIN_STEP};

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub input: InputConfig,
    pub canvas: CanvasConfig,
    pub region: RegionConfig,
    pub scale: ScaleConfig,
    pub palette: PaletteConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct InputConfig {
    pub geojson: PathBuf,
}

/// Canvas size for SVG export; the terminal view sizes itself
#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: f64,
    pub height: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct RegionConfig {
    /// Central meridian of the conic projection
    pub center: f64,
    pub north: f64,
    pub south: f64,
    pub west: f64,
    pub east: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ScaleConfig {
    pub reference_km: f64,
    pub sphere_radius_km: f64,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct PaletteConfig {
    pub step: f64,
    pub legend_exponent: f64,
    pub legend_width: f64,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            geojson: PathBuf::from("data/rio-data.geojson"),
        }
    }
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 450.0,
        }
    }
}

impl Default for RegionConfig {
    fn default() -> Self {
        let rio = BoundingBox::rio();
        Self {
            center: rio.center,
            north: rio.north,
            south: rio.south,
            west: rio.west,
            east: rio.east,
        }
    }
}

impl Default for ScaleConfig {
    fn default() -> Self {
        Self {
            reference_km: 5.0,
            sphere_radius_km: EARTH_RADIUS_KM,
        }
    }
}

impl Default for PaletteConfig {
    fn default() -> Self {
        Self {
            step: DEFAULT_STEP,
            legend_exponent: 1.2,
            legend_width: 350.0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from("listing-map.log"),
        }
    }
}

impl RegionConfig {
    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::new(self.center, self.north, self.south, self.west, self.east)
    }
}

impl AppConfig {
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: AppConfig = toml::from_str(&content)
            .with_context(|| "Failed to parse TOML configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise use the built-in Rio defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            info!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Reject values the pipeline would otherwise accept silently
    pub fn validate(&self) -> Result<()> {
        let step = self.palette.step;
        if !(step >= MIN_STEP && step <= 1.0) {
            bail!("palette.step must be in [{}, 1], got {}", MIN_STEP, step);
        }
        if !(self.scale.reference_km > 0.0) {
            bail!("scale.reference_km must be positive, got {}", self.scale.reference_km);
        }
        if !(self.scale.sphere_radius_km > 0.0) {
            bail!("scale.sphere_radius_km must be positive, got {}", self.scale.sphere_radius_km);
        }
        Ok(())
    }

    /// Core pipeline settings for a canvas of the given size
    pub fn choropleth(&self, canvas: Canvas) -> ChoroplethConfig {
        ChoroplethConfig {
            region: self.region.bounding_box(),
            canvas,
            reference_distance_km: self.scale.reference_km,
            sphere_radius_km: self.scale.sphere_radius_km,
            breakpoint_step: self.palette.step,
        }
    }

    /// Canvas used for SVG export
    pub fn export_canvas(&self) -> Canvas {
        Canvas::new(self.canvas.width, self.canvas.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_rio() {
        let config = AppConfig::default();
        let core = config.choropleth(config.export_canvas());
        assert_eq!(core, ChoroplethConfig::default());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[input]
geojson = "other.geojson"

[scale]
reference_km = 2.0
"#
        )
        .unwrap();

        let config = AppConfig::load_from_file(file.path()).unwrap();
        assert_eq!(config.input.geojson, PathBuf::from("other.geojson"));
        assert_eq!(config.scale.reference_km, 2.0);
        assert_eq!(config.scale.sphere_radius_km, EARTH_RADIUS_KM);
        assert_eq!(config.region, RegionConfig::default());
        assert_eq!(config.palette.legend_width, 350.0);
    }

    #[test]
    fn test_invalid_step_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[palette]\nstep = 0.0").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());

        let mut tiny = tempfile::NamedTempFile::new().unwrap();
        writeln!(tiny, "[palette]\nstep = 1e-9").unwrap();
        assert!(AppConfig::load_from_file(tiny.path()).is_err());

        let mut finest = tempfile::NamedTempFile::new().unwrap();
        writeln!(finest, "[palette]\nstep = 0.01").unwrap();
        assert_eq!(AppConfig::load_from_file(finest.path()).unwrap().palette.step, MIN_STEP);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_malformed_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[canvas\nwidth = ").unwrap();
        assert!(AppConfig::load_from_file(file.path()).is_err());
    }
}
