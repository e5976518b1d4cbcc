pub mod braille;
pub mod choropleth;
pub mod config;
pub mod data;
pub mod error;
pub mod geo;
pub mod map;
pub mod palette;
pub mod render;

pub use choropleth::{Choropleth, ChoroplethConfig, Renderer, Scene, StyledFeature};
pub use error::{ChoroplethError, Result};
