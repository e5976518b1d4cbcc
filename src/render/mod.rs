pub mod svg;
pub mod tooltip;

pub use svg::SvgRenderer;
pub use tooltip::Tooltip;
