//! Hill chart rendering library.
//!
//! A hill chart is a single peaked curve: the rising half is "figuring things
//! out", the falling half is "making it happen". Given a progress value
//! `t ∈ [0, 1]` this crate draws the curve, shades the active quarter, marks
//! the position and encodes the result as PNG, JPEG or SVG.

pub mod backend;
pub mod cache;
pub mod curve;
pub mod fonts;
pub mod format;
pub mod http;
pub mod render;
pub mod surface;
pub mod svg;
pub mod theme;

use thiserror::Error;

pub use cache::RenderCache;
pub use curve::{clamp_progress, CurvePoint, HillCurve};
pub use format::ImageFormat;
pub use render::{RenderOptions, Renderer};
pub use theme::{CanvasDimensions, Color, Theme};

#[derive(Error, Debug)]
pub enum HillChartError {
    #[error("drawing backend failed: {0}")]
    Backend(String),
    #[error("image encoding failed: {0}")]
    Encode(String),
    #[error("cannot allocate a {width}x{height} canvas")]
    Allocation { width: u32, height: u32 },
    #[error("invalid theme: {0}")]
    InvalidTheme(String),
    #[error("failed to read theme: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse theme: {0}")]
    Json(#[from] serde_json::Error),
}

/// Renders a hill chart with the default theme.
///
/// `t` outside [0, 1] is clamped.
pub fn render(
    t: f64,
    format: ImageFormat,
    options: &RenderOptions,
) -> Result<Vec<u8>, HillChartError> {
    Renderer::default().render(t, format, options)
}

/// Renders a hill chart with a custom theme.
pub fn render_with_theme(
    theme: &Theme,
    t: f64,
    format: ImageFormat,
    options: &RenderOptions,
) -> Result<Vec<u8>, HillChartError> {
    Renderer::new(theme.clone())?.render(t, format, options)
}
