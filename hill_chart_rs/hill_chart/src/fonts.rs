//! Embedded typeface for raster text.
//!
//! Raster output never depends on system fonts: DejaVu Sans (regular and
//! bold) is compiled into the crate and registered with plotters once per
//! process.

use std::sync::OnceLock;

use plotters::style::{register_font, FontStyle};
use tracing::debug;

use crate::HillChartError;

/// Family name the embedded faces are registered under.
pub const RASTER_FAMILY: &str = "sans-serif";

/// plotters sizes text by ascent plus descent; DejaVu Sans spans
/// (1901 + 483) / 2048 em.
pub const EM_TO_PIXEL_SIZE: f64 = 2384.0 / 2048.0;

static SANS_REGULAR: &[u8] = include_bytes!("../assets/fonts/DejaVuSans.ttf");
static SANS_BOLD: &[u8] = include_bytes!("../assets/fonts/DejaVuSans-Bold.ttf");

static REGISTERED: OnceLock<Result<(), String>> = OnceLock::new();

/// Registers the embedded faces. Only the first call does any work; later
/// calls return its outcome.
pub fn ensure_registered() -> Result<(), HillChartError> {
    REGISTERED
        .get_or_init(|| {
            for (style, bytes) in [(FontStyle::Normal, SANS_REGULAR), (FontStyle::Bold, SANS_BOLD)]
            {
                register_font(RASTER_FAMILY, style, bytes)
                    .map_err(|_| format!("embedded {} face is not a valid font", style.as_str()))?;
            }
            debug!(family = RASTER_FAMILY, "registered embedded fonts");
            Ok(())
        })
        .clone()
        .map_err(HillChartError::Backend)
}
