//! Style configuration injected into the renderer.

use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::curve::DEFAULT_PEAK_INSET_FACTOR;
use crate::HillChartError;

/// Opaque RGB color, written as `#RRGGBB` in theme files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(0xFF, 0xFF, 0xFF);
    pub const BLACK: Color = Color(0x00, 0x00, 0x00);
}

impl FromStr for Color {
    type Err = HillChartError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        let invalid = || HillChartError::InvalidTheme(format!("invalid color '{}'", s));
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(invalid());
        }
        let channel = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|_| invalid())
        };
        Ok(Color(channel(0..2)?, channel(2..4)?, channel(4..6)?))
    }
}

impl TryFrom<String> for Color {
    type Error = HillChartError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.0, self.1, self.2)
    }
}

/// Pixel size of the output canvas. Width is always three times the height.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CanvasDimensions {
    pub width: u32,
    pub height: u32,
}

impl CanvasDimensions {
    pub fn from_height(height: u32) -> Self {
        Self {
            width: height.saturating_mul(3),
            height,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Theme {
    pub background: Color,
    pub hill_fill: Color,
    pub curve_stroke: Color,
    pub divider_stroke: Color,
    pub marker_fill: Color,
    pub marker_outline: Color,
    pub label_color: Color,
    pub title_color: Color,

    /// Canvas height before the pixel density multiplier.
    pub base_height: u32,
    pub pixel_density: u32,
    pub peak_inset_factor: f64,

    // Line widths and font sizes below are in unscaled pixels.
    pub curve_width: f64,
    pub divider_width: f64,
    pub marker_outline_width: f64,
    pub min_marker_diameter: f64,
    /// Marker diameter as a fraction of the canvas width.
    pub marker_fraction: f64,
    pub label_size: f64,
    pub title_size: f64,
    pub font_family: String,

    pub labels: [String; 2],
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            background: Color::WHITE,
            hill_fill: Color(0xF8, 0xF4, 0xDA),
            curve_stroke: Color(0x22, 0x22, 0x22),
            divider_stroke: Color(0xAA, 0xAA, 0xAA),
            marker_fill: Color(0xF8, 0x02, 0xC1),
            marker_outline: Color::WHITE,
            label_color: Color(0x33, 0x33, 0x33),
            title_color: Color(0x33, 0x33, 0x33),
            base_height: 200,
            pixel_density: 2,
            peak_inset_factor: DEFAULT_PEAK_INSET_FACTOR,
            curve_width: 2.0,
            divider_width: 0.5,
            marker_outline_width: 1.0,
            min_marker_diameter: 4.0,
            marker_fraction: 0.025,
            label_size: 12.0,
            title_size: 16.0,
            font_family: "sans-serif".to_string(),
            labels: [
                "Figuring things out".to_string(),
                "Making it happen".to_string(),
            ],
        }
    }
}

impl Theme {
    pub fn from_json_str(input: &str) -> Result<Self, HillChartError> {
        let theme: Theme = serde_json::from_str(input)?;
        theme.validate()?;
        Ok(theme)
    }

    pub fn load(path: &Path) -> Result<Self, HillChartError> {
        let data = fs::read_to_string(path)?;
        Self::from_json_str(&data)
    }

    pub fn validate(&self) -> Result<(), HillChartError> {
        if self.pixel_density == 0 {
            return Err(HillChartError::InvalidTheme(
                "pixel_density must be > 0".to_string(),
            ));
        }
        if self.base_height == 0 {
            return Err(HillChartError::InvalidTheme(
                "base_height must be > 0".to_string(),
            ));
        }
        if self.peak_inset_factor.is_nan() || self.peak_inset_factor < 0.0 {
            return Err(HillChartError::InvalidTheme(
                "peak_inset_factor must be >= 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn dimensions(&self) -> CanvasDimensions {
        CanvasDimensions::from_height(self.base_height.saturating_mul(self.pixel_density))
    }

    /// Scales an unscaled length by the pixel density.
    pub fn scaled(&self, value: f64) -> f64 {
        value * self.pixel_density as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_dimensions() {
        let dims = Theme::default().dimensions();
        assert_eq!(dims.height, 400);
        assert_eq!(dims.width, 1200);
        assert_eq!(dims.width, dims.height * 3);
    }

    #[test]
    fn test_color_parse_and_display() {
        let color: Color = "#f8f4da".parse().unwrap();
        assert_eq!(color, Color(0xF8, 0xF4, 0xDA));
        assert_eq!(color.to_string(), "#F8F4DA");
        assert!("#12345".parse::<Color>().is_err());
        assert!("zzzzzz".parse::<Color>().is_err());
    }

    #[test]
    fn test_partial_json_override() {
        let theme =
            Theme::from_json_str(r##"{"hill_fill": "#DDEEFF", "pixel_density": 1}"##).unwrap();
        assert_eq!(theme.hill_fill, Color(0xDD, 0xEE, 0xFF));
        assert_eq!(theme.dimensions().height, 200);
        assert_eq!(theme.marker_fill, Theme::default().marker_fill);
    }

    #[test]
    fn test_invalid_theme_rejected() {
        assert!(Theme::from_json_str(r#"{"pixel_density": 0}"#).is_err());
        assert!(Theme::from_json_str(r#"{"background": "red"}"#).is_err());
        assert!(Theme::from_json_str(r#"{"peak_inset_factor": -1.0}"#).is_err());
        let nan_peak = Theme {
            peak_inset_factor: f64::NAN,
            ..Theme::default()
        };
        assert!(nan_peak.validate().is_err());
    }
}
