//! Raster [`DrawingSurface`] over a plotters [`DrawingBackend`].
//!
//! Paths are flattened and dashed here, then rounded to device pixels, so
//! the backend only needs polygon fill, polyline stroke, rectangle fill and
//! text. Text is set in the embedded face registered by [`crate::fonts`].

use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{
    FontDesc, FontFamily, FontStyle, RGBAColor, RGBColor, ShapeStyle, TextStyle,
};
use plotters_backend::{BackendCoord, DrawingBackend};

use crate::curve::CurvePoint;
use crate::fonts::{self, EM_TO_PIXEL_SIZE};
use crate::surface::{DrawingSurface, FontWeight, Path, StyleStack, TextAlign};
use crate::theme::Color;
use crate::HillChartError;

fn to_backend_points(points: &[CurvePoint]) -> Vec<BackendCoord> {
    points
        .iter()
        .map(|p| (round_i32(p.x), round_i32(p.y)))
        .collect()
}

fn round_i32(value: f64) -> i32 {
    value.round() as i32
}

fn rgba(color: Color) -> RGBAColor {
    RGBAColor(color.0, color.1, color.2, 1.0)
}

/// Canvas-style surface drawing into a plotters backend.
pub struct PlottersSurface<DB: DrawingBackend> {
    backend: DB,
    styles: StyleStack,
}

impl<DB: DrawingBackend> PlottersSurface<DB> {
    pub fn new(backend: DB) -> Result<Self, HillChartError> {
        fonts::ensure_registered()?;
        Ok(Self {
            backend,
            styles: StyleStack::default(),
        })
    }

    /// Flushes the backend into its target buffer.
    pub fn finish(mut self) -> Result<(), HillChartError> {
        self.backend
            .present()
            .map_err(|e| HillChartError::Backend(format!("present: {}", e)))
    }

    fn stroke_style(&self) -> ShapeStyle {
        let style = self.styles.current();
        ShapeStyle {
            color: rgba(style.stroke),
            filled: false,
            stroke_width: style.line_width.round().max(1.0) as u32,
        }
    }

    fn fill_style(&self) -> ShapeStyle {
        ShapeStyle {
            color: rgba(self.styles.current().fill),
            filled: true,
            stroke_width: 1,
        }
    }
}

impl<DB: DrawingBackend> DrawingSurface for PlottersSurface<DB> {
    fn size(&self) -> (u32, u32) {
        self.backend.get_size()
    }

    fn styles(&self) -> &StyleStack {
        &self.styles
    }

    fn styles_mut(&mut self) -> &mut StyleStack {
        &mut self.styles
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<(), HillChartError> {
        let style = self.fill_style();
        self.backend
            .draw_rect(
                (round_i32(x), round_i32(y)),
                (round_i32(x + w), round_i32(y + h)),
                &style,
                true,
            )
            .map_err(|e| HillChartError::Backend(format!("fill rect: {}", e)))
    }

    fn fill_path(&mut self, path: &Path) -> Result<(), HillChartError> {
        let style = self.fill_style();
        for polyline in path.flatten() {
            if polyline.points.len() < 3 {
                continue;
            }
            self.backend
                .fill_polygon(to_backend_points(&polyline.points), &style)
                .map_err(|e| HillChartError::Backend(format!("fill path: {}", e)))?;
        }
        Ok(())
    }

    fn stroke_path(&mut self, path: &Path) -> Result<(), HillChartError> {
        let style = self.stroke_style();
        let dashed = path.dashed(&self.styles.current().line_dash);
        for polyline in dashed.flatten() {
            let mut points = polyline.points;
            if polyline.closed {
                points.push(points[0]);
            }
            self.backend
                .draw_path(to_backend_points(&points), &style)
                .map_err(|e| HillChartError::Backend(format!("stroke path: {}", e)))?;
        }
        Ok(())
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), HillChartError> {
        let state = self.styles.current();
        let font_style = match state.font.weight {
            FontWeight::Normal => FontStyle::Normal,
            FontWeight::Bold => FontStyle::Bold,
        };
        let h_pos = match state.text_align {
            TextAlign::Left => HPos::Left,
            TextAlign::Center => HPos::Center,
            TextAlign::Right => HPos::Right,
        };
        let fill = state.fill;
        let pixel_size = state.font.size * EM_TO_PIXEL_SIZE;
        let desc = FontDesc::new(FontFamily::Name(fonts::RASTER_FAMILY), pixel_size, font_style);
        let text_style: TextStyle = desc
            .color(&RGBColor(fill.0, fill.1, fill.2))
            .pos(Pos::new(h_pos, VPos::Top));

        // the baseline sits half the pixel size below the top anchor
        let top = y - pixel_size / 2.0;
        self.backend
            .draw_text(text, &text_style, (round_i32(x), round_i32(top)))
            .map_err(|e| HillChartError::Backend(format!("fill text: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plotters::prelude::BitMapBackend;

    use crate::surface::StyleScope;

    fn pixel(buf: &[u8], width: u32, x: u32, y: u32) -> (u8, u8, u8) {
        let idx = ((y * width + x) * 3) as usize;
        (buf[idx], buf[idx + 1], buf[idx + 2])
    }

    #[test]
    fn test_fill_rect_and_polygon_on_bitmap() {
        let (w, h) = (60u32, 20u32);
        let mut buf = vec![0u8; (w * h * 3) as usize];
        {
            let mut surface =
                PlottersSurface::new(BitMapBackend::with_buffer(&mut buf, (w, h))).unwrap();
            {
                let mut scope = StyleScope::new(&mut surface);
                scope.style_mut().fill = Color::WHITE;
                scope.fill_rect(0.0, 0.0, w as f64, h as f64).unwrap();
            }
            {
                let mut scope = StyleScope::new(&mut surface);
                scope.style_mut().fill = Color(0xF8, 0x02, 0xC1);
                let mut path = Path::new();
                path.move_to(10.0, 5.0)
                    .line_to(20.0, 5.0)
                    .line_to(20.0, 15.0)
                    .line_to(10.0, 15.0)
                    .close_path();
                scope.fill_path(&path).unwrap();
            }
            assert_eq!(surface.style().fill, Color::BLACK);
            surface.finish().unwrap();
        }
        assert_eq!(pixel(&buf, w, 2, 2), (0xFF, 0xFF, 0xFF));
        assert_eq!(pixel(&buf, w, 15, 10), (0xF8, 0x02, 0xC1));
    }

    #[test]
    fn test_dashed_stroke_leaves_gaps() {
        let (w, h) = (40u32, 100u32);
        let mut buf = vec![0xFFu8; (w * h * 3) as usize];
        {
            let mut surface =
                PlottersSurface::new(BitMapBackend::with_buffer(&mut buf, (w, h))).unwrap();
            let style = surface.style_mut();
            style.line_dash = vec![20.0, 20.0];
            style.line_width = 1.0;
            let mut path = Path::new();
            path.move_to(20.0, 0.0).line_to(20.0, 100.0);
            surface.stroke_path(&path).unwrap();
            surface.finish().unwrap();
        }
        assert_eq!(pixel(&buf, w, 20, 10), (0, 0, 0));
        assert_eq!(pixel(&buf, w, 20, 30), (0xFF, 0xFF, 0xFF));
        assert_eq!(pixel(&buf, w, 20, 50), (0, 0, 0));
    }

    #[test]
    fn test_text_is_drawn_above_baseline_with_embedded_font() {
        let (w, h) = (200u32, 60u32);
        let mut buf = vec![0xFFu8; (w * h * 3) as usize];
        {
            let mut surface =
                PlottersSurface::new(BitMapBackend::with_buffer(&mut buf, (w, h))).unwrap();
            surface.style_mut().font.size = 24.0;
            surface.fill_text("Hill", 10.0, 40.0).unwrap();
            surface.finish().unwrap();
        }
        let inked_rows: Vec<u32> = (0..h)
            .filter(|&y| (0..w).any(|x| pixel(&buf, w, x, y) != (0xFF, 0xFF, 0xFF)))
            .collect();
        assert!(!inked_rows.is_empty(), "text left no ink");
        // "Hill" has no descenders: all ink sits on or above the baseline
        assert!(inked_rows.iter().all(|&y| y <= 41));
        assert!(inked_rows.iter().any(|&y| y < 30));
    }
}
