//! Vector [`DrawingSurface`] that writes an SVG document.
//!
//! Geometry is emitted at full precision: paths keep their cubic segments
//! (`C`), ellipses stay arcs, and dashes become `stroke-dasharray`.

use std::fmt::{self, Write};

use crate::surface::{is_dash_pattern, DrawingSurface, FontWeight, Path, StyleStack, TextAlign};
use crate::HillChartError;

pub struct SvgSurface {
    width: u32,
    height: u32,
    styles: StyleStack,
    body: String,
}

impl SvgSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            styles: StyleStack::default(),
            body: String::new(),
        }
    }

    /// Closes the document and returns it.
    pub fn finish(self) -> String {
        let mut doc = format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" "#,
                r#"width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
                "\n"
            ),
            w = self.width,
            h = self.height
        );
        doc.push_str(&self.body);
        doc.push_str("</svg>\n");
        doc
    }

    fn emit(&mut self, element: fmt::Arguments<'_>) -> Result<(), HillChartError> {
        self.body
            .write_fmt(element)
            .and_then(|_| self.body.write_char('\n'))
            .map_err(|e| HillChartError::Backend(format!("svg write: {}", e)))
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
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

impl DrawingSurface for SvgSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn styles(&self) -> &StyleStack {
        &self.styles
    }

    fn styles_mut(&mut self) -> &mut StyleStack {
        &mut self.styles
    }

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<(), HillChartError> {
        let fill = self.style().fill;
        self.emit(format_args!(
            r#"  <rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{}"/>"#,
            x, y, w, h, fill
        ))
    }

    fn fill_path(&mut self, path: &Path) -> Result<(), HillChartError> {
        if path.elements().is_empty() {
            return Ok(());
        }
        let fill = self.style().fill;
        self.emit(format_args!(
            r#"  <path d="{}" fill="{}" stroke="none"/>"#,
            path.to_svg(),
            fill
        ))
    }

    fn stroke_path(&mut self, path: &Path) -> Result<(), HillChartError> {
        if path.elements().is_empty() {
            return Ok(());
        }
        let style = self.style();
        let dash = if is_dash_pattern(&style.line_dash) {
            let lengths: Vec<String> =
                style.line_dash.iter().map(|len| format!("{:.2}", len)).collect();
            format!(r#" stroke-dasharray="{}""#, lengths.join(","))
        } else {
            String::new()
        };
        let (stroke, width) = (style.stroke, style.line_width);
        self.emit(format_args!(
            r#"  <path d="{}" fill="none" stroke="{}" stroke-width="{:.2}"{}/>"#,
            path.to_svg(),
            stroke,
            width,
            dash
        ))
    }

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), HillChartError> {
        let state = self.style();
        let anchor = match state.text_align {
            TextAlign::Left => "start",
            TextAlign::Center => "middle",
            TextAlign::Right => "end",
        };
        let weight = match state.font.weight {
            FontWeight::Normal => "normal",
            FontWeight::Bold => "bold",
        };
        let (family, size, fill) = (escape_xml(&state.font.family), state.font.size, state.fill);
        self.emit(format_args!(
            concat!(
                r#"  <text x="{:.2}" y="{:.2}" font-family="{}" font-size="{:.2}" "#,
                r#"font-weight="{}" text-anchor="{}" fill="{}">{}</text>"#
            ),
            x,
            y,
            family,
            size,
            weight,
            anchor,
            fill,
            escape_xml(text)
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::curve::CurvePoint;
    use crate::surface::StyleScope;
    use crate::theme::Color;

    #[test]
    fn test_document_wraps_body() {
        let mut surface = SvgSurface::new(90, 30);
        surface.fill_rect(0.0, 0.0, 90.0, 30.0).unwrap();
        let doc = surface.finish();
        assert!(doc.starts_with("<svg"));
        assert!(doc.contains(r#"viewBox="0 0 90 30""#));
        assert!(doc.contains("<rect"));
        assert!(doc.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_curves_and_ellipses_stay_curves() {
        let mut surface = SvgSurface::new(100, 100);
        let mut path = Path::new();
        path.move_to(0.0, 90.0).bezier_curve_to(
            CurvePoint::new(20.0, 90.0),
            CurvePoint::new(30.0, 10.5),
            CurvePoint::new(50.0, 10.5),
        );
        surface.stroke_path(&path).unwrap();
        let mut marker = Path::new();
        marker.ellipse(CurvePoint::new(50.25, 10.5), 4.5, 4.5);
        surface.fill_path(&marker).unwrap();
        let doc = surface.finish();

        let paths: Vec<&str> = doc.lines().filter(|l| l.contains("<path")).collect();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].contains(&format!(r#"d="{}""#, path.to_svg())));
        assert!(paths[0].contains('C'));
        assert!(paths[0].contains("10.5"));
        assert!(paths[1].contains('C'));
        assert!(!doc.contains("<polyline"));
        assert!(!doc.contains("<polygon"));
    }

    #[test]
    fn test_stroke_attributes_follow_style() {
        let mut surface = SvgSurface::new(100, 100);
        {
            let mut scope = StyleScope::new(&mut surface);
            let style = scope.style_mut();
            style.stroke = Color(0xAA, 0xAA, 0xAA);
            style.line_width = 1.5;
            style.line_dash = vec![30.0, 30.0];
            let mut path = Path::new();
            path.move_to(10.0, 90.0).line_to(10.0, 20.0);
            scope.stroke_path(&path).unwrap();
        }
        let mut path = Path::new();
        path.move_to(0.0, 0.0).line_to(5.0, 5.0);
        surface.stroke_path(&path).unwrap();
        let doc = surface.finish();
        let paths: Vec<&str> = doc.lines().filter(|l| l.contains("<path")).collect();
        assert!(paths[0].contains(r##"stroke="#AAAAAA""##));
        assert!(paths[0].contains(r#"stroke-width="1.50""#));
        assert!(paths[0].contains(r#"stroke-dasharray="30.00,30.00""#));
        assert!(!paths[1].contains("stroke-dasharray"));
    }

    #[test]
    fn test_text_is_escaped_and_anchored() {
        let mut surface = SvgSurface::new(100, 100);
        surface.style_mut().text_align = TextAlign::Center;
        surface.style_mut().font.weight = FontWeight::Bold;
        surface.fill_text("R&D <\"plan\">", 50.0, 40.0).unwrap();
        let doc = surface.finish();
        assert!(doc.contains("R&amp;D &lt;&quot;plan&quot;&gt;"));
        assert!(doc.contains(r#"text-anchor="middle""#));
        assert!(doc.contains(r#"font-weight="bold""#));
        assert!(doc.contains(r#"x="50.00" y="40.00""#));
    }
}
