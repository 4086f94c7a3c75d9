//! Hill chart composition: the ordered draw steps issued against a surface.

use plotters::prelude::BitMapBackend;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::backend::PlottersSurface;
use crate::curve::{active_quarter, clamp_progress, HillCurve};
use crate::format::{encode_rgb, ImageFormat};
use crate::surface::{DrawingSurface, FontWeight, Path, StyleScope, TextAlign};
use crate::svg::SvgSurface;
use crate::theme::Theme;
use crate::HillChartError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    pub title: Option<String>,
    pub show_labels: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            title: None,
            show_labels: true,
        }
    }
}

impl RenderOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_labels(mut self, show_labels: bool) -> Self {
        self.show_labels = show_labels;
        self
    }

    /// The title to draw, if any. Empty titles count as missing.
    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref().filter(|title| !title.is_empty())
    }
}

/// Draws hill charts with a fixed, validated theme.
#[derive(Clone, Debug, Default)]
pub struct Renderer {
    theme: Theme,
}

impl Renderer {
    /// Fails with [`HillChartError::InvalidTheme`] if `theme` does not validate.
    pub fn new(theme: Theme) -> Result<Self, HillChartError> {
        theme.validate()?;
        Ok(Self { theme })
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Renders the chart for progress `t` and encodes it. `t` is clamped.
    pub fn render(
        &self,
        t: f64,
        format: ImageFormat,
        options: &RenderOptions,
    ) -> Result<Vec<u8>, HillChartError> {
        let dims = self.theme.dimensions();
        let size = (dims.width, dims.height);
        match format {
            ImageFormat::Svg => {
                let mut surface = SvgSurface::new(dims.width, dims.height);
                self.draw(&mut surface, t, options)?;
                let svg = surface.finish();
                debug!(bytes = svg.len(), "rendered SVG document");
                Ok(svg.into_bytes())
            }
            ImageFormat::Png | ImageFormat::Jpeg => {
                let mut buf = allocate_rgb(dims.width, dims.height)?;
                {
                    let mut surface =
                        PlottersSurface::new(BitMapBackend::with_buffer(&mut buf, size))?;
                    self.draw(&mut surface, t, options)?;
                    surface.finish()?;
                }
                let bytes = encode_rgb(format, &buf, dims.width, dims.height)?;
                debug!(%format, bytes = bytes.len(), "encoded raster image");
                Ok(bytes)
            }
        }
    }

    /// Composes the chart for progress `t` onto `surface`. `t` is clamped.
    pub fn draw<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        t: f64,
        options: &RenderOptions,
    ) -> Result<(), HillChartError> {
        let t = clamp_progress(t);
        let (width, height) = surface.size();
        let curve = HillCurve::with_peak_inset(
            width as f64,
            height as f64,
            self.theme.peak_inset_factor,
        );
        let sx = active_quarter(t);
        debug!(t, quarter = sx, width, height, "drawing hill chart");

        self.draw_background(surface, &curve)?;
        self.draw_area_under_curve(surface, &curve, sx, sx + 0.25)?;
        self.draw_curve(surface, &curve)?;
        self.draw_marker(surface, &curve, t)?;
        if options.show_labels {
            self.draw_labels(surface, &curve)?;
        }
        if let Some(title) = options.title_text() {
            self.draw_title(surface, &curve, title)?;
        }
        Ok(())
    }

    fn draw_background<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        curve: &HillCurve,
    ) -> Result<(), HillChartError> {
        let mut ctx = StyleScope::new(surface);
        ctx.style_mut().fill = self.theme.background;
        ctx.fill_rect(0.0, 0.0, curve.width(), curve.height())
    }

    fn draw_area_under_curve<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        curve: &HillCurve,
        x1: f64,
        x2: f64,
    ) -> Result<(), HillChartError> {
        let polygon = curve.area_polygon(x1, x2);
        let mut path = Path::new();
        path.move_to(polygon[0].x, polygon[0].y);
        for p in &polygon[1..] {
            path.line_to(p.x, p.y);
        }
        path.close_path();

        let mut ctx = StyleScope::new(surface);
        ctx.style_mut().fill = self.theme.hill_fill;
        ctx.fill_path(&path)
    }

    fn draw_curve<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        curve: &HillCurve,
    ) -> Result<(), HillChartError> {
        {
            let dash = 0.5 * curve.inset();
            let mut ctx = StyleScope::new(&mut *surface);
            let style = ctx.style_mut();
            style.stroke = self.theme.divider_stroke;
            style.line_dash = vec![dash, dash];
            style.line_width = self.theme.scaled(self.theme.divider_width);
            // centre divider first, then the outer two
            let [q1, q2, q3] = curve.quarter_boundaries();
            for divider in [q2, q1, q3] {
                let mut path = Path::new();
                path.move_to(divider.base.x, divider.base.y)
                    .line_to(divider.top.x, divider.top.y);
                ctx.stroke_path(&path)?;
            }
        }

        let [first, second] = curve.segments();
        let mut path = Path::new();
        path.move_to(first[0].x, first[0].y)
            .bezier_curve_to(first[1], first[2], first[3])
            .bezier_curve_to(second[1], second[2], second[3]);

        let mut ctx = StyleScope::new(surface);
        let style = ctx.style_mut();
        style.stroke = self.theme.curve_stroke;
        style.line_width = self.theme.scaled(self.theme.curve_width);
        ctx.stroke_path(&path)
    }

    fn draw_marker<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        curve: &HillCurve,
        t: f64,
    ) -> Result<(), HillChartError> {
        let center = curve.point_at(t);
        let radius = self.marker_radius(curve.width());
        let mut path = Path::new();
        path.ellipse(center, radius, radius);

        let mut ctx = StyleScope::new(surface);
        let style = ctx.style_mut();
        style.fill = self.theme.marker_fill;
        style.stroke = self.theme.marker_outline;
        style.line_width = self.theme.scaled(self.theme.marker_outline_width);
        ctx.fill_path(&path)?;
        ctx.stroke_path(&path)
    }

    /// Marker radius for a canvas of the given width.
    pub fn marker_radius(&self, width: f64) -> f64 {
        let min_diameter = self.theme.scaled(self.theme.min_marker_diameter);
        0.5 * min_diameter.max(width * self.theme.marker_fraction)
    }

    fn draw_labels<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        curve: &HillCurve,
    ) -> Result<(), HillChartError> {
        let text_size = self.theme.scaled(self.theme.label_size);
        let left = curve.point_at(0.25);
        let right = curve.point_at(0.75);
        let baseline = curve.ybase() + text_size;

        let mut ctx = StyleScope::new(surface);
        let style = ctx.style_mut();
        style.text_align = TextAlign::Center;
        style.font.family = self.theme.font_family.clone();
        style.font.size = text_size;
        style.font.weight = FontWeight::Normal;
        // both labels share one color whatever the active quarter
        style.fill = self.theme.label_color;
        ctx.fill_text(&self.theme.labels[0], left.x, baseline)?;
        ctx.fill_text(&self.theme.labels[1], right.x, baseline)
    }

    fn draw_title<S: DrawingSurface + ?Sized>(
        &self,
        surface: &mut S,
        curve: &HillCurve,
        title: &str,
    ) -> Result<(), HillChartError> {
        let mut ctx = StyleScope::new(surface);
        let style = ctx.style_mut();
        style.text_align = TextAlign::Left;
        style.font.family = self.theme.font_family.clone();
        style.font.size = self.theme.scaled(self.theme.title_size);
        style.font.weight = FontWeight::Bold;
        style.fill = self.theme.title_color;
        ctx.fill_text(title, curve.inset(), curve.inset())
    }
}

/// Zeroed RGB8 pixel buffer. Allocation failure is reported, not aborted on.
fn allocate_rgb(width: u32, height: u32) -> Result<Vec<u8>, HillChartError> {
    let len = (width as usize)
        .checked_mul(height as usize)
        .and_then(|px| px.checked_mul(3))
        .ok_or(HillChartError::Allocation { width, height })?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len)
        .map_err(|_| HillChartError::Allocation { width, height })?;
    buf.resize(len, 0);
    Ok(buf)
}
