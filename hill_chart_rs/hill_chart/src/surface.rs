//! Canvas-like drawing surface with scoped style state.
//!
//! A surface keeps a current [`StyleState`] plus a stack of saved states.
//! Drawing code never calls `save`/`restore` directly; it opens a
//! [`StyleScope`], which restores the previous state when dropped, so a
//! step that bails out early with `?` cannot leak its style into later steps.

use std::ops::{Deref, DerefMut};

use kurbo::{BezPath, Ellipse, PathEl, Point, Rect, Shape};

use crate::curve::CurvePoint;
use crate::theme::Color;
use crate::HillChartError;

/// Maximum distance between a curve and its flattened polyline, in pixels.
pub const FLATTEN_TOLERANCE: f64 = 0.1;
/// Accuracy of the cubic arcs that approximate an ellipse.
const ELLIPSE_TOLERANCE: f64 = 1e-3;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Font {
    pub family: String,
    pub size: f64,
    pub weight: FontWeight,
}

impl Default for Font {
    fn default() -> Self {
        Self {
            family: "sans-serif".to_string(),
            size: 10.0,
            weight: FontWeight::Normal,
        }
    }
}

/// Style attributes affected by save/restore.
#[derive(Clone, Debug, PartialEq)]
pub struct StyleState {
    pub fill: Color,
    pub stroke: Color,
    pub line_width: f64,
    /// Alternating on/off lengths; empty means solid.
    pub line_dash: Vec<f64>,
    pub font: Font,
    pub text_align: TextAlign,
}

impl Default for StyleState {
    fn default() -> Self {
        Self {
            fill: Color::BLACK,
            stroke: Color::BLACK,
            line_width: 1.0,
            line_dash: Vec::new(),
            font: Font::default(),
            text_align: TextAlign::Left,
        }
    }
}

/// Current style plus the stack of saved styles.
#[derive(Clone, Debug, Default)]
pub struct StyleStack {
    current: StyleState,
    saved: Vec<StyleState>,
}

impl StyleStack {
    pub fn current(&self) -> &StyleState {
        &self.current
    }

    pub fn current_mut(&mut self) -> &mut StyleState {
        &mut self.current
    }

    pub fn save(&mut self) {
        self.saved.push(self.current.clone());
    }

    /// Restoring with nothing saved leaves the style untouched.
    pub fn restore(&mut self) {
        if let Some(previous) = self.saved.pop() {
            self.current = previous;
        }
    }

    pub fn depth(&self) -> usize {
        self.saved.len()
    }
}

/// Path under construction. Curves stay curves until a raster surface
/// flattens them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Path {
    inner: BezPath,
}

/// A flattened subpath.
#[derive(Clone, Debug, PartialEq)]
pub struct Polyline {
    pub points: Vec<CurvePoint>,
    pub closed: bool,
}

impl Path {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn move_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.inner.move_to((x, y));
        self
    }

    pub fn line_to(&mut self, x: f64, y: f64) -> &mut Self {
        self.inner.line_to((x, y));
        self
    }

    pub fn bezier_curve_to(
        &mut self,
        cp1: CurvePoint,
        cp2: CurvePoint,
        end: CurvePoint,
    ) -> &mut Self {
        self.inner
            .curve_to(Point::from(cp1), Point::from(cp2), Point::from(end));
        self
    }

    /// Adds a full ellipse as its own closed subpath of cubic arcs.
    pub fn ellipse(&mut self, center: CurvePoint, rx: f64, ry: f64) -> &mut Self {
        let ellipse = Ellipse::new(Point::from(center), (rx, ry), 0.0);
        self.inner.extend(ellipse.path_elements(ELLIPSE_TOLERANCE));
        self
    }

    pub fn close_path(&mut self) -> &mut Self {
        self.inner.close_path();
        self
    }

    pub fn elements(&self) -> &[PathEl] {
        self.inner.elements()
    }

    /// SVG path data (`M … L … C … Z`) at full precision.
    pub fn to_svg(&self) -> String {
        self.inner.to_svg()
    }

    pub fn bounds(&self) -> Rect {
        self.inner.bounding_box()
    }

    /// The "on" pieces of the path under a canvas-style dash pattern.
    /// Patterns rejected by [`is_dash_pattern`] leave the path solid.
    pub fn dashed(&self, pattern: &[f64]) -> Path {
        if !is_dash_pattern(pattern) {
            return self.clone();
        }
        Path {
            inner: kurbo::dash(self.inner.iter(), 0.0, pattern).collect(),
        }
    }

    /// Flattens the path into polylines within [`FLATTEN_TOLERANCE`].
    pub fn flatten(&self) -> Vec<Polyline> {
        let mut out: Vec<Polyline> = Vec::new();
        let mut current: Vec<CurvePoint> = Vec::new();

        // single points (a bare move_to) draw nothing
        let finish = |points: &mut Vec<CurvePoint>, closed: bool, out: &mut Vec<Polyline>| {
            let points = std::mem::take(points);
            if points.len() > 1 {
                out.push(Polyline { points, closed });
            }
        };

        kurbo::flatten(self.inner.iter(), FLATTEN_TOLERANCE, |el| match el {
            PathEl::MoveTo(p) => {
                finish(&mut current, false, &mut out);
                current.push(p.into());
            }
            PathEl::LineTo(p) => current.push(p.into()),
            PathEl::ClosePath => {
                let first = current.first().copied();
                finish(&mut current, true, &mut out);
                // drawing continues from the start of the closed subpath
                if let Some(first) = first {
                    current.push(first);
                }
            }
            // flatten only emits lines
            PathEl::QuadTo(_, p) | PathEl::CurveTo(_, _, p) => current.push(p.into()),
        });
        finish(&mut current, false, &mut out);
        out
    }
}

/// Whether `pattern` dashes a stroke. Empty, negative, non-finite and
/// all-zero patterns mean a solid line.
pub fn is_dash_pattern(pattern: &[f64]) -> bool {
    pattern.iter().all(|len| *len >= 0.0 && len.is_finite())
        && pattern.iter().any(|len| *len > 0.0)
}

/// A stateful 2D drawing target.
///
/// Implementations draw with the current style: `fill_*` use the fill color,
/// `stroke_path` uses the stroke color, line width and dash pattern, and
/// `fill_text` uses the font, fill color and text alignment. Text is placed
/// with its baseline at `y`.
pub trait DrawingSurface {
    fn size(&self) -> (u32, u32);

    fn styles(&self) -> &StyleStack;

    fn styles_mut(&mut self) -> &mut StyleStack;

    fn fill_rect(&mut self, x: f64, y: f64, w: f64, h: f64) -> Result<(), HillChartError>;

    fn fill_path(&mut self, path: &Path) -> Result<(), HillChartError>;

    fn stroke_path(&mut self, path: &Path) -> Result<(), HillChartError>;

    fn fill_text(&mut self, text: &str, x: f64, y: f64) -> Result<(), HillChartError>;

    fn style(&self) -> &StyleState {
        self.styles().current()
    }

    fn style_mut(&mut self) -> &mut StyleState {
        self.styles_mut().current_mut()
    }

    fn save(&mut self) {
        self.styles_mut().save();
    }

    fn restore(&mut self) {
        self.styles_mut().restore();
    }
}

/// Saves the surface style on creation and restores it on drop.
pub struct StyleScope<'a, S: DrawingSurface + ?Sized> {
    surface: &'a mut S,
}

impl<'a, S: DrawingSurface + ?Sized> StyleScope<'a, S> {
    pub fn new(surface: &'a mut S) -> Self {
        surface.save();
        Self { surface }
    }
}

impl<S: DrawingSurface + ?Sized> Deref for StyleScope<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> DerefMut for StyleScope<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.surface
    }
}

impl<S: DrawingSurface + ?Sized> Drop for StyleScope<'_, S> {
    fn drop(&mut self) {
        self.surface.restore();
    }
}
