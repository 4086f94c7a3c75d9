// Closed-form geometry of the hill: two cubic Bezier segments meeting at the
// peak, plus the quarter dividers and the shaded area polygon derived from them.

/// Number of interpolated samples along the curved edge of a shaded area.
pub const AREA_SAMPLES: usize = 10;

/// Peak inset used by the titled layout (the peak sits two insets below the top).
pub const DEFAULT_PEAK_INSET_FACTOR: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurvePoint {
    pub x: f64,
    pub y: f64,
}

impl CurvePoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<CurvePoint> for kurbo::Point {
    fn from(p: CurvePoint) -> Self {
        kurbo::Point::new(p.x, p.y)
    }
}

impl From<kurbo::Point> for CurvePoint {
    fn from(p: kurbo::Point) -> Self {
        CurvePoint::new(p.x, p.y)
    }
}

/// Vertical guide from a quarter point on the curve down to the base line.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Divider {
    pub top: CurvePoint,
    pub base: CurvePoint,
}

/// Evaluates a scalar cubic Bezier with end values `a`, `d` and control
/// values `b`, `c` at parameter `u`.
pub fn bezier_point(a: f64, b: f64, c: f64, d: f64, u: f64) -> f64 {
    let mu = 1.0 - u;
    mu.powi(3) * a + 3.0 * mu.powi(2) * u * b + 3.0 * mu * u.powi(2) * c + u.powi(3) * d
}

/// Clamps a fractional progress value into [0, 1]. NaN maps to 0.
pub fn clamp_progress(t: f64) -> f64 {
    if t.is_nan() {
        0.0
    } else {
        t.clamp(0.0, 1.0)
    }
}

/// Start of the quarter containing `t`. `t = 1` belongs to the last quarter:
/// an uncapped `floor(4 t) / 4` would give 1.0 there, a quarter lying wholly
/// past the right edge, and nothing visible would be shaded.
pub fn active_quarter(t: f64) -> f64 {
    let index = (clamp_progress(t) * 4.0).floor().min(3.0);
    index * 0.25
}

/// The hill curve laid out on a canvas of the given size.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct HillCurve {
    width: f64,
    height: f64,
    inset: f64,
    mid: f64,
    xoffset: f64,
    ybase: f64,
    ypeak: f64,
}

impl HillCurve {
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_peak_inset(width, height, DEFAULT_PEAK_INSET_FACTOR)
    }

    /// `peak_inset_factor` scales the top margin above the peak in units of
    /// the horizontal inset (`0.05 * width`).
    pub fn with_peak_inset(width: f64, height: f64, peak_inset_factor: f64) -> Self {
        let inset = width * 0.05;
        Self {
            width,
            height,
            inset,
            mid: width * 0.5,
            xoffset: width * 0.2,
            ybase: height - inset,
            ypeak: peak_inset_factor * inset,
        }
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn height(&self) -> f64 {
        self.height
    }

    pub fn inset(&self) -> f64 {
        self.inset
    }

    pub fn mid(&self) -> f64 {
        self.mid
    }

    pub fn ybase(&self) -> f64 {
        self.ybase
    }

    pub fn ypeak(&self) -> f64 {
        self.ypeak
    }

    /// Point on the curve at `t`. `t` is not validated; values outside
    /// [0, 1] extrapolate the outer segments.
    pub fn point_at(&self, t: f64) -> CurvePoint {
        let (w, mid, xo) = (self.width, self.mid, self.xoffset);
        let (ybase, ypeak) = (self.ybase, self.ypeak);
        if t < 0.5 {
            let u = t * 2.0;
            CurvePoint::new(
                bezier_point(0.0, xo, mid - xo, mid, u),
                bezier_point(ybase, ybase, ypeak, ypeak, u),
            )
        } else {
            let u = (t - 0.5) * 2.0;
            CurvePoint::new(
                bezier_point(mid, mid + xo, w - xo, w, u),
                bezier_point(ypeak, ypeak, ybase, ybase, u),
            )
        }
    }

    /// The two Bezier segments as `[start, ctrl1, ctrl2, end]` control polygons.
    pub fn segments(&self) -> [[CurvePoint; 4]; 2] {
        let (w, mid, xo) = (self.width, self.mid, self.xoffset);
        let (ybase, ypeak) = (self.ybase, self.ypeak);
        [
            [
                CurvePoint::new(0.0, ybase),
                CurvePoint::new(xo, ybase),
                CurvePoint::new(mid - xo, ypeak),
                CurvePoint::new(mid, ypeak),
            ],
            [
                CurvePoint::new(mid, ypeak),
                CurvePoint::new(mid + xo, ypeak),
                CurvePoint::new(w - xo, ybase),
                CurvePoint::new(w, ybase),
            ],
        ]
    }

    /// Dividers at t = 0.25, 0.5 and 0.75.
    pub fn quarter_boundaries(&self) -> [Divider; 3] {
        [0.25, 0.5, 0.75].map(|t| {
            let top = self.point_at(t);
            Divider {
                top,
                base: CurvePoint::new(top.x, self.ybase),
            }
        })
    }

    /// Closed polygon covering the area under the curve between `x1` and `x2`
    /// (curve parameters). The curved edge holds `AREA_SAMPLES` samples
    /// starting at `x1`; `x2` itself is only added as the closing corner.
    pub fn area_polygon(&self, x1: f64, x2: f64) -> Vec<CurvePoint> {
        let step = (x2 - x1) / AREA_SAMPLES as f64;
        let start = self.point_at(x1);
        let end = self.point_at(x2);

        let mut polygon = Vec::with_capacity(AREA_SAMPLES + 4);
        polygon.push(start);
        polygon.extend((0..AREA_SAMPLES).map(|i| self.point_at(x1 + step * i as f64)));
        polygon.push(end);
        polygon.push(CurvePoint::new(end.x, self.ybase));
        polygon.push(CurvePoint::new(start.x, self.ybase));
        polygon
    }
}
