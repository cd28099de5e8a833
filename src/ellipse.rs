use crate::{
    BBox, Cubic, Curve, Line, Point, Scalar, Segment, SubPath, Transform, PI, calc_delta_angle,
    range2pi,
};
use std::fmt;

/// Elliptical Arc
#[derive(Clone, Copy, PartialEq)]
pub struct EllipArc {
    /// center of the ellipse
    center: Point,
    /// radius along x-axis before the rotation
    rx: Scalar,
    /// radius along y-axis before the rotation
    ry: Scalar,
    /// rotation
    phi: Scalar,
    /// angular start
    eta: Scalar,
    /// angular size
    eta_delta: Scalar,
}

impl fmt::Debug for EllipArc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Arc center:{:?} radius:{:?} phi:{:.3?} eta:{:.3?} eta_delta:{:.3?}",
            self.center,
            Point([self.rx, self.ry]),
            self.phi,
            self.eta,
            self.eta_delta
        )
    }
}

impl EllipArc {
    /// Circular arc with `center` and `radius`, starting at angle `eta` and sweeping `eta_delta`
    pub fn new_circular(center: Point, radius: Scalar, eta: Scalar, eta_delta: Scalar) -> Self {
        Self {
            center,
            rx: radius,
            ry: radius,
            phi: 0.0,
            eta,
            eta_delta,
        }
    }

    /// Convert arc from SVG arguments to parametric curve
    ///
    /// This code mostly comes from arc implementation notes from svg sepc
    /// (Arc to Parametric)[https://www.w3.org/TR/SVG/implnote.html#ArcImplementationNotes]
    pub fn new_param(
        src: Point,
        dst: Point,
        rx: Scalar,
        ry: Scalar,
        x_axis_rot: Scalar,
        large_flag: bool,
        sweep_flag: bool,
    ) -> Option<Self> {
        let rx = rx.abs();
        let ry = ry.abs();
        let phi = x_axis_rot * PI / 180.0;

        // Eq 5.1
        let Point([x1, y1]) = Transform::new_rotate(-phi).apply(0.5 * (src - dst));
        // scale/normalize radii
        let s = (x1 / rx).powi(2) + (y1 / ry).powi(2);
        let (rx, ry) = if s > 1.0 {
            let s = s.sqrt();
            (rx * s, ry * s)
        } else {
            (rx, ry)
        };
        // Eq 5.2
        let sq = ((rx * ry).powi(2) / ((rx * y1).powi(2) + (ry * x1).powi(2)) - 1.0)
            .max(0.0)
            .sqrt();
        let sq = if large_flag == sweep_flag { -sq } else { sq };
        let center = sq * Point([rx * y1 / ry, -ry * x1 / rx]);
        let Point([cx, cy]) = center;
        // Eq 5.3 convert center to initail coordinates
        let center = Transform::new_rotate(phi).apply(center) + 0.5 * (dst + src);
        // Eq 5.5-6
        let v0 = Point([1.0, 0.0]);
        let v1 = Point([(x1 - cx) / rx, (y1 - cy) / ry]);
        let v2 = Point([(-x1 - cx) / rx, (-y1 - cy) / ry]);
        // initial angle
        let eta = v0.angle_between(v1)?;
        //delta angle to be covered when t changes from 0..1
        let eta_delta = v1.angle_between(v2)?.rem_euclid(2.0 * PI);
        let eta_delta = if !sweep_flag && eta_delta > 0.0 {
            eta_delta - 2.0 * PI
        } else if sweep_flag && eta_delta < 0.0 {
            eta_delta + 2.0 * PI
        } else {
            eta_delta
        };
        if !center.is_finite() {
            return None;
        }

        Some(Self {
            center,
            rx,
            ry,
            phi,
            eta,
            eta_delta,
        })
    }

    pub fn at(&self, t: Scalar) -> Point {
        let (angle_sin, angle_cos) = (self.eta + t * self.eta_delta).sin_cos();
        let point = Point([self.rx * angle_cos, self.ry * angle_sin]);
        Transform::new_rotate(self.phi).apply(point) + self.center
    }

    pub fn start(&self) -> Point {
        self.at(0.0)
    }

    pub fn end(&self) -> Point {
        self.at(1.0)
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn bbox(&self, init: Option<BBox>) -> BBox {
        self.to_cubics()
            .fold(init, |bbox, cubic| Some(cubic.bbox(bbox)))
            .unwrap_or_else(|| BBox::new(self.start(), self.end()))
    }

    pub fn reverse(&self) -> Self {
        Self {
            center: self.center,
            rx: self.rx,
            ry: self.ry,
            phi: self.phi,
            eta: self.eta + self.eta_delta,
            eta_delta: -self.eta_delta,
        }
    }

    /// Convert elliptic arc to an iterator over Cubic segments
    pub fn to_cubics(&self) -> EllipArcCubicIter {
        EllipArcCubicIter::new(*self)
    }
}

/// Approximate arc with a sequnce of cubic bezier curves
///
/// [Drawing an elliptical arc using polylines, quadratic or cubic Bezier curves]
/// (http://www.spaceroots.org/documents/ellipse/elliptical-arc.pdf)
///
/// Arc is split in segments not larger than `pi / 2`, each segment from `eta_1`
/// to `eta_2` is approximated by:
///     P0 = A(eta_1)
///     P1 = P0 + alpha * A'(eta_1)
///     P2 = P3 - alpha * A'(eta_2)
///     P3 = A(eta_2)
/// where
///     A - arc parametrized by angle
///     A' - derivative of arc parametrized by angle
///     alpha = 4/3 * tan((eta_2 - eta_1) / 4)
pub struct EllipArcCubicIter {
    arc: EllipArc,
    phi_tr: Transform,
    segment_delta: Scalar,
    segment_index: Scalar,
    segment_count: Scalar,
}

impl EllipArcCubicIter {
    fn new(arc: EllipArc) -> Self {
        let phi_tr = Transform::new_rotate(arc.phi);
        let segment_max_angle = PI / 2.0; // maximum `eta_delta` of a segment
        let segment_count = (arc.eta_delta.abs() / segment_max_angle - 1e-9).ceil().max(1.0);
        let segment_delta = arc.eta_delta / segment_count;
        Self {
            arc,
            phi_tr,
            segment_delta,
            segment_index: 0.0,
            segment_count: segment_count - 1.0,
        }
    }

    fn at(&self, alpha: Scalar) -> (Point, Point) {
        let (sin, cos) = alpha.sin_cos();
        let at = self
            .phi_tr
            .apply(Point([self.arc.rx * cos, self.arc.ry * sin]))
            + self.arc.center;
        let at_deriv = self
            .phi_tr
            .apply(Point([-self.arc.rx * sin, self.arc.ry * cos]));
        (at, at_deriv)
    }
}

impl Iterator for EllipArcCubicIter {
    type Item = Cubic;

    fn next(&mut self) -> Option<Self::Item> {
        if self.segment_index > self.segment_count {
            return None;
        }
        let eta_1 = self.arc.eta + self.segment_delta * self.segment_index;
        let eta_2 = eta_1 + self.segment_delta;
        self.segment_index += 1.0;

        let alpha = arc_handle_length(eta_2 - eta_1);
        let (p0, d0) = self.at(eta_1);
        let (p3, d3) = self.at(eta_2);
        let p1 = p0 + alpha * d0;
        let p2 = p3 - alpha * d3;
        Some(Cubic([p0, p1, p2, p3]))
    }
}

/// Relative handle length of a cubic approximating circular arc with `sweep` angle
#[inline]
pub fn arc_handle_length(sweep: Scalar) -> Scalar {
    4.0 / 3.0 * (sweep / 4.0).tan()
}

/// Arc of the unit circle from angle `start` to angle `end` (counter-clockwise),
/// mapped to the world space by `tr`.
///
/// Segments span at most `pi / 2`, full turn is always emitted as four quadrants.
/// With `slice` the arc is closed with two lines through the center. Returns `None`
/// if the sweep is zero.
pub fn unit_arc_path(start: Scalar, end: Scalar, slice: bool, tr: Transform) -> Option<SubPath> {
    let sweep = calc_delta_angle(start, end);
    if sweep.abs() < 1e-9 {
        tracing::debug!("[unit_arc_path] zero sweep");
        return None;
    }
    let closed = (sweep - 2.0 * PI).abs() < 1e-8;
    let (count, delta) = if closed {
        (4, PI / 2.0)
    } else {
        let count = (sweep / (PI / 2.0)).ceil() as usize;
        (count, sweep / count as Scalar)
    };

    let start = range2pi(start);
    let end = start + sweep;
    let mut segments: Vec<Segment> = Vec::with_capacity(count + 2);
    for index in 0..count {
        let s = start + index as Scalar * delta;
        let e = (s + delta).min(end);
        let len = arc_handle_length(e - s);
        let p0 = Point::polar(s, 1.0);
        let p3 = Point::polar(e, 1.0);
        let p1 = p0 + Point::polar(s + PI / 2.0, len);
        let p2 = p3 + Point::polar(e - PI / 2.0, len);
        segments.push(Cubic::new(p0, p1, p2, p3).transform(tr).into());
    }
    if closed {
        // snap the seam so the closure is exact
        let first = segments.first().map(Curve::start);
        if let (Some(Segment::Cubic(last)), Some(first)) = (segments.last_mut(), first) {
            last.0[3] = first;
        }
    } else if slice {
        let center = tr.apply(Point::new(0.0, 0.0));
        let arc_start = tr.apply(Point::polar(start, 1.0));
        let arc_end = tr.apply(Point::polar(end, 1.0));
        segments.push(Line::new(arc_end, center).into());
        segments.push(Line::new(center, arc_start).into());
    }
    SubPath::new(segments, closed || slice)
}

/// Ellipse given by its center, radii and rotation of the `rx` axis
#[derive(Clone, Copy, PartialEq)]
pub struct Ellipse {
    center: Point,
    rx: Scalar,
    ry: Scalar,
    angle: Scalar,
}

impl fmt::Debug for Ellipse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ellipse center:{:?} radius:{:?} angle:{:.3?}",
            self.center,
            Point([self.rx, self.ry]),
            self.angle
        )
    }
}

impl Ellipse {
    pub fn new(center: Point, rx: Scalar, ry: Scalar, angle: Scalar) -> Self {
        Self {
            center,
            rx,
            ry,
            angle,
        }
    }

    pub fn center(&self) -> Point {
        self.center
    }

    pub fn radii(&self) -> (Scalar, Scalar) {
        (self.rx, self.ry)
    }

    pub fn angle(&self) -> Scalar {
        self.angle
    }

    /// Transformation mapping the unit circle onto this ellipse
    pub fn unit_transform(&self) -> Transform {
        Transform::new_translate(self.center.x(), self.center.y())
            .rotate(self.angle)
            .scale(self.rx, self.ry)
    }

    /// Point on the ellipse at parametric angle `t`
    pub fn at(&self, t: Scalar) -> Point {
        self.unit_transform().apply(Point::polar(t, 1.0))
    }

    /// Closed path of four cubic segments
    pub fn to_subpath(&self) -> Option<SubPath> {
        unit_arc_path(0.0, 2.0 * PI, false, self.unit_transform())
    }
}
