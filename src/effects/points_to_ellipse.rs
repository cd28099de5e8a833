//! Circle or ellipse fitted through the nodes of a path
use crate::{
    Circle, Curve, Ellipse, EffectInput, EffectOutput, EffectType, Line, PI, ParamSet, ParamSpec,
    ParamValue, Path, PathEffect, Perspective, Point, Reason, Scalar, Segment, SubPath, Transform,
    param::impl_choice, unit_arc_path,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EllipseMethod {
    /// Circle for up to four points, ellipse otherwise
    #[default]
    Auto,
    Circle,
    /// Ellipse inscribed into parallelogram spanned by the first two edges
    IsoCircle,
    /// Ellipse inscribed into the quadrilateral of the first four points seen as a square
    PerspectiveCircle,
    /// Ellipse through the vertices of the triangle of the first three points
    SteinerEllipse,
    /// Ellipse touching midpoints of the triangle sides
    SteinerInellipse,
}

impl_choice!(EllipseMethod, {
    Auto => "auto",
    Circle => "circle",
    IsoCircle => "iso_circle",
    PerspectiveCircle => "perspective_circle",
    SteinerEllipse => "steiner_ellipse",
    SteinerInellipse => "steiner_inellipse",
});

#[derive(Debug, Clone)]
pub struct PointsToEllipse {
    pub method: EllipseMethod,
    pub gen_isometric_frame: bool,
    /// Only the arc between the first and the last point
    pub gen_arc: bool,
    pub arc_other: bool,
    /// Close the arc through the center
    pub slice_arc: bool,
    pub draw_axes: bool,
    /// Rotation of the axes in degrees
    pub rot_axes: Scalar,
    pub draw_ori_path: bool,
}

/// Nodes of the path, the last one is dropped if it repeats the first
pub fn path_points(path: &Path) -> Vec<Point> {
    let mut points = Vec::new();
    for subpath in path.subpaths() {
        points.push(subpath.start());
        points.extend(subpath.segments().iter().map(|segment| segment.end()));
    }
    if let [first, .., last] = points.as_slice() {
        if first.is_close_to(*last) {
            points.pop();
        }
    }
    points
}

/// Whether polygon goes counter-clockwise on screen (y-axis pointing down)
fn polygon_turns_ccw(points: &[Point]) -> bool {
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return false;
    };
    let mut edge = *first - *last;
    let mut sum = 0.0;
    for pair in points.windows(2) {
        let next = pair[1] - pair[0];
        sum += edge.cross(next);
        edge = next;
    }
    sum += edge.cross(*first - *last);
    sum < 0.0
}

/// Angles of the arc ends, `p0` and `p1` are relative to the center
fn endpoints_to_angles(ccw: bool, other: bool, p0: Point, p1: Point) -> (Scalar, Scalar) {
    let zero = Point::new(0.0, 0.0);
    if p0 == zero || p1 == zero {
        return (0.0, 2.0 * PI);
    }
    let (mut a0, mut a1) = (p0.angle(), p1.angle());
    if !ccw {
        std::mem::swap(&mut a0, &mut a1);
    }
    if !other {
        std::mem::swap(&mut a0, &mut a1);
    }
    (a0, a1)
}

/// Parallelogram around the unit circle
fn frame(tr: Transform) -> Option<SubPath> {
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)]
        .map(|(x, y)| tr.apply(Point::new(x, y)));
    let segments = (0..4)
        .map(|index| Segment::from(Line::new(corners[index], corners[(index + 1) % 4])))
        .collect();
    SubPath::new(segments, true)
}

/// Both diameters of the unit circle along the axes
fn axes(tr: Transform) -> impl Iterator<Item = SubPath> {
    [((-1.0, 0.0), (1.0, 0.0)), ((0.0, -1.0), (0.0, 1.0))]
        .into_iter()
        .filter_map(move |(p0, p1)| {
            let line = Line::new(tr.apply(p0.into()), tr.apply(p1.into()));
            SubPath::new(vec![Segment::from(line)], false)
        })
}

impl PointsToEllipse {
    /// Rotation applied to the unit circle before the fitted transformation
    fn rotation(&self) -> Transform {
        Transform::new_rotate(-self.rot_axes.to_radians())
    }

    fn fit(&self, points: &[Point]) -> Result<(Transform, Scalar, Scalar), Reason> {
        let too_few = |required| Reason::TooFewPoints {
            required,
            found: points.len(),
        };
        let full = (0.0, 2.0 * PI);
        match points.len() {
            0 | 1 => return Err(too_few(2)),
            2 => {
                let circle = Circle::from_diameter(points[0], points[1])
                    .ok_or(Reason::Degenerate("coincident points"))?;
                return Ok((circle.unit_transform() * self.rotation(), full.0, full.1));
            }
            _ => {}
        }
        let first = points[0];
        let last = points[points.len() - 1];
        let ccw = polygon_turns_ccw(points);
        if points.len() >= 5 && self.method == EllipseMethod::Auto {
            let ellipse = Ellipse::fit(points).ok_or(Reason::Degenerate("ellipse fit failed"))?;
            let tr = ellipse.unit_transform() * self.rotation();
            let (a0, a1) = match tr.invert() {
                Some(inverse) if self.gen_arc => endpoints_to_angles(
                    ccw,
                    self.arc_other,
                    inverse.apply(first),
                    inverse.apply(last),
                ),
                _ => full,
            };
            Ok((tr, a0, a1))
        } else {
            let circle = Circle::fit(points).ok_or(Reason::Degenerate("circle fit failed"))?;
            let (a0, a1) = if self.gen_arc {
                endpoints_to_angles(
                    ccw,
                    self.arc_other,
                    first - circle.center,
                    last - circle.center,
                )
            } else {
                full
            };
            Ok((circle.unit_transform() * self.rotation(), a0, a1))
        }
    }

    fn isometric(&self, points: &[Point]) -> Result<Transform, Reason> {
        let [p0, p1, p2, ..] = points else {
            return Err(Reason::TooFewPoints {
                required: 3,
                found: points.len(),
            });
        };
        let e0 = *p0 - *p1;
        let e1 = *p2 - *p1;
        let cross = e0.cross(e1);
        let (Some(u0), Some(u1)) = (e0.normalize(), e1.normalize()) else {
            return Err(Reason::Degenerate("zero length edge"));
        };
        if cross.abs() < 1e-9 {
            return Err(Reason::Degenerate("parallel edges"));
        }
        let mut shear_angle = u0.dot(u1).clamp(-1.0, 1.0).acos() - PI / 2.0;
        if cross < 0.0 {
            shear_angle = -shear_angle;
        }
        let half_width = e0.length() / 2.0;
        let half_height = (e1 - u0.dot(e1) * u0).length() / 2.0;
        let center = *p1 + 0.5 * (e0 + e1);
        Ok(Transform::new_translate(center.x(), center.y())
            .rotate(e0.angle())
            .matmul(Transform::new_shear(-shear_angle.tan()))
            .scale(half_width, half_height)
            * self.rotation())
    }

    fn perspective(&self, points: &[Point]) -> Result<Transform, Reason> {
        let [p0, p1, p2, p3, ..] = points else {
            return Err(Reason::TooFewPoints {
                required: 4,
                found: points.len(),
            });
        };
        let ellipse = Perspective::from_square([*p0, *p1, *p2, *p3])
            .ok_or(Reason::Degenerate("quadrilateral is not convex"))?
            .inscribed_ellipse()
            .ok_or(Reason::Degenerate("ellipse fit failed"))?;
        Ok(ellipse.unit_transform() * self.rotation())
    }

    fn steiner(&self, points: &[Point], inellipse: bool) -> Result<Transform, Reason> {
        let [p0, p1, p2, ..] = points else {
            return Err(Reason::TooFewPoints {
                required: 3,
                found: points.len(),
            });
        };
        let center = (*p0 + *p1 + *p2) / 3.0;
        let f1 = *p2 - center;
        let f2 = (*p1 - *p0) / 3.0f64.sqrt();
        let denominator = f1.dot(f1) - f2.dot(f2);
        let t0 = if denominator.abs() > 1e-12 {
            (2.0 * f1.dot(f2) / denominator).atan() / 2.0
        } else {
            0.0
        };
        let eval = |t: Scalar| t.cos() * f1 + t.sin() * f2;
        let (axis0, axis1) = (eval(t0), eval(t0 + PI / 2.0));
        let (mut l0, mut l1) = (axis0.length(), axis1.length());
        let mut angle = axis0.angle();
        if l1 > l0 {
            std::mem::swap(&mut l0, &mut l1);
            angle += PI / 2.0;
        }
        if l1 < 1e-9 {
            return Err(Reason::Degenerate("collinear points"));
        }
        if inellipse {
            l0 /= 2.0;
            l1 /= 2.0;
        }
        Ok(Transform::new_translate(center.x(), center.y())
            .rotate(angle)
            .scale(l0, l1)
            * self.rotation())
    }

    /// Ellipse and overlays, `Err` carries the reason to leave the path unchanged
    fn generate(&self, path: &Path) -> Result<Path, Reason> {
        let points = path_points(path);
        let (tr, a0, a1) = match self.method {
            EllipseMethod::IsoCircle => (self.isometric(&points)?, 0.0, 2.0 * PI),
            EllipseMethod::PerspectiveCircle => (self.perspective(&points)?, 0.0, 2.0 * PI),
            EllipseMethod::SteinerEllipse => (self.steiner(&points, false)?, 0.0, 2.0 * PI),
            EllipseMethod::SteinerInellipse => (self.steiner(&points, true)?, 0.0, 2.0 * PI),
            EllipseMethod::Auto | EllipseMethod::Circle => self.fit(&points)?,
        };
        let mut output = if self.draw_ori_path {
            path.clone()
        } else {
            Path::empty()
        };
        output.push(unit_arc_path(a0, a1, self.slice_arc, tr).ok_or(Reason::Degenerate("empty arc"))?);
        if self.gen_isometric_frame {
            output.extend(frame(tr));
        }
        if self.draw_axes {
            output.extend(axes(tr));
        }
        Ok(output)
    }
}

impl PathEffect for PointsToEllipse {
    const TYPE: EffectType = EffectType::PointsToEllipse;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::choice("method", EllipseMethod::KEYS, "auto"),
            ParamSpec::bool("gen_isometric_frame", false),
            ParamSpec::bool("gen_arc", false),
            ParamSpec::bool("arc_other", false),
            ParamSpec::bool("slice_arc", false),
            ParamSpec::bool("draw_axes", false),
            ParamSpec::scalar("rot_axes", 0.0).range(-360.0, 360.0),
            ParamSpec::bool("draw_ori_path", false),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            method: EllipseMethod::default(),
            gen_isometric_frame: false,
            gen_arc: false,
            arc_other: false,
            slice_arc: false,
            draw_axes: false,
            rot_axes: 0.0,
            draw_ori_path: false,
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.method = params.choice("method").unwrap_or(self.method);
        self.gen_isometric_frame = params
            .bool("gen_isometric_frame")
            .unwrap_or(self.gen_isometric_frame);
        self.gen_arc = params.bool("gen_arc").unwrap_or(self.gen_arc);
        self.arc_other = params.bool("arc_other").unwrap_or(self.arc_other);
        self.slice_arc = params.bool("slice_arc").unwrap_or(self.slice_arc);
        self.draw_axes = params.bool("draw_axes").unwrap_or(self.draw_axes);
        self.rot_axes = params.scalar("rot_axes").unwrap_or(self.rot_axes);
        self.draw_ori_path = params.bool("draw_ori_path").unwrap_or(self.draw_ori_path);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("method", ParamValue::Enum(self.method.key().to_owned()))
            .with("gen_isometric_frame", ParamValue::Bool(self.gen_isometric_frame))
            .with("gen_arc", ParamValue::Bool(self.gen_arc))
            .with("arc_other", ParamValue::Bool(self.arc_other))
            .with("slice_arc", ParamValue::Bool(self.slice_arc))
            .with("draw_axes", ParamValue::Bool(self.draw_axes))
            .with("rot_axes", ParamValue::Scalar(self.rot_axes))
            .with("draw_ori_path", ParamValue::Bool(self.draw_ori_path))
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        if input.path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        match self.generate(&input.path) {
            Ok(output) => EffectOutput::applied(output),
            Err(reason) => EffectOutput::unchanged(&input.path, reason),
        }
    }
}
