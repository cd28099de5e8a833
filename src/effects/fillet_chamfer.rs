//! Rounding and cutting of path corners
//!
//! Every node carries a [`Satellite`] describing how far from the node the corner
//! starts and which kind of corner replaces it. The corner is built between the
//! trim point on the incoming curve and the trim point on the outgoing curve.
use super::satellite::{
    Satellite, SatelliteArray, SatelliteKind, corner_rays, is_ccw_toggle, rad_to_len, rays_angle,
    to_size, to_time,
};
use crate::{
    Cubic, Curve, EllipArc, EffectInput, EffectOutput, EffectType, Environment, Line, ParamSet,
    ParamSpec, ParamValue, Path, PathEffect, Point, Reason, Scalar, Segment, SubPath,
    param::impl_choice,
};
use std::borrow::Cow;

/// Handle length of a cubic approximating quarter circle of unit radius
const K: Scalar = 4.0 / 3.0 * (std::f64::consts::SQRT_2 - 1.0);
/// Offset used to get a tangent direction at the very end of a curve
const GAP_HELPER: Scalar = 1e-5;
/// Pieces smaller than this are not emitted
const DEGENERATE_SIZE: Scalar = 1e-9;

/// How corners between straight segments are built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilletMethod {
    /// Circular arc between lines, cubic otherwise
    #[default]
    Auto,
    Arc,
    Bezier,
}

impl_choice!(FilletMethod, {
    Auto => "auto",
    Arc => "arc",
    Bezier => "bezier",
});

#[derive(Debug, Clone)]
pub struct FilletChamfer {
    pub method: FilletMethod,
    /// Radius applied to satellites, percent of the segment when `flexible`
    pub radius: Scalar,
    pub chamfer_steps: usize,
    pub flexible: bool,
    pub mirror_knots: bool,
    pub only_selected: bool,
    pub use_knot_distance: bool,
    pub hide_knots: bool,
    pub apply_no_radius: bool,
    pub apply_with_radius: bool,
    pub helper_size: Scalar,
    pub satellites: SatelliteArray,
    /// Radius last written to the satellites
    applied_radius: Option<Scalar>,
    /// Path satellites were last reconciled with
    last_path: Option<Path>,
}

impl FilletChamfer {
    /// Satellite given to nodes which do not have one yet
    pub fn template(&self) -> Satellite {
        Satellite {
            is_time: self.flexible,
            has_mirror: self.mirror_knots,
            hidden: self.hide_knots,
            steps: self.chamfer_steps,
            ..Satellite::new(SatelliteKind::Fillet)
        }
    }

    /// Set kind of every satellite
    pub fn set_kind(&mut self, kind: SatelliteKind) {
        let only_selected = self.only_selected;
        for satellite in self.satellites.iter_mut() {
            if !only_selected || satellite.active {
                satellite.kind = kind;
            }
        }
    }

    /// Apply current radius to satellites of `path`
    ///
    /// Amount is the distance at which a fillet of the radius touches the outgoing
    /// segment, or the radius itself when `use_knot_distance` or `flexible` is set.
    /// End nodes of open sub-paths always get zero amount.
    pub fn update_amount(&mut self, path: &Path) {
        let power = if self.flexible {
            self.radius / 100.0
        } else {
            self.radius
        };
        let by_distance = self.use_knot_distance || self.flexible;
        for (subpath, satellites) in path.subpaths().iter().zip(self.satellites.subpaths_mut()) {
            let segments = subpath.segments();
            for (index, satellite) in satellites.iter_mut().enumerate() {
                let incoming = match index {
                    0 if subpath.closed() => segments.last(),
                    0 => None,
                    _ => segments.get(index - 1),
                };
                let (Some(incoming), Some(outgoing)) = (incoming, segments.get(index)) else {
                    satellite.amount = 0.0;
                    continue;
                };
                if (!self.apply_no_radius && satellite.amount == 0.0)
                    || (!self.apply_with_radius && satellite.amount != 0.0)
                    || (self.only_selected && !satellite.active)
                {
                    continue;
                }
                satellite.amount = if by_distance {
                    power
                } else {
                    rad_to_len(power, incoming, outgoing)
                };
            }
        }
        self.applied_radius = Some(self.radius);
    }

    /// Satellites matching the nodes of `path`
    fn satellites_for<'a>(&'a self, path: &Path) -> Cow<'a, SatelliteArray> {
        if self.satellites.matches(path) {
            Cow::Borrowed(&self.satellites)
        } else {
            let mut satellites = self.satellites.clone();
            satellites.reconcile(self.last_path.as_ref(), path, self.template());
            Cow::Owned(satellites)
        }
    }
}

/// Parse knot name `<prefix>:<subpath>:<node>`
fn parse_knot(name: &str) -> Option<(bool, usize, usize)> {
    let mut parts = name.split(':');
    let mirror = match parts.next()? {
        "satellite" => false,
        "mirror" => true,
        _ => return None,
    };
    let subpath = parts.next()?.parse().ok()?;
    let node = parts.next()?.parse().ok()?;
    Some((mirror, subpath, node))
}

impl PathEffect for FilletChamfer {
    const TYPE: EffectType = EffectType::FilletChamfer;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::choice("method", FilletMethod::KEYS, "auto"),
            ParamSpec::scalar("radius", 0.0).range(0.0, Scalar::INFINITY),
            ParamSpec::int("chamfer_steps", 1).range(1.0, 999.0),
            ParamSpec::bool("flexible", false),
            ParamSpec::bool("mirror_knots", true),
            ParamSpec::bool("only_selected", false),
            ParamSpec::bool("use_knot_distance", false),
            ParamSpec::bool("hide_knots", false),
            ParamSpec::bool("apply_no_radius", true),
            ParamSpec::bool("apply_with_radius", true),
            ParamSpec::scalar("helper_size", 0.0).range(0.0, 999.0),
            ParamSpec::satellites("satellites"),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            method: FilletMethod::default(),
            radius: 0.0,
            chamfer_steps: 1,
            flexible: false,
            mirror_knots: true,
            only_selected: false,
            use_knot_distance: false,
            hide_knots: false,
            apply_no_radius: true,
            apply_with_radius: true,
            helper_size: 0.0,
            satellites: SatelliteArray::default(),
            applied_radius: None,
            last_path: None,
        };
        effect.set_params(params);
        if !effect.satellites.is_empty() {
            // stored amounts already reflect the stored radius
            effect.applied_radius = Some(effect.radius);
        }
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.method = params.choice("method").unwrap_or(self.method);
        self.radius = params.scalar("radius").unwrap_or(self.radius);
        self.chamfer_steps = params
            .int("chamfer_steps")
            .map_or(self.chamfer_steps, |steps| steps.max(1) as usize);
        self.flexible = params.bool("flexible").unwrap_or(self.flexible);
        self.mirror_knots = params.bool("mirror_knots").unwrap_or(self.mirror_knots);
        self.only_selected = params.bool("only_selected").unwrap_or(self.only_selected);
        self.use_knot_distance = params
            .bool("use_knot_distance")
            .unwrap_or(self.use_knot_distance);
        self.hide_knots = params.bool("hide_knots").unwrap_or(self.hide_knots);
        self.apply_no_radius = params.bool("apply_no_radius").unwrap_or(self.apply_no_radius);
        self.apply_with_radius = params
            .bool("apply_with_radius")
            .unwrap_or(self.apply_with_radius);
        self.helper_size = params.scalar("helper_size").unwrap_or(self.helper_size);
        if let Some(satellites) = params.satellites("satellites") {
            self.satellites = satellites.clone();
        }
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("method", ParamValue::Enum(self.method.key().to_owned()))
            .with("radius", ParamValue::Scalar(self.radius))
            .with("chamfer_steps", ParamValue::Int(self.chamfer_steps as i64))
            .with("flexible", ParamValue::Bool(self.flexible))
            .with("mirror_knots", ParamValue::Bool(self.mirror_knots))
            .with("only_selected", ParamValue::Bool(self.only_selected))
            .with("use_knot_distance", ParamValue::Bool(self.use_knot_distance))
            .with("hide_knots", ParamValue::Bool(self.hide_knots))
            .with("apply_no_radius", ParamValue::Bool(self.apply_no_radius))
            .with("apply_with_radius", ParamValue::Bool(self.apply_with_radius))
            .with("helper_size", ParamValue::Scalar(self.helper_size))
            .with("satellites", ParamValue::Satellites(self.satellites.clone()))
    }

    fn before_effect(&mut self, input: &EffectInput, _env: &Environment) {
        let path = input.path.to_line_and_cubic();
        let template = self.template();
        if self.satellites.is_empty() {
            self.satellites = SatelliteArray::for_path(&path, template);
            self.applied_radius = None;
        } else {
            self.satellites
                .reconcile(self.last_path.as_ref(), &path, template);
        }
        for (subpath, satellites) in path.subpaths().iter().zip(self.satellites.subpaths_mut()) {
            for (index, satellite) in satellites.iter_mut().enumerate() {
                match subpath.segments().get(index) {
                    Some(segment) => satellite.set_is_time(self.flexible, segment),
                    None => satellite.is_time = self.flexible,
                }
                satellite.has_mirror = self.mirror_knots;
                satellite.hidden = self.hide_knots;
            }
        }
        if self.applied_radius != Some(self.radius) {
            self.update_amount(&path);
        }
        self.last_path = Some(path);
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        let path = input.path.to_line_and_cubic();
        if path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        let satellites = self.satellites_for(&path);
        let output: Path = path
            .subpaths()
            .iter()
            .zip(satellites.subpaths())
            .map(|(subpath, satellites)| {
                fillet_subpath(subpath, satellites, self.method)
                    .unwrap_or_else(|| subpath.clone())
            })
            .collect();

        let mut indicators = Vec::new();
        if self.helper_size > 0.0 {
            let mut builder = Path::builder();
            for (subpath, satellites) in path.subpaths().iter().zip(satellites.subpaths()) {
                for (segment, satellite) in subpath.segments().iter().zip(satellites) {
                    if satellite.amount > 0.0 && !satellite.hidden {
                        builder
                            .move_to(satellite.position(segment))
                            .circle(self.helper_size / 2.0);
                    }
                }
            }
            indicators.push(builder.build());
        }
        EffectOutput::applied(output).with_indicators(indicators)
    }

    fn knots(&self, input: &EffectInput) -> Vec<(String, Point)> {
        let path = input.path.to_line_and_cubic();
        let satellites = self.satellites_for(&path);
        let mut knots = Vec::new();
        for (subpath_index, (subpath, satellites)) in
            path.subpaths().iter().zip(satellites.subpaths()).enumerate()
        {
            let segments = subpath.segments();
            for (index, satellite) in satellites.iter().enumerate() {
                let Some(outgoing) = segments.get(index) else {
                    continue;
                };
                if satellite.hidden {
                    continue;
                }
                knots.push((
                    format!("satellite:{}:{}", subpath_index, index),
                    satellite.position(outgoing),
                ));
                let incoming = match index {
                    0 if subpath.closed() => segments.last(),
                    0 => None,
                    _ => segments.get(index - 1),
                };
                if let (true, Some(incoming)) = (satellite.has_mirror, incoming) {
                    let size = satellite.arc_distance(outgoing);
                    let time = satellite.opposite_time(size, incoming);
                    knots.push((
                        format!("mirror:{}:{}", subpath_index, index),
                        incoming.at(time),
                    ));
                }
            }
        }
        knots
    }

    fn set_knot(&mut self, name: &str, point: Point, input: &EffectInput) -> bool {
        let Some((mirror, subpath_index, index)) = parse_knot(name) else {
            return false;
        };
        let path = input.path.to_line_and_cubic();
        if !self.satellites.matches(&path) {
            self.satellites
                .reconcile(self.last_path.as_ref(), &path, self.template());
            self.last_path = Some(path.clone());
        }
        let Some(subpath) = path.subpaths().get(subpath_index) else {
            return false;
        };
        let segments = subpath.segments();
        let incoming = match index {
            0 if subpath.closed() => segments.last(),
            0 => None,
            _ => segments.get(index - 1),
        };
        let outgoing = segments.get(index);
        let Some(satellite) = self
            .satellites
            .subpaths_mut()
            .get_mut(subpath_index)
            .and_then(|satellites| satellites.get_mut(index))
        else {
            return false;
        };
        match (mirror, incoming, outgoing) {
            (false, _, Some(outgoing)) => satellite.set_position(point, outgoing),
            (true, Some(incoming), Some(outgoing)) => {
                let (time, _) = incoming.nearest(point);
                let size = (incoming.arc_length(0.0, 1.0) - to_size(time, incoming)).max(0.0);
                satellite.amount = if satellite.is_time {
                    to_time(size, outgoing).min(1.0)
                } else {
                    size
                };
            }
            _ => return false,
        }
        true
    }
}

/// Curve replacing the corner, used both to emit fillets and to sample chamfers
enum Corner {
    Arc(EllipArc),
    Cubic(Cubic),
    Line(Line),
}

impl Corner {
    fn at(&self, t: Scalar) -> Point {
        match self {
            Corner::Arc(arc) => arc.at(t),
            Corner::Cubic(cubic) => cubic.at(t),
            Corner::Line(line) => line.at(t),
        }
    }

    /// Segments of the corner ending exactly at `end`
    fn segments(&self, end: Point) -> Vec<Segment> {
        let mut segments: Vec<Segment> = match self {
            Corner::Arc(arc) => arc.to_cubics().map(Segment::from).collect(),
            Corner::Cubic(cubic) => vec![(*cubic).into()],
            Corner::Line(line) => vec![(*line).into()],
        };
        if let Some(last) = segments.last_mut() {
            *last = last.with_end(end);
        }
        segments
    }
}

fn is_degenerate(segment: &Segment) -> bool {
    let bbox = segment.bbox(None);
    bbox.width() < DEGENERATE_SIZE && bbox.height() < DEGENERATE_SIZE
}

/// Append segment making it start at the end of the previous one
fn append(out: &mut Vec<Segment>, segment: Segment) {
    let segment = match out.last() {
        Some(last) => segment.with_start(last.end()),
        None => segment,
    };
    out.push(segment);
}

/// Apply satellites to a single sub-path, `None` if nothing is left of it
fn fillet_subpath(
    subpath: &SubPath,
    satellites: &[Satellite],
    method: FilletMethod,
) -> Option<SubPath> {
    let segments = subpath.segments();
    if segments.len() == 1 {
        return Some(subpath.clone());
    }
    let closed = subpath.closed();
    let satellite_at = |index: usize| satellites.get(index).copied().unwrap_or_default();
    let mut time0 = if closed {
        satellite_at(0).time(&segments[0])
    } else {
        0.0
    };
    let mut out: Vec<Segment> = Vec::with_capacity(segments.len() * 2);
    for (index, curve1) in segments.iter().enumerate() {
        if !closed && index + 1 == segments.len() {
            let tail = curve1.cut(time0, 1.0);
            if !is_degenerate(&tail) {
                append(&mut out, tail);
            }
            break;
        }
        let next = (index + 1) % segments.len();
        let curve2 = &segments[next];
        let satellite = satellite_at(next);
        let size = satellite.arc_distance(curve2);
        let time1 = satellite.opposite_time(size, curve1).max(time0);
        let time2 = satellite.time(curve2);
        let knot1 = curve1.cut(time0, time1);
        if time1 < 1.0 {
            if time1 != time0 && !is_degenerate(&knot1) {
                append(&mut out, knot1);
            }
            build_corner(curve1, curve2, time0, time1, time2, method).emit(&mut out, satellite);
        } else if !is_degenerate(&knot1) {
            append(&mut out, knot1);
        }
        time0 = time2;
    }
    if closed {
        let first = out.first()?.start();
        if let Some(last) = out.last_mut() {
            *last = last.with_end(first);
        }
    }
    SubPath::new(out, closed)
}

/// Geometry of a single corner
struct CornerGeometry {
    start: Point,
    end: Point,
    radius: Scalar,
    ccw_toggle: bool,
    handles: (Point, Point),
    inverse_handles: (Point, Point),
    use_arc: bool,
}

fn build_corner(
    curve1: &Segment,
    curve2: &Segment,
    time0: Scalar,
    time1: Scalar,
    time2: Scalar,
    method: FilletMethod,
) -> CornerGeometry {
    let mut start = if time1 == time0 {
        curve1.at(time0 + GAP_HELPER)
    } else {
        curve1.at(time1)
    };
    let mut end = if time2 == 1.0 {
        curve2.at(1.0 - GAP_HELPER)
    } else {
        curve2.at(time2)
    };
    let k1 = start.dist(curve1.end()) * K;
    let k2 = end.dist(curve2.start()) * K;
    let (ray1, ray2) = corner_rays(curve1, curve2, time1, time2, start, end);
    let (angle1, angle2) = (ray1.angle(), ray2.angle());

    let ccw_toggle = is_ccw_toggle(curve1, start, end);
    let angle = rays_angle(ray1, ray2, ccw_toggle);

    let handle1 = if time0 == 1.0 {
        start
    } else {
        start + Point::polar(angle1, k1)
    };
    let handle2 = end - Point::polar(angle2, k2);
    let inverse_angle1 = if ccw_toggle {
        angle1 + angle
    } else {
        angle1 - angle
    };
    let inverse_handle1 = if time0 == 1.0 {
        start
    } else {
        start + Point::polar(inverse_angle1, k1)
    };
    let inverse_angle2 = if ccw_toggle {
        angle2 - angle
    } else {
        angle2 + angle
    };
    let inverse_handle2 = end - Point::polar(inverse_angle2, k2);

    if time2 == 1.0 {
        end = curve2.at(1.0);
    }
    if time1 == time0 {
        start = curve1.at(time0);
    }
    let radius = start.dist((start + end) / 2.0) / (angle / 2.0).sin();
    let use_arc = (curve1.is_straight() && curve2.is_straight() && method != FilletMethod::Bezier)
        || method == FilletMethod::Arc;
    CornerGeometry {
        start,
        end,
        radius,
        ccw_toggle,
        handles: (handle1, handle2),
        inverse_handles: (inverse_handle1, inverse_handle2),
        use_arc,
    }
}

impl CornerGeometry {
    /// Fillet curve, `inverse` reflects it into the corner
    fn curve(&self, inverse: bool) -> Corner {
        let start = self.start;
        if self.use_arc {
            let sweep = self.ccw_toggle == inverse;
            let arc = (self.radius.is_finite() && self.radius > 0.0)
                .then(|| {
                    EllipArc::new_param(start, self.end, self.radius, self.radius, 0.0, false, sweep)
                })
                .flatten();
            return match arc {
                Some(arc) => Corner::Arc(arc),
                None => Corner::Line(Line::new(start, self.end)),
            };
        }
        let (handle1, handle2) = if inverse {
            self.inverse_handles
        } else {
            self.handles
        };
        Corner::Cubic(Cubic::new(start, handle1, handle2, self.end))
    }

    /// Append corner segments to the output
    fn emit(&self, out: &mut Vec<Segment>, satellite: Satellite) {
        match satellite.kind {
            SatelliteKind::Fillet | SatelliteKind::InverseFillet => {
                let inverse = satellite.kind == SatelliteKind::InverseFillet;
                for segment in self.curve(inverse).segments(self.end) {
                    if !is_degenerate(&segment) {
                        append(out, segment);
                    }
                }
            }
            SatelliteKind::Chamfer | SatelliteKind::InverseChamfer => {
                let inverse = satellite.kind == SatelliteKind::InverseChamfer;
                let curve = self.curve(inverse);
                let steps = satellite.steps.max(1);
                let mut current = self.start;
                for step in 1..steps {
                    let point = curve.at(step as Scalar / steps as Scalar);
                    append(out, Line::new(current, point).into());
                    current = point;
                }
                let last = Line::new(current, self.end);
                if !is_degenerate(&last.into()) {
                    append(out, last.into());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Transform, assert_approx_eq};
    use proptest::prelude::*;

    fn apply(effect: &mut FilletChamfer, path: &Path) -> EffectOutput {
        let input = EffectInput::new(path.clone());
        effect.before_effect(&input, &Environment::default());
        effect.do_effect(&input)
    }

    fn fillet(radius: Scalar) -> FilletChamfer {
        let mut params = ParamSet::defaults(&FilletChamfer::specs());
        params.set("radius", ParamValue::Scalar(radius));
        FilletChamfer::from_params(&params)
    }

    #[test]
    fn test_square_fillet() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let mut effect = fillet(2.0);
        let output = apply(&mut effect, &square);
        assert!(output.is_applied());
        assert_eq!(output.path.subpaths().len(), 1);
        let subpath = &output.path.subpaths()[0];
        assert!(subpath.closed());
        assert_eq!(subpath.segments().len(), 8);
        assert!(subpath.start().is_close_to(subpath.end()));

        let mut lines = 0;
        let mut cubics = 0;
        for segment in subpath.segments() {
            match segment {
                Segment::Line(line) => {
                    lines += 1;
                    assert_approx_eq!(line.length(), 6.0, 1e-6);
                }
                Segment::Cubic(cubic) => {
                    cubics += 1;
                    let [p0, p1, p2, p3] = cubic.points();
                    assert_approx_eq!(p0.dist(p1), 2.0 * K, 1e-3);
                    assert_approx_eq!(p3.dist(p2), 2.0 * K, 1e-3);
                    // quarter turn
                    let turn = (p1 - p0).angle_between(p3 - p2).unwrap();
                    assert_approx_eq!(turn.abs(), crate::PI / 2.0, 1e-6);
                }
                Segment::Quad(_) => panic!("unexpected quad"),
            }
        }
        assert_eq!((lines, cubics), (4, 4));
        // corner arcs stay inside of the square
        let bbox = output.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.width(), 10.0, 1e-6);
        assert_approx_eq!(bbox.height(), 10.0, 1e-6);
        assert!(!output.path.contains(Point::new(0.2, 0.2), crate::FillRule::NonZero));
        Ok(())
    }

    #[test]
    fn test_radius_zero_round_trip() -> Result<(), crate::Error> {
        let path: Path = "M0,0 L10,0 C15,0 15,10 10,10 L0,10 Z M20,0 L30,0 L30,5".parse()?;
        let mut effect = fillet(0.0);
        let output = apply(&mut effect, &path);
        assert_eq!(output.path.segments_count(), path.segments_count());
        for (a, b) in output.path.subpaths().iter().zip(path.subpaths()) {
            assert_eq!(a.closed(), b.closed());
            for (sa, sb) in a.segments().iter().zip(b.segments()) {
                assert!(sa.start().is_near(sb.start(), 1e-9));
                assert!(sa.end().is_near(sb.end(), 1e-9));
            }
        }
        Ok(())
    }

    #[test]
    fn test_open_path_keeps_ends() -> Result<(), crate::Error> {
        let path: Path = "M0,0 L10,0 L10,10".parse()?;
        let mut effect = fillet(3.0);
        let output = apply(&mut effect, &path);
        let subpath = &output.path.subpaths()[0];
        assert!(!subpath.closed());
        assert!(subpath.start().is_near(Point::new(0.0, 0.0), 1e-9));
        assert!(subpath.end().is_near(Point::new(10.0, 10.0), 1e-9));
        assert_eq!(subpath.segments().len(), 3);
        assert!(subpath.segments()[0].end().is_near(Point::new(7.0, 0.0), 1e-6));
        assert!(subpath.segments()[2].start().is_near(Point::new(10.0, 3.0), 1e-6));
        // end nodes never carry an amount
        let satellites = &effect.satellites.subpaths()[0];
        assert_eq!(satellites.len(), 3);
        assert_eq!(satellites[0].amount, 0.0);
        assert_eq!(satellites[2].amount, 0.0);
        Ok(())
    }

    #[test]
    fn test_chamfer() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let mut effect = fillet(2.0);
        effect.before_effect(&EffectInput::new(square.clone()), &Environment::default());
        effect.set_kind(SatelliteKind::Chamfer);
        let output = effect.do_effect(&EffectInput::new(square.clone()));
        let subpath = &output.path.subpaths()[0];
        assert_eq!(subpath.segments().len(), 8);
        assert!(subpath.segments().iter().all(|segment| segment.is_straight()));
        assert_approx_eq!(subpath.signed_area(), 100.0 - 4.0 * 2.0, 1e-6);

        // two step chamfer goes through the middle of the arc
        for satellite in effect.satellites.iter_mut() {
            satellite.steps = 2;
        }
        let output = effect.do_effect(&EffectInput::new(square));
        let subpath = &output.path.subpaths()[0];
        assert_eq!(subpath.segments().len(), 12);
        let center = Point::new(8.0, 2.0);
        let mid = subpath.segments()[1].end();
        assert_approx_eq!(mid.dist(center), 2.0, 1e-6);
        Ok(())
    }

    #[test]
    fn test_inverse_fillet() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let mut effect = fillet(2.0);
        effect.before_effect(&EffectInput::new(square.clone()), &Environment::default());
        effect.set_kind(SatelliteKind::InverseFillet);
        let output = effect.do_effect(&EffectInput::new(square));
        let subpath = &output.path.subpaths()[0];
        // arcs are centered at the corners
        let arc = subpath.segments()[1];
        assert_approx_eq!(arc.at(0.5).dist(Point::new(10.0, 0.0)), 2.0, 1e-3);
        // cubic arcs bulge slightly outside the exact quarter circles
        assert_approx_eq!(subpath.signed_area(), 100.0 - crate::PI * 4.0, 5e-2);
        Ok(())
    }

    #[test]
    fn test_bezier_method() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let mut params = ParamSet::defaults(&FilletChamfer::specs());
        params.set("radius", ParamValue::Scalar(2.0));
        params.set("method", ParamValue::Enum("bezier".to_owned()));
        let mut effect = FilletChamfer::from_params(&params);
        let output = apply(&mut effect, &square);
        let subpath = &output.path.subpaths()[0];
        let Segment::Cubic(cubic) = subpath.segments()[1] else {
            panic!("corner must be a cubic");
        };
        let [p0, p1, p2, p3] = cubic.points();
        assert!(p1.is_near(p0 + Point::new(2.0 * K, 0.0), 1e-6));
        assert!(p2.is_near(p3 - Point::new(0.0, 2.0 * K), 1e-6));
        Ok(())
    }

    #[test]
    fn test_satellites_follow_path() -> Result<(), crate::Error> {
        let mut effect = fillet(1.0);
        let triangle: Path = "M0,0 L10,0 L5,8 Z".parse()?;
        apply(&mut effect, &triangle);
        assert!(effect.satellites.matches(&triangle));
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let output = apply(&mut effect, &square);
        assert!(effect.satellites.matches(&square));
        // only nodes found in the previous path keep their amount
        assert_eq!(output.path.subpaths()[0].segments().len(), 6);

        let written = effect.params().encode();
        let restored = FilletChamfer::from_params(&ParamSet::resolve(
            "fillet_chamfer",
            &FilletChamfer::specs(),
            &written,
            &crate::Preferences::default(),
        ));
        assert_eq!(restored.satellites.len(), 4);
        assert_eq!(restored.applied_radius, Some(1.0));
        Ok(())
    }

    #[test]
    fn test_knots() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let input = EffectInput::new(square.clone());
        let mut effect = fillet(2.0);
        effect.before_effect(&input, &Environment::default());
        let knots = effect.knots(&input);
        assert_eq!(knots.len(), 8);
        let (name, position) = &knots[0];
        assert_eq!(name, "satellite:0:0");
        assert!(position.is_near(Point::new(2.0, 0.0), 1e-6));
        let (name, position) = &knots[1];
        assert_eq!(name, "mirror:0:0");
        assert!(position.is_near(Point::new(0.0, 2.0), 1e-6));

        assert!(effect.set_knot("satellite:0:1", Point::new(11.0, 3.0), &input));
        assert_approx_eq!(effect.satellites.subpaths()[0][1].amount, 3.0, 1e-6);
        assert!(effect.set_knot("mirror:0:1", Point::new(6.0, -1.0), &input));
        assert_approx_eq!(effect.satellites.subpaths()[0][1].amount, 4.0, 1e-6);
        assert!(!effect.set_knot("bogus", Point::new(0.0, 0.0), &input));
        Ok(())
    }

    proptest! {
        #[test]
        fn test_closure_preserved(
            width in 5.0f64..50.0,
            height in 5.0f64..50.0,
            skew in -4.0f64..4.0,
            radius in 0.0f64..2.0,
        ) {
            let mut builder = Path::builder();
            builder
                .move_to((0.0, 0.0))
                .line_to((width, 0.0))
                .cubic_to((width + skew, height / 3.0), (width - skew, height / 1.5), (width, height))
                .line_to((0.0, height))
                .close();
            let path = builder.build();
            let mut effect = fillet(radius);
            let output = apply(&mut effect, &path);
            prop_assert_eq!(output.path.subpaths().len(), 1);
            let subpath = &output.path.subpaths()[0];
            prop_assert!(subpath.closed());
            prop_assert!(subpath.start().is_near(subpath.end(), 1e-9));
            for pair in subpath.segments().windows(2) {
                prop_assert!(pair[0].end().is_near(pair[1].start(), 1e-9));
            }
        }
    }
}
