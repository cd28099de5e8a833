//! Reflection of a path across a line
use crate::{
    BBox, Curve, EffectInput, EffectOutput, EffectType, Environment, Line, ParamSet, ParamSpec,
    ParamValue, Path, PathEffect, Point, Reason, Scalar, Segment, SubPath, Transform,
    intersect::INTERSECT_TOLERANCE, param::impl_choice,
};

/// Path times closer than this are the same crossing
const CROSSING_MERGE: Scalar = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MirrorMode {
    /// Line given by the start and end knots
    #[default]
    Free,
    /// Vertical line through the middle of the bounding box
    X,
    /// Horizontal line through the middle of the bounding box
    Y,
}

impl_choice!(MirrorMode, {
    Free => "free",
    X => "X",
    Y => "Y",
});

#[derive(Debug, Clone)]
pub struct MirrorSymmetry {
    pub mode: MirrorMode,
    pub start_point: Point,
    pub end_point: Point,
    /// Output only the reflected copy
    pub discard_orig_path: bool,
    /// Cut the path by the line and join each kept part with its reflection
    pub fuse_paths: bool,
}

/// Mirror line with the side of it which is kept when fusing
struct Mirror {
    start: Point,
    direction: Point,
    reflect: Transform,
    kept_side: Scalar,
}

impl Mirror {
    fn new(start: Point, end: Point, path: &Path) -> Option<Self> {
        let reflect = Transform::new_reflect(start, end)?;
        let direction = end - start;
        let mut mirror = Self {
            start,
            direction,
            reflect,
            kept_side: 1.0,
        };
        let first = path
            .subpaths()
            .first()
            .map(|subpath| mirror.side(subpath.start()))
            .unwrap_or(0.0);
        if first < 0.0 {
            mirror.kept_side = -1.0;
        }
        Some(mirror)
    }

    /// Signed side of the point, zero on the line
    fn side(&self, point: Point) -> Scalar {
        let value = self.direction.cross(point - self.start);
        if value.abs() < INTERSECT_TOLERANCE * self.direction.length() {
            0.0
        } else {
            value.signum()
        }
    }

    fn is_kept(&self, point: Point) -> bool {
        self.side(point) == self.kept_side
    }

    /// Mirror line extended well beyond the subpath
    fn line_across(&self, bbox: BBox) -> Line {
        let reach = bbox.diag().length() + bbox.mid().dist(self.start) + 1.0;
        let unit = self.direction / self.direction.length();
        Line::new(self.start - reach * unit, self.start + reach * unit)
    }

    fn reflected(&self, segments: &[Segment]) -> Vec<Segment> {
        segments
            .iter()
            .map(|segment| segment.transform(self.reflect))
            .collect()
    }

    fn reflected_reverse(&self, segments: &[Segment]) -> Vec<Segment> {
        segments
            .iter()
            .rev()
            .map(|segment| segment.reverse().transform(self.reflect))
            .collect()
    }

    /// Path times where the subpath crosses the mirror line
    fn crossings(&self, subpath: &SubPath) -> Vec<Scalar> {
        let line = self.line_across(subpath.bbox(None, Transform::identity()));
        let mut times: Vec<Scalar> = subpath
            .segments()
            .iter()
            .enumerate()
            .flat_map(|(index, segment)| {
                segment
                    .intersect(line, INTERSECT_TOLERANCE)
                    .into_iter()
                    .map(move |(t, _)| index as Scalar + t)
            })
            .collect();
        times.sort_by(|a, b| a.total_cmp(b));
        times.dedup_by(|a, b| (*a - *b).abs() < CROSSING_MERGE);
        let end = subpath.segments().len() as Scalar;
        if subpath.closed() {
            // crossing at the seam is the same crossing on both ends
            if let (Some(&first), Some(&last)) = (times.first(), times.last()) {
                if times.len() > 1 && first < CROSSING_MERGE && end - last < CROSSING_MERGE {
                    times.pop();
                }
            }
            times
        } else {
            times.retain(|t| *t > CROSSING_MERGE && end - *t > CROSSING_MERGE);
            times
        }
    }

    /// Kept parts of the subpath joined with their reflections
    fn fuse(&self, subpath: &SubPath) -> Vec<SubPath> {
        let times = self.crossings(subpath);
        if times.is_empty() || (subpath.closed() && times.len() == 1) {
            let middle = subpath.first().at(0.5);
            if !self.is_kept(subpath.start()) && !self.is_kept(middle) {
                return Vec::new();
            }
            let mut mirrored = subpath.clone();
            mirrored.transform(self.reflect);
            return vec![subpath.clone(), mirrored];
        }

        let end = subpath.segments().len() as Scalar;
        let mut pieces = Vec::new();
        if subpath.closed() {
            let last = times[times.len() - 1];
            let mut wrapped = subpath.portion(last, end);
            wrapped.extend(subpath.portion(0.0, times[0]));
            pieces.push((wrapped, true, true));
            pieces.extend(
                times
                    .windows(2)
                    .map(|pair| (subpath.portion(pair[0], pair[1]), true, true)),
            );
        } else {
            let mut bounds = vec![0.0];
            bounds.extend(times.iter().copied());
            bounds.push(end);
            let count = bounds.len() - 1;
            pieces.extend(bounds.windows(2).enumerate().map(|(index, pair)| {
                (subpath.portion(pair[0], pair[1]), index > 0, index + 1 < count)
            }));
        }

        pieces
            .into_iter()
            .filter(|(segments, _, _)| {
                segments
                    .first()
                    .is_some_and(|segment| self.is_kept(segment.at(0.5)))
            })
            .filter_map(|(segments, starts_on_line, ends_on_line)| {
                let (mut fused, tail, closed) = if ends_on_line {
                    let tail = self.reflected_reverse(&segments);
                    (segments, tail, starts_on_line)
                } else {
                    let head: Vec<Segment> = segments.iter().rev().map(Curve::reverse).collect();
                    let tail = self.reflected(&segments);
                    (head, tail, false)
                };
                let joint = fused.last()?.end();
                fused.extend(tail.into_iter().enumerate().map(|(index, segment)| {
                    if index == 0 {
                        segment.with_start(joint)
                    } else {
                        segment
                    }
                }));
                SubPath::new(fused, closed)
            })
            .collect()
    }
}

impl MirrorSymmetry {
    /// Update knots of the axis aligned modes from the bounding box
    fn align_line(&mut self, bbox: BBox) {
        let mid = bbox.mid();
        match self.mode {
            MirrorMode::Free => {}
            MirrorMode::X => {
                self.start_point = Point::new(mid.x(), bbox.min().y());
                self.end_point = Point::new(mid.x(), bbox.max().y());
            }
            MirrorMode::Y => {
                self.start_point = Point::new(bbox.min().x(), mid.y());
                self.end_point = Point::new(bbox.max().x(), mid.y());
            }
        }
    }

    fn mirror_line(&self) -> Path {
        let mut builder = Path::builder();
        builder.move_to(self.start_point).line_to(self.end_point);
        builder.build()
    }
}

impl PathEffect for MirrorSymmetry {
    const TYPE: EffectType = EffectType::MirrorSymmetry;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::choice("mode", MirrorMode::KEYS, "free"),
            ParamSpec::point("start_point", Point::new(0.0, 0.0)),
            ParamSpec::point("end_point", Point::new(0.0, 0.0)),
            ParamSpec::bool("discard_orig_path", false),
            ParamSpec::bool("fuse_paths", false),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            mode: MirrorMode::default(),
            start_point: Point::new(0.0, 0.0),
            end_point: Point::new(0.0, 0.0),
            discard_orig_path: false,
            fuse_paths: false,
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.mode = params.choice("mode").unwrap_or(self.mode);
        self.start_point = params.point("start_point").unwrap_or(self.start_point);
        self.end_point = params.point("end_point").unwrap_or(self.end_point);
        self.discard_orig_path = params
            .bool("discard_orig_path")
            .unwrap_or(self.discard_orig_path);
        self.fuse_paths = params.bool("fuse_paths").unwrap_or(self.fuse_paths);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("mode", ParamValue::Enum(self.mode.key().to_owned()))
            .with("start_point", ParamValue::Point(self.start_point))
            .with("end_point", ParamValue::Point(self.end_point))
            .with("discard_orig_path", ParamValue::Bool(self.discard_orig_path))
            .with("fuse_paths", ParamValue::Bool(self.fuse_paths))
    }

    /// Vertical line through the middle of the item
    fn on_apply(&mut self, input: &EffectInput) {
        if let Some(bbox) = input.path.bbox(Transform::identity()) {
            let mid = bbox.mid();
            self.start_point = Point::new(mid.x(), bbox.min().y());
            self.end_point = Point::new(mid.x(), bbox.max().y());
        }
    }

    fn before_effect(&mut self, input: &EffectInput, _env: &Environment) {
        if let Some(bbox) = input.path.bbox(Transform::identity()) {
            self.align_line(bbox);
        }
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        if input.path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        let Some(mirror) = Mirror::new(self.start_point, self.end_point, &input.path) else {
            return EffectOutput::unchanged(
                &input.path,
                Reason::Degenerate("mirror line has zero length"),
            );
        };

        let output: Path = if self.discard_orig_path {
            input.path.transformed(mirror.reflect)
        } else if self.fuse_paths {
            input
                .path
                .subpaths()
                .iter()
                .flat_map(|subpath| mirror.fuse(subpath))
                .collect()
        } else {
            let mut output = input.path.clone();
            output.extend(input.path.transformed(mirror.reflect));
            output
        };
        EffectOutput::applied(output).with_indicators(vec![self.mirror_line()])
    }

    fn knots(&self, _input: &EffectInput) -> Vec<(String, Point)> {
        if self.mode != MirrorMode::Free {
            return Vec::new();
        }
        vec![
            ("start_point".to_owned(), self.start_point),
            ("end_point".to_owned(), self.end_point),
        ]
    }

    fn set_knot(&mut self, name: &str, point: Point, _input: &EffectInput) -> bool {
        if self.mode != MirrorMode::Free {
            return false;
        }
        match name {
            "start_point" => self.start_point = point,
            "end_point" => self.end_point = point,
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Outcome, assert_approx_eq};

    fn mirror(start: Point, end: Point) -> MirrorSymmetry {
        let mut effect = MirrorSymmetry::from_params(&ParamSet::defaults(&MirrorSymmetry::specs()));
        effect.start_point = start;
        effect.end_point = end;
        effect
    }

    fn bbox(path: &Path) -> BBox {
        path.bbox(Transform::identity()).unwrap()
    }

    #[test]
    fn test_reflect_copy() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,0 L10,10 L0,10 Z".parse()?);
        let mut effect = mirror(Point::new(10.0, -5.0), Point::new(10.0, 15.0));
        let output = effect.do_effect(&input);
        assert!(output.is_applied());
        assert_eq!(output.path.subpaths().len(), 2);
        assert_eq!(output.indicators.len(), 1);
        let reflected = Path::new(vec![output.path.subpaths()[1].clone()]);
        assert!(bbox(&reflected).min().is_near(Point::new(10.0, 0.0), 1e-9));
        assert!(bbox(&reflected).max().is_near(Point::new(20.0, 10.0), 1e-9));
        // reflection flips orientation
        assert_approx_eq!(
            output.path.subpaths()[0].signed_area(),
            -output.path.subpaths()[1].signed_area(),
            1e-6
        );

        effect.discard_orig_path = true;
        let output = effect.do_effect(&input);
        assert_eq!(output.path.subpaths().len(), 1);
        assert!(bbox(&output.path).min().is_near(Point::new(10.0, 0.0), 1e-9));
        Ok(())
    }

    #[test]
    fn test_axis_modes() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L8,0 L8,4 Z".parse()?);
        let mut effect = mirror(Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        effect.mode = MirrorMode::X;
        effect.before_effect(&input, &Environment::default());
        assert!(effect.start_point.is_near(Point::new(4.0, 0.0), 1e-9));
        assert!(effect.end_point.is_near(Point::new(4.0, 4.0), 1e-9));
        assert!(effect.knots(&input).is_empty());
        let output = effect.do_effect(&input);
        let reflected = Path::new(vec![output.path.subpaths()[1].clone()]);
        assert!(reflected.subpaths()[0].start().is_near(Point::new(8.0, 0.0), 1e-9));

        effect.mode = MirrorMode::Y;
        effect.before_effect(&input, &Environment::default());
        assert!(effect.start_point.is_near(Point::new(0.0, 2.0), 1e-9));
        assert!(effect.end_point.is_near(Point::new(8.0, 2.0), 1e-9));
        Ok(())
    }

    #[test]
    fn test_fuse_closed() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,0 L10,4 L0,4 Z".parse()?);
        let mut effect = mirror(Point::new(6.0, -1.0), Point::new(6.0, 5.0));
        effect.fuse_paths = true;
        let output = effect.do_effect(&input);
        assert_eq!(output.path.subpaths().len(), 1);
        let fused = &output.path.subpaths()[0];
        assert!(fused.closed());
        assert!(bbox(&output.path).min().is_near(Point::new(0.0, 0.0), 1e-6));
        assert!(bbox(&output.path).max().is_near(Point::new(12.0, 4.0), 1e-6));
        assert_approx_eq!(fused.signed_area().abs(), 48.0, 1e-4);
        Ok(())
    }

    #[test]
    fn test_fuse_open() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,5".parse()?);
        let mut effect = mirror(Point::new(6.0, 0.0), Point::new(6.0, 10.0));
        effect.fuse_paths = true;
        let output = effect.do_effect(&input);
        assert_eq!(output.path.subpaths().len(), 1);
        let fused = &output.path.subpaths()[0];
        assert!(!fused.closed());
        assert_eq!(fused.segments().len(), 2);
        assert!(fused.start().is_near(Point::new(0.0, 0.0), 1e-9));
        assert!(fused.segments()[0].end().is_near(Point::new(6.0, 3.0), 1e-6));
        assert!(fused.end().is_near(Point::new(12.0, 0.0), 1e-6));

        // path entirely on the far side of the line is dropped
        let mut far = mirror(Point::new(6.0, 10.0), Point::new(6.0, 0.0));
        far.fuse_paths = true;
        let input = EffectInput::new("M0,0 L2,2 M8,0 L9,9".parse()?);
        let output = far.do_effect(&input);
        let starts: Vec<Point> = output.path.subpaths().iter().map(SubPath::start).collect();
        assert_eq!(starts, vec![Point::new(0.0, 0.0), Point::new(12.0, 0.0)]);
        Ok(())
    }

    #[test]
    fn test_degenerate_line() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,0".parse()?);
        let output = mirror(Point::new(1.0, 1.0), Point::new(1.0, 1.0)).do_effect(&input);
        assert!(matches!(output.outcome, Outcome::Unchanged(Reason::Degenerate(_))));
        assert_eq!(output.path, input.path);
        Ok(())
    }

    #[test]
    fn test_knots() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,0 L10,10 Z".parse()?);
        let mut effect = mirror(Point::new(0.0, 0.0), Point::new(0.0, 0.0));
        effect.on_apply(&input);
        assert!(effect.start_point.is_near(Point::new(5.0, 0.0), 1e-9));
        assert!(effect.end_point.is_near(Point::new(5.0, 10.0), 1e-9));
        assert!(effect.set_knot("end_point", Point::new(20.0, 10.0), &input));
        assert!(!effect.set_knot("width", Point::new(0.0, 0.0), &input));
        assert_eq!(effect.knots(&input)[1].1, Point::new(20.0, 10.0));
        Ok(())
    }
}
