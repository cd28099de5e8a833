//! Similarity transformation given by two reference points and their targets
use crate::{
    EffectInput, EffectOutput, EffectType, Environment, ParamSet, ParamSpec, ParamValue, Path,
    PathEffect, Point, Reason, Scalar, Transform,
};

#[derive(Debug, Clone)]
pub struct TransformTwoPoints {
    /// Target of the first reference point
    pub start: Point,
    /// Target of the second reference point
    pub end: Point,
    /// One based index of the node used as the first reference point
    pub first_knot: usize,
    /// One based index of the node used as the second reference point
    pub last_knot: usize,
    /// Reference points are middles of the left and right bounding box sides
    pub from_original_width: bool,
    /// Scale only along the reference line
    pub elastic: bool,
    pub lock_length: bool,
    pub lock_angle: bool,
    pub flip_horizontal: bool,
    pub flip_vertical: bool,
    /// Scale across the reference line
    pub stretch: Scalar,
    /// Additional rotation around `start` in degrees
    pub offset: Scalar,
}

/// Conjugate `tr` by rotation to the `angle` so it acts along that direction
fn along(angle: Scalar, tr: Transform) -> Transform {
    Transform::new_rotate(angle) * tr * Transform::new_rotate(-angle)
}

impl TransformTwoPoints {
    /// Reference points the path is positioned by
    pub fn reference_points(&self, path: &Path) -> Option<(Point, Point)> {
        if self.from_original_width {
            let bbox = path.bbox(Transform::identity())?;
            let y = bbox.mid().y();
            return Some((
                Point::new(bbox.min().x(), y),
                Point::new(bbox.max().x(), y),
            ));
        }
        let nodes = path.nodes();
        let node = |knot: usize| {
            let index = knot.clamp(1, nodes.len().max(1)) - 1;
            nodes.get(index).copied()
        };
        Some((node(self.first_knot)?, node(self.last_knot)?))
    }

    /// Transformation moving reference points onto `start` and `end`
    pub fn solve(&self, a: Point, b: Point) -> Option<Transform> {
        let original = b - a;
        let target = self.end - self.start;
        original.normalize()?;
        target.normalize()?;
        let scale = target.length() / original.length();
        let original_angle = original.angle();

        let mut tr = if self.elastic {
            let across = if scale > 1.0 {
                1.0
            } else {
                1.0 - (1.0 - scale) / 2.0
            };
            Transform::new_rotate(target.angle())
                * Transform::new_scale(scale, across)
                * Transform::new_rotate(-original_angle)
        } else {
            Transform::new_rotate(target.angle() - original_angle).scale(scale, scale)
        };
        if self.stretch != 1.0 {
            tr = tr * along(original_angle, Transform::new_scale(1.0, self.stretch));
        }
        let flip = match (self.flip_horizontal, self.flip_vertical) {
            (true, true) => Some((-1.0, -1.0)),
            (false, true) => Some((1.0, -1.0)),
            (true, false) => Some((-1.0, 1.0)),
            (false, false) => None,
        };
        if let Some((sx, sy)) = flip {
            tr = tr * along(original_angle, Transform::new_scale(sx, sy));
        }
        Some(
            Transform::identity()
                .rotate_around(self.offset.to_radians(), self.start)
                .translate(self.start.x(), self.start.y())
                * tr
                * Transform::new_translate(-a.x(), -a.y()),
        )
    }

    /// Keep the length or the direction of the reference line
    fn apply_locks(&mut self, a: Point, b: Point) {
        let original = b - a;
        let target = self.end - self.start;
        self.end = match (self.lock_length, self.lock_angle) {
            (true, true) => self.start + original,
            (true, false) => match target.normalize() {
                Some(unit) => self.start + original.length() * unit,
                None => self.start + original,
            },
            (false, true) => self.start + Point::polar(original.angle(), target.length()),
            (false, false) => self.end,
        };
    }

    fn helper_line(&self) -> Path {
        let mut builder = Path::builder();
        builder.move_to(self.start).line_to(self.end);
        builder.build()
    }
}

impl PathEffect for TransformTwoPoints {
    const TYPE: EffectType = EffectType::TransformTwoPoints;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::point("start", Point::new(0.0, 0.0)),
            ParamSpec::point("end", Point::new(0.0, 0.0)),
            ParamSpec::int("first_knot", 1).range(1.0, Scalar::INFINITY),
            ParamSpec::int("last_knot", 1).range(1.0, Scalar::INFINITY),
            ParamSpec::bool("from_original_width", false),
            ParamSpec::bool("elastic", false),
            ParamSpec::bool("lock_length", false),
            ParamSpec::bool("lock_angle", false),
            ParamSpec::bool("flip_horizontal", false),
            ParamSpec::bool("flip_vertical", false),
            ParamSpec::scalar("stretch", 1.0).range(0.0, 999.0),
            ParamSpec::scalar("offset", 0.0),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            start: Point::new(0.0, 0.0),
            end: Point::new(0.0, 0.0),
            first_knot: 1,
            last_knot: 1,
            from_original_width: false,
            elastic: false,
            lock_length: false,
            lock_angle: false,
            flip_horizontal: false,
            flip_vertical: false,
            stretch: 1.0,
            offset: 0.0,
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.start = params.point("start").unwrap_or(self.start);
        self.end = params.point("end").unwrap_or(self.end);
        if let Some(knot) = params.int("first_knot") {
            self.first_knot = knot.max(1) as usize;
        }
        if let Some(knot) = params.int("last_knot") {
            self.last_knot = knot.max(1) as usize;
        }
        self.from_original_width = params
            .bool("from_original_width")
            .unwrap_or(self.from_original_width);
        self.elastic = params.bool("elastic").unwrap_or(self.elastic);
        self.lock_length = params.bool("lock_length").unwrap_or(self.lock_length);
        self.lock_angle = params.bool("lock_angle").unwrap_or(self.lock_angle);
        self.flip_horizontal = params.bool("flip_horizontal").unwrap_or(self.flip_horizontal);
        self.flip_vertical = params.bool("flip_vertical").unwrap_or(self.flip_vertical);
        self.stretch = params.scalar("stretch").unwrap_or(self.stretch);
        self.offset = params.scalar("offset").unwrap_or(self.offset);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("start", ParamValue::Point(self.start))
            .with("end", ParamValue::Point(self.end))
            .with("first_knot", ParamValue::Int(self.first_knot as i64))
            .with("last_knot", ParamValue::Int(self.last_knot as i64))
            .with("from_original_width", ParamValue::Bool(self.from_original_width))
            .with("elastic", ParamValue::Bool(self.elastic))
            .with("lock_length", ParamValue::Bool(self.lock_length))
            .with("lock_angle", ParamValue::Bool(self.lock_angle))
            .with("flip_horizontal", ParamValue::Bool(self.flip_horizontal))
            .with("flip_vertical", ParamValue::Bool(self.flip_vertical))
            .with("stretch", ParamValue::Scalar(self.stretch))
            .with("offset", ParamValue::Scalar(self.offset))
    }

    /// Targets start at the reference points so the path is not moved
    fn on_apply(&mut self, input: &EffectInput) {
        self.first_knot = 1;
        self.last_knot = input.path.nodes_count().max(1);
        if let Some((a, b)) = self.reference_points(&input.path) {
            self.start = a;
            self.end = b;
        }
    }

    fn before_effect(&mut self, input: &EffectInput, _env: &Environment) {
        if let Some((a, b)) = self.reference_points(&input.path) {
            self.apply_locks(a, b);
        }
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        if input.path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        let Some((a, b)) = self.reference_points(&input.path) else {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        };
        if a.is_close_to(b) {
            let reason = Reason::Degenerate("reference points coincide");
            return EffectOutput::unchanged(&input.path, reason);
        }
        let Some(tr) = self.solve(a, b) else {
            let reason = Reason::Degenerate("target points coincide");
            return EffectOutput::unchanged(&input.path, reason);
        };
        EffectOutput::applied(input.path.transformed(tr))
            .with_indicators(vec![self.helper_line()])
    }

    fn knots(&self, _input: &EffectInput) -> Vec<(String, Point)> {
        vec![
            ("start".to_owned(), self.start),
            ("end".to_owned(), self.end),
        ]
    }

    fn set_knot(&mut self, name: &str, point: Point, input: &EffectInput) -> bool {
        let delta = point - self.start;
        match name {
            // end follows start when its position is locked relative to it
            "start" if self.lock_length && self.lock_angle => {
                self.start = point;
                self.end = self.end + delta;
            }
            "start" => self.start = point,
            "end" => self.end = point,
            _ => return false,
        }
        if let Some((a, b)) = self.reference_points(&input.path) {
            self.apply_locks(a, b);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Outcome, assert_approx_eq};

    fn transform(path: &str) -> (TransformTwoPoints, EffectInput) {
        let input = EffectInput::new(path.parse().unwrap());
        let mut effect =
            TransformTwoPoints::from_params(&ParamSet::defaults(&TransformTwoPoints::specs()));
        effect.on_apply(&input);
        (effect, input)
    }

    fn node(output: &EffectOutput, index: usize) -> Point {
        output.path.nodes()[index]
    }

    #[test]
    fn test_applied_is_identity() {
        let (effect, input) = transform("M0,0 L10,0 L5,5");
        assert_eq!(effect.last_knot, 3);
        assert!(effect.start.is_close_to(Point::new(0.0, 0.0)));
        assert!(effect.end.is_close_to(Point::new(5.0, 5.0)));
        let output = effect.do_effect(&input);
        assert!(output.is_applied());
        for (p0, p1) in output.path.nodes().into_iter().zip(input.path.nodes()) {
            assert!(p0.is_near(p1, 1e-9));
        }
    }

    #[test]
    fn test_similarity() {
        let (mut effect, input) = transform("M0,0 L10,0 L5,5");
        effect.last_knot = 2;
        effect.start = Point::new(5.0, 5.0);
        effect.end = Point::new(5.0, 25.0);
        let output = effect.do_effect(&input);
        assert!(node(&output, 0).is_near(Point::new(5.0, 5.0), 1e-9));
        assert!(node(&output, 1).is_near(Point::new(5.0, 25.0), 1e-9));
        assert!(node(&output, 2).is_near(Point::new(-5.0, 15.0), 1e-9));

        effect.offset = 90.0;
        let output = effect.do_effect(&input);
        assert!(node(&output, 0).is_near(Point::new(5.0, 5.0), 1e-9));
        assert!(node(&output, 1).is_near(Point::new(-15.0, 5.0), 1e-9));
    }

    #[test]
    fn test_elastic_flip_stretch() {
        let (mut effect, input) = transform("M0,0 L10,0 L5,5");
        effect.last_knot = 2;
        effect.start = Point::new(0.0, 0.0);
        effect.end = Point::new(20.0, 0.0);
        assert!(node(&effect.do_effect(&input), 2).is_near(Point::new(10.0, 10.0), 1e-9));
        effect.elastic = true;
        assert!(node(&effect.do_effect(&input), 2).is_near(Point::new(10.0, 5.0), 1e-9));
        effect.end = Point::new(5.0, 0.0);
        assert!(node(&effect.do_effect(&input), 2).is_near(Point::new(2.5, 3.75), 1e-9));

        effect.elastic = false;
        effect.end = Point::new(10.0, 0.0);
        effect.flip_vertical = true;
        assert!(node(&effect.do_effect(&input), 2).is_near(Point::new(5.0, -5.0), 1e-9));
        effect.flip_horizontal = true;
        assert!(node(&effect.do_effect(&input), 2).is_near(Point::new(-5.0, -5.0), 1e-9));

        effect.flip_horizontal = false;
        effect.flip_vertical = false;
        effect.stretch = 2.0;
        assert!(node(&effect.do_effect(&input), 2).is_near(Point::new(5.0, 10.0), 1e-9));
    }

    #[test]
    fn test_locks() {
        let (mut effect, input) = transform("M0,0 L10,0");
        effect.lock_length = true;
        assert!(effect.set_knot("end", Point::new(0.0, 50.0), &input));
        assert!(effect.end.is_near(Point::new(0.0, 10.0), 1e-9));

        effect.lock_length = false;
        effect.lock_angle = true;
        effect.end = Point::new(0.0, 30.0);
        effect.before_effect(&input, &Environment::default());
        assert!(effect.end.is_near(Point::new(30.0, 0.0), 1e-9));

        effect.lock_length = true;
        assert!(effect.set_knot("start", Point::new(5.0, 5.0), &input));
        assert!(effect.end.is_near(Point::new(15.0, 5.0), 1e-9));
        let output = effect.do_effect(&input);
        assert!(node(&output, 0).is_near(Point::new(5.0, 5.0), 1e-9));
        assert_approx_eq!(node(&output, 1).dist(node(&output, 0)), 10.0, 1e-9);
        assert!(!effect.set_knot("middle", Point::new(0.0, 0.0), &input));
    }

    #[test]
    fn test_original_width() {
        let (mut effect, input) = transform("M0,0 L10,0 L10,4 L0,4 Z");
        effect.from_original_width = true;
        effect.on_apply(&input);
        assert!(effect.start.is_close_to(Point::new(0.0, 2.0)));
        assert!(effect.end.is_close_to(Point::new(10.0, 2.0)));
        effect.end = Point::new(20.0, 2.0);
        let output = effect.do_effect(&input);
        let bbox = output.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.width(), 20.0, 1e-9);
        assert_approx_eq!(bbox.height(), 8.0, 1e-9);
    }

    #[test]
    fn test_degenerate() {
        let (mut effect, input) = transform("M0,0 L10,0 L5,5");
        effect.first_knot = 2;
        effect.last_knot = 2;
        let output = effect.do_effect(&input);
        assert_eq!(
            output.outcome,
            Outcome::Unchanged(Reason::Degenerate("reference points coincide"))
        );
        assert_eq!(output.path, input.path);

        effect.first_knot = 1;
        effect.end = effect.start;
        assert!(!effect.do_effect(&input).is_applied());
    }
}
