//! Copies of a path rotated around an origin
use crate::{
    EffectInput, EffectOutput, EffectType, ParamSet, ParamSpec, ParamValue, Path, PathEffect,
    Point, Reason, Scalar, Transform,
};

#[derive(Debug, Clone)]
pub struct CopyRotate {
    pub origin: Point,
    /// Angle of the first copy in degrees
    pub starting_angle: Scalar,
    /// Angle between successive copies in degrees
    pub rotation_angle: Scalar,
    pub num_copies: usize,
    /// Spread copies evenly over the full turn ignoring `rotation_angle`
    pub copies_to_360: bool,
    /// Distance of the angle knots from the origin
    handle_distance: Scalar,
}

impl CopyRotate {
    /// Angle between successive copies in degrees
    pub fn step(&self) -> Scalar {
        if self.copies_to_360 && self.num_copies > 0 {
            360.0 / self.num_copies as Scalar
        } else {
            self.rotation_angle
        }
    }

    /// Rotation of the copy with `index` around the origin
    ///
    /// Angles are negated so positive values turn counter-clockwise on screen
    /// where y-axis points down.
    pub fn copy_transform(&self, index: usize) -> Transform {
        let angle = self.starting_angle + self.step() * index as Scalar;
        Transform::identity().rotate_around(-angle.to_radians(), self.origin)
    }

    fn angle_knot(&self, angle: Scalar) -> Point {
        self.origin + Point::polar(-angle.to_radians(), self.handle_distance)
    }

    /// Angle of the knot at `point` in degrees
    fn knot_angle(&self, point: Point) -> Option<Scalar> {
        let direction = point - self.origin;
        direction.normalize()?;
        Some(-direction.angle().to_degrees())
    }
}

impl PathEffect for CopyRotate {
    const TYPE: EffectType = EffectType::CopyRotate;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::point("origin", Point::new(0.0, 0.0)),
            ParamSpec::scalar("starting_angle", 0.0),
            ParamSpec::scalar("rotation_angle", 30.0),
            ParamSpec::int("num_copies", 5).range(0.0, 1000.0),
            ParamSpec::bool("copiesTo360", true),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            origin: Point::new(0.0, 0.0),
            starting_angle: 0.0,
            rotation_angle: 30.0,
            num_copies: 5,
            copies_to_360: true,
            handle_distance: 100.0,
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.origin = params.point("origin").unwrap_or(self.origin);
        self.starting_angle = params.scalar("starting_angle").unwrap_or(self.starting_angle);
        self.rotation_angle = params.scalar("rotation_angle").unwrap_or(self.rotation_angle);
        if let Some(num_copies) = params.int("num_copies") {
            self.num_copies = num_copies.max(0) as usize;
        }
        self.copies_to_360 = params.bool("copiesTo360").unwrap_or(self.copies_to_360);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("origin", ParamValue::Point(self.origin))
            .with("starting_angle", ParamValue::Scalar(self.starting_angle))
            .with("rotation_angle", ParamValue::Scalar(self.rotation_angle))
            .with("num_copies", ParamValue::Int(self.num_copies as i64))
            .with("copiesTo360", ParamValue::Bool(self.copies_to_360))
    }

    /// Origin on the left side of the item, angle knots at its width
    fn on_apply(&mut self, input: &EffectInput) {
        if let Some(bbox) = input.path.bbox(Transform::identity()) {
            self.origin = Point::new(bbox.min().x(), bbox.mid().y());
            if bbox.width() > 0.0 {
                self.handle_distance = bbox.width();
            }
        }
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        if input.path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        if self.num_copies == 0 {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("no copies"));
        }
        let output: Path = (0..self.num_copies)
            .flat_map(|index| input.path.transformed(self.copy_transform(index)))
            .collect();
        EffectOutput::applied(output)
    }

    fn knots(&self, _input: &EffectInput) -> Vec<(String, Point)> {
        vec![
            ("origin".to_owned(), self.origin),
            (
                "starting_angle".to_owned(),
                self.angle_knot(self.starting_angle),
            ),
            (
                "rotation_angle".to_owned(),
                self.angle_knot(self.starting_angle + self.step()),
            ),
        ]
    }

    fn set_knot(&mut self, name: &str, point: Point, _input: &EffectInput) -> bool {
        match name {
            "origin" => self.origin = point,
            "starting_angle" => match self.knot_angle(point) {
                Some(angle) => self.starting_angle = angle,
                None => return false,
            },
            "rotation_angle" if !self.copies_to_360 => match self.knot_angle(point) {
                Some(angle) => {
                    self.rotation_angle = (angle - self.starting_angle).rem_euclid(360.0)
                }
                None => return false,
            },
            _ => return false,
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assert_approx_eq;

    fn copy_rotate() -> CopyRotate {
        CopyRotate::from_params(&ParamSet::defaults(&CopyRotate::specs()))
    }

    #[test]
    fn test_full_turn() -> Result<(), crate::Error> {
        let input = EffectInput::new("M1,0 L2,0".parse()?);
        let mut effect = copy_rotate();
        effect.num_copies = 4;
        assert_approx_eq!(effect.step(), 90.0);
        let output = effect.do_effect(&input);
        assert!(output.is_applied());
        let starts: Vec<Point> = output.path.subpaths().iter().map(|s| s.start()).collect();
        assert_eq!(starts.len(), 4);
        // screen counter-clockwise is clockwise with y-axis up
        let expected = [(1.0, 0.0), (0.0, -1.0), (-1.0, 0.0), (0.0, 1.0)];
        for (start, expected) in starts.iter().zip(expected) {
            assert!(start.is_near(expected.into(), 1e-9), "{:?}", start);
        }
        Ok(())
    }

    #[test]
    fn test_fixed_angle() -> Result<(), crate::Error> {
        let input = EffectInput::new("M10,0 L10,1".parse()?);
        let mut effect = copy_rotate();
        effect.copies_to_360 = false;
        effect.rotation_angle = 45.0;
        effect.starting_angle = 90.0;
        effect.num_copies = 2;
        effect.origin = Point::new(5.0, 0.0);
        let output = effect.do_effect(&input);
        assert_eq!(output.path.subpaths().len(), 2);
        assert!(output.path.subpaths()[0].start().is_near(Point::new(5.0, -5.0), 1e-9));
        let diag = 5.0 / 2.0f64.sqrt();
        let second = output.path.subpaths()[1].start();
        assert!(second.is_near(Point::new(5.0 - diag, -diag), 1e-9), "{:?}", second);

        effect.num_copies = 0;
        assert!(!effect.do_effect(&input).is_applied());
        Ok(())
    }

    #[test]
    fn test_knots() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,0 L10,4 L0,4 Z".parse()?);
        let mut effect = copy_rotate();
        effect.on_apply(&input);
        assert!(effect.origin.is_near(Point::new(0.0, 2.0), 1e-9));
        let knots = effect.knots(&input);
        assert_eq!(knots.len(), 3);
        assert!(knots[1].1.is_near(Point::new(10.0, 2.0), 1e-9));

        assert!(effect.set_knot("starting_angle", Point::new(0.0, -8.0), &input));
        assert_approx_eq!(effect.starting_angle, 90.0, 1e-9);
        // rotation angle follows the number of copies
        assert!(!effect.set_knot("rotation_angle", Point::new(5.0, 2.0), &input));
        effect.copies_to_360 = false;
        assert!(effect.set_knot("rotation_angle", Point::new(-10.0, 2.0), &input));
        assert_approx_eq!(effect.rotation_angle, 90.0, 1e-9);
        assert!(!effect.set_knot("starting_angle", effect.origin, &input));
        Ok(())
    }
}
