//! Bend a path along a skeleton curve
use crate::{
    BBox, Curve, Derived, EffectInput, EffectOutput, EffectType, Environment, PI, ParamSet,
    ParamSpec, ParamValue, Path, PathEffect, Point, Reason, Scalar, Segment, Transform,
    content_hash, do_effect_pwd2,
    piecewise::{Fragment, Piecewise},
};

/// Tolerance used to re-parametrize skeleton by arc length
const SKELETON_TOLERANCE: Scalar = 0.1;

/// Skeleton parametrized by arc length together with its unit normal field
#[derive(Debug, Clone)]
struct Skeleton {
    curve: Piecewise<Fragment>,
    normal: Piecewise<Fragment>,
}

impl Skeleton {
    fn new(path: &Path) -> Self {
        let curve = Piecewise::from_path(path)
            .arc_length_parametrization(SKELETON_TOLERANCE)
            .remove_short_cuts(0.01);
        let normal = curve
            .derivative()
            .rot90()
            .remove_short_cuts(0.1)
            .force_continuity(0.0, false);
        Self { curve, normal }
    }

    /// Total length of the skeleton
    fn length(&self) -> Scalar {
        self.curve.domain().map_or(0.0, |(_, end)| end)
    }
}

#[derive(Debug, Clone)]
pub struct BendPath {
    /// Skeleton the path is bent along
    pub bend_path: Path,
    /// Width of the result relative to the original height
    pub prop_scale: Scalar,
    /// Multiply width by the horizontal stretch
    pub scale_y_rel: bool,
    /// Path is laid along the skeleton by its vertical extent
    pub vertical: bool,
    /// Knot controlling `prop_scale`
    pub width: Point,
    skeleton: Derived<Skeleton>,
    bbox: Option<BBox>,
}

impl BendPath {
    /// Horizontal skeleton through the middle of `bbox` and the width knot on its top
    pub fn reset_defaults(&mut self, bbox: BBox) {
        let y = (bbox.min().y() + bbox.max().y()) / 2.0;
        let start = Point::new(bbox.min().x(), y);
        let mut end = Point::new(bbox.max().x(), y);
        if start.is_close_to(end) {
            end = end + Point::new(1.0, 0.0);
        }
        let mut builder = Path::builder();
        builder.move_to(start).line_to(end);
        self.bend_path = builder.build();
        self.prop_scale = 1.0;
        self.bbox = Some(bbox);
        self.skeleton.invalidate();
        if let Some(width) = self.width_knot() {
            self.width = width;
        }
    }

    /// Start of the skeleton and direction in which width knot is placed
    fn anchor(&self) -> Option<(Point, Scalar)> {
        let first = self.bend_path.subpaths().first()?.first();
        let direction = match first {
            Segment::Cubic(cubic) if !cubic.points()[1].is_close_to(first.start()) => {
                cubic.points()[1] - first.start()
            }
            _ => first.start_tangent()?,
        };
        Some((first.start(), direction.angle() + PI / 2.0))
    }

    /// Width knot position derived from `prop_scale` and the original height
    fn width_knot(&self) -> Option<Point> {
        let (start, angle) = self.anchor()?;
        let height = self.bbox?.height();
        Some(start + Point::polar(angle, self.prop_scale * height / 2.0))
    }

    fn skeleton_path<'a>(&'a self, input: &'a EffectInput) -> Option<&'a Path> {
        match input.aux.path("bendpath") {
            Some(path) => path,
            None => Some(&self.bend_path),
        }
    }
}

impl PathEffect for BendPath {
    const TYPE: EffectType = EffectType::BendPath;

    fn specs() -> Vec<ParamSpec> {
        let mut builder = Path::builder();
        builder.move_to((0.0, 0.0)).line_to((1.0, 0.0));
        vec![
            ParamSpec::path("bendpath", builder.build()),
            ParamSpec::scalar("prop_scale", 1.0),
            ParamSpec::bool("scale_y_rel", false),
            ParamSpec::bool("vertical", false),
            ParamSpec::point("width", Point::new(0.0, 0.0)),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            bend_path: Path::empty(),
            prop_scale: 1.0,
            scale_y_rel: false,
            vertical: false,
            width: Point::new(0.0, 0.0),
            skeleton: Derived::default(),
            bbox: None,
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        if let Some(path) = params.path("bendpath") {
            self.bend_path = path.clone();
        }
        self.prop_scale = params.scalar("prop_scale").unwrap_or(self.prop_scale);
        self.scale_y_rel = params.bool("scale_y_rel").unwrap_or(self.scale_y_rel);
        self.vertical = params.bool("vertical").unwrap_or(self.vertical);
        self.width = params.point("width").unwrap_or(self.width);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("bendpath", ParamValue::Path(self.bend_path.clone()))
            .with("prop_scale", ParamValue::Scalar(self.prop_scale))
            .with("scale_y_rel", ParamValue::Bool(self.scale_y_rel))
            .with("vertical", ParamValue::Bool(self.vertical))
            .with("width", ParamValue::Point(self.width))
    }

    fn on_apply(&mut self, input: &EffectInput) {
        if let Some(bbox) = input.path.bbox(Transform::identity()) {
            self.reset_defaults(bbox);
        }
    }

    fn before_effect(&mut self, input: &EffectInput, _env: &Environment) {
        self.bbox = input.path.bbox(Transform::identity());
        if let Some(width) = self.width_knot() {
            self.width = width;
        }
        match self.skeleton_path(input) {
            Some(path) => {
                let path = path.clone();
                self.skeleton
                    .get_or_update(content_hash(&path), || Skeleton::new(&path));
            }
            None => self.skeleton.invalidate(),
        }
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        if self.skeleton_path(input).is_none() {
            return EffectOutput::unchanged(&input.path, Reason::MissingReference("bendpath"));
        }
        let (Some(bbox), Some(skeleton)) = (self.bbox, self.skeleton.get()) else {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        };
        if skeleton.curve.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("empty skeleton"));
        }
        let (horizontal, vertical) = if self.vertical {
            ((bbox.min().y(), bbox.max().y()), (bbox.min().x(), bbox.max().x()))
        } else {
            ((bbox.min().x(), bbox.max().x()), (bbox.min().y(), bbox.max().y()))
        };
        let extent = horizontal.1 - horizontal.0;
        if extent <= 0.0 {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("zero width path"));
        }
        let scaling = skeleton.length() / extent;
        let y_scale = if self.scale_y_rel {
            scaling * self.prop_scale
        } else {
            self.prop_scale
        };
        let output = do_effect_pwd2(&input.path, true, |pattern| {
            let (x, y) = pattern.make_cuts_independent();
            let (x, y) = if self.vertical { (y, x) } else { (x, y) };
            let x = x.shift(-horizontal.0).scale(scaling);
            let y = y.shift(-(vertical.0 + vertical.1) / 2.0).scale(y_scale);
            let along = skeleton.curve.compose(&x);
            let across = y.mul_curve(&skeleton.normal.compose(&x));
            Some(along.add(&across))
        });
        let Some(output) = output.filter(|output| !output.is_empty()) else {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("empty result"));
        };
        let mut indicators = Vec::new();
        if let Some((start, _)) = self.anchor() {
            let mut builder = Path::builder();
            builder.move_to(self.width).line_to(start);
            indicators.push(builder.build());
        }
        EffectOutput::applied(output).with_indicators(indicators)
    }

    fn knots(&self, _input: &EffectInput) -> Vec<(String, Point)> {
        vec![("width".to_owned(), self.width)]
    }

    fn set_knot(&mut self, name: &str, point: Point, _input: &EffectInput) -> bool {
        if name != "width" {
            return false;
        }
        let (Some((start, _)), Some(bbox)) = (self.anchor(), self.bbox) else {
            return false;
        };
        if bbox.height() > 0.0 {
            self.prop_scale = 2.0 * point.dist(start) / bbox.height();
        }
        if let Some(width) = self.width_knot() {
            self.width = width;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuxInputs, Effect, assert_approx_eq};

    fn rectangle() -> Path {
        "M0,4 L10,4 L10,6 L0,6 Z".parse().unwrap()
    }

    fn bend(input: &EffectInput) -> (BendPath, EffectOutput) {
        let mut effect = BendPath::from_params(&ParamSet::defaults(&BendPath::specs()));
        effect.on_apply(input);
        effect.before_effect(input, &Environment::default());
        let output = effect.do_effect(input);
        (effect, output)
    }

    #[test]
    fn test_defaults_from_bbox() {
        let input = EffectInput::new(rectangle());
        let (effect, output) = bend(&input);
        let nodes = effect.bend_path.nodes();
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_near(Point::new(0.0, 5.0), 1e-9));
        assert!(nodes[1].is_near(Point::new(10.0, 5.0), 1e-9));
        assert!(effect.width.is_near(Point::new(0.0, 6.0), 1e-9));
        assert_eq!(output.indicators.len(), 1);
    }

    #[test]
    fn test_straight_skeleton_is_identity() {
        let input = EffectInput::new(rectangle());
        let (_, output) = bend(&input);
        assert!(output.is_applied());
        let bbox = output.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.x(), 0.0, 1e-3);
        assert_approx_eq!(bbox.y(), 4.0, 1e-3);
        assert_approx_eq!(bbox.width(), 10.0, 1e-3);
        assert_approx_eq!(bbox.height(), 2.0, 1e-3);
        assert!(output.path.subpaths()[0].closed());
    }

    #[test]
    fn test_bend_along_arc() {
        let input = EffectInput::new(rectangle());
        let mut effect = BendPath::from_params(&ParamSet::defaults(&BendPath::specs()));
        effect.on_apply(&input);
        // half circle of radius 10 centered at the origin
        let mut builder = Path::builder();
        builder
            .move_to((-10.0, 0.0))
            .arc_to((10.0, 10.0), 0.0, false, true, (10.0, 0.0));
        effect.bend_path = builder.build();
        effect.before_effect(&input, &Environment::default());
        let output = effect.do_effect(&input);
        assert!(output.is_applied());
        // every output point stays within the band around the circle
        for subpath in output.path.subpaths() {
            for segment in subpath.segments() {
                for step in 0..=8 {
                    let radius = segment.at(step as Scalar / 8.0).length();
                    assert!(radius > 9.0 - 1e-2 && radius < 11.0 + 1e-2, "{}", radius);
                }
            }
        }
    }

    #[test]
    fn test_width_knot() {
        let input = EffectInput::new(rectangle());
        let (mut effect, _) = bend(&input);
        assert!(effect.set_knot("width", Point::new(0.0, 7.0), &input));
        assert_approx_eq!(effect.prop_scale, 2.0, 1e-9);
        effect.before_effect(&input, &Environment::default());
        let output = effect.do_effect(&input);
        let bbox = output.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.height(), 4.0, 1e-3);
        assert!(!effect.set_knot("height", Point::new(0.0, 0.0), &input));
    }

    #[test]
    fn test_missing_reference() {
        let input =
            EffectInput::new(rectangle()).with_aux(AuxInputs::default().with_path("bendpath", None));
        let mut effect = Effect::new(EffectType::BendPath).unwrap();
        let output = effect.apply(&input, &Environment::default());
        assert_eq!(
            output.outcome,
            crate::Outcome::Unchanged(Reason::MissingReference("bendpath"))
        );
        assert_eq!(output.path, input.path);
    }

    #[test]
    fn test_skeleton_cache() {
        let input = EffectInput::new(rectangle());
        let (mut effect, _) = bend(&input);
        let length = effect.skeleton.get().unwrap().length();
        assert_approx_eq!(length, 10.0, 1e-6);
        effect.bend_path = "M0,0 L20,0".parse().unwrap();
        effect.before_effect(&input, &Environment::default());
        assert_approx_eq!(effect.skeleton.get().unwrap().length(), 20.0, 1e-6);
    }
}
