//! Offset of the filled region or of the open curves
use crate::{
    EffectInput, EffectOutput, EffectType, Environment, FillRule, LineCap, LineJoin, ParamSet,
    ParamSpec, ParamValue, Path, PathEffect, Point, Reason, Scalar, StrokeStyle, SubPath, Transform,
    boolean::{difference, flatten},
    intersect::{INTERSECT_TOLERANCE, remove_self_intersections},
    param::impl_choice,
};

/// Gap between inward offset and the band subtracted from it
const BAND_GAP: Scalar = 0.05;

/// Join used between offset segments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OffsetJoin {
    Bevel,
    #[default]
    Round,
    Miter,
    MiterClip,
    Extrapolate,
    Extrapolate1,
    Extrapolate2,
    Extrapolate3,
}

impl_choice!(OffsetJoin, {
    Bevel => "bevel",
    Round => "round",
    Miter => "miter",
    MiterClip => "miter-clip",
    Extrapolate => "extrp_arc",
    Extrapolate1 => "extrp_arc1",
    Extrapolate2 => "extrp_arc2",
    Extrapolate3 => "extrp_arc3",
});

impl OffsetJoin {
    pub fn line_join(self, miter_limit: Scalar) -> LineJoin {
        match self {
            OffsetJoin::Bevel => LineJoin::Bevel,
            OffsetJoin::Round => LineJoin::Round,
            OffsetJoin::Miter => LineJoin::Miter(miter_limit),
            OffsetJoin::MiterClip => LineJoin::MiterClip(miter_limit),
            OffsetJoin::Extrapolate
            | OffsetJoin::Extrapolate1
            | OffsetJoin::Extrapolate2
            | OffsetJoin::Extrapolate3 => LineJoin::Extrapolate(miter_limit),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Offset {
    /// Signed distance, positive grows the filled region
    pub offset: Scalar,
    pub linejoin_type: OffsetJoin,
    pub miter_limit: Scalar,
    /// Ignore miter limit
    pub attempt_force_join: bool,
    /// Moving the knot changes the offset
    pub update_on_knot_move: bool,
    /// Offset handle, selects the side for open sub-paths, not finite if never placed
    pub offset_pt: Point,
}

impl Offset {
    fn style(&self) -> StrokeStyle {
        let miter_limit = if self.attempt_force_join {
            Scalar::MAX
        } else {
            self.miter_limit
        };
        StrokeStyle {
            width: 2.0 * self.offset.abs(),
            line_join: self.linejoin_type.line_join(miter_limit),
            line_cap: LineCap::Butt,
        }
    }

    /// Signed offset defined by the point
    ///
    /// Magnitude is the distance to the region flattened with the fill rule, the
    /// value is negative when the point is inside of the region.
    pub fn offset_at(path: &Path, fill_rule: FillRule, point: Point) -> Scalar {
        let filled = flatten(&path.to_line_and_cubic(), fill_rule);
        let Some((_, _, distance)) = filled.nearest(point) else {
            return 0.0;
        };
        if filled.winding(point) % 2 != 0 {
            -distance
        } else {
            distance
        }
    }

    /// Offset of all closed sub-paths taken as a single region
    fn offset_closed(&self, region: &Path) -> Path {
        let style = self.style();
        let mut outlines = Vec::new();
        for contour in region.subpaths() {
            let Some(outline) = contour.offset(self.offset, style) else {
                continue;
            };
            let outline = remove_self_intersections(&outline, INTERSECT_TOLERANCE);
            // collapsed contours turn inside out
            if outline.signed_area().signum() != contour.signed_area().signum() {
                continue;
            }
            let bbox = outline.bbox(None, Transform::identity());
            if self.offset > 0.0 && contour.signed_area() < 0.0 && bbox.min_extent() < self.offset
            {
                continue;
            }
            outlines.push(outline);
        }
        let result = flatten(&Path::new(outlines), FillRule::NonZero);
        if self.offset > 0.0 || result.is_empty() {
            return result;
        }
        // erase parts of the inward offset closer to the boundary than the offset
        let band = region.stroke(StrokeStyle {
            width: 2.0 * self.offset.abs() - BAND_GAP,
            ..style
        });
        difference(&result, &band)
    }

    /// One side offset of an open sub-path, the side nearest to the handle wins
    fn offset_open(&self, subpath: &SubPath) -> Option<SubPath> {
        let style = self.style();
        let distance = self.offset.abs();
        let right = subpath.offset(distance, style);
        let left = subpath.offset(-distance, style);
        let side = match (right, left) {
            (Some(right), Some(left)) if self.offset_pt.is_finite() => {
                let (_, to_right) = right.nearest(self.offset_pt);
                let (_, to_left) = left.nearest(self.offset_pt);
                if to_right <= to_left { right } else { left }
            }
            (Some(right), Some(left)) => {
                if self.offset > 0.0 {
                    right
                } else {
                    left
                }
            }
            (right, left) => right.or(left)?,
        };
        Some(remove_self_intersections(&side, INTERSECT_TOLERANCE))
    }
}

impl PathEffect for Offset {
    const TYPE: EffectType = EffectType::Offset;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::scalar("offset", 0.0),
            ParamSpec::choice("linejoin_type", OffsetJoin::KEYS, "round"),
            ParamSpec::scalar("miter_limit", 4.0).range(0.0, Scalar::INFINITY),
            ParamSpec::bool("attempt_force_join", true),
            ParamSpec::bool("update_on_knot_move", true),
            ParamSpec::point("offset_pt", Point::new(Scalar::INFINITY, Scalar::INFINITY)),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            offset: 0.0,
            linejoin_type: OffsetJoin::default(),
            miter_limit: 4.0,
            attempt_force_join: true,
            update_on_knot_move: true,
            offset_pt: Point::new(Scalar::INFINITY, Scalar::INFINITY),
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.offset = params.scalar("offset").unwrap_or(self.offset);
        self.linejoin_type = params.choice("linejoin_type").unwrap_or(self.linejoin_type);
        self.miter_limit = params.scalar("miter_limit").unwrap_or(self.miter_limit);
        self.attempt_force_join = params
            .bool("attempt_force_join")
            .unwrap_or(self.attempt_force_join);
        self.update_on_knot_move = params
            .bool("update_on_knot_move")
            .unwrap_or(self.update_on_knot_move);
        self.offset_pt = params.point("offset_pt").unwrap_or(self.offset_pt);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("offset", ParamValue::Scalar(self.offset))
            .with(
                "linejoin_type",
                ParamValue::Enum(self.linejoin_type.key().to_owned()),
            )
            .with("miter_limit", ParamValue::Scalar(self.miter_limit))
            .with("attempt_force_join", ParamValue::Bool(self.attempt_force_join))
            .with("update_on_knot_move", ParamValue::Bool(self.update_on_knot_move))
            .with("offset_pt", ParamValue::Point(self.offset_pt))
    }

    fn on_apply(&mut self, input: &EffectInput) {
        if let Some(subpath) = input.path.subpaths().first() {
            self.offset_pt = subpath.start();
        }
    }

    fn before_effect(&mut self, input: &EffectInput, _env: &Environment) {
        if self.offset == 0.0 {
            if let Some(subpath) = input.path.subpaths().first() {
                self.offset_pt = subpath.start();
            }
        }
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        let path = input.path.to_line_and_cubic();
        if path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        if self.offset == 0.0 {
            return EffectOutput::applied(path);
        }
        let (closed, open): (Vec<_>, Vec<_>) = path
            .subpaths()
            .iter()
            .cloned()
            .partition(SubPath::closed);
        let mut output = Path::empty();
        if !closed.is_empty() {
            let region = flatten(&Path::new(closed), input.fill_rule);
            output.extend(self.offset_closed(&region));
        }
        output.extend(open.iter().filter_map(|subpath| self.offset_open(subpath)));
        if output.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("offset collapsed"));
        }
        EffectOutput::applied(output)
    }

    fn knots(&self, input: &EffectInput) -> Vec<(String, Point)> {
        let point = if self.offset_pt.is_finite() {
            self.offset_pt
        } else {
            match input.path.subpaths().first() {
                Some(subpath) => subpath.start(),
                None => return Vec::new(),
            }
        };
        vec![("offset_pt".to_owned(), point)]
    }

    fn set_knot(&mut self, name: &str, point: Point, input: &EffectInput) -> bool {
        if name != "offset_pt" {
            return false;
        }
        self.offset_pt = point;
        if self.update_on_knot_move {
            self.offset = Self::offset_at(&input.path, input.fill_rule, point);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BBox, assert_approx_eq};

    fn offset(distance: Scalar) -> Offset {
        let mut params = ParamSet::defaults(&Offset::specs());
        params.set("offset", ParamValue::Scalar(distance));
        Offset::from_params(&params)
    }

    fn bbox(path: &Path) -> BBox {
        path.bbox(Transform::identity()).unwrap()
    }

    #[test]
    fn test_offset_monotonicity() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let input = EffectInput::new(square.clone());

        let grown = offset(1.0).do_effect(&input);
        assert!(grown.is_applied());
        let grown_bbox = bbox(&grown.path);
        assert_approx_eq!(grown_bbox.width(), 12.0, 1e-3);
        assert_approx_eq!(grown_bbox.height(), 12.0, 1e-3);
        assert!(grown_bbox.area() > bbox(&square).area());

        let shrunk = offset(-1.0).do_effect(&input);
        assert!(shrunk.is_applied());
        let shrunk_bbox = bbox(&shrunk.path);
        assert_approx_eq!(shrunk_bbox.width(), 8.0, 1e-3);
        assert_approx_eq!(shrunk_bbox.height(), 8.0, 1e-3);
        assert!(shrunk_bbox.area() < bbox(&square).area());
        assert!(shrunk.path.subpaths().iter().all(SubPath::closed));
        Ok(())
    }

    #[test]
    fn test_reversed_input() -> Result<(), crate::Error> {
        // clockwise contour is grown as well
        let square: Path = "M0,0 L0,10 L10,10 L10,0 Z".parse()?;
        let output = offset(2.0).do_effect(&EffectInput::new(square));
        assert_approx_eq!(bbox(&output.path).width(), 14.0, 1e-3);
        Ok(())
    }

    #[test]
    fn test_open_path_one_side() -> Result<(), crate::Error> {
        let corner: Path = "M0,0 L10,0 L10,10".parse()?;
        let input = EffectInput::new(corner.clone());
        let mut effect = offset(3.0);
        effect.offset_pt = Point::new(14.0, -4.0);
        let output = effect.do_effect(&input);
        assert!(output.is_applied());
        assert_eq!(output.path.subpaths().len(), 1);
        assert!(!output.path.subpaths()[0].closed());
        let result = bbox(&output.path);
        let source = bbox(&corner);
        // grows by the offset on the side of the handle
        assert_approx_eq!(result.min().y(), source.min().y() - 3.0, 1e-3);
        assert_approx_eq!(result.max().x(), source.max().x() + 3.0, 1e-3);
        assert_approx_eq!(result.min().x(), source.min().x(), 1e-3);
        assert_approx_eq!(result.max().y(), source.max().y(), 1e-3);
        Ok(())
    }

    #[test]
    fn test_zero_offset() -> Result<(), crate::Error> {
        let path: Path = "M1,2 L10,0 L10,10 Z".parse()?;
        let input = EffectInput::new(path.clone());
        let mut effect = offset(0.0);
        effect.before_effect(&input, &Environment::default());
        let output = effect.do_effect(&input);
        assert!(output.is_applied());
        assert_eq!(output.path, path);
        assert_eq!(effect.offset_pt, Point::new(1.0, 2.0));
        Ok(())
    }

    #[test]
    fn test_knot_sets_offset() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let input = EffectInput::new(square);
        let mut effect = offset(0.0);
        assert!(effect.set_knot("offset_pt", Point::new(5.0, 13.0), &input));
        assert_approx_eq!(effect.offset, 3.0, 1e-6);
        assert!(effect.set_knot("offset_pt", Point::new(5.0, 8.0), &input));
        assert_approx_eq!(effect.offset, -2.0, 1e-6);
        effect.update_on_knot_move = false;
        assert!(effect.set_knot("offset_pt", Point::new(5.0, 20.0), &input));
        assert_approx_eq!(effect.offset, -2.0, 1e-6);
        assert_eq!(effect.knots(&input)[0].1, Point::new(5.0, 20.0));
        Ok(())
    }

    #[test]
    fn test_join_keys() -> Result<(), crate::Error> {
        assert_eq!("miter-clip".parse::<OffsetJoin>()?, OffsetJoin::MiterClip);
        assert_eq!(
            "extrp_arc2".parse::<OffsetJoin>()?.line_join(4.0),
            LineJoin::Extrapolate(4.0)
        );
        assert!("sharp".parse::<OffsetJoin>().is_err());
        Ok(())
    }
}
