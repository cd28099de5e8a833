//! Outline of the path stroked with configurable joins and caps
use crate::{
    EffectInput, EffectOutput, EffectType, LineCap, LineJoin, ParamSet, ParamSpec, ParamValue,
    PathEffect, Reason, Scalar, StrokeStyle, param::impl_choice,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CapType {
    #[default]
    Butt,
    Round,
    Square,
    Peak,
}

impl_choice!(CapType, {
    Butt => "butt",
    Round => "round",
    Square => "square",
    Peak => "peak",
});

impl CapType {
    pub fn line_cap(self) -> LineCap {
        match self {
            CapType::Butt => LineCap::Butt,
            CapType::Round => LineCap::Round,
            CapType::Square => LineCap::Square,
            CapType::Peak => LineCap::Peak,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinKind {
    Bevel,
    Round,
    Miter,
    Extrapolated,
    #[default]
    ExtrapolatedArc,
}

impl_choice!(JoinKind, {
    Bevel => "bevel",
    Round => "round",
    Miter => "miter",
    Extrapolated => "extrapolated",
    ExtrapolatedArc => "extrp_arc",
});

impl JoinKind {
    pub fn line_join(self, miter_limit: Scalar) -> LineJoin {
        match self {
            JoinKind::Bevel => LineJoin::Bevel,
            JoinKind::Round => LineJoin::Round,
            JoinKind::Miter => LineJoin::Miter(miter_limit),
            JoinKind::Extrapolated | JoinKind::ExtrapolatedArc => {
                LineJoin::Extrapolate(miter_limit)
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct JoinType {
    pub line_width: Scalar,
    pub linecap_type: CapType,
    pub linejoin_type: JoinKind,
    pub miter_limit: Scalar,
    /// Ignore miter limit
    pub attempt_force_join: bool,
}

impl JoinType {
    pub fn style(&self) -> StrokeStyle {
        let miter_limit = if self.attempt_force_join {
            Scalar::MAX
        } else {
            self.miter_limit
        };
        StrokeStyle {
            width: self.line_width,
            line_join: self.linejoin_type.line_join(miter_limit),
            line_cap: self.linecap_type.line_cap(),
        }
    }
}

impl PathEffect for JoinType {
    const TYPE: EffectType = EffectType::JoinType;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::scalar("line_width", 1.0).range(0.0, Scalar::INFINITY),
            ParamSpec::choice("linecap_type", CapType::KEYS, "butt"),
            ParamSpec::choice("linejoin_type", JoinKind::KEYS, "extrp_arc"),
            ParamSpec::scalar("miter_limit", 100.0).range(0.0, Scalar::INFINITY),
            ParamSpec::bool("attempt_force_join", true),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            line_width: 1.0,
            linecap_type: CapType::default(),
            linejoin_type: JoinKind::default(),
            miter_limit: 100.0,
            attempt_force_join: true,
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        self.line_width = params.scalar("line_width").unwrap_or(self.line_width);
        self.linecap_type = params.choice("linecap_type").unwrap_or(self.linecap_type);
        self.linejoin_type = params.choice("linejoin_type").unwrap_or(self.linejoin_type);
        self.miter_limit = params.scalar("miter_limit").unwrap_or(self.miter_limit);
        self.attempt_force_join = params
            .bool("attempt_force_join")
            .unwrap_or(self.attempt_force_join);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("line_width", ParamValue::Scalar(self.line_width))
            .with(
                "linecap_type",
                ParamValue::Enum(self.linecap_type.key().to_owned()),
            )
            .with(
                "linejoin_type",
                ParamValue::Enum(self.linejoin_type.key().to_owned()),
            )
            .with("miter_limit", ParamValue::Scalar(self.miter_limit))
            .with("attempt_force_join", ParamValue::Bool(self.attempt_force_join))
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        let path = input.path.to_line_and_cubic();
        if path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        if self.line_width <= 0.0 {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("zero line width"));
        }
        let outline =
            tracing::debug_span!("[join_type:stroke]").in_scope(|| path.stroke(self.style()));
        if outline.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("empty outline"));
        }
        EffectOutput::applied(outline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Path, Transform, assert_approx_eq};

    fn join_type(width: Scalar, cap: CapType, join: JoinKind) -> JoinType {
        let mut params = ParamSet::defaults(&JoinType::specs());
        params.set("line_width", ParamValue::Scalar(width));
        params.set("linecap_type", ParamValue::Enum(cap.key().to_owned()));
        params.set("linejoin_type", ParamValue::Enum(join.key().to_owned()));
        JoinType::from_params(&params)
    }

    #[test]
    fn test_stroke_line() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,0".parse()?);

        let output = join_type(2.0, CapType::Butt, JoinKind::Bevel).do_effect(&input);
        assert!(output.is_applied());
        assert_eq!(output.path.subpaths().len(), 1);
        assert!(output.path.subpaths()[0].closed());
        let bbox = output.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.min().x(), 0.0, 1e-9);
        assert_approx_eq!(bbox.max().x(), 10.0, 1e-9);
        assert_approx_eq!(bbox.min().y(), -1.0, 1e-9);
        assert_approx_eq!(bbox.max().y(), 1.0, 1e-9);

        let square = join_type(2.0, CapType::Square, JoinKind::Bevel).do_effect(&input);
        let bbox = square.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.min().x(), -1.0, 1e-9);
        assert_approx_eq!(bbox.max().x(), 11.0, 1e-9);

        let peak = join_type(2.0, CapType::Peak, JoinKind::Bevel).do_effect(&input);
        let bbox = peak.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.min().x(), -1.0, 1e-9);
        assert_approx_eq!(bbox.max().x(), 11.0, 1e-9);
        // triangle caps cover half of the square caps
        let area: Scalar = peak.path.subpaths().iter().map(|s| s.signed_area()).sum();
        assert_approx_eq!(area.abs(), 22.0, 1e-6);
        Ok(())
    }

    #[test]
    fn test_closed_outline() -> Result<(), crate::Error> {
        let square: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let output =
            join_type(2.0, CapType::Butt, JoinKind::Miter).do_effect(&EffectInput::new(square));
        assert!(output.is_applied());
        assert_eq!(output.path.subpaths().len(), 2);
        let bbox = output.path.bbox(Transform::identity()).unwrap();
        assert_approx_eq!(bbox.width(), 12.0, 1e-6);
        assert_approx_eq!(bbox.height(), 12.0, 1e-6);
        Ok(())
    }

    #[test]
    fn test_degenerate() -> Result<(), crate::Error> {
        let input = EffectInput::new("M0,0 L10,0".parse()?);
        let output = join_type(0.0, CapType::Butt, JoinKind::Round).do_effect(&input);
        assert!(!output.is_applied());
        assert_eq!(output.path, input.path);

        let empty = EffectInput::new(Path::empty());
        assert!(!join_type(1.0, CapType::Butt, JoinKind::Round).do_effect(&empty).is_applied());
        Ok(())
    }

    #[test]
    fn test_keys() -> Result<(), crate::Error> {
        assert_eq!("peak".parse::<CapType>()?.line_cap(), LineCap::Peak);
        assert_eq!(
            "extrapolated".parse::<JoinKind>()?.line_join(4.0),
            LineJoin::Extrapolate(4.0)
        );
        let mut effect = join_type(1.0, CapType::Round, JoinKind::Miter);
        effect.miter_limit = 4.0;
        assert_eq!(effect.style().line_join, LineJoin::Miter(Scalar::MAX));
        effect.attempt_force_join = false;
        assert_eq!(effect.style().line_join, LineJoin::Miter(4.0));
        assert_eq!(effect.style().line_cap, LineCap::Round);
        assert!("flat".parse::<CapType>().is_err());
        Ok(())
    }
}
