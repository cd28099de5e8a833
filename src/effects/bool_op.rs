//! Boolean operation between the path and an operand path
use crate::{
    BooleanOp, EffectInput, EffectOutput, EffectType, FillRule, ParamSet, ParamSpec, ParamValue,
    Path, PathEffect, Point, Reason,
    boolean::{boolean_with, slice},
    param::impl_choice,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BoolOperation {
    #[default]
    Union,
    Intersection,
    Difference,
    SymmetricDifference,
    /// Division of the path into pieces by the operand
    Division,
    /// Open cut of the path contours along the operand boundary
    Slice,
    /// Parts of the first operand contours inside of the second operand
    SliceInside,
    /// Parts of the first operand contours outside of the second operand
    SliceOutside,
}

impl_choice!(BoolOperation, {
    Union => "union",
    Intersection => "inters",
    Difference => "diff",
    SymmetricDifference => "symdiff",
    Division => "cut",
    Slice => "slice",
    SliceInside => "slice-inside",
    SliceOutside => "slice-outside",
});

/// Winding rule used to decide which points are covered by an operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillType {
    EvenOdd,
    NonZero,
    Positive,
    /// Fill rule of the path itself, non-zero for the operand
    #[default]
    FromCurve,
}

impl_choice!(FillType, {
    EvenOdd => "oddeven",
    NonZero => "nonzero",
    Positive => "positive",
    FromCurve => "from-curve",
});

impl FillType {
    pub fn covers(self, winding: i32, fallback: FillRule) -> bool {
        match self {
            FillType::EvenOdd => winding % 2 != 0,
            FillType::NonZero => winding != 0,
            FillType::Positive => winding > 0,
            FillType::FromCurve => fallback.is_inside(winding),
        }
    }
}

/// Operand of the boolean operation with its winding rule resolved
#[derive(Clone, Copy)]
struct Operand<'a> {
    path: &'a Path,
    fill: FillType,
    fallback: FillRule,
}

impl Operand<'_> {
    fn inside(&self, point: Point) -> bool {
        self.fill.covers(self.path.winding(point), self.fallback)
    }
}

#[derive(Debug, Clone)]
pub struct BoolOp {
    /// Operand used when no referenced path is provided
    pub operand_path: Path,
    pub operation: BoolOperation,
    /// Path comes first and the operand second
    pub swap_operands: bool,
    /// Replace the second operand by the outline of its filled region
    pub rmv_inner: bool,
    pub filltype_this: FillType,
    pub filltype_operand: FillType,
}

impl BoolOp {
    fn operand<'a>(&'a self, input: &'a EffectInput) -> Option<&'a Path> {
        match input.aux.path("operand-path") {
            Some(path) => path,
            None => Some(&self.operand_path),
        }
    }

    fn evaluate(&self, a: Operand<'_>, b: Operand<'_>) -> Path {
        let op = match self.operation {
            BoolOperation::Union => BooleanOp::Union,
            BoolOperation::Intersection => BooleanOp::Intersection,
            BoolOperation::Difference => BooleanOp::Difference,
            BoolOperation::SymmetricDifference => BooleanOp::Exclusion,
            BoolOperation::Division => {
                let mut pieces = boolean_with(
                    b.path,
                    a.path,
                    BooleanOp::Intersection,
                    |p| b.inside(p),
                    |p| a.inside(p),
                );
                pieces.extend(boolean_with(
                    b.path,
                    a.path,
                    BooleanOp::Difference,
                    |p| b.inside(p),
                    |p| a.inside(p),
                ));
                return pieces;
            }
            BoolOperation::Slice => return slice(b.path, a.path, |_| true),
            BoolOperation::SliceInside => return slice(a.path, b.path, |p| b.inside(p)),
            BoolOperation::SliceOutside => return slice(a.path, b.path, |p| !b.inside(p)),
        };
        boolean_with(a.path, b.path, op, |p| a.inside(p), |p| b.inside(p))
    }
}

impl PathEffect for BoolOp {
    const TYPE: EffectType = EffectType::BoolOp;

    fn specs() -> Vec<ParamSpec> {
        vec![
            ParamSpec::path("operand-path", Path::empty()),
            ParamSpec::choice("operation", BoolOperation::KEYS, "union"),
            ParamSpec::bool("swap-operands", false),
            ParamSpec::bool("rmv-inner", false),
            ParamSpec::choice("filltype-this", FillType::KEYS, "from-curve"),
            ParamSpec::choice("filltype-operand", FillType::KEYS, "from-curve"),
        ]
    }

    fn from_params(params: &ParamSet) -> Self {
        let mut effect = Self {
            operand_path: Path::empty(),
            operation: BoolOperation::default(),
            swap_operands: false,
            rmv_inner: false,
            filltype_this: FillType::default(),
            filltype_operand: FillType::default(),
        };
        effect.set_params(params);
        effect
    }

    fn set_params(&mut self, params: &ParamSet) {
        if let Some(path) = params.path("operand-path") {
            self.operand_path = path.clone();
        }
        self.operation = params.choice("operation").unwrap_or(self.operation);
        self.swap_operands = params.bool("swap-operands").unwrap_or(self.swap_operands);
        self.rmv_inner = params.bool("rmv-inner").unwrap_or(self.rmv_inner);
        self.filltype_this = params.choice("filltype-this").unwrap_or(self.filltype_this);
        self.filltype_operand = params
            .choice("filltype-operand")
            .unwrap_or(self.filltype_operand);
    }

    fn params(&self) -> ParamSet {
        ParamSet::new()
            .with("operand-path", ParamValue::Path(self.operand_path.clone()))
            .with("operation", ParamValue::Enum(self.operation.key().to_owned()))
            .with("swap-operands", ParamValue::Bool(self.swap_operands))
            .with("rmv-inner", ParamValue::Bool(self.rmv_inner))
            .with(
                "filltype-this",
                ParamValue::Enum(self.filltype_this.key().to_owned()),
            )
            .with(
                "filltype-operand",
                ParamValue::Enum(self.filltype_operand.key().to_owned()),
            )
    }

    fn do_effect(&self, input: &EffectInput) -> EffectOutput {
        if input.path.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::EmptyPath);
        }
        let Some(operand) = self.operand(input) else {
            let reason = Reason::MissingReference("operand-path");
            return EffectOutput::unchanged(&input.path, reason);
        };
        if operand.is_empty() {
            return EffectOutput::unchanged(&input.path, Reason::Degenerate("empty operand"));
        }
        let this_path = input.path.to_line_and_cubic();
        let operand_path = operand.to_line_and_cubic();
        let this = Operand {
            path: &this_path,
            fill: self.filltype_this,
            fallback: input.fill_rule,
        };
        let operand = Operand {
            path: &operand_path,
            fill: self.filltype_operand,
            fallback: FillRule::NonZero,
        };
        let (a, b) = if self.swap_operands {
            (this, operand)
        } else {
            (operand, this)
        };
        let mut indicator = a.path.clone();
        indicator.extend(b.path.subpaths().iter().cloned());

        let inner_removed;
        let b = if self.rmv_inner {
            inner_removed = boolean_with(
                b.path,
                &Path::empty(),
                BooleanOp::Union,
                |p| b.inside(p),
                |_| false,
            );
            Operand {
                path: &inner_removed,
                fill: FillType::NonZero,
                ..b
            }
        } else {
            b
        };

        let result = tracing::debug_span!("[bool_op]", operation = %self.operation)
            .in_scope(|| self.evaluate(a, b));
        EffectOutput::applied(result).with_indicators(vec![indicator])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AuxInputs, Scalar, Transform, assert_approx_eq};

    fn bool_op(operation: BoolOperation, operand: &Path) -> BoolOp {
        let mut params = ParamSet::defaults(&BoolOp::specs());
        params.set("operation", ParamValue::Enum(operation.key().to_owned()));
        params.set("operand-path", ParamValue::Path(operand.clone()));
        BoolOp::from_params(&params)
    }

    fn area(path: &Path) -> Scalar {
        path.subpaths().iter().map(|subpath| subpath.signed_area()).sum()
    }

    fn squares() -> Result<(Path, Path), crate::Error> {
        let this: Path = "M0,0 L10,0 L10,10 L0,10 Z".parse()?;
        let operand = this.transformed(Transform::new_translate(5.0, 0.0));
        Ok((this, operand))
    }

    #[test]
    fn test_operations() -> Result<(), crate::Error> {
        let (this, operand) = squares()?;
        let input = EffectInput::new(this.clone());

        let output = bool_op(BoolOperation::Union, &operand).do_effect(&input);
        assert!(output.is_applied());
        assert_approx_eq!(area(&output.path), 150.0, 1e-6);
        assert_eq!(output.indicators.len(), 1);
        assert_eq!(output.indicators[0].subpaths().len(), 2);

        let output = bool_op(BoolOperation::Intersection, &operand).do_effect(&input);
        assert_approx_eq!(area(&output.path), 50.0, 1e-6);

        // operand comes first unless swapped
        let output = bool_op(BoolOperation::Difference, &operand).do_effect(&input);
        assert!(output.path.contains(Point::new(12.5, 5.0), FillRule::NonZero));
        assert!(!output.path.contains(Point::new(2.5, 5.0), FillRule::NonZero));
        let mut swapped = bool_op(BoolOperation::Difference, &operand);
        swapped.swap_operands = true;
        let output = swapped.do_effect(&input);
        assert!(output.path.contains(Point::new(2.5, 5.0), FillRule::NonZero));
        assert_approx_eq!(area(&output.path), 50.0, 1e-6);

        let output = bool_op(BoolOperation::SymmetricDifference, &operand).do_effect(&input);
        assert_eq!(output.path.subpaths().len(), 2);
        assert_approx_eq!(area(&output.path), 100.0, 1e-6);
        Ok(())
    }

    #[test]
    fn test_division() -> Result<(), crate::Error> {
        let (this, operand) = squares()?;
        let output = bool_op(BoolOperation::Division, &operand).do_effect(&EffectInput::new(this));
        assert!(output.is_applied());
        assert_eq!(output.path.subpaths().len(), 2);
        // pieces of the path only
        assert_approx_eq!(area(&output.path), 100.0, 1e-6);
        assert!(!output.path.contains(Point::new(12.5, 5.0), FillRule::NonZero));
        Ok(())
    }

    #[test]
    fn test_slice() -> Result<(), crate::Error> {
        let (this, _) = squares()?;
        let line: Path = "M-5,5 L15,5".parse()?;

        let mut effect = bool_op(BoolOperation::SliceInside, &this);
        effect.swap_operands = true;
        let output = effect.do_effect(&EffectInput::new(line.clone()));
        assert_eq!(output.path.subpaths().len(), 1);
        assert_approx_eq!(output.path.subpaths()[0].start().x(), 0.0, 1e-9);
        assert_approx_eq!(output.path.subpaths()[0].end().x(), 10.0, 1e-9);

        effect.operation = BoolOperation::SliceOutside;
        let output = effect.do_effect(&EffectInput::new(line.clone()));
        assert_eq!(output.path.subpaths().len(), 2);

        // path contours are cut open along the operand
        let output = bool_op(BoolOperation::Slice, &line).do_effect(&EffectInput::new(this));
        assert_eq!(output.path.subpaths().len(), 2);
        assert!(output.path.subpaths().iter().all(|subpath| !subpath.closed()));
        Ok(())
    }

    #[test]
    fn test_fill_types() -> Result<(), crate::Error> {
        // outer square with a nested square of the same direction
        let this: Path = "M0,0 L10,0 L10,10 L0,10 Z M3,3 L7,3 L7,7 L3,7 Z".parse()?;
        let operand: Path = "M20,0 L30,0 L30,10 L20,10 Z".parse()?;
        let input = EffectInput::new(this.clone());

        let output = bool_op(BoolOperation::Union, &operand).do_effect(&input);
        assert_approx_eq!(area(&output.path), 200.0, 1e-6);

        let mut effect = bool_op(BoolOperation::Union, &operand);
        effect.filltype_this = FillType::EvenOdd;
        assert_approx_eq!(area(&effect.do_effect(&input).path), 184.0, 1e-6);

        let input = input.with_fill_rule(FillRule::EvenOdd);
        let output = bool_op(BoolOperation::Union, &operand).do_effect(&input);
        assert_approx_eq!(area(&output.path), 184.0, 1e-6);

        assert!(FillType::Positive.covers(1, FillRule::NonZero));
        assert!(!FillType::Positive.covers(-1, FillRule::NonZero));
        assert!(FillType::NonZero.covers(-1, FillRule::EvenOdd));
        assert!(!FillType::FromCurve.covers(2, FillRule::EvenOdd));
        Ok(())
    }

    #[test]
    fn test_remove_inner() -> Result<(), crate::Error> {
        let this: Path = "M0,0 L10,0 L10,10 L0,10 Z M3,3 L7,3 L7,7 L3,7 Z".parse()?;
        let line: Path = "M-5,5 L15,5".parse()?;
        let input = EffectInput::new(this);

        let output = bool_op(BoolOperation::Slice, &line).do_effect(&input);
        assert_eq!(output.path.subpaths().len(), 4);

        let mut effect = bool_op(BoolOperation::Slice, &line);
        effect.rmv_inner = true;
        let output = effect.do_effect(&input);
        assert_eq!(output.path.subpaths().len(), 2);
        Ok(())
    }

    #[test]
    fn test_operand_reference() -> Result<(), crate::Error> {
        let (this, operand) = squares()?;
        let effect = bool_op(BoolOperation::Union, &Path::empty());

        let output = effect.do_effect(&EffectInput::new(this.clone()));
        assert!(!output.is_applied());
        assert_eq!(output.path, this);

        let input = EffectInput::new(this.clone())
            .with_aux(AuxInputs::default().with_path("operand-path", None));
        let output = effect.do_effect(&input);
        assert!(!output.is_applied());
        assert_eq!(output.path, this);

        let input = EffectInput::new(this)
            .with_aux(AuxInputs::default().with_path("operand-path", Some(operand)));
        let output = effect.do_effect(&input);
        assert!(output.is_applied());
        assert_approx_eq!(area(&output.path), 150.0, 1e-6);
        Ok(())
    }
}
