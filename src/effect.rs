//! Effect catalog and the contract shared by all path effects
use crate::{
    Error, FillRule, LPE_CONVERSION_TOLERANCE, ParamSet, ParamSpec, ParamValue, Path, Point,
    Preferences, Result, Segment,
    effects::{
        BendPath, BoolOp, CopyRotate, FilletChamfer, JoinType, MirrorSymmetry, Offset,
        PointsToEllipse, Roughen, TransformTwoPoints,
    },
    piecewise::{Fragment, Piecewise},
};
use std::{
    collections::BTreeMap,
    fmt,
    hash::{DefaultHasher, Hash, Hasher},
    sync::{Arc, Mutex},
};

macro_rules! effect_types {
    ($($variant:ident => $key:literal),+ $(,)?) => {
        /// Every member of the effect catalog
        ///
        /// Integer values follow declaration order and are stable.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(i32)]
        pub enum EffectType {
            $($variant,)+
        }

        impl EffectType {
            pub const ALL: &'static [EffectType] = &[$(EffectType::$variant,)+];

            /// Stable persisted key
            pub fn key(&self) -> &'static str {
                match self {
                    $(EffectType::$variant => $key,)+
                }
            }

            pub fn from_key(key: &str) -> Option<Self> {
                match key {
                    $($key => Some(EffectType::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

effect_types! {
    BendPath => "bend_path",
    Gears => "gears",
    PatternAlongPath => "skeletal",
    CurveStitch => "curvestitching",
    VonKoch => "vonkoch",
    Knot => "knot",
    ConstructGrid => "construct_grid",
    Spiro => "spiro",
    Envelope => "envelope",
    Interpolate => "interpolate",
    RoughHatches => "rough_hatches",
    Sketch => "sketch",
    Ruler => "ruler",
    PowerStroke => "powerstroke",
    CloneOriginal => "clone_original",
    Simplify => "simplify",
    Lattice2 => "lattice2",
    PerspectiveEnvelope => "perspective-envelope",
    InterpolatePoints => "interpolate_points",
    TransformTwoPoints => "transform_2pts",
    ShowHandles => "show_handles",
    Roughen => "roughen",
    BSpline => "bspline",
    JoinType => "join_type",
    TaperStroke => "taper_stroke",
    MirrorSymmetry => "mirror_symmetry",
    CopyRotate => "copy_rotate",
    AttachPath => "attach_path",
    FillBetweenStrokes => "fill_between_strokes",
    FillBetweenMany => "fill_between_many",
    EllipseFivePoints => "ellipse_5pts",
    BoundingBox => "bounding_box",
    MeasureSegments => "measure_segments",
    FilletChamfer => "fillet_chamfer",
    BoolOp => "bool_op",
    PowerClip => "powerclip",
    PowerMask => "powermask",
    PointsToEllipse => "pts2ellipse",
    Offset => "offset",
    DashedStroke => "dashed_stroke",
    AngleBisector => "angle_bisector",
    CircleWithRadius => "circle_with_radius",
    CircleThreePoints => "circle_3pts",
    Extrude => "extrude",
    LineSegment => "line_segment",
    Parallel => "parallel",
    PerpBisector => "perp_bisector",
    TangentToCurve => "tangent_to_curve",
    DoEffectStackTest => "doeffectstacktest",
    DynaStroke => "dynastroke",
    Lattice => "lattice",
    PathLength => "path_length",
    RecursiveSkeleton => "recursive_skeleton",
    TextLabel => "text_label",
    EmbroideryStitch => "embrodery_stitch",
    Slice => "slice",
}

impl EffectType {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    /// Whether the effect can be instantiated by [`Effect::new`]
    pub fn is_implemented(&self) -> bool {
        specs_of(*self).is_some()
    }
}

impl TryFrom<i32> for EffectType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        usize::try_from(value)
            .ok()
            .and_then(|index| EffectType::ALL.get(index).copied())
            .ok_or_else(|| Error::UnknownEffect(value.to_string()))
    }
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Why an effect returned its input unchanged
#[derive(Debug, Clone, PartialEq)]
pub enum Reason {
    EmptyPath,
    TooFewPoints { required: usize, found: usize },
    /// Geometric degeneracy detected by the effect
    Degenerate(&'static str),
    /// Referenced path or item could not be resolved
    MissingReference(&'static str),
}

impl fmt::Display for Reason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reason::EmptyPath => write!(f, "input path is empty"),
            Reason::TooFewPoints { required, found } => {
                write!(f, "at least {} points required, found {}", required, found)
            }
            Reason::Degenerate(what) => write!(f, "degenerate geometry: {}", what),
            Reason::MissingReference(key) => write!(f, "unresolved reference: {}", key),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Applied,
    Unchanged(Reason),
}

/// Result of a single effect invocation
#[derive(Debug, Clone, PartialEq)]
pub struct EffectOutput {
    pub path: Path,
    pub outcome: Outcome,
    /// Auxiliary paths showing guides and handles, not part of the result
    pub indicators: Vec<Path>,
}

impl EffectOutput {
    pub fn applied(path: Path) -> Self {
        Self {
            path,
            outcome: Outcome::Applied,
            indicators: Vec::new(),
        }
    }

    /// Original input returned together with the reason
    pub fn unchanged(input: &Path, reason: Reason) -> Self {
        Self {
            path: input.clone(),
            outcome: Outcome::Unchanged(reason),
            indicators: Vec::new(),
        }
    }

    pub fn with_indicators(self, indicators: Vec<Path>) -> Self {
        Self { indicators, ..self }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, Outcome::Applied)
    }
}

/// Referenced paths resolved by the host
///
/// A `None` entry marks a reference which exists but could not be resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuxInputs {
    pub paths: BTreeMap<String, Option<Path>>,
}

impl AuxInputs {
    pub fn with_path(mut self, key: impl Into<String>, path: Option<Path>) -> Self {
        self.paths.insert(key.into(), path);
        self
    }

    /// `None` if not referenced, `Some(None)` if the reference is unresolved
    pub fn path(&self, key: &str) -> Option<Option<&Path>> {
        self.paths.get(key).map(Option::as_ref)
    }
}

/// Everything an effect consumes besides its own parameters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectInput {
    pub path: Path,
    pub fill_rule: FillRule,
    pub aux: AuxInputs,
}

impl EffectInput {
    pub fn new(path: Path) -> Self {
        Self {
            path,
            ..Default::default()
        }
    }

    pub fn with_fill_rule(self, fill_rule: FillRule) -> Self {
        Self { fill_rule, ..self }
    }

    pub fn with_aux(self, aux: AuxInputs) -> Self {
        Self { aux, ..self }
    }
}

/// Sink for warnings about effects which could not produce a result
pub trait Notifier: Send + Sync {
    fn notify(&self, effect: EffectType, message: &str);
}

/// Forwards notifications to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, effect: EffectType, message: &str) {
        tracing::warn!("[effect:{}] {}", effect.key(), message);
    }
}

/// Keeps notifications in memory
#[derive(Debug, Default)]
pub struct CollectingNotifier {
    messages: Mutex<Vec<String>>,
}

impl CollectingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifications received so far formatted as `<effect key>: <message>`
    pub fn messages(&self) -> Vec<String> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Notifier for CollectingNotifier {
    fn notify(&self, effect: EffectType, message: &str) {
        let message = format!("{}: {}", effect.key(), message);
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

/// Read-only context of an effect invocation
#[derive(Clone)]
pub struct Environment {
    pub preferences: Preferences,
    pub notifier: Arc<dyn Notifier>,
}

impl Environment {
    pub fn new(preferences: Preferences, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            preferences,
            notifier,
        }
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new(Preferences::default(), Arc::new(TracingNotifier))
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("preferences", &self.preferences)
            .finish_non_exhaustive()
    }
}

/// Persisted effect: its key and stored parameter strings
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EffectConfig {
    pub effect: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub attributes: BTreeMap<String, String>,
}

impl EffectConfig {
    pub fn new(effect: EffectType) -> Self {
        Self {
            effect: effect.key().to_owned(),
            attributes: BTreeMap::new(),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }
}

/// Value derived from inputs identified by a content hash
///
/// Recomputed only when the hash of its inputs changes.
#[derive(Debug, Clone)]
pub struct Derived<T> {
    key: Option<u64>,
    value: Option<T>,
}

impl<T> Default for Derived<T> {
    fn default() -> Self {
        Self {
            key: None,
            value: None,
        }
    }
}

impl<T> Derived<T> {
    /// Value for inputs with hash `key`, `update` is called if it differs from the cached one
    pub fn get_or_update(&mut self, key: u64, update: impl FnOnce() -> T) -> &T {
        if self.key != Some(key) || self.value.is_none() {
            self.key = Some(key);
            self.value = None;
        }
        self.value.get_or_insert_with(update)
    }

    pub fn get(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn invalidate(&mut self) {
        self.key = None;
        self.value = None;
    }
}

/// Hash of the path geometry
pub fn content_hash(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    for subpath in path.subpaths() {
        subpath.closed().hash(&mut hasher);
        for segment in subpath.segments() {
            let points: &[Point] = match segment {
                Segment::Line(line) => &line.0,
                Segment::Quad(quad) => &quad.0,
                Segment::Cubic(cubic) => &cubic.0,
            };
            points.len().hash(&mut hasher);
            for point in points {
                point.x().to_bits().hash(&mut hasher);
                point.y().to_bits().hash(&mut hasher);
            }
        }
    }
    hasher.finish()
}

/// Drive an effect expressed over piecewise curves
///
/// Each sub-path is transformed separately unless `concatenate` is set, in which
/// case the whole path is transformed as a single curve. Returns `None` if any
/// invocation of `effect` fails.
pub fn do_effect_pwd2(
    path: &Path,
    concatenate: bool,
    effect: impl Fn(&Piecewise<Fragment>) -> Option<Piecewise<Fragment>>,
) -> Option<Path> {
    if concatenate {
        let result = effect(&Piecewise::from_path(path))?;
        return Some(result.to_path(LPE_CONVERSION_TOLERANCE));
    }
    let mut output = Path::empty();
    for subpath in path.subpaths() {
        let result = effect(&Piecewise::from_subpath(subpath))?;
        output.extend(result.to_path(LPE_CONVERSION_TOLERANCE));
    }
    Some(output)
}

/// Single path effect with its typed parameters and derived state
pub trait PathEffect: Sized {
    const TYPE: EffectType;

    /// Declared parameters
    fn specs() -> Vec<ParamSpec>;

    /// Create effect from a complete set of parameters
    fn from_params(params: &ParamSet) -> Self;

    /// Replace parameters keeping derived state
    fn set_params(&mut self, params: &ParamSet);

    /// Current parameter values
    fn params(&self) -> ParamSet;

    /// Derive defaults from the item the effect is first applied to
    fn on_apply(&mut self, _input: &EffectInput) {}

    /// Recompute derived state, must be idempotent for unchanged inputs
    fn before_effect(&mut self, _input: &EffectInput, _env: &Environment) {}

    fn do_effect(&self, input: &EffectInput) -> EffectOutput;

    fn after_effect(&mut self, _output: &EffectOutput) {}

    /// Named positions of the draggable handles
    fn knots(&self, _input: &EffectInput) -> Vec<(String, Point)> {
        Vec::new()
    }

    /// Move handle, returns `false` if there is no such handle
    fn set_knot(&mut self, _name: &str, _point: Point, _input: &EffectInput) -> bool {
        false
    }
}

/// Instance of an implemented effect
#[derive(Debug, Clone)]
pub enum Effect {
    BendPath(BendPath),
    FilletChamfer(FilletChamfer),
    Offset(Offset),
    PointsToEllipse(PointsToEllipse),
    Roughen(Roughen),
    TransformTwoPoints(TransformTwoPoints),
    MirrorSymmetry(MirrorSymmetry),
    CopyRotate(CopyRotate),
    JoinType(JoinType),
    BoolOp(BoolOp),
}

macro_rules! dispatch {
    ($value:expr, $effect:ident => $body:expr) => {
        match $value {
            Effect::BendPath($effect) => $body,
            Effect::FilletChamfer($effect) => $body,
            Effect::Offset($effect) => $body,
            Effect::PointsToEllipse($effect) => $body,
            Effect::Roughen($effect) => $body,
            Effect::TransformTwoPoints($effect) => $body,
            Effect::MirrorSymmetry($effect) => $body,
            Effect::CopyRotate($effect) => $body,
            Effect::JoinType($effect) => $body,
            Effect::BoolOp($effect) => $body,
        }
    };
}

fn specs_of(effect_type: EffectType) -> Option<Vec<ParamSpec>> {
    let specs = match effect_type {
        EffectType::BendPath => BendPath::specs(),
        EffectType::FilletChamfer => FilletChamfer::specs(),
        EffectType::Offset => Offset::specs(),
        EffectType::PointsToEllipse => PointsToEllipse::specs(),
        EffectType::Roughen => Roughen::specs(),
        EffectType::TransformTwoPoints => TransformTwoPoints::specs(),
        EffectType::MirrorSymmetry => MirrorSymmetry::specs(),
        EffectType::CopyRotate => CopyRotate::specs(),
        EffectType::JoinType => JoinType::specs(),
        EffectType::BoolOp => BoolOp::specs(),
        _ => return None,
    };
    Some(specs)
}

impl Effect {
    /// Effect with default parameters
    pub fn new(effect_type: EffectType) -> Result<Self> {
        let specs = specs_of(effect_type)
            .ok_or_else(|| Error::UnknownEffect(effect_type.key().to_owned()))?;
        Self::with_params(effect_type, &ParamSet::defaults(&specs))
    }

    /// Effect restored from the persisted configuration
    ///
    /// Parameters fall back to preferences and then to defaults.
    pub fn from_config(config: &EffectConfig, env: &Environment) -> Result<Self> {
        let effect_type = EffectType::from_key(&config.effect)
            .ok_or_else(|| Error::UnknownEffect(config.effect.clone()))?;
        let specs = specs_of(effect_type)
            .ok_or_else(|| Error::UnknownEffect(config.effect.clone()))?;
        let params = ParamSet::resolve(
            effect_type.key(),
            &specs,
            &config.attributes,
            &env.preferences,
        );
        Self::with_params(effect_type, &params)
    }

    fn with_params(effect_type: EffectType, params: &ParamSet) -> Result<Self> {
        let effect = match effect_type {
            EffectType::BendPath => Effect::BendPath(BendPath::from_params(params)),
            EffectType::FilletChamfer => Effect::FilletChamfer(FilletChamfer::from_params(params)),
            EffectType::Offset => Effect::Offset(Offset::from_params(params)),
            EffectType::PointsToEllipse => {
                Effect::PointsToEllipse(PointsToEllipse::from_params(params))
            }
            EffectType::Roughen => Effect::Roughen(Roughen::from_params(params)),
            EffectType::TransformTwoPoints => {
                Effect::TransformTwoPoints(TransformTwoPoints::from_params(params))
            }
            EffectType::MirrorSymmetry => {
                Effect::MirrorSymmetry(MirrorSymmetry::from_params(params))
            }
            EffectType::CopyRotate => Effect::CopyRotate(CopyRotate::from_params(params)),
            EffectType::JoinType => Effect::JoinType(JoinType::from_params(params)),
            EffectType::BoolOp => Effect::BoolOp(BoolOp::from_params(params)),
            _ => return Err(Error::UnknownEffect(effect_type.key().to_owned())),
        };
        Ok(effect)
    }

    pub fn effect_type(&self) -> EffectType {
        fn type_of<E: PathEffect>(_: &E) -> EffectType {
            E::TYPE
        }
        dispatch!(self, effect => type_of(effect))
    }

    pub fn specs(&self) -> Vec<ParamSpec> {
        specs_of(self.effect_type()).unwrap_or_default()
    }

    pub fn params(&self) -> ParamSet {
        dispatch!(self, effect => effect.params())
    }

    /// Set a single parameter from its persisted string form
    pub fn set_param(&mut self, key: &str, text: &str) -> Result<()> {
        let spec = self
            .specs()
            .into_iter()
            .find(|spec| spec.key == key)
            .ok_or_else(|| Error::InvalidValue {
                key: key.to_owned(),
                value: text.to_owned(),
            })?;
        let value = spec.clamp(ParamValue::decode(key, spec.kind, text)?);
        let params = self.params().with(key, value);
        dispatch!(self, effect => effect.set_params(&params));
        Ok(())
    }

    /// Persisted string form of all parameters
    pub fn write_params(&self) -> BTreeMap<String, String> {
        self.params().encode()
    }

    pub fn to_config(&self) -> EffectConfig {
        EffectConfig {
            effect: self.effect_type().key().to_owned(),
            attributes: self.write_params(),
        }
    }

    /// Run the effect: derived state update, transform and bookkeeping
    ///
    /// Outcome other than `Applied` is reported to the environment notifier.
    pub fn apply(&mut self, input: &EffectInput, env: &Environment) -> EffectOutput {
        let effect_type = self.effect_type();
        tracing::debug_span!("[effect]", key = effect_type.key()).in_scope(|| {
            dispatch!(self, effect => effect.before_effect(input, env));
            let output = dispatch!(self, effect => effect.do_effect(input));
            if let Outcome::Unchanged(reason) = &output.outcome {
                tracing::debug!("[effect:{}] unchanged: {}", effect_type.key(), reason);
                env.notifier.notify(effect_type, &reason.to_string());
            }
            dispatch!(self, effect => effect.after_effect(&output));
            output
        })
    }

    /// Initialize parameters which depend on the item, called once on application
    pub fn on_apply(&mut self, input: &EffectInput) {
        dispatch!(self, effect => effect.on_apply(input))
    }

    pub fn knots(&self, input: &EffectInput) -> Vec<(String, Point)> {
        dispatch!(self, effect => effect.knots(input))
    }

    pub fn set_knot(&mut self, name: &str, point: Point, input: &EffectInput) -> bool {
        dispatch!(self, effect => effect.set_knot(name, point, input))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Curve, PI, Scalar};
    use proptest::prelude::*;

    fn polygon(sides: usize, radius: Scalar, center: Point, phase: Scalar) -> Path {
        let mut builder = Path::builder();
        builder.move_to(center + Point::polar(phase, radius));
        for index in 1..sides {
            let angle = phase + 2.0 * PI * index as Scalar / sides as Scalar;
            builder.line_to(center + Point::polar(angle, radius));
        }
        builder.close();
        builder.build()
    }

    #[test]
    fn test_effect_type() -> Result<()> {
        assert_eq!(EffectType::ALL.len(), 56);
        assert_eq!(EffectType::BendPath.as_i32(), 0);
        assert_eq!(EffectType::FilletChamfer.as_i32(), 33);
        assert_eq!(EffectType::Offset.as_i32(), 38);
        assert_eq!(EffectType::Slice.as_i32(), 55);
        for effect_type in EffectType::ALL {
            assert_eq!(EffectType::from_key(effect_type.key()), Some(*effect_type));
            assert_eq!(EffectType::try_from(effect_type.as_i32())?, *effect_type);
        }
        assert!(EffectType::try_from(56).is_err());
        assert!(EffectType::try_from(-1).is_err());
        assert_eq!(EffectType::from_key("fillet_chamfer"), Some(EffectType::FilletChamfer));
        assert_eq!(EffectType::from_key("nope"), None);
        Ok(())
    }

    #[test]
    fn test_unknown_effect() {
        assert!(!EffectType::Spiro.is_implemented());
        assert!(matches!(
            Effect::new(EffectType::Spiro),
            Err(Error::UnknownEffect(key)) if key == "spiro"
        ));
        let config = EffectConfig {
            effect: "no_such_effect".to_owned(),
            attributes: BTreeMap::new(),
        };
        assert!(Effect::from_config(&config, &Environment::default()).is_err());
        for effect_type in EffectType::ALL {
            assert_eq!(
                Effect::new(*effect_type).is_ok(),
                effect_type.is_implemented()
            );
        }
    }

    #[test]
    fn test_config_round_trip() -> Result<()> {
        let config = EffectConfig::new(EffectType::Offset)
            .with("offset", "3")
            .with("linejoin_type", "miter");
        let effect = Effect::from_config(&config, &Environment::default())?;
        assert_eq!(effect.effect_type(), EffectType::Offset);
        let written = effect.write_params();
        assert_eq!(written["offset"], "3");
        assert_eq!(written["linejoin_type"], "miter");
        let again = Effect::from_config(&effect.to_config(), &Environment::default())?;
        assert_eq!(again.params(), effect.params());
        Ok(())
    }

    #[test]
    fn test_set_param() -> Result<()> {
        let mut effect = Effect::new(EffectType::CopyRotate)?;
        effect.set_param("num_copies", "4")?;
        assert_eq!(effect.params().int("num_copies"), Some(4));
        assert!(effect.set_param("num_copies", "many").is_err());
        assert!(effect.set_param("no_such_param", "1").is_err());
        assert_eq!(effect.params().int("num_copies"), Some(4));
        Ok(())
    }

    #[test]
    fn test_notifier() -> Result<()> {
        let notifier = Arc::new(CollectingNotifier::new());
        let env = Environment::new(Preferences::default(), notifier.clone());
        let mut effect = Effect::new(EffectType::PointsToEllipse)?;
        let input = EffectInput::new(Path::empty());
        let output = effect.apply(&input, &env);
        assert!(!output.is_applied());
        assert_eq!(output.path, input.path);
        let messages = notifier.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("pts2ellipse:"));
        Ok(())
    }

    #[test]
    fn test_derived() {
        let mut derived = Derived::default();
        let mut calls = 0;
        let path: Path = "M0,0 L1,0".parse().unwrap();
        let key = content_hash(&path);
        assert_eq!(*derived.get_or_update(key, || { calls += 1; 1 }), 1);
        assert_eq!(*derived.get_or_update(key, || { calls += 1; 2 }), 1);
        let other: Path = "M0,0 L2,0".parse().unwrap();
        assert_ne!(content_hash(&other), key);
        assert_eq!(*derived.get_or_update(content_hash(&other), || { calls += 1; 3 }), 3);
        assert_eq!(calls, 2);
        derived.invalidate();
        assert!(derived.get().is_none());
    }

    #[test]
    fn test_do_effect_pwd2() {
        let path: Path = "M0,0 L10,0 L10,10 Z M20,0 L30,0".parse().unwrap();
        let moved = do_effect_pwd2(&path, false, |pwd| {
            let shift = Piecewise::from_piece(Fragment::new(
                crate::Poly::constant(1.0),
                crate::Poly::constant(0.0),
            ));
            let mut shift = shift;
            let (a, b) = pwd.domain()?;
            shift.set_domain(a, b);
            Some(pwd.add(&shift))
        })
        .unwrap();
        assert_eq!(moved.subpaths().len(), 2);
        assert!(moved.subpaths()[0].closed());
        assert!(!moved.subpaths()[1].closed());
        assert!(moved.subpaths()[1].start().is_near(Point::new(21.0, 0.0), 1e-9));
        assert!(do_effect_pwd2(&path, true, |_| None).is_none());
    }

    proptest! {
        #[test]
        fn test_effects_keep_contours_connected(
            sides in 3usize..8,
            radius in 5.0f64..50.0,
            x in -100.0f64..100.0,
            y in -100.0f64..100.0,
            phase in 0.0f64..6.0,
        ) {
            let input = EffectInput::new(polygon(sides, radius, Point::new(x, y), phase));
            let env = Environment::default();
            for effect_type in EffectType::ALL {
                let Ok(mut effect) = Effect::new(*effect_type) else {
                    continue;
                };
                effect.on_apply(&input);
                let output = effect.apply(&input, &env);
                for subpath in output.path.subpaths() {
                    if subpath.closed() {
                        prop_assert!(
                            subpath.start().is_near(subpath.end(), 1e-9),
                            "{}: contour is not closed", effect_type
                        );
                    }
                    for pair in subpath.segments().windows(2) {
                        prop_assert!(
                            pair[0].end().is_near(pair[1].start(), 1e-9),
                            "{}: gap between segments", effect_type
                        );
                    }
                }
            }
        }
    }
}
