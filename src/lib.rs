//! Live path effects: non-destructive geometric transformations of bezier paths.
//!
//! Main features:
//!  - SVG path parsing and generation
//!  - Path geometry: offsetting, intersections, boolean operations
//!  - Piecewise polynomial (D2) representation of paths
//!  - Catalog of path effects with persisted parameters and knots
//!  - Layout of connected rectangles
//!
#![deny(warnings)]

mod boolean;
mod curve;
mod effect;
mod effects;
mod ellipse;
mod error;
mod fit;
mod geometry;
mod intersect;
mod layout;
mod param;
mod path;
mod piecewise;
mod svg;
mod utils;

pub use boolean::{
    BooleanOp, boolean, boolean_with, difference, flatten, intersection, slice, union,
};
pub use curve::{
    Cubic, CubicFlattenIter, Curve, CurveExtremities, CurveFlattenIter, CurveRoots, Line, Quad,
    Segment,
};
pub use effect::{
    AuxInputs, CollectingNotifier, Derived, Effect, EffectConfig, EffectInput, EffectOutput,
    EffectType, Environment, Notifier, Outcome, PathEffect, Reason, TracingNotifier,
    content_hash, do_effect_pwd2,
};
pub use effects::*;
pub use ellipse::{EllipArc, EllipArcCubicIter, Ellipse, arc_handle_length, unit_arc_path};
pub use error::{Error, Result};
pub use fit::{Circle, Perspective, is_convex};
pub use geometry::{
    BBox, EPSILON, EPSILON_SQRT, PI, Point, Scalar, Transform, calc_delta_angle, range2pi,
    ray_angle, scalar_fmt,
};
pub use intersect::{Crossing, INTERSECT_TOLERANCE, remove_self_intersections, self_crossings};
pub use layout::{LayoutEdge, LayoutOptions, connected_components, graph_layout, remove_overlaps};
pub use param::{
    ParamKind, ParamSet, ParamSpec, ParamValue, Preferences, format_scalar, pref_key,
};
pub use path::{
    CLOSE_TOLERANCE, DEFAULT_FLATNESS, FillRule, LPE_CONVERSION_TOLERANCE, LineCap, LineJoin,
    Path, PathBuilder, PathTime, StrokeStyle, SubPath,
};
pub use piecewise::{Fragment, Piece, Piecewise, Poly};
pub use svg::{SvgParserError, SvgPathCmd, SvgPathParser};
pub use utils::{bisect, integrate};
use utils::{ArrayIter, clamp};
