//! Implemented members of the effect catalog
mod bend_path;
mod bool_op;
mod copy_rotate;
mod fillet_chamfer;
mod join_type;
mod mirror_symmetry;
mod offset;
mod points_to_ellipse;
mod roughen;
mod satellite;
mod transform_2pts;

pub use bend_path::BendPath;
pub use bool_op::{BoolOp, BoolOperation, FillType};
pub use copy_rotate::CopyRotate;
pub use fillet_chamfer::{FilletChamfer, FilletMethod};
pub use join_type::{CapType, JoinKind, JoinType};
pub use mirror_symmetry::{MirrorMode, MirrorSymmetry};
pub use offset::{Offset, OffsetJoin};
pub use points_to_ellipse::{EllipseMethod, PointsToEllipse, path_points};
pub use roughen::{DivisionMethod, Roughen};
pub use satellite::{
    Satellite, SatelliteArray, SatelliteKind, len_to_rad, rad_to_len, to_size, to_time,
};
pub use transform_2pts::TransformTwoPoints;
