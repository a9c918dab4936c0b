//! Geometry support types: the 3-D vector, the unit-quaternion rotation,
//! and the Morton-style ordered tuple. None of these are consumed by
//! the ODE engine itself; they round out the crate's boundary types.

pub mod ordered_tuple;
pub mod rotation;
pub mod vector3;

pub use ordered_tuple::OrderedTuple;
pub use rotation::{Axis, Rotation, RotationOrder};
pub use vector3::Vector3;
