//! An adaptive, embedded Runge-Kutta and Adams-Nordsieck integrator core
//! for ODE initial-value problems: explicit embedded pairs (RK4,
//! midpoint, the 5(4) and 8(5,3) pairs) and Nordsieck-vector multistep
//! methods (Adams-Bashforth, Adams-Moulton PECE) behind one generic
//! `FieldElement` abstraction, plus the supporting geometry types
//! (3-vectors, unit-quaternion rotations, Morton-ordered tuples) used at
//! the boundary.

pub mod errors;
pub mod field;
pub mod geometry;
pub mod linalg;
pub mod ode;

pub use errors::{OdeError, OdeResult, RotationMatrixError};
pub use field::{Field, FieldElement, Scalar};
