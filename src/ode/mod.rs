//! The ODE solving core: problem/handler boundary types, the step
//! interpolator and controller shared by every driver, and the two
//! driver families (`rk`, `adams`).

pub mod adams;
pub mod controller;
pub mod handler;
pub mod interpolator;
pub mod problem;
pub mod rk;

pub use controller::StepController;
pub use handler::{DynStepInterpolator, EventAction, EventHandler, NoOpStepHandler, StepHandler};
pub use interpolator::{DenseOutput, StepInterpolator};
pub use problem::{OdeProblem, OdeSolverProblem, SecondaryEquationRange, Tolerance};
