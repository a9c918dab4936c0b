//! User callback boundaries (§6): the step handler invoked synchronously
//! on every accepted step, and the tagged-variant event handler that
//! replaces exception-based control flow in the original design (§9).

use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::interpolator::{DenseOutput, StepInterpolator};

/// The concrete interpolator shape every driver (RK or Adams) hands to a
/// `StepHandler`: its per-method dense output type-erased behind
/// `Box<dyn DenseOutput<F>>` so the handler trait stays object-safe.
pub type DynStepInterpolator<F> = StepInterpolator<F, Box<dyn DenseOutput<F>>>;

/// Invoked once per accepted step with the just-finalized interpolator.
pub trait StepHandler<F: FieldElement> {
    fn handle_step(&mut self, interpolator: &mut DynStepInterpolator<F>, is_last: bool);
}

/// A step handler that does nothing; the default when the caller does not
/// need per-step callbacks.
pub struct NoOpStepHandler;

impl<F: FieldElement> StepHandler<F> for NoOpStepHandler {
    fn handle_step(&mut self, _interpolator: &mut DynStepInterpolator<F>, _is_last: bool) {}
}

/// What the engine should do after an event handler reports a sign
/// change in `g`.
#[derive(Debug, Clone)]
pub enum EventAction<F> {
    Continue,
    ResetState(DVec<F>),
    ResetDerivatives,
    Stop,
}

/// The scalar event function `g(t, y)` plus the action taken at a root.
pub trait EventHandler<F: FieldElement> {
    fn g(&self, t: F, y: &DVec<F>) -> F;
    fn action(&self, t: F, y: &DVec<F>) -> EventAction<F>;
}
