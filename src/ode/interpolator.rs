//! The step interpolator (C3): a state machine wrapping one method's
//! dense-output polynomial, shared verbatim by the RK engine and the
//! Adams drivers.

use crate::field::FieldElement;
use crate::linalg::DVec;

/// Per-method dense output: given the step's endpoints, evaluate the
/// state or derivative at a relative position `theta` in `[0, 1]`.
/// `finalize` computes anything still deferred once a step is fully
/// committed (an Adams driver's cached Nordsieck row); it is idempotent.
pub trait DenseOutput<F: FieldElement> {
    fn evaluate_state(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F>;

    fn evaluate_derivative(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F>;

    fn finalize(&mut self, t_previous: F, previous_state: &DVec<F>, current_state: &DVec<F>, h: F);
}

impl<F: FieldElement> DenseOutput<F> for Box<dyn DenseOutput<F>> {
    fn evaluate_state(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F> {
        (**self).evaluate_state(previous_state, current_state, theta, h)
    }

    fn evaluate_derivative(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F> {
        (**self).evaluate_derivative(previous_state, current_state, theta, h)
    }

    fn finalize(&mut self, t_previous: F, previous_state: &DVec<F>, current_state: &DVec<F>, h: F) {
        (**self).finalize(t_previous, previous_state, current_state, h)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Uninitialized,
    Initialized,
    TimeStored,
    Finalized,
}

/// `Uninitialized -> Initialized -> TimeStored -> Finalized`, guarded by
/// debug assertions at each public entry point.
pub struct StepInterpolator<F: FieldElement, D: DenseOutput<F>> {
    state: State,
    forward: bool,
    previous_time: F,
    current_time: F,
    previous_state: DVec<F>,
    current_state: DVec<F>,
    h: F,
    dense: Option<D>,
}

impl<F: FieldElement, D: DenseOutput<F>> StepInterpolator<F, D> {
    pub fn new(forward: bool, dim: usize) -> Self {
        Self {
            state: State::Uninitialized,
            forward,
            previous_time: F::zero(),
            current_time: F::zero(),
            previous_state: DVec::zeros(dim),
            current_state: DVec::zeros(dim),
            h: F::zero(),
            dense: None,
        }
    }

    pub fn is_forward(&self) -> bool {
        self.forward
    }

    /// Begin a new step at `(t, y)`; `dense` is the concrete dense-output
    /// value the engine built for the step just taken from here.
    pub fn reinitialize(&mut self, t: F, y: &DVec<F>, dense: D) {
        self.previous_time = t;
        self.current_time = t;
        self.previous_state = y.clone();
        self.current_state = y.clone();
        self.dense = Some(dense);
        self.state = State::Initialized;
    }

    pub fn store_time(&mut self, t_end: F, y_end: &DVec<F>, h: F) {
        debug_assert!(self.state != State::Uninitialized, "store_time before reinitialize");
        self.current_time = t_end;
        self.current_state = y_end.clone();
        self.h = h;
        self.state = State::TimeStored;
    }

    fn ensure_finalized(&mut self) {
        if self.state != State::Finalized {
            debug_assert!(self.state == State::TimeStored, "finalize before store_time");
            if let Some(dense) = self.dense.as_mut() {
                dense.finalize(self.previous_time, &self.previous_state, &self.current_state, self.h);
            }
            self.state = State::Finalized;
        }
    }

    pub fn interpolated_state(&mut self, t: F) -> DVec<F> {
        self.ensure_finalized();
        let theta = (t - self.previous_time) / self.h;
        self.dense
            .as_ref()
            .expect("interpolator has no dense output")
            .evaluate_state(&self.previous_state, &self.current_state, theta, self.h)
    }

    pub fn interpolated_derivatives(&mut self, t: F) -> DVec<F> {
        self.ensure_finalized();
        let theta = (t - self.previous_time) / self.h;
        self.dense
            .as_ref()
            .expect("interpolator has no dense output")
            .evaluate_derivative(&self.previous_state, &self.current_state, theta, self.h)
    }

    /// Copy current -> previous endpoints, preparing the next step;
    /// leaves `dense` in place until the engine supplies a fresh one via
    /// `reinitialize`.
    pub fn shift(&mut self) {
        self.previous_time = self.current_time;
        self.previous_state = self.current_state.clone();
        self.state = State::Initialized;
    }

    pub fn rescale(&mut self, h_new: F) {
        self.h = h_new;
    }

    pub fn previous_time(&self) -> F {
        self.previous_time
    }

    pub fn current_time(&self) -> F {
        self.current_time
    }

    pub fn previous_state(&self) -> &DVec<F> {
        &self.previous_state
    }

    pub fn current_state(&self) -> &DVec<F> {
        &self.current_state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct LinearDense;

    impl DenseOutput<f64> for LinearDense {
        fn evaluate_state(
            &self,
            previous_state: &DVec<f64>,
            current_state: &DVec<f64>,
            theta: f64,
            _h: f64,
        ) -> DVec<f64> {
            let mut out = DVec::zeros(previous_state.len());
            for i in 0..out.len() {
                out[i] = previous_state[i] + theta * (current_state[i] - previous_state[i]);
            }
            out
        }

        fn evaluate_derivative(
            &self,
            previous_state: &DVec<f64>,
            current_state: &DVec<f64>,
            _theta: f64,
            h: f64,
        ) -> DVec<f64> {
            let mut out = DVec::zeros(previous_state.len());
            for i in 0..out.len() {
                out[i] = (current_state[i] - previous_state[i]) / h;
            }
            out
        }

        fn finalize(&mut self, _t_previous: f64, _previous_state: &DVec<f64>, _current_state: &DVec<f64>, _h: f64) {}
    }

    #[test]
    fn midpoint_interpolation_matches_linear_blend() {
        let mut interp: StepInterpolator<f64, LinearDense> = StepInterpolator::new(true, 1);
        interp.reinitialize(0.0, &DVec::from_vec(vec![1.0]), LinearDense);
        interp.store_time(1.0, &DVec::from_vec(vec![3.0]), 1.0);
        let mid = interp.interpolated_state(0.5);
        assert!((mid[0] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn shift_moves_current_into_previous() {
        let mut interp: StepInterpolator<f64, LinearDense> = StepInterpolator::new(true, 1);
        interp.reinitialize(0.0, &DVec::from_vec(vec![1.0]), LinearDense);
        interp.store_time(1.0, &DVec::from_vec(vec![3.0]), 1.0);
        interp.shift();
        assert_eq!(interp.previous_time(), 1.0);
        assert_eq!(interp.previous_state()[0], 3.0);
    }
}
