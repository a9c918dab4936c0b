//! Nordsieck-state plumbing shared by both Adams drivers: the dense
//! output wrapping `(y0, scaled, higherOrder)`, rescaling on a
//! step-size change, and the prologue that seeds the first Nordsieck
//! vector from a short run of a starter ERK method.

use std::sync::Arc;

use crate::field::FieldElement;
use crate::linalg::{DMat, DVec};
use crate::ode::adams::nordsieck::{self, NordsieckTransformer};
use crate::ode::interpolator::DenseOutput;
use crate::ode::problem::OdeProblem;
use crate::ode::rk::{ErkMethod, Rk4};

/// `y(t0 + theta*h) = y0 + theta*scaled + sum_c theta^(c+2) * higherOrder[c]`,
/// the Nordsieck form's Taylor reconstruction.
#[derive(Clone)]
pub struct NordsieckState<F> {
    pub y0: DVec<F>,
    pub scaled: DVec<F>,
    pub higher_order: DMat<F>,
    pub h: F,
    pub transformer: Arc<NordsieckTransformer>,
}

impl<F: FieldElement> NordsieckState<F> {
    pub fn order(&self) -> usize {
        self.transformer.order()
    }

    /// Rescale every row to keep the same underlying polynomial when the
    /// step size changes: row `c` (representing derivative order `c+2`)
    /// picks up a factor `(h_new/h_old)^(c+2)`, `scaled` a factor
    /// `h_new/h_old`.
    pub fn rescale(&mut self, h_new: F) {
        let ratio = h_new / self.h;
        self.scaled = self.scaled.scale(ratio);
        let mut power = ratio * ratio;
        for c in 0..self.higher_order.nrows() {
            let row = self.higher_order.row(c).scale(power);
            self.higher_order.set_row(c, &row);
            power *= ratio;
        }
        self.h = h_new;
    }

    /// `error = rms((higherOrder[last] / envelope))`, the a-priori
    /// predictor error estimate.
    pub fn last_row_error(&self, envelope: &DVec<F>) -> F {
        let last = self.higher_order.nrows() - 1;
        self.higher_order.row(last).component_div(envelope).rms_norm()
    }

    pub fn dense_output(&self) -> NordsieckDenseOutput<F> {
        NordsieckDenseOutput { state: self.clone() }
    }
}

pub struct NordsieckDenseOutput<F> {
    pub state: NordsieckState<F>,
}

impl<F: FieldElement> DenseOutput<F> for NordsieckDenseOutput<F> {
    fn evaluate_state(
        &self,
        _previous_state: &DVec<F>,
        _current_state: &DVec<F>,
        theta: F,
        _h: F,
    ) -> DVec<F> {
        let mut out = self.state.y0.clone();
        out.axpy(theta, &self.state.scaled);
        let mut power = theta * theta;
        for c in 0..self.state.higher_order.nrows() {
            out.axpy(power, &self.state.higher_order.row(c));
            power *= theta;
        }
        out
    }

    fn evaluate_derivative(
        &self,
        _previous_state: &DVec<F>,
        _current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F> {
        let dim = self.state.y0.len();
        let mut out = DVec::zeros(dim);
        out.axpy(F::one() / h, &self.state.scaled);
        let mut power = theta;
        for c in 0..self.state.higher_order.nrows() {
            let coeff = F::from_f64((c + 2) as f64) * power / h;
            out.axpy(coeff, &self.state.higher_order.row(c));
            power *= theta;
        }
        out
    }

    fn finalize(&mut self, _t_previous: F, _previous_state: &DVec<F>, _current_state: &DVec<F>, _h: F) {}
}

/// One fixed-size explicit stage-loop step of `method`'s tableau, with no
/// error control: the prologue's probing tool, not a driver in its own
/// right.
fn fixed_step<F: FieldElement, P: OdeProblem<F>, M: ErkMethod<F>>(
    method: &M,
    problem: &P,
    t: F,
    y: &DVec<F>,
    h: F,
) -> (DVec<F>, DVec<F>) {
    let tableau = method.tableau();
    let dim = y.len();
    let mut k: Vec<DVec<F>> = vec![DVec::zeros(dim); tableau.stages];
    let mut dy0 = DVec::zeros(dim);
    problem.rhs(t, y, &mut dy0);
    k[0] = dy0;
    for s in 1..tableau.stages {
        let mut y_tmp = y.clone();
        for l in 0..s {
            y_tmp.axpy(h * tableau.a[s][l], &k[l]);
        }
        let t_stage = t + tableau.c[s] * h;
        let mut dy = DVec::zeros(dim);
        problem.rhs(t_stage, &y_tmp, &mut dy);
        k[s] = dy;
    }
    let mut y_new = y.clone();
    for l in 0..tableau.stages {
        y_new.axpy(h * tableau.b[l], &k[l]);
    }
    let mut dy_new = DVec::zeros(dim);
    problem.rhs(t + h, &y_new, &mut dy_new);
    (y_new, dy_new)
}

/// Runs `order - 1` fixed steps of size `h0` with a classical RK4
/// starter from `(t0, y0)`, fits the Taylor least-squares system through
/// the resulting `order` history samples, and returns the Nordsieck
/// state centered back at `(t0, y0)`.
pub fn prologue<F: FieldElement, P: OdeProblem<F>>(
    problem: &P,
    order: usize,
    t0: F,
    y0: &DVec<F>,
    h0: F,
) -> crate::errors::OdeResult<NordsieckState<F>> {
    let starter = Rk4::<F>::new();
    let mut times = Vec::with_capacity(order);
    let mut states = Vec::with_capacity(order);
    let mut derivs = Vec::with_capacity(order);

    let mut t = t0;
    let mut y = y0.clone();
    let mut dy0 = DVec::zeros(problem.dim());
    problem.rhs(t, &y, &mut dy0);
    times.push(t);
    states.push(y.clone());
    derivs.push(dy0);

    for _ in 1..order {
        let (y_new, dy_new) = fixed_step(&starter, problem, t, &y, h0);
        t = t + h0;
        y = y_new;
        times.push(t);
        states.push(y.clone());
        derivs.push(dy_new);
    }

    let higher_order =
        nordsieck::initialize_high_order_derivatives(order, h0, &times, &states, &derivs);
    let transformer = nordsieck::transformer(order)?;
    Ok(NordsieckState {
        y0: states[0].clone(),
        scaled: derivs[0].scale(h0),
        higher_order,
        h: h0,
        transformer,
    })
}

#[derive(Debug, Clone, Default)]
pub struct AdamsStatistics {
    pub rhs_evals: u64,
    pub accepted_steps: u64,
    pub rejected_steps: u64,
    pub prologue_runs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::problem::OdeProblem;

    struct ConstantSlope;
    impl OdeProblem<f64> for ConstantSlope {
        fn dim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, _y: &DVec<f64>, dy: &mut DVec<f64>) {
            dy[0] = 2.0;
        }
    }

    #[test]
    fn prologue_reproduces_a_linear_solution_with_near_zero_higher_order() {
        let state = prologue(&ConstantSlope, 4, 0.0, &DVec::from_vec(vec![1.0]), 0.05).unwrap();
        assert!((state.y0[0] - 1.0).abs() < 1e-12);
        for c in 0..state.higher_order.nrows() {
            assert!(state.higher_order.row(c)[0].abs() < 1e-6);
        }
    }

    #[test]
    fn rescale_preserves_state_at_theta_zero() {
        let mut state = prologue(&ConstantSlope, 4, 0.0, &DVec::from_vec(vec![1.0]), 0.05).unwrap();
        let before = state.dense_output().evaluate_state(&state.y0.clone(), &state.y0.clone(), 0.0, state.h);
        state.rescale(0.1);
        let after = state.dense_output().evaluate_state(&state.y0.clone(), &state.y0.clone(), 0.0, state.h);
        assert!((before[0] - after[0]).abs() < 1e-12);
    }
}
