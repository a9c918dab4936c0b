//! Classical (non-embedded) RK4 (§4.6.1). Reuses the same
//! `ButcherTableau`/`DenseOutput` machinery as the embedded methods with
//! a constant zero error weight, so it never triggers rejection.

use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::interpolator::DenseOutput;
use crate::ode::rk::engine::ErkMethod;
use crate::ode::rk::tableau::ButcherTableau;

pub struct Rk4<F> {
    tableau: ButcherTableau<F>,
}

impl<F: FieldElement> Rk4<F> {
    pub fn new() -> Self {
        let tableau = ButcherTableau::from_f64(
            false,
            4,
            &[0.0, 0.5, 0.5, 1.0],
            &[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]],
            &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0],
        );
        Self { tableau }
    }
}

impl<F: FieldElement> Default for Rk4<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FieldElement> ErkMethod<F> for Rk4<F> {
    fn tableau(&self) -> &ButcherTableau<F> {
        &self.tableau
    }

    fn order(&self) -> usize {
        4
    }

    fn estimate_error(
        &self,
        _y_dot_k: &[DVec<F>],
        _y_old: &DVec<F>,
        _y_new: &DVec<F>,
        _h: F,
        _envelope: &DVec<F>,
    ) -> F {
        F::zero()
    }

    fn make_dense_output(
        &self,
        y_dot_k: Vec<DVec<F>>,
        _y_old: DVec<F>,
        _y_new: DVec<F>,
        _h: F,
    ) -> Box<dyn DenseOutput<F>> {
        Box::new(Rk4DenseOutput { y_dot_k })
    }
}

/// Degree-2 theta-polynomial dense output (§4.6.1), reference-point
/// switch at theta = 1/2 to limit floating-point cancellation.
struct Rk4DenseOutput<F> {
    y_dot_k: Vec<DVec<F>>,
}

impl<F: FieldElement> DenseOutput<F> for Rk4DenseOutput<F> {
    fn evaluate_state(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F> {
        let k0 = &self.y_dot_k[0];
        let k12 = &self.y_dot_k[1] + &self.y_dot_k[2];
        let k3 = &self.y_dot_k[3];

        if theta.to_f64() <= 0.5 {
            let base = theta * h / F::from_f64(6.0);
            let c0 = base * (F::from_f64(6.0) - F::from_f64(9.0) * theta + F::from_f64(4.0) * theta * theta);
            let c12 = base * (F::from_f64(6.0) * theta - F::from_f64(4.0) * theta * theta);
            let c3 = base * (F::from_f64(-3.0) * theta + F::from_f64(4.0) * theta * theta);
            let mut out = previous_state.clone();
            out.axpy(c0, k0);
            out.axpy(c12, &k12);
            out.axpy(c3, k3);
            out
        } else {
            let eta = h * (F::one() - theta) / F::from_f64(6.0);
            let c0 = eta * (F::from_f64(-4.0) * theta * theta + F::from_f64(5.0) * theta - F::one());
            let c12 = eta * (F::from_f64(4.0) * theta * theta - F::from_f64(2.0) * theta - F::from_f64(2.0));
            let c3 = eta * (F::from_f64(-4.0) * theta * theta - theta - F::one());
            let mut out = current_state.clone();
            out.axpy(c0, k0);
            out.axpy(c12, &k12);
            out.axpy(c3, k3);
            out
        }
    }

    fn evaluate_derivative(
        &self,
        _previous_state: &DVec<F>,
        _current_state: &DVec<F>,
        theta: F,
        _h: F,
    ) -> DVec<F> {
        let k0 = &self.y_dot_k[0];
        let k12 = &self.y_dot_k[1] + &self.y_dot_k[2];
        let k3 = &self.y_dot_k[3];
        let c0 = F::one() - F::from_f64(2.0) * theta;
        let c12 = F::from_f64(2.0) * theta * (F::one() - theta);
        let c3 = -theta * (F::one() - F::from_f64(2.0) * theta);

        let mut out = DVec::zeros(k0.len());
        out.axpy(c0, k0);
        out.axpy(c12, &k12);
        out.axpy(c3, k3);
        out
    }

    fn finalize(&mut self, _t_previous: F, _previous_state: &DVec<F>, _current_state: &DVec<F>, _h: F) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolated_endpoints_match_stored_states() {
        let dense = Rk4DenseOutput {
            y_dot_k: vec![
                DVec::from_vec(vec![1.0]),
                DVec::from_vec(vec![1.0]),
                DVec::from_vec(vec![1.0]),
                DVec::from_vec(vec![1.0]),
            ],
        };
        let prev = DVec::from_vec(vec![0.0]);
        let curr = DVec::from_vec(vec![1.0]);
        let at_zero = dense.evaluate_state(&prev, &curr, 0.0, 1.0);
        assert!((at_zero[0] - prev[0]).abs() < 1e-12);
    }
}
