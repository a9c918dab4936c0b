//! The classical 2-stage midpoint method, added as a cheap low-order
//! method for quick smoke tests and prologue use, in the same
//! never-reject style as `Rk4`.

use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::interpolator::DenseOutput;
use crate::ode::rk::engine::ErkMethod;
use crate::ode::rk::tableau::ButcherTableau;

pub struct Midpoint<F> {
    tableau: ButcherTableau<F>,
}

impl<F: FieldElement> Midpoint<F> {
    pub fn new() -> Self {
        let tableau = ButcherTableau::from_f64(
            false,
            2,
            &[0.0, 0.5],
            &[&[], &[0.5]],
            &[0.0, 1.0],
        );
        Self { tableau }
    }
}

impl<F: FieldElement> Default for Midpoint<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FieldElement> ErkMethod<F> for Midpoint<F> {
    fn tableau(&self) -> &ButcherTableau<F> {
        &self.tableau
    }

    fn order(&self) -> usize {
        2
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
        y_old: DVec<F>,
        y_new: DVec<F>,
        _h: F,
    ) -> Box<dyn DenseOutput<F>> {
        Box::new(MidpointDenseOutput { y_dot_k, y_old, y_new })
    }
}

/// Linear blend of the endpoints for the state, constant derivative
/// equal to the midpoint stage's slope; a deliberately simple stand-in
/// since the method has no published high-order dense-output polynomial.
struct MidpointDenseOutput<F> {
    y_dot_k: Vec<DVec<F>>,
    y_old: DVec<F>,
    y_new: DVec<F>,
}

impl<F: FieldElement> DenseOutput<F> for MidpointDenseOutput<F> {
    fn evaluate_state(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        _h: F,
    ) -> DVec<F> {
        let mut out = previous_state.clone();
        for i in 0..out.len() {
            out[i] = previous_state[i] + theta * (current_state[i] - previous_state[i]);
        }
        out
    }

    fn evaluate_derivative(
        &self,
        _previous_state: &DVec<F>,
        _current_state: &DVec<F>,
        _theta: F,
        _h: F,
    ) -> DVec<F> {
        self.y_dot_k[1].clone()
    }

    fn finalize(&mut self, _t_previous: F, _previous_state: &DVec<F>, _current_state: &DVec<F>, _h: F) {
        let _ = (&self.y_old, &self.y_new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midpoint_tableau_has_two_stages() {
        let m: Midpoint<f64> = Midpoint::new();
        assert_eq!(m.tableau().stages, 2);
        assert_eq!(m.tableau().b[1], 1.0);
    }
}
