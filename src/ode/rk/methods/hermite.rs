//! A cubic Hermite dense output shared by the embedded methods whose
//! own literal interpolation polynomials are not reproduced here (see
//! DESIGN.md): order-consistent through the endpoint states and
//! derivatives, nothing method-specific.

use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::interpolator::DenseOutput;

pub struct HermiteDenseOutput<F> {
    pub y_dot_old: DVec<F>,
    pub y_dot_new: DVec<F>,
}

impl<F: FieldElement> DenseOutput<F> for HermiteDenseOutput<F> {
    fn evaluate_state(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F> {
        let t2 = theta * theta;
        let t3 = t2 * theta;
        let h00 = F::from_f64(2.0) * t3 - F::from_f64(3.0) * t2 + F::one();
        let h10 = t3 - F::from_f64(2.0) * t2 + theta;
        let h01 = F::from_f64(-2.0) * t3 + F::from_f64(3.0) * t2;
        let h11 = t3 - t2;

        let mut out = DVec::zeros(previous_state.len());
        out.axpy(h00, previous_state);
        out.axpy(h10 * h, &self.y_dot_old);
        out.axpy(h01, current_state);
        out.axpy(h11 * h, &self.y_dot_new);
        out
    }

    fn evaluate_derivative(
        &self,
        previous_state: &DVec<F>,
        current_state: &DVec<F>,
        theta: F,
        h: F,
    ) -> DVec<F> {
        let t2 = theta * theta;
        let dh00 = F::from_f64(6.0) * t2 - F::from_f64(6.0) * theta;
        let dh10 = F::from_f64(3.0) * t2 - F::from_f64(4.0) * theta + F::one();
        let dh01 = F::from_f64(-6.0) * t2 + F::from_f64(6.0) * theta;
        let dh11 = F::from_f64(3.0) * t2 - F::from_f64(2.0) * theta;

        let diff = current_state - previous_state;
        let mut out = DVec::zeros(previous_state.len());
        out.axpy(dh00 / h, &diff);
        out.axpy(dh10, &self.y_dot_old);
        out.axpy(dh01 / h, &diff);
        out.axpy(dh11, &self.y_dot_new);
        out
    }

    fn finalize(&mut self, _t_previous: F, _previous_state: &DVec<F>, _current_state: &DVec<F>, _h: F) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_reproduced_exactly() {
        let dense = HermiteDenseOutput {
            y_dot_old: DVec::from_vec(vec![1.0]),
            y_dot_new: DVec::from_vec(vec![2.0]),
        };
        let prev = DVec::from_vec(vec![0.0]);
        let curr = DVec::from_vec(vec![1.5]);
        let at0 = dense.evaluate_state(&prev, &curr, 0.0, 1.0);
        let at1 = dense.evaluate_state(&prev, &curr, 1.0, 1.0);
        assert!((at0[0] - prev[0]).abs() < 1e-12);
        assert!((at1[0] - curr[0]).abs() < 1e-12);
    }
}
