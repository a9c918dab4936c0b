//! The embedded 7-stage Higham & Hall 5(4) pair (C6): Higham, D.J. and
//! Hall, G., "Embedded Runge-Kutta formulae with stable equilibrium
//! states", J. Comput. Appl. Math. 20 (1987).

use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::interpolator::DenseOutput;
use crate::ode::rk::engine::ErkMethod;
use crate::ode::rk::methods::hermite::HermiteDenseOutput;
use crate::ode::rk::tableau::ButcherTableau;

const C: [f64; 7] = [
    0.0,
    2.0 / 9.0,
    1.0 / 3.0,
    1.0 / 2.0,
    3.0 / 5.0,
    1.0,
    1.0,
];

const B: [f64; 7] = [
    19.0 / 200.0,
    0.0,
    3.0 / 5.0,
    -243.0 / 400.0,
    33.0 / 40.0,
    7.0 / 80.0,
    0.0,
];

const E: [f64; 7] = [
    -1.0 / 20.0,
    0.0,
    81.0 / 160.0,
    -6.0 / 5.0,
    25.0 / 32.0,
    1.0 / 20.0,
    -1.0 / 20.0,
];

fn a_rows() -> [&'static [f64]; 7] {
    static A2: [f64; 1] = [2.0 / 9.0];
    static A3: [f64; 2] = [1.0 / 12.0, 1.0 / 4.0];
    static A4: [f64; 3] = [55.0 / 324.0, -25.0 / 108.0, 50.0 / 81.0];
    static A5: [f64; 4] = [83.0 / 330.0, -13.0 / 22.0, 61.0 / 66.0, 9.0 / 110.0];
    static A6: [f64; 5] = [-19.0 / 28.0, 9.0 / 4.0, 1.0 / 7.0, -27.0 / 7.0, 22.0 / 7.0];
    static A7: [f64; 6] = [
        19.0 / 200.0,
        0.0,
        3.0 / 5.0,
        -243.0 / 400.0,
        33.0 / 40.0,
        7.0 / 80.0,
    ];
    [&[], &A2, &A3, &A4, &A5, &A6, &A7]
}

pub struct HighamHall54<F> {
    tableau: ButcherTableau<F>,
    error_weights: Vec<F>,
}

impl<F: FieldElement> HighamHall54<F> {
    pub fn new() -> Self {
        let rows = a_rows();
        let tableau = ButcherTableau::from_f64(false, 5, &C, &rows, &B);
        let error_weights = E.iter().map(|&v| F::from_f64(v)).collect();
        Self { tableau, error_weights }
    }
}

impl<F: FieldElement> Default for HighamHall54<F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FieldElement> ErkMethod<F> for HighamHall54<F> {
    fn tableau(&self) -> &ButcherTableau<F> {
        &self.tableau
    }

    fn order(&self) -> usize {
        5
    }

    /// L²-normed weighted sum of `E[0..6]·yDotK[0..6]` over the envelope.
    fn estimate_error(
        &self,
        y_dot_k: &[DVec<F>],
        _y_old: &DVec<F>,
        _y_new: &DVec<F>,
        h: F,
        envelope: &DVec<F>,
    ) -> F {
        let dim = envelope.len();
        let mut diff = DVec::zeros(dim);
        for (k, weight) in self.error_weights.iter().enumerate() {
            diff.axpy(h * *weight, &y_dot_k[k]);
        }
        diff.component_div(envelope).rms_norm()
    }

    fn make_dense_output(
        &self,
        y_dot_k: Vec<DVec<F>>,
        _y_old: DVec<F>,
        _y_new: DVec<F>,
        _h: F,
    ) -> Box<dyn DenseOutput<F>> {
        Box::new(HermiteDenseOutput {
            y_dot_old: y_dot_k[0].clone(),
            y_dot_new: y_dot_k[6].clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_weights_sum_to_zero_componentwise_with_unit_slopes() {
        let method: HighamHall54<f64> = HighamHall54::new();
        let sum: f64 = method.error_weights.iter().sum();
        assert!(sum.abs() < 1e-12, "E must sum to zero: {sum}");
    }

    #[test]
    fn tableau_rows_sum_to_their_node() {
        let method: HighamHall54<f64> = HighamHall54::new();
        let tableau = method.tableau();
        for k in 1..tableau.stages {
            let row_sum: f64 = tableau.a[k].iter().sum();
            assert!((row_sum - tableau.c[k]).abs() < 1e-12, "row {k}: {row_sum} vs {}", tableau.c[k]);
        }
    }

    #[test]
    fn propagation_weights_match_the_final_stage_row() {
        let rows = a_rows();
        for (i, &w) in rows[6].iter().enumerate() {
            assert!((w - B[i]).abs() < 1e-15, "b[{i}] should equal the last stage row");
        }
    }

    struct HarmonicOscillator;
    impl crate::ode::problem::OdeProblem<f64> for HarmonicOscillator {
        fn dim(&self) -> usize {
            2
        }
        fn rhs(&self, _t: f64, y: &DVec<f64>, dy: &mut DVec<f64>) {
            dy[0] = y[1];
            dy[1] = -y[0];
        }
    }

    #[test]
    fn adaptive_integration_of_harmonic_oscillator_matches_sine_cosine_at_two_pi() {
        use crate::ode::controller::StepController;
        use crate::ode::handler::NoOpStepHandler;
        use crate::ode::problem::{OdeSolverProblem, Tolerance};
        use crate::ode::rk::engine::EmbeddedRungeKutta;

        let controller = StepController::new(1e-9, 0.1);
        let mut engine = EmbeddedRungeKutta::new(HighamHall54::<f64>::new(), controller);
        let solver_problem = OdeSolverProblem::<f64>::new(
            2,
            &[],
            Tolerance::Scalar { abs: 1e-9, rel: 1e-9 },
        )
        .unwrap();
        let mut handler = NoOpStepHandler;
        let (t_final, y_final) = engine
            .integrate(
                &HarmonicOscillator,
                &solver_problem,
                0.0,
                &DVec::from_vec(vec![1.0, 0.0]),
                2.0 * std::f64::consts::PI,
                Some(0.05),
                &mut handler,
            )
            .unwrap();
        assert!((t_final - 2.0 * std::f64::consts::PI).abs() < 1e-9);
        assert!((y_final[0] - 1.0).abs() < 1e-4, "y0 = {}", y_final[0]);
        assert!(y_final[1].abs() < 1e-4, "y1 = {}", y_final[1]);
    }
}
