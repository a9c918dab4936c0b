//! The Adams-Moulton PECE corrector driver (C9, §4.9): shares the
//! Nordsieck prologue with `AdamsBashforth` and adds one correction pass
//! with an alternating-sign Nordsieck row sum, plus a second evaluation
//! at the corrected state.

use crate::errors::OdeResult;
use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::adams::state::{prologue, AdamsStatistics};
use crate::ode::controller::StepController;
use crate::ode::handler::{DynStepInterpolator, EventAction, EventHandler, StepHandler};
use crate::ode::interpolator::{DenseOutput, StepInterpolator};
use crate::ode::problem::{OdeProblem, OdeSolverProblem};

pub struct AdamsMoulton<F> {
    order: usize,
    controller: StepController<F>,
    stats: AdamsStatistics,
}

impl<F: FieldElement> AdamsMoulton<F> {
    pub fn new(order: usize, controller: StepController<F>) -> Self {
        Self {
            order,
            controller,
            stats: AdamsStatistics::default(),
        }
    }

    pub fn statistics(&self) -> &AdamsStatistics {
        &self.stats
    }

    #[allow(clippy::too_many_arguments)]
    pub fn integrate<P: OdeProblem<F>>(
        &mut self,
        problem: &P,
        solver_problem: &OdeSolverProblem<F>,
        t0: F,
        y0: &DVec<F>,
        t_end: F,
        initial_step: F,
        step_handler: &mut dyn StepHandler<F>,
        event_handler: Option<&dyn EventHandler<F>>,
    ) -> OdeResult<(F, DVec<F>)> {
        let forward = t_end.to_f64() >= t0.to_f64();
        let dim = problem.dim();

        let mut state = prologue(problem, self.order, t0, y0, initial_step)?;
        self.stats.prologue_runs += 1;

        let mut t = t0;
        let mut y = y0.clone();
        let mut h = initial_step;

        let mut interpolator: DynStepInterpolator<F> = StepInterpolator::new(forward, dim);
        let mut is_last = false;

        while !is_last {
            let mut step_h = h;
            if (forward && (t.to_f64() + step_h.to_f64()) >= t_end.to_f64())
                || (!forward && (t.to_f64() + step_h.to_f64()) <= t_end.to_f64())
            {
                step_h = t_end - t;
                is_last = true;
            } else {
                is_last = false;
            }
            state.rescale(step_h);

            loop {
                let predicted = state
                    .dense_output()
                    .evaluate_state(&y, &y, F::one(), step_h);
                let mut y_dot_predicted = DVec::zeros(dim);
                problem.rhs(t + step_h, &predicted, &mut y_dot_predicted);
                let predicted_scaled = y_dot_predicted.scale(step_h);

                let mut r_prime = state.transformer.update_phase1(&state.higher_order);
                state
                    .transformer
                    .update_phase2(&mut r_prime, &state.scaled, &predicted_scaled);

                // y_corrected = y_prev + predictedScaled + sum_i (-1)^i * R'[i]
                let mut corrected = state.y0.clone();
                corrected += &predicted_scaled;
                let mut sign_positive = true;
                for i in 0..r_prime.nrows() {
                    let row = r_prime.row(i);
                    if sign_positive {
                        corrected += &row;
                    } else {
                        corrected -= &row;
                    }
                    sign_positive = !sign_positive;
                }

                let envelope = solver_problem.tolerance.envelope(&predicted);
                let residual = &corrected - &predicted;
                let error = solver_problem.primary_rms_error(&residual, &envelope);

                if error.to_f64() >= 1.0 {
                    self.stats.rejected_steps += 1;
                    let factor = self.controller.shrink_factor(error, state.order());
                    step_h = self.controller.filter(step_h * factor, forward, false)?;
                    is_last = false;
                    state.rescale(step_h);
                    continue;
                }

                let mut y_dot_corrected = DVec::zeros(dim);
                problem.rhs(t + step_h, &corrected, &mut y_dot_corrected);
                let corrected_scaled = y_dot_corrected.scale(step_h);
                state
                    .transformer
                    .update_phase2(&mut r_prime, &predicted_scaled, &corrected_scaled);

                self.stats.accepted_steps += 1;
                let t_new = t + step_h;

                state.y0 = corrected.clone();
                state.scaled = corrected_scaled;
                state.higher_order = r_prime;
                state.h = step_h;

                interpolator.reinitialize(t, &y, Box::new(state.dense_output()));
                interpolator.store_time(t_new, &corrected, step_h);
                step_handler.handle_step(&mut interpolator, is_last);

                let mut reset = false;
                if let Some(handler) = event_handler {
                    if let EventAction::ResetState(new_y) = handler.action(t_new, &corrected) {
                        log::warn!("event handler reset state at t={}, rebuilding Nordsieck history", t_new.to_f64());
                        state = prologue(problem, self.order, t_new, &new_y, step_h)?;
                        self.stats.prologue_runs += 1;
                        y = new_y;
                        reset = true;
                    }
                }
                if !reset {
                    y = corrected;
                }
                t = t_new;
                if reset {
                    h = step_h;
                } else {
                    let growth = self.controller.growth_factor(error, state.order());
                    let mut next_h = step_h * growth;
                    if (forward && t.to_f64() + next_h.to_f64() > t_end.to_f64())
                        || (!forward && t.to_f64() + next_h.to_f64() < t_end.to_f64())
                    {
                        next_h = t_end - t;
                    }
                    h = next_h;
                }
                break;
            }
        }

        Ok((t, y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::problem::Tolerance;

    struct Cosine;
    impl OdeProblem<f64> for Cosine {
        fn dim(&self) -> usize {
            1
        }
        fn rhs(&self, t: f64, _y: &DVec<f64>, dy: &mut DVec<f64>) {
            dy[0] = t.cos();
        }
    }

    #[test]
    fn sine_antiderivative_matches_at_pi() {
        let controller = StepController::new(1e-9, std::f64::consts::PI / 4.0);
        let mut driver = AdamsMoulton::new(4, controller);
        let solver_problem = OdeSolverProblem::<f64>::new(
            1,
            &[],
            Tolerance::Scalar { abs: 1e-8, rel: 1e-8 },
        )
        .unwrap();
        let mut handler = crate::ode::handler::NoOpStepHandler;
        let (t_final, y_final) = driver
            .integrate(
                &Cosine,
                &solver_problem,
                0.0,
                &DVec::from_vec(vec![0.0]),
                std::f64::consts::PI,
                std::f64::consts::PI / 8.0,
                &mut handler,
                None,
            )
            .unwrap();
        assert!((t_final - std::f64::consts::PI).abs() < 1e-9);
        assert!(y_final[0].abs() < 1e-3);
    }
}
