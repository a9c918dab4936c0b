//! The Adams-Bashforth explicit predictor driver (C8, §4.8): shares the
//! Nordsieck prologue and phase-1/phase-2 update with the Moulton
//! corrector, predicting once per step with no correction pass.

use crate::errors::OdeResult;
use crate::field::FieldElement;
use crate::linalg::DVec;
use crate::ode::adams::state::{prologue, AdamsStatistics};
use crate::ode::controller::StepController;
use crate::ode::handler::{DynStepInterpolator, EventAction, EventHandler, StepHandler};
use crate::ode::interpolator::{DenseOutput, StepInterpolator};
use crate::ode::problem::{OdeProblem, OdeSolverProblem};

pub struct AdamsBashforth<F> {
    order: usize,
    controller: StepController<F>,
    stats: AdamsStatistics,
}

impl<F: FieldElement> AdamsBashforth<F> {
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
                let envelope = solver_problem.tolerance.envelope(&y);
                let error = state.last_row_error(&envelope);

                if error.to_f64() >= 1.0 {
                    self.stats.rejected_steps += 1;
                    let factor = self.controller.shrink_factor(error, state.order());
                    step_h = self.controller.filter(step_h * factor, forward, false)?;
                    is_last = false;
                    state.rescale(step_h);
                    continue;
                }

                let predicted = state
                    .dense_output()
                    .evaluate_state(&y, &y, F::one(), step_h);
                let mut y_dot_new = DVec::zeros(dim);
                problem.rhs(t + step_h, &predicted, &mut y_dot_new);
                let predicted_scaled = y_dot_new.scale(step_h);

                let mut r_new = state.transformer.update_phase1(&state.higher_order);
                state
                    .transformer
                    .update_phase2(&mut r_new, &state.scaled, &predicted_scaled);

                self.stats.accepted_steps += 1;
                let t_new = t + step_h;

                state.y0 = predicted.clone();
                state.scaled = predicted_scaled;
                state.higher_order = r_new;
                state.h = step_h;

                interpolator.reinitialize(t, &y, Box::new(state.dense_output()));
                interpolator.store_time(t_new, &predicted, step_h);
                step_handler.handle_step(&mut interpolator, is_last);

                let mut reset = false;
                if let Some(handler) = event_handler {
                    if let EventAction::ResetState(new_y) = handler.action(t_new, &predicted) {
                        log::warn!("event handler reset state at t={}, rebuilding Nordsieck history", t_new.to_f64());
                        state = prologue(problem, self.order, t_new, &new_y, step_h)?;
                        self.stats.prologue_runs += 1;
                        y = new_y;
                        reset = true;
                    }
                }
                if !reset {
                    y = predicted;
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

    struct Decay10;
    impl OdeProblem<f64> for Decay10 {
        fn dim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, y: &DVec<f64>, dy: &mut DVec<f64>) {
            dy[0] = -10.0 * y[0];
        }
    }

    #[test]
    fn decay_ten_converges_near_exp_minus_ten() {
        let controller = StepController::new(1e-9, 0.1);
        let mut driver = AdamsBashforth::new(4, controller);
        let solver_problem = OdeSolverProblem::<f64>::new(
            1,
            &[],
            Tolerance::Scalar { abs: 1e-7, rel: 1e-7 },
        )
        .unwrap();
        let mut handler = crate::ode::handler::NoOpStepHandler;
        let (t_final, y_final) = driver
            .integrate(
                &Decay10,
                &solver_problem,
                0.0,
                &DVec::from_vec(vec![1.0]),
                1.0,
                0.01,
                &mut handler,
                None,
            )
            .unwrap();
        assert!((t_final - 1.0).abs() < 1e-9);
        let expected = (-10.0_f64).exp();
        assert!((y_final[0] - expected).abs() < 1e-3, "{} vs {}", y_final[0], expected);
    }
}
