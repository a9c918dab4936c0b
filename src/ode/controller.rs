//! The step controller: initial-step heuristic, step filtering, and
//! the accept/reject growth-shrink bookkeeping shared by every driver.
//! A small struct of tunables with builder-style setters and no owned
//! state beyond `[minStep, maxStep]` and the growth/shrink knobs.

use crate::errors::{OdeError, OdeResult};
use crate::field::FieldElement;
use crate::linalg::DVec;

#[derive(Debug, Clone)]
pub struct StepController<F> {
    pub min_step: F,
    pub max_step: F,
    pub safety: F,
    pub min_reduction: F,
    pub max_growth: F,
}

impl<F: FieldElement> StepController<F> {
    pub fn new(min_step: F, max_step: F) -> Self {
        Self {
            min_step,
            max_step,
            safety: F::from_f64(0.9),
            min_reduction: F::from_f64(0.2),
            max_growth: F::from_f64(10.0),
        }
    }

    pub fn with_safety(mut self, safety: F) -> Self {
        self.safety = safety;
        self
    }

    pub fn with_min_reduction(mut self, min_reduction: F) -> Self {
        self.min_reduction = min_reduction;
        self
    }

    pub fn with_max_growth(mut self, max_growth: F) -> Self {
        self.max_growth = max_growth;
        self
    }

    /// Clamp a requested signed step to `[minStep, maxStep]` in magnitude,
    /// preserving direction. `accept_small=true` silently raises a step
    /// below the floor instead of failing.
    pub fn filter(&self, h: F, forward: bool, accept_small: bool) -> OdeResult<F> {
        let sign = if forward { F::one() } else { -F::one() };
        let magnitude = h.abs();
        let magnitude = if magnitude.to_f64() < self.min_step.to_f64() {
            if accept_small {
                self.min_step
            } else {
                return Err(OdeError::StepTooSmall {
                    requested: magnitude.to_f64(),
                    min_step: self.min_step.to_f64(),
                });
            }
        } else {
            magnitude.min(self.max_step)
        };
        Ok(sign * magnitude)
    }

    /// `safety * err^(-1/p)`, floored by `minReduction` — used to shrink
    /// a rejected step.
    pub fn shrink_factor(&self, error: F, order: usize) -> F {
        let exponent = F::from_f64(-1.0) / F::from_f64(order as f64);
        (self.safety * error.pow(exponent)).max(self.min_reduction)
    }

    /// Same base factor as `shrink_factor` but also ceilinged by
    /// `maxGrowth` — used to propose the next step after acceptance.
    pub fn growth_factor(&self, error: F, order: usize) -> F {
        let exponent = F::from_f64(-1.0) / F::from_f64(order as f64);
        (self.safety * error.pow(exponent))
            .min(self.max_growth)
            .max(self.min_reduction)
    }

    /// An order-of-magnitude initial step from the scaled state/derivative
    /// norms and one Euler probe.
    #[allow(clippy::too_many_arguments)]
    pub fn initial_step(
        &self,
        forward: bool,
        order: usize,
        scaling: &DVec<F>,
        t0: F,
        y0: &DVec<F>,
        y0_dot: &DVec<F>,
        mut rhs: impl FnMut(F, &DVec<F>) -> DVec<F>,
    ) -> F {
        let ratio1 = y0.component_div(scaling).norm_l2_squared();
        let ratio2 = y0_dot.component_div(scaling).norm_l2_squared();

        let mut h = if ratio1.to_f64() < 1e-10 || ratio2.to_f64() < 1e-10 {
            F::from_f64(1e-6)
        } else {
            F::from_f64(0.01) * (ratio1 / ratio2).sqrt()
        };
        if !forward {
            h = -h;
        }

        let mut y1 = y0.clone();
        y1.axpy(h, y0_dot);
        let y1_dot = rhs(t0 + h, &y1);

        let diff = &y1_dot - y0_dot;
        let second_derivative_norm = diff.component_div(scaling).norm_l2() / h.abs();

        let m = ratio2.sqrt().max(second_derivative_norm);
        let h1 = if m.to_f64() < 1e-15 {
            F::from_f64(1e-6) * h.abs()
        } else {
            (F::from_f64(0.01) / m).pow(F::one() / F::from_f64(order as f64))
        };

        let mut result = (F::from_f64(100.0) * h.abs()).min(h1);
        let floor = F::from_f64(1e-12) * t0.abs();
        result = result.max(floor).max(self.min_step).min(self.max_step);
        if !forward {
            result = -result;
        }
        result
    }

    /// If `initial_step` was supplied explicitly and lies within
    /// `[minStep, maxStep]`, it is used as-is instead of the heuristic.
    pub fn resolve_initial_step(
        &self,
        forward: bool,
        order: usize,
        scaling: &DVec<F>,
        t0: F,
        y0: &DVec<F>,
        y0_dot: &DVec<F>,
        explicit: Option<F>,
        rhs: impl FnMut(F, &DVec<F>) -> DVec<F>,
    ) -> F {
        if let Some(h) = explicit {
            if h.to_f64() > 0.0 && h.to_f64() >= self.min_step.to_f64() && h.to_f64() <= self.max_step.to_f64() {
                return if forward { h } else { -h };
            }
        }
        self.initial_step(forward, order, scaling, t0, y0, y0_dot, rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_clamps_into_min_max_range() {
        let controller = StepController::new(1e-4, 10.0);
        let small = controller.filter(1e-8, true, true).unwrap();
        assert_eq!(small, 1e-4);
        let big = controller.filter(1e3, true, true).unwrap();
        assert_eq!(big, 10.0);
        let signed = controller.filter(1e-8, false, true).unwrap();
        assert_eq!(signed, -1e-4);
    }

    #[test]
    fn filter_rejects_small_step_when_not_accepting() {
        let controller = StepController::new(1e-4, 10.0);
        let result = controller.filter(1e-8, true, false);
        assert!(matches!(result, Err(OdeError::StepTooSmall { .. })));
    }

    #[test]
    fn shrink_factor_never_exceeds_one_above_error_threshold() {
        let controller = StepController::new(1e-10, 10.0);
        let factor = controller.shrink_factor(4.0, 4);
        assert!(factor < 1.0);
        assert!(factor >= controller.min_reduction);
    }

    #[test]
    fn initial_step_is_positive_and_within_bounds() {
        let controller = StepController::new(1e-10, 10.0);
        let scaling = DVec::from_vec(vec![1e-6, 1e-6]);
        let y0 = DVec::from_vec(vec![1.0, 0.0]);
        let y0_dot = DVec::from_vec(vec![0.0, -1.0]);
        let h = controller.initial_step(true, 4, &scaling, 0.0, &y0, &y0_dot, |_t, y| {
            DVec::from_vec(vec![-y[1], y[0]])
        });
        assert!(h > 0.0);
        assert!(h <= 10.0);
    }
}
