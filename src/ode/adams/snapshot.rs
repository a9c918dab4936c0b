//! The one serialization surface this crate defines: a plain-data
//! snapshot of an `f64` Nordsieck state, everything else
//! (tolerances, problem dimension, transformer) being reconstructable
//! from the surrounding `OdeSolverProblem` and the step order.

use serde::{Deserialize, Serialize};

use crate::errors::OdeResult;
use crate::linalg::{DMat, DVec};
use crate::ode::adams::nordsieck;
use crate::ode::adams::state::NordsieckState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NordsieckSnapshot {
    pub scaled: Vec<f64>,
    pub higher_order: Vec<Vec<f64>>,
    pub step_size: f64,
    pub step_start: f64,
}

impl NordsieckSnapshot {
    pub fn capture(state: &NordsieckState<f64>, step_start: f64) -> Self {
        let higher_order = (0..state.higher_order.nrows())
            .map(|i| state.higher_order.row(i).as_slice().to_vec())
            .collect();
        Self {
            scaled: state.scaled.as_slice().to_vec(),
            higher_order,
            step_size: state.h,
            step_start,
        }
    }

    /// Reconstructs a `NordsieckState` with `y0` supplied separately
    /// (the snapshot does not carry the base state, only the scaled
    /// derivative/higher-order block).
    pub fn restore(&self, y0: DVec<f64>) -> OdeResult<(NordsieckState<f64>, f64)> {
        let order = self.higher_order.len() + 1;
        let transformer = nordsieck::transformer(order)?;
        let dim = self.scaled.len();
        let mut higher_order = DMat::zeros(self.higher_order.len(), dim);
        for (i, row) in self.higher_order.iter().enumerate() {
            higher_order.set_row(i, &DVec::from_vec(row.clone()));
        }
        let state = NordsieckState {
            y0,
            scaled: DVec::from_vec(self.scaled.clone()),
            higher_order,
            h: self.step_size,
            transformer,
        };
        Ok((state, self.step_start))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ode::adams::state::prologue;
    use crate::ode::problem::OdeProblem;

    struct Linear;
    impl OdeProblem<f64> for Linear {
        fn dim(&self) -> usize {
            1
        }
        fn rhs(&self, _t: f64, _y: &DVec<f64>, dy: &mut DVec<f64>) {
            dy[0] = 1.0;
        }
    }

    #[test]
    fn capture_then_restore_round_trips_the_numbers() {
        let state = prologue(&Linear, 4, 0.0, &DVec::from_vec(vec![0.0]), 0.05).unwrap();
        let snapshot = NordsieckSnapshot::capture(&state, 0.0);
        let (restored, step_start) = snapshot.restore(state.y0.clone()).unwrap();
        assert_eq!(step_start, 0.0);
        assert_eq!(restored.scaled.as_slice(), state.scaled.as_slice());
        assert_eq!(restored.higher_order.nrows(), state.higher_order.nrows());
    }
}
