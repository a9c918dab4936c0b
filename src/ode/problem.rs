//! The ODE problem boundary (C2): a pure right-hand-side callable plus
//! dimension and tolerance bookkeeping shared by every driver.

use crate::errors::{OdeError, OdeResult};
use crate::field::FieldElement;
use crate::linalg::DVec;

/// `(t, y) -> dy/dt`, the one callback every driver queries.
pub trait OdeProblem<F: FieldElement> {
    fn dim(&self) -> usize;
    fn rhs(&self, t: F, y: &DVec<F>, dy: &mut DVec<F>);

    /// Optional secondary-equation ranges inside the concatenated state,
    /// declared disjoint from the primary `[0, dim())` block.
    fn secondary_equations(&self) -> &[SecondaryEquationRange] {
        &[]
    }
}

/// One secondary-equation mapper's `(offset, len)` range inside the
/// concatenated state vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SecondaryEquationRange {
    pub offset: usize,
    pub len: usize,
}

/// Either a scalar tolerance pair or a per-component vector pair, never
/// both.
#[derive(Debug, Clone)]
pub enum Tolerance<F> {
    Scalar { abs: F, rel: F },
    Vector { abs: DVec<F>, rel: DVec<F> },
}

impl<F: FieldElement> Tolerance<F> {
    /// The per-component error-scaling envelope τᵢ = absᵢ + relᵢ·|yᵢ|.
    pub fn envelope(&self, y: &DVec<F>) -> DVec<F> {
        match self {
            Tolerance::Scalar { abs, rel } => {
                let mut out = DVec::zeros(y.len());
                for i in 0..y.len() {
                    out[i] = *abs + *rel * y[i].abs();
                }
                out
            }
            Tolerance::Vector { abs, rel } => {
                let mut out = DVec::zeros(y.len());
                for i in 0..y.len() {
                    out[i] = abs[i] + rel[i] * y[i].abs();
                }
                out
            }
        }
    }
}

/// The primary-dimension-scoped solver configuration: tolerance envelope,
/// evaluation budget, and the disjointness check over secondary ranges.
pub struct OdeSolverProblem<F> {
    pub primary_dim: usize,
    pub total_dim: usize,
    pub tolerance: Tolerance<F>,
    pub max_evals: u64,
}

impl<F: FieldElement> OdeSolverProblem<F> {
    pub fn new(
        primary_dim: usize,
        secondary: &[SecondaryEquationRange],
        tolerance: Tolerance<F>,
    ) -> OdeResult<Self> {
        let mut covered = vec![false; primary_dim];
        let mut total_dim = primary_dim;
        for range in secondary {
            let end = range.offset + range.len;
            total_dim = total_dim.max(end);
            let needed = covered.len().max(end);
            covered.resize(needed, false);
            for slot in covered.iter_mut().take(end).skip(range.offset) {
                if *slot {
                    return Err(OdeError::DimensionMismatch {
                        expected: primary_dim,
                        actual: end,
                    });
                }
                *slot = true;
            }
        }
        Ok(Self {
            primary_dim,
            total_dim,
            tolerance,
            max_evals: u64::MAX,
        })
    }

    pub fn with_max_evals(mut self, max_evals: u64) -> Self {
        self.max_evals = max_evals;
        self
    }

    /// Error-norm denominator: RMS over the primary dimension only, even
    /// when secondary equations inflate the state.
    pub fn primary_rms_error(&self, residual: &DVec<F>, envelope: &DVec<F>) -> F {
        let mut acc = F::zero();
        for i in 0..self.primary_dim {
            let scaled = residual[i] / envelope[i];
            acc += scaled * scaled;
        }
        (acc / F::from_f64(self.primary_dim as f64)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disjoint_secondary_ranges_are_accepted() {
        let ranges = [
            SecondaryEquationRange { offset: 3, len: 2 },
            SecondaryEquationRange { offset: 5, len: 1 },
        ];
        let problem = OdeSolverProblem::<f64>::new(
            3,
            &ranges,
            Tolerance::Scalar { abs: 1e-6, rel: 1e-6 },
        );
        assert!(problem.is_ok());
        assert_eq!(problem.unwrap().total_dim, 6);
    }

    #[test]
    fn overlapping_secondary_ranges_are_rejected() {
        let ranges = [
            SecondaryEquationRange { offset: 3, len: 2 },
            SecondaryEquationRange { offset: 4, len: 2 },
        ];
        let problem = OdeSolverProblem::<f64>::new(
            3,
            &ranges,
            Tolerance::Scalar { abs: 1e-6, rel: 1e-6 },
        );
        assert!(problem.is_err());
    }

    #[test]
    fn scalar_tolerance_envelope_matches_formula() {
        let tol = Tolerance::Scalar { abs: 1e-6, rel: 1e-3 };
        let y = DVec::from_vec(vec![10.0, -20.0]);
        let env = tol.envelope(&y);
        assert!((env[0] - (1e-6 + 1e-3 * 10.0)).abs() < 1e-12);
        assert!((env[1] - (1e-6 + 1e-3 * 20.0)).abs() < 1e-12);
    }
}
