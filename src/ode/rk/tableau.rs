//! The Butcher tableau as plain data (§9's "re-architecture" pattern):
//! one generic engine consumes whichever tableau a method supplies.

use crate::field::FieldElement;

/// `c[0]` is always zero (the first stage's node); `a[k]` holds the
/// lower-triangular row for stage `k` (length `k`); `b` is the
/// propagation weight vector, length `stages`.
#[derive(Debug, Clone)]
pub struct ButcherTableau<F> {
    pub fsal: bool,
    pub stages: usize,
    pub order: usize,
    pub c: Vec<F>,
    pub a: Vec<Vec<F>>,
    pub b: Vec<F>,
}

impl<F: FieldElement> ButcherTableau<F> {
    pub fn from_f64(
        fsal: bool,
        order: usize,
        c: &[f64],
        a: &[&[f64]],
        b: &[f64],
    ) -> Self {
        let stages = b.len();
        assert_eq!(c.len(), stages);
        assert_eq!(a.len(), stages);
        Self {
            fsal,
            stages,
            order,
            c: c.iter().map(|&v| F::from_f64(v)).collect(),
            a: a.iter()
                .map(|row| row.iter().map(|&v| F::from_f64(v)).collect())
                .collect(),
            b: b.iter().map(|&v| F::from_f64(v)).collect(),
        }
    }
}
