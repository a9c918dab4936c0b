//! The Nordsieck transformer (C7): exact-rational construction of the
//! per-order transform matrices, cached process-wide, plus the
//! least-squares history initializer the Adams prologue calls once.
//!
//! The transform matrices themselves (`P`, `c1`, `update`) are built over
//! `num_rational::Ratio<num_bigint::BigInt>` and rounded to `f64` once.
//! The history initializer's design
//! matrix is real-valued (it depends only on sample times), so it is
//! solved with the plain `f64` QR in `linalg`; a generic `F` state is
//! projected down with `F::to_f64()` before the solve and lifted back
//! with `F::from_f64()` after — the prologue runs once per integration,
//! so this does not cost the per-step generic-field guarantee anything.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};
use std::sync::Arc;

use num_bigint::BigInt;
use num_rational::Ratio;
use num_traits::{ToPrimitive, Zero, One};

use crate::errors::{OdeError, OdeResult};
use crate::field::FieldElement;
use crate::linalg::{solve_least_squares, DMat, DVec};

type Rat = Ratio<BigInt>;

#[derive(Debug)]
pub struct NordsieckTransformer {
    order: usize,
    pub c1: Vec<f64>,
    pub update: Vec<Vec<f64>>,
}

fn ratio_to_f64(r: &Rat) -> f64 {
    r.numer().to_f64().unwrap() / r.denom().to_f64().unwrap()
}

fn bigint_pow(base: &BigInt, exponent: u32) -> BigInt {
    let mut result = BigInt::one();
    let mut b = base.clone();
    let mut e = exponent;
    while e > 0 {
        if e & 1 == 1 {
            result = &result * &b;
        }
        b = &b * &b;
        e >>= 1;
    }
    result
}

/// `P[r][c] = (c+2) * (-(r+1))^(c+1)`, a `(k-1)x(k-1)` matrix of exact
/// signed integers.
fn build_p(size: usize) -> Vec<Vec<Rat>> {
    let mut p = vec![vec![Rat::zero(); size]; size];
    for r in 0..size {
        let base = BigInt::from(-((r as i64) + 1));
        for c in 0..size {
            let exponent = (c + 1) as u32;
            let coefficient = BigInt::from((c + 2) as i64);
            p[r][c] = Rat::from(coefficient * bigint_pow(&base, exponent));
        }
    }
    p
}

/// Gauss-Jordan elimination over exact rationals; `size` is small
/// (`nSteps - 1`, typically under ten), so no pivoting strategy beyond
/// "first nonzero" is needed.
fn invert(matrix: &[Vec<Rat>]) -> Vec<Vec<Rat>> {
    let n = matrix.len();
    let mut a: Vec<Vec<Rat>> = matrix.to_vec();
    let mut inv: Vec<Vec<Rat>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { Rat::one() } else { Rat::zero() }).collect())
        .collect();

    for col in 0..n {
        let pivot_row = (col..n).find(|&r| !a[r][col].is_zero()).expect("singular Nordsieck P matrix");
        if pivot_row != col {
            a.swap(pivot_row, col);
            inv.swap(pivot_row, col);
        }
        let pivot = a[col][col].clone();
        for j in 0..n {
            a[col][j] = &a[col][j] / &pivot;
            inv[col][j] = &inv[col][j] / &pivot;
        }
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = a[row][col].clone();
            if factor.is_zero() {
                continue;
            }
            for j in 0..n {
                let sub_a = &factor * &a[col][j];
                a[row][j] = &a[row][j] - &sub_a;
                let sub_inv = &factor * &inv[col][j];
                inv[row][j] = &inv[row][j] - &sub_inv;
            }
        }
    }
    inv
}

fn mat_vec(m: &[Vec<Rat>], v: &[Rat]) -> Vec<Rat> {
    m.iter()
        .map(|row| row.iter().zip(v).map(|(a, b)| a * b).fold(Rat::zero(), |acc, x| acc + x))
        .collect()
}

fn mat_mat(m: &[Vec<Rat>], n: &[Vec<Rat>]) -> Vec<Vec<Rat>> {
    let rows = m.len();
    let cols = n[0].len();
    let inner = n.len();
    let mut out = vec![vec![Rat::zero(); cols]; rows];
    for i in 0..rows {
        for k in 0..inner {
            if m[i][k].is_zero() {
                continue;
            }
            for j in 0..cols {
                out[i][j] = &out[i][j] + &m[i][k] * &n[k][j];
            }
        }
    }
    out
}

impl NordsieckTransformer {
    fn build(order: usize) -> Self {
        let size = order - 1;
        let p = build_p(size);
        let p_inv = invert(&p);

        let u: Vec<Rat> = vec![Rat::one(); size];
        let c1: Vec<f64> = mat_vec(&p_inv, &u).iter().map(ratio_to_f64).collect();

        let mut shifted = vec![vec![Rat::zero(); size]; size];
        for r in 1..size {
            shifted[r] = p[r - 1].clone();
        }
        let update_exact = mat_mat(&p_inv, &shifted);
        let update: Vec<Vec<f64>> = update_exact
            .iter()
            .map(|row| row.iter().map(ratio_to_f64).collect())
            .collect();

        Self { order, c1, update }
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// `update_phase1(R) = update * R`, a plain matrix product.
    pub fn update_phase1<F: FieldElement>(&self, r: &DMat<F>) -> DMat<F> {
        let rows = self.update.len();
        let cols = r.ncols();
        let mut out = DMat::zeros(rows, cols);
        for i in 0..rows {
            let mut acc = DVec::zeros(cols);
            for (j, weight) in self.update[i].iter().enumerate() {
                acc.axpy(F::from_f64(*weight), &r.row(j));
            }
            out.set_row(i, &acc);
        }
        out
    }

    /// `update_phase2`: for each row `i`, add `c1[i] * (s_start - s_end)`.
    pub fn update_phase2<F: FieldElement>(&self, r: &mut DMat<F>, s_start: &DVec<F>, s_end: &DVec<F>) {
        let delta = s_start - s_end;
        for i in 0..self.c1.len() {
            let mut row = r.row(i);
            row.axpy(F::from_f64(self.c1[i]), &delta);
            r.set_row(i, &row);
        }
    }
}

static TRANSFORMER_CACHE: OnceLock<Mutex<HashMap<usize, Arc<NordsieckTransformer>>>> = OnceLock::new();

/// Fetch (building and caching if necessary) the transformer for a
/// history of `order` steps (`nSteps`).
pub fn transformer(order: usize) -> OdeResult<Arc<NordsieckTransformer>> {
    if order <= 1 {
        return Err(OdeError::NumberIsTooSmall);
    }
    let cache = TRANSFORMER_CACHE.get_or_init(|| Mutex::new(HashMap::new()));
    let mut guard = cache.lock().expect("Nordsieck transformer cache poisoned");
    let entry = guard
        .entry(order)
        .or_insert_with(|| Arc::new(NordsieckTransformer::build(order)))
        .clone();
    Ok(entry)
}

/// Builds the initial higher-order Nordsieck block `R` (shape
/// `(order-1) x dim`) from `order` history samples via a Taylor
/// least-squares system.
pub fn initialize_high_order_derivatives<F: FieldElement>(
    order: usize,
    h: F,
    t: &[F],
    y: &[DVec<F>],
    y_dot: &[DVec<F>],
) -> DMat<F> {
    let m = t.len();
    let k_minus_1 = order - 1;
    let dim = y[0].len();
    let h64 = h.to_f64();

    let mut a = DMat::<f64>::zeros(2 * (m - 1), k_minus_1);
    let mut b = DMat::<f64>::zeros(2 * (m - 1), dim);

    // Nordsieck components s_2..s_k (column c = j - 2) satisfy, for each
    // history sample at offset d_i = t_i - t_0:
    //   value row:      sum_c (d_i/h)^(c+2)                 * s_{c+2} = y_i - y_0 - d_i*yDot_0
    //   derivative row: sum_c (c+2)/h * (d_i/h)^(c+1)        * s_{c+2} = yDot_i - yDot_0
    for i in 1..m {
        let d_i = t[i].to_f64() - t[0].to_f64();
        let ratio = d_i / h64;

        let row_state = 2 * (i - 1);
        let row_deriv = row_state + 1;

        for j in 0..k_minus_1 {
            let order_j = (j + 2) as i32;
            a[(row_state, j)] = ratio.powi(order_j);
            a[(row_deriv, j)] = (order_j as f64) / h64 * ratio.powi(order_j - 1);
        }

        for col in 0..dim {
            let y0 = y[0][col].to_f64();
            let yd0 = y_dot[0][col].to_f64();
            b[(row_state, col)] = y[i][col].to_f64() - y0 - d_i * yd0;
            b[(row_deriv, col)] = y_dot[i][col].to_f64() - yd0;
        }
    }

    let solved = solve_least_squares(&a, &b);
    let mut r = DMat::<F>::zeros(k_minus_1, dim);
    for i in 0..k_minus_1 {
        let mut row = DVec::zeros(dim);
        for col in 0..dim {
            row[col] = F::from_f64(solved[(i, col)]);
        }
        r.set_row(i, &row);
    }
    r
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transformer_rejects_orders_at_or_below_one() {
        assert!(matches!(transformer(1), Err(OdeError::NumberIsTooSmall)));
    }

    #[test]
    fn transformer_is_cached_across_calls() {
        let a = transformer(4).unwrap();
        let b = transformer(4).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn c1_and_update_have_expected_shape() {
        let t = transformer(5).unwrap();
        assert_eq!(t.c1.len(), 4);
        assert_eq!(t.update.len(), 4);
        assert_eq!(t.update[0].len(), 4);
    }

    #[test]
    fn phase1_then_phase2_reproduces_a_linear_polynomial() {
        // y(t) = 1 + 2t is degree 1; with order=3 (k-1=2 history rows)
        // the Nordsieck higher-order block should stay (numerically)
        // close to zero after one phase1/phase2 step, since the true
        // higher derivatives of a linear function vanish.
        let order = 3;
        let h = 0.1_f64;
        let t0 = 0.0_f64;
        let samples_t = [t0, t0 + h, t0 + 2.0 * h];
        let y: Vec<DVec<f64>> = samples_t.iter().map(|&ti| DVec::from_vec(vec![1.0 + 2.0 * ti])).collect();
        let y_dot: Vec<DVec<f64>> = samples_t.iter().map(|_| DVec::from_vec(vec![2.0])).collect();

        let r = initialize_high_order_derivatives(order, h, &samples_t, &y, &y_dot);
        for i in 0..r.nrows() {
            assert!(r[(i, 0)].abs() < 1e-6, "row {i}: {}", r[(i, 0)]);
        }
    }
}
