//! Small generic n-vector/matrix helpers used internally by the RK and
//! Adams engines (see DESIGN.md for the `nalgebra`-backed design this
//! replaces): generic over `F: FieldElement` rather than fixed to `f64`,
//! so the dual-number field path works without a second newtype layer.

use std::ops::{Add, AddAssign, Index, IndexMut, Mul, Sub, SubAssign};

use crate::field::FieldElement;

/// A dense vector in ℝⁿ (or the field's analogue of it).
#[derive(Debug, Clone, PartialEq)]
pub struct DVec<F> {
    data: Vec<F>,
}

impl<F: FieldElement> DVec<F> {
    pub fn zeros(n: usize) -> Self {
        Self {
            data: vec![F::zero(); n],
        }
    }

    pub fn from_element(n: usize, value: F) -> Self {
        Self {
            data: vec![value; n],
        }
    }

    pub fn from_vec(data: Vec<F>) -> Self {
        Self { data }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[F] {
        &self.data
    }

    pub fn as_mut_slice(&mut self) -> &mut [F] {
        &mut self.data
    }

    pub fn iter(&self) -> std::slice::Iter<'_, F> {
        self.data.iter()
    }

    /// `self += alpha * x`
    pub fn axpy(&mut self, alpha: F, x: &Self) {
        for (yi, &xi) in self.data.iter_mut().zip(x.data.iter()) {
            *yi += alpha * xi;
        }
    }

    pub fn dot(&self, other: &Self) -> F {
        let pairs: Vec<(F, F)> = self
            .data
            .iter()
            .zip(other.data.iter())
            .map(|(&a, &b)| (a, b))
            .collect();
        F::linear_combination(&pairs)
    }

    pub fn abs(&self) -> Self {
        Self {
            data: self.data.iter().map(|&x| x.abs()).collect(),
        }
    }

    pub fn component_div(&self, other: &Self) -> Self {
        Self {
            data: self
                .data
                .iter()
                .zip(other.data.iter())
                .map(|(&a, &b)| a / b)
                .collect(),
        }
    }

    pub fn scale(&self, s: F) -> Self {
        Self {
            data: self.data.iter().map(|&x| x * s).collect(),
        }
    }

    /// L1 norm Σ|xᵢ|.
    pub fn norm_l1(&self) -> F {
        self.data.iter().fold(F::zero(), |acc, &x| acc + x.abs())
    }

    /// L2 norm √(Σxᵢ²).
    pub fn norm_l2(&self) -> F {
        self.norm_l2_squared().sqrt()
    }

    pub fn norm_l2_squared(&self) -> F {
        self.dot(self)
    }

    /// L∞ norm max|xᵢ|.
    pub fn norm_linf(&self) -> F {
        self.data
            .iter()
            .fold(F::zero(), |acc, &x| acc.max(x.abs()))
    }

    /// RMS error norm: √((1/n) Σ xᵢ²), the normalization the step
    /// controller and error estimators use throughout the crate.
    pub fn rms_norm(&self) -> F {
        if self.data.is_empty() {
            return F::zero();
        }
        let n = F::from_f64(self.data.len() as f64);
        (self.norm_l2_squared() / n).sqrt()
    }
}

impl<F: FieldElement> Index<usize> for DVec<F> {
    type Output = F;
    fn index(&self, i: usize) -> &F {
        &self.data[i]
    }
}
impl<F: FieldElement> IndexMut<usize> for DVec<F> {
    fn index_mut(&mut self, i: usize) -> &mut F {
        &mut self.data[i]
    }
}

impl<F: FieldElement> Add for &DVec<F> {
    type Output = DVec<F>;
    fn add(self, rhs: &DVec<F>) -> DVec<F> {
        DVec {
            data: self
                .data
                .iter()
                .zip(rhs.data.iter())
                .map(|(&a, &b)| a + b)
                .collect(),
        }
    }
}
impl<F: FieldElement> Sub for &DVec<F> {
    type Output = DVec<F>;
    fn sub(self, rhs: &DVec<F>) -> DVec<F> {
        DVec {
            data: self
                .data
                .iter()
                .zip(rhs.data.iter())
                .map(|(&a, &b)| a - b)
                .collect(),
        }
    }
}
impl<F: FieldElement> AddAssign<&DVec<F>> for DVec<F> {
    fn add_assign(&mut self, rhs: &DVec<F>) {
        for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a += b;
        }
    }
}
impl<F: FieldElement> SubAssign<&DVec<F>> for DVec<F> {
    fn sub_assign(&mut self, rhs: &DVec<F>) {
        for (a, &b) in self.data.iter_mut().zip(rhs.data.iter()) {
            *a -= b;
        }
    }
}
impl<F: FieldElement> Mul<F> for &DVec<F> {
    type Output = DVec<F>;
    fn mul(self, rhs: F) -> DVec<F> {
        self.scale(rhs)
    }
}

/// A dense row-major matrix, used for the Nordsieck `higherOrder` block and
/// the Nordsieck transform matrices (`P`, `update`).
#[derive(Debug, Clone, PartialEq)]
pub struct DMat<F> {
    rows: usize,
    cols: usize,
    data: Vec<F>,
}

impl<F: FieldElement> DMat<F> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            data: vec![F::zero(); rows * cols],
        }
    }

    pub fn nrows(&self) -> usize {
        self.rows
    }

    pub fn ncols(&self) -> usize {
        self.cols
    }

    pub fn row(&self, i: usize) -> DVec<F> {
        DVec::from_vec(self.data[i * self.cols..(i + 1) * self.cols].to_vec())
    }

    pub fn set_row(&mut self, i: usize, row: &DVec<F>) {
        assert_eq!(row.len(), self.cols);
        self.data[i * self.cols..(i + 1) * self.cols].copy_from_slice(row.as_slice());
    }

    pub fn add_to_row(&mut self, i: usize, row: &DVec<F>) {
        for (dst, &src) in self.data[i * self.cols..(i + 1) * self.cols]
            .iter_mut()
            .zip(row.as_slice())
        {
            *dst += src;
        }
    }

    /// y = self * x  (self is rows x cols, x has length cols)
    pub fn mat_vec_mul(&self, x: &DVec<F>) -> DVec<F> {
        let mut out = DVec::zeros(self.rows);
        for i in 0..self.rows {
            let row = self.row(i);
            out[i] = row.dot(x);
        }
        out
    }

    /// self * other, both dense matrices with compatible shapes.
    pub fn mat_mat_mul(&self, other: &DMat<F>) -> DMat<F> {
        assert_eq!(self.cols, other.rows);
        let mut out = DMat::zeros(self.rows, other.cols);
        for i in 0..self.rows {
            for j in 0..other.cols {
                let mut acc = F::zero();
                for k in 0..self.cols {
                    acc += self[(i, k)] * other[(k, j)];
                }
                out[(i, j)] = acc;
            }
        }
        out
    }
}

impl<F: FieldElement> Index<(usize, usize)> for DMat<F> {
    type Output = F;
    fn index(&self, (i, j): (usize, usize)) -> &F {
        &self.data[i * self.cols + j]
    }
}
impl<F: FieldElement> IndexMut<(usize, usize)> for DMat<F> {
    fn index_mut(&mut self, (i, j): (usize, usize)) -> &mut F {
        &mut self.data[i * self.cols + j]
    }
}

/// Solve `A x = b` in the least-squares sense via Householder QR,
/// concretely over `f64` (the Nordsieck history-initialization design
/// matrix is always built from real sample times/states).
pub fn solve_least_squares(a: &DMat<f64>, b: &DMat<f64>) -> DMat<f64> {
    let m = a.nrows();
    let n = a.ncols();
    assert!(m >= n, "least-squares solve requires at least as many rows as columns");
    assert_eq!(b.nrows(), m);

    let mut r = a.clone();
    let mut qtb = b.clone();
    let rhs_cols = b.ncols();

    for k in 0..n {
        // Householder reflection zeroing column k below the diagonal.
        let mut norm_x = 0.0f64;
        for i in k..m {
            norm_x += r[(i, k)] * r[(i, k)];
        }
        norm_x = norm_x.sqrt();
        if norm_x == 0.0 {
            continue;
        }
        let alpha = if r[(k, k)] >= 0.0 { -norm_x } else { norm_x };
        let mut v = vec![0.0f64; m];
        v[k] = r[(k, k)] - alpha;
        for i in (k + 1)..m {
            v[i] = r[(i, k)];
        }
        let v_norm_sq: f64 = v[k..m].iter().map(|x| x * x).sum();
        if v_norm_sq == 0.0 {
            continue;
        }

        // Apply H = I - 2vv^T/(v^Tv) to R's remaining columns.
        for j in k..n {
            let mut dot = 0.0f64;
            for i in k..m {
                dot += v[i] * r[(i, j)];
            }
            let factor = 2.0 * dot / v_norm_sq;
            for i in k..m {
                r[(i, j)] -= factor * v[i];
            }
        }
        // Apply H to the RHS.
        for j in 0..rhs_cols {
            let mut dot = 0.0f64;
            for i in k..m {
                dot += v[i] * qtb[(i, j)];
            }
            let factor = 2.0 * dot / v_norm_sq;
            for i in k..m {
                qtb[(i, j)] -= factor * v[i];
            }
        }
    }

    // Back-substitution on the n x n upper-triangular block of R.
    let mut x = DMat::zeros(n, rhs_cols);
    for col in 0..rhs_cols {
        for i in (0..n).rev() {
            let mut acc = qtb[(i, col)];
            for j in (i + 1)..n {
                acc -= r[(i, j)] * x[(j, col)];
            }
            x[(i, col)] = acc / r[(i, i)];
        }
    }
    x
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rms_norm_of_unit_vector_is_one_over_sqrt_n() {
        let v: DVec<f64> = DVec::from_element(4, 1.0);
        assert!((v.rms_norm() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn mat_vec_mul_identity() {
        let mut m: DMat<f64> = DMat::zeros(2, 2);
        m[(0, 0)] = 1.0;
        m[(1, 1)] = 1.0;
        let x = DVec::from_vec(vec![3.0, 4.0]);
        let y = m.mat_vec_mul(&x);
        assert_eq!(y[0], 3.0);
        assert_eq!(y[1], 4.0);
    }

    #[test]
    fn least_squares_exact_fit_recovers_line() {
        // y = 2 + 3x sampled exactly at x = 0, 1, 2
        let mut a = DMat::zeros(3, 2);
        let mut b = DMat::zeros(3, 1);
        for (i, &x) in [0.0, 1.0, 2.0].iter().enumerate() {
            a[(i, 0)] = 1.0;
            a[(i, 1)] = x;
            b[(i, 0)] = 2.0 + 3.0 * x;
        }
        let coeffs = solve_least_squares(&a, &b);
        assert!((coeffs[(0, 0)] - 2.0).abs() < 1e-9);
        assert!((coeffs[(1, 0)] - 3.0).abs() < 1e-9);
    }
}
