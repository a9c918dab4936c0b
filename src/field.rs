//! The abstract field element (C1): an abstraction over real scalars and
//! dual/jet numbers, so the RK and Adams engines can be monomorphized over
//! either without runtime dispatch in the inner loop.

use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use num_traits::{One, Zero};

/// Baseline arithmetic every field element supports.
pub trait Scalar:
    Copy
    + Clone
    + Debug
    + PartialEq
    + PartialOrd
    + Zero
    + One
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + SubAssign
    + MulAssign
    + DivAssign
    + 'static
{
    fn from_f64(v: f64) -> Self;
    fn to_f64(&self) -> f64;
    fn abs(self) -> Self;
    fn powi(self, n: i32) -> Self;
    fn max(self, other: Self) -> Self;
    fn min(self, other: Self) -> Self;
    fn is_finite(&self) -> bool;
    fn infinity() -> Self;
}

/// Elementary transcendentals plus the `from_real`/`real`/`linear_combination`
/// bridge between a generic field and its underlying real scalar.
pub trait FieldElement: Scalar {
    fn sqrt(self) -> Self;
    fn sin(self) -> Self;
    fn cos(self) -> Self;
    fn tan(self) -> Self;
    fn asin(self) -> Self;
    fn acos(self) -> Self;
    fn atan(self) -> Self;
    fn atan2(self, other: Self) -> Self;
    fn exp(self) -> Self;
    fn log(self) -> Self;
    fn pow(self, n: Self) -> Self;

    /// Projection onto a plain `f64`, discarding any derivative tracks.
    fn real(&self) -> f64 {
        self.to_f64()
    }

    /// Lift a plain `f64` into this field.
    fn from_real(v: f64) -> Self {
        Self::from_f64(v)
    }

    /// Reciprocal; fails only when the real part of `self` is exactly zero.
    fn reciprocal(self) -> Option<Self> {
        if self.to_f64() == 0.0 {
            None
        } else {
            Some(Self::one() / self)
        }
    }

    /// Compensated dot product Σ aᵢ·bᵢ, at least double-double accurate for
    /// the `f64` instance (Dekker two-product + Neumaier summation).
    fn linear_combination(pairs: &[(Self, Self)]) -> Self;
}

/// Zero-sized handle exposing the field's distinguished elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct Field<F> {
    _marker: std::marker::PhantomData<F>,
}

impl<F: FieldElement> Field<F> {
    pub fn new() -> Self {
        Self {
            _marker: std::marker::PhantomData,
        }
    }

    pub fn zero(&self) -> F {
        F::zero()
    }

    pub fn one(&self) -> F {
        F::one()
    }
}

// ---------------------------------------------------------------------
// f64: the real field.
// ---------------------------------------------------------------------

impl Scalar for f64 {
    fn from_f64(v: f64) -> Self {
        v
    }
    fn to_f64(&self) -> f64 {
        *self
    }
    fn abs(self) -> Self {
        f64::abs(self)
    }
    fn powi(self, n: i32) -> Self {
        f64::powi(self, n)
    }
    fn max(self, other: Self) -> Self {
        f64::max(self, other)
    }
    fn min(self, other: Self) -> Self {
        f64::min(self, other)
    }
    fn is_finite(&self) -> bool {
        f64::is_finite(*self)
    }
    fn infinity() -> Self {
        f64::INFINITY
    }
}

/// Dekker's error-free two-product using `f64::mul_add` (hardware FMA where
/// available); `hi + lo` recovers `a * b` to double-double accuracy.
fn two_product(a: f64, b: f64) -> (f64, f64) {
    let hi = a * b;
    let lo = a.mul_add(b, -hi);
    (hi, lo)
}

impl FieldElement for f64 {
    fn sqrt(self) -> Self {
        f64::sqrt(self)
    }
    fn sin(self) -> Self {
        f64::sin(self)
    }
    fn cos(self) -> Self {
        f64::cos(self)
    }
    fn tan(self) -> Self {
        f64::tan(self)
    }
    fn asin(self) -> Self {
        f64::asin(self)
    }
    fn acos(self) -> Self {
        f64::acos(self)
    }
    fn atan(self) -> Self {
        f64::atan(self)
    }
    fn atan2(self, other: Self) -> Self {
        f64::atan2(self, other)
    }
    fn exp(self) -> Self {
        f64::exp(self)
    }
    fn log(self) -> Self {
        f64::ln(self)
    }
    fn pow(self, n: Self) -> Self {
        f64::powf(self, n)
    }

    fn linear_combination(pairs: &[(Self, Self)]) -> Self {
        // Neumaier-compensated summation of the Dekker two-products.
        let mut sum = 0.0f64;
        let mut comp = 0.0f64;
        for &(a, b) in pairs {
            let (hi, lo) = two_product(a, b);
            for term in [hi, lo] {
                let t = sum + term;
                if sum.abs() >= term.abs() {
                    comp += (sum - t) + term;
                } else {
                    comp += (term - t) + sum;
                }
                sum = t;
            }
        }
        sum + comp
    }
}

// ---------------------------------------------------------------------
// Dual1<f64>: first-order forward-mode dual number (one derivative track).
// ---------------------------------------------------------------------

/// A dual number carrying a value and a single derivative track, one of
/// the scalar-or-dual element types the field abstraction is designed
/// to support. Does not implement automatic differentiation of a user's RHS; it only
/// lets the *state* be carried through the integrator generically.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dual1 {
    pub value: f64,
    pub deriv: f64,
}

impl Dual1 {
    pub fn new(value: f64, deriv: f64) -> Self {
        Self { value, deriv }
    }

    pub fn constant(value: f64) -> Self {
        Self { value, deriv: 0.0 }
    }
}

impl Zero for Dual1 {
    fn zero() -> Self {
        Self::constant(0.0)
    }
    fn is_zero(&self) -> bool {
        self.value == 0.0 && self.deriv == 0.0
    }
}

impl One for Dual1 {
    fn one() -> Self {
        Self::constant(1.0)
    }
}

impl Add for Dual1 {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self::new(self.value + rhs.value, self.deriv + rhs.deriv)
    }
}
impl Sub for Dual1 {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.value - rhs.value, self.deriv - rhs.deriv)
    }
}
impl Mul for Dual1 {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Self::new(
            self.value * rhs.value,
            self.value * rhs.deriv + self.deriv * rhs.value,
        )
    }
}
impl Div for Dual1 {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        let inv = 1.0 / rhs.value;
        Self::new(
            self.value * inv,
            (self.deriv * rhs.value - self.value * rhs.deriv) * inv * inv,
        )
    }
}
impl Neg for Dual1 {
    type Output = Self;
    fn neg(self) -> Self {
        Self::new(-self.value, -self.deriv)
    }
}
impl AddAssign for Dual1 {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}
impl SubAssign for Dual1 {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}
impl MulAssign for Dual1 {
    fn mul_assign(&mut self, rhs: Self) {
        *self = *self * rhs;
    }
}
impl DivAssign for Dual1 {
    fn div_assign(&mut self, rhs: Self) {
        *self = *self / rhs;
    }
}
impl PartialOrd for Dual1 {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        self.value.partial_cmp(&other.value)
    }
}

impl Scalar for Dual1 {
    fn from_f64(v: f64) -> Self {
        Self::constant(v)
    }
    fn to_f64(&self) -> f64 {
        self.value
    }
    fn abs(self) -> Self {
        if self.value < 0.0 {
            -self
        } else {
            self
        }
    }
    fn powi(self, n: i32) -> Self {
        let value = self.value.powi(n);
        let deriv = (n as f64) * self.value.powi(n - 1) * self.deriv;
        Self::new(value, deriv)
    }
    fn max(self, other: Self) -> Self {
        if self.value >= other.value {
            self
        } else {
            other
        }
    }
    fn min(self, other: Self) -> Self {
        if self.value <= other.value {
            self
        } else {
            other
        }
    }
    fn is_finite(&self) -> bool {
        self.value.is_finite() && self.deriv.is_finite()
    }
    fn infinity() -> Self {
        Self::constant(f64::INFINITY)
    }
}

impl FieldElement for Dual1 {
    fn sqrt(self) -> Self {
        let value = self.value.sqrt();
        Self::new(value, self.deriv / (2.0 * value))
    }
    fn sin(self) -> Self {
        Self::new(self.value.sin(), self.deriv * self.value.cos())
    }
    fn cos(self) -> Self {
        Self::new(self.value.cos(), -self.deriv * self.value.sin())
    }
    fn tan(self) -> Self {
        let c = self.value.cos();
        Self::new(self.value.tan(), self.deriv / (c * c))
    }
    fn asin(self) -> Self {
        Self::new(
            self.value.asin(),
            self.deriv / (1.0 - self.value * self.value).sqrt(),
        )
    }
    fn acos(self) -> Self {
        Self::new(
            self.value.acos(),
            -self.deriv / (1.0 - self.value * self.value).sqrt(),
        )
    }
    fn atan(self) -> Self {
        Self::new(self.value.atan(), self.deriv / (1.0 + self.value * self.value))
    }
    fn atan2(self, other: Self) -> Self {
        let denom = self.value * self.value + other.value * other.value;
        let value = self.value.atan2(other.value);
        let deriv = (self.deriv * other.value - other.deriv * self.value) / denom;
        Self::new(value, deriv)
    }
    fn exp(self) -> Self {
        let value = self.value.exp();
        Self::new(value, self.deriv * value)
    }
    fn log(self) -> Self {
        Self::new(self.value.ln(), self.deriv / self.value)
    }
    fn pow(self, n: Self) -> Self {
        let value = self.value.powf(n.value);
        // d/dx (x^n) treating n's derivative track via the general rule
        // d(x^n) = n * x^(n-1) * dx + x^n * ln(x) * dn
        let term1 = n.value * self.value.powf(n.value - 1.0) * self.deriv;
        let term2 = if self.value > 0.0 {
            value * self.value.ln() * n.deriv
        } else {
            0.0
        };
        Self::new(value, term1 + term2)
    }

    fn linear_combination(pairs: &[(Self, Self)]) -> Self {
        let mut acc = Self::zero();
        for &(a, b) in pairs {
            acc += a * b;
        }
        acc
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linear_combination_is_more_accurate_than_naive_sum() {
        let a = [1.0, 1e16, 1.0, -1e16];
        let b = [1.0, 1.0, 1.0, 1.0];
        let pairs: Vec<(f64, f64)> = a.iter().zip(b.iter()).map(|(&x, &y)| (x, y)).collect();
        let compensated = f64::linear_combination(&pairs);
        // exact answer is 3.0; naive left-to-right summation loses it to
        // rounding because 1e16 swamps the 1.0 terms.
        assert!((compensated - 3.0).abs() < 1e-6);
    }

    #[test]
    fn dual_tracks_derivative_through_product_rule() {
        let x = Dual1::new(3.0, 1.0);
        let y = x * x; // y = x^2, dy/dx = 2x
        assert!((y.value - 9.0).abs() < 1e-12);
        assert!((y.deriv - 6.0).abs() < 1e-12);
    }

    #[test]
    fn dual_sin_cos_chain_rule() {
        let x = Dual1::new(0.5, 1.0);
        let y = x.sin();
        assert!((y.value - 0.5f64.sin()).abs() < 1e-12);
        assert!((y.deriv - 0.5f64.cos()).abs() < 1e-12);
    }

    #[test]
    fn reciprocal_fails_on_zero_real_part() {
        assert!(0.0f64.reciprocal().is_none());
        assert!(2.0f64.reciprocal().is_some());
    }
}
