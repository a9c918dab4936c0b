//! The 3-D Euclidean vector type (§3), consumed only by `Rotation<F>` and
//! its own property tests — never by the ODE engine itself.

use crate::errors::{OdeError, OdeResult};
use crate::field::FieldElement;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vector3<F> {
    pub x: F,
    pub y: F,
    pub z: F,
}

impl<F: FieldElement> Vector3<F> {
    pub fn new(x: F, y: F, z: F) -> Self {
        Self { x, y, z }
    }

    pub fn zero() -> Self {
        Self::new(F::zero(), F::zero(), F::zero())
    }

    pub fn norm1(&self) -> F {
        self.x.abs() + self.y.abs() + self.z.abs()
    }

    pub fn norm2_squared(&self) -> F {
        F::linear_combination(&[(self.x, self.x), (self.y, self.y), (self.z, self.z)])
    }

    pub fn norm2(&self) -> F {
        self.norm2_squared().sqrt()
    }

    pub fn norm_inf(&self) -> F {
        self.x.abs().max(self.y.abs()).max(self.z.abs())
    }

    pub fn azimuth(&self) -> F {
        self.y.atan2(self.x)
    }

    pub fn elevation(&self) -> OdeResult<F> {
        let n = self.norm2();
        let ratio = (self.z / n).max(F::from_f64(-1.0)).min(F::from_f64(1.0));
        if n.to_f64() == 0.0 {
            return Err(OdeError::ZeroNorm);
        }
        Ok(ratio.asin())
    }

    pub fn dot(&self, other: &Self) -> F {
        F::linear_combination(&[
            (self.x, other.x),
            (self.y, other.y),
            (self.z, other.z),
        ])
    }

    pub fn cross(&self, other: &Self) -> Self {
        Self::new(
            self.y * other.z - self.z * other.y,
            self.z * other.x - self.x * other.z,
            self.x * other.y - self.y * other.x,
        )
    }

    pub fn scale(&self, s: F) -> Self {
        Self::new(self.x * s, self.y * s, self.z * s)
    }

    pub fn add(&self, other: &Self) -> Self {
        Self::new(self.x + other.x, self.y + other.y, self.z + other.z)
    }

    pub fn sub(&self, other: &Self) -> Self {
        Self::new(self.x - other.x, self.y - other.y, self.z - other.z)
    }

    pub fn distance(&self, other: &Self) -> F {
        self.sub(other).norm2()
    }

    pub fn normalize(&self) -> OdeResult<Self> {
        let n = self.norm2();
        if n.to_f64() == 0.0 {
            return Err(OdeError::ZeroNorm);
        }
        Ok(self.scale(F::one() / n))
    }

    /// An arbitrary but stable unit vector orthogonal to `self`, used as the
    /// rotation axis for the degenerate antiparallel case in
    /// `Rotation::from_two_vectors`.
    pub fn orthogonal(&self) -> OdeResult<Self> {
        let threshold = F::from_f64(0.6) * self.norm2();
        if threshold.to_f64() == 0.0 {
            return Err(OdeError::ZeroNorm);
        }
        let (inv, candidate) = if self.x.abs() <= threshold {
            let inv = F::one() / (self.y * self.y + self.z * self.z).sqrt();
            (inv, Self::new(F::zero(), inv * self.z, -inv * self.y))
        } else if self.y.abs() <= threshold {
            let inv = F::one() / (self.x * self.x + self.z * self.z).sqrt();
            (inv, Self::new(-inv * self.z, F::zero(), inv * self.x))
        } else {
            let inv = F::one() / (self.x * self.x + self.y * self.y).sqrt();
            (inv, Self::new(inv * self.y, -inv * self.x, F::zero()))
        };
        let _ = inv;
        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orthogonal_is_perpendicular_and_unit() {
        let v = Vector3::new(1.0f64, 2.0, 3.0);
        let o = v.orthogonal().unwrap();
        assert!(v.dot(&o).abs() < 1e-12);
        assert!((o.norm2() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn cross_dot_is_zero() {
        let a = Vector3::new(1.0f64, 0.0, 0.0);
        let b = Vector3::new(0.0f64, 1.0, 0.0);
        let c = a.cross(&b);
        assert!((c.z - 1.0).abs() < 1e-12);
        assert!(a.dot(&c).abs() < 1e-12);
        assert!(b.dot(&c).abs() < 1e-12);
    }

    #[test]
    fn azimuth_elevation_roundtrip() {
        let v = Vector3::new(1.0f64, 1.0, 1.0).normalize().unwrap();
        let az = v.azimuth();
        let el = v.elevation().unwrap();
        let recon = Vector3::new(el.cos() * az.cos(), el.cos() * az.sin(), el.sin());
        assert!(v.distance(&recon) < 1e-12);
    }
}
