//! The quaternion rotation boundary type. Consumed by nothing in the ODE
//! engine; it exists only as a documented external collaborator and its
//! own property tests (normalization, composition, and orthogonalization
//! invariants).

use crate::errors::{OdeError, OdeResult, RotationMatrixError};
use crate::field::FieldElement;
use crate::geometry::vector3::Vector3;

/// A unit quaternion (q0, q1, q2, q3), q0²+q1²+q2²+q3² = 1.
/// `(q0,q1,q2,q3)` and `(-q0,-q1,-q2,-q3)` represent the same rotation.
#[derive(Debug, Clone, Copy)]
pub struct Rotation<F> {
    q0: F,
    q1: F,
    q2: F,
    q3: F,
}

/// One of the three coordinate axes, used by `RotationOrder`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    fn unit<F: FieldElement>(self) -> Vector3<F> {
        match self {
            Axis::X => Vector3::new(F::one(), F::zero(), F::zero()),
            Axis::Y => Vector3::new(F::zero(), F::one(), F::zero()),
            Axis::Z => Vector3::new(F::zero(), F::zero(), F::one()),
        }
    }
}

fn component<F: FieldElement>(v: &Vector3<F>, axis: Axis) -> F {
    match axis {
        Axis::X => v.x,
        Axis::Y => v.y,
        Axis::Z => v.z,
    }
}

/// The twelve Cardan (all axes distinct) / Euler (first axis = third axis)
/// angle decomposition orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationOrder {
    XYZ,
    XZY,
    YXZ,
    YZX,
    ZXY,
    ZYX,
    XYX,
    XZX,
    YXY,
    YZY,
    ZXZ,
    ZYZ,
}

impl RotationOrder {
    fn axes(self) -> (Axis, Axis, Axis) {
        use Axis::*;
        match self {
            RotationOrder::XYZ => (X, Y, Z),
            RotationOrder::XZY => (X, Z, Y),
            RotationOrder::YXZ => (Y, X, Z),
            RotationOrder::YZX => (Y, Z, X),
            RotationOrder::ZXY => (Z, X, Y),
            RotationOrder::ZYX => (Z, Y, X),
            RotationOrder::XYX => (X, Y, X),
            RotationOrder::XZX => (X, Z, X),
            RotationOrder::YXY => (Y, X, Y),
            RotationOrder::YZY => (Y, Z, Y),
            RotationOrder::ZXZ => (Z, X, Z),
            RotationOrder::ZYZ => (Z, Y, Z),
        }
    }

    fn is_cardan(self) -> bool {
        let (a1, _, a3) = self.axes();
        a1 != a3
    }

    /// The axis not used by a symmetric (Euler) ordering's two distinct axes.
    fn third_axis(i: Axis, j: Axis) -> Axis {
        use Axis::*;
        match (i, j) {
            (X, Y) | (Y, X) => Z,
            (Y, Z) | (Z, Y) => X,
            (Z, X) | (X, Z) => Y,
            _ => unreachable!("Euler ordering must use two distinct axes"),
        }
    }
}

/// Levi-Civita symbol for the permutation (a, b, c) of {X, Y, Z}; the sign
/// of a Cartesian triple used throughout the Cardan/Euler extraction
/// formulas below. Caller guarantees a, b, c are pairwise distinct.
fn levi_civita(a: Axis, b: Axis, c: Axis) -> f64 {
    let (a, b, c) = (a.index() as i32, b.index() as i32, c.index() as i32);
    let product = (b - a) * (c - b) * (c - a);
    if product > 0 {
        1.0
    } else {
        -1.0
    }
}

const SINGULARITY_THRESHOLD: f64 = 1.0 - 1e-10;

impl<F: FieldElement> Rotation<F> {
    pub fn identity() -> Self {
        Self {
            q0: F::one(),
            q1: F::zero(),
            q2: F::zero(),
            q3: F::zero(),
        }
    }

    /// Construct directly from quaternion components. `needs_normalization
    /// = false` is a caller promise that q0²+q1²+q2²+q3² = 1 already.
    pub fn from_quaternion(q0: F, q1: F, q2: F, q3: F, needs_normalization: bool) -> Self {
        if !needs_normalization {
            return Self { q0, q1, q2, q3 };
        }
        let norm = (q0 * q0 + q1 * q1 + q2 * q2 + q3 * q3).sqrt();
        let inv = F::one() / norm;
        Self {
            q0: q0 * inv,
            q1: q1 * inv,
            q2: q2 * inv,
            q3: q3 * inv,
        }
    }

    /// Rotation of `angle` about `axis`, right-hand rule. Sign convention:
    /// the stored quaternion is `(cos(-θ/2), (sin(-θ/2)/‖axis‖)·axis)`.
    pub fn from_axis_angle(axis: &Vector3<F>, angle: F) -> OdeResult<Self> {
        let norm = axis.norm2();
        if norm.to_f64() == 0.0 {
            return Err(OdeError::ZeroNorm);
        }
        let half = angle * F::from_f64(-0.5);
        let q0 = half.cos();
        let scale = half.sin() / norm;
        Ok(Self {
            q0,
            q1: scale * axis.x,
            q2: scale * axis.y,
            q3: scale * axis.z,
        })
    }

    /// Elemental rotation about a named axis, standard (non-negated) sign
    /// convention: `q = (cos(θ/2), sin(θ/2)·axis)`. Internal helper for
    /// `from_cardan_euler`/`get_angles`, kept separate from
    /// `from_axis_angle`'s spec-mandated sign flip.
    fn elemental(axis: Axis, angle: F) -> Self {
        let half = angle * F::from_f64(0.5);
        let (s0, s1, s2, s3) = match axis {
            Axis::X => (half.cos(), half.sin(), F::zero(), F::zero()),
            Axis::Y => (half.cos(), F::zero(), half.sin(), F::zero()),
            Axis::Z => (half.cos(), F::zero(), F::zero(), half.sin()),
        };
        Self {
            q0: s0,
            q1: s1,
            q2: s2,
            q3: s3,
        }
    }

    /// Shortest-angle rotation mapping `u` onto `v`.
    pub fn from_two_vectors(u: &Vector3<F>, v: &Vector3<F>) -> OdeResult<Self> {
        let norm_sq_u = u.norm2_squared();
        let norm_sq_v = v.norm2_squared();
        if norm_sq_u.to_f64() == 0.0 || norm_sq_v.to_f64() == 0.0 {
            return Err(OdeError::ZeroNorm);
        }
        let dot = u.dot(v);
        let threshold = F::from_f64(2e-15 - 1.0) * (norm_sq_u * norm_sq_v).sqrt();
        if dot.to_f64() < threshold.to_f64() {
            // antiparallel: pi-rotation about an arbitrary axis orthogonal to u.
            let unit_u = u.normalize()?;
            let axis = unit_u.orthogonal()?;
            return Ok(Self {
                q0: F::zero(),
                q1: axis.x,
                q2: axis.y,
                q3: axis.z,
            });
        }
        let cross = u.cross(v);
        let q0 = (norm_sq_u * norm_sq_v).sqrt() + dot;
        Ok(Self::from_quaternion(q0, cross.x, cross.y, cross.z, true))
    }

    /// Rotation mapping the orthonormalized frame built from `(u1, u2)`
    /// onto the orthonormalized frame built from `(v1, v2)`.
    pub fn from_two_pairs(
        u1: &Vector3<F>,
        u2: &Vector3<F>,
        v1: &Vector3<F>,
        v2: &Vector3<F>,
    ) -> OdeResult<Self> {
        let e1 = u1.normalize()?;
        let e2_raw = u2.sub(&e1.scale(u2.dot(&e1)));
        let e2 = e2_raw.normalize()?;
        let e3 = e1.cross(&e2);

        let f1 = v1.normalize()?;
        let f2_raw = v2.sub(&f1.scale(v2.dot(&f1)));
        let f2 = f2_raw.normalize()?;
        let f3 = f1.cross(&f2);

        // R = f1 (x) e1 + f2 (x) e2 + f3 (x) e3 (sum of outer products),
        // already orthonormal by construction, so it needs no Björck pass.
        let m = [
            [
                f1.x * e1.x + f2.x * e2.x + f3.x * e3.x,
                f1.x * e1.y + f2.x * e2.y + f3.x * e3.y,
                f1.x * e1.z + f2.x * e2.z + f3.x * e3.z,
            ],
            [
                f1.y * e1.x + f2.y * e2.x + f3.y * e3.x,
                f1.y * e1.y + f2.y * e2.y + f3.y * e3.y,
                f1.y * e1.z + f2.y * e2.z + f3.y * e3.z,
            ],
            [
                f1.z * e1.x + f2.z * e2.x + f3.z * e3.x,
                f1.z * e1.y + f2.z * e2.y + f3.z * e3.y,
                f1.z * e1.z + f2.z * e2.z + f3.z * e3.z,
            ],
        ];
        Ok(quaternion_from_orthonormal_matrix(&m))
    }

    /// Compose two elemental rotations about axis1/axis2/axis3 by
    /// alpha/beta/gamma, per the named ordering's 12-way table.
    pub fn from_cardan_euler(order: RotationOrder, alpha: F, beta: F, gamma: F) -> Self {
        let (a1, a2, a3) = order.axes();
        Self::elemental(a1, alpha)
            .compose(&Self::elemental(a2, beta))
            .compose(&Self::elemental(a3, gamma))
    }

    /// Iterative Björck orthogonalization followed by quaternion
    /// extraction. Determinant sign is checked against the
    /// *pre-orthogonalization* input matrix's top-row cofactor expansion
    /// (see DESIGN.md for why).
    pub fn from_matrix(m: &[[F; 3]; 3], threshold: F) -> OdeResult<Self> {
        if determinant(m).to_f64() < 0.0 {
            return Err(OdeError::NotARotationMatrix(
                RotationMatrixError::NegativeDeterminant,
            ));
        }
        let ortho = bjorck_orthogonalize(m, threshold)?;
        Ok(quaternion_from_orthonormal_matrix(&ortho))
    }

    /// Convenience entry point accepting a dynamically-shaped matrix
    /// (e.g. loaded from external data); returns `Dimension` if it is not
    /// 3x3 rather than panicking.
    pub fn from_matrix_rows(rows: &[Vec<F>], threshold: F) -> OdeResult<Self> {
        if rows.len() != 3 || rows.iter().any(|r| r.len() != 3) {
            return Err(OdeError::NotARotationMatrix(RotationMatrixError::Dimension));
        }
        let m = [
            [rows[0][0], rows[0][1], rows[0][2]],
            [rows[1][0], rows[1][1], rows[1][2]],
            [rows[2][0], rows[2][1], rows[2][2]],
        ];
        Self::from_matrix(&m, threshold)
    }

    pub fn revert(&self) -> Self {
        Self {
            q0: self.q0,
            q1: -self.q1,
            q2: -self.q2,
            q3: -self.q3,
        }
    }

    /// Canonicalized components with q0 >= 0 (q and -q represent the
    /// same rotation).
    fn canonical(&self) -> (F, F, F, F) {
        if self.q0.to_f64() >= 0.0 {
            (self.q0, self.q1, self.q2, self.q3)
        } else {
            (-self.q0, -self.q1, -self.q2, -self.q3)
        }
    }

    pub fn apply_to(&self, v: &Vector3<F>) -> Vector3<F> {
        let qvec = Vector3::new(self.q1, self.q2, self.q3);
        let t = qvec.cross(v).scale(F::from_f64(2.0));
        let rotated = v
            .add(&t.scale(self.q0))
            .add(&qvec.cross(&t));
        rotated
    }

    pub fn apply_inverse_to(&self, v: &Vector3<F>) -> Vector3<F> {
        self.revert().apply_to(v)
    }

    /// Quaternion composition so that `self.compose(other).apply_to(v)
    /// == self.apply_to(other.apply_to(v))` (apply `other` first).
    pub fn compose(&self, other: &Self) -> Self {
        let (p0, p1, p2, p3) = (self.q0, self.q1, self.q2, self.q3);
        let (r0, r1, r2, r3) = (other.q0, other.q1, other.q2, other.q3);
        Self {
            q0: p0 * r0 - p1 * r1 - p2 * r2 - p3 * r3,
            q1: p0 * r1 + p1 * r0 + p2 * r3 - p3 * r2,
            q2: p0 * r2 - p1 * r3 + p2 * r0 + p3 * r1,
            q3: p0 * r3 + p1 * r2 - p2 * r1 + p3 * r0,
        }
    }

    /// Rotation composed with `other`'s inverse (`self.compose(other.revert())`).
    pub fn apply_inverse_to_rotation(&self, other: &Self) -> Self {
        self.compose(&other.revert())
    }

    pub fn axis(&self) -> OdeResult<Vector3<F>> {
        let (_, q1, q2, q3) = self.canonical();
        let v = Vector3::new(q1, q2, q3);
        v.normalize()
    }

    pub fn angle(&self) -> F {
        let (q0, q1, q2, q3) = self.canonical();
        if q0.to_f64() > 0.1 {
            F::from_f64(2.0) * (q1 * q1 + q2 * q2 + q3 * q3).sqrt().asin()
        } else if q0.to_f64() < 0.0 {
            F::from_f64(2.0) * (-q0).acos()
        } else {
            F::from_f64(2.0) * q0.acos()
        }
    }

    /// Cardan or Euler angle extraction for `order`, with a guard
    /// against the gimbal-lock singularity.
    pub fn get_angles(&self, order: RotationOrder) -> OdeResult<(F, F, F)> {
        let (a1, a2, a3) = order.axes();
        if order.is_cardan() {
            let sign = F::from_f64(levi_civita(a1, a2, a3));
            let v1 = self.apply_to(&a3.unit());
            let sin_beta = sign * component(&v1, a1);
            if sin_beta.to_f64().abs() > SINGULARITY_THRESHOLD {
                return Err(OdeError::CardanEulerSingularity { is_cardan: true });
            }
            let beta = sin_beta.max(F::from_f64(-1.0)).min(F::from_f64(1.0)).asin();
            let alpha = (-sign * component(&v1, a2)).atan2(component(&v1, a3));
            let v2 = self.apply_inverse_to(&a1.unit());
            let gamma = (-sign * component(&v2, a2)).atan2(component(&v2, a1));
            Ok((alpha, beta, gamma))
        } else {
            let k = RotationOrder::third_axis(a1, a2);
            let sign = F::from_f64(levi_civita(a1, a2, k));
            let v1 = self.apply_to(&a1.unit());
            let cos_beta = component(&v1, a1);
            if cos_beta.to_f64().abs() > SINGULARITY_THRESHOLD {
                return Err(OdeError::CardanEulerSingularity { is_cardan: false });
            }
            let beta = cos_beta.max(F::from_f64(-1.0)).min(F::from_f64(1.0)).acos();
            let alpha = component(&v1, a2).atan2(-sign * component(&v1, k));
            let v2 = self.apply_inverse_to(&a1.unit());
            let gamma = component(&v2, a2).atan2(sign * component(&v2, k));
            Ok((alpha, beta, gamma))
        }
    }

    /// Angle of `r1⁻¹·r2`.
    pub fn distance(r1: &Self, r2: &Self) -> F {
        r1.revert().compose(r2).angle()
    }
}

/// `Xₙ₊₁ = Xₙ − ½·(Xₙ·Mᵀ·Xₙ − M)`, stopped when the Frobenius-norm² of the
/// correction stabilizes within `threshold`; fails after 10 iterations.
fn bjorck_orthogonalize<F: FieldElement>(
    m: &[[F; 3]; 3],
    threshold: F,
) -> OdeResult<[[F; 3]; 3]> {
    let mt = transpose(m);
    let mut x = *m;
    let mut prev_conv: Option<F> = None;
    for _ in 0..10 {
        let xmtx = mat_mul(&mat_mul(&x, &mt), &x);
        let correction = mat_sub(&xmtx, m);
        let conv = frobenius_norm_sq(&correction);
        let x_next = mat_sub(&x, &mat_scale(&correction, F::from_f64(0.5)));
        if let Some(prev) = prev_conv {
            if (conv - prev).abs().to_f64() <= threshold.to_f64() {
                return Ok(x_next);
            }
        }
        prev_conv = Some(conv);
        x = x_next;
    }
    log::warn!("orthogonalization did not converge within 10 iterations");
    Err(OdeError::NotARotationMatrix(
        RotationMatrixError::NoOrthogonalConvergence { iters: 10 },
    ))
}

/// Quaternion-from-rotation-matrix via the multiply-and-shift formula:
/// the component with the largest magnitude is computed first (tested in
/// sequence q0, q1, q2, q3 against `s > -0.19`) to avoid dividing by a
/// small number.
fn quaternion_from_orthonormal_matrix<F: FieldElement>(m: &[[F; 3]; 3]) -> Rotation<F> {
    let half = F::from_f64(0.5);
    let quarter = F::from_f64(0.25);
    let threshold = F::from_f64(-0.19);

    let s = m[0][0] + m[1][1] + m[2][2];
    if s.to_f64() > threshold.to_f64() {
        let q0 = half * (s + F::one()).sqrt();
        let inv = quarter / q0;
        return Rotation {
            q0,
            q1: (m[1][2] - m[2][1]) * inv,
            q2: (m[2][0] - m[0][2]) * inv,
            q3: (m[0][1] - m[1][0]) * inv,
        };
    }
    let s = m[0][0] - m[1][1] - m[2][2];
    if s.to_f64() > threshold.to_f64() {
        let q1 = half * (s + F::one()).sqrt();
        let inv = quarter / q1;
        return Rotation {
            q0: (m[1][2] - m[2][1]) * inv,
            q1,
            q2: (m[0][1] + m[1][0]) * inv,
            q3: (m[0][2] + m[2][0]) * inv,
        };
    }
    let s = m[1][1] - m[0][0] - m[2][2];
    if s.to_f64() > threshold.to_f64() {
        let q2 = half * (s + F::one()).sqrt();
        let inv = quarter / q2;
        return Rotation {
            q0: (m[2][0] - m[0][2]) * inv,
            q1: (m[0][1] + m[1][0]) * inv,
            q2,
            q3: (m[1][2] + m[2][1]) * inv,
        };
    }
    let s = m[2][2] - m[0][0] - m[1][1];
    let q3 = half * (s + F::one()).sqrt();
    let inv = quarter / q3;
    Rotation {
        q0: (m[0][1] - m[1][0]) * inv,
        q1: (m[0][2] + m[2][0]) * inv,
        q2: (m[1][2] + m[2][1]) * inv,
        q3,
    }
}

fn transpose<F: FieldElement>(m: &[[F; 3]; 3]) -> [[F; 3]; 3] {
    let mut out = [[F::zero(); 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[j][i] = m[i][j];
        }
    }
    out
}

fn mat_mul<F: FieldElement>(a: &[[F; 3]; 3], b: &[[F; 3]; 3]) -> [[F; 3]; 3] {
    let mut out = [[F::zero(); 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let mut acc = F::zero();
            for k in 0..3 {
                acc += a[i][k] * b[k][j];
            }
            out[i][j] = acc;
        }
    }
    out
}

fn mat_sub<F: FieldElement>(a: &[[F; 3]; 3], b: &[[F; 3]; 3]) -> [[F; 3]; 3] {
    let mut out = [[F::zero(); 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][j] - b[i][j];
        }
    }
    out
}

fn mat_scale<F: FieldElement>(a: &[[F; 3]; 3], s: F) -> [[F; 3]; 3] {
    let mut out = [[F::zero(); 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            out[i][j] = a[i][j] * s;
        }
    }
    out
}

fn frobenius_norm_sq<F: FieldElement>(a: &[[F; 3]; 3]) -> F {
    let mut acc = F::zero();
    for row in a {
        for &x in row {
            acc += x * x;
        }
    }
    acc
}

fn determinant<F: FieldElement>(m: &[[F; 3]; 3]) -> F {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[0][1] * (m[1][0] * m[2][2] - m[1][2] * m[2][0])
        + m[0][2] * (m[1][0] * m[2][1] - m[1][1] * m[2][0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn axis_angle_vec(x: f64, y: f64, z: f64) -> Vector3<f64> {
        Vector3::new(x, y, z)
    }

    #[test]
    fn normalization_invariant_holds_after_construction() {
        let r = Rotation::from_axis_angle(&axis_angle_vec(1.0, 2.0, 3.0), 0.7).unwrap();
        let norm_sq = r.q0 * r.q0 + r.q1 * r.q1 + r.q2 * r.q2 + r.q3 * r.q3;
        assert!((norm_sq - 1.0).abs() < 1e-12);
    }

    #[test]
    fn axis_angle_roundtrip_apply_then_inverse() {
        let axis = axis_angle_vec(1.0, 2.0, 3.0).normalize().unwrap();
        let r = Rotation::from_axis_angle(&axis, 0.7).unwrap();
        let v = axis_angle_vec(0.3, -0.8, 1.1);
        let rotated = r.apply_to(&v);
        let back = r.apply_inverse_to(&rotated);
        assert!(back.distance(&v) < 1e-13);
    }

    #[test]
    fn axis_angle_matches_rodrigues_formula() {
        // E5: axis = (1,2,3)/|.|, angle = 0.7, applied to (0,0,1).
        let axis = axis_angle_vec(1.0, 2.0, 3.0).normalize().unwrap();
        let r = Rotation::from_axis_angle(&axis, 0.7).unwrap();
        let v = axis_angle_vec(0.0, 0.0, 1.0);
        let got = r.apply_to(&v);

        let theta = 0.7f64;
        let rodrigues = v
            .scale(theta.cos())
            .add(&axis.cross(&v).scale(theta.sin()))
            .add(&axis.scale(axis.dot(&v) * (1.0 - theta.cos())));
        assert!(got.distance(&rodrigues) < 1e-14);
    }

    #[test]
    fn composition_is_associative() {
        let r1 = Rotation::from_axis_angle(&axis_angle_vec(1.0, 0.0, 0.0), 0.3).unwrap();
        let r2 = Rotation::from_axis_angle(&axis_angle_vec(0.0, 1.0, 0.0), 0.5).unwrap();
        let r3 = Rotation::from_axis_angle(&axis_angle_vec(0.0, 0.0, 1.0), 0.9).unwrap();

        let left = r1.compose(&r2).compose(&r3);
        let right = r1.compose(&r2.compose(&r3));

        let v = axis_angle_vec(0.2, 0.4, -0.6);
        assert!(left.apply_to(&v).distance(&right.apply_to(&v)) < 1e-13);
    }

    #[test]
    fn cardan_euler_roundtrip_away_from_singularity() {
        let r = Rotation::from_cardan_euler(RotationOrder::XYZ, 0.2, 0.4, -0.3);
        let (a, b, c) = r.get_angles(RotationOrder::XYZ).unwrap();
        let reconstructed = Rotation::from_cardan_euler(RotationOrder::XYZ, a, b, c);
        assert!(Rotation::distance(&r, &reconstructed) < 1e-12);
    }

    #[test]
    fn euler_order_roundtrip() {
        let r = Rotation::from_cardan_euler(RotationOrder::ZXZ, 0.25, 0.9, -0.6);
        let (a, b, c) = r.get_angles(RotationOrder::ZXZ).unwrap();
        let reconstructed = Rotation::from_cardan_euler(RotationOrder::ZXZ, a, b, c);
        assert!(Rotation::distance(&r, &reconstructed) < 1e-12);
    }

    #[test]
    fn cardan_singularity_is_detected_at_threshold() {
        // E6: beta = pi/2 - 1e-11 triggers the singularity guard.
        let beta = PI / 2.0 - 1e-11;
        let r = Rotation::from_cardan_euler(RotationOrder::XYZ, 0.1, beta, 0.2);
        let result = r.get_angles(RotationOrder::XYZ);
        assert!(matches!(
            result,
            Err(OdeError::CardanEulerSingularity { is_cardan: true })
        ));
    }

    #[test]
    fn two_vectors_antiparallel_is_pi_rotation() {
        let u = axis_angle_vec(1.0, 0.0, 0.0);
        let v = axis_angle_vec(-1.0, 0.0, 0.0);
        let r = Rotation::from_two_vectors(&u, &v).unwrap();
        let rotated = r.apply_to(&u);
        assert!(rotated.distance(&v) < 1e-10);
    }

    #[test]
    fn two_vectors_shortest_angle() {
        let u = axis_angle_vec(1.0, 0.0, 0.0);
        let v = axis_angle_vec(0.0, 1.0, 0.0);
        let r = Rotation::from_two_vectors(&u, &v).unwrap();
        assert!((r.angle() - PI / 2.0).abs() < 1e-10);
    }

    #[test]
    fn two_pairs_maps_frame_to_frame() {
        let u1 = axis_angle_vec(1.0, 0.0, 0.0);
        let u2 = axis_angle_vec(0.0, 1.0, 0.0);
        let v1 = axis_angle_vec(0.0, 1.0, 0.0);
        let v2 = axis_angle_vec(0.0, 0.0, 1.0);
        let r = Rotation::from_two_pairs(&u1, &u2, &v1, &v2).unwrap();
        assert!(r.apply_to(&u1).distance(&v1) < 1e-10);
        assert!(r.apply_to(&u2).distance(&v2) < 1e-10);
    }

    #[test]
    fn from_matrix_recovers_known_rotation() {
        let r = Rotation::from_axis_angle(&axis_angle_vec(0.0, 0.0, 1.0), PI / 2.0).unwrap();
        // Build the full matrix from the three rotated basis vectors.
        let c0 = r.apply_to(&axis_angle_vec(1.0, 0.0, 0.0));
        let c1 = r.apply_to(&axis_angle_vec(0.0, 1.0, 0.0));
        let c2 = r.apply_to(&axis_angle_vec(0.0, 0.0, 1.0));
        let full = [
            [c0.x, c1.x, c2.x],
            [c0.y, c1.y, c2.y],
            [c0.z, c1.z, c2.z],
        ];
        let recovered = Rotation::from_matrix(&full, 1e-12).unwrap();
        assert!(Rotation::distance(&r, &recovered) < 1e-9);
    }

    #[test]
    fn from_matrix_rejects_wrong_dimension() {
        let rows = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let result = Rotation::<f64>::from_matrix_rows(&rows, 1e-12);
        assert!(matches!(
            result,
            Err(OdeError::NotARotationMatrix(RotationMatrixError::Dimension))
        ));
    }

    #[test]
    fn from_matrix_rejects_negative_determinant() {
        // A pure reflection: determinant -1.
        let m = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, -1.0]];
        let result = Rotation::from_matrix(&m, 1e-12);
        assert!(matches!(
            result,
            Err(OdeError::NotARotationMatrix(
                RotationMatrixError::NegativeDeterminant
            ))
        ));
    }
}
