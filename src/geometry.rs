//! The geometry kernel (spec.md §4.1): 3-vectors, 3x3 rotations, rigid
//! transforms with composition and inverse, point-set RMSD, and
//! least-squares superposition.
//!
//! Rotations are kept as an explicit 3x3 matrix (`nalgebra::Rotation3`,
//! which nalgebra itself backs with a `Matrix3`, not a quaternion) per
//! design note 9: "avoid quaternion for composition to keep the
//! arithmetic identical to the reference; Euler angles appear only on the
//! wire."

use crate::error::GeometryError;
use nalgebra::{Matrix3, Rotation3};

pub type Vec3 = nalgebra::Vector3<f64>;

/// A rigid body motion `p -> R p + t`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub rotation: Rotation3<f64>,
    pub translation: Vec3,
}

impl Transform {
    pub fn identity() -> Self {
        Transform {
            rotation: Rotation3::identity(),
            translation: Vec3::zeros(),
        }
    }

    /// Builds a transform from the wire format (spec.md §3, §6): X->Y->Z
    /// intrinsic Euler angles in radians, translation in Å.
    pub fn from_euler_translation(rx: f64, ry: f64, rz: f64, t: Vec3) -> Self {
        Transform {
            rotation: Rotation3::from_euler_angles(rx, ry, rz),
            translation: t,
        }
    }

    /// Inverse of [`from_euler_translation`]: recovers the X->Y->Z Euler
    /// angles and the translation, for serialization.
    pub fn to_euler_translation(&self) -> (f64, f64, f64, Vec3) {
        let (rx, ry, rz) = self.rotation.euler_angles();
        (rx, ry, rz, self.translation)
    }

    /// `(R1,t1) . (R2,t2) = (R1 R2, R1 t2 + t1)`: applying `self` after
    /// `other`.
    pub fn compose(&self, other: &Transform) -> Transform {
        Transform {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    /// `(R^T, -R^T t)`.
    pub fn inverse(&self) -> Transform {
        let rt = self.rotation.inverse();
        Transform {
            translation: -(rt * self.translation),
            rotation: rt,
        }
    }

    pub fn apply_to_point(&self, p: &Vec3) -> Vec3 {
        self.rotation * p + self.translation
    }

    pub fn apply_to_points(&self, points: &[Vec3]) -> Vec<Vec3> {
        points.iter().map(|p| self.apply_to_point(p)).collect()
    }
}

/// Applies `t` to `points_b` and returns the RMS distance to `points_a`.
///
/// # Panics
/// Panics if the two slices have different lengths.
pub fn rmsd(points_a: &[Vec3], points_b: &[Vec3], t: &Transform) -> f64 {
    assert_eq!(points_a.len(), points_b.len(), "rmsd: point count mismatch");
    if points_a.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = points_a
        .iter()
        .zip(points_b)
        .map(|(a, b)| (a - t.apply_to_point(b)).norm_squared())
        .sum();
    (sum_sq / points_a.len() as f64).sqrt()
}

fn centroid(points: &[Vec3]) -> Vec3 {
    points.iter().fold(Vec3::zeros(), |acc, p| acc + p) / points.len() as f64
}

/// `true` when `points` does not span at least a plane, i.e. the
/// covariance matrix has fewer than 2 singular values above `eps`.
fn is_degenerate(points: &[Vec3]) -> bool {
    if points.len() < 3 {
        return true;
    }
    let c = centroid(points);
    let mut cov = Matrix3::zeros();
    for p in points {
        let d = p - c;
        cov += d * d.transpose();
    }
    let svd = nalgebra::linalg::SVD::new(cov, false, false);
    let mut singular_values: Vec<f64> = svd.singular_values.iter().copied().collect();
    singular_values.sort_by(|a, b| b.partial_cmp(a).unwrap());
    let scale = singular_values[0].max(1e-12);
    singular_values[1] / scale < 1e-9
}

/// The rigid transform `T` minimizing `rmsd(points_a, points_b, T)`, i.e.
/// `T` maps `points_b` onto `points_a` (Kabsch algorithm).
///
/// # Errors
/// Returns [`GeometryError::DegenerateInput`] when either point set has
/// fewer than 3 points or is collinear/coincident.
pub fn superpose(points_a: &[Vec3], points_b: &[Vec3]) -> Result<Transform, GeometryError> {
    assert_eq!(
        points_a.len(),
        points_b.len(),
        "superpose: point count mismatch"
    );
    if is_degenerate(points_a) || is_degenerate(points_b) {
        return Err(GeometryError::DegenerateInput);
    }

    let ca = centroid(points_a);
    let cb = centroid(points_b);

    let mut h = Matrix3::zeros();
    for (a, b) in points_a.iter().zip(points_b) {
        let ac = a - ca;
        let bc = b - cb;
        h += bc * ac.transpose();
    }

    let svd = nalgebra::linalg::SVD::new(h, true, true);
    let u = svd.u.expect("SVD::new(true, true) always returns u");
    let v_t = svd
        .v_t
        .expect("SVD::new(true, true) always returns v_t");
    let v = v_t.transpose();

    let d = (v * u.transpose()).determinant().signum();
    let correction = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, d);
    let r = v * correction * u.transpose();
    let rotation = Rotation3::from_matrix_unchecked(r);

    let translation = ca - rotation * cb;
    Ok(Transform {
        rotation,
        translation,
    })
}
