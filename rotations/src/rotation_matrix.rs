use super::*;
use serde::{Deserialize, Serialize};
use std::ops::Mul;
use thiserror::Error;

/// A direction cosine matrix [BN]: maps N components into B components.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct RotationMatrix(pub Matrix3<f64>);

/// Errors that can occur when creating a `RotationMatrix`.
#[derive(Debug, Copy, Clone, Error, PartialEq)]
pub enum RotationMatrixErrors {
    #[error("rotation matrix has a zero magnitude row")]
    ZeroMagnitudeRow,
    #[error("rotation matrix is not orthonormal (|C Cᵀ - I| = {0})")]
    NotOrthonormal(f64),
}

impl RotationMatrix {
    /// Tolerance on |C Cᵀ - I| accepted from user supplied matrices.
    pub const ORTHONORMAL_TOL: f64 = 1e-9;

    /// Creates a new `RotationMatrix` from its rows, normalizing each row and
    /// rejecting matrices that are not orthonormal.
    pub fn new(m: Matrix3<f64>) -> Result<Self, RotationMatrixErrors> {
        let mut normalized = m;
        for i in 0..3 {
            let row = m.row(i);
            let mag = row.norm();
            if mag < f64::EPSILON {
                return Err(RotationMatrixErrors::ZeroMagnitudeRow);
            }
            normalized.set_row(i, &(row / mag));
        }
        let error = (normalized * normalized.transpose() - Matrix3::identity()).norm();
        if error > Self::ORTHONORMAL_TOL {
            return Err(RotationMatrixErrors::NotOrthonormal(error));
        }
        Ok(Self(normalized))
    }

    /// Single axis rotation about the second axis, M2(θ).
    pub fn m2(angle: f64) -> Self {
        let (s, c) = angle.sin_cos();
        Self(Matrix3::new(c, 0.0, -s, 0.0, 1.0, 0.0, s, 0.0, c))
    }

    pub fn get_value(&self) -> Matrix3<f64> {
        self.0
    }
}

impl Default for RotationMatrix {
    fn default() -> Self {
        Self(Matrix3::identity())
    }
}

impl RotationTrait for RotationMatrix {
    fn transform(&self, v: Vector3<f64>) -> Vector3<f64> {
        self.0 * v
    }

    fn rotate(&self, v: Vector3<f64>) -> Vector3<f64> {
        self.0.transpose() * v
    }

    fn inv(&self) -> Self {
        Self(self.0.transpose())
    }

    fn identity() -> Self {
        Self(Matrix3::identity())
    }
}

impl Mul<RotationMatrix> for RotationMatrix {
    type Output = RotationMatrix;

    /// Composes two rotations: [CA] = [CB] * [BA].
    fn mul(self, rhs: RotationMatrix) -> RotationMatrix {
        RotationMatrix(self.0 * rhs.0)
    }
}
