pub mod mrp;
pub mod rotation_matrix;

use nalgebra::{Matrix3, Vector3};

use mrp::Mrp;
use rotation_matrix::RotationMatrix;

pub mod prelude {
    pub use crate::mrp::*;
    pub use crate::rotation_matrix::*;
    pub use crate::{RotationTrait, skew};
}

/// Trait defining rotation and transformation operations.
///
/// All attitude types in this crate describe the orientation of a frame B
/// relative to a frame N. `transform` changes the frame in which a vector is
/// expressed (N components in, B components out); `rotate` is its inverse.
pub trait RotationTrait {
    /// Expresses a vector given in N components in B components.
    fn transform(&self, v: Vector3<f64>) -> Vector3<f64>;

    /// Expresses a vector given in B components in N components.
    fn rotate(&self, v: Vector3<f64>) -> Vector3<f64>;

    fn inv(&self) -> Self;

    fn identity() -> Self;
}

/// Returns the cross product matrix [v×] such that [v×] u = v × u.
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(0.0, -v[2], v[1], v[2], 0.0, -v[0], -v[1], v[0], 0.0)
}

impl From<&Mrp> for RotationMatrix {
    fn from(mrp: &Mrp) -> Self {
        RotationMatrix(mrp.dcm())
    }
}

impl From<&RotationMatrix> for Mrp {
    fn from(matrix: &RotationMatrix) -> Self {
        Mrp::from_dcm(&matrix.0)
    }
}
