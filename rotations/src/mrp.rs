use super::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// |σ|² beyond which the parameters are treated as having reached the
/// 360 degree singularity. With shadow-set switching after every step the
/// norm never exceeds one by more than a single step's growth.
pub const MRP_SINGULAR_NORM_SQUARED: f64 = 1.0e6;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum MrpErrors {
    #[error("modified rodrigues parameters are not finite")]
    NotFinite,
    #[error("modified rodrigues parameters reached the 360 degree singularity (|sigma|^2 = {0})")]
    Singular(f64),
}

/// Modified Rodrigues parameters σ = ê tan(Φ/4) describing frame B relative to frame N.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Mrp(pub Vector3<f64>);

impl Mrp {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self(Vector3::new(x, y, z))
    }

    pub fn vector(&self) -> Vector3<f64> {
        self.0
    }

    pub fn norm_squared(&self) -> f64 {
        self.0.norm_squared()
    }

    /// Returns an error if the parameters are unusable for kinematics.
    pub fn check(&self) -> Result<(), MrpErrors> {
        let s2 = self.norm_squared();
        if !s2.is_finite() {
            return Err(MrpErrors::NotFinite);
        }
        if s2 >= MRP_SINGULAR_NORM_SQUARED {
            return Err(MrpErrors::Singular(s2));
        }
        Ok(())
    }

    /// The shadow set σˢ = -σ/|σ|², describing the same orientation.
    pub fn shadow(&self) -> Self {
        let s2 = self.norm_squared();
        if s2 < f64::EPSILON {
            return *self;
        }
        Self(-self.0 / s2)
    }

    /// Returns the short rotation set (|σ| <= 1).
    pub fn switched(&self) -> Self {
        if self.norm_squared() > 1.0 {
            self.shadow()
        } else {
            *self
        }
    }

    /// Direction cosine matrix [BN].
    pub fn dcm(&self) -> Matrix3<f64> {
        let s2 = self.norm_squared();
        let s = skew(&self.0);
        let d = (1.0 + s2) * (1.0 + s2);
        Matrix3::identity() + (8.0 * s * s - 4.0 * (1.0 - s2) * s) / d
    }

    /// Builds the short rotation set from a direction cosine matrix [BN]
    /// through Sheppard's method.
    pub fn from_dcm(c: &Matrix3<f64>) -> Self {
        let trace = c.trace();
        let squares = [
            (1.0 + trace) / 4.0,
            (1.0 + 2.0 * c[(0, 0)] - trace) / 4.0,
            (1.0 + 2.0 * c[(1, 1)] - trace) / 4.0,
            (1.0 + 2.0 * c[(2, 2)] - trace) / 4.0,
        ];
        let mut largest = 0;
        for i in 1..4 {
            if squares[i] > squares[largest] {
                largest = i;
            }
        }

        let mut b = [0.0; 4];
        b[largest] = squares[largest].sqrt();
        let f = 4.0 * b[largest];
        match largest {
            0 => {
                b[1] = (c[(1, 2)] - c[(2, 1)]) / f;
                b[2] = (c[(2, 0)] - c[(0, 2)]) / f;
                b[3] = (c[(0, 1)] - c[(1, 0)]) / f;
            }
            1 => {
                b[0] = (c[(1, 2)] - c[(2, 1)]) / f;
                b[2] = (c[(0, 1)] + c[(1, 0)]) / f;
                b[3] = (c[(2, 0)] + c[(0, 2)]) / f;
            }
            2 => {
                b[0] = (c[(2, 0)] - c[(0, 2)]) / f;
                b[1] = (c[(0, 1)] + c[(1, 0)]) / f;
                b[3] = (c[(1, 2)] + c[(2, 1)]) / f;
            }
            _ => {
                b[0] = (c[(0, 1)] - c[(1, 0)]) / f;
                b[1] = (c[(2, 0)] + c[(0, 2)]) / f;
                b[2] = (c[(1, 2)] + c[(2, 1)]) / f;
            }
        }
        if b[0] < 0.0 {
            b.iter_mut().for_each(|x| *x = -*x);
        }
        let d = 1.0 + b[0];
        Self::new(b[1] / d, b[2] / d, b[3] / d)
    }

    /// B(σ) = (1 - σ²) I + 2[σ×] + 2σσᵀ, so that σ̇ = ¼ B(σ) ω.
    pub fn kinematics_matrix(&self) -> Matrix3<f64> {
        let s2 = self.norm_squared();
        (1.0 - s2) * Matrix3::identity() + 2.0 * skew(&self.0) + 2.0 * self.0 * self.0.transpose()
    }

    /// Attitude rate σ̇ for the body rate ω (B components).
    pub fn derivative(&self, omega: &Vector3<f64>) -> Result<Vector3<f64>, MrpErrors> {
        self.check()?;
        Ok(0.25 * self.kinematics_matrix() * omega)
    }
}

impl RotationTrait for Mrp {
    fn transform(&self, v: Vector3<f64>) -> Vector3<f64> {
        self.dcm() * v
    }

    fn rotate(&self, v: Vector3<f64>) -> Vector3<f64> {
        self.dcm().transpose() * v
    }

    fn inv(&self) -> Self {
        Self(-self.0)
    }

    fn identity() -> Self {
        Self(Vector3::zeros())
    }
}

impl From<Vector3<f64>> for Mrp {
    fn from(v: Vector3<f64>) -> Self {
        Self(v)
    }
}

impl From<[f64; 3]> for Mrp {
    fn from(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::PI;
    const TOL: f64 = 1e-12;

    #[test]
    fn test_dcm_quarter_turn_about_z() {
        let sigma = Mrp::new(0.0, 0.0, (PI / 8.0).tan());
        let expected = Matrix3::new(0.0, 1.0, 0.0, -1.0, 0.0, 0.0, 0.0, 0.0, 1.0);
        assert_abs_diff_eq!(sigma.dcm(), expected, epsilon = TOL);
    }

    #[test]
    fn test_shadow_set_same_orientation() {
        let sigma = Mrp::new(0.6, -0.7, 0.5);
        let shadow = sigma.shadow();
        assert!(shadow.norm_squared() < 1.0);
        assert_abs_diff_eq!(sigma.dcm(), shadow.dcm(), epsilon = TOL);
        assert_abs_diff_eq!(sigma.switched().0, shadow.0, epsilon = TOL);
    }

    #[test]
    fn test_switched_keeps_short_set() {
        let sigma = Mrp::new(0.1, 0.2, -0.3);
        assert_eq!(sigma.switched(), sigma);
    }

    #[test]
    fn test_dcm_is_orthonormal() {
        let c = Mrp::new(0.3, -0.4, 0.2).dcm();
        assert_abs_diff_eq!(c * c.transpose(), Matrix3::identity(), epsilon = TOL);
        assert_abs_diff_eq!(c.determinant(), 1.0, epsilon = TOL);
    }

    #[test]
    fn test_from_dcm_round_trip_large_rotation() {
        // principal angle near 180 degrees exercises the non-scalar branches
        let sigma = Mrp::new(0.0, 0.95, 0.1);
        let back = Mrp::from_dcm(&sigma.dcm());
        assert_abs_diff_eq!(back.dcm(), sigma.dcm(), epsilon = 1e-10);
        assert!(back.norm_squared() <= 1.0 + 1e-12);
    }

    #[test]
    fn test_derivative() {
        let sigma = Mrp::new(0.1, 0.2, -0.3);
        let omega = Vector3::new(0.001, -0.01, 0.03);
        let sigma_dot = sigma.derivative(&omega).unwrap();
        assert_abs_diff_eq!(sigma_dot, Vector3::new(0.00117, -0.00489, 0.007485), epsilon = TOL);
    }

    #[test]
    fn test_derivative_at_identity() {
        let omega = Vector3::new(0.4, -0.2, 0.1);
        let sigma_dot = Mrp::identity().derivative(&omega).unwrap();
        assert_abs_diff_eq!(sigma_dot, omega / 4.0, epsilon = TOL);
    }

    #[test]
    fn test_singularity_is_reported() {
        let sigma = Mrp::new(1.0e4, 0.0, 0.0);
        assert!(matches!(
            sigma.derivative(&Vector3::new(0.0, 0.0, 1.0)),
            Err(MrpErrors::Singular(_))
        ));
        let sigma = Mrp::new(f64::NAN, 0.0, 0.0);
        assert_eq!(sigma.check(), Err(MrpErrors::NotFinite));
    }
}
