use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{GravityErrors, GravityModel, checked_radius};

/// Point mass plus the J2 zonal harmonic, with the pole along the inertial z axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct J2Gravity {
    pub mu: f64,
    /// reference (equatorial) radius, m
    pub radius: f64,
    pub j2: f64,
}

impl J2Gravity {
    pub fn new(mu: f64, radius: f64, j2: f64) -> Result<Self, GravityErrors> {
        if !(radius.is_finite() && radius > 0.0) {
            return Err(GravityErrors::InvalidRadius);
        }
        Ok(Self { mu, radius, j2 })
    }

    pub fn earth() -> Self {
        Self {
            mu: 3.986004415e14,
            radius: 6378136.3,
            j2: 1.0826267e-3,
        }
    }
}

impl GravityModel for J2Gravity {
    fn calculate(&self, r: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        let rmag = checked_radius(r)?;
        let point = -r * self.mu / rmag.powi(3);

        let zr2 = (r[2] / rmag).powi(2);
        let coeff = -1.5 * self.j2 * self.mu * self.radius.powi(2) / rmag.powi(5);
        let j2 = coeff
            * Vector3::new(
                (1.0 - 5.0 * zr2) * r[0],
                (1.0 - 5.0 * zr2) * r[1],
                (3.0 - 5.0 * zr2) * r[2],
            );
        Ok(point + j2)
    }

    fn potential(&self, r: &Vector3<f64>) -> Result<f64, GravityErrors> {
        let rmag = checked_radius(r)?;
        let p2 = 0.5 * (3.0 * (r[2] / rmag).powi(2) - 1.0);
        Ok(-self.mu / rmag * (1.0 - self.j2 * (self.radius / rmag).powi(2) * p2))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_gradient_of_potential() {
        let g = J2Gravity::earth();
        let r = Vector3::new(-4020338.69, 7490566.74, 5248299.21);
        let a = g.calculate(&r).unwrap();
        let h = 1.0;
        for i in 0..3 {
            let mut rp = r;
            let mut rm = r;
            rp[i] += h;
            rm[i] -= h;
            let grad = (g.potential(&rp).unwrap() - g.potential(&rm).unwrap()) / (2.0 * h);
            assert_relative_eq!(-grad, a[i], max_relative = 1e-7);
        }
    }

    #[test]
    fn test_zero_j2_is_point_mass() {
        let g = J2Gravity::new(3.986004415e14, 6378136.3, 0.0).unwrap();
        let r = Vector3::new(7.0e6, 1.0e5, -2.0e6);
        let point = -r * g.mu / r.norm().powi(3);
        assert_abs_diff_eq!(g.calculate(&r).unwrap(), point, epsilon = 1e-15);
    }

    #[test]
    fn test_equatorial_j2_strengthens_pull() {
        let g = J2Gravity::earth();
        let r = Vector3::new(7.0e6, 0.0, 0.0);
        let a = g.calculate(&r).unwrap();
        assert!(a[0] < -g.mu / 49.0e12);
        assert_eq!(a[2], 0.0);
        assert!(J2Gravity::new(1.0, 0.0, 1e-3).is_err());
    }
}
