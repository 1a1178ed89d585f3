use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{GravityErrors, GravityModel, checked_radius};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewtonianGravity {
    pub mu: f64,
}

impl NewtonianGravity {
    pub fn new(mu: f64) -> Self {
        Self { mu }
    }
}

impl GravityModel for NewtonianGravity {
    fn calculate(&self, position: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        let position_mag = checked_radius(position)?;
        Ok(-position * self.mu / position_mag.powi(3))
    }

    fn potential(&self, position: &Vector3<f64>) -> Result<f64, GravityErrors> {
        let position_mag = checked_radius(position)?;
        Ok(-self.mu / position_mag)
    }
}
