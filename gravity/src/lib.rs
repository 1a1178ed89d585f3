use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod body;
pub mod newtonian;
pub mod zonal;

use newtonian::NewtonianGravity;
use zonal::J2Gravity;

/// Standard gravity used to convert specific impulse to exhaust velocity (m/s^2).
pub const G0: f64 = 9.80665;

/// Positions closer than this to a body center are rejected (m).
pub const MIN_RADIUS: f64 = 0.1;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum GravityErrors {
    #[error("gravity body '{0}' is already registered")]
    DuplicateBody(String),
    #[error("gravitational parameter of '{0}' must be positive and finite")]
    InvalidMu(String),
    #[error("J2 reference radius must be positive and finite")]
    InvalidRadius,
    #[error("more than one central body ('{0}' and '{1}')")]
    MultipleCentralBodies(String, String),
    #[error("no central body registered")]
    NoCentralBody,
    #[error("position is not finite")]
    NotFinite,
    #[error("position is within {MIN_RADIUS} m of the body center (|r| = {0})")]
    TooCloseToCenter(f64),
    #[error("no gravity body named '{0}'")]
    UnknownBody(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Gravity {
    Newtonian(NewtonianGravity),
    J2(J2Gravity),
}

impl Gravity {
    pub fn mu(&self) -> f64 {
        match self {
            Gravity::Newtonian(g) => g.mu,
            Gravity::J2(g) => g.mu,
        }
    }
}

impl GravityModel for Gravity {
    fn calculate(&self, r: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        match self {
            Gravity::Newtonian(g) => g.calculate(r),
            Gravity::J2(g) => g.calculate(r),
        }
    }

    fn potential(&self, r: &Vector3<f64>) -> Result<f64, GravityErrors> {
        match self {
            Gravity::Newtonian(g) => g.potential(r),
            Gravity::J2(g) => g.potential(r),
        }
    }
}

pub trait GravityModel {
    // input r is the position relative to the body center, inertial components
    // returns the gravitational acceleration in the same components
    fn calculate(&self, r: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors>;

    /// Potential energy per unit mass, so that the acceleration is its negative gradient.
    fn potential(&self, r: &Vector3<f64>) -> Result<f64, GravityErrors>;
}

/// Returns |r| after rejecting positions the models cannot evaluate.
pub(crate) fn checked_radius(r: &Vector3<f64>) -> Result<f64, GravityErrors> {
    if r.iter().any(|x| !x.is_finite()) {
        return Err(GravityErrors::NotFinite);
    }
    let rmag = r.norm();
    if rmag < MIN_RADIUS {
        return Err(GravityErrors::TooCloseToCenter(rmag));
    }
    Ok(rmag)
}

/// Gravity gradient torque 3μ/|r|⁵ r × (I r) on a body whose center of mass is
/// at `r` from an attracting point mass. `r` and `inertia` share components.
pub fn gravity_gradient_torque(
    mu: f64,
    r: &Vector3<f64>,
    inertia: &Matrix3<f64>,
) -> Result<Vector3<f64>, GravityErrors> {
    let rmag = checked_radius(r)?;
    Ok(3.0 * mu / rmag.powi(5) * r.cross(&(inertia * r)))
}
