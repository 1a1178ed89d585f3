use gravity::G0;
use mass_properties::{MassPropertiesErrors, check_inertia};
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::unit_axis;
use crate::{
    ConfigurationErrors,
    dynamics::{Assembly, BodyTerm},
    effector::Effector,
    time::{nano_to_sec, sec_to_nano},
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ThrusterErrors {
    #[error("thruster set '{0}' has no thrusters")]
    Empty(String),
    #[error("thruster '{0}' specific impulse must be greater than 0")]
    NonPositiveIsp(String),
    #[error("thruster '{0}' max thrust must be greater than 0")]
    NonPositiveThrust(String),
    #[error("propellant mass cannot be negative")]
    NegativePropellant,
    #[error("propellant tank inertia: {0}")]
    TankInertia(MassPropertiesErrors),
    #[error("thruster '{0}' direction has zero length")]
    ZeroDirection(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thruster {
    pub name: String,
    /// structural coordinates
    pub position: Vector3<f64>,
    /// thrust direction, B components
    pub direction: Vector3<f64>,
    /// N
    pub max_thrust: f64,
    /// s
    pub isp: f64,
    /// active firing window [start, end) in ns
    #[serde(skip)]
    firing: Option<(u64, u64)>,
    /// thrust averaged over the current step, N
    #[serde(skip)]
    step_thrust: f64,
}

impl Thruster {
    pub fn new(
        name: &str,
        position: Vector3<f64>,
        direction: Vector3<f64>,
        max_thrust: f64,
        isp: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            position,
            direction,
            max_thrust,
            isp,
            firing: None,
            step_thrust: 0.0,
        }
    }

    fn validate(&mut self) -> Result<(), ThrusterErrors> {
        self.direction = unit_axis(&self.direction)
            .ok_or_else(|| ThrusterErrors::ZeroDirection(self.name.clone()))?;
        if !(self.max_thrust.is_finite() && self.max_thrust > 0.0) {
            return Err(ThrusterErrors::NonPositiveThrust(self.name.clone()));
        }
        if !(self.isp.is_finite() && self.isp > 0.0) {
            return Err(ThrusterErrors::NonPositiveIsp(self.name.clone()));
        }
        Ok(())
    }

    /// Starts a firing of `on_time` seconds at `time_ns`. A non-positive
    /// request stops the thruster.
    pub fn request(&mut self, time_ns: u64, on_time: f64) {
        let duration = sec_to_nano(on_time);
        self.firing = if duration > 0 {
            Some((time_ns, time_ns.saturating_add(duration)))
        } else {
            None
        };
    }

    /// Fraction of [t0, t0 + dt) inside the firing window.
    fn duty(&self, t0: u64, dt: u64) -> f64 {
        let Some((start, end)) = self.firing else {
            return 0.0;
        };
        let t1 = t0 + dt;
        let overlap = end.min(t1).saturating_sub(start.max(t0));
        overlap as f64 / dt as f64
    }

    pub fn is_firing(&self, time_ns: u64) -> bool {
        matches!(self.firing, Some((start, end)) if start <= time_ns && time_ns < end)
    }

    pub fn thrust(&self) -> f64 {
        self.step_thrust
    }
}

/// Propellant shared by a thruster set. Inertia about the tank center of
/// mass scales with the remaining mass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropellantTank {
    /// initial propellant mass, kg
    pub mass: f64,
    /// structural coordinates
    pub center_of_mass: Vector3<f64>,
    /// at the initial mass, about the tank center of mass
    pub inertia: Matrix3<f64>,
    #[serde(skip)]
    remaining: f64,
}

impl PropellantTank {
    pub fn new(mass: f64, center_of_mass: Vector3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
            remaining: mass,
        }
    }

    /// Uniform sphere of propellant.
    pub fn sphere(mass: f64, center_of_mass: Vector3<f64>, radius: f64) -> Self {
        Self::new(
            mass,
            center_of_mass,
            Matrix3::identity() * 0.4 * mass * radius * radius,
        )
    }

    pub fn remaining(&self) -> f64 {
        self.remaining
    }

    fn scaled_inertia(&self) -> Matrix3<f64> {
        if self.mass > 0.0 {
            self.inertia * (self.remaining / self.mass)
        } else {
            Matrix3::zeros()
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrusterSet {
    pub name: String,
    pub thrusters: Vec<Thruster>,
    /// without a tank propellant is unlimited and massless
    pub tank: Option<PropellantTank>,
}

impl ThrusterSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            thrusters: Vec::new(),
            tank: None,
        }
    }

    pub fn with_thruster(mut self, thruster: Thruster) -> Self {
        self.thrusters.push(thruster);
        self
    }

    pub fn with_tank(mut self, tank: PropellantTank) -> Self {
        self.tank = Some(tank);
        self
    }

    pub fn reset(&mut self) {
        for thruster in &mut self.thrusters {
            thruster.firing = None;
            thruster.step_thrust = 0.0;
        }
        if let Some(tank) = &mut self.tank {
            tank.remaining = tank.mass;
        }
    }

    /// Applies on-time requests (s), one per thruster, at `time_ns`.
    pub fn request(&mut self, time_ns: u64, on_times: &[f64]) {
        for (thruster, on_time) in self.thrusters.iter_mut().zip(on_times) {
            thruster.request(time_ns, *on_time);
        }
    }

    pub fn propellant_remaining(&self) -> Option<f64> {
        self.tank.as_ref().map(|t| t.remaining)
    }

    fn has_propellant(&self) -> bool {
        self.tank.as_ref().is_none_or(|t| t.remaining > 0.0)
    }

    /// Fixes the thrust of every thruster for the step [t0, t0 + dt).
    pub fn prepare_step(&mut self, t0: u64, dt: u64) {
        let fuel = self.has_propellant();
        for thruster in &mut self.thrusters {
            thruster.step_thrust = if fuel {
                thruster.duty(t0, dt) * thruster.max_thrust
            } else {
                0.0
            };
        }
    }

    /// Propellant consumed by the prepared step, kg.
    pub fn step_consumption(&self, dt: u64) -> f64 {
        let dt = nano_to_sec(dt);
        self.thrusters
            .iter()
            .map(|t| t.step_thrust * dt / (t.isp * G0))
            .sum()
    }

    /// Removes the propellant used by a completed step.
    pub fn commit_step(&mut self, dt: u64) {
        let used = self.step_consumption(dt);
        if let Some(tank) = &mut self.tank {
            tank.remaining = (tank.remaining - used).max(0.0);
        }
    }
}

impl Effector for ThrusterSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&mut self) -> Result<(), ConfigurationErrors> {
        if self.thrusters.is_empty() {
            return Err(ThrusterErrors::Empty(self.name.clone()).into());
        }
        for thruster in &mut self.thrusters {
            thruster.validate()?;
        }
        if let Some(tank) = &mut self.tank {
            if !(tank.mass.is_finite() && tank.mass >= 0.0) {
                return Err(ThrusterErrors::NegativePropellant.into());
            }
            if tank.mass > 0.0 {
                check_inertia(&tank.inertia).map_err(ThrusterErrors::TankInertia)?;
            }
            tank.remaining = tank.mass;
        }
        Ok(())
    }

    fn contribute(&self, _t: f64, _dofs: &[f64], _first_dof: usize, assembly: &mut Assembly) {
        for thruster in &self.thrusters {
            if thruster.step_thrust != 0.0 {
                assembly.add_force_at(
                    &thruster.position,
                    &(thruster.step_thrust * thruster.direction),
                );
            }
        }
        if let Some(tank) = &self.tank {
            if tank.remaining > 0.0 {
                assembly.add_body(BodyTerm::rigid(
                    tank.remaining,
                    tank.center_of_mass,
                    tank.scaled_inertia(),
                ));
            }
        }
    }

    fn observable(&self, _t: f64, _dofs: &[f64]) -> Option<(String, Vec<f64>)> {
        let mut values: Vec<f64> = self.thrusters.iter().map(|t| t.step_thrust).collect();
        if let Some(remaining) = self.propellant_remaining() {
            values.push(remaining);
        }
        Some((format!("{}.thrust", self.name), values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    const DT: u64 = 100_000_000;

    fn set() -> ThrusterSet {
        let mut set = ThrusterSet::new("thr")
            .with_thruster(Thruster::new(
                "monarc1",
                Vector3::new(1.0, 0.0, 0.0),
                Vector3::new(0.0, 2.0, 0.0),
                0.9,
                227.5,
            ))
            .with_tank(PropellantTank::sphere(
                40.0,
                Vector3::new(0.0, 0.0, 1.2),
                0.5,
            ));
        set.validate().unwrap();
        set
    }

    #[test]
    fn test_zero_command_is_zero_force() {
        let mut set = set();
        set.request(0, &[0.0]);
        set.prepare_step(0, DT);
        let mut asm = Assembly::new(0);
        set.contribute(0.0, &[], 0, &mut asm);
        assert_eq!(asm.force(), Vector3::zeros());
        assert_eq!(asm.torque(), Vector3::zeros());
        assert_eq!(set.step_consumption(DT), 0.0);
    }

    #[test]
    fn test_force_and_moment_arm() {
        let mut set = set();
        set.request(0, &[10.0]);
        set.prepare_step(0, DT);
        let mut asm = Assembly::new(0);
        set.contribute(0.0, &[], 0, &mut asm);
        assert_abs_diff_eq!(asm.force(), Vector3::new(0.0, 0.9, 0.0), epsilon = 1e-15);
        assert_abs_diff_eq!(asm.torque(), Vector3::new(0.0, 0.0, 0.9), epsilon = 1e-15);
        // the propellant body is reported at its tank location
        assert_eq!(asm.bodies().len(), 1);
        assert_eq!(asm.bodies()[0].mass, 40.0);
    }

    #[test]
    fn test_partial_step_duty() {
        let mut set = set();
        // 0.25 s firing over two 0.1 s steps and half of the third
        set.request(0, &[0.25]);
        let mut thrust = Vec::new();
        for k in 0..4 {
            set.prepare_step(k * DT, DT);
            thrust.push(set.thrusters[0].thrust());
        }
        assert_abs_diff_eq!(thrust[0], 0.9, epsilon = 1e-15);
        assert_abs_diff_eq!(thrust[1], 0.9, epsilon = 1e-15);
        assert_abs_diff_eq!(thrust[2], 0.45, epsilon = 1e-15);
        assert_eq!(thrust[3], 0.0);
        assert!(set.thrusters[0].is_firing(DT));
        assert!(!set.thrusters[0].is_firing(3 * DT));
    }

    #[test]
    fn test_propellant_depletion() {
        let mut set = set();
        set.request(0, &[10.0]);
        set.prepare_step(0, DT);
        let expected = 0.9 * 0.1 / (227.5 * G0);
        assert_abs_diff_eq!(set.step_consumption(DT), expected, epsilon = 1e-18);
        set.commit_step(DT);
        assert_abs_diff_eq!(
            set.propellant_remaining().unwrap(),
            40.0 - expected,
            epsilon = 1e-12
        );

        // an empty tank produces no thrust
        if let Some(tank) = &mut set.tank {
            tank.remaining = 0.0;
        }
        set.prepare_step(DT, DT);
        assert_eq!(set.thrusters[0].thrust(), 0.0);
        set.reset();
        assert_eq!(set.propellant_remaining(), Some(40.0));
    }

    #[test]
    fn test_validation() {
        let mut bad = ThrusterSet::new("thr").with_thruster(Thruster::new(
            "t",
            Vector3::zeros(),
            Vector3::zeros(),
            1.0,
            200.0,
        ));
        assert!(matches!(
            bad.validate(),
            Err(ConfigurationErrors::Thruster(ThrusterErrors::ZeroDirection(_)))
        ));
    }
}
