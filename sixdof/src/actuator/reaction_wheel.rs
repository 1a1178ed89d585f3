use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{transverse_axes, unit_axis};
use crate::{
    ConfigurationErrors,
    dynamics::{Assembly, BodyTerm, DofPartial},
    effector::Effector,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ReactionWheelErrors {
    #[error("reaction wheel set '{0}' has no wheels")]
    Empty(String),
    #[error("wheel '{0}' has a negative imbalance")]
    NegativeImbalance(String),
    #[error("wheel '{0}' mass cannot be negative")]
    NegativeMass(String),
    #[error("wheel '{0}' transverse inertia cannot be negative")]
    NegativeTransverseInertia(String),
    #[error("wheel '{0}' has a non-finite parameter")]
    NotFinite(String),
    #[error("wheel '{0}' spin inertia must be greater than 0")]
    SmallInertia(String),
    #[error("wheel '{0}' spin axis has zero length")]
    ZeroSpinAxis(String),
}

/// Simple imbalance model parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Imbalance {
    /// static imbalance U_s, kg·m
    pub static_imbalance: f64,
    /// dynamic imbalance U_d, kg·m²
    pub dynamic_imbalance: f64,
}

/// A wheel bound that was exceeded. Reported only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WheelLimit {
    /// commanded torque above `max_torque`
    Torque { commanded: f64, limit: f64 },
    /// spin momentum above `max_momentum`
    Momentum { momentum: f64, limit: f64 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionWheel {
    pub name: String,
    /// spin axis ĝ, B components
    pub spin_axis: Vector3<f64>,
    /// wheel center of mass, structural coordinates
    pub position: Vector3<f64>,
    /// Js, kg·m²
    pub spin_inertia: f64,
    /// Jt, kg·m²
    pub transverse_inertia: f64,
    pub mass: f64,
    /// spin rate relative to the hub, rad/s
    pub initial_speed: f64,
    pub initial_angle: f64,
    pub imbalance: Option<Imbalance>,
    pub max_torque: Option<f64>,
    pub max_momentum: Option<f64>,
    #[serde(skip)]
    motor_torque: f64,
}

impl ReactionWheel {
    pub fn new(name: &str, spin_axis: Vector3<f64>, spin_inertia: f64) -> Self {
        Self {
            name: name.to_string(),
            spin_axis,
            position: Vector3::zeros(),
            spin_inertia,
            transverse_inertia: 0.0,
            mass: 0.0,
            initial_speed: 0.0,
            initial_angle: 0.0,
            imbalance: None,
            max_torque: None,
            max_momentum: None,
            motor_torque: 0.0,
        }
    }

    pub fn with_position(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    pub fn with_mass(mut self, mass: f64, transverse_inertia: f64) -> Self {
        self.mass = mass;
        self.transverse_inertia = transverse_inertia;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.initial_speed = speed;
        self
    }

    pub fn with_imbalance(mut self, static_imbalance: f64, dynamic_imbalance: f64) -> Self {
        self.imbalance = Some(Imbalance {
            static_imbalance,
            dynamic_imbalance,
        });
        self
    }

    pub fn with_max_torque(mut self, max_torque: f64) -> Self {
        self.max_torque = Some(max_torque);
        self
    }

    pub fn with_max_momentum(mut self, max_momentum: f64) -> Self {
        self.max_momentum = Some(max_momentum);
        self
    }

    pub fn motor_torque(&self) -> f64 {
        self.motor_torque
    }

    fn validate(&mut self) -> Result<(), ReactionWheelErrors> {
        let finite = [
            self.spin_inertia,
            self.transverse_inertia,
            self.mass,
            self.initial_speed,
            self.initial_angle,
        ]
        .iter()
        .chain(self.position.iter())
        .all(|x| x.is_finite());
        if !finite {
            return Err(ReactionWheelErrors::NotFinite(self.name.clone()));
        }
        self.spin_axis = unit_axis(&self.spin_axis)
            .ok_or_else(|| ReactionWheelErrors::ZeroSpinAxis(self.name.clone()))?;
        if self.spin_inertia <= f64::EPSILON {
            return Err(ReactionWheelErrors::SmallInertia(self.name.clone()));
        }
        if self.transverse_inertia < 0.0 {
            return Err(ReactionWheelErrors::NegativeTransverseInertia(
                self.name.clone(),
            ));
        }
        if self.mass < 0.0 {
            return Err(ReactionWheelErrors::NegativeMass(self.name.clone()));
        }
        if let Some(imbalance) = &self.imbalance {
            if imbalance.static_imbalance < 0.0 || imbalance.dynamic_imbalance < 0.0 {
                return Err(ReactionWheelErrors::NegativeImbalance(self.name.clone()));
            }
        }
        Ok(())
    }

    /// Inertia about the wheel center of mass, B components.
    pub fn inertia(&self) -> Matrix3<f64> {
        let ggt = self.spin_axis * self.spin_axis.transpose();
        self.spin_inertia * ggt + self.transverse_inertia * (Matrix3::identity() - ggt)
    }

    /// Force and torque about the structural origin from the wheel imbalance
    /// at spin angle `angle` and rate `speed`.
    pub fn jitter(&self, angle: f64, speed: f64) -> (Vector3<f64>, Vector3<f64>) {
        let Some(imbalance) = &self.imbalance else {
            return (Vector3::zeros(), Vector3::zeros());
        };
        let (w2, w3) = transverse_axes(&self.spin_axis);
        let u = angle.cos() * w2 + angle.sin() * w3;
        let omega2 = speed * speed;
        let force = imbalance.static_imbalance * omega2 * u;
        let torque = self.position.cross(&force) + imbalance.dynamic_imbalance * omega2 * u;
        (force, torque)
    }

    /// Bounds exceeded at the current command and spin rate.
    pub fn check_limits(&self, speed: f64) -> Vec<WheelLimit> {
        let mut violations = Vec::new();
        if let Some(limit) = self.max_torque {
            if self.motor_torque.abs() > limit {
                violations.push(WheelLimit::Torque {
                    commanded: self.motor_torque,
                    limit,
                });
            }
        }
        if let Some(limit) = self.max_momentum {
            let momentum = self.spin_inertia * speed;
            if momentum.abs() > limit {
                violations.push(WheelLimit::Momentum { momentum, limit });
            }
        }
        violations
    }
}

/// A set of reaction wheels commanded together. With speed dynamics each
/// wheel owns a [spin angle, spin rate] pair; without, wheel speeds are held
/// at their initial values and motor torque acts directly on the hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionWheelSet {
    pub name: String,
    pub wheels: Vec<ReactionWheel>,
    pub speed_dynamics: bool,
}

impl ReactionWheelSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            wheels: Vec::new(),
            speed_dynamics: true,
        }
    }

    pub fn with_wheel(mut self, wheel: ReactionWheel) -> Self {
        self.wheels.push(wheel);
        self
    }

    pub fn with_speed_dynamics(mut self, speed_dynamics: bool) -> Self {
        self.speed_dynamics = speed_dynamics;
        self
    }

    pub fn reset(&mut self) {
        self.wheels.iter_mut().for_each(|w| w.motor_torque = 0.0);
    }

    /// Sets the motor torque of every wheel, N·m.
    pub fn set_torques(&mut self, torques: &[f64]) {
        for (wheel, torque) in self.wheels.iter_mut().zip(torques) {
            wheel.motor_torque = *torque;
        }
    }

    /// Spin angle and rate of wheel `i`.
    fn wheel_state(&self, i: usize, t: f64, dofs: &[f64]) -> (f64, f64) {
        if self.speed_dynamics {
            (dofs[2 * i], dofs[2 * i + 1])
        } else {
            let w = &self.wheels[i];
            (w.initial_angle + w.initial_speed * t, w.initial_speed)
        }
    }

    pub fn speeds(&self, t: f64, dofs: &[f64]) -> Vec<f64> {
        (0..self.wheels.len())
            .map(|i| self.wheel_state(i, t, dofs).1)
            .collect()
    }

    /// Bounds exceeded by any wheel, with the wheel name.
    pub fn check_limits(&self, t: f64, dofs: &[f64]) -> Vec<(String, WheelLimit)> {
        self.wheels
            .iter()
            .enumerate()
            .flat_map(|(i, w)| {
                let speed = self.wheel_state(i, t, dofs).1;
                w.check_limits(speed)
                    .into_iter()
                    .map(|limit| (w.name.clone(), limit))
            })
            .collect()
    }
}

impl Effector for ReactionWheelSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&mut self) -> Result<(), ConfigurationErrors> {
        if self.wheels.is_empty() {
            return Err(ReactionWheelErrors::Empty(self.name.clone()).into());
        }
        for wheel in &mut self.wheels {
            wheel.validate()?;
        }
        Ok(())
    }

    fn dof_count(&self) -> usize {
        if self.speed_dynamics {
            self.wheels.len()
        } else {
            0
        }
    }

    fn initial_dofs(&self, dofs: &mut [f64]) {
        if self.speed_dynamics {
            for (pair, wheel) in dofs.chunks_exact_mut(2).zip(&self.wheels) {
                pair[0] = wheel.initial_angle;
                pair[1] = wheel.initial_speed;
            }
        }
    }

    fn contribute(&self, t: f64, dofs: &[f64], first_dof: usize, assembly: &mut Assembly) {
        for (i, wheel) in self.wheels.iter().enumerate() {
            let g = wheel.spin_axis;
            let (angle, speed) = self.wheel_state(i, t, dofs);
            let mut body = BodyTerm::rigid(wheel.mass, wheel.position, wheel.inertia());
            body.omega_rel = speed * g;
            if self.speed_dynamics {
                body = body.with_partial(DofPartial {
                    index: first_dof + i,
                    translation: Vector3::zeros(),
                    rotation: g,
                });
                // motor torque on the rotor, reaction on the hub
                assembly.add_generalized_force(first_dof + i, wheel.motor_torque);
            } else {
                assembly.add_torque(&(-wheel.motor_torque * g));
            }
            assembly.add_body(body);

            if wheel.imbalance.is_some() {
                let (force, torque) = wheel.jitter(angle, speed);
                assembly.add_wrench(&force, &torque);
            }
        }
    }

    fn observable(&self, t: f64, dofs: &[f64]) -> Option<(String, Vec<f64>)> {
        Some((format!("{}.wheel_speed", self.name), self.speeds(t, dofs)))
    }
}
