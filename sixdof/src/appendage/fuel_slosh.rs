use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{check_oscillator, spring_damper, spring_energy};
use crate::{
    ConfigurationErrors,
    actuator::unit_axis,
    dynamics::{Assembly, BodyTerm, DofPartial},
    effector::Effector,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum FuelSloshErrors {
    #[error("fuel tank '{0}' has no slosh particles")]
    Empty(String),
    #[error("slosh particle '{0}' has an invalid {1}")]
    InvalidParameter(String, &'static str),
    #[error("fuel tank '{0}' static mass cannot be negative")]
    NegativeStaticMass(String),
    #[error("slosh particle '{0}' direction has zero length")]
    ZeroDirection(String),
}

/// Point mass sliding along a fixed direction in the tank, held by a spring
/// and damper at its equilibrium position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SloshParticle {
    pub name: String,
    pub mass: f64,
    /// N/m
    pub stiffness: f64,
    /// N·s/m
    pub damping: f64,
    /// equilibrium position relative to the tank, r_PT
    pub position: Vector3<f64>,
    /// slosh direction p̂, B components
    pub direction: Vector3<f64>,
    pub rho0: f64,
    pub rho_dot0: f64,
}

impl SloshParticle {
    pub fn new(name: &str, mass: f64, position: Vector3<f64>, direction: Vector3<f64>) -> Self {
        Self {
            name: name.to_string(),
            mass,
            stiffness: 0.0,
            damping: 0.0,
            position,
            direction,
            rho0: 0.0,
            rho_dot0: 0.0,
        }
    }

    pub fn with_spring(mut self, stiffness: f64, damping: f64) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    pub fn with_initial(mut self, rho: f64, rho_dot: f64) -> Self {
        self.rho0 = rho;
        self.rho_dot0 = rho_dot;
        self
    }

    fn validate(&mut self) -> Result<(), FuelSloshErrors> {
        if let Some(param) = check_oscillator(self.mass, self.stiffness, self.damping) {
            return Err(FuelSloshErrors::InvalidParameter(self.name.clone(), param));
        }
        if !(self.rho0.is_finite() && self.rho_dot0.is_finite()) {
            return Err(FuelSloshErrors::InvalidParameter(
                self.name.clone(),
                "initial condition",
            ));
        }
        self.direction = unit_axis(&self.direction)
            .ok_or_else(|| FuelSloshErrors::ZeroDirection(self.name.clone()))?;
        Ok(())
    }
}

/// A tank with a static fluid mass at its reference point and any number of
/// slosh particles. Each particle owns a [ρ, ρ̇] pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FuelTank {
    pub name: String,
    /// tank reference point, structural coordinates
    pub position: Vector3<f64>,
    /// fluid that does not slosh, kg
    pub static_mass: f64,
    pub particles: Vec<SloshParticle>,
}

impl FuelTank {
    pub fn new(name: &str, position: Vector3<f64>, static_mass: f64) -> Self {
        Self {
            name: name.to_string(),
            position,
            static_mass,
            particles: Vec::new(),
        }
    }

    pub fn with_particle(mut self, particle: SloshParticle) -> Self {
        self.particles.push(particle);
        self
    }

    /// Particle position at displacement `rho`, structural coordinates.
    pub fn particle_position(&self, index: usize, rho: f64) -> Option<Vector3<f64>> {
        self.particles
            .get(index)
            .map(|p| self.position + p.position + rho * p.direction)
    }
}

impl Effector for FuelTank {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&mut self) -> Result<(), ConfigurationErrors> {
        if self.particles.is_empty() {
            return Err(FuelSloshErrors::Empty(self.name.clone()).into());
        }
        if !(self.static_mass.is_finite() && self.static_mass >= 0.0) {
            return Err(FuelSloshErrors::NegativeStaticMass(self.name.clone()).into());
        }
        for particle in &mut self.particles {
            particle.validate()?;
        }
        Ok(())
    }

    fn dof_count(&self) -> usize {
        self.particles.len()
    }

    fn initial_dofs(&self, dofs: &mut [f64]) {
        for (pair, particle) in dofs.chunks_exact_mut(2).zip(&self.particles) {
            pair[0] = particle.rho0;
            pair[1] = particle.rho_dot0;
        }
    }

    fn contribute(&self, _t: f64, dofs: &[f64], first_dof: usize, assembly: &mut Assembly) {
        if self.static_mass > 0.0 {
            assembly.add_body(BodyTerm::point(self.static_mass, self.position));
        }
        for (i, (p, pair)) in self.particles.iter().zip(dofs.chunks_exact(2)).enumerate() {
            let (rho, rho_dot) = (pair[0], pair[1]);
            let mut body = BodyTerm::point(p.mass, self.position + p.position + rho * p.direction);
            body.velocity = rho_dot * p.direction;
            assembly.add_body(body.with_partial(DofPartial {
                index: first_dof + i,
                translation: p.direction,
                rotation: Vector3::zeros(),
            }));
            assembly.add_generalized_force(
                first_dof + i,
                spring_damper(p.stiffness, p.damping, rho, rho_dot),
            );
        }
    }

    fn spring_energy(&self, dofs: &[f64]) -> f64 {
        self.particles
            .iter()
            .zip(dofs.chunks_exact(2))
            .map(|(p, pair)| spring_energy(p.stiffness, pair[0]))
            .sum()
    }

    fn observable(&self, _t: f64, dofs: &[f64]) -> Option<(String, Vec<f64>)> {
        let rho = dofs.chunks_exact(2).map(|pair| pair[0]).collect();
        Some((format!("{}.rho", self.name), rho))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn tank() -> FuelTank {
        FuelTank::new("tank", Vector3::zeros(), 45.0)
            .with_particle(
                SloshParticle::new("p1", 10.0, Vector3::new(0.1, 0.0, -0.1), Vector3::x())
                    .with_spring(100.0, 0.0)
                    .with_initial(0.05, 0.0),
            )
            .with_particle(
                SloshParticle::new("p2", 20.0, Vector3::new(0.0, 0.0, 0.1), Vector3::y())
                    .with_spring(100.0, 0.0)
                    .with_initial(-0.025, 0.0),
            )
            .with_particle(
                SloshParticle::new("p3", 15.0, Vector3::new(-0.1, 0.0, 0.1), Vector3::z())
                    .with_spring(100.0, 0.0)
                    .with_initial(-0.015, 0.0),
            )
    }

    #[test]
    fn test_contribution() {
        let mut tank = tank();
        tank.validate().unwrap();
        assert_eq!(tank.dof_count(), 3);
        let mut dofs = vec![0.0; 6];
        tank.initial_dofs(&mut dofs);
        assert_eq!(dofs, vec![0.05, 0.0, -0.025, 0.0, -0.015, 0.0]);

        let mut asm = Assembly::new(3);
        tank.contribute(0.0, &dofs, 0, &mut asm);
        // static mass plus one point per particle
        assert_eq!(asm.bodies().len(), 4);
        assert_abs_diff_eq!(
            asm.bodies()[1].position,
            Vector3::new(0.15, 0.0, -0.1),
            epsilon = 1e-15
        );
        assert_abs_diff_eq!(asm.generalized()[0], -5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(asm.generalized()[1], 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(asm.generalized()[2], 1.5, epsilon = 1e-12);

        let mp = asm.mass_properties().unwrap();
        assert_abs_diff_eq!(mp.mass, 90.0, epsilon = 1e-12);
    }

    #[test]
    fn test_zero_displacement_zero_force() {
        let mut tank = FuelTank::new("tank", Vector3::new(0.0, 0.0, 1.0), 0.0).with_particle(
            SloshParticle::new("p", 5.0, Vector3::zeros(), Vector3::new(0.0, 0.0, 3.0))
                .with_spring(50.0, 2.0),
        );
        tank.validate().unwrap();
        assert_eq!(tank.particles[0].direction, Vector3::z());
        let dofs = vec![0.0; 2];
        let mut asm = Assembly::new(1);
        tank.contribute(0.0, &dofs, 0, &mut asm);
        assert_eq!(asm.generalized(), &[0.0]);
        assert_eq!(tank.spring_energy(&dofs), 0.0);
        assert_eq!(tank.particle_position(0, 0.0), Some(Vector3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_spring_energy() {
        let tank = tank();
        let dofs = [0.05, 0.0, -0.025, 0.0, -0.015, 0.0];
        let expected = 50.0 * (0.05f64.powi(2) + 0.025f64.powi(2) + 0.015f64.powi(2));
        assert_abs_diff_eq!(tank.spring_energy(&dofs), expected, epsilon = 1e-15);
        let (name, rho) = tank.observable(0.0, &dofs).unwrap();
        assert_eq!(name, "tank.rho");
        assert_eq!(rho, vec![0.05, -0.025, -0.015]);
    }

    #[test]
    fn test_validation() {
        let mut tank = FuelTank::new("tank", Vector3::zeros(), 1.0).with_particle(
            SloshParticle::new("p", 1.0, Vector3::zeros(), Vector3::zeros()),
        );
        assert!(matches!(
            tank.validate(),
            Err(ConfigurationErrors::FuelSlosh(FuelSloshErrors::ZeroDirection(_)))
        ));
        let mut tank = FuelTank::new("tank", Vector3::zeros(), -1.0)
            .with_particle(SloshParticle::new("p", 1.0, Vector3::zeros(), Vector3::x()));
        assert!(matches!(
            tank.validate(),
            Err(ConfigurationErrors::FuelSlosh(FuelSloshErrors::NegativeStaticMass(_)))
        ));
    }
}
