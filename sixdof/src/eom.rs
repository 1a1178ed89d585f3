//! The composite vector field evaluated by the integrator.

use gravity::{body::GravityField, gravity_gradient_torque};
use mass_properties::MassProperties;
use nalgebra::{Matrix3, Vector3};
use sixdof_diffeq::{OdeModel, StateVector};

use crate::{
    EngineErrors, NumericalErrors,
    config::EngineOptions,
    dynamics::{Assembly, BodyTerm, Observables, RigidBodyDynamics, SolveFlags},
    effector::{Effector, Subsystem},
    state::{OMEGA, POSITION, SIGMA, StateLayout, VELOCITY, VehicleState},
};

/// Collects the hub and every subsystem's bodies and loads at time `t`, with
/// the B origin at the hub center of mass.
pub(crate) fn assemble(
    hub: &MassProperties,
    subsystems: &[Subsystem],
    layout: &StateLayout,
    t: f64,
    x: &[f64],
    assembly: &mut Assembly,
) {
    assembly.clear();
    assembly.set_origin(hub.center_of_mass);
    assembly.add_body(BodyTerm::rigid(hub.mass, hub.center_of_mass, hub.inertia));
    for (i, subsystem) in subsystems.iter().enumerate() {
        subsystem.contribute(
            t,
            layout.subsystem_slice(x, i),
            layout.first_dof(i),
            assembly,
        );
    }
}

/// Energy and momentum of an assembled vehicle. With translation frozen the
/// composite center of mass is taken to be at rest.
pub(crate) fn observables(
    assembly: &Assembly,
    subsystems: &[Subsystem],
    layout: &StateLayout,
    x: &[f64],
    options: &EngineOptions,
) -> Result<Observables, NumericalErrors> {
    let state = VehicleState::read(x);
    let omega = if options.use_rotation {
        state.omega
    } else {
        Vector3::zeros()
    };
    let v_b = if options.use_translation {
        state.sigma.dcm() * state.velocity
    } else {
        let mut momentum = Vector3::zeros();
        let mut mass = 0.0;
        for body in assembly.bodies() {
            momentum += body.mass * (omega.cross(&body.position) + body.velocity);
            mass += body.mass;
        }
        -momentum / mass
    };
    let spring_energy = subsystems
        .iter()
        .enumerate()
        .map(|(i, s)| s.spring_energy(layout.subsystem_slice(x, i)))
        .sum();
    Observables::compute(assembly, &v_b, &omega, spring_energy)
}

/// Borrows the engine's configuration and scratch space for one step.
pub(crate) struct Eom<'a> {
    pub hub: &'a MassProperties,
    pub subsystems: &'a [Subsystem],
    pub layout: &'a StateLayout,
    pub gravity: &'a GravityField,
    pub options: &'a EngineOptions,
    pub assembly: &'a mut Assembly,
    pub dynamics: &'a mut RigidBodyDynamics,
}

impl Eom<'_> {
    /// Field per unit mass at the B origin, B components, plus the gravity
    /// gradient torque on the composite body.
    fn gravity_loads(
        &self,
        state: &VehicleState,
        dcm_bn: &Matrix3<f64>,
    ) -> Result<(Vector3<f64>, Vector3<f64>), NumericalErrors> {
        if !self.options.needs_gravity() {
            return Ok((Vector3::zeros(), Vector3::zeros()));
        }
        let g_b = dcm_bn * self.gravity.acceleration(&state.position)?;
        let torque = if self.options.gravity_gradient && self.options.use_rotation {
            let mu = self.gravity.central()?.mu();
            let composite = self.assembly.mass_properties()?;
            gravity_gradient_torque(mu, &(dcm_bn * state.position), &composite.inertia)?
        } else {
            Vector3::zeros()
        };
        Ok((g_b, torque))
    }
}

impl OdeModel for Eom<'_> {
    type Error = EngineErrors;

    fn f(
        &mut self,
        t: f64,
        x: &StateVector,
        dx: &mut StateVector,
    ) -> Result<(), EngineErrors> {
        let state = VehicleState::read(x);
        let rotation = self.options.use_rotation;
        if rotation {
            state.sigma.check().map_err(NumericalErrors::from)?;
        }
        let omega = if rotation {
            state.omega
        } else {
            Vector3::zeros()
        };
        let dcm_bn = state.sigma.dcm();

        assemble(self.hub, self.subsystems, self.layout, t, x, self.assembly);
        let (gravity, gradient_torque) = self.gravity_loads(&state, &dcm_bn)?;
        self.assembly.add_torque(&gradient_torque);

        self.dynamics.assemble(self.assembly, &omega, &gravity);
        let acc = self.dynamics.solve(SolveFlags { rotation })?;

        dx.clear();
        if self.options.use_translation {
            dx[POSITION].copy_from_slice(state.velocity.as_slice());
            let a_n = dcm_bn.transpose() * acc.linear;
            dx[VELOCITY].copy_from_slice(a_n.as_slice());
        }
        if rotation {
            let sigma_dot = state.sigma.derivative(&omega).map_err(NumericalErrors::from)?;
            dx[SIGMA].copy_from_slice(sigma_dot.as_slice());
            dx[OMEGA].copy_from_slice(acc.angular.as_slice());
        }
        for (k, accel) in acc.dofs.iter().enumerate() {
            let i = StateLayout::dof_offset(k);
            dx[i] = x[i + 1];
            dx[i + 1] = *accel;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prelude::*;
    use approx::assert_abs_diff_eq;
    use gravity::body::GravityBody;

    fn hub() -> MassProperties {
        MassProperties::new(
            750.0,
            Vector3::new(0.0, 0.0, 1.0),
            Matrix3::from_diagonal(&Vector3::new(900.0, 800.0, 600.0)),
        )
        .unwrap()
    }

    fn earth() -> GravityField {
        let mut field = GravityField::new();
        field
            .add(
                GravityBody::new(
                    "earth",
                    Gravity::Newtonian(NewtonianGravity::new(3.986004415e14)),
                )
                .with_central(true),
            )
            .unwrap();
        field
    }

    #[test]
    fn test_point_mass_orbit_derivative() {
        let hub = hub();
        let layout = StateLayout::new([]);
        let field = earth();
        let options = EngineOptions::default();
        let mut assembly = Assembly::new(0);
        let mut dynamics = RigidBodyDynamics::new(0);
        let mut eom = Eom {
            hub: &hub,
            subsystems: &[],
            layout: &layout,
            gravity: &field,
            options: &options,
            assembly: &mut assembly,
            dynamics: &mut dynamics,
        };

        let state = VehicleState {
            position: Vector3::new(7.0e6, 0.0, 0.0),
            velocity: Vector3::new(0.0, 7.5e3, 0.0),
            ..Default::default()
        };
        let mut x = layout.zeros();
        state.write(&mut x);
        let mut dx = layout.zeros();
        eom.f(0.0, &x, &mut dx).unwrap();

        assert_eq!(dx[0..3], [0.0, 7.5e3, 0.0]);
        // the state tracks the hub center of mass, so a bare hub is a point mass
        let expected = -3.986004415e14 * state.position / state.position.norm().powi(3);
        assert_abs_diff_eq!(
            Vector3::from_column_slice(&dx[3..6]),
            expected,
            epsilon = 1e-10
        );
        assert_eq!(dx[6..9], [0.0; 3]);
        assert_abs_diff_eq!(
            Vector3::from_column_slice(&dx[9..12]),
            Vector3::zeros(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_frozen_blocks_have_zero_rate() {
        let hub = hub();
        let layout = StateLayout::new([]);
        let field = GravityField::new();
        let options = EngineOptions::default()
            .with_translation(false)
            .with_rotation(false);
        let mut assembly = Assembly::new(0);
        let mut dynamics = RigidBodyDynamics::new(0);
        let mut eom = Eom {
            hub: &hub,
            subsystems: &[],
            layout: &layout,
            gravity: &field,
            options: &options,
            assembly: &mut assembly,
            dynamics: &mut dynamics,
        };
        let state = VehicleState {
            position: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::new(4.0, 5.0, 6.0),
            sigma: rotations::prelude::Mrp::new(0.1, 0.2, -0.3),
            omega: Vector3::new(0.001, -0.01, 0.03),
        };
        let mut x = layout.zeros();
        state.write(&mut x);
        let mut dx = layout.zeros();
        eom.f(0.0, &x, &mut dx).unwrap();
        assert!(dx.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_singular_attitude_is_numerical_error() {
        let hub = hub();
        let layout = StateLayout::new([]);
        let field = GravityField::new();
        let options = EngineOptions::default().with_gravity(false);
        let mut assembly = Assembly::new(0);
        let mut dynamics = RigidBodyDynamics::new(0);
        let mut eom = Eom {
            hub: &hub,
            subsystems: &[],
            layout: &layout,
            gravity: &field,
            options: &options,
            assembly: &mut assembly,
            dynamics: &mut dynamics,
        };
        let state = VehicleState {
            sigma: rotations::prelude::Mrp::new(1.0e4, 0.0, 0.0),
            ..Default::default()
        };
        let mut x = layout.zeros();
        state.write(&mut x);
        let mut dx = layout.zeros();
        let result = eom.f(0.0, &x, &mut dx);
        assert!(matches!(
            result,
            Err(EngineErrors::Numerical(NumericalErrors::Attitude(_)))
        ));
    }

    #[test]
    fn test_observables_with_frozen_translation() {
        let hub = hub();
        let layout = StateLayout::new([]);
        let options = EngineOptions::default().with_translation(false);
        let state = VehicleState {
            velocity: Vector3::new(100.0, 0.0, 0.0),
            omega: Vector3::new(0.1, 0.0, 0.0),
            ..Default::default()
        };
        let mut x = layout.zeros();
        state.write(&mut x);
        let mut assembly = Assembly::new(0);
        assemble(&hub, &[], &layout, 0.0, &x, &mut assembly);
        let obs = observables(&assembly, &[], &layout, &x, &options).unwrap();
        // the frozen velocity is ignored, only the spin about the center of mass remains
        assert_abs_diff_eq!(obs.total_energy, 0.5 * 900.0 * 0.01, epsilon = 1e-12);
        assert_abs_diff_eq!(obs.rotational_energy, obs.total_energy, epsilon = 1e-12);
    }
}
