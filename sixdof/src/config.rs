use std::{fs, path::Path};

use gravity::body::GravityBody;
use mass_properties::MassProperties;
use nalgebra::{Matrix3, Vector3};
use ron::{
    from_str,
    ser::{PrettyConfig, to_string_pretty},
};
use serde::{Deserialize, Serialize};

use crate::{
    ConfigurationErrors, EngineErrors, effector::Subsystem, state::VehicleState,
    time::sec_to_nano,
};

/// Initial position and velocity of the hub center of mass relative to the
/// central body (inertial components), attitude σ_BN and body rate ω_BN.
pub type InitialState = VehicleState;

/// The rigid base body, without any subsystem. Its center of mass is the B
/// origin; subsystem geometry is given in the structural frame, which shares
/// the B axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HubConfig {
    pub mass: f64,
    /// structural coordinates
    pub center_of_mass: Vector3<f64>,
    /// about the hub center of mass, B components
    pub inertia: Matrix3<f64>,
}

impl HubConfig {
    pub fn new(mass: f64, center_of_mass: Vector3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            center_of_mass,
            inertia,
        }
    }

    pub fn mass_properties(&self) -> Result<MassProperties, ConfigurationErrors> {
        Ok(MassProperties::new(
            self.mass,
            self.center_of_mass,
            self.inertia,
        )?)
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self::new(1.0, Vector3::zeros(), Matrix3::identity())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// integration step, ns
    pub dt_ns: u64,
    /// state message period, ns
    pub snapshot_ns: u64,
    /// observable period, ns. `None` disables observables.
    pub observables_ns: Option<u64>,
    pub use_translation: bool,
    pub use_rotation: bool,
    pub use_gravity: bool,
    /// gravity gradient torque from the central body
    pub gravity_gradient: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            dt_ns: 100_000_000,
            snapshot_ns: 100_000_000,
            observables_ns: None,
            use_translation: true,
            use_rotation: true,
            use_gravity: true,
            gravity_gradient: false,
        }
    }
}

impl EngineOptions {
    pub fn with_step(mut self, dt: f64) -> Self {
        self.dt_ns = sec_to_nano(dt);
        self
    }

    pub fn with_snapshot(mut self, period: f64) -> Self {
        self.snapshot_ns = sec_to_nano(period);
        self
    }

    pub fn with_observables(mut self, period: f64) -> Self {
        self.observables_ns = Some(sec_to_nano(period));
        self
    }

    pub fn with_translation(mut self, use_translation: bool) -> Self {
        self.use_translation = use_translation;
        self
    }

    pub fn with_rotation(mut self, use_rotation: bool) -> Self {
        self.use_rotation = use_rotation;
        self
    }

    pub fn with_gravity(mut self, use_gravity: bool) -> Self {
        self.use_gravity = use_gravity;
        self
    }

    pub fn with_gravity_gradient(mut self, gravity_gradient: bool) -> Self {
        self.gravity_gradient = gravity_gradient;
        self
    }

    /// Whether the central body is needed for the translational equations.
    pub fn needs_gravity(&self) -> bool {
        self.use_translation && self.use_gravity
    }

    pub fn validate(&self) -> Result<(), ConfigurationErrors> {
        if self.dt_ns == 0 {
            return Err(ConfigurationErrors::ZeroTimeStep);
        }
        for period in std::iter::once(self.snapshot_ns).chain(self.observables_ns) {
            if period == 0 || period % self.dt_ns != 0 {
                return Err(ConfigurationErrors::SnapshotCadence {
                    dt_ns: self.dt_ns,
                    snapshot_ns: period,
                });
            }
        }
        Ok(())
    }
}

/// Everything needed to build an engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VehicleConfig {
    pub hub: HubConfig,
    pub initial: InitialState,
    pub options: EngineOptions,
    pub gravity_bodies: Vec<GravityBody>,
    pub subsystems: Vec<Subsystem>,
}

impl VehicleConfig {
    pub fn new(hub: HubConfig, initial: InitialState) -> Self {
        Self {
            hub,
            initial,
            ..Default::default()
        }
    }

    pub fn with_options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_gravity_body(mut self, body: GravityBody) -> Self {
        self.gravity_bodies.push(body);
        self
    }

    pub fn with_subsystem(mut self, subsystem: impl Into<Subsystem>) -> Self {
        self.subsystems.push(subsystem.into());
        self
    }

    pub fn load(path: &Path) -> Result<Self, EngineErrors> {
        let contents = fs::read_to_string(path)?;
        Ok(from_str(&contents)?)
    }

    pub fn save(&self, path: &Path) -> Result<(), EngineErrors> {
        let ron_string = to_string_pretty(self, PrettyConfig::new())?;
        fs::write(path, ron_string)?;
        Ok(())
    }
}
