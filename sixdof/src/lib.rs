//! Six degree of freedom spacecraft dynamics: a rigid hub with reaction
//! wheels, thrusters, hinged panels and fuel slosh particles, integrated with
//! a fixed-step Runge-Kutta scheme.

pub mod actuator;
pub mod appendage;
pub mod commands;
pub mod config;
pub mod dynamics;
pub mod effector;
pub mod engine;
pub mod ephemeris;
pub mod eom;
pub mod state;
pub mod time;

use gravity::GravityErrors;
use mass_properties::MassPropertiesErrors;
use rotations::prelude::MrpErrors;
use sixdof_diffeq::OdeErrors;
use sixdof_result::ResultErrors;
use thiserror::Error;

use actuator::{reaction_wheel::ReactionWheelErrors, thruster::ThrusterErrors};
use appendage::{fuel_slosh::FuelSloshErrors, hinged_panel::HingedPanelErrors};
use engine::Stage;

pub mod prelude {
    pub use crate::actuator::reaction_wheel::{Imbalance, ReactionWheel, ReactionWheelSet};
    pub use crate::actuator::thruster::{PropellantTank, Thruster, ThrusterSet};
    pub use crate::appendage::fuel_slosh::{FuelTank, SloshParticle};
    pub use crate::appendage::hinged_panel::{HingedPanel, PanelSet};
    pub use crate::commands::{Command, CommandChannel, CommandSource, NoCommands};
    pub use crate::config::{EngineOptions, HubConfig, InitialState, VehicleConfig};
    pub use crate::dynamics::Observables;
    pub use crate::effector::Subsystem;
    pub use crate::engine::{DynamicsEngine, Stage};
    pub use crate::ephemeris::{Ephemeris, StaticEphemeris};
    pub use crate::state::VehicleState;
    pub use crate::time::{nano_to_sec, sec_to_nano};
    pub use crate::{ConfigurationErrors, EngineErrors, NumericalErrors};
    pub use gravity::{
        Gravity, body::GravityBody, newtonian::NewtonianGravity, zonal::J2Gravity,
    };
    pub use sixdof_result::{CsvSink, MemoryLog, MessageSink, NullSink, StateMessage};
}

/// Problems with the vehicle description or with the order of engine calls.
/// Raised before any integration happens.
#[derive(Debug, Error)]
pub enum ConfigurationErrors {
    #[error("subsystems can only be attached while configuring (engine is {0:?})")]
    AttachAfterInitialize(Stage),
    #[error("command for '{name}' has {found} values, expected {expected}")]
    CommandLength {
        name: String,
        expected: usize,
        found: usize,
    },
    #[error("{0}")]
    FuelSlosh(#[from] FuelSloshErrors),
    #[error("{0}")]
    Gravity(#[from] GravityErrors),
    #[error("{0}")]
    HingedPanel(#[from] HingedPanelErrors),
    #[error("cannot {action} while the engine is {stage:?}")]
    InvalidStage { action: &'static str, stage: Stage },
    #[error("hub mass properties: {0}")]
    MassProperties(#[from] MassPropertiesErrors),
    #[error("translation with gravity requires a central body")]
    MissingCentralBody,
    #[error("the name '{0}' is already taken")]
    NameTaken(String),
    #[error("{0}")]
    ReactionWheel(#[from] ReactionWheelErrors),
    #[error("snapshot period ({snapshot_ns} ns) must be a positive multiple of the step ({dt_ns} ns)")]
    SnapshotCadence { dt_ns: u64, snapshot_ns: u64 },
    #[error("initial attitude: {0}")]
    InitialAttitude(MrpErrors),
    #[error("{0}")]
    Thruster(#[from] ThrusterErrors),
    #[error("time step cannot be 0")]
    ZeroTimeStep,
}

/// Failures while evaluating the equations of motion. The step that raised
/// one is discarded.
#[derive(Debug, Error)]
pub enum NumericalErrors {
    #[error("attitude: {0}")]
    Attitude(#[from] MrpErrors),
    #[error("gravity: {0}")]
    Gravity(#[from] GravityErrors),
    #[error("composite mass properties: {0}")]
    MassProperties(#[from] MassPropertiesErrors),
    #[error("mass matrix is not positive definite")]
    MassMatrixNotPositiveDefinite,
    #[error("{0}")]
    Ode(#[from] OdeErrors),
}

#[derive(Debug, Error)]
pub enum EngineErrors {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationErrors),
    #[error("numerical error: {0}")]
    Numerical(#[from] NumericalErrors),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("result error: {0}")]
    Result(#[from] ResultErrors),
    #[error("ron error: {0}")]
    Ron(#[from] ron::Error),
    #[error("ron parse error: {0}")]
    RonParse(#[from] ron::error::SpannedError),
}

impl From<OdeErrors> for EngineErrors {
    fn from(e: OdeErrors) -> Self {
        EngineErrors::Numerical(NumericalErrors::Ode(e))
    }
}

impl EngineErrors {
    pub fn is_numerical(&self) -> bool {
        matches!(self, EngineErrors::Numerical(_))
    }
}
