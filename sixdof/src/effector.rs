use serde::{Deserialize, Serialize};

use crate::{
    ConfigurationErrors,
    actuator::{reaction_wheel::ReactionWheelSet, thruster::ThrusterSet},
    appendage::{fuel_slosh::FuelTank, hinged_panel::PanelSet},
    dynamics::Assembly,
};

/// Something attached to the hub that adds bodies, loads or degrees of freedom.
pub trait Effector {
    fn name(&self) -> &str;

    /// Checks the parameters and normalizes direction vectors.
    fn validate(&mut self) -> Result<(), ConfigurationErrors>;

    /// Number of [value, rate] pairs this effector owns in the composite state.
    fn dof_count(&self) -> usize {
        0
    }

    /// Writes the initial [value, rate] pairs.
    fn initial_dofs(&self, _dofs: &mut [f64]) {}

    /// Reports bodies and loads for time `t` (s) and the current dof pairs.
    /// `first_dof` is the global index of this effector's first dof.
    fn contribute(&self, t: f64, dofs: &[f64], first_dof: usize, assembly: &mut Assembly);

    /// Energy stored in springs, J.
    fn spring_energy(&self, _dofs: &[f64]) -> f64 {
        0.0
    }

    /// Named per-subsystem observable, e.g. hinge angles.
    fn observable(&self, _t: f64, _dofs: &[f64]) -> Option<(String, Vec<f64>)> {
        None
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Subsystem {
    ReactionWheels(ReactionWheelSet),
    Thrusters(ThrusterSet),
    HingedPanels(PanelSet),
    FuelSlosh(FuelTank),
}

impl Subsystem {
    /// Number of values a command for this subsystem must carry.
    pub fn command_len(&self) -> usize {
        match self {
            Subsystem::ReactionWheels(s) => s.wheels.len(),
            Subsystem::Thrusters(s) => s.thrusters.len(),
            Subsystem::HingedPanels(_) | Subsystem::FuelSlosh(_) => 0,
        }
    }

    /// Restores the runtime fields to their configured initial values.
    pub fn reset(&mut self) {
        match self {
            Subsystem::ReactionWheels(s) => s.reset(),
            Subsystem::Thrusters(s) => s.reset(),
            Subsystem::HingedPanels(_) | Subsystem::FuelSlosh(_) => {}
        }
    }
}

impl From<ReactionWheelSet> for Subsystem {
    fn from(s: ReactionWheelSet) -> Self {
        Subsystem::ReactionWheels(s)
    }
}

impl From<ThrusterSet> for Subsystem {
    fn from(s: ThrusterSet) -> Self {
        Subsystem::Thrusters(s)
    }
}

impl From<PanelSet> for Subsystem {
    fn from(s: PanelSet) -> Self {
        Subsystem::HingedPanels(s)
    }
}

impl From<FuelTank> for Subsystem {
    fn from(s: FuelTank) -> Self {
        Subsystem::FuelSlosh(s)
    }
}

impl Effector for Subsystem {
    fn name(&self) -> &str {
        match self {
            Subsystem::ReactionWheels(s) => s.name(),
            Subsystem::Thrusters(s) => s.name(),
            Subsystem::HingedPanels(s) => s.name(),
            Subsystem::FuelSlosh(s) => s.name(),
        }
    }

    fn validate(&mut self) -> Result<(), ConfigurationErrors> {
        match self {
            Subsystem::ReactionWheels(s) => s.validate(),
            Subsystem::Thrusters(s) => s.validate(),
            Subsystem::HingedPanels(s) => s.validate(),
            Subsystem::FuelSlosh(s) => s.validate(),
        }
    }

    fn dof_count(&self) -> usize {
        match self {
            Subsystem::ReactionWheels(s) => s.dof_count(),
            Subsystem::Thrusters(s) => s.dof_count(),
            Subsystem::HingedPanels(s) => s.dof_count(),
            Subsystem::FuelSlosh(s) => s.dof_count(),
        }
    }

    fn initial_dofs(&self, dofs: &mut [f64]) {
        match self {
            Subsystem::ReactionWheels(s) => s.initial_dofs(dofs),
            Subsystem::Thrusters(s) => s.initial_dofs(dofs),
            Subsystem::HingedPanels(s) => s.initial_dofs(dofs),
            Subsystem::FuelSlosh(s) => s.initial_dofs(dofs),
        }
    }

    fn contribute(&self, t: f64, dofs: &[f64], first_dof: usize, assembly: &mut Assembly) {
        match self {
            Subsystem::ReactionWheels(s) => s.contribute(t, dofs, first_dof, assembly),
            Subsystem::Thrusters(s) => s.contribute(t, dofs, first_dof, assembly),
            Subsystem::HingedPanels(s) => s.contribute(t, dofs, first_dof, assembly),
            Subsystem::FuelSlosh(s) => s.contribute(t, dofs, first_dof, assembly),
        }
    }

    fn spring_energy(&self, dofs: &[f64]) -> f64 {
        match self {
            Subsystem::ReactionWheels(s) => s.spring_energy(dofs),
            Subsystem::Thrusters(s) => s.spring_energy(dofs),
            Subsystem::HingedPanels(s) => s.spring_energy(dofs),
            Subsystem::FuelSlosh(s) => s.spring_energy(dofs),
        }
    }

    fn observable(&self, t: f64, dofs: &[f64]) -> Option<(String, Vec<f64>)> {
        match self {
            Subsystem::ReactionWheels(s) => s.observable(t, dofs),
            Subsystem::Thrusters(s) => s.observable(t, dofs),
            Subsystem::HingedPanels(s) => s.observable(t, dofs),
            Subsystem::FuelSlosh(s) => s.observable(t, dofs),
        }
    }
}
