use gravity::body::{GravityBody, GravityField};
use mass_properties::MassProperties;
use sixdof_diffeq::{RungeKutta, StateVector};
use sixdof_result::{MessageSink, StateMessage};
use tracing::{debug, info, warn};

use crate::{
    ConfigurationErrors, EngineErrors, NumericalErrors,
    actuator::reaction_wheel::WheelLimit,
    commands::{Command, CommandSource, Freshness, freshness},
    config::{EngineOptions, HubConfig, InitialState, VehicleConfig},
    dynamics::{Assembly, Observables, RigidBodyDynamics},
    effector::{Effector, Subsystem},
    ephemeris::Ephemeris,
    eom::{self, Eom},
    state::{RIGID_BODY_STATES, SIGMA, StateLayout, VehicleState},
    time::nano_to_sec,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Unconfigured,
    /// subsystems may be attached
    Configured,
    /// state vector built, nothing integrated yet
    Initialized,
    Running,
    Terminated,
    /// a step failed, state is the last good one
    Failed,
}

/// Per subsystem record of the last command consumed.
#[derive(Debug, Clone, Copy, Default)]
struct CommandTracker {
    last_seen: Option<u64>,
    stale_warned: bool,
}

/// Owns the vehicle and its composite state and advances it one fixed step
/// per call.
pub struct DynamicsEngine {
    stage: Stage,
    hub: HubConfig,
    initial: InitialState,
    options: EngineOptions,
    gravity: GravityField,
    subsystems: Vec<Subsystem>,
    ephemeris: Option<Box<dyn Ephemeris>>,

    // built by initialize
    hub_mass: MassProperties,
    layout: StateLayout,
    x: StateVector,
    solver: RungeKutta<4>,
    assembly: Assembly,
    dynamics: RigidBodyDynamics,
    trackers: Vec<CommandTracker>,
    time_ns: u64,
    initial_published: bool,
    mass_properties: MassProperties,
    observables: Observables,
}

impl Default for DynamicsEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DynamicsEngine {
    pub fn new() -> Self {
        Self {
            stage: Stage::Unconfigured,
            hub: HubConfig::default(),
            initial: InitialState::default(),
            options: EngineOptions::default(),
            gravity: GravityField::new(),
            subsystems: Vec::new(),
            ephemeris: None,
            hub_mass: MassProperties::default(),
            layout: StateLayout::default(),
            x: StateVector::default(),
            solver: RungeKutta::rk4(0),
            assembly: Assembly::default(),
            dynamics: RigidBodyDynamics::new(0),
            trackers: Vec::new(),
            time_ns: 0,
            initial_published: false,
            mass_properties: MassProperties::default(),
            observables: Observables::default(),
        }
    }

    /// Configures an engine and attaches everything in `config`.
    pub fn from_config(config: VehicleConfig) -> Result<Self, ConfigurationErrors> {
        let mut engine = Self::new();
        engine.configure(config)?;
        Ok(engine)
    }

    /// Replaces the whole vehicle description. Anything attached before is
    /// discarded.
    pub fn configure(&mut self, config: VehicleConfig) -> Result<(), ConfigurationErrors> {
        if self.stage == Stage::Running {
            return Err(ConfigurationErrors::InvalidStage {
                action: "configure",
                stage: self.stage,
            });
        }
        self.hub = config.hub;
        self.initial = config.initial;
        self.options = config.options;
        self.gravity = GravityField::new();
        self.subsystems.clear();
        self.set_stage(Stage::Configured);

        for body in config.gravity_bodies {
            self.add_gravity_body(body)?;
        }
        for subsystem in config.subsystems {
            self.attach(subsystem)?;
        }
        Ok(())
    }

    pub fn attach(&mut self, subsystem: impl Into<Subsystem>) -> Result<(), ConfigurationErrors> {
        self.require_configured("attach")?;
        let subsystem = subsystem.into();
        if self.subsystems.iter().any(|s| s.name() == subsystem.name()) {
            return Err(ConfigurationErrors::NameTaken(subsystem.name().to_string()));
        }
        self.subsystems.push(subsystem);
        Ok(())
    }

    pub fn add_gravity_body(&mut self, body: GravityBody) -> Result<(), ConfigurationErrors> {
        self.require_configured("add a gravity body")?;
        self.gravity.add(body)?;
        Ok(())
    }

    pub fn set_ephemeris(&mut self, ephemeris: impl Ephemeris + 'static) {
        self.ephemeris = Some(Box::new(ephemeris));
    }

    fn require_configured(&self, action: &'static str) -> Result<(), ConfigurationErrors> {
        match self.stage {
            Stage::Configured => Ok(()),
            Stage::Unconfigured => Err(ConfigurationErrors::InvalidStage {
                action,
                stage: self.stage,
            }),
            stage => Err(ConfigurationErrors::AttachAfterInitialize(stage)),
        }
    }

    fn set_stage(&mut self, stage: Stage) {
        if self.stage != stage {
            info!("dynamics engine {:?} -> {:?}", self.stage, stage);
            self.stage = stage;
        }
    }

    /// Validates the configuration, sizes the composite state and loads the
    /// initial conditions. Calling it again from Initialized reloads them.
    pub fn initialize(&mut self) -> Result<(), EngineErrors> {
        match self.stage {
            Stage::Configured | Stage::Initialized => {}
            stage => {
                return Err(ConfigurationErrors::InvalidStage {
                    action: "initialize",
                    stage,
                }
                .into());
            }
        }
        self.options.validate()?;
        self.hub_mass = self.hub.mass_properties()?;
        self.initial
            .sigma
            .check()
            .map_err(ConfigurationErrors::InitialAttitude)?;
        if self.options.needs_gravity() && self.gravity.central().is_err() {
            return Err(ConfigurationErrors::MissingCentralBody.into());
        }
        for subsystem in &mut self.subsystems {
            subsystem.reset();
            subsystem.validate()?;
        }

        self.layout = StateLayout::new(self.subsystems.iter().map(|s| s.dof_count()));
        self.x = self.layout.zeros();
        self.initial.write(&mut self.x);
        for (i, subsystem) in self.subsystems.iter().enumerate() {
            subsystem.initial_dofs(self.layout.subsystem_slice_mut(&mut self.x, i));
        }

        let n_dof = self.layout.n_dof();
        self.solver = RungeKutta::rk4(self.layout.len());
        self.assembly = Assembly::new(n_dof);
        self.dynamics = RigidBodyDynamics::new(n_dof);
        self.trackers = vec![CommandTracker::default(); self.subsystems.len()];
        self.time_ns = 0;
        self.initial_published = false;
        self.update_ephemeris()?;
        self.refresh()?;

        debug!(
            "composite state has {} elements ({} dofs)",
            self.layout.len(),
            n_dof
        );
        self.set_stage(Stage::Initialized);
        Ok(())
    }

    /// Advances the vehicle by one step. The first call also publishes the
    /// initial snapshot. A numerical failure leaves state, time, actuator
    /// inputs and propellant as they were and moves the engine to Failed.
    pub fn step(
        &mut self,
        commands: &impl CommandSource,
        sink: &mut impl MessageSink,
    ) -> Result<(), EngineErrors> {
        match self.stage {
            Stage::Initialized | Stage::Running => {}
            stage => {
                return Err(ConfigurationErrors::InvalidStage {
                    action: "step",
                    stage,
                }
                .into());
            }
        }
        if !self.initial_published {
            self.publish(sink)?;
            self.initial_published = true;
        }

        // commands and firing windows are rolled back with the state
        let previous = (self.x.clone(), self.subsystems.clone(), self.trackers.clone());
        self.read_commands(commands)?;
        self.update_ephemeris()?;
        let dt = self.options.dt_ns;
        for subsystem in &mut self.subsystems {
            if let Subsystem::Thrusters(thrusters) = subsystem {
                thrusters.prepare_step(self.time_ns, dt);
            }
        }

        if let Err(e) = self.advance(dt) {
            warn!("step at t = {} s failed: {e}", nano_to_sec(self.time_ns));
            (self.x, self.subsystems, self.trackers) = previous;
            self.set_stage(Stage::Failed);
            return Err(e);
        }

        self.set_stage(Stage::Running);
        if self.time_ns % self.options.snapshot_ns == 0 {
            self.publish_state(sink)?;
        }
        if let Some(period) = self.options.observables_ns {
            if self.time_ns % period == 0 {
                self.publish_observables(sink)?;
            }
        }
        Ok(())
    }

    /// Integrates, then commits the attitude switch, propellant use and time.
    fn advance(&mut self, dt: u64) -> Result<(), EngineErrors> {
        let t = nano_to_sec(self.time_ns);
        let mut model = Eom {
            hub: &self.hub_mass,
            subsystems: &self.subsystems,
            layout: &self.layout,
            gravity: &self.gravity,
            options: &self.options,
            assembly: &mut self.assembly,
            dynamics: &mut self.dynamics,
        };
        self.solver.step(&mut model, t, nano_to_sec(dt), &mut self.x)?;

        if self.options.use_rotation {
            let sigma = VehicleState::read(&self.x).sigma.switched();
            self.x[SIGMA].copy_from_slice(sigma.0.as_slice());
        }
        for subsystem in &mut self.subsystems {
            if let Subsystem::Thrusters(thrusters) = subsystem {
                thrusters.commit_step(dt);
            }
        }
        self.time_ns += dt;
        if let Err(e) = self.refresh() {
            self.time_ns -= dt;
            return Err(e.into());
        }
        Ok(())
    }

    /// Steps until the next step would pass `stop_ns`, then flushes the sink.
    pub fn run_until(
        &mut self,
        stop_ns: u64,
        commands: &impl CommandSource,
        sink: &mut impl MessageSink,
    ) -> Result<(), EngineErrors> {
        info!("running to t = {} s", nano_to_sec(stop_ns));
        while self.time_ns + self.options.dt_ns <= stop_ns {
            self.step(commands, sink)?;
        }
        sink.flush()?;
        Ok(())
    }

    pub fn terminate(&mut self) {
        if self.stage != Stage::Failed {
            self.set_stage(Stage::Terminated);
        }
    }

    /// Reads one command per commanded subsystem. Lengths are checked for
    /// every subsystem before any command is applied.
    fn read_commands(&mut self, commands: &impl CommandSource) -> Result<(), ConfigurationErrors> {
        let mut fresh: Vec<Option<&Command>> = Vec::with_capacity(self.subsystems.len());
        for (subsystem, tracker) in self.subsystems.iter().zip(&self.trackers) {
            let expected = subsystem.command_len();
            if expected == 0 {
                fresh.push(None);
                continue;
            }
            match freshness(commands.latest(subsystem.name()), tracker.last_seen) {
                Freshness::Fresh(command) => {
                    if command.values.len() != expected {
                        return Err(ConfigurationErrors::CommandLength {
                            name: subsystem.name().to_string(),
                            expected,
                            found: command.values.len(),
                        });
                    }
                    fresh.push(Some(command));
                }
                Freshness::Stale => fresh.push(None),
            }
        }

        let time_ns = self.time_ns;
        for ((subsystem, tracker), command) in self
            .subsystems
            .iter_mut()
            .zip(&mut self.trackers)
            .zip(fresh)
        {
            if subsystem.command_len() == 0 {
                continue;
            }
            match command {
                Some(command) => {
                    tracker.last_seen = Some(command.sequence);
                    tracker.stale_warned = false;
                    match subsystem {
                        Subsystem::ReactionWheels(wheels) => wheels.set_torques(&command.values),
                        Subsystem::Thrusters(thrusters) => {
                            thrusters.request(time_ns, &command.values)
                        }
                        Subsystem::HingedPanels(_) | Subsystem::FuelSlosh(_) => {}
                    }
                }
                None if !tracker.stale_warned => {
                    warn!(
                        "no fresh command for '{}' at t = {} s, holding the previous input",
                        subsystem.name(),
                        nano_to_sec(time_ns)
                    );
                    tracker.stale_warned = true;
                }
                None => debug!("stale command for '{}'", subsystem.name()),
            }
        }
        Ok(())
    }

    /// Pulls gravity body states from the ephemeris. Bodies it does not know
    /// keep their previous state.
    fn update_ephemeris(&mut self) -> Result<(), ConfigurationErrors> {
        let Some(ephemeris) = &self.ephemeris else {
            return Ok(());
        };
        let updates: Vec<_> = self
            .gravity
            .bodies()
            .iter()
            .filter_map(|b| {
                ephemeris
                    .state(&b.name, self.time_ns)
                    .map(|(r, v)| (b.name.clone(), r, v))
            })
            .collect();
        for (name, position, velocity) in updates {
            self.gravity.set_state(&name, position, velocity)?;
        }
        Ok(())
    }

    /// Recomputes the composite mass properties and observables at the current state.
    fn refresh(&mut self) -> Result<(), NumericalErrors> {
        eom::assemble(
            &self.hub_mass,
            &self.subsystems,
            &self.layout,
            nano_to_sec(self.time_ns),
            &self.x,
            &mut self.assembly,
        );
        let mass_properties = self.assembly.mass_properties()?;
        let observables = eom::observables(
            &self.assembly,
            &self.subsystems,
            &self.layout,
            &self.x,
            &self.options,
        )?;
        self.mass_properties = mass_properties;
        self.observables = observables;
        Ok(())
    }

    fn publish(&self, sink: &mut impl MessageSink) -> Result<(), EngineErrors> {
        self.publish_state(sink)?;
        if self.options.observables_ns.is_some() {
            self.publish_observables(sink)?;
        }
        Ok(())
    }

    fn publish_state(&self, sink: &mut impl MessageSink) -> Result<(), EngineErrors> {
        sink.publish_state(&self.state_message())?;
        Ok(())
    }

    fn publish_observables(&self, sink: &mut impl MessageSink) -> Result<(), EngineErrors> {
        let obs = &self.observables;
        sink.record_observable(self.time_ns, "total_energy", &[obs.total_energy])?;
        sink.record_observable(self.time_ns, "rotational_energy", &[obs.rotational_energy])?;
        sink.record_observable(
            self.time_ns,
            "angular_momentum",
            obs.angular_momentum.as_slice(),
        )?;
        sink.record_observable(
            self.time_ns,
            "angular_momentum_magnitude",
            &[obs.angular_momentum_magnitude],
        )?;
        let t = nano_to_sec(self.time_ns);
        for (i, subsystem) in self.subsystems.iter().enumerate() {
            if let Some((name, values)) =
                subsystem.observable(t, self.layout.subsystem_slice(&self.x, i))
            {
                sink.record_observable(self.time_ns, &name, &values)?;
            }
        }
        Ok(())
    }

    /// Snapshot of the current state with position and velocity made
    /// absolute.
    pub fn state_message(&self) -> StateMessage {
        let state = self.vehicle_state();
        let (position, velocity) = self.gravity.central_offset().unwrap_or_default();
        StateMessage {
            time_ns: self.time_ns,
            position: state.position + position,
            velocity: state.velocity + velocity,
            sigma: state.sigma.0,
            omega: state.omega,
            mass: self.mass_properties.mass,
            center_of_mass: self.mass_properties.center_of_mass,
            inertia: self.mass_properties.inertia,
        }
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn time_ns(&self) -> u64 {
        self.time_ns
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    pub fn subsystems(&self) -> &[Subsystem] {
        &self.subsystems
    }

    /// Rigid body part of the composite state, relative to the central body.
    pub fn vehicle_state(&self) -> VehicleState {
        if self.x.len() < RIGID_BODY_STATES {
            return self.initial;
        }
        VehicleState::read(&self.x)
    }

    /// Composite mass properties at the current state, B components.
    pub fn mass_properties(&self) -> &MassProperties {
        &self.mass_properties
    }

    pub fn observables(&self) -> &Observables {
        &self.observables
    }

    /// [value, rate] of dof `index` of the named subsystem.
    pub fn dof_state(&self, subsystem: &str, index: usize) -> Option<(f64, f64)> {
        let i = self.subsystems.iter().position(|s| s.name() == subsystem)?;
        let pairs = self.layout.subsystem_slice(&self.x, i);
        let pair = pairs.chunks_exact(2).nth(index)?;
        Some((pair[0], pair[1]))
    }

    /// Wheel bounds exceeded at the current state. The dynamics never
    /// enforce them.
    pub fn wheel_limits(&self) -> Vec<(String, WheelLimit)> {
        let t = nano_to_sec(self.time_ns);
        self.subsystems
            .iter()
            .enumerate()
            .filter_map(|(i, s)| match s {
                Subsystem::ReactionWheels(wheels) => {
                    Some(wheels.check_limits(t, self.layout.subsystem_slice(&self.x, i)))
                }
                _ => None,
            })
            .flatten()
            .collect()
    }

    /// Remaining propellant of the named thruster set, kg.
    pub fn propellant(&self, subsystem: &str) -> Option<f64> {
        self.subsystems
            .iter()
            .find(|s| s.name() == subsystem)
            .and_then(propellant_of)
    }
}

fn propellant_of(subsystem: &Subsystem) -> Option<f64> {
    match subsystem {
        Subsystem::Thrusters(thrusters) => thrusters.propellant_remaining(),
        _ => None,
    }
}
