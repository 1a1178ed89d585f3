use std::collections::BTreeMap;

use nalgebra::Vector3;

/// Supplies inertial positions and velocities of gravity bodies.
pub trait Ephemeris {
    /// State of `body` at `time_ns`, or `None` when the body is unknown.
    fn state(&self, body: &str, time_ns: u64) -> Option<(Vector3<f64>, Vector3<f64>)>;
}

/// Bodies that never move.
#[derive(Debug, Clone, Default)]
pub struct StaticEphemeris {
    bodies: BTreeMap<String, (Vector3<f64>, Vector3<f64>)>,
}

impl StaticEphemeris {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, name: &str, position: Vector3<f64>) -> Self {
        self.bodies
            .insert(name.to_string(), (position, Vector3::zeros()));
        self
    }

    pub fn insert(&mut self, name: &str, position: Vector3<f64>, velocity: Vector3<f64>) {
        self.bodies.insert(name.to_string(), (position, velocity));
    }
}

impl Ephemeris for StaticEphemeris {
    fn state(&self, body: &str, _time_ns: u64) -> Option<(Vector3<f64>, Vector3<f64>)> {
        self.bodies.get(body).copied()
    }
}
