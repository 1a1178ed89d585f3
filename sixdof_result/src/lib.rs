use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod csv_sink;
pub mod memory;

pub use csv_sink::CsvSink;
pub use memory::MemoryLog;

/// Name of the state snapshot message.
pub const INERTIAL_STATE_OUTPUT: &str = "inertial_state_output";

#[derive(Debug, Error)]
pub enum ResultErrors {
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("observable '{name}' changed length from {expected} to {found}")]
    ObservableLength {
        name: String,
        expected: usize,
        found: usize,
    },
}

/// Time-stamped snapshot of the vehicle. Position and velocity are those of
/// the hub center of mass made absolute with the central body state, attitude
/// is the MRP set σ_BN. The center of mass is relative to the hub's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateMessage {
    pub time_ns: u64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub sigma: Vector3<f64>,
    pub omega: Vector3<f64>,
    pub mass: f64,
    pub center_of_mass: Vector3<f64>,
    pub inertia: Matrix3<f64>,
}

impl StateMessage {
    pub const HEADERS: [&'static str; 26] = [
        "t[s]", "r[x]", "r[y]", "r[z]", "v[x]", "v[y]", "v[z]", "sigma[1]", "sigma[2]", "sigma[3]",
        "w[x]", "w[y]", "w[z]", "mass", "cm[x]", "cm[y]", "cm[z]", "I[xx]", "I[xy]", "I[xz]",
        "I[yx]", "I[yy]", "I[yz]", "I[zx]", "I[zy]", "I[zz]",
    ];

    pub fn name(&self) -> &'static str {
        INERTIAL_STATE_OUTPUT
    }

    /// Row of the csv representation, matching `HEADERS`.
    pub fn record(&self) -> Vec<String> {
        let mut row = Vec::with_capacity(Self::HEADERS.len());
        row.push((self.time_ns as f64 / 1e9).to_string());
        for v in [&self.position, &self.velocity, &self.sigma, &self.omega] {
            row.extend(v.iter().map(|x| x.to_string()));
        }
        row.push(self.mass.to_string());
        row.extend(self.center_of_mass.iter().map(|x| x.to_string()));
        // row major
        for i in 0..3 {
            for j in 0..3 {
                row.push(self.inertia[(i, j)].to_string());
            }
        }
        row
    }
}

/// Receives state snapshots and named observables from the engine.
pub trait MessageSink {
    fn publish_state(&mut self, message: &StateMessage) -> Result<(), ResultErrors>;

    fn record_observable(
        &mut self,
        time_ns: u64,
        name: &str,
        values: &[f64],
    ) -> Result<(), ResultErrors>;

    fn flush(&mut self) -> Result<(), ResultErrors> {
        Ok(())
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl MessageSink for NullSink {
    fn publish_state(&mut self, _message: &StateMessage) -> Result<(), ResultErrors> {
        Ok(())
    }

    fn record_observable(&mut self, _: u64, _: &str, _: &[f64]) -> Result<(), ResultErrors> {
        Ok(())
    }
}

impl<T: MessageSink + ?Sized> MessageSink for &mut T {
    fn publish_state(&mut self, message: &StateMessage) -> Result<(), ResultErrors> {
        (**self).publish_state(message)
    }

    fn record_observable(
        &mut self,
        time_ns: u64,
        name: &str,
        values: &[f64],
    ) -> Result<(), ResultErrors> {
        (**self).record_observable(time_ns, name, values)
    }

    fn flush(&mut self) -> Result<(), ResultErrors> {
        (**self).flush()
    }
}

#[cfg(test)]
pub(crate) fn sample_message(time_ns: u64) -> StateMessage {
    StateMessage {
        time_ns,
        position: Vector3::new(1.0, 2.0, 3.0),
        velocity: Vector3::new(4.0, 5.0, 6.0),
        sigma: Vector3::new(0.1, 0.2, -0.3),
        omega: Vector3::new(0.001, -0.01, 0.03),
        mass: 750.0,
        center_of_mass: Vector3::new(0.0, 0.0, 1.0),
        inertia: Matrix3::from_diagonal(&Vector3::new(900.0, 800.0, 600.0)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_matches_headers() {
        let msg = sample_message(120_000_000_000);
        let row = msg.record();
        assert_eq!(row.len(), StateMessage::HEADERS.len());
        assert_eq!(row[0], "120");
        assert_eq!(row[7], "0.1");
        assert_eq!(row[13], "750");
        assert_eq!(row[25], "600");
        assert_eq!(msg.name(), "inertial_state_output");
    }
}
