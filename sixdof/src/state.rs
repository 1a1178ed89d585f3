use std::ops::Range;

use nalgebra::Vector3;
use rotations::prelude::Mrp;
use serde::{Deserialize, Serialize};
use sixdof_diffeq::StateVector;

pub const POSITION: Range<usize> = 0..3;
pub const VELOCITY: Range<usize> = 3..6;
pub const SIGMA: Range<usize> = 6..9;
pub const OMEGA: Range<usize> = 9..12;
/// Number of rigid body states at the head of the composite vector.
pub const RIGID_BODY_STATES: usize = 12;

/// Translational and rotational state of the body frame B. Position and
/// velocity are those of the B origin, the hub center of mass, relative to
/// the central body in inertial components. ω is in B components.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleState {
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
    pub sigma: Mrp,
    pub omega: Vector3<f64>,
}

impl Default for VehicleState {
    fn default() -> Self {
        Self {
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
            sigma: Mrp::default(),
            omega: Vector3::zeros(),
        }
    }
}

fn read3(x: &[f64], range: Range<usize>) -> Vector3<f64> {
    Vector3::from_column_slice(&x[range])
}

impl VehicleState {
    pub fn read(x: &[f64]) -> Self {
        Self {
            position: read3(x, POSITION),
            velocity: read3(x, VELOCITY),
            sigma: Mrp(read3(x, SIGMA)),
            omega: read3(x, OMEGA),
        }
    }

    pub fn write(&self, x: &mut [f64]) {
        x[POSITION].copy_from_slice(self.position.as_slice());
        x[VELOCITY].copy_from_slice(self.velocity.as_slice());
        x[SIGMA].copy_from_slice(self.sigma.0.as_slice());
        x[OMEGA].copy_from_slice(self.omega.as_slice());
    }
}

/// Where each subsystem's [value, rate] pairs live in the composite state.
/// Resolved once at initialization and fixed afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StateLayout {
    /// first global dof index and dof count, one entry per subsystem in attachment order
    slots: Vec<(usize, usize)>,
    n_dof: usize,
}

impl StateLayout {
    pub fn new(dof_counts: impl IntoIterator<Item = usize>) -> Self {
        let mut slots = Vec::new();
        let mut n_dof = 0;
        for count in dof_counts {
            slots.push((n_dof, count));
            n_dof += count;
        }
        Self { slots, n_dof }
    }

    pub fn n_dof(&self) -> usize {
        self.n_dof
    }

    /// Length of the composite state vector.
    pub fn len(&self) -> usize {
        RIGID_BODY_STATES + 2 * self.n_dof
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// First global dof index of a subsystem.
    pub fn first_dof(&self, subsystem: usize) -> usize {
        self.slots.get(subsystem).map_or(self.n_dof, |s| s.0)
    }

    pub fn dof_count(&self, subsystem: usize) -> usize {
        self.slots.get(subsystem).map_or(0, |s| s.1)
    }

    /// Index of the value of a global dof in the composite state; the rate follows it.
    pub fn dof_offset(dof: usize) -> usize {
        RIGID_BODY_STATES + 2 * dof
    }

    /// The [value, rate] pairs of one subsystem.
    pub fn subsystem_slice<'a>(&self, x: &'a [f64], subsystem: usize) -> &'a [f64] {
        let start = Self::dof_offset(self.first_dof(subsystem));
        &x[start..start + 2 * self.dof_count(subsystem)]
    }

    pub fn subsystem_slice_mut<'a>(&self, x: &'a mut [f64], subsystem: usize) -> &'a mut [f64] {
        let start = Self::dof_offset(self.first_dof(subsystem));
        &mut x[start..start + 2 * self.dof_count(subsystem)]
    }

    /// Rates of every dof, in global order.
    pub fn rates(&self, x: &[f64]) -> Vec<f64> {
        (0..self.n_dof).map(|k| x[Self::dof_offset(k) + 1]).collect()
    }

    pub fn zeros(&self) -> StateVector {
        StateVector::zeros(self.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        let layout = StateLayout::new([3, 0, 2]);
        assert_eq!(layout.n_dof(), 5);
        assert_eq!(layout.len(), 22);
        assert_eq!(layout.first_dof(2), 3);
        assert_eq!(StateLayout::dof_offset(3), 18);

        let mut x = layout.zeros();
        layout.subsystem_slice_mut(&mut x, 2).copy_from_slice(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(x[18..22], [1.0, 2.0, 3.0, 4.0]);
        assert!(layout.subsystem_slice(&x, 1).is_empty());
        assert_eq!(layout.rates(&x), vec![0.0, 0.0, 0.0, 2.0, 4.0]);
    }

    #[test]
    fn test_vehicle_state_read_write() {
        let state = VehicleState {
            position: Vector3::new(1.0, 2.0, 3.0),
            velocity: Vector3::new(4.0, 5.0, 6.0),
            sigma: Mrp::new(0.1, 0.2, -0.3),
            omega: Vector3::new(0.001, -0.01, 0.03),
        };
        let mut x = vec![0.0; RIGID_BODY_STATES];
        state.write(&mut x);
        assert_eq!(x[6..9], [0.1, 0.2, -0.3]);
        assert_eq!(VehicleState::read(&x), state);
    }
}
