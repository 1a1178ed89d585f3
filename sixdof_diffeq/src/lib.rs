use thiserror::Error;

pub mod rk;
pub mod state_vector;
pub mod tableau;

pub use rk::RungeKutta;
pub use state_vector::StateVector;
pub use tableau::ButcherTableau;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum OdeErrors {
    #[error("derivative has length {found}, state has length {expected}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("step produced a non-finite state at index {0}")]
    NotFinite(usize),
    #[error("step size must be positive and finite, got {0}")]
    InvalidStep(f64),
}

/// Trait for defining a dynamical system model that can be numerically integrated.
///
/// Types implementing this trait must define how to compute the derivative (or RHS function)
/// of the ODE at a given time and state. Errors abort the current step.
pub trait OdeModel {
    type Error: From<OdeErrors>;

    /// Compute the derivative at time `t` (seconds) and state `state`, storing the result in `derivative`.
    fn f(
        &mut self,
        t: f64,
        state: &StateVector,
        derivative: &mut StateVector,
    ) -> Result<(), Self::Error>;
}
