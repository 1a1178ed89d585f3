use std::array;

use crate::{OdeErrors, OdeModel, StateVector, tableau::ButcherTableau};

// preallocated buffers for intermediate calculations
#[derive(Debug, Clone)]
struct RKBuffers<const STAGES: usize> {
    k: [StateVector; STAGES],
    state: StateVector,
    y: StateVector,
}

impl<const STAGES: usize> RKBuffers<STAGES> {
    fn new(n: usize) -> Self {
        Self {
            k: array::from_fn(|_| StateVector::zeros(n)),
            state: StateVector::zeros(n),
            y: StateVector::zeros(n),
        }
    }
}

/// Fixed-step explicit Runge-Kutta integrator.
#[derive(Debug, Clone)]
pub struct RungeKutta<const STAGES: usize> {
    tableau: ButcherTableau<STAGES>,
    buffers: RKBuffers<STAGES>,
}

impl RungeKutta<4> {
    pub fn rk4(n: usize) -> Self {
        Self::new(ButcherTableau::<4>::RK4, n)
    }
}

impl<const STAGES: usize> RungeKutta<STAGES> {
    /// Creates an integrator for states of length `n`.
    pub fn new(tableau: ButcherTableau<STAGES>, n: usize) -> Self {
        Self {
            tableau,
            buffers: RKBuffers::new(n),
        }
    }

    pub fn len(&self) -> usize {
        self.buffers.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Advances `x` from `t` to `t + h`. On error `x` is left untouched.
    pub fn step<Model: OdeModel>(
        &mut self,
        model: &mut Model,
        t: f64,
        h: f64,
        x: &mut StateVector,
    ) -> Result<(), Model::Error> {
        if !(h.is_finite() && h > 0.0) {
            return Err(OdeErrors::InvalidStep(h).into());
        }
        let n = self.len();
        if x.len() != n {
            return Err(OdeErrors::LengthMismatch {
                expected: n,
                found: x.len(),
            }
            .into());
        }
        let RKBuffers { k, state, y } = &mut self.buffers;

        // k0
        model.f(t, x, &mut k[0])?;
        check_length(n, &k[0])?;

        // k1 - ks
        for s in 1..STAGES {
            // in place calculation of intermediate points
            state.clone_from(x);
            for i in 0..s {
                let a = self.tableau.a[s][i];
                if a != 0.0 {
                    state.axpy(a * h, &k[i]);
                }
            }
            model.f(t + self.tableau.c[s] * h, state, &mut k[s])?;
            check_length(n, &k[s])?;
        }

        y.clone_from(x);
        for s in 0..STAGES {
            y.axpy(self.tableau.b[s] * h, &k[s]);
        }
        if let Some(i) = y.first_non_finite() {
            return Err(OdeErrors::NotFinite(i).into());
        }
        x.clone_from(y);
        Ok(())
    }
}

fn check_length(n: usize, derivative: &StateVector) -> Result<(), OdeErrors> {
    if derivative.len() != n {
        return Err(OdeErrors::LengthMismatch {
            expected: n,
            found: derivative.len(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[derive(Debug)]
    struct Oscillator {
        omega: f64,
        calls: usize,
    }

    impl OdeModel for Oscillator {
        type Error = OdeErrors;
        fn f(&mut self, _t: f64, x: &StateVector, dx: &mut StateVector) -> Result<(), OdeErrors> {
            self.calls += 1;
            dx[0] = x[1];
            dx[1] = -self.omega * self.omega * x[0];
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Exploding;

    impl OdeModel for Exploding {
        type Error = OdeErrors;
        fn f(&mut self, t: f64, _x: &StateVector, dx: &mut StateVector) -> Result<(), OdeErrors> {
            dx[0] = if t > 0.0 { f64::NAN } else { 1.0 };
            Ok(())
        }
    }

    #[test]
    fn test_rk4_oscillator() {
        let mut model = Oscillator {
            omega: 2.0,
            calls: 0,
        };
        let mut solver = RungeKutta::rk4(2);
        let mut x = StateVector::new(vec![1.0, 0.0]);
        let h = 0.01;
        let steps = 500;
        for i in 0..steps {
            solver.step(&mut model, i as f64 * h, h, &mut x).unwrap();
        }
        let t = steps as f64 * h;
        assert_abs_diff_eq!(x[0], (2.0 * t).cos(), epsilon = 1e-6);
        assert_abs_diff_eq!(x[1], -2.0 * (2.0 * t).sin(), epsilon = 1e-6);
        assert_eq!(model.calls, 4 * steps);
    }

    #[test]
    fn test_rk4_exact_for_cubic() {
        // x' = 3t², x(0) = 0 is integrated exactly
        #[derive(Debug)]
        struct Cubic;
        impl OdeModel for Cubic {
            type Error = OdeErrors;
            fn f(&mut self, t: f64, _x: &StateVector, dx: &mut StateVector) -> Result<(), OdeErrors> {
                dx[0] = 3.0 * t * t;
                Ok(())
            }
        }
        let mut solver = RungeKutta::rk4(1);
        let mut x = StateVector::zeros(1);
        solver.step(&mut Cubic, 0.0, 2.0, &mut x).unwrap();
        assert_abs_diff_eq!(x[0], 8.0, epsilon = 1e-14);
    }

    #[test]
    fn test_failed_step_keeps_state() {
        let mut solver = RungeKutta::rk4(1);
        let mut x = StateVector::new(vec![3.0]);
        let result = solver.step(&mut Exploding, 0.0, 0.1, &mut x);
        assert_eq!(result, Err(OdeErrors::NotFinite(0)));
        assert_eq!(x[0], 3.0);

        let mut short = StateVector::zeros(2);
        assert!(matches!(
            solver.step(&mut Exploding, 0.0, 0.1, &mut short),
            Err(OdeErrors::LengthMismatch { .. })
        ));
        assert_eq!(
            solver.step(&mut Exploding, 0.0, 0.0, &mut x),
            Err(OdeErrors::InvalidStep(0.0))
        );
    }

    #[test]
    fn test_euler() {
        let mut model = Oscillator {
            omega: 1.0,
            calls: 0,
        };
        let mut solver = RungeKutta::new(ButcherTableau::<1>::EULER, 2);
        let mut x = StateVector::new(vec![1.0, 0.0]);
        solver.step(&mut model, 0.0, 0.5, &mut x).unwrap();
        assert_eq!(*x, vec![1.0, -0.5]);
    }
}
