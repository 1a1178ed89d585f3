use serde::{Deserialize, Serialize};
use std::ops::{AddAssign, Deref, DerefMut, MulAssign};

/// A dynamic-sized state vector. Its length is fixed by whoever builds it and
/// is never changed by the integrator.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StateVector(Vec<f64>);

impl StateVector {
    pub fn new(value: Vec<f64>) -> Self {
        Self(value)
    }

    pub fn zeros(n: usize) -> Self {
        Self(vec![0.0; n])
    }

    /// Sets every element to zero, keeping the length.
    pub fn clear(&mut self) {
        self.0.iter_mut().for_each(|x| *x = 0.0);
    }

    /// self += a * rhs
    pub fn axpy(&mut self, a: f64, rhs: &Self) {
        for (x, y) in self.0.iter_mut().zip(rhs.0.iter()) {
            *x += a * y;
        }
    }

    /// Index of the first non-finite element, if any.
    pub fn first_non_finite(&self) -> Option<usize> {
        self.0.iter().position(|x| !x.is_finite())
    }

    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for StateVector {
    fn from(value: Vec<f64>) -> Self {
        Self(value)
    }
}

impl AddAssign<&Self> for StateVector {
    /// Element-wise addition. Vectors are expected to have the same length.
    fn add_assign(&mut self, rhs: &Self) {
        debug_assert_eq!(self.len(), rhs.len(), "state vectors do not have same length");
        for (x, y) in self.0.iter_mut().zip(rhs.0.iter()) {
            *x += y;
        }
    }
}

impl MulAssign<f64> for StateVector {
    fn mul_assign(&mut self, rhs: f64) {
        self.0.iter_mut().for_each(|x| *x *= rhs);
    }
}

impl Deref for StateVector {
    type Target = Vec<f64>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for StateVector {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ops() {
        let mut x = StateVector::new(vec![1.0, 2.0, 3.0]);
        let y = StateVector::new(vec![0.5, 0.5, 0.5]);
        x += &y;
        assert_eq!(*x, vec![1.5, 2.5, 3.5]);
        x *= 2.0;
        assert_eq!(*x, vec![3.0, 5.0, 7.0]);
        x.axpy(-2.0, &y);
        assert_eq!(*x, vec![2.0, 4.0, 6.0]);
        x.clear();
        assert_eq!(x, StateVector::zeros(3));
    }

    #[test]
    fn test_non_finite() {
        let x = StateVector::new(vec![1.0, f64::INFINITY, f64::NAN]);
        assert_eq!(x.first_non_finite(), Some(1));
        assert_eq!(StateVector::zeros(2).first_non_finite(), None);
    }
}
