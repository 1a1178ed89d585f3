use nalgebra::Vector3;

/// Regression tolerances. A value passes when it is within either the
/// absolute or the relative tolerance of its reference.
#[derive(Debug, Clone, Copy)]
pub struct Tolerances {
    abs_tol: f64,
    rel_tol: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs_tol: 1e-3,
            rel_tol: 1e-6,
        }
    }
}

impl Tolerances {
    pub fn new(rel_tol: f64, abs_tol: f64) -> Self {
        Self { rel_tol, abs_tol }
    }

    pub fn absolute(abs_tol: f64) -> Self {
        Self { rel_tol: 0.0, abs_tol }
    }

    pub fn relative(rel_tol: f64) -> Self {
        Self { rel_tol, abs_tol: 0.0 }
    }

    pub fn check_error(&self, x0: f64, xf: f64) -> bool {
        check_error(x0, xf, self.rel_tol, self.abs_tol)
    }
}

pub trait Tolerance {
    fn within(&self, reference: &Self, tol: &Tolerances) -> bool;
}

impl Tolerance for f64 {
    fn within(&self, reference: &Self, tol: &Tolerances) -> bool {
        tol.check_error(*reference, *self)
    }
}

impl Tolerance for Vector3<f64> {
    fn within(&self, reference: &Self, tol: &Tolerances) -> bool {
        reference
            .iter()
            .zip(self.iter())
            .all(|(x0, xf)| tol.check_error(*x0, *xf))
    }
}

impl Tolerance for [f64] {
    fn within(&self, reference: &Self, tol: &Tolerances) -> bool {
        self.len() == reference.len()
            && reference
                .iter()
                .zip(self.iter())
                .all(|(x0, xf)| tol.check_error(*x0, *xf))
    }
}

/// `x0` is the reference value.
pub fn check_error(x0: f64, xf: f64, rel_tol: f64, abs_tol: f64) -> bool {
    let abs_diff = (xf - x0).abs();
    if abs_diff.is_nan() {
        return false;
    }
    let rel_diff = if x0.abs() > 1e-10 {
        abs_diff / x0.abs()
    } else {
        f64::INFINITY
    };
    abs_diff <= abs_tol || rel_diff <= rel_tol
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_error() {
        assert!(check_error(1.0e6, 1.0e6 + 5.0, 1e-5, 0.0));
        assert!(!check_error(1.0e6, 1.0e6 + 50.0, 1e-5, 0.0));
        assert!(check_error(0.0, 1e-9, 1e-5, 1e-8));
        assert!(!check_error(0.0, 1e-7, 1e-5, 1e-8));
        assert!(!check_error(1.0, f64::NAN, 1.0, 1.0));
    }

    #[test]
    fn test_vectors() {
        let tol = Tolerances::relative(1e-5);
        let reference = Vector3::new(-4.02033869e+06, 7.49056674e+06, 5.24829921e+06);
        let close = reference * (1.0 + 1e-7);
        assert!(close.within(&reference, &tol));
        let far = reference + Vector3::new(0.0, 1.0e3, 0.0);
        assert!(!far.within(&reference, &tol));
        assert!(![1.0, 2.0][..].within(&[1.0][..], &tol));
    }
}
