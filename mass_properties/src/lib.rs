use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum MassPropertiesErrors {
    #[error("inertia tensor is not positive definite")]
    InertiaNotPositiveDefinite,
    #[error("inertia tensor is not symmetric")]
    InertiaNotSymmetric,
    #[error("Ixx cant be less than or equal to zero")]
    IxxLessThanOrEqualToZero,
    #[error("Iyy cant be less than or equal to zero")]
    IyyLessThanOrEqualToZero,
    #[error("Izz cant be less than or equal to zero")]
    IzzLessThanOrEqualToZero,
    #[error("mass cannot be less than or equal to zero")]
    MassLessThanOrEqualToZero,
    #[error("mass properties contain non-finite values")]
    NotFinite,
}

/// Relative tolerance on the asymmetry of a user supplied inertia tensor.
const SYMMETRY_TOL: f64 = 1e-9;

/// Six independent components of an inertia tensor.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Inertia {
    pub ixx: f64,
    pub iyy: f64,
    pub izz: f64,
    pub ixy: f64,
    pub ixz: f64,
    pub iyz: f64,
}

impl Inertia {
    pub fn new(
        ixx: f64,
        iyy: f64,
        izz: f64,
        ixy: f64,
        ixz: f64,
        iyz: f64,
    ) -> Result<Self, MassPropertiesErrors> {
        if ixx <= f64::EPSILON {
            return Err(MassPropertiesErrors::IxxLessThanOrEqualToZero);
        }
        if iyy <= f64::EPSILON {
            return Err(MassPropertiesErrors::IyyLessThanOrEqualToZero);
        }
        if izz <= f64::EPSILON {
            return Err(MassPropertiesErrors::IzzLessThanOrEqualToZero);
        }
        Ok(Self {
            ixx,
            iyy,
            izz,
            ixy,
            ixz,
            iyz,
        })
    }

    pub fn diagonal(ixx: f64, iyy: f64, izz: f64) -> Result<Self, MassPropertiesErrors> {
        Self::new(ixx, iyy, izz, 0.0, 0.0, 0.0)
    }

    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.ixx, self.ixy, self.ixz, self.ixy, self.iyy, self.iyz, self.ixz, self.iyz,
            self.izz,
        )
    }
}

impl TryFrom<Matrix3<f64>> for Inertia {
    type Error = MassPropertiesErrors;

    fn try_from(m: Matrix3<f64>) -> Result<Self, Self::Error> {
        check_inertia(&m)?;
        Inertia::new(
            m[(0, 0)],
            m[(1, 1)],
            m[(2, 2)],
            m[(0, 1)],
            m[(0, 2)],
            m[(1, 2)],
        )
    }
}

/// Checks that an inertia tensor is finite, symmetric and positive definite.
pub fn check_inertia(m: &Matrix3<f64>) -> Result<(), MassPropertiesErrors> {
    if m.iter().any(|x| !x.is_finite()) {
        return Err(MassPropertiesErrors::NotFinite);
    }
    let scale = m.norm().max(f64::EPSILON);
    if (m - m.transpose()).norm() > SYMMETRY_TOL * scale {
        return Err(MassPropertiesErrors::InertiaNotSymmetric);
    }
    if m.cholesky().is_none() {
        return Err(MassPropertiesErrors::InertiaNotPositiveDefinite);
    }
    Ok(())
}

/// Inertia of a point mass `mass` at `r` about the origin, m(|r|²I - rrᵀ).
pub fn point_inertia(mass: f64, r: &Vector3<f64>) -> Matrix3<f64> {
    mass * (r.norm_squared() * Matrix3::identity() - r * r.transpose())
}

/// Represents the mass properties of an object
/// Mass, Center of Mass, Inertia about the center of mass
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f64,
    pub center_of_mass: Vector3<f64>,
    pub inertia: Matrix3<f64>,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            center_of_mass: Vector3::zeros(),
            inertia: Matrix3::identity(),
        }
    }
}

impl MassProperties {
    pub fn new(
        mass: f64,
        center_of_mass: Vector3<f64>,
        inertia: Matrix3<f64>,
    ) -> Result<Self, MassPropertiesErrors> {
        let mp = Self {
            mass,
            center_of_mass,
            inertia,
        };
        mp.validate()?;
        Ok(mp)
    }

    pub fn validate(&self) -> Result<(), MassPropertiesErrors> {
        if !self.mass.is_finite() || self.center_of_mass.iter().any(|x| !x.is_finite()) {
            return Err(MassPropertiesErrors::NotFinite);
        }
        if self.mass <= f64::EPSILON {
            return Err(MassPropertiesErrors::MassLessThanOrEqualToZero);
        }
        check_inertia(&self.inertia)
    }

    /// Inertia about an arbitrary point through the parallel axis theorem.
    pub fn about_point(&self, point: &Vector3<f64>) -> Matrix3<f64> {
        self.inertia + point_inertia(self.mass, &(self.center_of_mass - point))
    }

    /// Same body with mass and inertia scaled by `factor`, center of mass unchanged.
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            mass: self.mass * factor,
            center_of_mass: self.center_of_mass,
            inertia: self.inertia * factor,
        }
    }
}

/// Sums point masses and rigid bodies expressed about a common origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassAccumulator {
    mass: f64,
    first_moment: Vector3<f64>,
    inertia_origin: Matrix3<f64>,
}

impl Default for MassAccumulator {
    fn default() -> Self {
        Self {
            mass: 0.0,
            first_moment: Vector3::zeros(),
            inertia_origin: Matrix3::zeros(),
        }
    }
}

impl MassAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_point(&mut self, mass: f64, position: &Vector3<f64>) {
        self.mass += mass;
        self.first_moment += mass * position;
        self.inertia_origin += point_inertia(mass, position);
    }

    /// Adds a body of mass `mass` whose center of mass is at `position` and whose
    /// inertia about that center is `inertia`.
    pub fn add_body(&mut self, mass: f64, position: &Vector3<f64>, inertia: &Matrix3<f64>) {
        self.add_point(mass, position);
        self.inertia_origin += inertia;
    }

    pub fn add(&mut self, mp: &MassProperties) {
        self.add_body(mp.mass, &mp.center_of_mass, &mp.inertia);
    }

    pub fn mass(&self) -> f64 {
        self.mass
    }

    /// Σ m r about the origin.
    pub fn first_moment(&self) -> Vector3<f64> {
        self.first_moment
    }

    pub fn inertia_about_origin(&self) -> Matrix3<f64> {
        self.inertia_origin
    }

    /// Composite properties with the inertia taken about the composite center of mass.
    pub fn finalize(&self) -> Result<MassProperties, MassPropertiesErrors> {
        if !self.mass.is_finite() {
            return Err(MassPropertiesErrors::NotFinite);
        }
        if self.mass <= f64::EPSILON {
            return Err(MassPropertiesErrors::MassLessThanOrEqualToZero);
        }
        let center_of_mass = self.first_moment / self.mass;
        let inertia = self.inertia_origin - point_inertia(self.mass, &center_of_mass);
        MassProperties::new(self.mass, center_of_mass, inertia)
    }
}
