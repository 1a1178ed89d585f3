use mass_properties::{MassPropertiesErrors, check_inertia};
use nalgebra::{Matrix3, Vector3};
use rotations::prelude::{RotationMatrix, RotationMatrixErrors};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::{check_oscillator, spring_damper, spring_energy};
use crate::{
    ConfigurationErrors,
    dynamics::{Assembly, BodyTerm, DofPartial},
    effector::Effector,
};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum HingedPanelErrors {
    #[error("panel set '{0}' has no panels")]
    Empty(String),
    #[error("panel '{0}' hinge frame: {1}")]
    HingeFrame(String, RotationMatrixErrors),
    #[error("panel '{0}' inertia: {1}")]
    Inertia(String, MassPropertiesErrors),
    #[error("panel '{0}' has an invalid {1}")]
    InvalidParameter(String, &'static str),
}

/// A rigid panel on a single axis hinge. The hinge frame H is fixed in B; the
/// panel frame S is H rotated by θ about the second hinge axis, and the panel
/// center of mass lies a distance d along -ŝ₁ from the hinge point.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HingedPanel {
    pub name: String,
    pub mass: f64,
    /// about the panel center of mass, S components
    pub inertia: Matrix3<f64>,
    /// hinge point, structural coordinates
    pub hinge_position: Vector3<f64>,
    /// [HB], maps B components to H components
    pub hinge_dcm: Matrix3<f64>,
    /// hinge to panel center of mass, m
    pub distance: f64,
    /// N·m/rad
    pub stiffness: f64,
    /// N·m·s/rad
    pub damping: f64,
    pub theta0: f64,
    pub theta_dot0: f64,
}

/// Panel geometry at one hinge angle.
struct PanelFrame {
    /// rows of [SB]: ŝ₁, ŝ₂, ŝ₃ in B components
    s: [Vector3<f64>; 3],
    dcm_sb: Matrix3<f64>,
}

impl HingedPanel {
    pub fn new(name: &str, mass: f64, inertia: Matrix3<f64>, distance: f64) -> Self {
        Self {
            name: name.to_string(),
            mass,
            inertia,
            hinge_position: Vector3::zeros(),
            hinge_dcm: Matrix3::identity(),
            distance,
            stiffness: 0.0,
            damping: 0.0,
            theta0: 0.0,
            theta_dot0: 0.0,
        }
    }

    pub fn with_hinge(mut self, position: Vector3<f64>, dcm_hb: Matrix3<f64>) -> Self {
        self.hinge_position = position;
        self.hinge_dcm = dcm_hb;
        self
    }

    pub fn with_spring(mut self, stiffness: f64, damping: f64) -> Self {
        self.stiffness = stiffness;
        self.damping = damping;
        self
    }

    pub fn with_initial(mut self, theta: f64, theta_dot: f64) -> Self {
        self.theta0 = theta;
        self.theta_dot0 = theta_dot;
        self
    }

    fn validate(&mut self) -> Result<(), HingedPanelErrors> {
        if let Some(param) = check_oscillator(self.mass, self.stiffness, self.damping) {
            return Err(HingedPanelErrors::InvalidParameter(self.name.clone(), param));
        }
        if !(self.distance.is_finite() && self.distance >= 0.0) {
            return Err(HingedPanelErrors::InvalidParameter(
                self.name.clone(),
                "distance",
            ));
        }
        if !(self.theta0.is_finite() && self.theta_dot0.is_finite()) {
            return Err(HingedPanelErrors::InvalidParameter(
                self.name.clone(),
                "initial condition",
            ));
        }
        check_inertia(&self.inertia)
            .map_err(|e| HingedPanelErrors::Inertia(self.name.clone(), e))?;
        self.hinge_dcm = RotationMatrix::new(self.hinge_dcm)
            .map_err(|e| HingedPanelErrors::HingeFrame(self.name.clone(), e))?
            .0;
        Ok(())
    }

    fn frame(&self, theta: f64) -> PanelFrame {
        let dcm_sb = RotationMatrix::m2(theta).0 * self.hinge_dcm;
        let row = |i: usize| dcm_sb.row(i).transpose();
        PanelFrame {
            s: [row(0), row(1), row(2)],
            dcm_sb,
        }
    }

    /// The panel as a body with one hinge dof at global index `dof`.
    fn body(&self, theta: f64, theta_dot: f64, dof: usize) -> BodyTerm {
        let frame = self.frame(theta);
        let [s1, s2, s3] = frame.s;
        let d = self.distance;
        BodyTerm {
            mass: self.mass,
            position: self.hinge_position - d * s1,
            inertia: frame.dcm_sb.transpose() * self.inertia * frame.dcm_sb,
            velocity: d * theta_dot * s3,
            accel_bias: d * theta_dot * theta_dot * s1,
            omega_rel: theta_dot * s2,
            partial: None,
        }
        .with_partial(DofPartial {
            index: dof,
            translation: d * s3,
            rotation: s2,
        })
    }

    /// Panel center of mass at hinge angle `theta`, structural coordinates.
    pub fn center_of_mass(&self, theta: f64) -> Vector3<f64> {
        self.hinge_position - self.distance * self.frame(theta).s[0]
    }
}

/// Panels attached to the same hub. Each owns a [θ, θ̇] pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelSet {
    pub name: String,
    pub panels: Vec<HingedPanel>,
}

impl PanelSet {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            panels: Vec::new(),
        }
    }

    pub fn with_panel(mut self, panel: HingedPanel) -> Self {
        self.panels.push(panel);
        self
    }
}

impl Effector for PanelSet {
    fn name(&self) -> &str {
        &self.name
    }

    fn validate(&mut self) -> Result<(), ConfigurationErrors> {
        if self.panels.is_empty() {
            return Err(HingedPanelErrors::Empty(self.name.clone()).into());
        }
        for panel in &mut self.panels {
            panel.validate()?;
        }
        Ok(())
    }

    fn dof_count(&self) -> usize {
        self.panels.len()
    }

    fn initial_dofs(&self, dofs: &mut [f64]) {
        for (pair, panel) in dofs.chunks_exact_mut(2).zip(&self.panels) {
            pair[0] = panel.theta0;
            pair[1] = panel.theta_dot0;
        }
    }

    fn contribute(&self, _t: f64, dofs: &[f64], first_dof: usize, assembly: &mut Assembly) {
        for (i, (panel, pair)) in self.panels.iter().zip(dofs.chunks_exact(2)).enumerate() {
            let (theta, theta_dot) = (pair[0], pair[1]);
            assembly.add_body(panel.body(theta, theta_dot, first_dof + i));
            assembly.add_generalized_force(
                first_dof + i,
                spring_damper(panel.stiffness, panel.damping, theta, theta_dot),
            );
        }
    }

    fn spring_energy(&self, dofs: &[f64]) -> f64 {
        self.panels
            .iter()
            .zip(dofs.chunks_exact(2))
            .map(|(panel, pair)| spring_energy(panel.stiffness, pair[0]))
            .sum()
    }

    fn observable(&self, _t: f64, dofs: &[f64]) -> Option<(String, Vec<f64>)> {
        let theta = dofs.chunks_exact(2).map(|pair| pair[0]).collect();
        Some((format!("{}.theta", self.name), theta))
    }
}
