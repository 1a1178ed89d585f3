use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::{Gravity, GravityErrors, GravityModel};

/// A gravitating body. Position and velocity are inertial and are injected by
/// an external ephemeris each step; nothing here propagates them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GravityBody {
    pub name: String,
    pub model: Gravity,
    pub is_central: bool,
    #[serde(default = "Vector3::zeros")]
    pub position: Vector3<f64>,
    #[serde(default = "Vector3::zeros")]
    pub velocity: Vector3<f64>,
}

impl GravityBody {
    pub fn new(name: &str, model: Gravity) -> Self {
        Self {
            name: name.to_string(),
            model,
            is_central: false,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
        }
    }

    pub fn with_central(mut self, is_central: bool) -> Self {
        self.is_central = is_central;
        self
    }

    pub fn with_position(mut self, position: Vector3<f64>) -> Self {
        self.position = position;
        self
    }

    pub fn mu(&self) -> f64 {
        self.model.mu()
    }
}

/// The set of registered gravity bodies. At most one may be central.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GravityField {
    bodies: Vec<GravityBody>,
}

impl GravityField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, body: GravityBody) -> Result<(), GravityErrors> {
        let mu = body.mu();
        if !(mu.is_finite() && mu > 0.0) {
            return Err(GravityErrors::InvalidMu(body.name));
        }
        if self.bodies.iter().any(|b| b.name == body.name) {
            return Err(GravityErrors::DuplicateBody(body.name));
        }
        if body.is_central {
            if let Some(existing) = self.bodies.iter().find(|b| b.is_central) {
                return Err(GravityErrors::MultipleCentralBodies(
                    existing.name.clone(),
                    body.name,
                ));
            }
        }
        self.bodies.push(body);
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    pub fn bodies(&self) -> &[GravityBody] {
        &self.bodies
    }

    pub fn central(&self) -> Result<&GravityBody, GravityErrors> {
        self.bodies
            .iter()
            .find(|b| b.is_central)
            .ok_or(GravityErrors::NoCentralBody)
    }

    /// Updates the inertial state of a body, typically from the ephemeris.
    pub fn set_state(
        &mut self,
        name: &str,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    ) -> Result<(), GravityErrors> {
        let body = self
            .bodies
            .iter_mut()
            .find(|b| b.name == name)
            .ok_or_else(|| GravityErrors::UnknownBody(name.to_string()))?;
        body.position = position;
        body.velocity = velocity;
        Ok(())
    }

    /// Inertial position and velocity of the central body, used to convert
    /// relative states to absolute ones.
    pub fn central_offset(&self) -> Result<(Vector3<f64>, Vector3<f64>), GravityErrors> {
        let central = self.central()?;
        Ok((central.position, central.velocity))
    }

    /// Acceleration of a point at `r_rel` from the central body, relative to the
    /// central body. Non-central bodies contribute third-body perturbations.
    pub fn acceleration(&self, r_rel: &Vector3<f64>) -> Result<Vector3<f64>, GravityErrors> {
        let central = self.central()?;
        let mut a = central.model.calculate(r_rel)?;
        for body in self.bodies.iter().filter(|b| !b.is_central) {
            let r_body = body.position - central.position;
            let direct = body.model.calculate(&(r_rel - r_body))?;
            let indirect = body.model.calculate(&(-r_body))?;
            a += direct - indirect;
        }
        Ok(a)
    }

    /// Potential per unit mass of every body at `r_rel`, relative to the central body.
    pub fn potential(&self, r_rel: &Vector3<f64>) -> Result<f64, GravityErrors> {
        let central = self.central()?;
        let mut u = central.model.potential(r_rel)?;
        for body in self.bodies.iter().filter(|b| !b.is_central) {
            let r_body = body.position - central.position;
            u += body.model.potential(&(r_rel - r_body))?;
        }
        Ok(u)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::newtonian::NewtonianGravity;
    use approx::assert_abs_diff_eq;

    const MU_EARTH: f64 = 3.986004415e14;
    const MU_MOON: f64 = 4.902799e12;

    fn earth() -> GravityBody {
        GravityBody::new("earth", Gravity::Newtonian(NewtonianGravity::new(MU_EARTH)))
            .with_central(true)
    }

    #[test]
    fn test_central_body_rules() {
        let mut field = GravityField::new();
        assert_eq!(field.central_offset(), Err(GravityErrors::NoCentralBody));
        field.add(earth()).unwrap();
        assert_eq!(field.add(earth()), Err(GravityErrors::DuplicateBody("earth".into())));
        let other = GravityBody::new("mars", Gravity::Newtonian(NewtonianGravity::new(4.28e13)))
            .with_central(true);
        assert!(matches!(
            field.add(other),
            Err(GravityErrors::MultipleCentralBodies(_, _))
        ));
        let bad = GravityBody::new("bad", Gravity::Newtonian(NewtonianGravity::new(-1.0)));
        assert_eq!(field.add(bad), Err(GravityErrors::InvalidMu("bad".into())));
    }

    #[test]
    fn test_single_body_matches_model() {
        let mut field = GravityField::new();
        field.add(earth().with_position(Vector3::new(1.0e9, 0.0, 0.0))).unwrap();
        let r = Vector3::new(7.0e6, 0.0, 0.0);
        let a = field.acceleration(&r).unwrap();
        assert_abs_diff_eq!(a, Vector3::new(-MU_EARTH / 49.0e12, 0.0, 0.0), epsilon = 1e-12);
        assert_eq!(
            field.central_offset().unwrap(),
            (Vector3::new(1.0e9, 0.0, 0.0), Vector3::zeros())
        );
        field
            .set_state("earth", Vector3::zeros(), Vector3::new(0.0, 3.0e4, 0.0))
            .unwrap();
        assert_eq!(field.central_offset().unwrap().1, Vector3::new(0.0, 3.0e4, 0.0));
    }

    #[test]
    fn test_third_body_is_tidal() {
        let mut field = GravityField::new();
        field.add(earth()).unwrap();
        field
            .add(GravityBody::new(
                "moon",
                Gravity::Newtonian(NewtonianGravity::new(MU_MOON)),
            ))
            .unwrap();
        field
            .set_state("moon", Vector3::new(3.844e8, 0.0, 0.0), Vector3::zeros())
            .unwrap();

        // the perturbation vanishes at the central body and points toward the
        // moon on the near side
        let near = Vector3::new(7.0e6, 0.0, 0.0);
        let total = field.acceleration(&near).unwrap();
        let central_only = -near * MU_EARTH / near.norm().powi(3);
        let perturbation = total - central_only;
        let d: f64 = 3.844e8 - 7.0e6;
        let expected = MU_MOON / (d * d) - MU_MOON / (3.844e8_f64 * 3.844e8);
        assert_abs_diff_eq!(perturbation[0], expected, epsilon = 1e-12);
        assert!(perturbation[0] > 0.0);

        assert!(matches!(
            field.set_state("sun", Vector3::zeros(), Vector3::zeros()),
            Err(GravityErrors::UnknownBody(_))
        ));
    }
}
