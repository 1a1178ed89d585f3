//! Rigid body assembly and solution of the coupled equations of motion.
//!
//! Every contributor is described as a set of bodies moving relative to the
//! hub frame B, whose origin is the hub center of mass. The generalized
//! speeds are the inertial velocity of the B origin (B components), the hub
//! rate ω and one rate per internal degree of freedom. With partial velocity matrices
//!
//!   J_a = [ I  -[r×]  t ]    J_α = [ 0  I  g ]
//!
//! Kane's equations give M ẍ = Q - h with
//!
//!   M = Σ m J_aᵀ J_a + J_αᵀ I J_α
//!   h = Σ m J_aᵀ a_bias + J_αᵀ (I α_bias + ω_P × I ω_P)
//!
//! where ẍ stacks the inertial acceleration of B, ω̇ and the dof accelerations.

use mass_properties::{MassAccumulator, MassProperties};
use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use rotations::skew;
use serde::{Deserialize, Serialize};

use crate::NumericalErrors;

/// Contribution of one degree of freedom to a body's motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DofPartial {
    /// global dof index
    pub index: usize,
    /// ∂r'/∂u, B components
    pub translation: Vector3<f64>,
    /// ∂ω_rel/∂u, B components
    pub rotation: Vector3<f64>,
}

/// A rigid body or point mass attached to the hub.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyTerm {
    pub mass: f64,
    /// center of mass, structural coordinates until added to an [`Assembly`]
    /// and relative to the B origin after
    pub position: Vector3<f64>,
    /// about the body's own center of mass, B components
    pub inertia: Matrix3<f64>,
    /// velocity of the center of mass as seen in B
    pub velocity: Vector3<f64>,
    /// acceleration as seen in B not proportional to dof accelerations
    pub accel_bias: Vector3<f64>,
    /// angular velocity relative to B
    pub omega_rel: Vector3<f64>,
    pub partial: Option<DofPartial>,
}

impl BodyTerm {
    /// A body fixed in B.
    pub fn rigid(mass: f64, position: Vector3<f64>, inertia: Matrix3<f64>) -> Self {
        Self {
            mass,
            position,
            inertia,
            velocity: Vector3::zeros(),
            accel_bias: Vector3::zeros(),
            omega_rel: Vector3::zeros(),
            partial: None,
        }
    }

    pub fn point(mass: f64, position: Vector3<f64>) -> Self {
        Self::rigid(mass, position, Matrix3::zeros())
    }

    pub fn with_partial(mut self, partial: DofPartial) -> Self {
        self.partial = Some(partial);
        self
    }

    /// Inertial velocity of the center of mass, B components.
    fn inertial_velocity(&self, v_b: &Vector3<f64>, omega: &Vector3<f64>) -> Vector3<f64> {
        v_b + omega.cross(&self.position) + self.velocity
    }
}

/// Everything the subsystems report at one evaluation: bodies, loads on the
/// hub and generalized forces on their own degrees of freedom.
///
/// Subsystems describe geometry in the structural frame. The assembly stores
/// it relative to `origin`, the structural location of the B origin.
#[derive(Debug, Clone, Default)]
pub struct Assembly {
    origin: Vector3<f64>,
    bodies: Vec<BodyTerm>,
    /// net external force on the hub, B components
    force: Vector3<f64>,
    /// net external torque about the B origin, B components
    torque: Vector3<f64>,
    generalized: Vec<f64>,
}

impl Assembly {
    pub fn new(n_dof: usize) -> Self {
        Self {
            origin: Vector3::zeros(),
            bodies: Vec::new(),
            force: Vector3::zeros(),
            torque: Vector3::zeros(),
            generalized: vec![0.0; n_dof],
        }
    }

    pub fn clear(&mut self) {
        self.bodies.clear();
        self.force = Vector3::zeros();
        self.torque = Vector3::zeros();
        self.generalized.iter_mut().for_each(|q| *q = 0.0);
    }

    pub fn n_dof(&self) -> usize {
        self.generalized.len()
    }

    /// Places the B origin at `origin`, structural coordinates. Applies to
    /// everything added afterwards.
    pub fn set_origin(&mut self, origin: Vector3<f64>) {
        self.origin = origin;
    }

    pub fn origin(&self) -> Vector3<f64> {
        self.origin
    }

    pub fn add_body(&mut self, mut body: BodyTerm) {
        body.position -= self.origin;
        self.bodies.push(body);
    }

    /// Force applied at a structural point fixed in the hub.
    pub fn add_force_at(&mut self, point: &Vector3<f64>, force: &Vector3<f64>) {
        self.force += force;
        self.torque += (point - self.origin).cross(force);
    }

    /// Force and torque about the structural origin.
    pub fn add_wrench(&mut self, force: &Vector3<f64>, torque: &Vector3<f64>) {
        self.force += force;
        self.torque += torque - self.origin.cross(force);
    }

    pub fn add_torque(&mut self, torque: &Vector3<f64>) {
        self.torque += torque;
    }

    pub fn add_generalized_force(&mut self, dof: usize, q: f64) {
        if let Some(slot) = self.generalized.get_mut(dof) {
            *slot += q;
        }
    }

    pub fn bodies(&self) -> &[BodyTerm] {
        &self.bodies
    }

    pub fn force(&self) -> Vector3<f64> {
        self.force
    }

    pub fn torque(&self) -> Vector3<f64> {
        self.torque
    }

    pub fn generalized(&self) -> &[f64] {
        &self.generalized
    }

    /// Composite mass properties in B, inertia about the composite center of mass.
    pub fn mass_properties(&self) -> Result<MassProperties, NumericalErrors> {
        let mut acc = MassAccumulator::new();
        for body in &self.bodies {
            acc.add_body(body.mass, &body.position, &body.inertia);
        }
        Ok(acc.finalize()?)
    }
}

/// Which blocks of the generalized accelerations are solved for.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SolveFlags {
    pub rotation: bool,
}

/// Assembles and solves the coupled equations. Keeps its matrices between
/// evaluations.
#[derive(Debug, Clone)]
pub struct RigidBodyDynamics {
    n_dof: usize,
    m: DMatrix<f64>,
    rhs: DVector<f64>,
}

/// Generalized accelerations.
#[derive(Debug, Clone, PartialEq)]
pub struct Accelerations {
    /// inertial acceleration of the B origin, B components
    pub linear: Vector3<f64>,
    pub angular: Vector3<f64>,
    pub dofs: Vec<f64>,
}

impl RigidBodyDynamics {
    pub fn new(n_dof: usize) -> Self {
        let n = 6 + n_dof;
        Self {
            n_dof,
            m: DMatrix::zeros(n, n),
            rhs: DVector::zeros(n),
        }
    }

    pub fn mass_matrix(&self) -> &DMatrix<f64> {
        &self.m
    }

    /// Builds M and Q - h. `omega` is the hub rate (zero when rotation is
    /// frozen) and `gravity` the field per unit mass in B components.
    pub fn assemble(&mut self, assembly: &Assembly, omega: &Vector3<f64>, gravity: &Vector3<f64>) {
        let n = 6 + self.n_dof;
        self.m.fill(0.0);
        self.rhs.fill(0.0);

        for body in &assembly.bodies {
            let m = body.mass;
            let r = body.position;
            let rx = skew(&r);

            // velocity dependent accelerations
            let a_bias = omega.cross(&omega.cross(&r))
                + 2.0 * omega.cross(&body.velocity)
                + body.accel_bias;
            let omega_p = omega + body.omega_rel;
            let alpha_bias = omega.cross(&body.omega_rel);
            let rot_bias = body.inertia * alpha_bias + omega_p.cross(&(body.inertia * omega_p));

            // applied minus inertial, projected below
            let f = m * (gravity - a_bias);
            let t = -rot_bias;

            // hub rows
            add_block(&mut self.m, 0, 0, &(m * Matrix3::identity()));
            add_block(&mut self.m, 0, 3, &(-m * rx));
            add_block(&mut self.m, 3, 0, &(m * rx));
            add_block(&mut self.m, 3, 3, &(-m * rx * rx + body.inertia));
            add_vec(&mut self.rhs, 0, &f);
            add_vec(&mut self.rhs, 3, &(r.cross(&f) + t));

            if let Some(p) = &body.partial {
                let k = 6 + p.index;
                if k >= n {
                    continue;
                }
                let mt = m * p.translation;
                let ig = body.inertia * p.rotation;
                let col_v = mt;
                let col_w = r.cross(&mt) + ig;
                for i in 0..3 {
                    self.m[(i, k)] += col_v[i];
                    self.m[(k, i)] += col_v[i];
                    self.m[(3 + i, k)] += col_w[i];
                    self.m[(k, 3 + i)] += col_w[i];
                }
                self.m[(k, k)] += m * p.translation.norm_squared() + p.rotation.dot(&ig);
                self.rhs[k] += p.translation.dot(&f) + p.rotation.dot(&t);
            }
        }

        add_vec(&mut self.rhs, 0, &assembly.force);
        add_vec(&mut self.rhs, 3, &assembly.torque);
        for (i, q) in assembly.generalized.iter().enumerate() {
            self.rhs[6 + i] += q;
        }
    }

    /// Solves the assembled system. With rotation frozen the ω̇ rows and
    /// columns are removed and ω̇ is reported as zero.
    pub fn solve(&self, flags: SolveFlags) -> Result<Accelerations, NumericalErrors> {
        let x = if flags.rotation {
            cholesky_solve(self.m.clone(), &self.rhs)?
        } else {
            let m = self.m.clone().remove_rows(3, 3).remove_columns(3, 3);
            let rhs = self.rhs.clone().remove_rows(3, 3);
            let reduced = cholesky_solve(m, &rhs)?;
            reduced.insert_rows(3, 3, 0.0)
        };
        Ok(Accelerations {
            linear: Vector3::new(x[0], x[1], x[2]),
            angular: Vector3::new(x[3], x[4], x[5]),
            dofs: x.iter().skip(6).copied().collect(),
        })
    }
}

fn cholesky_solve(m: DMatrix<f64>, rhs: &DVector<f64>) -> Result<DVector<f64>, NumericalErrors> {
    let chol = m
        .cholesky()
        .ok_or(NumericalErrors::MassMatrixNotPositiveDefinite)?;
    Ok(chol.solve(rhs))
}

fn add_block(m: &mut DMatrix<f64>, row: usize, col: usize, block: &Matrix3<f64>) {
    let mut view = m.fixed_view_mut::<3, 3>(row, col);
    view += block;
}

fn add_vec(v: &mut DVector<f64>, row: usize, x: &Vector3<f64>) {
    let mut view = v.fixed_rows_mut::<3>(row);
    view += x;
}

/// Energy and momentum bookkeeping used for verification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Observables {
    /// total kinetic energy, J
    pub total_energy: f64,
    /// kinetic energy relative to the composite center of mass plus stored spring energy, J
    pub rotational_energy: f64,
    pub spring_energy: f64,
    /// angular momentum about the composite center of mass, B components
    pub angular_momentum: Vector3<f64>,
    pub angular_momentum_magnitude: f64,
}

impl Observables {
    /// `v_b` is the inertial velocity of the B origin in B components.
    pub fn compute(
        assembly: &Assembly,
        v_b: &Vector3<f64>,
        omega: &Vector3<f64>,
        spring_energy: f64,
    ) -> Result<Self, NumericalErrors> {
        let composite = assembly.mass_properties()?;
        let r_cm = composite.center_of_mass;

        let mut momentum = Vector3::zeros();
        let mut total_energy = 0.0;
        for body in &assembly.bodies {
            let v = body.inertial_velocity(v_b, omega);
            let omega_p = omega + body.omega_rel;
            momentum += body.mass * v;
            total_energy +=
                0.5 * body.mass * v.norm_squared() + 0.5 * omega_p.dot(&(body.inertia * omega_p));
        }
        let v_cm = momentum / composite.mass;

        // relative to the center of mass, summed directly to avoid cancelling
        // against the orbital kinetic energy
        let mut angular_momentum = Vector3::zeros();
        let mut relative_energy = 0.0;
        for body in &assembly.bodies {
            let v = body.inertial_velocity(v_b, omega) - v_cm;
            let omega_p = omega + body.omega_rel;
            let spin = body.inertia * omega_p;
            angular_momentum += body.mass * (body.position - r_cm).cross(&v) + spin;
            relative_energy += 0.5 * body.mass * v.norm_squared() + 0.5 * omega_p.dot(&spin);
        }

        Ok(Self {
            total_energy,
            rotational_energy: relative_energy + spring_energy,
            spring_energy,
            angular_momentum,
            angular_momentum_magnitude: angular_momentum.norm(),
        })
    }
}
