use nalgebra::Vector3;

pub mod reaction_wheel;
pub mod thruster;

/// Unit vector along `v`, or `None` for a zero or non-finite vector.
pub(crate) fn unit_axis(v: &Vector3<f64>) -> Option<Vector3<f64>> {
    let mag = v.norm();
    if !mag.is_finite() || mag < f64::EPSILON {
        return None;
    }
    Some(v / mag)
}

/// Two unit vectors completing a right handed triad with the unit vector `g`.
pub(crate) fn transverse_axes(g: &Vector3<f64>) -> (Vector3<f64>, Vector3<f64>) {
    // cross with the basis vector least aligned with g
    let abs = g.abs();
    let e = if abs[0] <= abs[1] && abs[0] <= abs[2] {
        Vector3::x()
    } else if abs[1] <= abs[2] {
        Vector3::y()
    } else {
        Vector3::z()
    };
    let w2 = g.cross(&e).normalize();
    let w3 = g.cross(&w2);
    (w2, w3)
}
