pub mod fuel_slosh;
pub mod hinged_panel;

/// Restoring force of a linear spring and damper on one dof.
pub(crate) fn spring_damper(stiffness: f64, damping: f64, value: f64, rate: f64) -> f64 {
    -stiffness * value - damping * rate
}

/// Potential energy stored in a linear spring.
pub(crate) fn spring_energy(stiffness: f64, value: f64) -> f64 {
    0.5 * stiffness * value * value
}

/// Checks an oscillator's mass and spring parameters. Returns the name of the
/// first bad parameter.
pub(crate) fn check_oscillator(mass: f64, stiffness: f64, damping: f64) -> Option<&'static str> {
    if !(mass.is_finite() && mass > 0.0) {
        Some("mass")
    } else if !(stiffness.is_finite() && stiffness >= 0.0) {
        Some("stiffness")
    } else if !(damping.is_finite() && damping >= 0.0) {
        Some("damping")
    } else {
        None
    }
}
