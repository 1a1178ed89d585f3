/// Coefficients of an explicit Runge-Kutta method.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ButcherTableau<const STAGES: usize> {
    pub a: [[f64; STAGES]; STAGES],
    pub b: [f64; STAGES],
    pub c: [f64; STAGES],
}

impl ButcherTableau<1> {
    // usage is ButcherTableau::<1>::EULER
    pub const EULER: Self = Self {
        a: [[0.]],
        b: [1.],
        c: [0.],
    };
}

impl ButcherTableau<2> {
    pub const HEUN: Self = Self {
        a: [[0., 0.], [1., 0.]],
        b: [1. / 2., 1. / 2.],
        c: [0., 1.],
    };
}

impl ButcherTableau<4> {
    // usage is ButcherTableau::<4>::RK4
    pub const RK4: Self = Self {
        a: [
            [0., 0., 0., 0.],
            [1. / 2., 0., 0., 0.],
            [0., 1. / 2., 0., 0.],
            [0., 0., 1., 0.],
        ],
        b: [1. / 6., 1. / 3., 1. / 3., 1. / 6.],
        c: [0., 1.0 / 2.0, 1.0 / 2.0, 1.0],
    };
}

impl<const STAGES: usize> ButcherTableau<STAGES> {
    /// Row sums of `a` equal `c` and the weights sum to one.
    pub fn is_consistent(&self) -> bool {
        let weights: f64 = self.b.iter().sum();
        (weights - 1.0).abs() < 1e-14
            && (0..STAGES).all(|s| (self.a[s].iter().sum::<f64>() - self.c[s]).abs() < 1e-14)
    }
}
