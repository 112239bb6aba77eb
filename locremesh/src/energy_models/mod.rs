pub mod inertia;
pub mod spring;
pub mod symmetric_dirichlet;

pub use inertia::*;
pub use spring::*;
pub use symmetric_dirichlet::*;

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::energy::*;
    use approx::*;
    use na::SVector;

    const STEP: f64 = 1e-6;

    /// Seeded random perturbation of the given configuration.
    pub(crate) fn perturb<const N: usize>(
        x: &SVector<f64, N>,
        scale: f64,
        seed: u64,
    ) -> SVector<f64, N> {
        use rand::{distributions::Uniform, rngs::StdRng, Rng, SeedableRng};
        let mut rng = StdRng::seed_from_u64(seed);
        let range = Uniform::new(-scale, scale);
        x.map(|x| x + rng.sample(range))
    }

    fn feasible_energy<E: ElementEnergy<N>, const N: usize>(e: &E, x: &SVector<f64, N>) -> f64 {
        e.energy(x).feasible().expect("Test configuration must be feasible")
    }

    fn derivatives<E: ElementEnergy<N>, const N: usize>(
        e: &E,
        x: &SVector<f64, N>,
    ) -> LocalDerivatives<N> {
        e.evaluate(x)
            .feasible()
            .expect("Test configuration must be feasible")
    }

    /// Check the element gradient against central differences of the energy.
    pub(crate) fn gradient_tester<E: ElementEnergy<N>, const N: usize>(
        e: &E,
        x: &SVector<f64, N>,
    ) {
        let d = derivatives(e, x);
        assert_relative_eq!(d.energy, feasible_energy(e, x), max_relative = 1e-12);
        for i in 0..N {
            let mut xp = *x;
            let mut xm = *x;
            xp[i] += STEP;
            xm[i] -= STEP;
            let fd = (feasible_energy(e, &xp) - feasible_energy(e, &xm)) / (2.0 * STEP);
            assert_relative_eq!(d.gradient[i], fd, max_relative = 1e-5, epsilon = 1e-6);
        }
    }

    /// Check the element Hessian against central differences of the gradient.
    pub(crate) fn hessian_tester<E: ElementEnergy<N>, const N: usize>(
        e: &E,
        x: &SVector<f64, N>,
    ) {
        let d = derivatives(e, x);
        assert_relative_eq!(d.hessian, d.hessian.transpose(), epsilon = 1e-10);
        for j in 0..N {
            let mut xp = *x;
            let mut xm = *x;
            xp[j] += STEP;
            xm[j] -= STEP;
            let gp = derivatives(e, &xp).gradient;
            let gm = derivatives(e, &xm).gradient;
            for i in 0..N {
                let fd = (gp[i] - gm[i]) / (2.0 * STEP);
                assert_relative_eq!(d.hessian[(i, j)], fd, max_relative = 1e-4, epsilon = 1e-5);
            }
        }
    }
}
