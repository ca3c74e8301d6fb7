use std::f64::consts::{FRAC_PI_2, PI};
use vector::LorentzVector;

/// Flat n-body phase space for massive final states in the rest frame of
/// the decaying system.
pub struct FlatPhaseSpaceGenerator {
    volume_factors: Vec<f64>,
    masses: Vec<f64>,
    r: Vec<f64>, // clamped random variables
}

impl FlatPhaseSpaceGenerator {
    pub const MAX_EXTERNAL: usize = 20;
    const PRECISION: f64 = 1e-15;
    const EPSILON_BORDER: f64 = 1e-10;
    const MAX_NEWTON_STEPS: usize = 100;
    const MAXIMUM_DERIVATIVE: [f64; FlatPhaseSpaceGenerator::MAX_EXTERNAL] = [
        0., 0., 0.5, 0.7, 0.75, 0.8, 0.805, 0.81, 0.82, 0.83, 0.85, 0.86, 0.87, 0.88, 0.89, 0.9,
        0.9, 0.9, 0.9, 0.9,
    ];

    /// `masses` holds at least two entries and fewer than `MAX_EXTERNAL`.
    pub fn new(masses: Vec<f64>) -> FlatPhaseSpaceGenerator {
        debug_assert!(masses.len() >= 2 && masses.len() < Self::MAX_EXTERNAL);

        let mut volume_factors = vec![0., 0.];
        for n in 2..Self::MAX_EXTERNAL {
            let mut f = 1.;
            for i in 2..=n - 2 {
                f *= i as f64;
            }

            volume_factors.push(FRAC_PI_2.powi(n as i32 - 1) / f.powi(2) / (n - 1) as f64);
        }

        let r = vec![0f64; masses.len() * 3 - 4];

        FlatPhaseSpaceGenerator {
            volume_factors,
            masses,
            r,
        }
    }

    /// The number of random variables consumed by `generate`.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.r.len()
    }

    pub fn masses(&self) -> &[f64] {
        &self.masses
    }

    #[inline]
    fn rho(mp: f64, m: f64, mps: f64) -> f64 {
        let mp_sq = mp * mp;
        ((mp_sq - (m + mps) * (m + mps)) * (mp_sq - (m - mps) * (m - mps))).sqrt() / mp_sq * 0.125
    }

    /// Solve `p*x^(p-1)-(p-1)*x^p-r=0`
    fn get_u(p: usize, r: f64) -> f64 {
        if r == 0. || r == 1.0 {
            return r;
        }

        debug_assert!(p > 1);
        if p == 2 {
            return 1. - (1. - r).sqrt();
        }

        let mut x = Self::MAXIMUM_DERIVATIVE[p];
        for _ in 0..Self::MAX_NEWTON_STEPS {
            let xp = x.powi(p as i32 - 2);
            let eval = -r + xp * x * (p as f64 - p as f64 * x + x);
            if eval.abs() < Self::PRECISION {
                break;
            }

            let dx = (p as f64 - 1.) * (p as f64 - p as f64 * x) * xp;
            x -= eval / dx;
        }

        x
    }

    /// Fill `ps` with one momentum per mass for a system of energy `e_cm` at
    /// rest and return the phase-space weight.
    ///
    /// Returns `None` below threshold or when fewer than `dimensions()` random
    /// variables are supplied.
    pub fn generate(&mut self, e_cm: f64, x: &[f64], ps: &mut [LorentzVector<f64>]) -> Option<f64> {
        let n = self.masses.len();
        if ps.len() != n || x.len() < self.r.len() {
            return None;
        }

        let mut q = LorentzVector::from_args(e_cm, 0., 0., 0.);
        let mut mass_sum = self.masses.iter().sum::<f64>();
        let mut m = e_cm - mass_sum;
        if !(m > 0.) {
            return None;
        }

        let mut weight = self.volume_factors[n] * m.powi(2 * n as i32 - 4);

        for (rr, xr) in self.r.iter_mut().zip(x) {
            *rr = xr
                .max(Self::EPSILON_BORDER)
                .min(1. - Self::EPSILON_BORDER);
        }

        for i in 0..n - 1 {
            let mi = m + mass_sum;

            // Mi^2 = u2*..*u_i * M^2, so the square root of u enters. The last
            // intermediate mass is fixed.
            let u = if i == n - 2 {
                0.
            } else {
                Self::get_u(n - i - 1, self.r[i]).sqrt()
            };

            let rho = Self::rho(mi, m * u + mass_sum - self.masses[i], self.masses[i]);
            let qi = 4. * mi * rho;

            if i == n - 2 {
                weight *= 8. * Self::rho(mi, self.masses[i + 1], self.masses[i]);
            } else {
                weight *= rho / Self::rho(m, m * u, 0.) * (m * u + mass_sum - self.masses[i])
                    / (m * u);
            }

            m *= u;

            let cos_theta = 2. * self.r[n - 2 + 2 * i] - 1.;
            let sin_theta = (1. - cos_theta * cos_theta).sqrt();
            let phi = 2. * PI * self.r[n - 1 + 2 * i];
            let (sin_phi, cos_phi) = phi.sin_cos();

            ps[i] = LorentzVector::from_args(
                qi.hypot(self.masses[i]),
                qi * cos_phi * sin_theta,
                qi * sin_phi * sin_theta,
                qi * cos_theta,
            )
            .boost(&q.velocity());
            q = q - ps[i];

            mass_sum -= self.masses[i];
        }
        ps[n - 1] = q;

        if weight.is_finite() {
            Some(weight)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn momentum_is_conserved_and_on_shell() {
        let masses = vec![0.14, 0.14, 20., 20., 5.];
        let mut gen = FlatPhaseSpaceGenerator::new(masses.clone());
        assert_eq!(gen.dimensions(), 11);

        let x: Vec<f64> = (0..gen.dimensions())
            .map(|i| (0.37 * (i + 1) as f64).fract())
            .collect();
        let mut ps = vec![LorentzVector::default(); masses.len()];
        let weight = gen.generate(500., &x, &mut ps).unwrap();
        assert!(weight > 0.);

        let total: LorentzVector<f64> = ps.iter().sum();
        assert!((total.t - 500.).abs() < 1e-8);
        assert!(total.spatial_distance() < 1e-8);
        for (p, m) in ps.iter().zip(&masses) {
            assert!((p.mass() - m).abs() < 1e-6);
        }
    }

    #[test]
    fn below_threshold_has_no_phase_space() {
        let mut gen = FlatPhaseSpaceGenerator::new(vec![10., 10.]);
        let mut ps = vec![LorentzVector::default(); 2];
        assert!(gen.generate(15., &[0.5, 0.5], &mut ps).is_none());
        assert!(gen.generate(25., &[0.5], &mut ps).is_none());
    }
}
