//! A toy cluster hadronization model for dark and SM partons.
//!
//! Each final-state parton becomes a massive cluster carrying its energy,
//! which decays isotropically into mesons. Dark mesons are grouped in pairs,
//! each pair radiated through a dark gluon; a fraction `inv` of the pairs stays
//! invisible, the rest decay into SM pions.

use crate::error::HadronizationError;
use crate::event::{pdg, GeneratedEvent, Particle, ParticleStatus};
use crate::phase_space_generator::FlatPhaseSpaceGenerator;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use vector::LorentzVector;

/// Hidden-valley model parameters.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct HiddenValley {
    /// Dark meson mass in GeV.
    pub phimass: f64,
    /// Dark confinement scale in GeV.
    pub lambda: f64,
    /// Fraction of dark mesons that remain invisible.
    pub inv: f64,
    /// Number of dark colours.
    pub nc: usize,
}

impl Default for HiddenValley {
    fn default() -> HiddenValley {
        HiddenValley {
            phimass: 20.0,
            lambda: 10.0,
            inv: 0.3,
            nc: 2,
        }
    }
}

pub struct Hadronizer {
    params: HiddenValley,
    rng: StdRng,
}

impl Hadronizer {
    const MAX_MULTIPLICITY: usize = 16;
    const THRESHOLD_MARGIN: f64 = 1.1;
    const DARK_CLUSTER_FRACTION: f64 = 0.15;
    const QCD_CLUSTER_FRACTION: f64 = 0.1;
    const QCD_SCALE: f64 = 2.0;
    const QCD_COLOURS: f64 = 3.0;
    const PION_MASS: f64 = 0.13957;

    pub fn new(params: HiddenValley, seed: u64) -> Hadronizer {
        Hadronizer {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn params(&self) -> &HiddenValley {
        &self.params
    }

    /// Replace every stable dark quark and QCD parton in `event` by hadrons.
    pub fn hadronize(&mut self, event: &mut GeneratedEvent) -> Result<(), HadronizationError> {
        let partons: Vec<usize> = event
            .particles
            .iter()
            .enumerate()
            .filter(|(_, p)| {
                p.is_final_state() && (p.id.abs() == pdg::DARK_QUARK || pdg::is_qcd_parton(p.id))
            })
            .map(|(i, _)| i)
            .collect();

        for i in partons {
            event.particles[i].status = ParticleStatus::Decayed;
            if event.particles[i].id.abs() == pdg::DARK_QUARK {
                self.dark_shower(event, i)?;
            } else {
                self.fragment(event, i)?;
            }
        }

        Ok(())
    }

    /// Stochastically rounded multiplicity, growing logarithmically with energy.
    fn multiplicity(&mut self, energy: f64, scale: f64, colours: f64) -> usize {
        let mean = colours * (energy / scale).max(1.).ln();
        let n = (mean + self.rng.gen::<f64>()).floor() as usize;
        n.max(2).min(Self::MAX_MULTIPLICITY)
    }

    fn dark_shower(&mut self, event: &mut GeneratedEvent, i: usize) -> Result<(), HadronizationError> {
        let parton = event.particles[i].momentum;
        let mass = self.params.phimass;
        let n_max = (parton.t / (Self::THRESHOLD_MARGIN * mass)).floor() as usize;

        if n_max < 2 {
            if parton.t < mass {
                return Err(HadronizationError::BelowThreshold {
                    id: event.particles[i].id,
                    energy: parton.t,
                    mass,
                });
            }
            let meson = Particle::new(
                pdg::DARK_DIAGONAL_MESON,
                ParticleStatus::Decayed,
                on_shell_along(&parton, parton.t, mass),
            )
            .with_mother(i);
            let m = event.push(meson);
            return self.decay_to_pions(event, m);
        }

        let nc = self.params.nc.max(1) as f64;
        let n = self
            .multiplicity(parton.t, self.params.lambda, nc)
            .min(n_max);
        let mesons = self.cluster_decay(&parton, mass, n, Self::DARK_CLUSTER_FRACTION)?;

        for pair in mesons.chunks(2) {
            if pair.len() == 1 {
                let m = event.push(
                    Particle::new(pdg::DARK_DIAGONAL_MESON, ParticleStatus::Decayed, pair[0])
                        .with_mother(i),
                );
                self.decay_to_pions(event, m)?;
                continue;
            }

            let gluon = event.push(
                Particle::new(
                    pdg::DARK_GLUON,
                    ParticleStatus::Intermediate,
                    pair[0] + pair[1],
                )
                .with_mother(i),
            );

            if self.rng.gen::<f64>() < self.params.inv {
                event.push(
                    Particle::new(pdg::DARK_PION, ParticleStatus::Stable, pair[0]).with_mother(gluon),
                );
                event.push(
                    Particle::new(-pdg::DARK_PION, ParticleStatus::Stable, pair[1])
                        .with_mother(gluon),
                );
            } else {
                for p in pair {
                    let m = event.push(
                        Particle::new(pdg::DARK_DIAGONAL_MESON, ParticleStatus::Decayed, *p)
                            .with_mother(gluon),
                    );
                    self.decay_to_pions(event, m)?;
                }
            }
        }

        Ok(())
    }

    fn fragment(&mut self, event: &mut GeneratedEvent, i: usize) -> Result<(), HadronizationError> {
        let parton = event.particles[i].momentum;
        let n_max = (parton.t / (Self::THRESHOLD_MARGIN * Self::PION_MASS)).floor() as usize;

        // too soft to form a hadron, its energy is lost
        if n_max == 0 {
            return Ok(());
        }

        if n_max == 1 {
            event.push(
                Particle::new(
                    pdg::PION_ZERO,
                    ParticleStatus::Stable,
                    on_shell_along(&parton, parton.t, Self::PION_MASS),
                )
                .with_mother(i),
            );
            return Ok(());
        }

        let n = self
            .multiplicity(parton.t, Self::QCD_SCALE, Self::QCD_COLOURS)
            .min(n_max);
        let pions = self.cluster_decay(&parton, Self::PION_MASS, n, Self::QCD_CLUSTER_FRACTION)?;

        const CHARGES: [i32; 3] = [pdg::PION, -pdg::PION, pdg::PION_ZERO];
        for (k, p) in pions.into_iter().enumerate() {
            event.push(Particle::new(CHARGES[k % 3], ParticleStatus::Stable, p).with_mother(i));
        }

        Ok(())
    }

    /// Decay a cluster with the energy and direction of `parton` into `n`
    /// hadrons of mass `mass`, returned in the lab frame.
    fn cluster_decay(
        &mut self,
        parton: &LorentzVector<f64>,
        mass: f64,
        n: usize,
        mass_fraction: f64,
    ) -> Result<Vec<LorentzVector<f64>>, HadronizationError> {
        let cluster_mass = (Self::THRESHOLD_MARGIN * n as f64 * mass)
            .max(mass_fraction * parton.t)
            .min(parton.t);
        let cluster = on_shell_along(parton, parton.t, cluster_mass);

        let mut hadrons = vec![LorentzVector::default(); n];
        self.decay(cluster_mass, vec![mass; n], &mut hadrons)?;

        let velocity = cluster.velocity();
        for h in hadrons.iter_mut() {
            *h = h.boost(&velocity);
        }
        Ok(hadrons)
    }

    fn decay_to_pions(&mut self, event: &mut GeneratedEvent, meson: usize) -> Result<(), HadronizationError> {
        let parent = event.particles[meson].momentum;
        let mut pions = [LorentzVector::default(); 2];
        self.decay(parent.mass(), vec![Self::PION_MASS; 2], &mut pions)?;

        let velocity = parent.velocity();
        event.push(
            Particle::new(pdg::PION, ParticleStatus::Stable, pions[0].boost(&velocity))
                .with_mother(meson),
        );
        event.push(
            Particle::new(-pdg::PION, ParticleStatus::Stable, pions[1].boost(&velocity))
                .with_mother(meson),
        );
        Ok(())
    }

    fn decay(
        &mut self,
        e_cm: f64,
        masses: Vec<f64>,
        out: &mut [LorentzVector<f64>],
    ) -> Result<(), HadronizationError> {
        let multiplicity = masses.len();
        let mut generator = FlatPhaseSpaceGenerator::new(masses);
        let x: Vec<f64> = (0..generator.dimensions()).map(|_| self.rng.gen()).collect();
        generator
            .generate(e_cm, &x, out)
            .map(|_| ())
            .ok_or(HadronizationError::PhaseSpace { multiplicity })
    }
}

/// A vector of energy `energy` and mass `mass` pointing along `p`.
fn on_shell_along(p: &LorentzVector<f64>, energy: f64, mass: f64) -> LorentzVector<f64> {
    let norm = p.spatial_distance();
    let k = (energy * energy - mass * mass).max(0.).sqrt();
    if norm == 0. {
        return LorentzVector::from_args(energy, 0., 0., 0.);
    }
    let s = k / norm;
    LorentzVector::from_args(energy, p.x * s, p.y * s, p.z * s)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dark_quark_event(energy: f64) -> GeneratedEvent {
        let mut event = GeneratedEvent::new(1.);
        let pz = (energy * energy - 10. * 10.).sqrt();
        event.push(Particle::new(
            pdg::DARK_QUARK,
            ParticleStatus::Stable,
            LorentzVector::from_args(energy, 0., pz * 0.6, pz * 0.8),
        ));
        event
    }

    fn params(inv: f64) -> HiddenValley {
        HiddenValley {
            inv,
            ..HiddenValley::default()
        }
    }

    #[test]
    fn visible_shower_conserves_energy() {
        let mut event = dark_quark_event(800.);
        let mut hadronizer = Hadronizer::new(params(0.), 7);
        hadronizer.hadronize(&mut event).unwrap();

        assert_eq!(event.particles[0].status, ParticleStatus::Decayed);
        assert!(event.final_state().all(|p| p.id.abs() == pdg::PION));
        let energy: f64 = event.final_state().map(|p| p.momentum.t).sum();
        assert!((energy - 800.).abs() < 1e-6);
    }

    #[test]
    fn invisible_mesons_come_in_pairs() {
        let mut event = dark_quark_event(800.);
        let mut hadronizer = Hadronizer::new(params(1.), 7);
        hadronizer.hadronize(&mut event).unwrap();

        let counts = event.truth_counts();
        assert!(counts.n_meson >= 1);
        assert_eq!(counts.n_glu, counts.n_meson);
        assert_eq!(counts.n_unpaired, 0);
    }

    #[test]
    fn parton_below_meson_mass_fails() {
        let mut event = dark_quark_event(15.);
        let mut hadronizer = Hadronizer::new(params(0.3), 1);
        match hadronizer.hadronize(&mut event) {
            Err(HadronizationError::BelowThreshold { .. }) => {}
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[test]
    fn same_seed_same_hadrons() {
        let mut a = dark_quark_event(600.);
        let mut b = a.clone();
        Hadronizer::new(params(0.3), 42).hadronize(&mut a).unwrap();
        Hadronizer::new(params(0.3), 42).hadronize(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn gluons_fragment_into_pions() {
        let mut event = GeneratedEvent::new(1.);
        event.push(Particle::new(
            pdg::GLUON,
            ParticleStatus::Stable,
            LorentzVector::from_args(100., 100., 0., 0.),
        ));
        Hadronizer::new(params(0.3), 3).hadronize(&mut event).unwrap();

        assert!(event.final_state().count() >= 2);
        let energy: f64 = event.final_state().map(|p| p.momentum.t).sum();
        assert!((energy - 100.).abs() < 1e-6);
    }
}
