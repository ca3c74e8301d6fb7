//! A toy generator for dark-quark pair production through t-channel
//! exchange of a heavy mediator, `g g -> qv qv~`.

use super::EventSource;
use crate::error::SourceError;
use crate::event::{pdg, GeneratedEvent, Particle, ParticleStatus};
use crate::hadronization::{Hadronizer, HiddenValley};
use crate::phase_space_generator::FlatPhaseSpaceGenerator;
use crate::GEV2_TO_PB;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::PI;
use tracing::debug;
use vector::LorentzVector;

/// Hard-process settings of the t-channel model.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TChannel {
    /// Collider centre-of-mass energy in GeV.
    pub e_cm: f64,
    /// Mediator mass in GeV.
    pub mphi: f64,
    /// Lower bound on the transverse momentum of the dark quarks.
    pub ptcut: f64,
}

pub struct HiddenValleyGenerator {
    process: TChannel,
    hadron_level: bool,
    hadronizer: Hadronizer,
    rng: StdRng,
    phase_space: FlatPhaseSpaceGenerator,
    event: GeneratedEvent,
    // statistics over all trials, including rejected ones
    trials: usize,
    sum_weights: f64,
    sum_weights_squared: f64,
    accepted_weight_sum: f64,
}

impl HiddenValleyGenerator {
    const MAX_TRIALS: usize = 1000;
    const DARK_QUARK_MASS: f64 = 10.;
    const COUPLING: f64 = 1.;

    /// With `hadron_level` off, events stop at the dark-quark pair and only
    /// `rehadronize` runs the hadronizer.
    pub fn new(
        process: TChannel,
        hidden_valley: HiddenValley,
        seed: u64,
        hadron_level: bool,
    ) -> HiddenValleyGenerator {
        HiddenValleyGenerator {
            process,
            hadron_level,
            hadronizer: Hadronizer::new(hidden_valley, seed.wrapping_add(1)),
            rng: StdRng::seed_from_u64(seed),
            phase_space: FlatPhaseSpaceGenerator::new(vec![Self::DARK_QUARK_MASS; 2]),
            event: GeneratedEvent::default(),
            trials: 0,
            sum_weights: 0.,
            sum_weights_squared: 0.,
            accepted_weight_sum: 0.,
        }
    }

    pub fn trials(&self) -> usize {
        self.trials
    }

    /// Toy gluon luminosity `x1 f(x1) x2 f(x2)` with `x f(x) = (1 - x)^3`.
    #[inline]
    fn luminosity(x1: f64, x2: f64) -> f64 {
        (1. - x1).powi(3) * (1. - x2).powi(3)
    }

    /// Draw one phase-space point and return the event with its weight in pb,
    /// or `None` when the point fails the generation cut.
    fn trial(&mut self, ln_tau_min: f64) -> Option<GeneratedEvent> {
        let x1 = (ln_tau_min * self.rng.gen::<f64>()).exp();
        let x2 = (ln_tau_min * self.rng.gen::<f64>()).exp();
        if x1 * x2 < ln_tau_min.exp() {
            return None;
        }

        let s_hat = x1 * x2 * self.process.e_cm * self.process.e_cm;
        let sqrt_s_hat = s_hat.sqrt();

        let mut ps = [LorentzVector::default(); 2];
        let r = [self.rng.gen::<f64>(), self.rng.gen::<f64>()];
        let ps_weight = self.phase_space.generate(sqrt_s_hat, &r, &mut ps)?;

        if ps[0].pt() < self.process.ptcut {
            return None;
        }

        let m2 = Self::DARK_QUARK_MASS * Self::DARK_QUARK_MASS;
        let t_hat = m2 - sqrt_s_hat * (ps[0].t - ps[0].z);
        let u_hat = m2 - sqrt_s_hat * (ps[0].t + ps[0].z);
        let mphi2 = self.process.mphi * self.process.mphi;
        let me2 = Self::COUPLING.powi(4) * s_hat * s_hat / ((mphi2 - t_hat) * (mphi2 - u_hat));

        // dx1 dx2 = ln(tau_min)^2 x1 x2 dr1 dr2
        let weight = ln_tau_min * ln_tau_min * Self::luminosity(x1, x2) * me2 / (2. * s_hat)
            * ps_weight
            / (2. * PI).powi(2)
            * GEV2_TO_PB;

        let e_beam = 0.5 * self.process.e_cm;
        let boost = LorentzVector::from_args(0., 0., 0., (x1 - x2) / (x1 + x2));

        let mut event = GeneratedEvent::new(weight);
        event.push(Particle::new(
            pdg::GLUON,
            ParticleStatus::Incoming,
            LorentzVector::from_args(x1 * e_beam, 0., 0., x1 * e_beam),
        ));
        event.push(Particle::new(
            pdg::GLUON,
            ParticleStatus::Incoming,
            LorentzVector::from_args(x2 * e_beam, 0., 0., -x2 * e_beam),
        ));
        event.push(Particle::new(pdg::DARK_QUARK, ParticleStatus::Stable, ps[0].boost(&boost)));
        event.push(Particle::new(-pdg::DARK_QUARK, ParticleStatus::Stable, ps[1].boost(&boost)));

        Some(event)
    }
}

impl EventSource for HiddenValleyGenerator {
    fn advance(&mut self) -> Result<(), SourceError> {
        let threshold = (2. * self.process.ptcut).max(2. * Self::DARK_QUARK_MASS);
        let tau_min = (threshold / self.process.e_cm).powi(2);
        if !(tau_min < 1.) {
            return Err(SourceError::GenerationFailed(format!(
                "no phase space above pT {} at {} GeV",
                self.process.ptcut, self.process.e_cm
            )));
        }
        let ln_tau_min = tau_min.ln();

        for _ in 0..Self::MAX_TRIALS {
            self.trials += 1;
            let mut event = match self.trial(ln_tau_min) {
                Some(event) => event,
                None => continue,
            };

            self.sum_weights += event.weight;
            self.sum_weights_squared += event.weight * event.weight;

            if self.hadron_level {
                self.hadronizer.hadronize(&mut event)?;
            }

            self.accepted_weight_sum += event.weight;
            self.event = event;
            return Ok(());
        }

        debug!(trials = Self::MAX_TRIALS, "no event passed the generation cut");
        Err(SourceError::GenerationFailed(format!(
            "no event passed the generation cut in {} trials",
            Self::MAX_TRIALS
        )))
    }

    fn rehadronize(&mut self, frozen: &GeneratedEvent) -> Result<(), SourceError> {
        self.event = frozen.clone();
        self.hadronizer.hadronize(&mut self.event)?;
        Ok(())
    }

    fn current_event(&self) -> &GeneratedEvent {
        &self.event
    }

    fn cross_section(&self) -> f64 {
        if self.trials == 0 {
            return 0.;
        }
        self.sum_weights / self.trials as f64
    }

    fn cross_section_error(&self) -> f64 {
        if self.trials < 2 {
            return 0.;
        }
        let n = self.trials as f64;
        let mean = self.sum_weights / n;
        ((self.sum_weights_squared / n - mean * mean).max(0.) / (n - 1.)).sqrt()
    }

    fn weight_sum(&self) -> Option<f64> {
        Some(self.accepted_weight_sum)
    }
}
