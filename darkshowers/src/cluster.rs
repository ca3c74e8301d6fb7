//! Sequential-recombination jet clustering in the generalised-kt family.

use std::cmp::Ordering;
use vector::LorentzVector;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum JetAlgorithm {
    Kt,
    CambridgeAachen,
    AntiKt,
}

impl JetAlgorithm {
    /// The exponent `p` of the transverse momentum in the distance measure.
    pub fn power(self) -> i32 {
        match self {
            JetAlgorithm::Kt => 1,
            JetAlgorithm::CambridgeAachen => 0,
            JetAlgorithm::AntiKt => -1,
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JetDefinition {
    pub algorithm: JetAlgorithm,
    pub radius: f64,
}

impl JetDefinition {
    pub fn new(algorithm: JetAlgorithm, radius: f64) -> JetDefinition {
        JetDefinition { algorithm, radius }
    }

    #[inline]
    fn beam_distance(&self, p: &LorentzVector<f64>) -> f64 {
        match self.algorithm.power() {
            0 => 1.,
            n => p.pt2().powi(n),
        }
    }

    #[inline]
    fn pair_distance(&self, a: &LorentzVector<f64>, b: &LorentzVector<f64>) -> f64 {
        let dr = a.delta_r(b) / self.radius;
        self.beam_distance(a).min(self.beam_distance(b)) * dr * dr
    }
}

/// Cluster `particles` into inclusive jets with `pt >= pt_min`, ordered by
/// decreasing pt. Inputs without transverse momentum are ignored.
pub fn inclusive_jets(
    particles: &[LorentzVector<f64>],
    definition: &JetDefinition,
    pt_min: f64,
) -> Vec<LorentzVector<f64>> {
    let mut pseudojets: Vec<LorentzVector<f64>> =
        particles.iter().filter(|p| p.pt2() > 0.).cloned().collect();
    let mut jets = Vec::with_capacity(pseudojets.len());

    while !pseudojets.is_empty() {
        // (distance, i, Some(j)) merges i and j, (distance, i, None) promotes i to a jet
        let mut best = (std::f64::INFINITY, 0, None);
        for (i, a) in pseudojets.iter().enumerate() {
            let d = definition.beam_distance(a);
            if d < best.0 {
                best = (d, i, None);
            }
            for (j, b) in pseudojets.iter().enumerate().skip(i + 1) {
                let d = definition.pair_distance(a, b);
                if d < best.0 {
                    best = (d, i, Some(j));
                }
            }
        }

        match best {
            (_, i, Some(j)) => {
                // j > i, so removing j first keeps i valid
                let b = pseudojets.swap_remove(j);
                pseudojets[i] += b;
            }
            (_, i, None) => {
                let jet = pseudojets.swap_remove(i);
                if jet.pt() >= pt_min {
                    jets.push(jet);
                }
            }
        }
    }

    sort_by_pt(&mut jets);
    jets
}

pub fn sort_by_pt(jets: &mut [LorentzVector<f64>]) {
    jets.sort_by(|a, b| b.pt().partial_cmp(&a.pt()).unwrap_or(Ordering::Equal));
}
