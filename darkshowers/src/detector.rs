//! The detector-simulation boundary and a parametrised fast detector.

use crate::cluster::{inclusive_jets, JetAlgorithm, JetDefinition};
use crate::detector_card::DetectorCard;
use crate::event::pdg;
use std::collections::HashMap;
use vector::LorentzVector;

/// Named output collections of a detector simulation.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    MissingEt,
    Jets,
    Muons,
    Electrons,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::MissingEt => "MissingET",
            Collection::Jets => "jets",
            Collection::Muons => "muons",
            Collection::Electrons => "electrons",
        }
    }
}

/// A particle staged for simulation or an object reconstructed from them.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Candidate {
    pub id: i32,
    pub momentum: LorentzVector<f64>,
}

impl Candidate {
    pub fn new(id: i32, momentum: LorentzVector<f64>) -> Candidate {
        Candidate { id, momentum }
    }
}

pub trait DetectorSimulator {
    /// Drop the staged particles and every reconstructed collection.
    fn clear(&mut self);

    fn staging_area(&mut self) -> &mut Vec<Candidate>;

    /// Reconstruct the output collections from the staged particles.
    fn process(&mut self);

    /// `None` when the collection was not produced for the current event.
    fn fetch(&self, collection: Collection) -> Option<&[Candidate]>;
}

pub struct FastDetector {
    card: DetectorCard,
    jet_definition: JetDefinition,
    stable: Vec<Candidate>,
    outputs: HashMap<Collection, Vec<Candidate>>,
}

impl FastDetector {
    pub fn new(card: DetectorCard) -> FastDetector {
        let jet_definition = JetDefinition::new(JetAlgorithm::AntiKt, card.jet_radius);
        FastDetector {
            card,
            jet_definition,
            stable: vec![],
            outputs: HashMap::new(),
        }
    }

    pub fn card(&self) -> &DetectorCard {
        &self.card
    }

    fn is_lepton_candidate(&self, c: &Candidate) -> bool {
        let (pt, eta) = (c.momentum.pt(), c.momentum.eta().abs());
        match c.id.abs() {
            pdg::MUON => pt > self.card.muon_pt_min && eta <= self.card.muon_eta_max,
            pdg::ELECTRON => pt > self.card.electron_pt_min && eta <= self.card.electron_eta_max,
            _ => false,
        }
    }
}

impl DetectorSimulator for FastDetector {
    fn clear(&mut self) {
        self.stable.clear();
        self.outputs.clear();
    }

    fn staging_area(&mut self) -> &mut Vec<Candidate> {
        &mut self.stable
    }

    fn process(&mut self) {
        let visible: Vec<&Candidate> = self
            .stable
            .iter()
            .filter(|c| {
                !pdg::is_invisible(c.id)
                    && c.momentum.pt2() > 0.
                    && c.momentum.eta().abs() <= self.card.calorimeter_eta_max
            })
            .collect();

        let mut muons = vec![];
        let mut electrons = vec![];
        let mut calorimeter = vec![];

        for (i, c) in visible.iter().enumerate() {
            if self.is_lepton_candidate(c) {
                let activity: f64 = visible
                    .iter()
                    .enumerate()
                    .filter(|(j, o)| {
                        *j != i && o.momentum.delta_r(&c.momentum) < self.card.isolation_delta_r
                    })
                    .map(|(_, o)| o.momentum.pt())
                    .sum();

                if activity <= self.card.isolation_pt_ratio_max * c.momentum.pt() {
                    if c.id.abs() == pdg::MUON {
                        muons.push(**c);
                    } else {
                        electrons.push(**c);
                    }
                    continue;
                }
            }
            calorimeter.push(c.momentum);
        }

        let jets: Vec<Candidate> =
            inclusive_jets(&calorimeter, &self.jet_definition, self.card.jet_pt_min)
                .into_iter()
                .map(|j| Candidate::new(0, j))
                .collect();

        let visible_sum: LorentzVector<f64> = visible.iter().map(|c| c.momentum).sum();
        let (mex, mey) = (-visible_sum.x, -visible_sum.y);
        let met = Candidate::new(0, LorentzVector::from_args(mex.hypot(mey), mex, mey, 0.));

        self.outputs.insert(Collection::MissingEt, vec![met]);
        self.outputs.insert(Collection::Jets, jets);
        self.outputs.insert(Collection::Muons, muons);
        self.outputs.insert(Collection::Electrons, electrons);
    }

    fn fetch(&self, collection: Collection) -> Option<&[Candidate]> {
        self.outputs.get(&collection).map(|c| c.as_slice())
    }
}
