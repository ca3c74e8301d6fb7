//! Object selection and the event-level cut flow.

use crate::cluster::{inclusive_jets, sort_by_pt, JetAlgorithm, JetDefinition};
use crate::detector::{Candidate, Collection, DetectorSimulator};
use crate::error::ConfigError;
use serde::Deserialize;
use std::fmt;
use tracing::warn;
use vector::LorentzVector;

/// Kinematic acceptance of one kind of physics object.
#[derive(Debug, Copy, Clone, PartialEq, Deserialize)]
pub struct ObjectThresholds {
    pub pt_min: f64,
    pub eta_max: f64,
}

impl ObjectThresholds {
    #[inline]
    pub fn accepts(&self, p: &LorentzVector<f64>) -> bool {
        p.pt() > self.pt_min && p.eta().abs() <= self.eta_max
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SelectionCuts {
    /// Minimum transverse momentum of the leading jet.
    pub pt_min: f64,
    pub met_min: f64,
    pub met_max: f64,
    /// Minimum azimuthal separation between the missing momentum and any jet.
    pub dphi_min: f64,
    pub njet_min: usize,
    pub njet_max: usize,
    pub lepton_veto: bool,
    /// Merge the selected jets into Cambridge/Aachen jets of `recluster_radius`.
    pub recluster: bool,
    pub recluster_radius: f64,
    pub jets: ObjectThresholds,
    pub muons: ObjectThresholds,
    pub electrons: ObjectThresholds,
}

impl Default for SelectionCuts {
    fn default() -> SelectionCuts {
        SelectionCuts {
            pt_min: 0.,
            met_min: 0.,
            met_max: 99999.,
            dphi_min: 0.,
            njet_min: 1,
            njet_max: 100,
            lepton_veto: true,
            recluster: false,
            recluster_radius: 1.1,
            jets: ObjectThresholds {
                pt_min: 30.,
                eta_max: 2.8,
            },
            muons: ObjectThresholds {
                pt_min: 10.,
                eta_max: 2.5,
            },
            electrons: ObjectThresholds {
                pt_min: 20.,
                eta_max: 2.5,
            },
        }
    }
}

impl SelectionCuts {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.met_min > self.met_max {
            return Err(ConfigError::InvalidCuts(format!(
                "empty MET window [{}, {}]",
                self.met_min, self.met_max
            )));
        }
        if self.njet_min > self.njet_max {
            return Err(ConfigError::InvalidCuts(format!(
                "empty jet multiplicity window [{}, {}]",
                self.njet_min, self.njet_max
            )));
        }
        if self.recluster && !(self.recluster_radius > 0.) {
            return Err(ConfigError::InvalidCuts(format!(
                "recluster radius {} must be positive",
                self.recluster_radius
            )));
        }
        Ok(())
    }
}

/// Views of the detector collections for one event. Missing collections are empty.
#[derive(Debug, Copy, Clone)]
pub struct ReconstructedObjects<'a> {
    pub missing_et: Option<&'a Candidate>,
    pub jets: &'a [Candidate],
    pub muons: &'a [Candidate],
    pub electrons: &'a [Candidate],
}

impl<'a> ReconstructedObjects<'a> {
    pub fn fetch(detector: &'a dyn DetectorSimulator) -> ReconstructedObjects<'a> {
        let get = move |c| detector.fetch(c).unwrap_or(&[]);
        ReconstructedObjects {
            missing_et: get(Collection::MissingEt).first(),
            jets: get(Collection::Jets),
            muons: get(Collection::Muons),
            electrons: get(Collection::Electrons),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Rejection {
    MissingMet,
    MetWindow,
    LeptonVeto,
    TooFewJets,
    TooManyJets,
    LeadingJetPt,
    JetMetAlignment,
}

impl Rejection {
    /// All reasons in cut-flow order.
    pub const ALL: [Rejection; 7] = [
        Rejection::MissingMet,
        Rejection::MetWindow,
        Rejection::LeptonVeto,
        Rejection::TooFewJets,
        Rejection::TooManyJets,
        Rejection::LeadingJetPt,
        Rejection::JetMetAlignment,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Rejection::MissingMet => "missing MET",
            Rejection::MetWindow => "MET window",
            Rejection::LeptonVeto => "lepton veto",
            Rejection::TooFewJets => "too few jets",
            Rejection::TooManyJets => "too many jets",
            Rejection::LeadingJetPt => "leading jet pt",
            Rejection::JetMetAlignment => "jet-MET dphi",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct JetKinematics {
    pub pt: f64,
    pub eta: f64,
    pub rapidity: f64,
}

impl JetKinematics {
    pub fn of(jet: &LorentzVector<f64>) -> JetKinematics {
        JetKinematics {
            pt: jet.pt(),
            eta: jet.eta(),
            rapidity: jet.rapidity(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventObservables {
    /// Missing transverse momentum as `(|MET|, METx, METy, 0)`.
    pub met: LorentzVector<f64>,
    /// Selected jets, leading first.
    pub jets: Vec<LorentzVector<f64>>,
    pub leptons: Vec<LorentzVector<f64>>,
    /// Invariant mass of the two leading jets before reclustering.
    pub mjj: Option<f64>,
    /// Transverse mass of the missing momentum and the two leading jets.
    pub mt: Option<f64>,
    /// Smallest azimuthal separation between the missing momentum and a jet.
    pub dphi: Option<f64>,
}

impl EventObservables {
    pub const JET_SLOTS: usize = 4;

    pub fn leading_jets(&self) -> [Option<JetKinematics>; EventObservables::JET_SLOTS] {
        let mut slots = [None; EventObservables::JET_SLOTS];
        for (slot, jet) in slots.iter_mut().zip(&self.jets) {
            *slot = Some(JetKinematics::of(jet));
        }
        slots
    }

    #[inline]
    pub fn n_jets(&self) -> usize {
        self.jets.len()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Selection {
    Accepted(EventObservables),
    Rejected(Rejection),
}

impl Selection {
    pub fn is_accepted(&self) -> bool {
        match self {
            Selection::Accepted(_) => true,
            Selection::Rejected(_) => false,
        }
    }
}

fn min_delta_phi(met: &LorentzVector<f64>, jets: &[LorentzVector<f64>]) -> Option<f64> {
    jets.iter()
        .map(|j| met.delta_phi(j))
        .fold(None, |acc: Option<f64>, d| Some(acc.map_or(d, |a| a.min(d))))
}

pub struct ObjectSelector {
    cuts: SelectionCuts,
    recluster_definition: JetDefinition,
}

impl ObjectSelector {
    pub fn new(cuts: SelectionCuts) -> ObjectSelector {
        let recluster_definition =
            JetDefinition::new(JetAlgorithm::CambridgeAachen, cuts.recluster_radius);
        ObjectSelector {
            cuts,
            recluster_definition,
        }
    }

    pub fn cuts(&self) -> &SelectionCuts {
        &self.cuts
    }

    /// Run the cut flow on one event. Cuts are applied in a fixed order and the
    /// first failing one is reported.
    pub fn select(&self, objects: &ReconstructedObjects) -> Selection {
        let cuts = &self.cuts;

        let met = match objects.missing_et {
            Some(c) => c.momentum,
            None => {
                warn!("no missing ET candidate in event, skipping");
                return Selection::Rejected(Rejection::MissingMet);
            }
        };

        let met_pt = met.pt();
        if met_pt < cuts.met_min || met_pt > cuts.met_max {
            return Selection::Rejected(Rejection::MetWindow);
        }

        let leptons: Vec<LorentzVector<f64>> = objects
            .muons
            .iter()
            .filter(|c| cuts.muons.accepts(&c.momentum))
            .chain(
                objects
                    .electrons
                    .iter()
                    .filter(|c| cuts.electrons.accepts(&c.momentum)),
            )
            .map(|c| c.momentum)
            .collect();

        if cuts.lepton_veto && !leptons.is_empty() {
            return Selection::Rejected(Rejection::LeptonVeto);
        }

        let mut jets: Vec<LorentzVector<f64>> = objects
            .jets
            .iter()
            .map(|c| c.momentum)
            .filter(|p| cuts.jets.accepts(p))
            .collect();
        sort_by_pt(&mut jets);

        let mjj = if jets.len() >= 2 {
            Some((jets[0] + jets[1]).mass())
        } else {
            None
        };

        if cuts.recluster {
            jets = inclusive_jets(&jets, &self.recluster_definition, 0.);
        }

        if jets.len() < cuts.njet_min {
            return Selection::Rejected(Rejection::TooFewJets);
        }
        if jets.len() > cuts.njet_max {
            return Selection::Rejected(Rejection::TooManyJets);
        }
        let leading_pt = jets.first().map_or(0., |j| j.pt());
        if leading_pt < cuts.pt_min {
            return Selection::Rejected(Rejection::LeadingJetPt);
        }

        let dphi = min_delta_phi(&met, &jets);
        if let Some(d) = dphi {
            if d < cuts.dphi_min {
                return Selection::Rejected(Rejection::JetMetAlignment);
            }
        }

        let mt = if jets.len() >= 2 {
            Some((met + jets[0] + jets[1]).transverse_mass())
        } else {
            None
        };

        Selection::Accepted(EventObservables {
            met,
            jets,
            leptons,
            mjj,
            mt,
            dphi,
        })
    }
}

/// Number of events accepted and rejected at each step of the selection.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CutFlow {
    pub accepted: usize,
    rejected: [usize; 7],
}

impl CutFlow {
    pub fn record(&mut self, selection: &Selection) {
        match selection {
            Selection::Accepted(_) => self.accepted += 1,
            Selection::Rejected(r) => self.rejected[r.index()] += 1,
        }
    }

    pub fn rejected(&self, reason: Rejection) -> usize {
        self.rejected[reason.index()]
    }

    pub fn total(&self) -> usize {
        self.accepted + self.rejected.iter().sum::<usize>()
    }
}

impl fmt::Display for CutFlow {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut remaining = self.total();
        writeln!(f, "{:<16} {:>10}", "events", remaining)?;
        for r in Rejection::ALL.iter() {
            remaining -= self.rejected(*r);
            writeln!(
                f,
                "{:<16} {:>10} {:>10}",
                r.name(),
                -(self.rejected(*r) as isize),
                remaining
            )?;
        }
        write!(f, "{:<16} {:>10}", "accepted", self.accepted)
    }
}
