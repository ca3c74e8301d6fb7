#![allow(dead_code)]

use darkshowers::controller::{RunController, RunSettings};
use darkshowers::detector::{Candidate, Collection, DetectorSimulator};
use darkshowers::error::{HadronizationError, SourceError};
use darkshowers::event::{pdg, GeneratedEvent, Particle, ParticleStatus};
use darkshowers::output::{OutputWriter, RecordFormat};
use darkshowers::selection::{ObjectSelector, SelectionCuts};
use darkshowers::source::EventSource;
use darkshowers::vector::LorentzVector;
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Outcome {
    Event,
    Fail,
    End,
}

#[derive(Debug, Clone, Default)]
pub struct Calls {
    pub advance: Rc<Cell<usize>>,
    pub rehadronize: Rc<Cell<usize>>,
}

/// A source replaying a fixed list of outcomes, then reporting end of stream.
pub struct ScriptedSource {
    script: VecDeque<Outcome>,
    repeat_last: bool,
    event: GeneratedEvent,
    calls: Calls,
}

impl ScriptedSource {
    pub fn new(script: Vec<Outcome>) -> ScriptedSource {
        ScriptedSource {
            script: script.into(),
            repeat_last: false,
            event: GeneratedEvent::default(),
            calls: Calls::default(),
        }
    }

    /// Produce events forever.
    pub fn endless() -> ScriptedSource {
        let mut source = ScriptedSource::new(vec![Outcome::Event]);
        source.repeat_last = true;
        source
    }

    pub fn calls(&self) -> Calls {
        self.calls.clone()
    }
}

/// One hard visible pion recoiling against an invisible dark-pion pair.
pub fn monojet_event() -> GeneratedEvent {
    let mut event = GeneratedEvent::new(2.);
    event.push(Particle::new(
        pdg::PION,
        ParticleStatus::Stable,
        LorentzVector::from_pt_eta_phi_m(200., 0.3, 0., 0.14),
    ));
    event.push(Particle::new(
        pdg::DARK_PION,
        ParticleStatus::Stable,
        LorentzVector::from_pt_eta_phi_m(100., 0.1, 3.1, 20.),
    ));
    event.push(Particle::new(
        -pdg::DARK_PION,
        ParticleStatus::Stable,
        LorentzVector::from_pt_eta_phi_m(100., -0.1, -3.1, 20.),
    ));
    event
}

impl EventSource for ScriptedSource {
    fn advance(&mut self) -> Result<(), SourceError> {
        self.calls.advance.set(self.calls.advance.get() + 1);
        let outcome = if self.repeat_last && self.script.len() == 1 {
            self.script[0]
        } else {
            self.script.pop_front().unwrap_or(Outcome::End)
        };

        match outcome {
            Outcome::Event => {
                self.event = monojet_event();
                Ok(())
            }
            Outcome::Fail => Err(SourceError::Hadronization(
                HadronizationError::PhaseSpace { multiplicity: 3 },
            )),
            Outcome::End => Err(SourceError::EndOfStream),
        }
    }

    fn rehadronize(&mut self, frozen: &GeneratedEvent) -> Result<(), SourceError> {
        self.calls
            .rehadronize
            .set(self.calls.rehadronize.get() + 1);
        self.event = frozen.clone();
        Ok(())
    }

    fn current_event(&self) -> &GeneratedEvent {
        &self.event
    }

    fn cross_section(&self) -> f64 {
        3.5
    }

    fn cross_section_error(&self) -> f64 {
        0.5
    }

    fn weight_sum(&self) -> Option<f64> {
        Some(7.)
    }
}

/// Every visible staged particle becomes a jet. Missing energy is optional.
pub struct ScriptedDetector {
    with_met: bool,
    staged: Vec<Candidate>,
    outputs: HashMap<Collection, Vec<Candidate>>,
}

impl ScriptedDetector {
    pub fn new(with_met: bool) -> ScriptedDetector {
        ScriptedDetector {
            with_met,
            staged: vec![],
            outputs: HashMap::new(),
        }
    }
}

impl DetectorSimulator for ScriptedDetector {
    fn clear(&mut self) {
        self.staged.clear();
        self.outputs.clear();
    }

    fn staging_area(&mut self) -> &mut Vec<Candidate> {
        &mut self.staged
    }

    fn process(&mut self) {
        let jets: Vec<Candidate> = self
            .staged
            .iter()
            .filter(|c| !pdg::is_invisible(c.id))
            .cloned()
            .collect();

        if self.with_met {
            let visible: LorentzVector<f64> = jets.iter().map(|c| c.momentum).sum();
            let (x, y) = (-visible.x, -visible.y);
            self.outputs.insert(
                Collection::MissingEt,
                vec![Candidate::new(0, LorentzVector::from_args(x.hypot(y), x, y, 0.))],
            );
        }
        self.outputs.insert(Collection::Jets, jets);
    }

    fn fetch(&self, collection: Collection) -> Option<&[Candidate]> {
        self.outputs.get(&collection).map(|c| c.as_slice())
    }
}

pub fn controller(
    settings: RunSettings,
    source: ScriptedSource,
    with_met: bool,
) -> RunController<Vec<u8>> {
    let output = OutputWriter::new(vec![], vec![], RecordFormat::Extended, settings.weighted)
        .expect("in-memory sinks do not fail");
    RunController::new(
        settings,
        Box::new(source),
        Box::new(ScriptedDetector::new(with_met)),
        ObjectSelector::new(SelectionCuts::default()),
        output,
    )
}

pub fn output_of(controller: RunController<Vec<u8>>) -> (String, String) {
    let (events, meta) = controller.into_output().into_inner();
    (
        String::from_utf8(events).expect("utf8 output"),
        String::from_utf8(meta).expect("utf8 output"),
    )
}
