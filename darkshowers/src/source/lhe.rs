//! Streamed Les Houches event files.
//!
//! Records are read one at a time through `lhef`. Events with more hard QCD
//! partons than the matching allows are dropped before they reach the caller, and the reported
//! cross section is scaled by the fraction that survives.

use super::EventSource;
use crate::error::{ConfigError, SourceError};
use crate::event::{pdg, GeneratedEvent, Particle, ParticleStatus};
use crate::hadronization::{Hadronizer, HiddenValley};
use lhef::{Reader, HEPEUP, HEPRUP};
use std::fs::File;
use std::io::{BufRead, BufReader};
use tracing::{debug, info};
use vector::LorentzVector;

/// The contents of the `<init>` block.
#[derive(Debug, Clone, PartialEq)]
pub struct RunInfo {
    pub beam_ids: [i32; 2],
    pub beam_energies: [f64; 2],
    pub weight_strategy: i32,
    /// Per-subprocess cross sections in pb.
    pub cross_sections: Vec<f64>,
    pub cross_section_errors: Vec<f64>,
}

impl RunInfo {
    pub fn total_cross_section(&self) -> f64 {
        self.cross_sections.iter().sum()
    }

    pub fn total_cross_section_error(&self) -> f64 {
        self.cross_section_errors
            .iter()
            .map(|e| e * e)
            .sum::<f64>()
            .sqrt()
    }
}

/// Parton-multiplicity veto applied to the hard process.
#[derive(Debug, Clone)]
pub struct JetMatching {
    max_partons: usize,
    tried: usize,
    vetoed: usize,
}

impl JetMatching {
    pub fn for_init(info: &RunInfo, max_partons: usize) -> Result<JetMatching, ConfigError> {
        if info.cross_sections.is_empty() {
            return Err(ConfigError::MatchingUnavailable(
                "the init block declares no subprocess".to_owned(),
            ));
        }
        Ok(JetMatching {
            max_partons,
            tried: 0,
            vetoed: 0,
        })
    }

    /// Count the event and decide whether it is dropped.
    pub fn veto(&mut self, event: &GeneratedEvent) -> bool {
        self.tried += 1;
        let n_partons = event
            .final_state()
            .filter(|p| pdg::is_qcd_parton(p.id))
            .count();
        if n_partons > self.max_partons {
            self.vetoed += 1;
            true
        } else {
            false
        }
    }

    pub fn efficiency(&self) -> f64 {
        if self.tried == 0 {
            1.
        } else {
            (self.tried - self.vetoed) as f64 / self.tried as f64
        }
    }

    pub fn vetoed(&self) -> usize {
        self.vetoed
    }
}

impl RunInfo {
    fn from_heprup(heprup: &HEPRUP) -> RunInfo {
        RunInfo {
            beam_ids: heprup.IDBMUP,
            beam_energies: heprup.EBMUP,
            weight_strategy: heprup.IDWTUP,
            cross_sections: heprup.XSECUP.clone(),
            cross_section_errors: heprup.XERRUP.clone(),
        }
    }
}

/// Convert a parsed record, rejecting entries the reader accepts but that do
/// not describe a usable event.
fn to_event(record: &HEPEUP) -> Result<GeneratedEvent, String> {
    let n = record.IDUP.len();
    let lengths = [record.ISTUP.len(), record.MOTHUP.len(), record.PUP.len()];
    if record.NUP < 0 || record.NUP as usize != n || lengths.iter().any(|&l| l != n) {
        return Err(format!("NUP is {} but {} particles follow", record.NUP, n));
    }

    let mut event = GeneratedEvent::new(record.XWGTUP);
    for i in 0..n {
        let status = match record.ISTUP[i] {
            -1 => ParticleStatus::Incoming,
            1 => ParticleStatus::Stable,
            _ => ParticleStatus::Intermediate,
        };
        let [px, py, pz, e, _] = record.PUP[i];
        if ![px, py, pz, e].iter().all(|x| x.is_finite()) {
            return Err(format!("particle {} has a non-finite momentum", i + 1));
        }

        let mut particle = Particle::new(
            record.IDUP[i],
            status,
            LorentzVector::from_args(e, px, py, pz),
        );
        match record.MOTHUP[i][0] {
            0 => {}
            m if m > 0 && m as usize <= n => particle.mother = Some(m as usize - 1),
            m => return Err(format!("particle {} has mother {} out of range", i + 1, m)),
        }
        event.push(particle);
    }
    Ok(event)
}

pub struct LheSource<R: BufRead> {
    reader: Reader<R>,
    records: usize,
    exhausted: bool,
    info: RunInfo,
    matching: JetMatching,
    hadron_level: bool,
    hadronizer: Hadronizer,
    event: GeneratedEvent,
    weight_sum: f64,
}

impl LheSource<BufReader<File>> {
    pub fn open(
        path: &str,
        nmatch: usize,
        hidden_valley: HiddenValley,
        seed: u64,
        hadron_level: bool,
    ) -> Result<LheSource<BufReader<File>>, ConfigError> {
        let f = File::open(path).map_err(|source| ConfigError::InputIo {
            path: path.to_owned(),
            source,
        })?;
        LheSource::new(BufReader::new(f), nmatch, hidden_valley, seed, hadron_level)
    }
}

impl<R: BufRead> LheSource<R> {
    /// Read the header and `<init>` block of `stream` and set up the matching
    /// veto with at most `nmatch` hard QCD partons.
    pub fn new(
        stream: R,
        nmatch: usize,
        hidden_valley: HiddenValley,
        seed: u64,
        hadron_level: bool,
    ) -> Result<LheSource<R>, ConfigError> {
        let reader = Reader::new(stream).map_err(|e| ConfigError::MalformedInit(e.to_string()))?;
        let info = RunInfo::from_heprup(reader.heprup());
        let matching = JetMatching::for_init(&info, nmatch)?;

        info!(
            "LHE input with {} subprocesses, cross section {:.4e} pb",
            info.cross_sections.len(),
            info.total_cross_section()
        );

        Ok(LheSource {
            reader,
            records: 0,
            exhausted: false,
            info,
            matching,
            hadron_level,
            hadronizer: Hadronizer::new(hidden_valley, seed),
            event: GeneratedEvent::default(),
            weight_sum: 0.,
        })
    }

    pub fn run_info(&self) -> &RunInfo {
        &self.info
    }

    pub fn matching(&self) -> &JetMatching {
        &self.matching
    }

    fn next_record(&mut self) -> Result<GeneratedEvent, SourceError> {
        if self.exhausted {
            return Err(SourceError::EndOfStream);
        }
        self.records += 1;
        let record = match self.reader.hepeup() {
            Ok(Some(record)) => record,
            Ok(None) => {
                self.exhausted = true;
                return Err(SourceError::EndOfStream);
            }
            Err(e) => return Err(self.malformed(e.to_string())),
        };
        to_event(&record).map_err(|reason| self.malformed(reason))
    }

    fn malformed(&self, reason: String) -> SourceError {
        SourceError::Malformed {
            record: self.records,
            reason,
        }
    }
}

impl<R: BufRead> EventSource for LheSource<R> {
    fn advance(&mut self) -> Result<(), SourceError> {
        loop {
            let mut event = self.next_record()?;
            if self.matching.veto(&event) {
                debug!("event vetoed by jet matching");
                continue;
            }

            if self.hadron_level {
                self.hadronizer.hadronize(&mut event)?;
            }

            self.weight_sum += event.weight;
            self.event = event;
            return Ok(());
        }
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
        self.info.total_cross_section() * self.matching.efficiency()
    }

    fn cross_section_error(&self) -> f64 {
        self.info.total_cross_section_error() * self.matching.efficiency()
    }

    fn weight_sum(&self) -> Option<f64> {
        Some(self.weight_sum)
    }
}
