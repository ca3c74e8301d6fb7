//! Comma-separated event and run-summary files, and the optional dump of full
//! generator records.

use crate::error::{ConfigError, RunError};
use crate::event::{GeneratedEvent, ParticleStatus, TruthCounts};
use crate::selection::{EventObservables, JetKinematics};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::str::FromStr;

/// Layout of the per-event file.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RecordFormat {
    /// Missing energy, leading jet and multiplicity only.
    Basic,
    /// Adds the dijet and transverse masses, four jet slots and truth counts.
    Extended,
}

impl FromStr for RecordFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<RecordFormat, ConfigError> {
        match s {
            "basic" => Ok(RecordFormat::Basic),
            "extended" => Ok(RecordFormat::Extended),
            _ => Err(ConfigError::UnsupportedRecordFormat(s.to_owned())),
        }
    }
}

const MISSING_PT: f64 = -1.;
const MISSING_ETA: f64 = 999.;
const MISSING_RAPIDITY: f64 = 0.;
const MISSING_MASS: f64 = 0.;
const MISSING_DPHI: f64 = 999.;
const MISSING_COUNT: i64 = -1;
const UNDEFINED_EFFICIENCY: f64 = -1.;

/// One row of the event file.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub index: usize,
    pub met: f64,
    pub mjj: Option<f64>,
    pub mt: Option<f64>,
    pub jets: [Option<JetKinematics>; EventObservables::JET_SLOTS],
    pub dphi: Option<f64>,
    pub n_jets: usize,
    pub truth: Option<TruthCounts>,
    pub weight: f64,
}

impl EventRecord {
    pub fn new(
        index: usize,
        observables: &EventObservables,
        truth: Option<TruthCounts>,
        weight: f64,
    ) -> EventRecord {
        EventRecord {
            index,
            met: observables.met.pt(),
            mjj: observables.mjj,
            mt: observables.mt,
            jets: observables.leading_jets(),
            dphi: observables.dphi,
            n_jets: observables.n_jets(),
            truth,
            weight,
        }
    }
}

/// Totals written to the metadata file once the run has finished.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub attempted: usize,
    pub accepted: usize,
    /// `None` when no event was attempted.
    pub efficiency: Option<f64>,
    /// In pb.
    pub cross_section: f64,
    pub cross_section_error: f64,
    pub weight_sum: Option<f64>,
    pub pt_cut: f64,
    pub met_cut: f64,
}

pub struct OutputWriter<W: Write> {
    events: W,
    meta: W,
    format: RecordFormat,
    weighted: bool,
}

impl OutputWriter<BufWriter<File>> {
    /// Create `<prefix>.evt` and `<prefix>.meta` and write the event header.
    pub fn create(
        prefix: &str,
        format: RecordFormat,
        weighted: bool,
    ) -> Result<OutputWriter<BufWriter<File>>, ConfigError> {
        let open = |extension: &str| {
            let path = format!("{}.{}", prefix, extension);
            File::create(&path)
                .map(BufWriter::new)
                .map_err(|source| ConfigError::OutputIo { path, source })
        };
        let events = open("evt")?;
        let meta = open("meta")?;

        OutputWriter::new(events, meta, format, weighted).map_err(|source| ConfigError::OutputIo {
            path: format!("{}.evt", prefix),
            source,
        })
    }
}

impl<W: Write> OutputWriter<W> {
    pub fn new(
        events: W,
        meta: W,
        format: RecordFormat,
        weighted: bool,
    ) -> io::Result<OutputWriter<W>> {
        let mut writer = OutputWriter {
            events,
            meta,
            format,
            weighted,
        };
        writer.write_header()?;
        Ok(writer)
    }

    fn write_header(&mut self) -> io::Result<()> {
        match self.format {
            RecordFormat::Basic => write!(self.events, "evt,MEt,pt1,dphi,nj")?,
            RecordFormat::Extended => {
                write!(self.events, "evt,MEt,mjj,Mt")?;
                for i in 1..=EventObservables::JET_SLOTS {
                    write!(self.events, ",pt{0},eta{0},y{0}", i)?;
                }
                write!(self.events, ",dphi,nj,n_meson,n_glu")?;
                if self.weighted {
                    write!(self.events, ",weight")?;
                }
            }
        }
        writeln!(self.events)
    }

    pub fn write_event(&mut self, record: &EventRecord) -> Result<(), RunError> {
        let dphi = record.dphi.unwrap_or(MISSING_DPHI);

        match self.format {
            RecordFormat::Basic => {
                let pt1 = record.jets[0].map_or(MISSING_PT, |j| j.pt);
                writeln!(
                    self.events,
                    "{},{},{},{},{}",
                    record.index, record.met, pt1, dphi, record.n_jets
                )?;
            }
            RecordFormat::Extended => {
                write!(
                    self.events,
                    "{},{},{},{}",
                    record.index,
                    record.met,
                    record.mjj.unwrap_or(MISSING_MASS),
                    record.mt.unwrap_or(MISSING_MASS)
                )?;
                for slot in record.jets.iter() {
                    match slot {
                        Some(j) => write!(self.events, ",{},{},{}", j.pt, j.eta, j.rapidity)?,
                        None => write!(
                            self.events,
                            ",{},{},{}",
                            MISSING_PT, MISSING_ETA, MISSING_RAPIDITY
                        )?,
                    }
                }

                let (n_meson, n_glu) = record.truth.map_or((MISSING_COUNT, MISSING_COUNT), |t| {
                    (t.n_meson as i64, t.n_glu as i64)
                });
                write!(self.events, ",{},{},{},{}", dphi, record.n_jets, n_meson, n_glu)?;
                if self.weighted {
                    write!(self.events, ",{}", record.weight)?;
                }
                writeln!(self.events)?;
            }
        }

        Ok(())
    }

    pub fn write_summary(&mut self, summary: &RunSummary) -> Result<(), RunError> {
        write!(
            self.meta,
            "nevt,npass,eff,total,pass,ptcut,metcut,cxn,cxn_err"
        )?;
        if self.weighted {
            write!(self.meta, ",sum_weight")?;
        }
        writeln!(self.meta)?;

        write!(
            self.meta,
            "{0},{1},{2},{0},{1},{3},{4},{5},{6}",
            summary.attempted,
            summary.accepted,
            summary.efficiency.unwrap_or(UNDEFINED_EFFICIENCY),
            summary.pt_cut,
            summary.met_cut,
            summary.cross_section,
            summary.cross_section_error
        )?;
        if self.weighted {
            write!(self.meta, ",{}", summary.weight_sum.unwrap_or(0.))?;
        }
        writeln!(self.meta)?;
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), RunError> {
        self.events.flush()?;
        self.meta.flush()?;
        Ok(())
    }

    /// The event and metadata sinks.
    pub fn into_inner(self) -> (W, W) {
        (self.events, self.meta)
    }
}

/// Writes every attempted event in the HepMC2 `IO_GenEvent` ascii format.
///
/// Incoming particles meet at the signal vertex together with every particle
/// that has no mother or whose mother is incoming. Any other particle with
/// daughters ends in a vertex of its own.
pub struct EventDump<W: Write> {
    out: W,
    finished: bool,
}

impl EventDump<Box<dyn Write>> {
    pub fn create(path: &str) -> Result<EventDump<Box<dyn Write>>, ConfigError> {
        let out: Box<dyn Write> = File::create(path)
            .map(|f| Box::new(BufWriter::new(f)) as Box<dyn Write>)
            .map_err(|source| ConfigError::OutputIo {
                path: path.to_owned(),
                source,
            })?;
        EventDump::new(out).map_err(|source| ConfigError::OutputIo {
            path: path.to_owned(),
            source,
        })
    }
}

impl<W: Write> EventDump<W> {
    const SIGNAL_VERTEX: i64 = -1;
    const FIRST_PARTICLE: usize = 10_001;

    pub fn new(mut out: W) -> io::Result<EventDump<W>> {
        writeln!(out)?;
        writeln!(out, "HepMC::Version 2.06.09")?;
        writeln!(out, "HepMC::IO_GenEvent-START_EVENT_LISTING")?;
        Ok(EventDump {
            out,
            finished: false,
        })
    }

    fn status_code(status: ParticleStatus) -> i32 {
        match status {
            ParticleStatus::Stable => 1,
            ParticleStatus::Decayed => 2,
            ParticleStatus::Intermediate => 3,
            ParticleStatus::Incoming => 4,
        }
    }

    /// Append one event with its cross section in pb.
    pub fn write_event(
        &mut self,
        number: usize,
        event: &GeneratedEvent,
        cross_section: f64,
        cross_section_error: f64,
    ) -> io::Result<()> {
        let particles = &event.particles;
        let n = particles.len();
        let incoming = |i: usize| particles[i].status == ParticleStatus::Incoming;

        let mut has_daughters = vec![false; n];
        for p in particles {
            if let Some(m) = p.mother.filter(|&m| m < n) {
                has_daughters[m] = true;
            }
        }

        // vertex each particle ends in
        let mut end_vertex = vec![0i64; n];
        let mut vertices = vec![];
        if n > 0 {
            vertices.push(Self::SIGNAL_VERTEX);
        }
        for i in 0..n {
            if incoming(i) {
                end_vertex[i] = Self::SIGNAL_VERTEX;
            } else if has_daughters[i] {
                end_vertex[i] = -(vertices.len() as i64) - 1;
                vertices.push(end_vertex[i]);
            }
        }

        let production: Vec<Option<i64>> = (0..n)
            .map(|i| {
                if incoming(i) {
                    return None;
                }
                match particles[i].mother.filter(|&m| m < n) {
                    Some(m) => Some(end_vertex[m]),
                    None => Some(Self::SIGNAL_VERTEX),
                }
            })
            .collect();

        let beams: Vec<usize> = (0..n)
            .filter(|&i| incoming(i))
            .map(|i| Self::FIRST_PARTICLE + i)
            .chain(std::iter::repeat(0))
            .take(2)
            .collect();

        writeln!(
            self.out,
            "E {} -1 -1 -1 -1 0 {} {} {} {} 0 1 {:e}",
            number,
            if n > 0 { Self::SIGNAL_VERTEX } else { 0 },
            vertices.len(),
            beams[0],
            beams[1],
            event.weight
        )?;
        writeln!(self.out, "U GEV MM")?;
        writeln!(self.out, "C {:e} {:e}", cross_section, cross_section_error)?;

        for &vertex in &vertices {
            let orphans: Vec<usize> = if vertex == Self::SIGNAL_VERTEX {
                (0..n).filter(|&i| incoming(i)).collect()
            } else {
                vec![]
            };
            let outgoing: Vec<usize> = (0..n).filter(|&i| production[i] == Some(vertex)).collect();

            writeln!(
                self.out,
                "V {} 0 0 0 0 0 {} {} 0",
                vertex,
                orphans.len(),
                outgoing.len()
            )?;
            for &i in orphans.iter().chain(outgoing.iter()) {
                let p = &particles[i];
                writeln!(
                    self.out,
                    "P {} {} {:e} {:e} {:e} {:e} {:e} {} 0 0 {} 0",
                    Self::FIRST_PARTICLE + i,
                    p.id,
                    p.momentum.x,
                    p.momentum.y,
                    p.momentum.z,
                    p.momentum.t,
                    p.momentum.mass(),
                    Self::status_code(p.status),
                    end_vertex[i]
                )?;
            }
        }
        Ok(())
    }

    /// Close the listing. Later calls do nothing.
    pub fn finish(&mut self) -> io::Result<()> {
        if !self.finished {
            writeln!(self.out, "HepMC::IO_GenEvent-END_EVENT_LISTING")?;
            writeln!(self.out)?;
            self.out.flush()?;
            self.finished = true;
        }
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}
