use crate::error::ConfigError;
use crate::hadronization::HiddenValley;
use crate::output::RecordFormat;
use crate::selection::SelectionCuts;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::str::FromStr;

/// How events are produced.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunMode {
    /// Toy t-channel dark-quark pair production.
    TChannel,
    /// Events read from a Les Houches file.
    Lhe,
}

impl FromStr for RunMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<RunMode, ConfigError> {
        match s {
            "tchannel" => Ok(RunMode::TChannel),
            "lhe" => Ok(RunMode::Lhe),
            _ => Err(ConfigError::UnsupportedMode(s.to_owned())),
        }
    }
}

/// All run settings. Every key is optional in the YAML card and command-line
/// flags take precedence.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RunCard {
    pub mode: String,
    pub nevents: usize,
    /// Output files are `<output>.evt` and `<output>.meta`.
    pub output: String,
    pub seed: u64,
    pub ecm: f64,
    pub input: Option<String>,
    /// Largest number of hard QCD partons kept by the jet matching.
    pub nmatch: usize,
    pub mphi: f64,
    pub ptcut: f64,
    pub hidden_valley: HiddenValley,
    pub cuts: SelectionCuts,
    /// Built-in detector name or path to a detector card.
    pub detector: String,
    pub record: String,
    /// Dump every attempted event here in HepMC2 format.
    pub hepmc: Option<String>,
    pub weighted: bool,
    pub rehadronize: bool,
    pub verbose: bool,
}

impl Default for RunCard {
    fn default() -> RunCard {
        RunCard {
            mode: "tchannel".to_owned(),
            nevents: 1000,
            output: "output".to_owned(),
            seed: 0,
            ecm: 13000.,
            input: None,
            nmatch: 1,
            mphi: 1000.,
            ptcut: 600.,
            hidden_valley: HiddenValley::default(),
            cuts: SelectionCuts::default(),
            detector: "CMS".to_owned(),
            record: "extended".to_owned(),
            hepmc: None,
            weighted: false,
            rehadronize: false,
            verbose: false,
        }
    }
}

impl RunCard {
    pub fn from_file(filename: &str) -> Result<RunCard, ConfigError> {
        let f = File::open(filename).map_err(|source| ConfigError::CardIo {
            path: filename.to_owned(),
            source,
        })?;
        serde_yaml::from_reader(BufReader::new(f)).map_err(|source| ConfigError::CardFormat {
            path: filename.to_owned(),
            source,
        })
    }

    pub fn run_mode(&self) -> Result<RunMode, ConfigError> {
        self.mode.parse()
    }

    pub fn record_format(&self) -> Result<RecordFormat, ConfigError> {
        self.record.parse()
    }

    /// Check everything that can be checked before a single event is generated.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.run_mode()? == RunMode::Lhe && self.input.is_none() {
            return Err(ConfigError::MissingInput);
        }
        self.record_format()?;
        self.cuts.validate()?;

        let hv = &self.hidden_valley;
        if !(hv.inv >= 0. && hv.inv <= 1.) {
            return Err(ConfigError::InvalidArgument {
                name: "inv".to_owned(),
                value: hv.inv.to_string(),
            });
        }
        if !(hv.phimass > 0.) {
            return Err(ConfigError::InvalidArgument {
                name: "phimass".to_owned(),
                value: hv.phimass.to_string(),
            });
        }
        if !(self.ecm > 0.) {
            return Err(ConfigError::InvalidArgument {
                name: "ecm".to_owned(),
                value: self.ecm.to_string(),
            });
        }
        Ok(())
    }
}
