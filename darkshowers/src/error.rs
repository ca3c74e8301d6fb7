//! Error types for the generation pipeline.

use std::io;
use thiserror::Error;

/// Problems detected before the event loop starts. All of them are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("mode {0} not supported")]
    UnsupportedMode(String),

    #[error("record format {0} not supported")]
    UnsupportedRecordFormat(String),

    #[error("mode lhe requires an input file")]
    MissingInput,

    #[error("invalid value {value:?} for {name}")]
    InvalidArgument { name: String, value: String },

    #[error("invalid selection: {0}")]
    InvalidCuts(String),

    #[error("cannot read card {path}: {source}")]
    CardIo { path: String, source: io::Error },

    #[error("cannot parse card {path}: {source}")]
    CardFormat {
        path: String,
        source: serde_yaml::Error,
    },

    #[error("cannot open input {path}: {source}")]
    InputIo { path: String, source: io::Error },

    #[error("malformed LHE init block: {0}")]
    MalformedInit(String),

    #[error("cannot open {path}: {source}")]
    OutputIo { path: String, source: io::Error },

    #[error("cannot obtain matching hook: {0}")]
    MatchingUnavailable(String),
}

/// Failure to turn partons into hadrons for a single event.
#[derive(Debug, Error)]
pub enum HadronizationError {
    #[error("parton {id} with energy {energy} cannot form a hadron of mass {mass}")]
    BelowThreshold { id: i32, energy: f64, mass: f64 },

    #[error("phase-space generation failed for a {multiplicity}-body cluster decay")]
    PhaseSpace { multiplicity: usize },
}

/// Outcome of a failed request to an event source.
///
/// Only `EndOfStream` is a normal condition. Everything else is transient
/// and retried by the run controller.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("reached end of event stream")]
    EndOfStream,

    #[error("event generation failed: {0}")]
    GenerationFailed(String),

    #[error("hadronization failed: {0}")]
    Hadronization(#[from] HadronizationError),

    #[error("malformed event record {record}: {reason}")]
    Malformed { record: usize, reason: String },
}

impl SourceError {
    pub fn is_end_of_stream(&self) -> bool {
        match self {
            SourceError::EndOfStream => true,
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("event generation aborted after {failures} consecutive failures")]
    RetryBudgetExhausted { failures: usize },

    #[error("cannot write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Run(#[from] RunError),
}
