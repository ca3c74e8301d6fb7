use crate::error::ConfigError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs::File;
use std::io::BufReader;

/// Acceptance and reconstruction parameters of the fast detector.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DetectorCard {
    pub name: String,
    pub calorimeter_eta_max: f64,
    pub muon_eta_max: f64,
    pub muon_pt_min: f64,
    pub electron_eta_max: f64,
    pub electron_pt_min: f64,
    /// Cone around a lepton in which hadronic activity is summed.
    pub isolation_delta_r: f64,
    /// Largest summed pt in the cone relative to the lepton pt.
    pub isolation_pt_ratio_max: f64,
    pub jet_radius: f64,
    pub jet_pt_min: f64,
}

lazy_static! {
    static ref BUILTIN_CARDS: HashMap<&'static str, DetectorCard> = hashmap![
        "CMS" => DetectorCard {
            name: "CMS".to_owned(),
            calorimeter_eta_max: 5.0,
            muon_eta_max: 2.4,
            muon_pt_min: 5.0,
            electron_eta_max: 2.5,
            electron_pt_min: 5.0,
            isolation_delta_r: 0.5,
            isolation_pt_ratio_max: 0.12,
            jet_radius: 0.5,
            jet_pt_min: 20.0
        },
        "ATLAS" => DetectorCard {
            name: "ATLAS".to_owned(),
            calorimeter_eta_max: 4.9,
            muon_eta_max: 2.7,
            muon_pt_min: 5.0,
            electron_eta_max: 2.47,
            electron_pt_min: 7.0,
            isolation_delta_r: 0.3,
            isolation_pt_ratio_max: 0.15,
            jet_radius: 0.6,
            jet_pt_min: 20.0
        }
    ];
}

impl DetectorCard {
    /// A built-in card by name, case-insensitive.
    pub fn builtin(name: &str) -> Option<DetectorCard> {
        BUILTIN_CARDS.get(name.to_uppercase().as_str()).cloned()
    }

    pub fn from_file(filename: &str) -> Result<DetectorCard, ConfigError> {
        let f = File::open(filename).map_err(|source| ConfigError::CardIo {
            path: filename.to_owned(),
            source,
        })?;
        serde_yaml::from_reader(BufReader::new(f)).map_err(|source| ConfigError::CardFormat {
            path: filename.to_owned(),
            source,
        })
    }

    /// Resolve a `--detector` value: a built-in name or a path to a YAML card.
    pub fn resolve(spec: &str) -> Result<DetectorCard, ConfigError> {
        match DetectorCard::builtin(spec) {
            Some(card) => Ok(card),
            None => DetectorCard::from_file(spec),
        }
    }
}
