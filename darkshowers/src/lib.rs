#[macro_use]
extern crate lazy_static;
pub extern crate vector;

macro_rules! hashmap {
    ($( $key: expr => $val: expr ),*) => {{
         let mut map = ::std::collections::HashMap::new();
         $( map.insert($key, $val); )*
         map
    }}
}

pub mod cluster;
pub mod controller;
pub mod detector;
pub mod detector_card;
pub mod error;
pub mod event;
pub mod hadronization;
pub mod output;
pub mod phase_space_generator;
pub mod progress;
pub mod run_card;
pub mod selection;
pub mod source;
pub mod translator;

/// Conversion from GeV^-2 to picobarn.
pub const GEV2_TO_PB: f64 = 0.389379304e9;
