//! Producers of generated events.

use crate::error::SourceError;
use crate::event::{GeneratedEvent, TruthCounts};

pub mod hidden_valley;
pub mod lhe;

pub use self::hidden_valley::HiddenValleyGenerator;
pub use self::lhe::LheSource;

pub trait EventSource {
    /// Produce the next event. Every error except `EndOfStream` is transient.
    fn advance(&mut self) -> Result<(), SourceError>;

    /// Make `frozen` the current event and hadronize it again.
    fn rehadronize(&mut self, frozen: &GeneratedEvent) -> Result<(), SourceError>;

    fn current_event(&self) -> &GeneratedEvent;

    /// Cross section estimate in pb.
    fn cross_section(&self) -> f64;

    fn cross_section_error(&self) -> f64;

    /// Sum of the weights of all produced events, when the source tracks it.
    fn weight_sum(&self) -> Option<f64>;

    fn event_weight(&self) -> f64 {
        self.current_event().weight
    }

    fn truth_counts(&self) -> Option<TruthCounts> {
        Some(self.current_event().truth_counts())
    }
}
