use crate::detector::{Candidate, DetectorSimulator};
use crate::event::GeneratedEvent;

/// Stage every stable particle of `event` in the detector, replacing anything
/// staged before. Returns the number of staged particles.
pub fn translate(event: &GeneratedEvent, detector: &mut dyn DetectorSimulator) -> usize {
    let staging = detector.staging_area();
    staging.clear();
    staging.extend(
        event
            .final_state()
            .map(|p| Candidate::new(p.id, p.momentum)),
    );
    staging.len()
}
