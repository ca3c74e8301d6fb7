//! The event loop: generation with retries, optional rehadronization of a
//! frozen event, detector simulation, selection and output.

use crate::detector::DetectorSimulator;
use crate::error::{RunError, SourceError};
use crate::event::GeneratedEvent;
use crate::output::{EventDump, EventRecord, OutputWriter, RunSummary};
use crate::progress::ProgressTimer;
use crate::selection::{CutFlow, ObjectSelector, ReconstructedObjects, Rejection, Selection};
use crate::source::EventSource;
use crate::translator::translate;
use std::io::Write;
use tracing::{debug, error, info, warn};

/// Consecutive failed generation requests tolerated before giving up.
pub const RETRY_BUDGET: usize = 10;
/// In frozen mode, a new hard process is drawn every this many attempts.
pub const RESAMPLE_PERIOD: usize = 5;
pub const PROGRESS_INTERVAL: usize = 10;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunState {
    Generating,
    Resampling,
    Translating,
    Selecting,
    Done,
    Aborted,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        self == RunState::Done || self == RunState::Aborted
    }
}

/// When the event loop stops.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RunPolicy {
    /// After this many attempted events.
    FixedCount(usize),
    /// After this many accepted events, or earlier when the source runs dry.
    UntilExhausted(usize),
}

impl RunPolicy {
    pub fn target(self) -> usize {
        match self {
            RunPolicy::FixedCount(n) | RunPolicy::UntilExhausted(n) => n,
        }
    }

    pub fn is_complete(self, counters: &RunCounters) -> bool {
        match self {
            RunPolicy::FixedCount(n) => counters.attempted >= n,
            RunPolicy::UntilExhausted(n) => counters.accepted >= n || counters.end_of_stream,
        }
    }

    /// The counter the target refers to.
    pub fn progress(self, counters: &RunCounters) -> usize {
        match self {
            RunPolicy::FixedCount(_) => counters.attempted,
            RunPolicy::UntilExhausted(_) => counters.accepted,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunCounters {
    pub attempted: usize,
    pub accepted: usize,
    pub consecutive_failures: usize,
    pub total_failures: usize,
    pub end_of_stream: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub policy: RunPolicy,
    /// Keep one hard process and rehadronize it for several attempts.
    pub frozen: bool,
    pub weighted: bool,
    pub retry_budget: usize,
    pub resample_period: usize,
}

impl RunSettings {
    pub fn new(policy: RunPolicy) -> RunSettings {
        RunSettings {
            policy,
            frozen: false,
            weighted: false,
            retry_budget: RETRY_BUDGET,
            resample_period: RESAMPLE_PERIOD,
        }
    }
}

pub struct RunController<W: Write> {
    settings: RunSettings,
    source: Box<dyn EventSource>,
    detector: Box<dyn DetectorSimulator>,
    selector: ObjectSelector,
    output: OutputWriter<W>,
    event_dump: Option<EventDump<Box<dyn Write>>>,
    cut_flow: CutFlow,
    counters: RunCounters,
    frozen_event: Option<GeneratedEvent>,
    timer: ProgressTimer,
    state: RunState,
    summary: Option<RunSummary>,
}

impl<W: Write> RunController<W> {
    pub fn new(
        settings: RunSettings,
        source: Box<dyn EventSource>,
        detector: Box<dyn DetectorSimulator>,
        selector: ObjectSelector,
        output: OutputWriter<W>,
    ) -> RunController<W> {
        let timer = ProgressTimer::new(settings.policy.target());
        RunController {
            settings,
            source,
            detector,
            selector,
            output,
            event_dump: None,
            cut_flow: CutFlow::default(),
            counters: RunCounters::default(),
            frozen_event: None,
            timer,
            state: RunState::Generating,
            summary: None,
        }
    }

    /// Also write the full record of every attempted event to `dump`.
    pub fn with_event_dump(mut self, dump: EventDump<Box<dyn Write>>) -> RunController<W> {
        self.event_dump = Some(dump);
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn counters(&self) -> &RunCounters {
        &self.counters
    }

    pub fn cut_flow(&self) -> &CutFlow {
        &self.cut_flow
    }

    pub fn into_output(self) -> OutputWriter<W> {
        self.output
    }

    /// Perform a single state transition and return the new state.
    pub fn step(&mut self) -> Result<RunState, RunError> {
        let state = self.state;
        self.state = match state {
            RunState::Generating => self.generate(),
            RunState::Resampling => self.resample(),
            RunState::Translating => {
                if let Some(dump) = self.event_dump.as_mut() {
                    dump.write_event(
                        self.counters.attempted.saturating_sub(1),
                        self.source.current_event(),
                        self.source.cross_section(),
                        self.source.cross_section_error(),
                    )?;
                }
                self.detector.clear();
                let staged = translate(self.source.current_event(), self.detector.as_mut());
                self.detector.process();
                debug!(staged, "event passed through detector simulation");
                RunState::Selecting
            }
            RunState::Selecting => {
                self.select()?;
                RunState::Generating
            }
            terminal => terminal,
        };
        Ok(self.state)
    }

    fn generate(&mut self) -> RunState {
        if self.settings.policy.is_complete(&self.counters) {
            return RunState::Done;
        }

        if self.settings.frozen
            && self.frozen_event.is_some()
            && self.counters.attempted % self.settings.resample_period != 0
        {
            return RunState::Resampling;
        }

        match self.source.advance() {
            Ok(()) if self.settings.frozen => {
                self.frozen_event = Some(self.source.current_event().clone());
                RunState::Resampling
            }
            Ok(()) => {
                self.counters.consecutive_failures = 0;
                self.counters.attempted += 1;
                RunState::Translating
            }
            Err(SourceError::EndOfStream) => {
                info!("event source reached end of stream");
                self.counters.end_of_stream = true;
                RunState::Done
            }
            Err(e) => self.fail(e),
        }
    }

    fn resample(&mut self) -> RunState {
        let result = match &self.frozen_event {
            Some(frozen) => self.source.rehadronize(frozen),
            None => return RunState::Generating,
        };

        match result {
            Ok(()) => {
                self.counters.consecutive_failures = 0;
                self.counters.attempted += 1;
                RunState::Translating
            }
            Err(e) => self.fail(e),
        }
    }

    fn fail(&mut self, e: SourceError) -> RunState {
        self.counters.consecutive_failures += 1;
        self.counters.total_failures += 1;
        warn!(
            failures = self.counters.consecutive_failures,
            "event generation failed: {}", e
        );

        if self.counters.consecutive_failures >= self.settings.retry_budget {
            error!("event generation aborted prematurely, owing to repeated errors");
            RunState::Aborted
        } else {
            RunState::Generating
        }
    }

    fn select(&mut self) -> Result<(), RunError> {
        let selection = {
            let objects = ReconstructedObjects::fetch(self.detector.as_ref());
            self.selector.select(&objects)
        };
        self.cut_flow.record(&selection);

        if let Selection::Accepted(observables) = &selection {
            let record = EventRecord::new(
                self.counters.accepted,
                observables,
                self.source.truth_counts(),
                self.source.event_weight(),
            );
            self.output.write_event(&record)?;
            self.counters.accepted += 1;
        }

        if self.counters.attempted % PROGRESS_INTERVAL == 0 {
            self.timer
                .update(self.settings.policy.progress(&self.counters));
            info!("{}", self.timer);
        }

        Ok(())
    }

    /// Step until the run is over, then write the summary.
    pub fn run(&mut self) -> Result<RunSummary, RunError> {
        while !self.state.is_terminal() {
            self.step()?;
        }

        if let Some(dump) = self.event_dump.as_mut() {
            dump.finish()?;
        }

        if self.state == RunState::Aborted {
            return Err(RunError::RetryBudgetExhausted {
                failures: self.counters.consecutive_failures,
            });
        }

        if let Some(summary) = &self.summary {
            return Ok(summary.clone());
        }

        let summary = self.summarize();
        self.output.write_summary(&summary)?;
        self.output.flush()?;

        self.timer
            .update(self.settings.policy.progress(&self.counters));
        info!("{}", self.timer);
        info!(
            "{} of {} events accepted, cross section {:.4e} +- {:.4e} pb",
            summary.accepted, summary.attempted, summary.cross_section, summary.cross_section_error
        );
        for reason in Rejection::ALL.iter() {
            let n = self.cut_flow.rejected(*reason);
            if n > 0 {
                info!("rejected by {}: {}", reason.name(), n);
            }
        }
        debug!("cut flow\n{}", self.cut_flow);

        self.summary = Some(summary.clone());
        Ok(summary)
    }

    fn summarize(&self) -> RunSummary {
        let cuts = self.selector.cuts();
        let efficiency = if self.counters.attempted > 0 {
            Some(self.counters.accepted as f64 / self.counters.attempted as f64)
        } else {
            None
        };

        RunSummary {
            attempted: self.counters.attempted,
            accepted: self.counters.accepted,
            efficiency,
            cross_section: self.source.cross_section(),
            cross_section_error: self.source.cross_section_error(),
            weight_sum: if self.settings.weighted {
                self.source.weight_sum()
            } else {
                None
            },
            pt_cut: cuts.pt_min,
            met_cut: cuts.met_min,
        }
    }
}
