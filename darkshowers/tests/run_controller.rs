mod common;

use common::{controller, output_of, Outcome, ScriptedSource};
use darkshowers::controller::{RunPolicy, RunSettings, RunState, RETRY_BUDGET};
use darkshowers::error::RunError;
use darkshowers::selection::Rejection;
use proptest::prelude::*;

#[test]
fn aborts_after_exactly_ten_consecutive_failures() {
    let source = ScriptedSource::new(vec![Outcome::Fail; 20]);
    let calls = source.calls();
    let mut run = controller(RunSettings::new(RunPolicy::FixedCount(5)), source, true);

    match run.run() {
        Err(RunError::RetryBudgetExhausted { failures }) => assert_eq!(failures, RETRY_BUDGET),
        other => panic!("unexpected result {:?}", other),
    }
    assert_eq!(calls.advance.get(), 10);
    assert_eq!(run.state(), RunState::Aborted);
    assert_eq!(run.counters().attempted, 0);
}

#[test]
fn successes_reset_the_failure_streak() {
    let mut script = vec![Outcome::Fail; 9];
    script.push(Outcome::Event);
    script.extend(vec![Outcome::Fail; 9]);
    script.push(Outcome::Event);
    let mut run = controller(
        RunSettings::new(RunPolicy::FixedCount(2)),
        ScriptedSource::new(script),
        true,
    );

    let summary = run.run().unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.accepted, 2);
    assert_eq!(run.counters().total_failures, 18);
    assert_eq!(run.counters().consecutive_failures, 0);
}

#[test]
fn end_of_stream_finishes_the_run() {
    let source = ScriptedSource::new(vec![Outcome::Event, Outcome::Fail, Outcome::Event]);
    let mut run = controller(
        RunSettings::new(RunPolicy::UntilExhausted(100)),
        source,
        true,
    );

    let summary = run.run().unwrap();
    assert_eq!(run.state(), RunState::Done);
    assert!(run.counters().end_of_stream);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.efficiency, Some(1.));
    assert_eq!(summary.cross_section, 3.5);
    assert_eq!(summary.weight_sum, None);

    let (events, meta) = output_of(run);
    assert_eq!(events.lines().count(), 3);
    assert!(events.lines().nth(1).unwrap().starts_with("0,200,"));
    assert!(events.lines().nth(2).unwrap().starts_with("1,200,"));
    assert_eq!(meta.lines().nth(1), Some("2,2,1,2,2,0,0,3.5,0.5"));
}

#[test]
fn until_exhausted_stops_at_accepted_target() {
    let source = ScriptedSource::endless();
    let calls = source.calls();
    let mut run = controller(RunSettings::new(RunPolicy::UntilExhausted(3)), source, true);

    let summary = run.run().unwrap();
    assert_eq!(summary.accepted, 3);
    assert_eq!(calls.advance.get(), 3);
    assert!(!run.counters().end_of_stream);
}

#[test]
fn frozen_events_are_resampled_four_times_out_of_five() {
    let source = ScriptedSource::endless();
    let calls = source.calls();
    let mut settings = RunSettings::new(RunPolicy::FixedCount(10));
    settings.frozen = true;
    let mut run = controller(settings, source, true);

    let summary = run.run().unwrap();
    assert_eq!(summary.attempted, 10);
    assert_eq!(calls.advance.get(), 2);
    assert_eq!(calls.rehadronize.get(), 10);
}

#[test]
fn missing_met_skips_the_event() {
    let mut run = controller(
        RunSettings::new(RunPolicy::FixedCount(3)),
        ScriptedSource::endless(),
        false,
    );

    let summary = run.run().unwrap();
    assert_eq!(summary.attempted, 3);
    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.efficiency, Some(0.));
    assert_eq!(run.cut_flow().rejected(Rejection::MissingMet), 3);

    let (events, _) = output_of(run);
    assert_eq!(events.lines().count(), 1);
}

#[test]
fn weighted_runs_report_weights() {
    let mut settings = RunSettings::new(RunPolicy::FixedCount(1));
    settings.weighted = true;
    let mut run = controller(settings, ScriptedSource::endless(), true);

    let summary = run.run().unwrap();
    assert_eq!(summary.weight_sum, Some(7.));

    let (events, meta) = output_of(run);
    assert!(events.lines().next().unwrap().ends_with(",weight"));
    // one invisible pair, no dark gluon, weight 2
    assert!(events.lines().nth(1).unwrap().ends_with(",1,1,0,2"));
    assert!(meta.lines().nth(1).unwrap().ends_with(",7"));
}

#[test]
fn nothing_attempted_has_undefined_efficiency() {
    let mut run = controller(
        RunSettings::new(RunPolicy::FixedCount(0)),
        ScriptedSource::endless(),
        true,
    );
    let summary = run.run().unwrap();
    assert_eq!(summary.efficiency, None);

    // a finished run keeps its summary
    assert_eq!(run.run().unwrap(), summary);
    let (_, meta) = output_of(run);
    assert_eq!(meta.lines().count(), 2);
    assert!(meta.lines().nth(1).unwrap().starts_with("0,0,-1,"));
}

fn outcome() -> impl Strategy<Value = Outcome> {
    prop_oneof![
        3 => Just(Outcome::Event),
        2 => Just(Outcome::Fail),
        1 => Just(Outcome::End),
    ]
}

proptest! {
    #[test]
    fn accepted_never_exceeds_attempted(
        script in prop::collection::vec(outcome(), 0..60),
        target in 0usize..30,
        frozen in any::<bool>(),
        exhaust in any::<bool>(),
        with_met in any::<bool>(),
    ) {
        let policy = if exhaust {
            RunPolicy::UntilExhausted(target)
        } else {
            RunPolicy::FixedCount(target)
        };
        let mut settings = RunSettings::new(policy);
        settings.frozen = frozen;
        let mut run = controller(settings, ScriptedSource::new(script), with_met);

        let mut steps = 0;
        while !run.state().is_terminal() {
            run.step().unwrap();
            let c = run.counters();
            prop_assert!(c.accepted <= c.attempted);
            prop_assert!(c.consecutive_failures < RETRY_BUDGET || run.state() == RunState::Aborted);
            steps += 1;
            prop_assert!(steps < 10_000);
        }
    }
}
