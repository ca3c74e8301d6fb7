mod common;

use common::{Outcome, ScriptedDetector, ScriptedSource};
use darkshowers::controller::{RunController, RunPolicy, RunSettings};
use darkshowers::detector::FastDetector;
use darkshowers::detector_card::DetectorCard;
use darkshowers::error::ConfigError;
use darkshowers::hadronization::HiddenValley;
use darkshowers::output::{EventDump, OutputWriter, RecordFormat};
use darkshowers::selection::{ObjectSelector, SelectionCuts};
use darkshowers::source::LheSource;
use std::fs;
use std::io::Write;

#[test]
fn run_writes_event_and_meta_files() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let prefix = prefix.to_str().unwrap();

    let output = OutputWriter::create(prefix, RecordFormat::Basic, false).unwrap();
    let mut run = RunController::new(
        RunSettings::new(RunPolicy::UntilExhausted(10)),
        Box::new(ScriptedSource::new(vec![Outcome::Event; 2])),
        Box::new(ScriptedDetector::new(true)),
        ObjectSelector::new(SelectionCuts::default()),
        output,
    );
    run.run().unwrap();

    let events = fs::read_to_string(format!("{}.evt", prefix)).unwrap();
    let lines: Vec<&str> = events.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "evt,MEt,pt1,dphi,nj");
    assert!(lines[2].starts_with("1,200,200,"));
    assert!(lines[2].ends_with(",1"));

    let meta = fs::read_to_string(format!("{}.meta", prefix)).unwrap();
    assert_eq!(
        meta,
        "nevt,npass,eff,total,pass,ptcut,metcut,cxn,cxn_err\n2,2,1,2,2,0,0,3.5,0.5\n"
    );
}

#[test]
fn unwritable_output_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("missing").join("run");
    match OutputWriter::create(prefix.to_str().unwrap(), RecordFormat::Extended, true) {
        Err(ConfigError::OutputIo { path, .. }) => assert!(path.ends_with("run.evt")),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("output should not be creatable"),
    }
}

#[test]
fn event_dump_holds_every_attempted_event() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run");
    let prefix = prefix.to_str().unwrap();
    let hepmc = dir.path().join("run.hepmc");

    let script = vec![Outcome::Event, Outcome::Fail, Outcome::Event];
    let output = OutputWriter::create(prefix, RecordFormat::Basic, false).unwrap();
    let mut run = RunController::new(
        RunSettings::new(RunPolicy::UntilExhausted(10)),
        Box::new(ScriptedSource::new(script)),
        // without missing energy nothing is accepted, but both events are dumped
        Box::new(ScriptedDetector::new(false)),
        ObjectSelector::new(SelectionCuts::default()),
        output,
    )
    .with_event_dump(EventDump::create(hepmc.to_str().unwrap()).unwrap());
    let summary = run.run().unwrap();
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.accepted, 0);

    let dump = fs::read_to_string(&hepmc).unwrap();
    let events: Vec<&str> = dump.lines().filter(|l| l.starts_with("E ")).collect();
    assert_eq!(events.len(), 2);
    assert!(events[0].starts_with("E 0 "));
    assert!(events[1].starts_with("E 1 "));
    assert_eq!(dump.lines().filter(|l| l.starts_with("P ")).count(), 6);
    assert!(dump.contains("C 3.5e0 5e-1"));
    assert!(dump.trim_end().ends_with("HepMC::IO_GenEvent-END_EVENT_LISTING"));
}

const LHE: &str = "<LesHouchesEvents version=\"3.0\">
<init>
2212 2212 6500 6500 0 0 247000 247000 3 1
4.0 0.2 1.0 1
</init>
<event>
4 1 1.0 500 0.0078 0.118
21 -1 0 0 501 502 0 0 700 700 0 0 9
21 -1 0 0 502 501 0 0 -700 700 0 0 9
4900101 1 1 2 0 0 600 0 0 700 0 0 9
-4900101 1 1 2 0 0 -600 0 0 700 0 0 9
</event>
<event>
4 1 1.0 500 0.0078 0.118
21 -1 0 0 501 502 0 0 700 700 0 0 9
21 -1 0 0 502 501 0 0 -700 700 0 0 9
4900101 1 1 2 0 0 0 600 0 700 0 0 9
-4900101 1 1 2 0 0 0 -600 0 700 0 0 9
</event>
</LesHouchesEvents>
";

#[test]
fn lhe_file_runs_to_end_of_stream() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("events.lhe");
    fs::File::create(&input)
        .unwrap()
        .write_all(LHE.as_bytes())
        .unwrap();
    let prefix = dir.path().join("lhe");
    let prefix = prefix.to_str().unwrap();

    let hidden_valley = HiddenValley {
        inv: 0.5,
        ..HiddenValley::default()
    };
    let source = LheSource::open(input.to_str().unwrap(), 1, hidden_valley, 17, true).unwrap();
    let detector = FastDetector::new(DetectorCard::builtin("ATLAS").unwrap());
    let cuts = SelectionCuts {
        njet_min: 0,
        lepton_veto: false,
        ..SelectionCuts::default()
    };
    let mut run = RunController::new(
        RunSettings::new(RunPolicy::UntilExhausted(1000)),
        Box::new(source),
        Box::new(detector),
        ObjectSelector::new(cuts),
        OutputWriter::create(prefix, RecordFormat::Extended, false).unwrap(),
    );

    let summary = run.run().unwrap();
    assert!(run.counters().end_of_stream);
    assert_eq!(summary.attempted, 2);
    assert_eq!(summary.accepted, 2);
    assert_eq!(summary.cross_section, 4.0);

    let events = fs::read_to_string(format!("{}.evt", prefix)).unwrap();
    assert_eq!(events.lines().count(), 3);
}
