use std::fs;
use std::path::Path;
use std::process::{Command, Output};

fn monojet(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_monojet"))
        .current_dir(dir)
        .args(args)
        .output()
        .unwrap()
}

const INIT: &str = "<LesHouchesEvents version=\"3.0\">
<init>
2212 2212 6500 6500 0 0 247000 247000 3 1
4.0 0.2 1.0 1
</init>
";

const GOOD_EVENT: &str = "<event>
4 1 1.0 500 0.0078 0.118
21 -1 0 0 501 502 0 0 700 700 0 0 9
21 -1 0 0 502 501 0 0 -700 700 0 0 9
4900101 1 1 2 0 0 600 0 0 700 0 0 9
-4900101 1 1 2 0 0 -600 0 0 700 0 0 9
</event>
";

// the dark quark names a mother that is not in the record
const BROKEN_EVENT: &str = "<event>
3 1 1.0 500 0.0078 0.118
21 -1 0 0 501 502 0 0 700 700 0 0 9
21 -1 0 0 502 501 0 0 -700 700 0 0 9
4900101 1 9 2 0 0 600 0 0 700 0 0 9
</event>
";

fn lhe_file(dir: &Path, events: &[&str]) -> String {
    let mut contents = INIT.to_owned();
    for event in events {
        contents.push_str(event);
    }
    contents.push_str("</LesHouchesEvents>\n");
    let path = dir.join("events.lhe");
    fs::write(&path, contents).unwrap();
    path.to_str().unwrap().to_owned()
}

#[test]
fn lhe_run_exits_cleanly_at_end_of_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = lhe_file(dir.path(), &[GOOD_EVENT, GOOD_EVENT]);

    let out = monojet(dir.path(), &["--mode", "lhe", "--input", &input, "-o", "run"]);
    assert!(out.status.success());
    let meta = fs::read_to_string(dir.path().join("run.meta")).unwrap();
    assert!(meta.lines().nth(1).unwrap().starts_with("2,"));
}

#[test]
fn repeated_broken_records_fail_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let input = lhe_file(dir.path(), &[BROKEN_EVENT; 12]);

    let out = monojet(
        dir.path(),
        &["--mode", "lhe", "--input", &input, "-o", "run", "-n", "100"],
    );
    assert!(!out.status.success());
    assert_eq!(out.status.code(), Some(1));
    // an aborted run writes no summary
    let meta = fs::read_to_string(dir.path().join("run.meta")).unwrap();
    assert!(meta.is_empty());
}

#[test]
fn unsupported_mode_exits_with_status_one() {
    let dir = tempfile::tempdir().unwrap();
    let out = monojet(dir.path(), &["--mode", "gluino", "-o", "run"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stdout).contains("mode gluino not supported"));
}

#[test]
fn hepmc_flag_dumps_attempted_events() {
    let dir = tempfile::tempdir().unwrap();
    let input = lhe_file(dir.path(), &[GOOD_EVENT, BROKEN_EVENT, GOOD_EVENT]);

    let out = monojet(
        dir.path(),
        &["--mode", "lhe", "--input", &input, "-o", "run", "--hepmc", "run.hepmc"],
    );
    assert!(out.status.success());
    let dump = fs::read_to_string(dir.path().join("run.hepmc")).unwrap();
    assert_eq!(dump.lines().filter(|l| l.starts_with("E ")).count(), 2);
}
