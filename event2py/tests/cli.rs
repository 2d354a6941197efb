use std::fs;
use std::path::PathBuf;
use std::process::Command;

use anyhow::{Context, Result};
use serde_json::Value;
use tempfile::tempdir;

fn fixture() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("BeachWalk.ve.xml")
}

#[test]
fn single_event_prints_to_stdout() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_event2py"))
        .arg(fixture())
        .output()
        .context("executing event2py")?;

    assert!(
        output.status.success(),
        "event2py exited with {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8(output.stdout)?;
    assert!(stdout.starts_with("# import game interface\n"));
    assert!(stdout.ends_with("eventname = \"BeachWalk\"\n"));
    Ok(())
}

#[test]
fn batch_writes_scripts_and_report() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory")?;
    let events = temp_dir.path().join("Events").join("Beach");
    fs::create_dir_all(&events)?;
    fs::copy(fixture(), events.join("BeachWalk.ve.xml"))?;
    fs::write(events.join("Broken.ve.xml"), "<VisualEvent><Seq_Objects>")?;
    fs::write(events.join("readme.txt"), "not an event")?;

    let out_dir = temp_dir.path().join("scripts");
    let report_path = temp_dir.path().join("report.json");
    let output = Command::new(env!("CARGO_BIN_EXE_event2py"))
        .arg(temp_dir.path().join("Events"))
        .arg("--output-dir")
        .arg(&out_dir)
        .arg("--json-report")
        .arg(&report_path)
        .arg("--keep-going")
        .output()
        .context("executing event2py batch")?;

    // One event failed, so the run reports failure after writing everything else.
    assert!(!output.status.success());
    let script = fs::read_to_string(out_dir.join("BeachWalk.py"))?;
    assert!(script.contains("game.set_schedule(eventname, days=3)"));
    assert!(!out_dir.join("Broken.py").exists());

    let report: Value = serde_json::from_str(&fs::read_to_string(&report_path)?)?;
    assert_eq!(report["translated"], 1);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["unsupported_kinds"]["PlaySound"], 1);
    let events = report["events"].as_array().context("events array")?;
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event_name"], "BeachWalk");
    assert_eq!(events[0]["trigger_type"], "Location");
    assert!(events[1]["error"].as_str().is_some_and(|error| error.contains("Broken")));
    Ok(())
}

#[test]
fn batch_stops_at_first_failure_without_keep_going() -> Result<()> {
    let temp_dir = tempdir().context("creating temporary directory")?;
    let events = temp_dir.path().join("Events");
    fs::create_dir_all(&events)?;
    fs::write(events.join("Aaa.ve.xml"), "<VisualEvent><Seq_Objects>")?;
    fs::copy(fixture(), events.join("BeachWalk.ve.xml"))?;

    let out_dir = temp_dir.path().join("scripts");
    let output = Command::new(env!("CARGO_BIN_EXE_event2py"))
        .arg(&events)
        .arg("--output-dir")
        .arg(&out_dir)
        .output()
        .context("executing event2py batch")?;

    assert!(!output.status.success());
    assert!(!out_dir.join("BeachWalk.py").exists());
    Ok(())
}

#[test]
fn several_events_need_an_output_dir() -> Result<()> {
    let output = Command::new(env!("CARGO_BIN_EXE_event2py"))
        .arg(fixture())
        .arg(fixture())
        .output()
        .context("executing event2py")?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--output-dir"), "unexpected stderr: {stderr}");
    Ok(())
}
