use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const PLAN: &str = "Alice works at Acme.\n\nAcme is in Canada.";

/// Command isolated from the user's config directory and environment.
fn quarry(home: &Path) -> Command {
    let mut cmd: Command = cargo_bin_cmd!("quarry").into();
    cmd.current_dir(home);
    cmd.env("XDG_CONFIG_HOME", home.join("config"));
    cmd.env("HOME", home);
    for key in [
        "QUARRY_CONFIG",
        "QUARRY_INSIGHT_URL",
        "QUARRY_EXTRACTION_URL",
        "QUARRY_CHUNK_MAX_CHARS",
        "RUST_LOG",
    ] {
        cmd.env_remove(key);
    }
    cmd
}

/// `<tmp>/corpus/SFU/strategic_plan_2024.txt` holding [`PLAN`].
fn corpus() -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("corpus").join("SFU");
    fs::create_dir_all(&dir).unwrap();
    let file = dir.join("strategic_plan_2024.txt");
    fs::write(&file, PLAN).unwrap();
    (tmp, file)
}

fn stdout_json(output: &std::process::Output) -> serde_json::Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

// --- Binary startup ---

#[test]
fn binary_runs() {
    let mut cmd: Command = cargo_bin_cmd!("quarry").into();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("quarry"));
}

// --- Run ---

#[test]
fn run_exports_full_record() {
    let (tmp, file) = corpus();

    let output = quarry(tmp.path())
        .arg("run")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("extract_triples: 2 accepted (auto)"))
        .get_output()
        .clone();

    let record = stdout_json(&output);
    assert_eq!(record["chunks"], serde_json::json!([PLAN]));
    assert_eq!(record["metadata"]["institution"], "SFU");
    assert_eq!(record["metadata"]["docType"], "Strategic Plan");
    assert_eq!(record["metadata"]["year"], "2024");
    assert_eq!(record["entities"], serde_json::json!(["Acme", "Alice", "Canada"]));
    assert_eq!(record["triples"][0]["predicate"], "worksAt");
    assert_eq!(record["triples"][1]["object"], "Canada");
}

#[test]
fn run_accepts_directory() {
    let (tmp, file) = corpus();
    fs::write(file.with_file_name("budget.txt"), "Funding comes from Canada.").unwrap();
    fs::write(file.with_file_name(".hidden.txt"), "Ignored.").unwrap();

    let output = quarry(tmp.path())
        .arg("run")
        .arg(file.parent().unwrap())
        .assert()
        .success()
        .stderr(predicate::str::contains("parse: 2 accepted"))
        .get_output()
        .clone();

    let record = stdout_json(&output);
    let chunk = record["chunks"][0].as_str().unwrap();
    assert!(chunk.starts_with("Funding comes from Canada."));
    assert!(!chunk.contains("Ignored"));
}

#[test]
fn run_metadata_flags_win_over_suggestions() {
    let (tmp, file) = corpus();

    let output = quarry(tmp.path())
        .args(["run", "--institution", "Simon Fraser University", "--year", "25"])
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: year"))
        .get_output()
        .clone();

    let record = stdout_json(&output);
    assert_eq!(record["metadata"]["institution"], "Simon Fraser University");
    assert_eq!(record["metadata"]["year"], "25");
    assert_eq!(record["metadata"]["docType"], "Strategic Plan");
}

#[test]
fn run_with_override_files() {
    let (tmp, file) = corpus();
    let chunks = tmp.path().join("chunks.txt");
    let entities = tmp.path().join("entities.txt");
    let triples = tmp.path().join("triples.txt");
    fs::write(&chunks, "First chunk.\n\nSecond chunk.").unwrap();
    fs::write(&entities, "UBC, , Deloitte, Deloite").unwrap();
    fs::write(&triples, "UBC|partnersWith|Deloitte\nBadLine\n").unwrap();

    let output = quarry(tmp.path())
        .arg("run")
        .arg(&file)
        .arg("--chunks")
        .arg(&chunks)
        .arg("--entities")
        .arg(&entities)
        .arg("--triples")
        .arg(&triples)
        .assert()
        .success()
        .stderr(predicate::str::contains("warning: entity 2"))
        .stderr(predicate::str::contains("warning: line 2"))
        .stderr(predicate::str::contains(
            r#"note: "Deloite" and "Deloitte" may be the same entity"#,
        ))
        .get_output()
        .clone();

    let record = stdout_json(&output);
    assert_eq!(record["chunks"], serde_json::json!(["First chunk.", "Second chunk."]));
    assert_eq!(
        record["entities"],
        serde_json::json!(["Deloite", "Deloitte", "UBC"])
    );
    assert_eq!(record["triples"].as_array().unwrap().len(), 1);
}

#[test]
fn run_writes_output_file() {
    let (tmp, file) = corpus();
    let out = tmp.path().join("export.json");

    quarry(tmp.path())
        .arg("run")
        .arg(&file)
        .arg("--compact")
        .arg("--output")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Wrote"));

    let written = fs::read_to_string(&out).unwrap();
    assert!(written.starts_with(r#"{"chunks":["#));
    assert!(!written.contains('\n'));
}

#[test]
fn run_skips_undecodable_file() {
    let (tmp, file) = corpus();
    let broken = file.with_file_name("broken.txt");
    fs::write(&broken, [0xc3, 0x28, 0xa0]).unwrap();

    quarry(tmp.path())
        .arg("run")
        .arg(&file)
        .arg(&broken)
        .assert()
        .success()
        .stderr(predicate::str::contains("parse: 1 accepted"))
        .stderr(predicate::str::contains("broken.txt"));
}

#[test]
fn run_requires_paths() {
    let tmp = TempDir::new().unwrap();
    quarry(tmp.path()).arg("run").assert().failure();
}

#[test]
fn run_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    quarry(tmp.path())
        .args(["run", "nope.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("file not found"));
}

// --- Triples ---

#[test]
fn triples_reports_rejected_lines() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("triples.txt");
    fs::write(&file, "Alice|worksAt|Acme\nBadLine\nAcme|locatedIn|Canada\n").unwrap();

    let output = quarry(tmp.path())
        .arg("triples")
        .arg(&file)
        .assert()
        .success()
        .stderr(predicate::str::contains("line 2"))
        .stderr(predicate::str::contains("2 accepted, 1 rejected"))
        .get_output()
        .clone();

    let triples = stdout_json(&output);
    assert_eq!(triples.as_array().unwrap().len(), 2);
    assert_eq!(triples[1]["predicate"], "locatedIn");
}

#[test]
fn triples_uses_configured_delimiter() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("quarry.toml");
    let file = tmp.path().join("triples.txt");
    fs::write(&config, "[triples]\ndelimiter = \";\"\n").unwrap();
    fs::write(&file, "UBC;partnersWith;Deloitte\n").unwrap();

    quarry(tmp.path())
        .arg("--config")
        .arg(&config)
        .arg("triples")
        .arg(&file)
        .assert()
        .success()
        .stdout(predicate::str::contains("partnersWith"));
}

#[test]
fn triples_missing_file_fails() {
    let tmp = TempDir::new().unwrap();
    quarry(tmp.path())
        .args(["triples", "absent.txt"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to read"));
}

// --- Ask ---

#[test]
fn ask_refuses_blank_question() {
    let tmp = TempDir::new().unwrap();
    quarry(tmp.path())
        .args(["ask", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Question is empty"));
}

#[test]
fn ask_unreachable_service_fails() {
    let tmp = TempDir::new().unwrap();
    quarry(tmp.path())
        .args(["ask", "What are the goals?", "--endpoint", "http://127.0.0.1:9/query"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to fetch insights"));
}

// --- Config ---

#[test]
fn config_prints_defaults() {
    let tmp = TempDir::new().unwrap();
    quarry(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("[chunking]"))
        .stdout(predicate::str::contains("max_chars = 1200"))
        .stdout(predicate::str::contains("http://localhost:8000/query"));
}

#[test]
fn config_env_override() {
    let tmp = TempDir::new().unwrap();
    quarry(tmp.path())
        .env("QUARRY_CHUNK_MAX_CHARS", "300")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("max_chars = 300"));
}

#[test]
fn config_from_user_config_dir() {
    let tmp = TempDir::new().unwrap();
    let dir = tmp.path().join("config").join("quarry");
    fs::create_dir_all(&dir).unwrap();
    fs::write(dir.join("config.toml"), "[extraction]\ntimeout_secs = 7\n").unwrap();

    quarry(tmp.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("timeout_secs = 7"));
}

#[test]
fn invalid_config_fails() {
    let tmp = TempDir::new().unwrap();
    let config = tmp.path().join("bad.toml");
    fs::write(&config, "[chunking]\nmax_chars = 0\n").unwrap();

    quarry(tmp.path())
        .arg("--config")
        .arg(&config)
        .arg("config")
        .assert()
        .failure()
        .stderr(predicate::str::contains("chunking.max_chars"));
}
