// Drive the cdrecon binary end to end over small job files.

use std::fs;
use std::path::Path;
use std::process::Command;

fn bin() -> Command {
    Command::new(env!("CARGO_BIN_EXE_cdrecon"))
}

const HEADER: &str = "ani,dnis,seize,billsec,rate,lrn";

fn write_job(dir: &Path, rows_a: &[&str], rows_b: &[&str]) -> std::path::PathBuf {
    let mut a = String::from(HEADER);
    for r in rows_a {
        a.push('\n');
        a.push_str(r);
    }
    let mut b = String::from(HEADER);
    for r in rows_b {
        b.push('\n');
        b.push_str(r);
    }
    fs::write(dir.join("a.csv"), a).unwrap();
    fs::write(dir.join("b.csv"), b).unwrap();

    let job = r#"
name = "smoke"

[yours]
file = "a.csv"
[yours.columns]
a_number = "ani"
b_number = "dnis"
seize_time = "seize"
billed_duration = "billsec"
rate = "rate"
lrn = "lrn"

[provider]
file = "b.csv"
[provider.columns]
a_number = "ani"
b_number = "dnis"
seize_time = "seize"
billed_duration = "billsec"
rate = "rate"
lrn = "lrn"
"#;
    let path = dir.join("job.toml");
    fs::write(&path, job).unwrap();
    path
}

#[test]
fn clean_run_exits_zero() {
    let dir = tempfile::tempdir().unwrap();
    let row = "5551234567,5559876543,2024-01-15T10:30:00Z,120,0.015,5559876543";
    let job = write_job(dir.path(), &[row], &[row]);

    let output = bin().arg("run").arg(&job).arg("--json").output().unwrap();
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["summary"]["matched_records"], 1);
    assert_eq!(json["summary"]["total_discrepancies"], 0);
    assert_eq!(json["has_more"], false);
}

#[test]
fn discrepancies_exit_one_and_export_csv() {
    let dir = tempfile::tempdir().unwrap();
    let job = write_job(
        dir.path(),
        &["5551234567,5559876543,2024-01-15T10:30:00Z,60,0.015,5559876543"],
        &["5551234567,5559876543,2024-01-15T10:30:00Z,90,0.015,5559876543"],
    );
    let csv_path = dir.path().join("discrepancies.csv");

    let output = bin()
        .arg("run")
        .arg(&job)
        .arg("--export")
        .arg(&csv_path)
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(1));

    let exported = fs::read_to_string(&csv_path).unwrap();
    assert!(exported.contains("duration_mismatch"));
    assert!(exported.contains("Monetary Impact ($)"));
}

#[test]
fn invalid_job_file_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("job.toml");
    fs::write(&path, "this is not a job file").unwrap();

    let output = bin().arg("run").arg(&path).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid job file"));
}

#[test]
fn validate_checks_files_exist() {
    let dir = tempfile::tempdir().unwrap();
    let row = "5551234567,5559876543,2024-01-15T10:30:00Z,120,0.015,5559876543";
    let job = write_job(dir.path(), &[row], &[row]);

    let output = bin().arg("validate").arg(&job).output().unwrap();
    assert!(output.status.success());

    fs::remove_file(dir.path().join("b.csv")).unwrap();
    let output = bin().arg("validate").arg(&job).output().unwrap();
    assert_eq!(output.status.code(), Some(2));
}
