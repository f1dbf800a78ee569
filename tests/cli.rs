//! CLI behaviour that needs no Galaxy server: argument handling and the
//! checks that run before the first request.

use assert_cmd::Command;
use predicates::prelude::*;

fn cli() -> Command {
    let mut cmd = Command::cargo_bin("galaxy-assemble").expect("binary is built");
    cmd.env_remove("GALAXY_URL")
        .env_remove("GALAXY_API_KEY")
        .env_remove("RUST_LOG");
    cmd
}

fn fastq(dir: &tempfile::TempDir, name: &str) -> std::path::PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, "@r1\nACGT\n+\nIIII\n").unwrap();
    path
}

#[test]
fn help_lists_flags_and_env_vars() {
    cli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--fastq1"))
        .stdout(predicate::str::contains("--fastq2"))
        .stdout(predicate::str::contains("GALAXY_API_KEY"));
}

#[test]
fn fastq1_is_required() {
    cli()
        .args(["--galaxy-url", "http://127.0.0.1:9", "--api-key", "k"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--fastq1"));
}

#[test]
fn missing_url_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let r1 = fastq(&dir, "r1.fastq");
    cli()
        .arg("--fastq1")
        .arg(&r1)
        .arg("--api-key")
        .arg("k")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GALAXY_URL"));
}

#[test]
fn missing_key_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    let r1 = fastq(&dir, "r1.fastq");
    cli()
        .arg("--fastq1")
        .arg(&r1)
        .env("GALAXY_URL", "http://127.0.0.1:9")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("GALAXY_API_KEY"));
}

#[test]
fn malformed_url_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let r1 = fastq(&dir, "r1.fastq");
    cli()
        .arg("--fastq1")
        .arg(&r1)
        .args(["--galaxy-url", "usegalaxy.org", "--api-key", "k"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Invalid configuration"));
}

#[test]
fn missing_fastq_fails_before_any_request() {
    let dir = tempfile::tempdir().unwrap();
    cli()
        .arg("--fastq1")
        .arg(dir.path().join("absent_R1.fastq"))
        .args(["--galaxy-url", "http://127.0.0.1:9", "--api-key", "k", "--quiet"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("FASTQ file not found"));
}

#[test]
fn zero_wait_timeout_is_rejected_by_clap() {
    let dir = tempfile::tempdir().unwrap();
    let r1 = fastq(&dir, "r1.fastq");
    cli()
        .arg("--fastq1")
        .arg(&r1)
        .args(["--wait-timeout", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--wait-timeout"));
}
