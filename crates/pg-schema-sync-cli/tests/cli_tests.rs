//! CLI integration tests for pg-schema-sync.
//!
//! These tests verify command-line argument parsing, help output, exit
//! codes, and full file-mode sync runs. No live database is required.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;

/// Get a command for the pg-schema-sync binary.
fn cmd() -> Command {
    Command::cargo_bin("pg-schema-sync").unwrap()
}

fn write_fileset(dir: &Path, schema_sql: &str) {
    std::fs::write(dir.join("schema.sql"), schema_sql).unwrap();
    std::fs::write(dir.join("procs.sql"), "").unwrap();
    std::fs::write(dir.join("triggers.sql"), "").unwrap();
}

const SCHEMA_SQL: &str = r#"-- Schema Definition
CREATE TABLE public.users (
    id bigint NOT NULL,
    email character varying NOT NULL
);
ALTER TABLE public.users ADD CONSTRAINT users_pkey PRIMARY KEY (id);
"#;

const SCHEMA_SQL_NO_EMAIL: &str = r#"-- Schema Definition
CREATE TABLE public.users (
    id bigint NOT NULL
);
ALTER TABLE public.users ADD CONSTRAINT users_pkey PRIMARY KEY (id);
"#;

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_shows_all_commands() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("sync"))
        .stdout(predicate::str::contains("gen"));
}

#[test]
fn test_sync_subcommand_help() {
    cmd()
        .args(["sync", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--source-dir"))
        .stdout(predicate::str::contains("--target-dir"))
        .stdout(predicate::str::contains("--source-schema"))
        .stdout(predicate::str::contains("--target-schema"))
        .stdout(predicate::str::contains("--output"));
}

#[test]
fn test_gen_subcommand_help() {
    cmd()
        .args(["gen", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--output-dir"))
        .stdout(predicate::str::contains("--schema"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("pg-schema-sync"));
}

// =============================================================================
// Error handling
// =============================================================================

#[test]
fn test_missing_config_fails_with_nonzero_exit() {
    cmd()
        .args(["--config", "/nonexistent/config.yaml", "sync"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_one_sided_dir_flag_rejected() {
    let dir = tempfile::tempdir().unwrap();
    cmd()
        .args(["sync", "--source-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--target-dir"));
}

#[test]
fn test_nonexistent_dir_rejected() {
    cmd()
        .args([
            "sync",
            "--source-dir",
            "/nonexistent/a",
            "--target-dir",
            "/nonexistent/b",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a directory"));
}

// =============================================================================
// File-mode sync runs
// =============================================================================

#[test]
fn test_sync_identical_dirs_reports_in_sync() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    write_fileset(source.path(), SCHEMA_SQL);
    write_fileset(target.path(), SCHEMA_SQL);

    cmd()
        .args(["sync", "--source-dir"])
        .arg(source.path())
        .arg("--target-dir")
        .arg(target.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("-- Schema Sync Script"))
        .stdout(predicate::str::contains("-- END OF SCHEMA SYNC SCRIPT"))
        .stderr(predicate::str::contains("already in sync"));
}

#[test]
fn test_sync_emits_add_column_to_stdout() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    write_fileset(source.path(), SCHEMA_SQL);
    write_fileset(target.path(), SCHEMA_SQL_NO_EMAIL);

    cmd()
        .args(["sync", "--source-dir"])
        .arg(source.path())
        .arg("--target-dir")
        .arg(target.path())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "ALTER TABLE public.users ADD COLUMN email character varying NOT NULL;",
        ));
}

#[test]
fn test_sync_writes_output_file_with_parent_dirs() {
    let source = tempfile::tempdir().unwrap();
    let target = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    write_fileset(source.path(), SCHEMA_SQL);
    write_fileset(target.path(), SCHEMA_SQL_NO_EMAIL);

    let out_file = out.path().join("nested/dir/sync.sql");

    cmd()
        .args(["sync", "--source-dir"])
        .arg(source.path())
        .arg("--target-dir")
        .arg(target.path())
        .arg("--output")
        .arg(&out_file)
        .assert()
        .success();

    let script = std::fs::read_to_string(&out_file).unwrap();
    assert!(script.contains("ADD COLUMN email"));
    assert!(script.ends_with("-- END OF SCHEMA SYNC SCRIPT\n"));
}
