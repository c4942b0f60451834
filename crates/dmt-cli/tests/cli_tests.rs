//! End-to-end tests driving the dmt binary

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use tempfile::{tempdir, TempDir};

/// A scratch project: a migrations directory and a database path.
struct Project {
    dir: TempDir,
}

impl Project {
    fn new() -> Self {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("migrations")).unwrap();
        Self { dir }
    }

    fn root(&self) -> &Path {
        self.dir.path()
    }

    fn migrations(&self) -> PathBuf {
        self.root().join("migrations")
    }

    fn database(&self) -> PathBuf {
        self.root().join("app.duckdb")
    }

    fn script(&self, name: &str, sql: &str) {
        fs::write(self.migrations().join(name), sql).unwrap();
    }

    /// Run dmt against this project's database
    fn dmt(&self, args: &[&str]) -> Output {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_dmt"));
        cmd.current_dir(self.root())
            .env_remove("DMT_DATABASE")
            .env_remove("DMT_USER")
            .env_remove("RUST_LOG")
            .arg("--database")
            .arg(self.database())
            .args(args);
        cmd.output().expect("failed to run dmt")
    }

    /// `dmt migrate` with room for extra flags, not yet started
    fn migrate_command(&self, extra: &[&str]) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_dmt"));
        cmd.current_dir(self.root())
            .env_remove("DMT_DATABASE")
            .env_remove("DMT_USER")
            .env_remove("RUST_LOG")
            .arg("--database")
            .arg(self.database())
            .arg("migrate")
            .arg("-d")
            .arg(self.migrations())
            .args(extra);
        cmd
    }

    fn migrate(&self) -> Output {
        let dir = self.migrations();
        self.dmt(&["-u", "ci", "migrate", "-d", dir.to_str().unwrap()])
    }

    fn history_json(&self) -> Vec<serde_json::Value> {
        let output = self.dmt(&["history", "--output", "json"]);
        assert!(output.status.success(), "history failed: {}", stderr(&output));
        serde_json::from_slice(&output.stdout).unwrap()
    }

    fn table_exists(&self, name: &str) -> bool {
        let conn = duckdb::Connection::open(self.database()).unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM information_schema.tables WHERE table_name = ?",
                [name],
                |row| row.get(0),
            )
            .unwrap();
        count > 0
    }
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn test_help_lists_commands() {
    let output = Command::new(env!("CARGO_BIN_EXE_dmt"))
        .arg("--help")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = stdout(&output);
    assert!(text.contains("init"));
    assert!(text.contains("migrate"));
    assert!(text.contains("history"));
}

#[test]
fn test_init_creates_history_tables() {
    let project = Project::new();
    let output = project.dmt(&["init"]);
    assert!(output.status.success(), "init failed: {}", stderr(&output));
    assert!(project.table_exists("migration_history"));
    assert!(project.table_exists("migration_lock"));

    let again = project.dmt(&["init"]);
    assert!(again.status.success());
}

#[test]
fn test_migrate_applies_then_reports_up_to_date() {
    let project = Project::new();
    project.script("V1__create_users.sql", "CREATE TABLE users (id INT, name VARCHAR);");
    project.script("V2__seed_users.sql", "INSERT INTO users VALUES (1, 'ada');");

    let first = project.migrate();
    assert!(first.status.success(), "migrate failed: {}", stderr(&first));
    assert!(stdout(&first).contains("2 applied"));
    assert!(stderr(&first).contains("Committing all new migrations!"));

    let second = project.migrate();
    assert!(second.status.success());
    assert!(stdout(&second).contains("Database is up to date"));
    assert!(stderr(&second).contains("No new migrations to commit"));

    let history = project.history_json();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0]["version"], "1");
    assert_eq!(history[0]["description"], "create users");
    assert_eq!(history[1]["installed_by"], "ci");
}

#[test]
fn test_version_gap_fails_and_rolls_back() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    project.script("V2__create_b.sql", "CREATE TABLE b (id INT);");
    project.script("V4__create_d.sql", "CREATE TABLE d (id INT);");

    let output = project.migrate();

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("[MG003]"), "stderr: {err}");
    assert!(err.contains("Rolling back all the changes..."));
    assert!(project.history_json().is_empty());
    assert!(!project.table_exists("a"));
    assert!(!project.table_exists("b"));
}

#[test]
fn test_edited_script_is_detected() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    assert!(project.migrate().status.success());

    project.script("V1__create_a.sql", "CREATE TABLE a (id BIGINT);");
    project.script("V2__create_b.sql", "CREATE TABLE b (id INT);");
    let output = project.migrate();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("[MG002]"));
    assert_eq!(project.history_json().len(), 1);
    assert!(!project.table_exists("b"));
}

#[test]
fn test_invalid_file_name_fails() {
    let project = Project::new();
    project.script("create_table.sql", "CREATE TABLE a (id INT);");

    let output = project.migrate();

    assert_eq!(output.status.code(), Some(1));
    let err = stderr(&output);
    assert!(err.contains("[MG001]"), "stderr: {err}");
    assert!(err.contains("V1__create_table.sql"));
}

#[test]
fn test_non_sql_files_are_ignored() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    project.script("README.md", "not a migration");

    let output = project.migrate();
    assert!(output.status.success(), "migrate failed: {}", stderr(&output));
    assert_eq!(project.history_json().len(), 1);
}

#[test]
fn test_numeric_ordering_flag() {
    let project = Project::new();
    for v in 1..=10 {
        project.script(&format!("V{v}__t{v}.sql"), &format!("CREATE TABLE t{v} (id INT);"));
    }
    let dir = project.migrations();
    let dir = dir.to_str().unwrap();

    let lexicographic = project.dmt(&["migrate", "-d", dir]);
    assert_eq!(lexicographic.status.code(), Some(1));

    let numeric = project.dmt(&["migrate", "-d", dir, "--ordering", "numeric"]);
    assert!(numeric.status.success(), "migrate failed: {}", stderr(&numeric));
    assert_eq!(project.history_json().len(), 10);
}

#[test]
fn test_config_file_supplies_paths() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    let config = project.root().join("dmt.yml");
    fs::write(
        &config,
        "database:\n  path: from_config.duckdb\nmigrations:\n  directory: migrations\ninstalled_by: deploy-bot\n",
    )
    .unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_dmt"))
        .current_dir(project.root())
        .env_remove("DMT_DATABASE")
        .env_remove("DMT_USER")
        .arg("--config")
        .arg(&config)
        .arg("migrate")
        .output()
        .unwrap();

    assert!(output.status.success(), "migrate failed: {}", stderr(&output));
    assert!(project.root().join("from_config.duckdb").exists());
    assert!(!project.database().exists());
}

#[test]
fn test_unknown_config_key_is_rejected() {
    let project = Project::new();
    fs::write(project.root().join("dmt.yml"), "databse:\n  path: x.duckdb\n").unwrap();

    let output = project.dmt(&["init"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("Failed to load configuration"));
}

#[test]
fn test_history_before_any_run() {
    let project = Project::new();
    let output = project.dmt(&["history"]);
    assert!(output.status.success(), "history failed: {}", stderr(&output));
    assert!(stdout(&output).contains("No migrations applied yet."));
}

#[test]
fn test_database_held_by_another_process_times_out() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    let holder = duckdb::Connection::open(project.database()).unwrap();
    holder.execute_batch("BEGIN TRANSACTION").unwrap();

    let output = project
        .migrate_command(&["--max-lock-attempts", "3", "--lock-retry-ms", "50"])
        .output()
        .unwrap();

    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("[MG004]"), "stderr: {err}");
    assert!(err.contains("Database file is locked by another process"));
    assert_eq!(err.matches("attempts left.").count(), 2);
    drop(holder);

    assert!(project.migrate().status.success());
    assert!(project.table_exists("a"));
}

#[test]
fn test_second_process_waits_for_the_first() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    let holder = duckdb::Connection::open(project.database()).unwrap();

    let child = project
        .migrate_command(&["--max-lock-attempts", "50", "--lock-retry-ms", "100"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(400));
    drop(holder);

    let output = child.wait_with_output().unwrap();
    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stderr(&output).contains("Waiting to unlock"));
    assert_eq!(project.history_json().len(), 1);
}

#[test]
fn test_script_with_commit_is_rejected() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    project.script("V2__create_b.sql", "CREATE TABLE b (id INT);\nCOMMIT;");

    let output = project.migrate();

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr(&output).contains("[MG009]"), "stderr: {}", stderr(&output));
    assert!(!project.table_exists("a"));
    assert!(!project.table_exists("b"));
}

#[test]
fn test_zero_padded_rename_is_not_reapplied() {
    let project = Project::new();
    project.script("V1__seed.sql", "CREATE TABLE counter (n INT); INSERT INTO counter VALUES (1);");
    assert!(project.migrate().status.success());

    fs::rename(
        project.migrations().join("V1__seed.sql"),
        project.migrations().join("V01__seed.sql"),
    )
    .unwrap();
    let output = project.migrate();

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    assert!(stdout(&output).contains("Database is up to date"));
    let history = project.history_json();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0]["version"], "1");
}

#[cfg(unix)]
#[test]
fn test_interrupt_during_lock_wait_exits_2() {
    let project = Project::new();
    project.script("V1__create_a.sql", "CREATE TABLE a (id INT);");
    let holder = duckdb::Connection::open(project.database()).unwrap();

    let child = project
        .migrate_command(&["--max-lock-attempts", "100", "--lock-retry-ms", "100"])
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap();
    std::thread::sleep(Duration::from_millis(500));
    let sent = Command::new("kill")
        .arg("-INT")
        .arg(child.id().to_string())
        .status()
        .unwrap();
    assert!(sent.success());

    let output = child.wait_with_output().unwrap();
    drop(holder);
    assert_eq!(output.status.code(), Some(2), "stderr: {}", stderr(&output));
    let err = stderr(&output);
    assert!(err.contains("Interrupt received"), "stderr: {err}");
    assert!(err.contains("[MG005]"));
}
