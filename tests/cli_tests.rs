#![cfg(feature = "cli_api")]

use assert_cmd::Command;
use predicates::str::contains as str_contains;
use tempfile::{NamedTempFile, TempDir};

const SEED: &str = "teacher 1 Ada\n\
                    room 1 R101 Main 30\n\
                    room 2 R102 Main 30\n\
                    class 1 Algebra Math 9 1\n\
                    class 2 Geometry Math 10 1\n";

#[allow(deprecated)]
fn run_cli(script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.write_stdin(script.to_string()).assert()
}

#[allow(deprecated)]
fn run_cli_with_db(db: &str, script: &str) -> assert_cmd::assert::Assert {
    let mut cmd = Command::cargo_bin("cli").expect("cli binary");
    cmd.arg(db).write_stdin(script.to_string()).assert()
}

#[test]
fn cli_schedules_and_lists_entries() {
    let script = format!("{SEED}add 1 1 1 09:00 10:00\nlist\nquit\n");
    run_cli(&script)
        .success()
        .stdout(str_contains("Scheduled entry 1."))
        .stdout(str_contains("Monday"))
        .stdout(str_contains("09:00:00"))
        .stdout(str_contains("Algebra"));
}

#[test]
fn cli_reports_room_and_teacher_conflicts() {
    let script = format!(
        "{SEED}add 1 1 1 09:00 10:00\nadd 2 1 1 09:30 10:30\nadd 2 2 1 09:30 10:30\nadd 2 1 1 10:00 11:00\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains(
            "Conflict: classroom is already booked by schedule entry 1",
        ))
        .stdout(str_contains(
            "Conflict: teacher is already booked by schedule entry 1",
        ))
        .stdout(str_contains("Scheduled entry 2."));
}

#[test]
fn cli_reports_validation_and_missing_references() {
    let script = format!("{SEED}add 1 1 1 10:00 09:00\nadd 1 1 9 09:00 10:00\nadd 1 5 1 09:00 10:00\nquit\n");
    run_cli(&script)
        .success()
        .stdout(str_contains("Invalid:"))
        .stdout(str_contains("Not found: classroom 5 not found"));
}

#[test]
fn cli_move_and_delete_entries() {
    let script = format!(
        "{SEED}add 1 1 1 09:00 10:00\nmove 1 1 2 1 09:00 10:00\nlist room 2\ndelete 1\ndelete 1\nquit\n"
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Updated entry 1."))
        .stdout(str_contains("R102"))
        .stdout(str_contains("Deleted entry 1."))
        .stdout(str_contains("Entry 1 not found."));
}

#[test]
fn cli_exports_json_and_csv() {
    let dir = TempDir::new().expect("create temp dir");
    let json_path = dir.path().join("week.json");
    let csv_path = dir.path().join("week.csv");
    let script = format!(
        "{SEED}add 1 1 1 09:00 10:00\nexport json {}\nexport csv {}\nexport xml out.xml\nquit\n",
        json_path.display(),
        csv_path.display()
    );
    run_cli(&script)
        .success()
        .stdout(str_contains("Exported 1 entries to"))
        .stdout(str_contains("Unknown format 'xml'"));

    let csv = std::fs::read_to_string(&csv_path).expect("csv written");
    assert!(csv.starts_with("id,day_of_week,day_name"));
    assert!(csv.contains("Algebra"));
    let json = std::fs::read_to_string(&json_path).expect("json written");
    assert!(json.contains("\"classroom_name\": \"R101\""));
}

#[test]
fn cli_keeps_entries_in_a_database_file() {
    let db = NamedTempFile::new().expect("create temp file");
    let path = db.path().to_string_lossy().to_string();

    run_cli_with_db(&path, &format!("{SEED}add 1 1 3 13:00 14:00\nquit\n"))
        .success()
        .stdout(str_contains("Scheduled entry 1."));

    run_cli_with_db(&path, "list day 3\nquit\n")
        .success()
        .stdout(str_contains("Wednesday"))
        .stdout(str_contains("13:00:00"));
}

#[test]
fn cli_rejects_unknown_commands() {
    run_cli("frobnicate\nquit\n")
        .success()
        .stdout(str_contains("Unknown command 'frobnicate'. Type 'help'."));
}
