use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use tempfile::tempdir;

fn timeledger() -> Command {
    Command::cargo_bin("timeledger").expect("binary builds")
}

#[test]
fn status_without_a_store_reports_the_issue() {
    let tmp = tempdir().expect("tempdir");

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("status")
        .assert()
        .failure()
        .stderr(contains("store not found"));
}

#[test]
fn status_summarizes_an_imported_store() {
    let tmp = tempdir().expect("tempdir");
    let export = tmp.path().join("export.csv");
    fs::write(
        &export,
        "Date,Task,Hours,Notes,Started At,Ended At\n\
         2024-01-10,[Professional] Service Provider - Work/Job,7.5,,,\n\
         2024-01-09,[Individual] Rest n Sleep,8,,,\n",
    )
    .expect("write export");

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("import")
        .arg(&export)
        .assert()
        .success();

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("status")
        .assert()
        .success()
        .stdout(contains("record_count=2"))
        .stdout(contains("legacy_records=2"))
        .stdout(contains("modern_records=0"))
        .stdout(contains("date_range=2024-01-09..2024-01-10"))
        .stdout(contains("hours[P3 Professional]=7.5"));
}
