use assert_cmd::Command;
use std::fs;
use tempfile::tempdir;

const CSV: &str = "\
Date,Task,Hours,Notes,Started At,Ended At
2024-01-10,[Professional] Service Provider - Work/Job,7.5,standup then commute home,8:30,17:00
2020-05-01,[Individual] Rest n Sleep,8,,,
";

fn timeledger() -> Command {
    Command::cargo_bin("timeledger").expect("binary builds")
}

#[test]
fn import_builds_a_sorted_store_with_dual_write() {
    let tmp = tempdir().expect("tempdir");
    let export = tmp.path().join("export.csv");
    fs::write(&export, CSV).expect("write export");

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("import")
        .arg(&export)
        .assert()
        .success();

    let store_path = tmp.path().join("processed/timeentries.json");
    let raw = fs::read_to_string(&store_path).expect("read store");
    let doc: serde_json::Value = serde_json::from_str(&raw).expect("json");

    assert_eq!(doc.pointer("/metadata/recordCount"), Some(&serde_json::json!(2)));
    assert_eq!(
        doc.pointer("/metadata/dateRange/start"),
        Some(&serde_json::json!("2020-05-01"))
    );
    assert_eq!(
        doc.pointer("/entries/0/date"),
        Some(&serde_json::json!("2024-01-10"))
    );
    assert_eq!(
        doc.pointer("/entries/0/commuteContext"),
        Some(&serde_json::json!("commuting"))
    );
    assert_eq!(
        doc.pointer("/entries/1/prioritisedPersona"),
        Some(&serde_json::json!("P0 Life Constraints (Sleep)"))
    );
    // Legacy rows carry no remote identifier.
    assert_eq!(doc.pointer("/entries/0/externalId"), Some(&serde_json::Value::Null));

    // Dual write: the public asset copy matches the canonical store.
    let public = fs::read_to_string(tmp.path().join("public/data/timeentries.json"))
        .expect("read public copy");
    assert_eq!(raw, public);
}

#[test]
fn reimporting_the_same_export_is_idempotent() {
    let tmp = tempdir().expect("tempdir");
    let export = tmp.path().join("export.csv");
    fs::write(&export, CSV).expect("write export");

    for _ in 0..2 {
        timeledger()
            .current_dir(tmp.path())
            .env("TIMELEDGER_HOME", tmp.path())
            .arg("import")
            .arg(&export)
            .assert()
            .success();
    }

    let raw = fs::read_to_string(tmp.path().join("processed/timeentries.json")).expect("read");
    let doc: serde_json::Value = serde_json::from_str(&raw).expect("json");
    assert_eq!(doc.pointer("/metadata/recordCount"), Some(&serde_json::json!(2)));
}

#[test]
fn import_rejects_rows_without_a_parseable_date() {
    let tmp = tempdir().expect("tempdir");
    let export = tmp.path().join("export.csv");
    fs::write(
        &export,
        "Date,Task,Hours,Notes,Started At,Ended At\nsomeday,Work,1.0,,,\n",
    )
    .expect("write export");

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("import")
        .arg(&export)
        .assert()
        .failure()
        .stderr(predicates::str::contains("unparseable date"));
}
