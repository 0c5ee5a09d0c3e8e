use assert_cmd::Command;
use predicates::str::contains;
use std::fs;
use tempfile::tempdir;

fn timeledger() -> Command {
    Command::cargo_bin("timeledger").expect("binary builds")
}

fn record(date: &str, external_id: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "date": date,
        "year": 2024,
        "month": 1,
        "day": 10,
        "dayOfWeek": "_03 Wednesday",
        "monthName": "Jan",
        "monthNum": 1,
        "weekNum": 2,
        "typeOfDay": "Weekday",
        "task": "[Professional] Service Provider - Work/Job",
        "normalisedTask": "[Professional] Service Provider - Work/Job",
        "metaWorkLife": "Work",
        "prioritisedPersona": "P3 Professional",
        "personaTier2": "Work Time",
        "hours": 2.0,
        "externalId": external_id,
    })
}

fn write_store(root: &std::path::Path, entries: Vec<serde_json::Value>) {
    let doc = serde_json::json!({
        "metadata": {
            "generatedAt": "2024-01-10T20:00:00+02:00",
            "recordCount": entries.len(),
            "dateRange": {"start": "2024-01-01", "end": "2024-01-10"},
            "source": "harvest-api-sync",
            "etlVersion": "timeledger v0.1.0",
            "note": "seeded by test",
        },
        "entries": entries,
    });
    let store = root.join("processed");
    fs::create_dir_all(&store).expect("mkdir processed");
    fs::write(
        store.join("timeentries.json"),
        serde_json::to_string_pretty(&doc).expect("json"),
    )
    .expect("write store");
}

#[test]
fn verify_passes_on_a_clean_store() {
    let tmp = tempdir().expect("tempdir");
    write_store(
        tmp.path(),
        vec![record("2024-01-10", Some("a1")), record("2024-01-09", None)],
    );

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("verify")
        .assert()
        .success()
        .stdout(contains("invariants checked over 2 entries"));
}

#[test]
fn verify_flags_duplicate_external_ids() {
    let tmp = tempdir().expect("tempdir");
    write_store(
        tmp.path(),
        vec![record("2024-01-10", Some("a1")), record("2024-01-09", Some("a1"))],
    );

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("verify")
        .assert()
        .failure()
        .stderr(contains("duplicate external id"));
}

#[test]
fn verify_flags_a_store_sorted_the_wrong_way() {
    let tmp = tempdir().expect("tempdir");
    write_store(
        tmp.path(),
        vec![record("2024-01-09", Some("a1")), record("2024-01-10", Some("a2"))],
    );

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .arg("verify")
        .assert()
        .failure()
        .stderr(contains("not sorted descending"));
}

#[test]
fn verify_flags_unknown_timeledger_env_vars() {
    let tmp = tempdir().expect("tempdir");
    write_store(tmp.path(), vec![record("2024-01-10", Some("a1"))]);

    timeledger()
        .current_dir(tmp.path())
        .env("TIMELEDGER_HOME", tmp.path())
        .env("TIMELEDGER_TYPO_SETTING", "1")
        .arg("verify")
        .assert()
        .failure()
        .stderr(contains("unknown environment variable: TIMELEDGER_TYPO_SETTING"));
}
