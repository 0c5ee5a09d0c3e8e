use anyhow::Result;
use std::collections::HashSet;
use std::env;

use crate::commands::{CommandReport, status};
use crate::etl::config::load_config;
use crate::etl::merge::composite_key;
use crate::etl::paths::resolve_paths;
use crate::etl::store;

mod generated {
    include!(concat!(env!("OUT_DIR"), "/timeledger_env_allowlist.rs"));
}

fn check_env_allowlist(report: &mut CommandReport) {
    let known: HashSet<&str> = generated::GENERATED_ENV_ALLOWLIST.iter().copied().collect();
    for (key, _) in env::vars() {
        if key.starts_with("TIMELEDGER_") && !known.contains(key.as_str()) {
            report.issue(format!("unknown environment variable: {key}"));
        }
    }
}

fn check_store_invariants(report: &mut CommandReport) -> Result<()> {
    let paths = resolve_paths()?;
    let Some(doc) = store::load(&paths)? else {
        report.detail("store not present; invariant checks skipped");
        return Ok(());
    };

    let mut stable_ids: HashSet<&str> = HashSet::new();
    let mut legacy_keys: HashSet<String> = HashSet::new();

    for entry in &doc.entries {
        match entry.stable_id() {
            Some(id) => {
                if !stable_ids.insert(id) {
                    report.issue(format!("duplicate external id in store: {id}"));
                }
            }
            None => {
                let key = composite_key(entry);
                if !legacy_keys.insert(key.clone()) {
                    report.issue(format!("duplicate legacy composite key in store: {key}"));
                }
            }
        }
        if !entry.hours.is_finite() || entry.hours < 0.0 {
            report.issue(format!(
                "invalid hours {} on {} / {}",
                entry.hours, entry.date, entry.task
            ));
        }
    }

    for pair in doc.entries.windows(2) {
        if pair[0].date < pair[1].date {
            report.issue(format!(
                "store is not sorted descending around {}",
                pair[1].date
            ));
            break;
        }
    }

    report.detail(format!("invariants checked over {} entries", doc.entries.len()));
    Ok(())
}

pub fn run() -> Result<CommandReport> {
    let mut report = CommandReport::new("verify");

    match load_config() {
        Ok(cfg) => report.detail(format!(
            "config ok: lookback_days={} page_size={}",
            cfg.lookback_days, cfg.page_size
        )),
        Err(err) => report.issue(format!("config invalid: {err:#}")),
    }

    check_env_allowlist(&mut report);
    check_store_invariants(&mut report)?;
    report.merge(status::run()?);

    Ok(report)
}
