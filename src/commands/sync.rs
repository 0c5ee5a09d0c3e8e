use anyhow::{Context, Result};
use chrono::{Days, NaiveDate};

use crate::commands::CommandReport;
use crate::etl::config::load_config;
use crate::etl::merge;
use crate::etl::model::{StoreDocument, TimeEntryRecord};
use crate::etl::paths::resolve_paths;
use crate::etl::transform::transform_row;
use crate::etl::util::today_string;
use crate::etl::{audit, store};
use crate::harvest::client::{HarvestClient, HarvestCredentials};

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub dry_run: bool,
}

fn lookback_start(last_synced: &str, lookback_days: u32) -> Result<String> {
    let last = NaiveDate::parse_from_str(last_synced, "%Y-%m-%d")
        .with_context(|| format!("store carries unparseable last date {last_synced:?}"))?;
    let from = last
        .checked_sub_days(Days::new(u64::from(lookback_days)))
        .with_context(|| format!("lookback window underflows from {last_synced}"))?;
    Ok(from.format("%Y-%m-%d").to_string())
}

pub fn run(opts: &SyncOptions) -> Result<CommandReport> {
    let cfg = load_config()?;
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("sync");

    // Credentials are checked before anything else; a misconfigured run
    // must fail without touching the API or the store.
    let credentials = HarvestCredentials::from_env()?;
    let _lock = store::acquire_run_lock(&paths)?;

    let existing = store::load(&paths)?;
    let last_synced = existing
        .as_ref()
        .and_then(|doc| doc.last_entry_date().map(ToOwned::to_owned))
        .unwrap_or_else(|| cfg.default_start_date.clone());
    let from = lookback_start(&last_synced, cfg.lookback_days)?;
    let to = today_string();

    report.detail(format!("last_synced={last_synced}"));
    report.detail(format!(
        "fetch_window={from}..{to} (lookback {} days)",
        cfg.lookback_days
    ));
    let log = audit::RunLog::new(&paths, "sync");
    log.event("fetch", "start", &format!("from={from} to={to}"))?;

    let client = HarvestClient::new(credentials, &cfg)?;
    let raw_entries = client.fetch_range(&from, &to)?;
    report.detail(format!("fetched={}", raw_entries.len()));

    if raw_entries.is_empty() {
        log.event("fetch", "noop", "no entries in window")?;
        report.detail("no new entries; store unchanged");
        return Ok(report);
    }

    let batch: Vec<TimeEntryRecord> = raw_entries
        .into_iter()
        .map(|entry| transform_row(entry.into_row()))
        .collect::<Result<_>>()?;

    let existing_entries = existing.map(|doc| doc.entries).unwrap_or_default();
    let existing_count = existing_entries.len();
    let outcome = merge::merge(existing_entries, batch);

    report.detail(format!("existing={existing_count}"));
    report.detail(format!("batch_duplicates={}", outcome.batch_duplicates));
    report.detail(format!("replaced={}", outcome.replaced));
    report.detail(format!("net_new={}", outcome.net_new));
    report.detail(format!("total={}", outcome.entries.len()));

    if opts.dry_run {
        report.detail("dry-run: skipping write");
        log.event("write", "skipped", "dry run")?;
        return Ok(report);
    }

    let document = StoreDocument::assemble(
        outcome.entries,
        store::SOURCE_API_SYNC,
        "Incremental sync from Harvest API + manual history",
    );
    let saved = store::save(&paths, &document)?;
    log.counted("write", "ok", document.metadata.record_count, "store updated")?;

    report.detail(format!(
        "canonical={} ({} bytes)",
        saved.canonical_path.display(),
        saved.bytes
    ));
    match saved.public_path {
        Some(path) => report.detail(format!("public={}", path.display())),
        None => report.detail("public copy failed (see warning); canonical copy is authoritative"),
    }

    Ok(report)
}
