use anyhow::Result;
use std::collections::BTreeMap;

use crate::commands::CommandReport;
use crate::etl::paths::resolve_paths;
use crate::etl::store;

pub fn run() -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("status");

    report.detail(format!("ledger_home={}", paths.ledger_home.display()));
    report.detail(format!("store_file={}", paths.store_file.display()));
    report.detail(format!("public_file={}", paths.public_file.display()));

    let Some(doc) = store::load(&paths)? else {
        report.issue("store not found; run `timeledger import` or `timeledger sync` first");
        return Ok(report);
    };

    report.detail(format!("generated_at={}", doc.metadata.generated_at));
    report.detail(format!("source={}", doc.metadata.source));
    report.detail(format!("etl_version={}", doc.metadata.etl_version));
    report.detail(format!("record_count={}", doc.metadata.record_count));
    report.detail(format!(
        "date_range={}..{}",
        doc.metadata.date_range.start.as_deref().unwrap_or("-"),
        doc.metadata.date_range.end.as_deref().unwrap_or("-"),
    ));

    let modern = doc.entries.iter().filter(|e| e.stable_id().is_some()).count();
    report.detail(format!("modern_records={modern}"));
    report.detail(format!("legacy_records={}", doc.entries.len() - modern));

    let mut persona_hours: BTreeMap<&str, f64> = BTreeMap::new();
    for entry in &doc.entries {
        if entry.hours.is_finite() {
            *persona_hours.entry(entry.prioritised_persona.as_str()).or_default() += entry.hours;
        }
    }
    for (persona, hours) in persona_hours {
        report.detail(format!("hours[{persona}]={hours:.1}"));
    }

    if doc.metadata.record_count != doc.entries.len() {
        report.issue(format!(
            "metadata record count {} disagrees with {} stored entries",
            doc.metadata.record_count,
            doc.entries.len()
        ));
    }

    Ok(report)
}
