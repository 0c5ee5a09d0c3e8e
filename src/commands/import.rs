use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::commands::CommandReport;
use crate::etl::merge;
use crate::etl::model::{StoreDocument, TimeEntryRecord};
use crate::etl::paths::resolve_paths;
use crate::etl::transform::{RawRow, transform_row};
use crate::etl::{audit, store};

#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    pub file: PathBuf,
    pub dry_run: bool,
}

/// One row of a spreadsheet export, as Harvest's report CSVs name them.
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Task")]
    task: String,
    #[serde(rename = "Hours")]
    hours: f64,
    #[serde(rename = "Notes", default)]
    notes: Option<String>,
    #[serde(rename = "Started At", default)]
    started_at: Option<String>,
    #[serde(rename = "Ended At", default)]
    ended_at: Option<String>,
}

impl CsvRow {
    fn into_row(self) -> RawRow {
        RawRow {
            date: self.date,
            task: self.task,
            hours: self.hours,
            notes: self.notes,
            started_at: self.started_at,
            ended_at: self.ended_at,
            // Spreadsheet history never carried a remote identifier;
            // these records merge by composite key.
            external_id: None,
        }
    }
}

fn read_rows(file: &Path) -> Result<Vec<RawRow>> {
    let mut reader = csv::Reader::from_path(file)
        .with_context(|| format!("failed to open {}", file.display()))?;
    let mut rows = Vec::new();
    for (idx, record) in reader.deserialize::<CsvRow>().enumerate() {
        let row = record.with_context(|| format!("bad CSV row {} in {}", idx + 2, file.display()))?;
        rows.push(row.into_row());
    }
    Ok(rows)
}

pub fn run(opts: &ImportOptions) -> Result<CommandReport> {
    let paths = resolve_paths()?;
    let mut report = CommandReport::new("import");

    let _lock = store::acquire_run_lock(&paths)?;

    let rows = read_rows(&opts.file)?;
    report.detail(format!("file={}", opts.file.display()));
    report.detail(format!("rows={}", rows.len()));

    if rows.is_empty() {
        report.detail("empty export; store unchanged");
        return Ok(report);
    }

    let batch: Vec<TimeEntryRecord> = rows
        .into_iter()
        .map(transform_row)
        .collect::<Result<_>>()?;

    let existing = store::load(&paths)?;
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
        return Ok(report);
    }

    let document = StoreDocument::assemble(
        outcome.entries,
        store::SOURCE_LEGACY_IMPORT,
        "Transformed from a raw spreadsheet export",
    );
    let saved = store::save(&paths, &document)?;
    let log = audit::RunLog::new(&paths, "import");
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
