//! Merge/dedup engine for the time-entry store.
//!
//! Two identity schemes coexist: modern records match on their remote
//! `externalId`, legacy spreadsheet-era records (no identifier) match on a
//! composite key over the fields a human would recognize as "the same
//! entry". The freshly fetched batch always wins over the existing store.

use crate::etl::model::TimeEntryRecord;
use std::collections::HashSet;

#[derive(Debug, Clone, Default)]
pub struct MergeOutcome {
    pub entries: Vec<TimeEntryRecord>,
    /// Records dropped inside the new batch itself (exact repeats).
    pub batch_duplicates: usize,
    /// Existing records superseded by a fresher copy from the batch.
    pub replaced: usize,
    /// Batch records that did not match anything in the existing store.
    pub net_new: usize,
}

/// Normalize a clock-time string for identity comparison: values with a
/// colon are reduced to zero-padded `HH:MM`, anything else passes through
/// verbatim, absent becomes empty.
pub fn normalize_clock(value: Option<&str>) -> String {
    let Some(raw) = value else {
        return String::new();
    };
    let raw = raw.trim();
    if !raw.contains(':') {
        return raw.to_string();
    }
    let mut segments = raw.split(':');
    let hour = segments.next().unwrap_or_default();
    let minute = segments.next().unwrap_or_default();
    format!("{hour:0>2}:{minute:0>2}")
}

/// Identity key for records without a remote identifier. A non-finite
/// hours value degrades to an empty component instead of failing the run.
pub fn composite_key(rec: &TimeEntryRecord) -> String {
    let hours = if rec.hours.is_finite() {
        format!("{:.2}", rec.hours)
    } else {
        String::new()
    };
    format!(
        "{}|{}|{}|{}|{}|{}",
        rec.date.trim(),
        rec.task.trim(),
        hours,
        normalize_clock(rec.started_at.as_deref()),
        normalize_clock(rec.ended_at.as_deref()),
        rec.notes_clean.as_deref().unwrap_or("").trim(),
    )
}

/// Merge a freshly fetched batch into the existing store.
///
/// 1. dedup the batch against itself (order preserved, first copy wins);
/// 2. drop existing records superseded by the batch, by stable id for
///    modern records and by composite key for legacy ones;
/// 3. append the batch after the survivors;
/// 4. sort by date descending (stable, so same-day order holds).
pub fn merge(existing: Vec<TimeEntryRecord>, batch: Vec<TimeEntryRecord>) -> MergeOutcome {
    let incoming = batch.len();
    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut seen_keys: HashSet<String> = HashSet::new();
    let mut deduped: Vec<TimeEntryRecord> = Vec::with_capacity(batch.len());

    for rec in batch {
        match rec.stable_id() {
            Some(id) => {
                if !seen_ids.insert(id.to_string()) {
                    continue;
                }
            }
            None => {
                if seen_keys.contains(&composite_key(&rec)) {
                    continue;
                }
            }
        }
        // Every kept record also claims its composite key, so a later
        // identifier-less repeat of the same entry is still caught.
        seen_keys.insert(composite_key(&rec));
        deduped.push(rec);
    }

    let batch_duplicates = incoming - deduped.len();
    let existing_count = existing.len();

    let mut entries: Vec<TimeEntryRecord> = existing
        .into_iter()
        .filter(|rec| match rec.stable_id() {
            Some(id) => !seen_ids.contains(id),
            None => !seen_keys.contains(&composite_key(rec)),
        })
        .collect();

    let replaced = existing_count - entries.len();
    let net_new = deduped.len().saturating_sub(replaced);

    entries.extend(deduped);
    entries.sort_by(|a, b| b.date.cmp(&a.date));

    MergeOutcome {
        entries,
        batch_duplicates,
        replaced,
        net_new,
    }
}
