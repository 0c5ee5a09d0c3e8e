use crate::etl::util::now_iso_timestamp;
use serde::{Deserialize, Deserializer, Serialize};

/// One time entry as persisted in the store. Identity lives in `date`,
/// `task`, `hours`, `started_at`, `ended_at`, `notes_clean` and
/// `external_id`; the remaining fields are derived taxonomy the merge
/// engine carries through untouched.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntryRecord {
    pub date: String,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_week: String,
    pub month_name: String,
    pub month_num: u32,
    pub week_num: u32,
    pub type_of_day: String,
    pub task: String,
    pub normalised_task: String,
    pub meta_work_life: String,
    pub prioritised_persona: String,
    pub persona_tier2: String,
    // Serialized as `null` when non-finite; reads back as NaN so a store
    // the sanitizer scrubbed still loads.
    #[serde(default = "nan_hours", deserialize_with = "hours_or_nan")]
    pub hours: f64,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub notes_clean: Option<String>,
    #[serde(default)]
    pub social_context: Option<String>,
    #[serde(default)]
    pub social_entity: Option<String>,
    #[serde(default)]
    pub me_time_breakdown: Option<String>,
    #[serde(default)]
    pub commute_context: Option<String>,
    // Absent on legacy spreadsheet-era records.
    #[serde(default)]
    pub external_id: Option<String>,
}

fn nan_hours() -> f64 {
    f64::NAN
}

fn hours_or_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

impl TimeEntryRecord {
    /// Non-empty remote identifier, if this is a modern record. Legacy
    /// records (one-time spreadsheet history) return `None` and are
    /// matched by composite key instead.
    pub fn stable_id(&self) -> Option<&str> {
        self.external_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreMetadata {
    pub generated_at: String,
    pub record_count: usize,
    pub date_range: DateRange,
    pub source: String,
    pub etl_version: String,
    pub note: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreDocument {
    pub metadata: StoreMetadata,
    pub entries: Vec<TimeEntryRecord>,
}

pub const ETL_VERSION: &str = concat!("timeledger v", env!("CARGO_PKG_VERSION"));

impl StoreDocument {
    /// Wrap a merged entry list with fresh metadata. Entries are expected
    /// to already be sorted by date descending.
    pub fn assemble(entries: Vec<TimeEntryRecord>, source: &str, note: &str) -> Self {
        let start = entries.iter().map(|e| e.date.as_str()).min();
        let end = entries.iter().map(|e| e.date.as_str()).max();
        Self {
            metadata: StoreMetadata {
                generated_at: now_iso_timestamp(),
                record_count: entries.len(),
                date_range: DateRange {
                    start: start.map(ToOwned::to_owned),
                    end: end.map(ToOwned::to_owned),
                },
                source: source.to_string(),
                etl_version: ETL_VERSION.to_string(),
                note: note.to_string(),
            },
            entries,
        }
    }

    /// Most recent entry date; drives the incremental lookback window.
    pub fn last_entry_date(&self) -> Option<&str> {
        self.entries.iter().map(|e| e.date.as_str()).max()
    }
}

#[cfg(test)]
pub(crate) fn test_record(date: &str, task: &str, hours: f64) -> TimeEntryRecord {
    TimeEntryRecord {
        date: date.to_string(),
        year: 2024,
        month: 1,
        day: 1,
        day_of_week: "_01 Monday".to_string(),
        month_name: "Jan".to_string(),
        month_num: 1,
        week_num: 1,
        type_of_day: "Weekday".to_string(),
        task: task.to_string(),
        normalised_task: task.to_string(),
        meta_work_life: "Life".to_string(),
        prioritised_persona: "P2 Individual".to_string(),
        persona_tier2: "Me Time".to_string(),
        hours,
        started_at: None,
        ended_at: None,
        notes: None,
        notes_clean: None,
        social_context: None,
        social_entity: None,
        me_time_breakdown: None,
        commute_context: None,
        external_id: None,
    }
}
