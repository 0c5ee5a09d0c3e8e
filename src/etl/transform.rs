//! Shared pure transform: one raw source row in, one canonical record out.
//!
//! Both ingestion paths (API sync and the legacy spreadsheet import) feed
//! through here, so the classification tables live in exactly one place.
//! The tables are immutable; anything unmapped falls back to the
//! [`UNMAPPED`] sentinel the dashboard keys on.

use crate::etl::model::TimeEntryRecord;
use anyhow::{Result, anyhow};
use chrono::{Datelike, NaiveDate, Weekday};
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Sentinel for tasks and personas the tables do not cover.
pub const UNMAPPED: &str = "ERROR";

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

const ME_TIME_LABEL: &str = "[Individual] Me Time (Bootup, Nothing, PC/Surfing, Journalling, Hobbies, Blogging, DIY, Netflix, Silence - Alone Time)";
const FAMILY_LABEL: &str = "[Family-Man] Family Time (#Father #Brother #Son #Relatives)";
const WORK_LABEL: &str = "[Professional] Service Provider - Work/Job";

/// Raw task label -> normalised task label.
const TASK_NORMALIZATION: &[(&str, &str)] = &[
    ("[Brother] Relationship with Siblings", FAMILY_LABEL),
    ("[Business Owner] AS3 Time", ME_TIME_LABEL),
    ("[Consultant] New Client Engagements", WORK_LABEL),
    ("[Consultant] Service Provider Partners", WORK_LABEL),
    ("[Entrepreneur] Ideas / Networking", ME_TIME_LABEL),
    ("[Family-Man] Home Affairs / DIY", FAMILY_LABEL),
    ("[Father] Relationship with AYK", FAMILY_LABEL),
    ("[Father] Relationship with MJK", FAMILY_LABEL),
    ("[Father] Relationship with SK", FAMILY_LABEL),
    ("[Home Owner] Home Improvements / DIY", ME_TIME_LABEL),
    ("[Individual] Blogging", ME_TIME_LABEL),
    ("[Individual] Coding / Tech / Builder", ME_TIME_LABEL),
    ("[Individual] Driving Car Time", FAMILY_LABEL),
    (
        "[Individual] Health & Fitness - Cycling n Running",
        "[Individual] Health, Fitness & Wellbeing",
    ),
    ("[Investor] Wealth & Finances - Share Trading JSE", ME_TIME_LABEL),
    ("[Job Hunter] Job Hunting Companies", ME_TIME_LABEL),
    ("[Professional] Work Social Relationships", WORK_LABEL),
    ("[Software Professional] Searching for Growth", WORK_LABEL),
    ("[Son Bro-In-Law] Relationship with In-Laws", FAMILY_LABEL),
    ("[Son] Relationship with Mommy", FAMILY_LABEL),
    ("[Uncle] Relationship with Nieces n Nephews", FAMILY_LABEL),
    ("zz [Community Member] Community NBHW Patrols", "[Friend] Social"),
];

/// Normalised task -> prioritised persona.
const PERSONA_MAPPING: &[(&str, &str)] = &[
    (FAMILY_LABEL, "P5 Family"),
    ("[Friend] Social", "P6 Friend Social"),
    ("[Husband] Marital/Wife #Husband", "P4 Husband"),
    ("[Individual] Health, Fitness & Wellbeing", "P2 Individual"),
    ("[Individual] Knowledge-Base - Books/Video/Podcasts", "P2 Individual"),
    (ME_TIME_LABEL, "P2 Individual"),
    ("[Individual] Rest n Sleep", "P0 Life Constraints (Sleep)"),
    ("[Individual] Spirituality", "P1 Muslim"),
    (WORK_LABEL, "P3 Professional"),
];

/// Prioritised persona -> meta work/life bucket.
const META_WORK_LIFE_MAPPING: &[(&str, &str)] = &[
    ("P0 Life Constraints (Sleep)", "Sleep-Life"),
    ("P1 Muslim", "Life"),
    ("P2 Individual", "Life"),
    ("P3 Professional", "Work"),
    ("P4 Husband", "Life"),
    ("P5 Family", "Life"),
    ("P6 Friend Social", "Life"),
];

/// Normalised task -> tier-2 persona.
const PERSONA_TIER2_MAPPING: &[(&str, &str)] = &[
    (FAMILY_LABEL, "Family Time"),
    ("[Friend] Social", "Social"),
    ("[Husband] Marital/Wife #Husband", "Husband/Wife"),
    ("[Individual] Health, Fitness & Wellbeing", "Me Time"),
    ("[Individual] Knowledge-Base - Books/Video/Podcasts", "Me Time"),
    (ME_TIME_LABEL, "Me Time"),
    ("[Individual] Rest n Sleep", "Rest/Sleep"),
    ("[Individual] Spirituality", "Me Time"),
    (WORK_LABEL, "Work Time"),
];

/// Normalised task -> me-time breakdown (tier-2 "Me Time" only).
const ME_TIME_BREAKDOWN_MAPPING: &[(&str, &str)] = &[
    ("[Individual] Health, Fitness & Wellbeing", "Health/Fitness"),
    ("[Individual] Knowledge-Base - Books/Video/Podcasts", "Learning"),
    (ME_TIME_LABEL, "Alone Time (DIY, Hobbies, Writing)"),
    ("[Individual] Rest n Sleep", "Rest/Sleep"),
    ("[Individual] Spirituality", "Spiritual"),
];

/// Social-context classes with their trigger keywords, checked in order.
const SOCIAL_CONTEXT_KEYWORDS: &[(&str, &[&str])] = &[
    ("Professional-Coaching/Mentoring", &["mentor", "coach"]),
    (
        "Professional-Networking",
        &["network", "rayner", "dallas", "wadee", "adhil patel visit", "aadhil"],
    ),
];

/// Keyword -> social entity, first match wins. Order matters: specific
/// names come before the broader group labels that share substrings.
const SOCIAL_ENTITY_KEYWORDS: &[(&str, &str)] = &[
    ("mentoring", "Asanda"),
    ("networking", "General Networking"),
    ("nofal", "Joburg Friends"),
    ("patel", "Joburg Friends"),
    ("motorvations", "Uni Friends"),
    ("hamza", "Uni Friends"),
    ("salik", "UK Friends"),
    ("justin", "Justin"),
    ("asanda", "Asanda"),
    ("phiona", "Phiona"),
    ("farid", "Farid"),
    ("andrew", "Andrew Dallas"),
    ("india", "India Friends"),
    ("divash", "Divash"),
    ("mota", "CPT Friends-Motas"),
    ("lambat", "CPT Friends-Lambats"),
    ("sooliman", "PMB Friends"),
    ("kola", "CPT - Neighbours"),
    ("nizam", "PMB Friends"),
    ("ashraf", "Joburg Friends"),
    ("imran", "Joburg Friends"),
    ("francois", "Franky"),
    ("zeyn", "PMB Friends"),
    ("nikhil", "India Friends"),
    ("themba", "Themba"),
    ("umar", "Umar"),
    ("jarryd", "Jarryd"),
    ("wayne", "Wayne"),
    ("uncle ab", "CPT - Neighbours"),
    ("brandon", "CPT - Neighbours"),
    ("evane", "Joburg Friends"),
    ("haseena", "CPT Friends-New"),
    ("vaug", "Vaugan"),
    ("leon", "Vaugan"),
    ("iby", "USA Friends"),
    ("rayner", "Mark Rayner"),
    ("mosajee", "Moosajee"),
];

fn lookup_map<'a>(
    table: &'static [(&'static str, &'static str)],
    cell: &'a OnceLock<BTreeMap<&'static str, &'static str>>,
) -> &'a BTreeMap<&'static str, &'static str> {
    cell.get_or_init(|| table.iter().copied().collect())
}

pub fn normalise_task(task: &str) -> String {
    static MAP: OnceLock<BTreeMap<&str, &str>> = OnceLock::new();
    lookup_map(TASK_NORMALIZATION, &MAP)
        .get(task)
        .copied()
        .unwrap_or(task)
        .to_string()
}

pub fn prioritised_persona(normalised_task: &str) -> String {
    static MAP: OnceLock<BTreeMap<&str, &str>> = OnceLock::new();
    lookup_map(PERSONA_MAPPING, &MAP)
        .get(normalised_task)
        .copied()
        .unwrap_or(UNMAPPED)
        .to_string()
}

pub fn meta_work_life(persona: &str) -> String {
    static MAP: OnceLock<BTreeMap<&str, &str>> = OnceLock::new();
    lookup_map(META_WORK_LIFE_MAPPING, &MAP)
        .get(persona)
        .copied()
        .unwrap_or(UNMAPPED)
        .to_string()
}

pub fn persona_tier2(normalised_task: &str) -> String {
    static MAP: OnceLock<BTreeMap<&str, &str>> = OnceLock::new();
    lookup_map(PERSONA_TIER2_MAPPING, &MAP)
        .get(normalised_task)
        .copied()
        .unwrap_or(UNMAPPED)
        .to_string()
}

pub fn me_time_breakdown(tier2: &str, normalised_task: &str) -> Option<String> {
    if tier2 != "Me Time" {
        return None;
    }
    static MAP: OnceLock<BTreeMap<&str, &str>> = OnceLock::new();
    lookup_map(ME_TIME_BREAKDOWN_MAPPING, &MAP)
        .get(normalised_task)
        .copied()
        .map(ToOwned::to_owned)
}

pub fn social_context(tier2: &str, notes: Option<&str>) -> Option<String> {
    if tier2 != "Social" {
        return None;
    }
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Some("Personal-Nurturing Relationships".to_string());
    };
    let lower = notes.to_lowercase();
    for (context, keywords) in SOCIAL_CONTEXT_KEYWORDS {
        if keywords.iter().any(|kw| lower.contains(kw)) {
            return Some((*context).to_string());
        }
    }
    Some("Personal-Nurturing Relationships".to_string())
}

pub fn social_entity(tier2: &str, notes: Option<&str>) -> Option<String> {
    if tier2 != "Social" {
        return None;
    }
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Some("General-Nurturing Relationships".to_string());
    };
    let lower = notes.to_lowercase();
    for (keyword, entity) in SOCIAL_ENTITY_KEYWORDS {
        if lower.contains(keyword) {
            return Some((*entity).to_string());
        }
    }
    Some("General-Nurturing Relationships".to_string())
}

pub fn commute_context(tier2: &str, notes: Option<&str>) -> Option<String> {
    if tier2 != "Work Time" {
        return None;
    }
    let commuting = notes
        .map(|n| n.to_lowercase().contains("commute"))
        .unwrap_or(false);
    Some(if commuting { "commuting" } else { "working" }.to_string())
}

pub fn clean_notes(notes: Option<&str>) -> Option<String> {
    notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(ToOwned::to_owned)
}

pub fn day_of_week_label(date: NaiveDate) -> String {
    let label = match date.weekday() {
        Weekday::Mon => "_01 Monday",
        Weekday::Tue => "_02 Tuesday",
        Weekday::Wed => "_03 Wednesday",
        Weekday::Thu => "_04 Thursday",
        Weekday::Fri => "_05 Friday",
        Weekday::Sat => "_06 Saturday",
        Weekday::Sun => "_07 Sunday",
    };
    label.to_string()
}

pub fn type_of_day(day_label: &str) -> String {
    if day_label == "_06 Saturday" || day_label == "_07 Sunday" {
        "Weekend".to_string()
    } else {
        "Weekday".to_string()
    }
}

/// Parse a source date. The API always hands over ISO dates; legacy
/// spreadsheet exports carried forms like "Jan 1, 2018 12:00am".
pub fn parse_flexible_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    let head: String = trimmed.split_whitespace().take(3).collect::<Vec<_>>().join(" ");
    for candidate in [trimmed, head.as_str()] {
        for format in ["%Y-%m-%d", "%b %d, %Y", "%m/%d/%Y"] {
            if let Ok(date) = NaiveDate::parse_from_str(candidate, format) {
                return Ok(date);
            }
        }
    }
    Err(anyhow!("unparseable date: {raw:?}"))
}

/// One raw source row, before classification. `external_id` is set by the
/// API path and absent for legacy spreadsheet rows.
#[derive(Debug, Clone, Default)]
pub struct RawRow {
    pub date: String,
    pub task: String,
    pub hours: f64,
    pub notes: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub external_id: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Map one raw row to a canonical record. Rejects rows whose date does
/// not parse; a record without a sortable date would corrupt the store.
pub fn transform_row(row: RawRow) -> Result<TimeEntryRecord> {
    let date = parse_flexible_date(&row.date)?;
    let iso_date = date.format("%Y-%m-%d").to_string();

    let day_of_week = day_of_week_label(date);
    let type_of_day = type_of_day(&day_of_week);
    let normalised_task = normalise_task(&row.task);
    let persona = prioritised_persona(&normalised_task);
    let meta = meta_work_life(&persona);
    let tier2 = persona_tier2(&normalised_task);

    let notes = non_empty(row.notes);
    let notes_clean = clean_notes(notes.as_deref());
    let social_context = social_context(&tier2, notes.as_deref());
    let social_entity = social_entity(&tier2, notes.as_deref());
    let me_time = me_time_breakdown(&tier2, &normalised_task);
    let commute = commute_context(&tier2, notes.as_deref());

    Ok(TimeEntryRecord {
        date: iso_date,
        year: date.year(),
        month: date.month(),
        day: date.day(),
        day_of_week,
        month_name: MONTH_NAMES[date.month0() as usize].to_string(),
        month_num: date.month(),
        week_num: date.iso_week().week(),
        type_of_day,
        task: row.task,
        normalised_task,
        meta_work_life: meta,
        prioritised_persona: persona,
        persona_tier2: tier2,
        hours: row.hours,
        started_at: non_empty(row.started_at),
        ended_at: non_empty(row.ended_at),
        notes,
        notes_clean,
        social_context,
        social_entity,
        me_time_breakdown: me_time,
        commute_context: commute,
        external_id: non_empty(row.external_id),
    })
}
