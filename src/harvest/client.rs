//! Blocking Harvest API v2 client: paginated time-entry fetch with
//! Retry-After-driven backoff on rate limits. Any other non-success
//! status aborts the run before anything is written.

use crate::error::SyncError;
use crate::etl::config::SyncConfig;
use crate::etl::transform::RawRow;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::env;
use std::thread;
use std::time::Duration;

const USER_AGENT: &str = "timeledger (github.com/coinbuidl/timeledger)";
const REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRY_AFTER_SECS: u64 = 15;
const INTER_PAGE_DELAY_MS: u64 = 500;

#[derive(Debug, Clone)]
pub struct HarvestCredentials {
    pub token: String,
    pub account_id: String,
}

impl HarvestCredentials {
    /// Read credentials from the environment. Fails before any request is
    /// made, so a misconfigured cron job never touches the API.
    pub fn from_env() -> Result<Self, SyncError> {
        let token = required_env("HARVEST_ACCESS_TOKEN")?;
        let account_id = required_env("HARVEST_ACCOUNT_ID")?;
        Ok(Self { token, account_id })
    }
}

fn required_env(var: &'static str) -> Result<String, SyncError> {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => Ok(v.trim().to_string()),
        _ => Err(SyncError::MissingCredentials(var)),
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawTimeEntry {
    pub id: u64,
    pub spent_date: String,
    pub hours: f64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub started_time: Option<String>,
    #[serde(default)]
    pub ended_time: Option<String>,
    #[serde(default)]
    pub task: Option<TaskRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskRef {
    #[serde(default)]
    pub name: String,
}

impl RawTimeEntry {
    pub fn into_row(self) -> RawRow {
        RawRow {
            date: self.spent_date,
            task: self.task.map(|t| t.name).unwrap_or_default(),
            hours: self.hours,
            notes: self.notes,
            started_at: self.started_time,
            ended_at: self.ended_time,
            external_id: Some(self.id.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TimeEntriesPage {
    #[serde(default)]
    time_entries: Vec<RawTimeEntry>,
    #[serde(default)]
    next_page: Option<u32>,
}

pub struct HarvestClient {
    http: Client,
    credentials: HarvestCredentials,
    base_url: String,
    page_size: u32,
    max_retries: u32,
}

impl HarvestClient {
    pub fn new(credentials: HarvestCredentials, cfg: &SyncConfig) -> Result<Self, SyncError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            http,
            credentials,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            page_size: cfg.page_size,
            max_retries: cfg.max_retries,
        })
    }

    /// Fetch every time entry in `[from, to]`, walking pagination until
    /// the server reports no next page.
    pub fn fetch_range(&self, from: &str, to: &str) -> Result<Vec<RawTimeEntry>, SyncError> {
        let mut all = Vec::new();
        let mut page = 1u32;

        loop {
            let body = self.fetch_page(from, to, page)?;
            all.extend(body.time_entries);

            let Some(next) = body.next_page else {
                break;
            };
            page = next;
            // Polite delay between pages.
            thread::sleep(Duration::from_millis(INTER_PAGE_DELAY_MS));
        }

        Ok(all)
    }

    fn fetch_page(&self, from: &str, to: &str, page: u32) -> Result<TimeEntriesPage, SyncError> {
        let url = format!("{}/time_entries", self.base_url);
        let page_param = page.to_string();
        let per_page_param = self.page_size.to_string();

        for _retry in 0..self.max_retries {
            let response = self
                .http
                .get(&url)
                .bearer_auth(&self.credentials.token)
                .header("Harvest-Account-Id", &self.credentials.account_id)
                .query(&[
                    ("from", from),
                    ("to", to),
                    ("page", page_param.as_str()),
                    ("per_page", per_page_param.as_str()),
                ])
                .send()?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                thread::sleep(Duration::from_secs(retry_after_secs(&response)));
                continue;
            }
            if !status.is_success() {
                return Err(SyncError::Http(status));
            }
            return Ok(response.json()?);
        }

        Err(SyncError::RateLimitExhausted {
            retries: self.max_retries,
        })
    }
}

fn retry_after_secs(response: &reqwest::blocking::Response) -> u64 {
    response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
