use anyhow::{Result, anyhow};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_BASE_URL: &str = "https://api.harvestapp.com/v2";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Days before the last-synced date the fetch re-requests, to catch
    /// retroactive edits to already-synced entries.
    pub lookback_days: u32,
    /// Fetch start when no store exists yet.
    pub default_start_date: String,
    pub page_size: u32,
    pub max_retries: u32,
    pub base_url: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            default_start_date: "2024-01-01".to_string(),
            page_size: 100,
            max_retries: 5,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct PartialSyncConfig {
    lookback_days: Option<u32>,
    default_start_date: Option<String>,
    page_size: Option<u32>,
    max_retries: Option<u32>,
    base_url: Option<String>,
}

fn env_or_u32(var: &str, fallback: u32) -> u32 {
    match env::var(var) {
        Ok(v) => v.trim().parse::<u32>().ok().unwrap_or(fallback),
        Err(_) => fallback,
    }
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn validate(cfg: &SyncConfig) -> Result<()> {
    if cfg.page_size == 0 || cfg.page_size > 100 {
        return Err(anyhow!("invalid page size: require 1 <= page_size <= 100"));
    }
    if cfg.max_retries == 0 {
        return Err(anyhow!("invalid max retries: must be >= 1"));
    }
    if cfg.base_url.trim().is_empty() {
        return Err(anyhow!("invalid base url: cannot be empty"));
    }
    if NaiveDate::parse_from_str(&cfg.default_start_date, "%Y-%m-%d").is_err() {
        return Err(anyhow!(
            "invalid default start date {:?}: expected YYYY-MM-DD",
            cfg.default_start_date
        ));
    }
    Ok(())
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("TIMELEDGER_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let home = dirs::home_dir()?;
    Some(home.join(".timeledger").join("timeledger.toml"))
}

fn merge_file_config(base: &mut SyncConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialSyncConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(lookback_days) = parsed.lookback_days {
        base.lookback_days = lookback_days;
    }
    if let Some(default_start_date) = parsed.default_start_date {
        base.default_start_date = default_start_date;
    }
    if let Some(page_size) = parsed.page_size {
        base.page_size = page_size;
    }
    if let Some(max_retries) = parsed.max_retries {
        base.max_retries = max_retries;
    }
    if let Some(base_url) = parsed.base_url {
        base.base_url = base_url;
    }
    Ok(())
}

pub fn load_config() -> Result<SyncConfig> {
    let mut cfg = SyncConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.lookback_days = env_or_u32("TIMELEDGER_LOOKBACK_DAYS", cfg.lookback_days);
    cfg.default_start_date = env_or_string(
        "TIMELEDGER_DEFAULT_START_DATE",
        &cfg.default_start_date,
    );
    cfg.page_size = env_or_u32("TIMELEDGER_PAGE_SIZE", cfg.page_size);
    cfg.max_retries = env_or_u32("TIMELEDGER_MAX_RETRIES", cfg.max_retries);
    cfg.base_url = env_or_string("TIMELEDGER_BASE_URL", &cfg.base_url);

    validate(&cfg)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(validate(&SyncConfig::default()).is_ok());
    }

    #[test]
    fn oversized_page_is_rejected() {
        let cfg = SyncConfig {
            page_size: 500,
            ..SyncConfig::default()
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn malformed_start_date_is_rejected() {
        let cfg = SyncConfig {
            default_start_date: "01/01/2024".to_string(),
            ..SyncConfig::default()
        };
        assert!(validate(&cfg).is_err());
    }

    #[test]
    fn partial_toml_overrides_only_named_keys() {
        let mut cfg = SyncConfig::default();
        let parsed: PartialSyncConfig =
            toml::from_str("lookback_days = 7\n").expect("parse");
        if let Some(days) = parsed.lookback_days {
            cfg.lookback_days = days;
        }
        assert_eq!(cfg.lookback_days, 7);
        assert_eq!(cfg.page_size, 100);
    }
}
