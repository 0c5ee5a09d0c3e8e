use anyhow::Result;
use std::env;
use std::path::PathBuf;

/// Every location the ETL touches, resolved once per run.
#[derive(Debug, Clone)]
pub struct LedgerPaths {
    pub ledger_home: PathBuf,
    /// Canonical processed store (authoritative copy).
    pub store_file: PathBuf,
    /// Public asset copy consumed by the dashboard.
    pub public_file: PathBuf,
    pub logs_dir: PathBuf,
    pub lock_file: PathBuf,
}

fn required_home_dir() -> Result<PathBuf> {
    if let Some(home) = dirs::home_dir() {
        return Ok(home);
    }
    Err(anyhow::anyhow!("HOME directory could not be resolved"))
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> Result<LedgerPaths> {
    let home = required_home_dir()?;
    let ledger_home = env_or_default_path("TIMELEDGER_HOME", home.join(".timeledger"));

    let data_dir = env_or_default_path("TIMELEDGER_DATA_DIR", ledger_home.join("processed"));
    let public_dir = env_or_default_path("TIMELEDGER_PUBLIC_DIR", ledger_home.join("public/data"));
    let logs_dir = env_or_default_path("TIMELEDGER_LOGS_DIR", ledger_home.join("logs"));

    Ok(LedgerPaths {
        store_file: data_dir.join("timeentries.json"),
        public_file: public_dir.join("timeentries.json"),
        lock_file: ledger_home.join("sync.lock"),
        logs_dir,
        ledger_home,
    })
}
