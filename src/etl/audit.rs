use crate::etl::paths::LedgerPaths;
use crate::etl::util::now_epoch_secs;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;

/// One JSONL line per run phase, appended to `<logs>/audit.log`. Cron
/// runs are diagnosed from this file, so every line names the command
/// that produced it and carries the record count where one is known.
#[derive(Debug, Serialize)]
struct AuditLine<'a> {
    at_epoch_secs: u64,
    command: &'a str,
    phase: &'a str,
    status: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
    message: &'a str,
}

/// Audit trail of a single `sync` or `import` invocation.
pub struct RunLog<'a> {
    paths: &'a LedgerPaths,
    command: &'static str,
}

impl<'a> RunLog<'a> {
    pub fn new(paths: &'a LedgerPaths, command: &'static str) -> Self {
        Self { paths, command }
    }

    pub fn event(&self, phase: &str, status: &str, message: &str) -> Result<()> {
        self.append(phase, status, None, message)
    }

    /// Like [`event`](Self::event) but with the store record count.
    pub fn counted(&self, phase: &str, status: &str, records: usize, message: &str) -> Result<()> {
        self.append(phase, status, Some(records), message)
    }

    fn append(
        &self,
        phase: &str,
        status: &str,
        records: Option<usize>,
        message: &str,
    ) -> Result<()> {
        fs::create_dir_all(&self.paths.logs_dir)
            .with_context(|| format!("failed to create {}", self.paths.logs_dir.display()))?;
        let line = AuditLine {
            at_epoch_secs: now_epoch_secs()?,
            command: self.command,
            phase,
            status,
            records,
            message,
        };

        let path = self.paths.logs_dir.join("audit.log");
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{}", serde_json::to_string(&line)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::paths::LedgerPaths;
    use tempfile::tempdir;

    #[test]
    fn run_log_appends_one_json_line_per_event() {
        let tmp = tempdir().expect("tempdir");
        let paths = LedgerPaths {
            ledger_home: tmp.path().to_path_buf(),
            store_file: tmp.path().join("processed/timeentries.json"),
            public_file: tmp.path().join("public/data/timeentries.json"),
            logs_dir: tmp.path().join("logs"),
            lock_file: tmp.path().join("sync.lock"),
        };

        let log = RunLog::new(&paths, "sync");
        log.event("fetch", "start", "from=2024-01-01 to=2024-01-31")
            .expect("event");
        log.counted("write", "ok", 42, "store updated").expect("counted");

        let raw = fs::read_to_string(paths.logs_dir.join("audit.log")).expect("read log");
        let lines: Vec<serde_json::Value> = raw
            .lines()
            .map(|l| serde_json::from_str(l).expect("json line"))
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["command"], "sync");
        assert_eq!(lines[0]["phase"], "fetch");
        assert_eq!(lines[0].get("records"), None);
        assert_eq!(lines[1]["status"], "ok");
        assert_eq!(lines[1]["records"], 42);
    }
}
