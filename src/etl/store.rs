use crate::etl::model::StoreDocument;
use crate::etl::paths::LedgerPaths;
use crate::etl::sanitize::sanitize;
use crate::etl::warn;
use anyhow::{Context, Result, anyhow};
use fs2::FileExt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const SOURCE_API_SYNC: &str = "harvest-api-sync";
pub const SOURCE_LEGACY_IMPORT: &str = "legacy-csv-import";

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub canonical_path: PathBuf,
    /// `None` when the public copy failed; the run still succeeds.
    pub public_path: Option<PathBuf>,
    pub bytes: usize,
}

/// Exclusive run lock. Held for the whole load-merge-write cycle; the
/// store is single-writer by contract.
#[derive(Debug)]
pub struct RunLock {
    _file: fs::File,
}

pub fn acquire_run_lock(paths: &LedgerPaths) -> Result<RunLock> {
    fs::create_dir_all(&paths.ledger_home)
        .with_context(|| format!("failed to create {}", paths.ledger_home.display()))?;
    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .open(&paths.lock_file)
        .with_context(|| format!("failed to open {}", paths.lock_file.display()))?;
    file.try_lock_exclusive().map_err(|_| {
        anyhow!(
            "another sync run holds the lock at {}",
            paths.lock_file.display()
        )
    })?;
    Ok(RunLock { _file: file })
}

/// Whole-file load. A missing store is not an error; the caller decides
/// the start date.
pub fn load(paths: &LedgerPaths) -> Result<Option<StoreDocument>> {
    let file = &paths.store_file;
    if !file.exists() {
        return Ok(None);
    }

    let raw =
        fs::read_to_string(file).with_context(|| format!("failed to read {}", file.display()))?;
    let parsed: StoreDocument = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    Ok(Some(parsed))
}

fn write_atomic(file: &Path, data: &str) -> Result<()> {
    let parent = file
        .parent()
        .ok_or_else(|| anyhow!("store path has no parent: {}", file.display()))?;
    fs::create_dir_all(parent)
        .with_context(|| format!("failed to create {}", parent.display()))?;

    let mut tmp = NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to stage write under {}", parent.display()))?;
    tmp.write_all(data.as_bytes())
        .with_context(|| format!("failed to stage {}", file.display()))?;
    tmp.persist(file)
        .map_err(|err| anyhow!("failed to persist {}: {err}", file.display()))?;
    Ok(())
}

/// Dual-write: atomic canonical store first, then a best-effort public
/// asset copy. Failure of the second copy is a warning, never an error;
/// the canonical file is authoritative.
pub fn save(paths: &LedgerPaths, document: &StoreDocument) -> Result<SaveOutcome> {
    let value = sanitize(serde_json::to_value(document)?);
    let data = format!("{}\n", serde_json::to_string_pretty(&value)?);

    write_atomic(&paths.store_file, &data)?;

    let public_path = match write_public_copy(&paths.public_file, &data) {
        Ok(()) => Some(paths.public_file.clone()),
        Err(err) => {
            warn::emit(
                "W001",
                "publish",
                &paths.public_file.display().to_string(),
                &format!("{err:#}"),
            );
            None
        }
    };

    Ok(SaveOutcome {
        canonical_path: paths.store_file.clone(),
        public_path,
        bytes: data.len(),
    })
}

fn write_public_copy(file: &Path, data: &str) -> Result<()> {
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    fs::write(file, data).with_context(|| format!("failed to write {}", file.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etl::model::{StoreDocument, test_record};
    use crate::etl::paths::LedgerPaths;
    use tempfile::tempdir;

    fn sandbox_paths(root: &Path) -> LedgerPaths {
        LedgerPaths {
            ledger_home: root.to_path_buf(),
            store_file: root.join("processed/timeentries.json"),
            public_file: root.join("public/data/timeentries.json"),
            logs_dir: root.join("logs"),
            lock_file: root.join("sync.lock"),
        }
    }

    #[test]
    fn save_then_load_round_trips_the_document() {
        let tmp = tempdir().expect("tempdir");
        let paths = sandbox_paths(tmp.path());
        let doc = StoreDocument::assemble(
            vec![test_record("2024-01-02", "Work", 2.0)],
            SOURCE_API_SYNC,
            "test",
        );

        let outcome = save(&paths, &doc).expect("save");
        assert!(outcome.public_path.is_some());
        assert!(paths.store_file.is_file());
        assert!(paths.public_file.is_file());

        let loaded = load(&paths).expect("load").expect("document");
        assert_eq!(loaded.entries.len(), 1);
        assert_eq!(loaded.metadata.source, SOURCE_API_SYNC);
    }

    #[test]
    fn nan_hours_survive_a_save_load_cycle() {
        // The sanitizer writes a non-finite hours value as `null`; the
        // store must still read the file it just wrote.
        let tmp = tempdir().expect("tempdir");
        let paths = sandbox_paths(tmp.path());
        let doc = StoreDocument::assemble(
            vec![
                test_record("2024-01-03", "Work", 2.0),
                test_record("2024-01-02", "Work", f64::NAN),
            ],
            SOURCE_LEGACY_IMPORT,
            "test",
        );
        save(&paths, &doc).expect("save");

        let raw = fs::read_to_string(&paths.store_file).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value.pointer("/entries/1/hours"), Some(&serde_json::Value::Null));

        let loaded = load(&paths).expect("load").expect("document");
        assert_eq!(loaded.entries.len(), 2);
        assert_eq!(loaded.entries[0].hours, 2.0);
        assert!(loaded.entries[1].hours.is_nan());
    }

    #[test]
    fn missing_store_loads_as_none() {
        let tmp = tempdir().expect("tempdir");
        let paths = sandbox_paths(tmp.path());
        assert!(load(&paths).expect("load").is_none());
    }

    #[test]
    fn public_copy_failure_is_non_fatal() {
        let tmp = tempdir().expect("tempdir");
        let mut paths = sandbox_paths(tmp.path());
        // A public path whose parent is a regular file cannot be created.
        fs::write(tmp.path().join("blocked"), b"x").expect("write blocker");
        paths.public_file = tmp.path().join("blocked/timeentries.json");

        let doc = StoreDocument::assemble(Vec::new(), SOURCE_API_SYNC, "test");
        let outcome = save(&paths, &doc).expect("save");
        assert!(outcome.public_path.is_none());
        assert!(paths.store_file.is_file());
    }

    #[test]
    fn run_lock_is_exclusive() {
        let tmp = tempdir().expect("tempdir");
        let paths = sandbox_paths(tmp.path());
        let first = acquire_run_lock(&paths).expect("first lock");
        assert!(acquire_run_lock(&paths).is_err());
        drop(first);
        assert!(acquire_run_lock(&paths).is_ok());
    }

    #[test]
    fn saved_json_carries_camel_case_store_shape() {
        let tmp = tempdir().expect("tempdir");
        let paths = sandbox_paths(tmp.path());
        let doc = StoreDocument::assemble(
            vec![test_record("2024-01-02", "Work", 2.0)],
            SOURCE_API_SYNC,
            "test",
        );
        save(&paths, &doc).expect("save");

        let raw = fs::read_to_string(&paths.store_file).expect("read");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(
            value.pointer("/metadata/recordCount"),
            Some(&serde_json::json!(1))
        );
        assert!(value.pointer("/entries/0/notesClean").is_some());
    }
}
