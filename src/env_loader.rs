use std::env;
use std::path::PathBuf;

fn fallback_dotenv_path(ledger_home: Option<PathBuf>, home_dir: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(base) = ledger_home {
        return Some(base.join(".env"));
    }
    Some(home_dir?.join(".timeledger/.env"))
}

/// Load credentials from a `.env` in the working directory, falling back to
/// the ledger home so cron invocations pick them up too.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    let fallback = fallback_dotenv_path(
        env::var_os("TIMELEDGER_HOME").map(PathBuf::from),
        dirs::home_dir(),
    );

    let Some(path) = fallback else {
        return;
    };
    if path.is_file() {
        let _ = dotenvy::from_path(&path);
    }
}
