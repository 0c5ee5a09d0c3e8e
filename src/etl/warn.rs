//! Structured non-fatal warnings. One stderr line per event, key=value,
//! greppable from cron mail.

fn sanitize_value(value: &str) -> String {
    let words: Vec<String> = value
        .split_whitespace()
        .map(|word| word.chars().filter(char::is_ascii_graphic).collect())
        .filter(|word: &String| !word.is_empty())
        .collect();
    if words.is_empty() {
        "na".to_string()
    } else {
        words.join("_")
    }
}

pub fn emit(code: &str, stage: &str, path: &str, err: &str) {
    eprintln!(
        "TIMELEDGER_WARN code={} stage={} path={} err={}",
        sanitize_value(code),
        sanitize_value(stage),
        sanitize_value(path),
        sanitize_value(err),
    );
}
