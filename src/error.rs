use thiserror::Error;

/// Failures at the remote-fetch boundary. Everything above this layer
/// wraps with `anyhow` context instead.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("missing required environment variable: {0}")]
    MissingCredentials(&'static str),
    #[error("rate limited by harvest; gave up after {retries} retries")]
    RateLimitExhausted { retries: u32 },
    #[error("harvest API call failed with status {0}")]
    Http(reqwest::StatusCode),
    #[error("harvest API transport error: {0}")]
    Transport(#[from] reqwest::Error),
}
