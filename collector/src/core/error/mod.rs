use thiserror::Error;

use crate::core::client::auth::AuthError;

pub type FetchResult<T> = Result<T, FetchError>;

/// Terminal outcome of a paced, retried upstream fetch.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("{endpoint}: giving up after {attempts} attempts, last error: {last_cause}")]
    RetriesExhausted { endpoint: String, attempts: u32, last_cause: String },

    #[error("{endpoint}: non-retryable status {status}: {body}")]
    NonRetryable { endpoint: String, status: u16, body: String },

    #[error("{endpoint}: still throttled after {waits} waits")]
    ThrottleLimit { endpoint: String, waits: u32 },

    #[error("Authentication failed: {0}")]
    Auth(#[from] AuthError),

    #[error("{endpoint}: failed to parse response: {message}")]
    Parse { endpoint: String, message: String },
}

impl FetchError {
    /// Fatal errors stop the whole run rather than failing a single unit.
    pub fn is_fatal(&self) -> bool {
        matches!(self, FetchError::Auth(_))
    }
}
