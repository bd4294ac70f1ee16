use thiserror::Error;

#[derive(Debug, Error)]
pub enum MarketDataError {
    /// The API key for the named provider was not supplied
    #[error("{0} API key is required")]
    MissingApiKey(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    #[error("Invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    /// Transport-level failure
    #[error("Request to {endpoint} failed: {message}")]
    Request { endpoint: String, message: String },

    /// Non-2xx response
    #[error("{endpoint} returned status {status}: {message}")]
    Status { endpoint: String, status: u16, message: String },

    #[error("Failed to parse response from {endpoint}: {message}")]
    Parse { endpoint: String, message: String },
}
