use thiserror::Error;

use crate::core::client::auth::AuthError;

#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("Request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Invalid upstream path {path}: {message}")]
    InvalidUrl { path: String, message: String },

    #[error("Failed to read response body from {endpoint}: {message}")]
    Body { endpoint: String, message: String },

    #[error("Authentication error: {0}")]
    Auth(#[from] AuthError),
}
