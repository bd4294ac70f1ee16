pub mod error;
pub mod oauth;

use async_trait::async_trait;
pub use error::AuthError;
pub use oauth::OAuthClientCredentials;

/// Source of bearer credentials for the upstream API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A currently valid access token, exchanging for a new one when needed.
    async fn token(&self) -> Result<String, AuthError>;

    /// Forget the cached token, e.g. after the API rejected it.
    async fn invalidate(&self);
}
