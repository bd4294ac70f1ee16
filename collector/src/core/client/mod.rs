use std::time::Duration;

use reqwest::Client;

pub mod auth;
pub mod storage;
pub mod upstream;

pub use auth::{OAuthClientCredentials, TokenProvider};
pub use storage::{s3::AWSS3, StorageClient};
pub use upstream::{blockstream::BlockstreamClient, RawResponse, UpstreamClient};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client shared by the token exchange and the data API. Every request,
/// connection and body included, is bounded by `timeout`.
pub fn http_client(timeout: Duration) -> reqwest::Result<Client> {
    Client::builder().timeout(timeout).connect_timeout(timeout.min(CONNECT_TIMEOUT)).build()
}
