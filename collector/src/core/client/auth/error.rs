use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Missing credential: {0}")]
    MissingField(&'static str),

    #[error("Token request failed: {0}")]
    Request(String),

    #[error("Token endpoint rejected the credentials with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Token response has no access_token")]
    MissingAccessToken,

    #[error("Invalid token response: {0}")]
    InvalidResponse(String),
}
