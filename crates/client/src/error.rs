//! Client error types.

use thiserror::Error;

/// Client error type.
///
/// Every variant is terminal for the attempted operation; the operator is the
/// retry mechanism.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("OTP must be exactly six digits")]
    InvalidOtp,

    #[error("unknown role: {0}")]
    UnknownRole(String),

    #[error("OTP rejected: {0}")]
    OtpRejected(String),

    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("session credentials decode failed: {0}")]
    CredentialsDecode(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("not connected")]
    NotConnected,

    #[error("request type must not be empty")]
    EmptyRequestType,

    #[error("payload is not valid JSON: {0}")]
    InvalidPayload(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Client result type.
pub type Result<T> = std::result::Result<T, ClientError>;
