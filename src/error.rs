use std::path::PathBuf;
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum BridgeError {
    #[error("Credentials file not found: {0}")]
    CredentialsMissing(PathBuf),

    #[error("Credentials file {path} is unusable: {reason}")]
    CredentialsInvalid { path: PathBuf, reason: String },

    #[error("Access token exchange failed: {0}")]
    TokenExchange(String),

    #[error("Invalid database URL: {0}")]
    InvalidDatabaseUrl(String),

    #[error("Database request to {path} failed with HTTP {status}")]
    HttpStatus { path: String, status: u16 },

    #[error("Unexpected database response: {0}")]
    UnexpectedResponse(String),

    #[error("Sensor read failed: {0}")]
    SensorRead(String),

    #[error("Invalid menu input: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    HttpError(#[from] reqwest::Error),

    #[error(transparent)]
    TaskError(#[from] tokio::task::JoinError),

    #[error(transparent)]
    IoError(#[from] std::io::Error),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;
