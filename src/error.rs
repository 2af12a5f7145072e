//! Error types for the mentor gateway

use thiserror::Error;

/// Result type alias for mentor gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Authentication failures surfaced to the user inline, never retried
/// automatically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    /// Email or password is incorrect
    #[error("email or password is incorrect")]
    InvalidCredentials,

    /// Account already exists for this email
    #[error("user already exists, please sign in")]
    EmailInUse,

    /// Account exists but the email address has not been verified yet
    #[error("email not verified, check your inbox")]
    EmailNotVerified,
}

/// Remote sync failures; the reconciler degrades to local-only data instead
/// of propagating these
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum SyncFailure {
    /// The remote store rejected the caller's credentials
    #[error("remote store permission denied")]
    PermissionDenied,

    /// The remote store could not be reached or answered with a server error
    #[error("remote store unavailable")]
    Unavailable,
}

/// Errors that can occur in the mentor gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Authentication/authorization error
    #[error("auth error: {0}")]
    Auth(#[from] AuthFailure),

    /// Remote sync error
    #[error("sync error: {0}")]
    Sync(#[from] SyncFailure),

    /// Generative backend error (text or speech)
    #[error("generation error: {0}")]
    Generation(String),

    /// Microphone or audio-context failure; aborts the live session
    #[error("media error: {0}")]
    Media(String),

    /// Audio device/stream error
    #[error("audio error: {0}")]
    Audio(String),

    /// Live session transport error
    #[error("session error: {0}")]
    Session(String),

    /// Question not found
    #[error("not found: {0}")]
    NotFound(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl Error {
    /// Classify an HTTP status from the remote document store into the sync
    /// failure taxonomy; `None` means the request never got a response
    #[must_use]
    pub fn classify_remote(status: Option<reqwest::StatusCode>) -> SyncFailure {
        match status {
            Some(s)
                if s == reqwest::StatusCode::UNAUTHORIZED
                    || s == reqwest::StatusCode::FORBIDDEN =>
            {
                SyncFailure::PermissionDenied
            }
            _ => SyncFailure::Unavailable,
        }
    }
}
