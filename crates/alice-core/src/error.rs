//! Error types for Alice Core

use thiserror::Error;

/// Result type alias using Alice Error
pub type Result<T> = std::result::Result<T, Error>;

/// Alice error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Admin call {path} failed with status {status}: {body}")]
    Admin {
        path: String,
        status: u16,
        body: String,
    },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Agent process error: {0}")]
    Process(String),

    #[error("Webhook listener error: {0}")]
    Webhook(String),

    #[error("A connection signal is already pending")]
    SignalPending,

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("No active connection")]
    NotConnected,

    #[error("Session aborted: {0}")]
    Session(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),
}

/// Invitation decoding errors
///
/// These are never fatal: the session reports them and asks for another
/// invitation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid invitation: {0}")]
    InvalidJson(String),
}
