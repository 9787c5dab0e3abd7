//! Error types shared across the front-end

use thiserror::Error;

use crate::phase::Phase;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────
    // Infrastructure
    // ─────────────────────────────────────────────────────────────
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // ─────────────────────────────────────────────────────────────
    // Discovery / backend
    // ─────────────────────────────────────────────────────────────
    #[error("no server available")]
    NoServerAvailable,

    #[error("server lookup failed with status {status}")]
    Discovery { status: u16 },

    #[error("backend error: {message}")]
    Backend { message: String },

    #[error("unknown phase value: {0}")]
    UnknownPhase(u8),

    #[error("cannot move from phase {from:?} to {to:?}")]
    InvalidTransition { from: Phase, to: Phase },

    // ─────────────────────────────────────────────────────────────
    // Configuration
    // ─────────────────────────────────────────────────────────────
    #[error("configuration error: {message}")]
    Config { message: String },

    #[error("invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}
