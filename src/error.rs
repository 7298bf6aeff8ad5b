//! Error types at the seams of the alert pipeline.
//!
//! Each component returns its own error so the cycle controller can decide the
//! recovery policy explicitly. None of these ever escape a cycle.

use std::path::PathBuf;

use thiserror::Error;

/// The feed could not give us an answer this cycle.
///
/// This means "no new information", never "no events exist".
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection failure, timeout, or body read error.
    #[error("feed request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The feed answered with a non-success status.
    #[error("feed returned HTTP {status}")]
    Status { status: u16 },

    /// The body was not the expected feature collection.
    #[error("feed payload malformed: {0}")]
    Decode(#[from] serde_json::Error),
}

/// A single channel send failed.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("send request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The delivery endpoint refused the message (non-2xx or `ok: false`).
    #[error("send rejected (HTTP {status}): {description}")]
    Rejected { status: u16, description: String },

    /// The send task died before reporting back.
    #[error("send task aborted: {0}")]
    Aborted(String),
}

/// The announced set could not be written.
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("writing {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("encoding announced set: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Startup configuration is missing or invalid.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is not set")]
    Missing(&'static str),

    #[error("{key} has invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
