//! Error types for AXON.

use std::io;

/// Errors produced by the AXON input pipeline.
#[derive(Debug, thiserror::Error)]
pub enum AxonError {
    #[error("device error: {0}")]
    Device(String),

    #[error("config error: {0}")]
    Config(String),

    #[error("movie error: {0}")]
    Movie(String),

    #[error("movie incompatible: {0}")]
    Incompatible(String),

    #[error("overlay error: {0}")]
    Overlay(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, AxonError>;
