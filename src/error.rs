use thiserror::Error;

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Browser connection lost")]
    ConnectionLost,

    #[error("Game page not found: {0}")]
    PageNotFound(String),

    #[error("Debugger attach failed: {0}")]
    AttachFailed(String),

    #[error("JavaScript evaluation failed: {0}")]
    EvaluationError(String),

    #[error("Input dispatch failed: {0}")]
    InputFailed(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}
