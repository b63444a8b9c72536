use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("failed to read config file at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config file at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to initialize logging: {0}")]
    LoggingInit(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
    #[error("failed to open log file at {path}: {source}")]
    LogFileOpen {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to resolve storage path: {details}")]
    StoragePathResolution { details: String },
    #[error("session file not found at {path}; create it with your login tool first")]
    SessionMissing { path: PathBuf },
    #[error("failed to read session file at {path}: {source}")]
    SessionRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse session file at {path}: {source}")]
    SessionParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("session file at {path} holds an empty token")]
    SessionEmpty { path: PathBuf },
    #[error("failed to start async runtime: {0}")]
    RuntimeInit(#[source] std::io::Error),
    #[error("failed to build HTTP client: {0}")]
    HttpClientInit(#[source] reqwest::Error),
}
