use std::path::PathBuf;
use thiserror::Error;
#[derive(Debug, Error)]
pub enum SpectralError {
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("sample rate must be greater than zero")]
    InvalidSampleRate,
    #[error("insufficient data: segment needs {needed} samples, channel has {available}")]
    InsufficientData { needed: usize, available: usize },
    #[error("failed to enumerate input: {0}")]
    Enumeration(String),
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("json error on {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
impl SpectralError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SpectralError::InvalidParameter(message.into())
    }
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SpectralError::Io {
            path: path.into(),
            source,
        }
    }
    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        SpectralError::Json {
            path: path.into(),
            source,
        }
    }
}
