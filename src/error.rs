use thiserror::Error;

use crate::models::Provider;

/// Coarse failure category reported to the calling layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Input,
    Config,
    Remote,
    Extraction,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    /// Missing or empty user input. The message is shown verbatim.
    #[error("{0}")]
    Input(String),

    #[error("Missing {0} API key. Add it in Settings.")]
    MissingApiKey(Provider),

    #[error("{service} request failed ({status}): {body}")]
    Remote {
        service: String,
        status: u16,
        body: String,
    },

    #[error("{0} returned an empty response.")]
    EmptyResponse(String),

    #[error("Humanize API returned error: {0}")]
    Humanize(String),

    #[error("Humanize API returned an empty primary response.")]
    EmptyHumanized,

    #[error("Failed to reach {service}: {source}")]
    Transport {
        service: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Failed to parse {service} response: {source}")]
    Decode {
        service: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Extraction(String),

    #[error("Invalid settings file {path}: {source}")]
    Settings {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("PDF rendering failed: {0}")]
    Pdf(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl AppError {
    pub fn input(message: impl Into<String>) -> Self {
        AppError::Input(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Input(_) => ErrorKind::Input,
            AppError::MissingApiKey(_) | AppError::Settings { .. } => ErrorKind::Config,
            AppError::Remote { .. }
            | AppError::EmptyResponse(_)
            | AppError::Humanize(_)
            | AppError::EmptyHumanized
            | AppError::Transport { .. }
            | AppError::Decode { .. } => ErrorKind::Remote,
            AppError::Extraction(_) => ErrorKind::Extraction,
            AppError::Pdf(_) | AppError::Io(_) => ErrorKind::Internal,
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
