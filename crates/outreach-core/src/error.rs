use crate::transport::TransportError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("invalid tier: {0}")]
    InvalidTier(String),

    #[error("no template for tier: {0}")]
    TemplateNotFound(String),

    #[error("template for tier '{tier}' has an empty {field}")]
    EmptyTemplateField { tier: String, field: &'static str },

    #[error("template set rejected: {0}")]
    InvalidTemplateSet(String),

    #[error("unsupported file format: {0} (expected .csv or .json)")]
    UnsupportedFormat(String),

    #[error("no audit entries to export")]
    NothingToExport,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, OutreachError>;
