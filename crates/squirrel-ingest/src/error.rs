use thiserror::Error;

pub type Result<T> = std::result::Result<T, IngestError>;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid manifest in {dir}: {reason}")]
    Manifest { dir: String, reason: String },

    #[error("unsupported data source: {0}")]
    UnsupportedSource(String),

    #[error(transparent)]
    Model(#[from] squirrel_model::ModelError),
}
