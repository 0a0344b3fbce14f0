use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("column not found: {0}")]
    ColumnNotFound(String),
    #[error("column length mismatch: expected {expected} rows, got {got}")]
    LengthMismatch { expected: usize, got: usize },
    #[error("column already exists: {0}")]
    DuplicateColumn(String),
}

pub type Result<T> = std::result::Result<T, ModelError>;
