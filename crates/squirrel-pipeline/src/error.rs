use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("missing marker: {0}")]
    MissingMarker(&'static str),

    #[error("duplicated marker: {0}")]
    DuplicateMarker(&'static str),

    #[error("pipeline end marker appears before the start marker")]
    MarkerOrder,

    #[error("anchor line found outside the pipeline region")]
    AnchorOutsideRegion,

    #[error("no pipeline entry with id {0}")]
    EntryNotFound(usize),

    #[error("reorder request must be a permutation of 0..{expected}, got {got:?}")]
    MalformedPermutation { expected: usize, got: Vec<usize> },

    #[error("malformed reorder token: {0:?}")]
    BadReorderToken(String),
}
