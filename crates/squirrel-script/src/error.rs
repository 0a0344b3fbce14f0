use squirrel_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("syntax error (line {line}): {message}")]
    Syntax { line: usize, message: String },
    #[error("{0}")]
    Eval(String),
    #[error("unknown table: {0}")]
    UnknownTable(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("table source error: {0}")]
    Load(String),
    #[error("execution deadline exceeded")]
    DeadlineExceeded,
}

impl ScriptError {
    /// Shorthand for evaluation errors built from format strings.
    pub fn eval(message: impl Into<String>) -> Self {
        Self::Eval(message.into())
    }
}

pub type Result<T> = std::result::Result<T, ScriptError>;
