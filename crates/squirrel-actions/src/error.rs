use thiserror::Error;

pub type Result<T> = std::result::Result<T, ActionError>;

#[derive(Debug, Error)]
pub enum ActionError {
    #[error("unknown action kind: {0}")]
    UnknownKind(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value {value:?} for {field} (allowed: {allowed})")]
    InvalidValue {
        field: String,
        value: String,
        allowed: String,
    },

    #[error("column addressing c[..] used without an active table")]
    NoActiveTable,

    #[error("{0}")]
    Generate(String),
}

impl ActionError {
    pub(crate) fn generate(msg: impl Into<String>) -> Self {
        Self::Generate(msg.into())
    }
}
