//! Error types for query resolution, case registration and tree building.

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed query `{query}`: {reason}")]
    MalformedQuery { query: String, reason: String },

    #[error("Duplicate key in combined params: {0}")]
    DuplicateKey(String),

    #[error("Duplicate test case params: {0}")]
    DuplicateCase(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Forbidden character in param value: {key}={value}")]
    ForbiddenCharacter { key: String, value: String },

    #[error("Invalid param value for `{key}`: {reason}")]
    InvalidParamValue { key: String, reason: String },

    #[error("Test is already parameterized: {0}")]
    AlreadyParameterized(String),

    #[error("Test has no function: {0}")]
    MissingTestFn(String),

    #[error("Spec not found: {0}")]
    SpecNotFound(String),

    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn malformed(query: &str, reason: impl Into<String>) -> Self {
        Error::MalformedQuery {
            query: query.to_string(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
