use thiserror::Error;

#[derive(Error, Debug)]
pub enum JacketForgeError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON Parsing Error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Baseline snapshot missing or unreadable: {0}")]
    BaselineRestore(String),

    #[error("Deck edit rejected: {0}")]
    EditRejected(String),

    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("Data Validation Error: {0}")]
    Validation(String),
}

pub type JfResult<T> = Result<T, JacketForgeError>;
