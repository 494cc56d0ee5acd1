use thiserror::Error;

#[derive(Error, Debug)]
pub enum TermDeckError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Backend error: {0}")]
    Backend(String),
    #[error("Instance index {index} out of range (have {len} instances)")]
    InvalidInstanceIndex { index: usize, len: usize },
    #[error("Malformed terminal switch label: {0:?}")]
    MalformedSwitchLabel(String),
    #[error("No focused editor to run text from")]
    NoFocusedEditor,
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

pub type Result<T> = std::result::Result<T, TermDeckError>;
