//! Error types for the editor core.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid key notation: {0}")]
    KeyNotation(String),

    #[error("Key binding {keys} ({filter}) is already registered")]
    BindingConflict { keys: String, filter: String },

    #[error("Not an editor command: {0}")]
    CommandParse(String),

    #[error("Unknown option: {0}")]
    UnknownOption(String),

    #[error("{0}")]
    InvalidValue(String),

    #[error("No file name")]
    NoFileName,

    #[error("'readonly' option is set (add ! to override)")]
    ReadOnly,

    #[error("Cannot write to {0}")]
    Unwritable(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EditorError>;
