//! Ошибки загрузки species данных

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Failed to read file '{path}': {details}")]
    ReadError { path: String, details: String },

    #[error("Parse error in '{path}': {details}")]
    ParseError { path: String, details: String },

    #[error("Unknown species '{0}'")]
    UnknownSpecies(String),

    #[error("Duplicate species id '{0}'")]
    DuplicateSpecies(String),

    #[error("Invalid species '{id}': {reason}")]
    InvalidDefinition { id: String, reason: String },
}
