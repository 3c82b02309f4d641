//! Defines custom error types for the library.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
/// Error type returned when loading, merging, or saving documents fails.
pub enum MergeError {
    #[error("Failed to load document {}: {reason}", path.display())]
    Load { path: PathBuf, reason: String },

    #[error("Failed to write document {}: {reason}", path.display())]
    Write { path: PathBuf, reason: String },

    #[error("Invalid document package: {0}")]
    InvalidPackage(String),

    #[error("The package does not contain the required part '{0}'")]
    MissingPart(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Invalid merge options: {0}")]
    InvalidOptions(String),
}

impl MergeError {
    pub(crate) fn load(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        MergeError::Load {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, err: impl std::fmt::Display) -> Self {
        MergeError::Write {
            path: path.into(),
            reason: err.to_string(),
        }
    }
}
