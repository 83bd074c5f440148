//! Storage Layer
//!
//! Writes report artifacts to disk and keeps an in-memory index of the
//! reports generated by this process.

mod artifact;
mod repository;

pub use artifact::{sanitize_file_stem, ArtifactWriter};
pub use repository::{ReportRecord, Repository};

use thiserror::Error;

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
    #[error("Serialization error: {0}")]
    SerializationError(String),
}
