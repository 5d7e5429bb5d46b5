//! Error types for rust-efsquash

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while squashing or converting migrations
#[derive(Error, Debug)]
pub enum SquashError {
    #[error("Migrations directory does not exist or is not a directory: {path}")]
    InvalidDirectory { path: PathBuf },

    #[error("Failed to read migration file: {path}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write migration file: {path}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to remove migration file: {path}")]
    FileRemove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to move descriptor {from} to {to}")]
    FileRename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("External tool failed: {message}")]
    ExternalTool { message: String },

    #[error("No project file found above {path}")]
    ProjectNotFound { path: PathBuf },
}
