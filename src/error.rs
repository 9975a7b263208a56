//! Error types for NativeStage

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for NativeStage operations
pub type Result<T> = std::result::Result<T, LoadError>;

/// Errors that can occur while staging and loading a bundled library
///
/// Every variant is terminal from the loader's perspective: there are no
/// retries, no alternate suffixes and no alternate resource locations.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The bundle holds no resource for the computed filename
    #[error("bundled resource '{resource}' was not found")]
    NotFound { resource: String },

    /// Failed to create the staging directory
    #[error("failed to create staging directory: {0}")]
    StagingDir(#[source] io::Error),

    /// Failed to copy the resource bytes into the staging directory
    #[error("failed to stage '{}': {source}", .path.display())]
    Stage {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The dynamic loader rejected the staged file
    #[error("dynamic loader rejected '{}': {source}", .path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    /// Both the standard dynamic load and the bundle fallback failed
    #[error("failed to load dynamic library '{name}': {source}")]
    Fatal {
        name: String,
        #[source]
        source: Box<LoadError>,
    },
}
