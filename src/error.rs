//! @ai:module:intent Define error types for the code generator
//! @ai:module:layer domain
//! @ai:module:public_api Error, Result
//! @ai:module:stateless true

use crate::role::Role;
use std::path::PathBuf;
use thiserror::Error;

/// @ai:intent Unified error type for all generator operations
/// @ai:invariant every variant is fatal; degraded conditions are logged, never returned
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("The input path is not a valid Cargo project: {0}")]
    InvalidProject(String),

    #[error("{} must not exist in the input project", .0.display())]
    ForbiddenFile(PathBuf),

    #[error("library entry file {} does not exist", .0.display())]
    MissingLibrary(PathBuf),

    #[error("The Cargo.toml file must not contain a {0} section")]
    ForbiddenSection(String),

    #[error("Output directory {} already exists", .0.display())]
    OutputExists(PathBuf),

    #[error("Failed to parse manifest {}: {source}", .path.display())]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Mandatory dependency fragment {0} not found")]
    MissingFragment(String),

    #[error("Template error in {stub}: {message}")]
    Template { stub: String, message: String },

    #[error("Duplicate {role} declaration `{name}`")]
    DuplicateDeclaration { role: Role, name: String },

    #[error("Too many {role} declarations: {count} do not fit in a window of {capacity}")]
    IndexOverflow {
        role: Role,
        count: usize,
        capacity: usize,
    },

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// @ai:intent Attach a path to an io::Error
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
