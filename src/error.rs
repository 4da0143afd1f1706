use std::path::PathBuf;

use thiserror::Error;

pub type Result<T, E = ClassLoaderError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ClassLoaderError {
    #[error("The given directory '{path}' does not exist.")]
    InvalidPath { path: String },

    #[error("Failed to read class source: {}", path.display())]
    ReadSource {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("PHP grammar unavailable: {message}")]
    Grammar { message: String },

    #[error("Cannot declare class {name}, because the name is already in use ({})", path.display())]
    ClassAlreadyDefined { name: String, path: PathBuf },

    #[error("Class \"{name}\" not found")]
    ClassNotFound { name: String },

    #[error("Failed to access class map: {}", path.display())]
    ClassMap {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed class map: {}", path.display())]
    ClassMapFormat {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
