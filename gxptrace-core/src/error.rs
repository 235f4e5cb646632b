use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the traceability core
#[derive(Error, Debug)]
pub enum GxpError {
    #[error("Specification directory not found: {}", .0.display())]
    SpecDirNotFound(PathBuf),

    #[error("Test directory not found: {}", .0.display())]
    TestDirNotFound(PathBuf),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl GxpError {
    /// Wrap an IO error with the path it occurred on
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        GxpError::Io {
            path: path.into(),
            source,
        }
    }
}
