use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Archive entry '{entry}' escapes the extraction directory {destination}")]
    PathTraversal { entry: String, destination: PathBuf },

    #[error("Invalid zip archive {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ArchiveError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn zip(path: impl Into<PathBuf>, source: zip::result::ZipError) -> Self {
        ArchiveError::Zip {
            path: path.into(),
            source,
        }
    }

    /// パストラバーサル検査でアーカイブが拒否された場合に true
    pub fn is_path_traversal(&self) -> bool {
        matches!(self, ArchiveError::PathTraversal { .. })
    }
}

pub type Result<T> = std::result::Result<T, ArchiveError>;
