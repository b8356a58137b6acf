use bonita_packager_archive::ArchiveError;
use std::path::PathBuf;
use thiserror::Error;

/// バンドルを特定できなかった理由
///
/// パイプラインの失敗ではなく、利用者への案内として扱います。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LocateError {
    #[error("Bonita Tomcat bundle file passed as parameter does not exist: {0}")]
    BundleMissing(PathBuf),

    #[error(
        "Bonita Tomcat bundle file passed as parameter is not a proper Bonita Tomcat bundle ZIP file: {0}"
    )]
    NotAnArchive(PathBuf),

    #[error("Bonita Tomcat Bundle not found in folder {0}")]
    NotFound(PathBuf),

    #[error("Invalid bundle search pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },
}

#[derive(Error, Debug)]
pub enum PackagerError {
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("No root folder found inside file {0}")]
    MissingRootFolder(PathBuf),

    #[error("Web application archive not found in bundle: {0}")]
    WarNotFound(PathBuf),

    #[error("Custom application folder cannot be created, unexpected bundle layout: {0}")]
    InjectionTargetMissing(PathBuf),

    #[error("Application artifact not found: {0}")]
    ArtifactNotFound(PathBuf),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PackagerError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PackagerError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PackagerError>;
