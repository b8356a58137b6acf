use bonita_packager_core::PackagerError;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Packager(#[from] PackagerError),

    #[error("Docker connection error: {0}")]
    DockerConnection(#[from] bollard::errors::Error),

    #[error("Failed to pull base image '{image}': {message}")]
    PullFailed { image: String, message: String },

    #[error("{0}")]
    BuildFailed(String),

    #[error("Registry authentication failed for {registry}: {message}")]
    AuthFailed { registry: String, message: String },

    #[error("Docker daemon did not answer within {}s", .0.as_secs())]
    Timeout(Duration),

    #[error("Invalid build-progress message: {0}")]
    InvalidMessage(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// ユーザー向けの分かりやすいエラーメッセージ
    pub fn user_message(&self) -> String {
        match self {
            BuildError::DockerConnection(e) => {
                format!(
                    "Cannot talk to the Docker daemon: {}\n\
                     \n\
                     Hints:\n\
                     1. Make sure Docker is running (docker ps)\n\
                     2. Check the DOCKER_HOST environment variable",
                    e
                )
            }
            BuildError::PullFailed { image, message } => {
                format!(
                    "Failed to pull base image '{}': {}\n\
                     \n\
                     Check the image name and your registry credentials\n\
                     (--registry-username / --registry-password).",
                    image, message
                )
            }
            BuildError::BuildFailed(msg) => {
                format!("Error building image: {}", msg)
            }
            BuildError::Timeout(timeout) => {
                format!(
                    "The Docker daemon did not finish within {} seconds, the request was cancelled.",
                    timeout.as_secs()
                )
            }
            _ => format!("{}", self),
        }
    }
}

pub type BuildResult<T> = std::result::Result<T, BuildError>;
