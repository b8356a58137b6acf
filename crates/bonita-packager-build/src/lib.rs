//! Bonita Packager Docker image build
//!
//! Assembles a minimal build context around a custom Bonita application and
//! drives an image build on a Docker daemon: optional base image pull,
//! registry authentication, progress relay and build failure detection.

pub mod auth;
pub mod builder;
pub mod context;
pub mod daemon;
pub mod error;
pub mod progress;
pub mod prompt;

pub use auth::{DEFAULT_REGISTRY, PasswordPrompt, RegistryAuth, registry_name};
pub use builder::{BASE_IMAGE_ARG, BASE_IMAGE_VERSION_ARG, ImageBuildOrchestrator, build_args};
pub use context::{BuildContext, ContextBuilder, DOCKERFILE};
pub use daemon::{
    BuildMessage, BuildOptions, DockerDaemon, ErrorDetail, ImageDaemon, MessageStream,
    pull_reference, split_image_tag,
};
pub use error::{BuildError, BuildResult};
pub use progress::BuildProgress;
