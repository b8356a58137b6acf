//! Bonita Packager core
//!
//! Immutable packaging configuration, Tomcat bundle location and the Tomcat
//! bundle repackaging pipeline.

pub mod artifact;
pub mod config;
pub mod error;
pub mod locator;
pub mod staging;
pub mod tomcat;

pub use artifact::copy_artifact;
pub use config::{
    DEFAULT_BUILD_TIMEOUT, DEFAULT_IMAGE_TAG, DEFAULT_PULL_TIMEOUT, DockerOptions, PackageOptions,
    RegistryLogin, TomcatOptions,
};
pub use error::{LocateError, PackagerError, Result};
pub use locator::{BUNDLE_PATTERN, bundle_name, locate_bundle};
pub use staging::StagingDir;
pub use tomcat::{TomcatOutcome, TomcatPackager, TomcatStage};
