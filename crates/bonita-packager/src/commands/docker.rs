use bonita_packager_build::{DockerDaemon, ImageBuildOrchestrator};
use bonita_packager_core::{DockerOptions, PackageOptions, RegistryLogin};
use colored::Colorize;

/// CLI引数から Docker パイプラインの設定を組み立てる
///
/// パスワードだけが指定された場合は無視する。
pub fn options(
    tag: String,
    base_image: Option<String>,
    registry_username: Option<String>,
    registry_password: Option<String>,
) -> DockerOptions {
    let registry_login = registry_username
        .filter(|username| !username.is_empty())
        .map(|username| RegistryLogin {
            username,
            password: registry_password.filter(|password| !password.is_empty()),
        });

    DockerOptions {
        tag,
        base_image: base_image.filter(|image| !image.is_empty()),
        registry_login,
        ..Default::default()
    }
}

/// `bonita package docker`
pub async fn handle(package: &PackageOptions, docker: &DockerOptions) -> anyhow::Result<()> {
    super::ensure_artifacts(package)?;

    println!(
        "{}",
        "Generating your Custom Application Bonita Docker 🐳 Image...".blue()
    );
    tracing::debug!(
        build_timeout = ?docker.build_timeout,
        pull_timeout = ?docker.pull_timeout,
        "Using docker timeouts"
    );

    let client = crate::docker::init_docker_with_error_handling().await?;
    let orchestrator = ImageBuildOrchestrator::new(DockerDaemon::new(client));
    let tag = orchestrator.run(package, docker).await?;

    println!();
    println!(
        "{} '{}'",
        "Successfully created Docker image".green().bold(),
        tag.cyan()
    );
    println!();
    println!("To use it, run appropriate command:");
    println!(
        "- Community release    : docker run --name my-bonita-app -d -p 8080:8080 {}",
        tag
    );
    println!(
        "- Subscription release : docker run --name my-bonita-app -h <hostname> -v <license-folder>:/opt/bonita_lic/ -d -p 8080:8080 {}",
        tag
    );
    println!(
        "Read https://documentation.bonitasoft.com/bonita/latest/runtime/bonita-docker-installation for complete options on how to run a Bonita-based Docker container."
    );
    super::print_final_note(
        "ensure to set the environment variable 'INSTALL_PROVIDED_PAGES=true' when running container",
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_options_defaults() {
        let options = options("my-bonita-application:latest".to_string(), None, None, None);
        assert_eq!(options.tag, "my-bonita-application:latest");
        assert!(options.base_image.is_none());
        assert!(options.registry_login.is_none());
    }

    #[test]
    fn test_options_username_without_password() {
        let options = options(
            "acme/app:1.0".to_string(),
            Some("quay.io/bonitasoft/bonita:2023.1".to_string()),
            Some("walter".to_string()),
            None,
        );
        let login = options.registry_login.unwrap();
        assert_eq!(login.username, "walter");
        assert!(login.password.is_none());
    }

    #[test]
    fn test_options_password_without_username_is_ignored() {
        let options = options(
            "acme/app:1.0".to_string(),
            None,
            None,
            Some("secret".to_string()),
        );
        assert!(options.registry_login.is_none());
    }
}
