use colored::Colorize;

fn print_connection_hints(cause: &dyn std::fmt::Display) {
    eprintln!();
    eprintln!("{}", "✗ Docker connection error".red().bold());
    eprintln!();
    eprintln!("{}", "Cause:".yellow());
    eprintln!("  {}", cause);
    eprintln!();
    eprintln!("{}", "How to fix:".yellow());
    eprintln!("  • Make sure Docker is running");
    eprintln!("  • Check the DOCKER_HOST environment variable if you use a remote daemon");
    eprintln!("  • Make sure the 'docker ps' command works");
}

/// Dockerデーモンに接続し、pingで疎通を確認する
pub async fn init_docker_with_error_handling() -> anyhow::Result<bollard::Docker> {
    let docker = match bollard::Docker::connect_with_local_defaults() {
        Ok(docker) => docker,
        Err(e) => {
            print_connection_hints(&e);
            return Err(anyhow::anyhow!("Failed to connect to Docker"));
        }
    };

    match docker.ping().await {
        Ok(_) => {
            tracing::debug!("Connected to Docker daemon");
            Ok(docker)
        }
        Err(e) => {
            print_connection_hints(&e);
            Err(anyhow::anyhow!("Failed to connect to Docker"))
        }
    }
}
