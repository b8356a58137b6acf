mod commands;
mod docker;

use bonita_packager_build::BuildError;
use bonita_packager_core::DEFAULT_IMAGE_TAG;
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "bonita")]
#[command(version)]
#[command(about = "Bonita CLI", long_about = None)]
#[command(
    after_help = "Examples:\n  $ bonita package tomcat /path/to/my-application.zip\n  $ bonita package docker /path/to/my-application.zip"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Package 📦 your Custom Application with Bonita
    #[command(subcommand)]
    Package(PackageCommands),
    /// Print bonita cli version
    Version,
    /// Deploy Bonita artifacts on a running server
    #[command(hide = true)]
    Deploy,
}

#[derive(Subcommand)]
enum PackageCommands {
    /// Package your Custom Application within a Bonita Tomcat 😺 Bundle
    Tomcat {
        #[command(flatten)]
        common: CommonArgs,
        /// Path to the Bonita Tomcat bundle file (Bonita*.zip).
        /// If not passed, looking for a Bonita Tomcat bundle in current folder
        #[arg(short = 'b', long = "bonita-tomcat-bundle", value_name = "PATH_TO_TOMCAT_BUNDLE")]
        bundle: Option<PathBuf>,
    },
    /// Package your Custom Application inside a Bonita Docker 🐳 Image
    Docker {
        #[command(flatten)]
        common: CommonArgs,
        /// Docker image tag to use when building
        #[arg(short = 't', long, default_value = DEFAULT_IMAGE_TAG)]
        tag: String,
        /// Bonita base docker image to build from (the recipe defaults to 'bonita:latest')
        #[arg(short = 'i', long = "bonita-base-image")]
        base_image: Option<String>,
        /// Username to authenticate against the Bonita base docker image registry
        #[arg(short = 'u', long = "registry-username", env = "BONITA_REGISTRY_USERNAME")]
        registry_username: Option<String>,
        /// Password to authenticate against the Bonita base docker image registry.
        /// Prompted interactively if --registry-username is given without it
        #[arg(
            short = 'p',
            long = "registry-password",
            env = "BONITA_REGISTRY_PASSWORD",
            hide_env_values = true
        )]
        registry_password: Option<String>,
    },
}

#[derive(Args)]
struct CommonArgs {
    /// Path to your custom application (ZIP file or folder)
    #[arg(value_name = "PATH_TO_YOUR_APPLICATION")]
    application: PathBuf,
    /// (Optional) Bonita configuration file (.bconf) associated to your custom application (Subscription only)
    #[arg(short = 'c', long = "configuration-file")]
    configuration_file: Option<PathBuf>,
    /// More verbose information output
    #[arg(short, long)]
    verbose: bool,
}

/// ログ出力の初期化（stderr）
///
/// `--verbose` で debug、それ以外は warn。RUST_LOG が優先されます。
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Package(PackageCommands::Tomcat { common, .. })
        | Commands::Package(PackageCommands::Docker { common, .. }) => common.verbose,
        _ => false,
    };
    init_tracing(verbose);

    match run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            let message = match e.downcast_ref::<BuildError>() {
                Some(build_error) => build_error.user_message(),
                None => format!("{:#}", e),
            };
            eprintln!("{} {}", "Error:".red().bold(), message);
            std::process::exit(1);
        }
    }
}

/// コマンドディスパッチ
///
/// 利用者への案内だけで終わった場合（バンドル未検出など）は `Ok(false)`。
async fn run(cli: Cli) -> anyhow::Result<bool> {
    match cli.command {
        Commands::Version => {
            println!("Bonita CLI {}", env!("CARGO_PKG_VERSION"));
            Ok(true)
        }
        Commands::Deploy => {
            println!("Not implemented yet. Sorry.");
            Ok(true)
        }
        Commands::Package(PackageCommands::Tomcat { common, bundle }) => {
            let package = common.into_options();
            commands::tomcat::handle(&package, bundle)
        }
        Commands::Package(PackageCommands::Docker {
            common,
            tag,
            base_image,
            registry_username,
            registry_password,
        }) => {
            let package = common.into_options();
            let docker = commands::docker::options(
                tag,
                base_image,
                registry_username,
                registry_password,
            );
            commands::docker::handle(&package, &docker).await?;
            Ok(true)
        }
    }
}

impl CommonArgs {
    fn into_options(self) -> bonita_packager_core::PackageOptions {
        let options = bonita_packager_core::PackageOptions::new(self.application)
            .with_verbose(self.verbose);
        match self.configuration_file {
            Some(conf) => options.with_configuration(conf),
            None => options,
        }
    }
}
