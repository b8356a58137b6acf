use bonita_packager_core::{
    LocateError, PackageOptions, TomcatOptions, TomcatOutcome, TomcatPackager,
};
use colored::Colorize;
use std::path::PathBuf;

/// `bonita package tomcat`
///
/// バンドルが見つからなかった場合は案内を表示して `Ok(false)` を返す。
pub fn handle(package: &PackageOptions, bundle: Option<PathBuf>) -> anyhow::Result<bool> {
    super::ensure_artifacts(package)?;

    let mut tomcat = TomcatOptions::new(std::env::current_dir()?);
    if let Some(bundle) = bundle {
        tomcat = tomcat.with_bundle(bundle);
    }

    println!(
        "{}",
        "Generating your Custom Application Bonita Tomcat 😺 Bundle...".blue()
    );

    let outcome = TomcatPackager::new(package, &tomcat)
        .run_with_progress(|stage| println!("  {} {}", "✓".green(), stage.description()))?;

    let archive = match outcome {
        TomcatOutcome::Packaged(archive) => archive,
        TomcatOutcome::BundleNotResolved(reason) => {
            print_bundle_guidance(&reason);
            return Ok(false);
        }
    };

    let relative = archive
        .strip_prefix(&tomcat.work_dir)
        .unwrap_or(&archive)
        .display()
        .to_string();

    println!();
    println!(
        "{} {}",
        "Successfully re-packaged self-contained application:".green().bold(),
        relative.cyan()
    );
    println!();
    println!(
        "To use it, simply unzip it like your usual Bonita Tomcat bundle, and run ./start-bonita[.sh|.bat]"
    );
    println!("More info at https://documentation.bonitasoft.com/bonita/latest/runtime/tomcat-bundle");
    super::print_final_note(
        "ensure to set the Bonita runtime property 'bonita.runtime.custom-application.install-provided-pages=true' in bundle configuration",
    );

    Ok(true)
}

fn print_bundle_guidance(reason: &LocateError) {
    eprintln!("{}", reason.to_string().yellow());
    if matches!(reason, LocateError::NotFound(_)) {
        eprintln!(
            "Please copy it here (Eg. BonitaCommunity-2023.1-u0.zip, BonitaSubscription-2023.1-u2.zip)"
        );
        eprintln!(
            "or use parameter --bonita-tomcat-bundle <PATH_TO_TOMCAT_BUNDLE> if stored somewhere else."
        );
        eprintln!("Then re-run this program");
    }
}
