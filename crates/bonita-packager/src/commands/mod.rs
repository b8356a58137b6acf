pub mod docker;
pub mod tomcat;

use bonita_packager_core::PackageOptions;
use colored::Colorize;

/// 入力ファイルの存在確認
///
/// Docker接続やバンドル展開の前に、指定ミスを分かりやすく報告する。
pub fn ensure_artifacts(package: &PackageOptions) -> anyhow::Result<()> {
    for artifact in package.artifacts() {
        if !artifact.exists() {
            anyhow::bail!("File not found: {}", artifact.display());
        }
    }
    Ok(())
}

/// 提供ページのインストールに関する注意
pub fn print_final_note(additional_note: &str) {
    println!();
    println!(
        "{} if your custom application is using pages from Bonita Admin or User applications, {} in order to install those pages, else, your application will fail at install.",
        "NOTE:".yellow().bold(),
        additional_note
    );
}
