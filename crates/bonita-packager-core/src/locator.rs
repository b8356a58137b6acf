//! Tomcatバンドルの特定
//!
//! 明示的に指定されたパス、または作業ディレクトリ内の `Bonita*.zip` から
//! 処理対象のバンドルを一つ決定します。

use crate::config::TomcatOptions;
use crate::error::LocateError;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 作業ディレクトリで探すバンドルのファイル名パターン
pub const BUNDLE_PATTERN: &str = "Bonita*.zip";

const BUNDLE_EXTENSION: &str = ".zip";

/// 処理対象のバンドルを決定
///
/// 検索順序:
/// 1. 明示的な指定（存在し、`.zip` で終わること）
/// 2. 作業ディレクトリ内の `Bonita*.zip`（複数ある場合は glob 順で最初のもの）
#[tracing::instrument(skip_all, fields(work_dir = %options.work_dir.display()))]
pub fn locate_bundle(options: &TomcatOptions) -> Result<PathBuf, LocateError> {
    if let Some(bundle) = &options.bundle {
        let path = options.work_dir.join(bundle);
        if !path.exists() {
            return Err(LocateError::BundleMissing(bundle.clone()));
        }
        if !has_bundle_extension(&path) {
            return Err(LocateError::NotAnArchive(bundle.clone()));
        }
        debug!(bundle = %path.display(), "Using Bonita Tomcat bundle file passed as parameter");
        return Ok(path);
    }

    let pattern = format!(
        "{}/{}",
        glob::Pattern::escape(&options.work_dir.to_string_lossy()),
        BUNDLE_PATTERN
    );
    let mut matches = glob::glob(&pattern)
        .map_err(|e| LocateError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?
        .filter_map(|entry| entry.ok())
        .filter(|path| path.is_file());

    match matches.next() {
        Some(path) => {
            info!(bundle = %path.display(), "Using Bonita Tomcat bundle file found in folder");
            Ok(path)
        }
        None => Err(LocateError::NotFound(options.work_dir.clone())),
    }
}

/// バンドルのファイル名から `.zip` を除いた名前
///
/// 出力ファイル名 `<bundle-name>-application.zip` に使用します。
pub fn bundle_name(bundle: &Path) -> Option<String> {
    let file_name = bundle.file_name()?.to_str()?;
    file_name
        .strip_suffix(BUNDLE_EXTENSION)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
}

fn has_bundle_extension(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.ends_with(BUNDLE_EXTENSION))
}
