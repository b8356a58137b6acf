//! アプリケーション成果物のコピー

use crate::error::{PackagerError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// `artifact` を `target_dir` 直下へベース名でコピー
///
/// 元のパスのディレクトリ構造は引き継ぎません。ディレクトリの場合は
/// 中身ごと再帰的にコピーします。中のシンボリックリンクと特殊ファイルは
/// コピーしません。コピー先のパスを返します。
pub fn copy_artifact(artifact: &Path, target_dir: &Path) -> Result<PathBuf> {
    let file_name = artifact
        .file_name()
        .filter(|_| artifact.exists())
        .ok_or_else(|| PackagerError::ArtifactNotFound(artifact.to_path_buf()))?;

    fs::create_dir_all(target_dir).map_err(|e| PackagerError::io(target_dir, e))?;
    let destination = target_dir.join(file_name);

    if artifact.is_dir() {
        copy_tree(artifact, &destination)?;
    } else {
        fs::copy(artifact, &destination).map_err(|e| PackagerError::io(artifact, e))?;
    }
    Ok(destination)
}

fn copy_tree(source: &Path, destination: &Path) -> Result<()> {
    fs::create_dir_all(destination).map_err(|e| PackagerError::io(destination, e))?;

    let walker = WalkDir::new(source)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(source).to_path_buf();
            PackagerError::io(path, io::Error::from(e))
        })?;
        let path = entry.path();
        let target = destination.join(path.strip_prefix(source).unwrap_or(path));

        let file_type = entry.file_type();
        if file_type.is_dir() {
            fs::create_dir_all(&target).map_err(|e| PackagerError::io(&target, e))?;
        } else if file_type.is_file() {
            fs::copy(path, &target).map_err(|e| PackagerError::io(path, e))?;
        } else {
            tracing::debug!(path = %path.display(), "Skipping symlink or special file");
        }
    }
    Ok(())
}
