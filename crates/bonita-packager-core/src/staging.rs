//! 一時作業ディレクトリ
//!
//! パイプラインが所有するディレクトリを、成功・失敗に関わらず
//! スコープ終了時に削除します。

use std::io;
use std::path::{Path, PathBuf};

/// スコープを抜けると削除されるディレクトリ
///
/// `tempfile::TempDir` と同じ考え方で、場所が固定されている
/// ディレクトリ（`output/` 配下など）に使います。
#[derive(Debug)]
pub struct StagingDir {
    path: PathBuf,
    armed: bool,
}

impl StagingDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 削除してエラーを返す（Drop ではエラーを握りつぶすため）
    pub fn close(mut self) -> io::Result<()> {
        self.armed = false;
        remove_if_exists(&self.path)
    }

    /// 削除せずに残す
    pub fn persist(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for StagingDir {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(e) = remove_if_exists(&self.path) {
            tracing::warn!(path = %self.path.display(), error = %e, "Failed to clean staging directory");
        } else {
            tracing::debug!(path = %self.path.display(), "Staging directory removed");
        }
    }
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match std::fs::remove_dir_all(path) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_removed_on_drop() {
        let dir = tempdir().unwrap();
        let staging_path = dir.path().join("staging");
        fs::create_dir_all(staging_path.join("nested")).unwrap();
        fs::write(staging_path.join("nested/file"), "x").unwrap();

        {
            let _staging = StagingDir::new(&staging_path);
        }
        assert!(!staging_path.exists());
    }

    #[test]
    fn test_removed_on_error_path() {
        fn failing_step(staging: &Path) -> std::result::Result<(), String> {
            let _guard = StagingDir::new(staging);
            fs::create_dir_all(staging).map_err(|e| e.to_string())?;
            Err("step failed".to_string())
        }

        let dir = tempdir().unwrap();
        let staging_path = dir.path().join("staging");
        assert!(failing_step(&staging_path).is_err());
        assert!(!staging_path.exists());
    }

    #[test]
    fn test_persist_keeps_directory() {
        let dir = tempdir().unwrap();
        let staging_path = dir.path().join("keep");
        fs::create_dir_all(&staging_path).unwrap();

        let kept = StagingDir::new(&staging_path).persist();
        assert_eq!(kept, staging_path);
        assert!(staging_path.exists());
    }

    #[test]
    fn test_close_missing_directory_is_ok() {
        let dir = tempdir().unwrap();
        let staging = StagingDir::new(dir.path().join("never-created"));
        assert!(staging.close().is_ok());
    }
}
