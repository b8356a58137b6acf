//! ビルドコンテキストの組み立て
//!
//! 一時ディレクトリにアプリケーション、設定ファイル、埋め込みDockerfileを
//! 配置し、デーモンに送る tar.gz に変換します。

use crate::error::{BuildError, BuildResult};
use bonita_packager_core::{PackageOptions, copy_artifact};
use flate2::Compression;
use flate2::write::GzEncoder;
use std::path::Path;
use tar::Builder;
use tempfile::TempDir;

/// バイナリに埋め込まれたDockerfile
pub const DOCKERFILE: &str = include_str!("../resources/Dockerfile");

pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// アプリケーションと設定ファイルを置くディレクトリ
pub const RESOURCES_DIR: &str = "resources";

/// 組み立て済みのビルドコンテキスト
///
/// 一時ディレクトリはこの値がドロップされた時点で削除されます。
#[derive(Debug)]
pub struct BuildContext {
    dir: TempDir,
    archive: Vec<u8>,
}

impl BuildContext {
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// デーモンに送る tar.gz
    pub fn archive(&self) -> &[u8] {
        &self.archive
    }

    /// アーカイブを取り出す（ディレクトリは保持されたまま）
    pub fn take_archive(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.archive)
    }
}

pub struct ContextBuilder;

impl ContextBuilder {
    /// ビルドコンテキストを作成
    ///
    /// コンテキストに含まれるのは `Dockerfile` と `resources/` 配下の
    /// アプリケーション（と設定ファイル）のみ。
    pub fn assemble(package: &PackageOptions) -> BuildResult<BuildContext> {
        // 同時実行でも衝突しないランダムな名前
        let dir = tempfile::Builder::new().prefix("docker-context").tempdir()?;
        tracing::debug!("Creating build context in: {}", dir.path().display());

        let resources = dir.path().join(RESOURCES_DIR);
        for artifact in package.artifacts() {
            let copied = copy_artifact(artifact, &resources)?;
            tracing::debug!("Added to build context: {}", copied.display());
        }

        std::fs::write(dir.path().join(DOCKERFILE_NAME), DOCKERFILE)?;

        // tar 化には絶対パスが必要なプラットフォームがある
        let absolute = dir.path().canonicalize()?;
        let archive = Self::create_context(&absolute)?;

        Ok(BuildContext { dir, archive })
    }

    /// ディレクトリをtar.gzアーカイブとして作成
    pub fn create_context(context_path: &Path) -> BuildResult<Vec<u8>> {
        let mut archive_data = Vec::new();
        {
            let encoder = GzEncoder::new(&mut archive_data, Compression::default());
            let mut tar = Builder::new(encoder);

            tar.append_dir_all(".", context_path)
                .map_err(BuildError::Io)?;

            let encoder = tar.into_inner().map_err(BuildError::Io)?;
            encoder.finish().map_err(BuildError::Io)?;
        }

        tracing::debug!("Build context created: {} bytes", archive_data.len());

        Self::check_context_size(archive_data.len());

        Ok(archive_data)
    }

    /// コンテキストサイズのチェックと警告
    fn check_context_size(size: usize) {
        const MAX_CONTEXT_SIZE: usize = 500 * 1024 * 1024; // 500MB

        if size > MAX_CONTEXT_SIZE {
            tracing::warn!(
                "Build context is large ({}MB), check the size of your application archive",
                size / 1024 / 1024
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::fs;
    use tempfile::tempdir;

    fn unpack_names(archive: &[u8]) -> BTreeSet<String> {
        let decoder = flate2::read::GzDecoder::new(archive);
        let mut tar = tar::Archive::new(decoder);
        tar.entries()
            .unwrap()
            .map(|e| {
                let e = e.unwrap();
                let path = e.path().unwrap().to_string_lossy().into_owned();
                path.trim_start_matches("./").trim_end_matches('/').to_string()
            })
            .filter(|p| !p.is_empty() && p != ".")
            .collect()
    }

    #[test]
    fn test_assemble_context_manifest() {
        let src = tempdir().unwrap();
        fs::create_dir_all(src.path().join("some/deep/path")).unwrap();
        let app = src.path().join("some/deep/path/my-app.zip");
        let conf = src.path().join("prod.bconf");
        fs::write(&app, "app").unwrap();
        fs::write(&conf, "conf").unwrap();

        let package = PackageOptions::new(&app).with_configuration(&conf);
        let context = ContextBuilder::assemble(&package).unwrap();

        let names = unpack_names(context.archive());
        let expected: BTreeSet<String> = [
            "Dockerfile",
            "resources",
            "resources/my-app.zip",
            "resources/prod.bconf",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(names, expected);

        assert_eq!(
            fs::read_to_string(context.path().join("Dockerfile")).unwrap(),
            DOCKERFILE
        );
    }

    #[test]
    fn test_assemble_without_configuration() {
        let src = tempdir().unwrap();
        let app = src.path().join("my-app.zip");
        fs::write(&app, "app").unwrap();

        let context = ContextBuilder::assemble(&PackageOptions::new(&app)).unwrap();
        let names = unpack_names(context.archive());
        assert!(names.contains("resources/my-app.zip"));
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn test_context_dir_removed_on_drop() {
        let src = tempdir().unwrap();
        let app = src.path().join("my-app.zip");
        fs::write(&app, "app").unwrap();

        let context = ContextBuilder::assemble(&PackageOptions::new(&app)).unwrap();
        let path = context.path().to_path_buf();
        assert!(path.exists());
        assert!(
            path.file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("docker-context")
        );

        drop(context);
        assert!(!path.exists());
    }

    #[test]
    fn test_assemble_missing_application() {
        let src = tempdir().unwrap();
        let result = ContextBuilder::assemble(&PackageOptions::new(src.path().join("nope.zip")));
        assert!(matches!(result, Err(BuildError::Packager(_))));
    }

    #[test]
    fn test_embedded_dockerfile_uses_base_image_arg() {
        assert!(DOCKERFILE.contains("ARG BONITA_BASE_IMAGE"));
        assert!(DOCKERFILE.contains("FROM ${BONITA_BASE_IMAGE}"));
    }
}
