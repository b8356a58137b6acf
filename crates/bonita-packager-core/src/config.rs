//! パッケージング設定
//!
//! CLI引数から一度だけ構築され、各コンポーネントへ参照で渡されます。
//! 構築後に変更されることはありません。

use std::path::{Path, PathBuf};
use std::time::Duration;

/// デフォルトのイメージタグ
pub const DEFAULT_IMAGE_TAG: &str = "my-bonita-application:latest";

/// イメージビルドのデフォルトタイムアウト
pub const DEFAULT_BUILD_TIMEOUT: Duration = Duration::from_secs(5 * 60);

/// ベースイメージpullのデフォルトタイムアウト
pub const DEFAULT_PULL_TIMEOUT: Duration = Duration::from_secs(200);

/// 両パイプライン共通の設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageOptions {
    /// カスタムアプリケーション（ZIPファイルまたはディレクトリ）
    pub application: PathBuf,
    /// Bonita設定ファイル (.bconf)
    pub configuration: Option<PathBuf>,
    /// 詳細出力
    pub verbose: bool,
}

impl PackageOptions {
    pub fn new(application: impl Into<PathBuf>) -> Self {
        Self {
            application: application.into(),
            configuration: None,
            verbose: false,
        }
    }

    pub fn with_configuration(mut self, configuration: impl Into<PathBuf>) -> Self {
        self.configuration = Some(configuration.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// 注入するファイル（アプリケーション、設定ファイルの順）
    pub fn artifacts(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.application.as_path()).chain(self.configuration.as_deref())
    }
}

/// Tomcatバンドルパイプラインの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TomcatOptions {
    /// 明示的に指定されたバンドル
    pub bundle: Option<PathBuf>,
    /// バンドルを探し、`output/` を作成するディレクトリ
    pub work_dir: PathBuf,
}

impl TomcatOptions {
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            bundle: None,
            work_dir: work_dir.into(),
        }
    }

    pub fn with_bundle(mut self, bundle: impl Into<PathBuf>) -> Self {
        self.bundle = Some(bundle.into());
        self
    }

    pub fn output_dir(&self) -> PathBuf {
        self.work_dir.join("output")
    }
}

/// レジストリのログイン情報
///
/// パスワードが未指定の場合はビルド時に端末から入力を求めます。
#[derive(Clone, PartialEq, Eq)]
pub struct RegistryLogin {
    pub username: String,
    pub password: Option<String>,
}

impl std::fmt::Debug for RegistryLogin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryLogin")
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "********"))
            .finish()
    }
}

/// Dockerイメージパイプラインの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DockerOptions {
    /// ビルドするイメージのタグ
    pub tag: String,
    /// ベースイメージ（指定時はビルド前にpullする）
    pub base_image: Option<String>,
    pub registry_login: Option<RegistryLogin>,
    pub build_timeout: Duration,
    pub pull_timeout: Duration,
}

impl Default for DockerOptions {
    fn default() -> Self {
        Self {
            tag: DEFAULT_IMAGE_TAG.to_string(),
            base_image: None,
            registry_login: None,
            build_timeout: DEFAULT_BUILD_TIMEOUT,
            pull_timeout: DEFAULT_PULL_TIMEOUT,
        }
    }
}
