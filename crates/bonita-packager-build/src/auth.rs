//! レジストリ認証処理
//!
//! CLIで指定されたログイン情報を Bollard の DockerCredentials に変換します。
//! パスワードが未指定の場合は端末から入力を求めます。

use crate::error::{BuildError, BuildResult};
use bollard::auth::DockerCredentials;
use bonita_packager_core::RegistryLogin;
use std::collections::HashMap;

/// レジストリが判別できない場合の既定値
pub const DEFAULT_REGISTRY: &str = "docker.io";

/// パスワード入力を求める関数（プロンプト文字列 -> 入力値）
pub type PasswordPrompt<'a> = dyn Fn(&str) -> std::io::Result<String> + Send + Sync + 'a;

/// イメージ参照からレジストリ名を取得
///
/// 最初の `/` より前の部分をレジストリとみなします。`/` がなければ
/// [`DEFAULT_REGISTRY`]。`library/bonita` のような名前空間も
/// レジストリと判定される簡易的な規則です。
///
/// # Examples
/// - `quay.io/bonitasoft/bonita:7.15` -> `quay.io`
/// - `bonita:2023.1` -> `docker.io`
pub fn registry_name(image: &str) -> &str {
    match image.split_once('/') {
        Some((registry, _)) if !registry.is_empty() => registry,
        _ => DEFAULT_REGISTRY,
    }
}

/// 解決済みのレジストリ認証情報
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    registry: String,
    credentials: DockerCredentials,
}

impl RegistryAuth {
    /// ログイン情報を解決
    ///
    /// パスワードがなければ `prompt` で入力を求めます。
    pub fn resolve(
        login: &RegistryLogin,
        base_image: Option<&str>,
        prompt: &PasswordPrompt<'_>,
    ) -> BuildResult<Self> {
        let registry = base_image
            .map(registry_name)
            .unwrap_or(DEFAULT_REGISTRY)
            .to_string();

        let password = match &login.password {
            Some(password) => password.clone(),
            None => {
                tracing::debug!(registry = %registry, "No registry password given, prompting");
                prompt(&format!("Password for {}@{}: ", login.username, registry)).map_err(
                    |e| BuildError::AuthFailed {
                        registry: registry.clone(),
                        message: format!("Failed to read password: {}", e),
                    },
                )?
            }
        };

        tracing::debug!(registry = %registry, username = %login.username, "Authenticating to registry");

        let credentials = DockerCredentials {
            username: Some(login.username.clone()),
            password: Some(password),
            serveraddress: Some(registry.clone()),
            ..Default::default()
        };

        Ok(Self {
            registry,
            credentials,
        })
    }

    pub fn registry(&self) -> &str {
        &self.registry
    }

    pub fn credentials(&self) -> &DockerCredentials {
        &self.credentials
    }

    /// ビルド要求用のレジストリ別認証設定
    pub fn auth_configs(&self) -> HashMap<String, DockerCredentials> {
        HashMap::from([(self.registry.clone(), self.credentials.clone())])
    }
}
