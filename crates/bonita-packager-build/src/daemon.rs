//! イメージビルドデーモンの抽象化
//!
//! オーケストレーターは [`ImageDaemon`] トレイトだけに依存します。
//! 本番では bollard 経由でローカルのDockerデーモンと通信する
//! [`DockerDaemon`] を使い、テストではメモリ上の偽デーモンを使います。

use crate::error::{BuildError, BuildResult};
use bollard::Docker;
use bollard::auth::DockerCredentials;
use bytes::Bytes;
use futures_util::stream::{BoxStream, StreamExt};
use http_body_util::{Either, Full};
use serde::Deserialize;
use std::collections::HashMap;

/// デーモンが返す進捗メッセージ
///
/// Docker Engine API の JSON 行 `{stream?, error?, errorDetail?: {message}}` と同じ形。
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildMessage {
    #[serde(default)]
    pub stream: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default, rename = "errorDetail")]
    pub error_detail: Option<ErrorDetail>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub message: Option<String>,
}

impl BuildMessage {
    /// JSON 1行からメッセージを読み取る
    pub fn from_json(line: &str) -> BuildResult<Self> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn stream(text: impl Into<String>) -> Self {
        Self {
            stream: Some(text.into()),
            ..Default::default()
        }
    }

    /// メッセージに埋め込まれたエラー
    ///
    /// `error` が空でなければそれを、なければ `errorDetail.message` を返します。
    pub fn failure(&self) -> Option<&str> {
        self.error
            .as_deref()
            .filter(|e| !e.is_empty())
            .or_else(|| {
                self.error_detail
                    .as_ref()
                    .and_then(|d| d.message.as_deref())
                    .filter(|m| !m.is_empty())
            })
    }
}

impl From<bollard::models::BuildInfo> for BuildMessage {
    fn from(info: bollard::models::BuildInfo) -> Self {
        Self {
            stream: info.stream,
            status: info.status,
            error: info.error,
            error_detail: info.error_detail.map(|d| ErrorDetail { message: d.message }),
        }
    }
}

impl From<bollard::models::CreateImageInfo> for BuildMessage {
    fn from(info: bollard::models::CreateImageInfo) -> Self {
        Self {
            stream: None,
            status: info.status,
            error: info.error,
            error_detail: info.error_detail.map(|d| ErrorDetail { message: d.message }),
        }
    }
}

pub type MessageStream<'a> = BoxStream<'a, BuildResult<BuildMessage>>;

/// ビルド要求のオプション
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    pub tag: String,
    pub build_args: HashMap<String, String>,
    /// レジストリ名 -> 認証情報
    pub registry_auth: Option<HashMap<String, DockerCredentials>>,
}

/// イメージのpullとビルドを行うデーモン
pub trait ImageDaemon: Send + Sync {
    /// `image` をpullし、進捗メッセージのストリームを返す
    fn pull_image<'a>(
        &'a self,
        image: &str,
        credentials: Option<DockerCredentials>,
    ) -> MessageStream<'a>;

    /// tar.gz のビルドコンテキストからイメージをビルドする
    fn build_image<'a>(&'a self, context: Vec<u8>, options: &BuildOptions) -> MessageStream<'a>;
}

/// bollard によるDockerデーモン実装
pub struct DockerDaemon {
    docker: Docker,
}

impl DockerDaemon {
    pub fn new(docker: Docker) -> Self {
        Self { docker }
    }
}

/// ストリーム内で報告されたエラーはメッセージとして扱う
fn relay<T: Into<BuildMessage>>(
    item: Result<T, bollard::errors::Error>,
) -> BuildResult<BuildMessage> {
    match item {
        Ok(info) => Ok(info.into()),
        Err(bollard::errors::Error::DockerStreamError { error }) => Ok(BuildMessage {
            error: Some(error),
            ..Default::default()
        }),
        Err(e) => Err(BuildError::DockerConnection(e)),
    }
}

impl ImageDaemon for DockerDaemon {
    fn pull_image<'a>(
        &'a self,
        image: &str,
        credentials: Option<DockerCredentials>,
    ) -> MessageStream<'a> {
        let (name, tag) = pull_reference(image);

        #[allow(deprecated)]
        let options = bollard::image::CreateImageOptions {
            from_image: name.to_string(),
            tag: tag.to_string(),
            ..Default::default()
        };

        #[allow(deprecated)]
        let stream = self.docker.create_image(Some(options), None, credentials);
        stream.map(relay).boxed()
    }

    fn build_image<'a>(&'a self, context: Vec<u8>, options: &BuildOptions) -> MessageStream<'a> {
        #[allow(deprecated)]
        let build_options = bollard::image::BuildImageOptions {
            dockerfile: crate::context::DOCKERFILE_NAME.to_string(),
            t: options.tag.clone(),
            buildargs: options.build_args.clone(),
            rm: true,
            forcerm: true,
            ..Default::default()
        };

        let body = Full::new(Bytes::from(context));
        let stream = self.docker.build_image(
            build_options,
            options.registry_auth.clone(),
            Some(Either::Left(body)),
        );
        stream.map(relay).boxed()
    }
}

/// イメージ参照を名前とタグに分割
///
/// レジストリのポート (`localhost:5000/app`) はタグとみなしません。
/// ダイジェスト参照 (`name@sha256:...`) ではダイジェストをタグの代わりに返します。
///
/// 例: "bonita:2023.1" -> ("bonita", "2023.1")
///     "localhost:5000/bonita" -> ("localhost:5000/bonita", "latest")
///     "bonita@sha256:0123abcd" -> ("bonita", "sha256:0123abcd")
pub fn split_image_tag(image: &str) -> (&str, &str) {
    if let Some((name, digest)) = image.split_once('@') {
        return (split_tag(name).0, digest);
    }
    split_tag(image)
}

fn split_tag(image: &str) -> (&str, &str) {
    match image.rsplit_once(':') {
        Some((name, tag)) if !tag.contains('/') => (name, tag),
        _ => (image, "latest"),
    }
}

/// pull 要求の `fromImage` と `tag`
///
/// ダイジェスト参照は分割せずそのまま `fromImage` に渡し、タグは空にする。
pub fn pull_reference(image: &str) -> (&str, &str) {
    if image.contains('@') {
        (image, "")
    } else {
        split_tag(image)
    }
}
