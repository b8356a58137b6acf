//! イメージビルドのオーケストレーション
//!
//! 認証情報の解決 → ベースイメージのpull（任意）→ コンテキスト組み立て →
//! ビルド → 進捗ストリームの最終メッセージの検査、の順に実行します。

use crate::auth::{PasswordPrompt, RegistryAuth};
use crate::context::ContextBuilder;
use crate::daemon::{BuildMessage, BuildOptions, ImageDaemon, MessageStream, split_image_tag};
use crate::error::{BuildError, BuildResult};
use crate::progress::BuildProgress;
use bonita_packager_core::{DockerOptions, PackageOptions};
use colored::Colorize;
use futures_util::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tokio::runtime::{Handle, RuntimeFlavor};

/// ベースイメージの完全な参照を渡すビルド引数
pub const BASE_IMAGE_ARG: &str = "BONITA_BASE_IMAGE";

/// ベースイメージのタグ（ダイジェスト参照ではダイジェスト）を渡すビルド引数
pub const BASE_IMAGE_VERSION_ARG: &str = "BONITA_BASE_IMAGE_VERSION";

pub struct ImageBuildOrchestrator<D: ImageDaemon> {
    daemon: D,
    prompt: Box<PasswordPrompt<'static>>,
}

impl<D: ImageDaemon> ImageBuildOrchestrator<D> {
    /// 端末からパスワードを読み取るオーケストレーターを作成
    pub fn new(daemon: D) -> Self {
        Self {
            daemon,
            prompt: Box::new(crate::prompt::read_password),
        }
    }

    /// パスワード入力の方法を差し替える
    pub fn with_prompt(
        mut self,
        prompt: impl Fn(&str) -> std::io::Result<String> + Send + Sync + 'static,
    ) -> Self {
        self.prompt = Box::new(prompt);
        self
    }

    pub fn daemon(&self) -> &D {
        &self.daemon
    }

    /// イメージをビルドし、付与したタグを返す
    #[tracing::instrument(skip_all, fields(tag = %docker.tag))]
    pub async fn run(&self, package: &PackageOptions, docker: &DockerOptions) -> BuildResult<String> {
        let auth = self.resolve_auth(docker)?;

        if let Some(base_image) = &docker.base_image {
            self.pull(base_image, auth.as_ref(), docker.pull_timeout, package.verbose)
                .await?;
        }

        // コンテキストの一時ディレクトリはこの関数を抜けると削除される
        let mut context = ContextBuilder::assemble(package)?;

        let options = BuildOptions {
            tag: docker.tag.clone(),
            build_args: build_args(docker.base_image.as_deref()),
            registry_auth: auth.as_ref().map(RegistryAuth::auth_configs),
        };
        if !options.build_args.is_empty() {
            tracing::debug!("Build args: {:?}", options.build_args);
        }

        tracing::info!("Building image: {}", docker.tag);
        let stream = self.daemon.build_image(context.take_archive(), &options);

        let progress = (!package.verbose).then(|| BuildProgress::new(&docker.tag));
        let result = tokio::time::timeout(
            docker.build_timeout,
            drain(stream, |msg| relay_build_message(msg, progress.as_ref())),
        )
        .await
        .map_err(|_| BuildError::Timeout(docker.build_timeout))
        .and_then(|drained| drained)
        .and_then(|last| match last.as_ref().and_then(BuildMessage::failure) {
            Some(failure) => Err(BuildError::BuildFailed(failure.to_string())),
            None => Ok(()),
        });

        if let Some(progress) = &progress {
            match &result {
                Ok(()) => progress.finish_success(),
                Err(e) => progress.finish_error(&e.to_string()),
            }
        }
        result?;

        tracing::info!("Successfully built: {}", docker.tag);
        Ok(docker.tag.clone())
    }

    /// レジストリ認証情報を解決
    ///
    /// パスワード入力は端末を同期的に読むため、マルチスレッドランタイムでは
    /// `block_in_place` でワーカースレッドを明け渡してから呼び出します。
    fn resolve_auth(&self, docker: &DockerOptions) -> BuildResult<Option<RegistryAuth>> {
        let Some(login) = &docker.registry_login else {
            return Ok(None);
        };
        let resolve = || RegistryAuth::resolve(login, docker.base_image.as_deref(), &*self.prompt);

        let multi_thread = Handle::try_current()
            .is_ok_and(|handle| handle.runtime_flavor() == RuntimeFlavor::MultiThread);
        let auth = if multi_thread && login.password.is_none() {
            tokio::task::block_in_place(resolve)?
        } else {
            resolve()?
        };
        Ok(Some(auth))
    }

    /// ベースイメージをpull
    ///
    /// 失敗した場合はビルドを行わずに中断します。
    async fn pull(
        &self,
        image: &str,
        auth: Option<&RegistryAuth>,
        timeout: Duration,
        verbose: bool,
    ) -> BuildResult<()> {
        tracing::info!("Pulling base image: {}", image);

        let stream = self
            .daemon
            .pull_image(image, auth.map(|a| a.credentials().clone()));
        let last = tokio::time::timeout(
            timeout,
            drain(stream, |msg| {
                if verbose && let Some(status) = &msg.status {
                    println!("{}", status.cyan());
                }
            }),
        )
        .await
        .map_err(|_| BuildError::Timeout(timeout))?
        .map_err(|e| BuildError::PullFailed {
            image: image.to_string(),
            message: e.to_string(),
        })?;

        if let Some(failure) = last.as_ref().and_then(BuildMessage::failure) {
            return Err(BuildError::PullFailed {
                image: image.to_string(),
                message: failure.to_string(),
            });
        }

        tracing::debug!("Base image pulled: {}", image);
        Ok(())
    }
}

/// ストリームを最後まで読み、最終メッセージを返す
async fn drain(
    mut stream: MessageStream<'_>,
    mut on_message: impl FnMut(&BuildMessage),
) -> BuildResult<Option<BuildMessage>> {
    let mut last = None;
    while let Some(message) = stream.next().await {
        let message = message?;
        on_message(&message);
        last = Some(message);
    }
    Ok(last)
}

fn relay_build_message(message: &BuildMessage, progress: Option<&BuildProgress>) {
    let Some(text) = &message.stream else {
        return;
    };
    match progress {
        Some(progress) => progress.update(text),
        None => print!("{}", text),
    }
}

/// ベースイメージ指定時のビルド引数
pub fn build_args(base_image: Option<&str>) -> HashMap<String, String> {
    let mut args = HashMap::new();
    if let Some(image) = base_image {
        let (_, version) = split_image_tag(image);
        args.insert(BASE_IMAGE_ARG.to_string(), image.to_string());
        args.insert(BASE_IMAGE_VERSION_ARG.to_string(), version.to_string());
    }
    args
}
