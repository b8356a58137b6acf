use bollard::auth::DockerCredentials;
use bonita_packager_build::{
    BuildError, BuildMessage, BuildOptions, ImageBuildOrchestrator, ImageDaemon, MessageStream,
};
use bonita_packager_core::{DockerOptions, PackageOptions, RegistryLogin};
use futures_util::stream::{self, StreamExt};
use std::collections::BTreeSet;
use std::fs;
use std::sync::Mutex;
use std::time::Duration;
use tempfile::{TempDir, tempdir};

/// JSON 行を返すだけのメモリ上のデーモン
#[derive(Default)]
struct FakeDaemon {
    pull_lines: Vec<&'static str>,
    build_lines: Vec<&'static str>,
    hang_on_build: bool,
    pulls: Mutex<Vec<(String, Option<DockerCredentials>)>>,
    builds: Mutex<Vec<(Vec<u8>, BuildOptions)>>,
}

impl FakeDaemon {
    fn building(lines: &[&'static str]) -> Self {
        Self {
            build_lines: lines.to_vec(),
            ..Default::default()
        }
    }

    fn messages(lines: &[&'static str]) -> MessageStream<'static> {
        let messages: Vec<_> = lines.iter().map(|l| BuildMessage::from_json(l)).collect();
        stream::iter(messages).boxed()
    }
}

impl ImageDaemon for FakeDaemon {
    fn pull_image<'a>(
        &'a self,
        image: &str,
        credentials: Option<DockerCredentials>,
    ) -> MessageStream<'a> {
        self.pulls
            .lock()
            .unwrap()
            .push((image.to_string(), credentials));
        Self::messages(&self.pull_lines)
    }

    fn build_image<'a>(&'a self, context: Vec<u8>, options: &BuildOptions) -> MessageStream<'a> {
        self.builds.lock().unwrap().push((context, options.clone()));
        if self.hang_on_build {
            return stream::pending().boxed();
        }
        Self::messages(&self.build_lines)
    }
}

const SUCCESSFUL_BUILD: &[&str] = &[
    r#"{"stream":"Step 1/4 : ARG BONITA_BASE_IMAGE=bonita:latest\n"}"#,
    r#"{"stream":"Step 4/4 : COPY --chown=bonita:bonita resources/ /opt/custom-init.d/my-application/\n"}"#,
    r#"{"stream":"Successfully built 0123456789ab\n"}"#,
    r#"{"stream":"Successfully tagged my-bonita-application:latest\n"}"#,
];

fn application() -> (TempDir, PackageOptions) {
    let dir = tempdir().unwrap();
    let app = dir.path().join("my-app.zip");
    fs::write(&app, "custom app").unwrap();
    let package = PackageOptions::new(&app);
    (dir, package)
}

fn context_entries(archive: &[u8]) -> BTreeSet<String> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(archive));
    tar.entries()
        .unwrap()
        .filter_map(|entry| {
            let entry = entry.unwrap();
            let path = entry.path().unwrap().to_string_lossy().into_owned();
            let path = path.trim_start_matches("./").trim_end_matches('/').to_string();
            (!path.is_empty() && path != ".").then_some(path)
        })
        .collect()
}

/// 最終メッセージに埋め込まれたエラーがそのまま失敗として返ることを確認
#[tokio::test]
async fn test_build_failure_in_stream_is_reported() {
    let (_dir, package) = application();
    let daemon = FakeDaemon::building(&[
        r#"{"stream":"Step 1/4 : ARG BONITA_BASE_IMAGE=bonita:latest\n"}"#,
        r#"{"error":"disk quota exceeded"}"#,
    ]);
    let orchestrator = ImageBuildOrchestrator::new(daemon);

    let err = orchestrator
        .run(&package, &DockerOptions::default())
        .await
        .unwrap_err();

    match &err {
        BuildError::BuildFailed(message) => assert_eq!(message, "disk quota exceeded"),
        other => panic!("unexpected error: {}", other),
    }
    assert_eq!(err.to_string(), "disk quota exceeded");
}

/// errorDetail のみのメッセージも失敗として扱うことを確認
#[tokio::test]
async fn test_build_failure_from_error_detail() {
    let (_dir, package) = application();
    let daemon = FakeDaemon::building(&[
        r#"{"errorDetail":{"message":"The command '/bin/sh -c exit 1' returned a non-zero code: 1"}}"#,
    ]);

    let err = ImageBuildOrchestrator::new(daemon)
        .run(&package, &DockerOptions::default())
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "The command '/bin/sh -c exit 1' returned a non-zero code: 1"
    );
}

/// 成功時はタグを返し、ベースイメージ未指定ならpullしないことを確認
#[tokio::test]
async fn test_successful_build_without_base_image() {
    let (_dir, package) = application();
    let orchestrator = ImageBuildOrchestrator::new(FakeDaemon::building(SUCCESSFUL_BUILD));

    let tag = orchestrator
        .run(&package, &DockerOptions::default())
        .await
        .unwrap();

    assert_eq!(tag, "my-bonita-application:latest");

    let daemon = orchestrator.daemon();
    assert!(daemon.pulls.lock().unwrap().is_empty());

    let builds = daemon.builds.lock().unwrap();
    assert_eq!(builds.len(), 1);
    let (context, options) = &builds[0];
    assert_eq!(options.tag, "my-bonita-application:latest");
    assert!(options.build_args.is_empty());
    assert!(options.registry_auth.is_none());

    let entries = context_entries(context);
    assert!(entries.contains("Dockerfile"));
    assert!(entries.contains("resources/my-app.zip"));
}

/// pull に失敗した場合はビルドを行わないことを確認
#[tokio::test]
async fn test_pull_failure_aborts_before_build() {
    let (_dir, package) = application();
    let daemon = FakeDaemon {
        pull_lines: vec![
            r#"{"status":"Pulling from bonitasoft/bonita"}"#,
            r#"{"error":"pull access denied for bonitasoft/bonita"}"#,
        ],
        build_lines: SUCCESSFUL_BUILD.to_vec(),
        ..Default::default()
    };
    let docker = DockerOptions {
        base_image: Some("bonitasoft/bonita:2023.1".to_string()),
        ..Default::default()
    };
    let orchestrator = ImageBuildOrchestrator::new(daemon);

    let err = orchestrator.run(&package, &docker).await.unwrap_err();

    match err {
        BuildError::PullFailed { image, message } => {
            assert_eq!(image, "bonitasoft/bonita:2023.1");
            assert_eq!(message, "pull access denied for bonitasoft/bonita");
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(orchestrator.daemon().builds.lock().unwrap().is_empty());
}

/// パスワード未指定時はプロンプトで入力し、レジストリ別に認証情報を渡すことを確認
#[tokio::test]
async fn test_missing_password_is_prompted() {
    let (_dir, package) = application();
    let daemon = FakeDaemon {
        pull_lines: vec![r#"{"status":"Status: Image is up to date"}"#],
        build_lines: SUCCESSFUL_BUILD.to_vec(),
        ..Default::default()
    };
    let docker = DockerOptions {
        tag: "acme/bonita-app:1.0".to_string(),
        base_image: Some("quay.io/bonitasoft/bonita:2023.1".to_string()),
        registry_login: Some(RegistryLogin {
            username: "walter".to_string(),
            password: None,
        }),
        ..Default::default()
    };
    let orchestrator =
        ImageBuildOrchestrator::new(daemon).with_prompt(|_| Ok("s3cr3t".to_string()));

    let tag = orchestrator.run(&package, &docker).await.unwrap();
    assert_eq!(tag, "acme/bonita-app:1.0");

    let daemon = orchestrator.daemon();
    let pulls = daemon.pulls.lock().unwrap();
    assert_eq!(pulls.len(), 1);
    assert_eq!(pulls[0].0, "quay.io/bonitasoft/bonita:2023.1");
    let credentials = pulls[0].1.as_ref().unwrap();
    assert_eq!(credentials.username.as_deref(), Some("walter"));
    assert_eq!(credentials.password.as_deref(), Some("s3cr3t"));
    assert_eq!(credentials.serveraddress.as_deref(), Some("quay.io"));

    let builds = daemon.builds.lock().unwrap();
    let options = &builds[0].1;
    let auth = options.registry_auth.as_ref().unwrap();
    assert_eq!(auth.len(), 1);
    assert_eq!(auth["quay.io"].password.as_deref(), Some("s3cr3t"));
    assert_eq!(
        options.build_args["BONITA_BASE_IMAGE"],
        "quay.io/bonitasoft/bonita:2023.1"
    );
    assert_eq!(options.build_args["BONITA_BASE_IMAGE_VERSION"], "2023.1");
}

/// マルチスレッドランタイム上でもプロンプトによる認証が完了することを確認
#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_missing_password_is_prompted_on_multi_thread_runtime() {
    let (_dir, package) = application();
    let daemon = FakeDaemon {
        pull_lines: vec![r#"{"status":"Status: Image is up to date"}"#],
        build_lines: SUCCESSFUL_BUILD.to_vec(),
        ..Default::default()
    };
    let docker = DockerOptions {
        base_image: Some("bonitasoft/bonita:2023.1".to_string()),
        registry_login: Some(RegistryLogin {
            username: "walter".to_string(),
            password: None,
        }),
        ..Default::default()
    };
    let orchestrator = ImageBuildOrchestrator::new(daemon).with_prompt(|text| {
        assert_eq!(text, "Password for walter@bonitasoft: ");
        Ok("typed".to_string())
    });

    orchestrator.run(&package, &docker).await.unwrap();

    let pulls = orchestrator.daemon().pulls.lock().unwrap();
    let credentials = pulls[0].1.as_ref().unwrap();
    assert_eq!(credentials.password.as_deref(), Some("typed"));
}

/// ビルドが終わらない場合はタイムアウトで中断されることを確認
#[tokio::test(start_paused = true)]
async fn test_build_timeout() {
    let (_dir, package) = application();
    let daemon = FakeDaemon {
        hang_on_build: true,
        ..Default::default()
    };
    let docker = DockerOptions {
        build_timeout: Duration::from_secs(5),
        ..Default::default()
    };

    let err = ImageBuildOrchestrator::new(daemon)
        .run(&package, &docker)
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Timeout(t) if t == Duration::from_secs(5)));
}

/// アプリケーションがない場合はデーモンに何も送らないことを確認
#[tokio::test]
async fn test_missing_application_does_not_reach_daemon() {
    let dir = tempdir().unwrap();
    let package = PackageOptions::new(dir.path().join("missing.zip"));
    let orchestrator = ImageBuildOrchestrator::new(FakeDaemon::building(SUCCESSFUL_BUILD));

    let err = orchestrator
        .run(&package, &DockerOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BuildError::Packager(_)));
    assert!(orchestrator.daemon().builds.lock().unwrap().is_empty());
}

/// ローカルのDockerデーモンで実際にビルドする
#[tokio::test]
#[ignore] // Docker接続が必要なため、通常のテストではスキップ
async fn test_build_with_local_docker() {
    let (_dir, package) = application();
    let docker = bollard::Docker::connect_with_local_defaults().unwrap();
    let orchestrator =
        ImageBuildOrchestrator::new(bonita_packager_build::DockerDaemon::new(docker.clone()));
    let options = DockerOptions {
        tag: "bonita-packager-test:latest".to_string(),
        base_image: Some("alpine:latest".to_string()),
        ..Default::default()
    };

    let result = orchestrator.run(&package, &options).await;

    // alpine には bonita ユーザーがいないため COPY --chown は失敗する
    assert!(matches!(result, Err(BuildError::BuildFailed(_))));
}
