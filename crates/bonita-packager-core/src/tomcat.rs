//! Tomcatバンドルへのカスタムアプリケーション注入
//!
//! バンドルを `output/` に展開し、WARを展開してアプリケーションを
//! 所定の場所にコピーした後、`output/<bundle-name>-application.zip`
//! として再アーカイブします。

use crate::artifact::copy_artifact;
use crate::config::{PackageOptions, TomcatOptions};
use crate::error::{LocateError, PackagerError, Result};
use crate::locator::{bundle_name, locate_bundle};
use crate::staging::StagingDir;
use bonita_packager_archive::{extract_zip, zip_directory};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// バンドル内のwebappsディレクトリ
const WEBAPPS_DIR: [&str; 2] = ["server", "webapps"];

/// webapps内のWebアプリケーションアーカイブ
pub const WEBAPP_ARCHIVE: &str = "bonita.war";

/// WARの展開先（webapps内）
pub const WEBAPP_DIR: &str = "bonita";

/// 展開済みWebアプリケーション内のクラスパス
const CLASSES_DIR: [&str; 2] = ["WEB-INF", "classes"];

/// クラスパス内のカスタムアプリケーション注入先
pub const CUSTOM_APPLICATION_DIR: &str = "my-application";

/// パイプラインの各段階（完了時に通知される）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TomcatStage {
    Located,
    OuterExtracted,
    InnerExtracted,
    Injected,
    ReArchived,
    CleanedUp,
}

impl TomcatStage {
    pub fn description(&self) -> &'static str {
        match self {
            TomcatStage::Located => "Bonita Tomcat bundle located",
            TomcatStage::OuterExtracted => "Bonita Tomcat bundle unpacked",
            TomcatStage::InnerExtracted => "Bonita WAR file unpacked",
            TomcatStage::Injected => "Custom application copied inside Bonita",
            TomcatStage::ReArchived => "Bonita bundle re-packed with your application",
            TomcatStage::CleanedUp => "Temporary folder structure cleaned",
        }
    }
}

/// パイプラインの結果
#[derive(Debug)]
pub enum TomcatOutcome {
    /// 再アーカイブされたバンドル
    Packaged(PathBuf),
    /// バンドルが特定できなかった（`output/` は変更されていない）
    BundleNotResolved(LocateError),
}

/// Tomcatバンドルのリパッケージャ
pub struct TomcatPackager<'a> {
    package: &'a PackageOptions,
    tomcat: &'a TomcatOptions,
}

impl<'a> TomcatPackager<'a> {
    pub fn new(package: &'a PackageOptions, tomcat: &'a TomcatOptions) -> Self {
        Self { package, tomcat }
    }

    pub fn run(&self) -> Result<TomcatOutcome> {
        self.run_with_progress(|_| {})
    }

    /// パイプラインを実行し、各段階の完了を `on_stage` に通知
    ///
    /// どの段階で失敗しても残りは実行されず、`output/` 配下の作業用
    /// ディレクトリは削除されます。
    #[tracing::instrument(skip_all, fields(work_dir = %self.tomcat.work_dir.display()))]
    pub fn run_with_progress(&self, mut on_stage: impl FnMut(TomcatStage)) -> Result<TomcatOutcome> {
        let bundle = match locate_bundle(self.tomcat) {
            Ok(bundle) => bundle,
            Err(e) => return Ok(TomcatOutcome::BundleNotResolved(e)),
        };
        let Some(name) = bundle_name(&bundle) else {
            return Ok(TomcatOutcome::BundleNotResolved(LocateError::NotAnArchive(
                bundle,
            )));
        };
        for artifact in self.package.artifacts() {
            if !artifact.exists() {
                return Err(PackagerError::ArtifactNotFound(artifact.to_path_buf()));
            }
        }
        on_stage(TomcatStage::Located);

        let output = self.tomcat.output_dir();
        if output.exists() {
            debug!(output = %output.display(), "Cleaning 'output/' folder");
            fs::remove_dir_all(&output).map_err(|e| PackagerError::io(&output, e))?;
        }

        // 最終アーカイブが書き込まれるまでは output/ 全体が作業領域
        let output_guard = StagingDir::new(&output);

        info!(bundle = %bundle.display(), "Unpacking Bonita Tomcat bundle");
        let extraction = extract_zip(&bundle, &output)?;
        let root = extraction
            .root_folder()
            .ok_or_else(|| PackagerError::MissingRootFolder(bundle.clone()))?
            .to_string();
        let tree = StagingDir::new(output.join(&root));
        on_stage(TomcatStage::OuterExtracted);

        let webapps = WEBAPPS_DIR.iter().fold(tree.path().to_path_buf(), |p, s| p.join(s));
        let war = webapps.join(WEBAPP_ARCHIVE);
        if !war.is_file() {
            return Err(PackagerError::WarNotFound(war));
        }
        let webapp = webapps.join(WEBAPP_DIR);
        info!(war = %war.display(), "Unpacking Bonita WAR file");
        extract_zip(&war, &webapp)?;
        debug!("Removing unpacked Bonita WAR file");
        fs::remove_file(&war).map_err(|e| PackagerError::io(&war, e))?;
        on_stage(TomcatStage::InnerExtracted);

        let target = inject_artifacts(&webapp, self.package)?;
        debug!(target = %target.display(), "Custom application injected");
        on_stage(TomcatStage::Injected);

        let archive = output.join(format!("{}-application.zip", name));
        info!(archive = %archive.display(), "Re-packing Bonita bundle containing your application");
        zip_directory(&archive, tree.path(), &root)?;
        on_stage(TomcatStage::ReArchived);

        debug!("Cleaning temporary folder structure");
        let tree_path = tree.path().to_path_buf();
        tree.close().map_err(|e| PackagerError::io(tree_path, e))?;
        output_guard.persist();
        on_stage(TomcatStage::CleanedUp);

        Ok(TomcatOutcome::Packaged(archive))
    }
}

/// アプリケーション（と設定ファイル）を注入先へコピー
fn inject_artifacts(webapp: &Path, package: &PackageOptions) -> Result<PathBuf> {
    let classes = CLASSES_DIR.iter().fold(webapp.to_path_buf(), |p, s| p.join(s));
    if !classes.is_dir() {
        return Err(PackagerError::InjectionTargetMissing(classes));
    }

    let target = classes.join(CUSTOM_APPLICATION_DIR);
    for artifact in package.artifacts() {
        copy_artifact(artifact, &target)?;
    }

    Ok(target)
}
