use crate::error::{ArchiveError, Result};
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// 展開結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    pub files: usize,
    pub directories: usize,
    root_folder: Option<String>,
}

impl Extraction {
    /// アーカイブ順で最初に現れたトップレベルフォルダ
    ///
    /// 配布バンドルは全体を1つのフォルダ（例: `BonitaCommunity-2023.1-u0/`）で
    /// 包んでいるため、そのフォルダ名になります。
    pub fn root_folder(&self) -> Option<&str> {
        self.root_folder.as_deref()
    }
}

/// 検証済みで書き込み待ちのエントリ
struct PlannedEntry {
    index: usize,
    target: PathBuf,
    is_dir: bool,
    mode: Option<u32>,
}

/// `archive_path` の全エントリを `destination` 以下へ展開
///
/// ディスクに書き込む前に、すべてのエントリパスを正規化した展開先に対して解決します。
/// 1つでも展開先の外に出るエントリ（`../evil.txt` や `/etc/passwd` など）があれば
/// アーカイブ全体を [`ArchiveError::PathTraversal`] で拒否し、何も書き込みません。
/// 元のアーカイブはそのまま残ります。
#[tracing::instrument(skip_all, fields(archive = %archive_path.display()))]
pub fn extract_zip(archive_path: &Path, destination: &Path) -> Result<Extraction> {
    let file = File::open(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    let mut archive =
        ZipArchive::new(BufReader::new(file)).map_err(|e| ArchiveError::zip(archive_path, e))?;

    fs::create_dir_all(destination).map_err(|e| ArchiveError::io(destination, e))?;
    let root = destination
        .canonicalize()
        .map_err(|e| ArchiveError::io(destination, e))?;

    let mut plan = Vec::with_capacity(archive.len());
    let mut root_folder = None;

    for index in 0..archive.len() {
        let entry = archive
            .by_index(index)
            .map_err(|e| ArchiveError::zip(archive_path, e))?;
        let name = entry.name().to_string();
        let is_dir = entry.is_dir();

        let target = resolve_within(&root, &name, is_dir).ok_or_else(|| {
            ArchiveError::PathTraversal {
                entry: name.clone(),
                destination: destination.to_path_buf(),
            }
        })?;

        if root_folder.is_none() {
            root_folder = top_level_folder(&root, &target, is_dir);
        }

        plan.push(PlannedEntry {
            index,
            target,
            is_dir,
            mode: entry.unix_mode(),
        });
    }

    let mut extraction = Extraction {
        root_folder,
        ..Default::default()
    };

    for planned in plan {
        if planned.is_dir {
            fs::create_dir_all(&planned.target)
                .map_err(|e| ArchiveError::io(&planned.target, e))?;
            extraction.directories += 1;
            continue;
        }

        if let Some(parent) = planned.target.parent() {
            fs::create_dir_all(parent).map_err(|e| ArchiveError::io(parent, e))?;
        }

        let mut entry = archive
            .by_index(planned.index)
            .map_err(|e| ArchiveError::zip(archive_path, e))?;
        let mut out =
            File::create(&planned.target).map_err(|e| ArchiveError::io(&planned.target, e))?;
        io::copy(&mut entry, &mut out).map_err(|e| ArchiveError::io(&planned.target, e))?;
        drop(out);

        apply_mode(&planned.target, planned.mode)?;
        extraction.files += 1;
    }

    tracing::debug!(
        files = extraction.files,
        directories = extraction.directories,
        destination = %destination.display(),
        "Archive extracted"
    );

    Ok(extraction)
}

/// ファイルシステムに触れずに `name` を `root` 以下で解決
///
/// `..` は字句的に畳み込み、絶対パスは root を置き換えるため、結果が `root` の内側に
/// ある場合のみ受け付けます。root 自体を指せるのはディレクトリエントリだけです。
fn resolve_within(root: &Path, name: &str, is_dir: bool) -> Option<PathBuf> {
    let joined = root.join(name);
    let mut resolved = PathBuf::new();

    for component in joined.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => resolved.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                if !resolved.pop() {
                    return None;
                }
            }
            Component::Normal(part) => resolved.push(part),
        }
    }

    if !resolved.starts_with(root) {
        return None;
    }
    if resolved == root && !is_dir {
        return None;
    }
    Some(resolved)
}

fn top_level_folder(root: &Path, target: &Path, is_dir: bool) -> Option<String> {
    let relative = target.strip_prefix(root).ok()?;
    let mut components = relative.components();
    let first = components.next()?;
    // トップレベル直下のファイルはフォルダではない
    if components.next().is_none() && !is_dir {
        return None;
    }
    Some(first.as_os_str().to_string_lossy().into_owned())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    if let Some(mode) = mode.map(|m| m & 0o7777).filter(|m| *m != 0) {
        fs::set_permissions(path, fs::Permissions::from_mode(mode))
            .map_err(|e| ArchiveError::io(path, e))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}
