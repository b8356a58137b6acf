use crate::error::{ArchiveError, Result};
use std::fs::{self, File};
use std::io::{self, BufWriter, Seek, Write};
use std::path::Path;
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// 書き出したアーカイブの内訳（格納したもの・除外したもの）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub files: usize,
    pub directories: usize,
    pub skipped: usize,
}

/// `source_dir` 以下のツリーを `archive_path` に新しい zip として書き出す
///
/// エントリ名は `<base_in_zip>/<相対パス>`（`base_in_zip` が空なら相対パスのみ）。
/// ディレクトリは中身より先に `name/` エントリとして書き込み、通常ファイルは
/// パーミッションビットを保持します。シンボリックリンクと特殊ファイルは含めません。
///
/// 兄弟エントリは名前順に並ぶため、同じツリーからは常に同じ順序のアーカイブができます。
///
/// エラー時は `archive_path` に書きかけのファイルが残る可能性があり、使用できません。
#[tracing::instrument(skip_all, fields(archive = %archive_path.display()))]
pub fn zip_directory(
    archive_path: &Path,
    source_dir: &Path,
    base_in_zip: &str,
) -> Result<WriteSummary> {
    let file = File::create(archive_path).map_err(|e| ArchiveError::io(archive_path, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));

    let summary = add_tree(&mut zip, source_dir, base_in_zip)?;

    let mut inner = zip.finish().map_err(|e| ArchiveError::zip(archive_path, e))?;
    inner.flush().map_err(|e| ArchiveError::io(archive_path, e))?;

    tracing::debug!(
        files = summary.files,
        directories = summary.directories,
        skipped = summary.skipped,
        "Archive written"
    );

    Ok(summary)
}

fn add_tree<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    source_dir: &Path,
    base_in_zip: &str,
) -> Result<WriteSummary> {
    let mut summary = WriteSummary::default();

    // 行きがけ順なのでディレクトリは常に中身より先に来る
    let walker = WalkDir::new(source_dir)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name();

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            // 走査中に消えたエントリ（ルート自体の欠落はエラー）
            Err(e) if e.depth() > 0 && is_not_found(&e) => {
                tracing::debug!(path = ?e.path(), "Entry disappeared, skipping");
                summary.skipped += 1;
                continue;
            }
            Err(e) => {
                let path = e.path().unwrap_or(source_dir).to_path_buf();
                return Err(ArchiveError::io(path, io::Error::from(e)));
            }
        };

        let path = entry.path();
        let relative = path.strip_prefix(source_dir).unwrap_or(path);
        let name = entry_name(base_in_zip, &relative_name(relative));

        let file_type = entry.file_type();
        if file_type.is_symlink() {
            tracing::debug!(path = %path.display(), "Skipping symlink");
            summary.skipped += 1;
        } else if file_type.is_dir() {
            tracing::trace!(entry = %name, "Adding directory");
            zip.add_directory(format!("{}/", name), SimpleFileOptions::default())
                .map_err(|e| ArchiveError::zip(path, e))?;
            summary.directories += 1;
        } else if file_type.is_file() {
            if add_file(zip, path, name)? {
                summary.files += 1;
            } else {
                summary.skipped += 1;
            }
        } else {
            tracing::debug!(path = %path.display(), "Skipping special file");
            summary.skipped += 1;
        }
    }

    Ok(summary)
}

fn is_not_found(error: &walkdir::Error) -> bool {
    error
        .io_error()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

/// 一覧取得後にファイルが消えていた場合は `false`
fn add_file<W: Write + Seek>(zip: &mut ZipWriter<W>, path: &Path, name: String) -> Result<bool> {
    let mut source = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "File disappeared, skipping");
            return Ok(false);
        }
        Err(e) => return Err(ArchiveError::io(path, e)),
    };
    let metadata = source.metadata().map_err(|e| ArchiveError::io(path, e))?;

    let options = file_options(&metadata);
    zip.start_file(name, options)
        .map_err(|e| ArchiveError::zip(path, e))?;
    io::copy(&mut source, zip).map_err(|e| ArchiveError::io(path, e))?;
    Ok(true)
}

#[cfg(unix)]
fn file_options(metadata: &fs::Metadata) -> SimpleFileOptions {
    use std::os::unix::fs::PermissionsExt;

    SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(metadata.permissions().mode() & 0o7777)
}

#[cfg(not(unix))]
fn file_options(_metadata: &fs::Metadata) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

/// OS の区切り文字に関係なく `/` で連結する
fn relative_name(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn entry_name(base_in_zip: &str, relative: &str) -> String {
    let base = base_in_zip.trim_end_matches('/');
    if base.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", base, relative)
    }
}
