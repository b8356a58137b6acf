//! Bonita Packager の zip アーカイブ処理
//!
//! Tomcat バンドルのパイプラインを支える2つの操作:
//!
//! - [`extract_zip`] は信頼できないアーカイブを展開する。展開先の外に出る
//!   エントリが1つでもあればアーカイブ全体を拒否する。
//! - [`zip_directory`] はディレクトリツリーを再圧縮する。相対パスと POSIX
//!   パーミッションを保持し、シンボリックリンクと特殊ファイルは除外する。

pub mod error;
pub mod extract;
pub mod writer;

pub use error::{ArchiveError, Result};
pub use extract::{Extraction, extract_zip};
pub use writer::{WriteSummary, zip_directory};
