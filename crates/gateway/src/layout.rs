//! # 保存先レイアウト
//!
//! 日付パーティションのパス、連番ファイル名の割り当て、プレビューURLの構築。
//! ストレージに依存しない関数のみを置く。
//!
//! ```text
//! <bucket>/<prefix>/day=<YYYY-MM-DD>/annot<N>.parquet
//! ```

use chrono::NaiveDate;

use crate::storage::StorageEntry;

/// 連番ファイル名の接頭辞。
const FILENAME_PREFIX: &str = "annot";
/// 連番ファイル名の拡張子。
const FILENAME_EXTENSION: &str = ".parquet";

/// 1日分のパーティション。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionPath {
    bucket: String,
    dir: String,
}

impl PartitionPath {
    /// `prefix` 配下の `day=<YYYY-MM-DD>` パーティションを作る。
    pub fn for_day(bucket: &str, prefix: &str, day: NaiveDate) -> Self {
        let day = format!("day={}", day.format("%Y-%m-%d"));
        let dir = if prefix.is_empty() {
            day
        } else {
            format!("{prefix}/{day}")
        };
        Self {
            bucket: bucket.to_string(),
            dir,
        }
    }

    /// バケット内の相対キー（ストレージの一覧取得に渡す値）。
    pub fn dir(&self) -> &str {
        &self.dir
    }

    /// このパーティション内のオブジェクトを指す。
    pub fn object(&self, filename: &str) -> StoredObject {
        StoredObject {
            bucket: self.bucket.clone(),
            key: format!("{}/{filename}", self.dir),
        }
    }
}

impl std::fmt::Display for PartitionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.bucket, self.dir)
    }
}

/// 書き込み先のオブジェクト。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// バケット名
    pub bucket: String,
    /// バケット内の相対キー
    pub key: String,
}

impl StoredObject {
    /// バケット名を先頭に含むパス（レスポンスの `filename`）。
    pub fn path(&self) -> String {
        format!("{}/{}", self.bucket, self.key)
    }

    /// データエクスプローラーのプレビューURL。
    pub fn preview_url(&self, base_url: &str) -> String {
        preview_url(base_url, &self.path())
    }
}

/// `annot<N>.parquet` の数字部分。形式に合わない名前はNone。
fn suffix_digits(name: &str) -> Option<&str> {
    let digits = name
        .strip_prefix(FILENAME_PREFIX)?
        .strip_suffix(FILENAME_EXTENSION)?;
    (!digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

/// `annot<N>.parquet` からNを取り出す。形式に合わない名前はNone。
///
/// 数字部分が `u64` に収まらない名前もNoneとなる。
pub fn extract_suffix(name: &str) -> Option<u64> {
    suffix_digits(name)?.parse().ok()
}

/// 既存エントリから次の連番を決める。
///
/// 一致するエントリがなければ1。最大値が `u64::MAX` の場合はNone（枯渇）。
/// 比較は数値で行う（`annot10` は `annot2` より大きい）。
/// 形式は正しいが `u64` に収まらない名前は警告を出して無視する。
pub fn next_suffix(entries: &[StorageEntry]) -> Option<u64> {
    let mut max: Option<u64> = None;
    for entry in entries {
        let Some(digits) = suffix_digits(&entry.name) else {
            continue;
        };
        match digits.parse::<u64>() {
            Ok(n) => max = max.max(Some(n)),
            Err(_) => tracing::warn!(name = %entry.name, "連番がu64に収まらないため無視します"),
        }
    }

    match max {
        Some(max) => max.checked_add(1),
        None => Some(1),
    }
}

/// 連番からファイル名を作る。ゼロ埋めはしない。
pub fn annotation_filename(suffix: u64) -> String {
    format!("{FILENAME_PREFIX}{suffix}{FILENAME_EXTENSION}")
}

/// `s3://<path>` をパーセントエンコードしてベースURLに連結する。
///
/// 英数字と `-_.~` 以外（`/`, `:`, `=` を含む）はすべてエンコードされる。
pub fn preview_url(base_url: &str, path: &str) -> String {
    let source = format!("s3://{path}");
    format!("{base_url}{}", urlencoding::encode(&source))
}
