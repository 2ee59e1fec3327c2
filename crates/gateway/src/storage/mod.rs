//! # アノテーションストレージ
//!
//! Gatewayが書き込むオブジェクトストレージの抽象インターフェース。
//! S3互換ストレージ実装は `s3` サブモジュール、プロセス内実装は `memory` を参照。
//!
//! キーはすべてバケット内の相対キー（例: `data/output-annotation/day=2024-09-11/annot1.parquet`）。

pub mod memory;
#[cfg(feature = "vendor-aws")]
pub mod s3;

pub use memory::MemoryStorage;
#[cfg(feature = "vendor-aws")]
pub use s3::S3Storage;

use bytes::Bytes;

/// ストレージ操作のエラー。
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 一覧取得対象のディレクトリ（プレフィックス）が存在しない
    #[error("パーティションが存在しません: {0}")]
    NotFound(String),
    /// 権限・通信・バックエンド障害等、その他すべての失敗
    #[error("{0}")]
    Backend(String),
}

/// 一覧取得で返される1エントリ。
///
/// オブジェクトとサブディレクトリ（共通プレフィックス）を区別しない。
/// どちらも同名のファイルを作れなくするため、連番の割り当てでは同じに扱う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEntry {
    /// プレフィックスを除いたエントリ名（例: `annot3.parquet`）
    pub name: String,
}

impl StorageEntry {
    /// エントリを作成する。
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// アノテーションファイルの保存先の抽象インターフェース。
///
/// 運用者はS3互換ストレージ（MinIO, AWS S3等）やプロセス内ストレージを
/// 実装として選択できる。排他的な作成操作は要求しない。
#[async_trait::async_trait]
pub trait AnnotationStorage: Send + Sync {
    /// バケット名。レスポンスの `filename` とプレビューURLの先頭に使われる。
    fn bucket(&self) -> &str;

    /// `dir` 直下のオブジェクトとサブディレクトリを一覧する（再帰しない）。
    ///
    /// ディレクトリが存在しない場合は `StorageError::NotFound` を返す。
    async fn list(&self, dir: &str) -> Result<Vec<StorageEntry>, StorageError>;

    /// `key` に `data` を全量書き込む。既存オブジェクトは上書きされる。
    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError>;
}
