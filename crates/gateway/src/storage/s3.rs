//! # S3互換ストレージ実装
//!
//! MinIO, AWS S3 等のS3互換APIを使用するアノテーションストレージ実装。
//! パス形式のアドレッシングを使う（MinIOの既定構成に合わせる）。

use bytes::Bytes;

use super::{AnnotationStorage, StorageEntry, StorageError};
use crate::config::S3Settings;

/// S3互換ストレージによるアノテーションストレージ実装。
pub struct S3Storage {
    bucket: s3::Bucket,
}

impl S3Storage {
    /// S3互換バケットからストレージを構築する。
    pub fn new(bucket: s3::Bucket) -> Self {
        Self { bucket }
    }

    /// 設定値からS3互換バケットを初期化する。
    ///
    /// アクセスキーが未設定の場合は `rust-s3` の認証情報チェーン
    /// （環境変数 → プロファイル → インスタンスメタデータ）に委ねる。
    pub fn from_settings(settings: &S3Settings) -> anyhow::Result<Self> {
        let region = s3::Region::Custom {
            region: settings.region.clone(),
            endpoint: settings.endpoint.clone(),
        };

        let credentials = s3::creds::Credentials::new(
            settings.access_key.as_deref(),
            settings.secret_key.as_deref(),
            None,
            settings.session_token.as_deref(),
            None,
        )?;

        let bucket = s3::Bucket::new(&settings.bucket, region, credentials)?.with_path_style();

        tracing::info!(
            s3_endpoint = %settings.endpoint,
            s3_bucket = %settings.bucket,
            "S3互換ストレージを設定"
        );

        Ok(Self::new(*bucket))
    }
}

/// `prefix/` 配下のキーからエントリ名を取り出す。ディレクトリマーカー（名前が空）はNone。
fn entry_name<'a>(key: &'a str, prefix: &str) -> Option<&'a str> {
    key.strip_prefix(prefix)
        .map(|rest| rest.trim_end_matches('/'))
        .filter(|name| !name.is_empty())
}

#[async_trait::async_trait]
impl AnnotationStorage for S3Storage {
    fn bucket(&self) -> &str {
        &self.bucket.name
    }

    async fn list(&self, dir: &str) -> Result<Vec<StorageEntry>, StorageError> {
        let prefix = format!("{}/", dir.trim_end_matches('/'));

        let pages = self
            .bucket
            .list(prefix.clone(), Some("/".to_string()))
            .await
            .map_err(|e| StorageError::Backend(format!("一覧取得に失敗 ({prefix}): {e}")))?;

        let mut entries = Vec::new();
        for page in pages {
            entries.extend(
                page.contents
                    .iter()
                    .filter_map(|object| entry_name(&object.key, &prefix))
                    .map(StorageEntry::new),
            );
            entries.extend(
                page.common_prefixes
                    .iter()
                    .flatten()
                    .filter_map(|common| entry_name(&common.prefix, &prefix))
                    .map(StorageEntry::new),
            );
        }

        // オブジェクトストレージにディレクトリは実在しないため、空の一覧は「存在しない」と同義
        if entries.is_empty() {
            return Err(StorageError::NotFound(dir.to_string()));
        }

        Ok(entries)
    }

    async fn put(&self, key: &str, data: Bytes, content_type: &str) -> Result<(), StorageError> {
        let response = self
            .bucket
            .put_object_with_content_type(key, &data, content_type)
            .await
            .map_err(|e| StorageError::Backend(format!("書き込みに失敗 ({key}): {e}")))?;

        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(StorageError::Backend(format!(
                "書き込みに失敗 ({key}): HTTP {status} - {}",
                String::from_utf8_lossy(response.as_slice())
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_name_strips_prefix() {
        let prefix = "data/output-annotation/day=2024-09-11/";
        assert_eq!(
            entry_name("data/output-annotation/day=2024-09-11/annot2.parquet", prefix),
            Some("annot2.parquet")
        );
        assert_eq!(
            entry_name("data/output-annotation/day=2024-09-11/old/", prefix),
            Some("old")
        );
        assert_eq!(entry_name("data/output-annotation/day=2024-09-11/", prefix), None);
        assert_eq!(entry_name("other/annot1.parquet", prefix), None);
    }

    #[test]
    fn test_from_settings_uses_configured_bucket() {
        let settings = S3Settings {
            endpoint: "http://localhost:9000".to_string(),
            region: "us-east-1".to_string(),
            bucket: "projet-budget-famille".to_string(),
            access_key: Some("minioadmin".to_string()),
            secret_key: Some("minioadmin".to_string()),
            session_token: None,
        };
        let storage = S3Storage::from_settings(&settings).unwrap();
        assert_eq!(storage.bucket(), "projet-budget-famille");
    }
}
