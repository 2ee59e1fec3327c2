//! # アノテーション書き込み
//!
//! 検証済みバッチを当日のパーティションに新しいParquetファイルとして追記する。
//!
//! ## 処理の流れ
//! 1. 当日（ローカル時刻）のパーティションを決める
//! 2. パーティション直下を一覧し、`annot<N>.parquet` の最大N + 1 を割り当てる
//! 3. バッチをParquetにシリアライズし、割り当てたキーに書き込む
//! 4. 保存先パスとプレビューURLを返す
//!
//! 一覧取得から書き込みまでは排他されない。同時リクエストが同じ連番を選んだ場合、
//! 後から書き込んだ側が先のファイルを上書きする。

use std::sync::Arc;

use annotation_types::{AnnotationBatch, WriteResponse};
use bytes::Bytes;
use chrono::NaiveDate;

use crate::columnar::{encode_batch, PARQUET_CONTENT_TYPE};
use crate::error::GatewayError;
use crate::layout::{annotation_filename, next_suffix, PartitionPath};
use crate::storage::{AnnotationStorage, StorageError};

/// アノテーションの書き込み処理。起動時に一度だけ構築される。
pub struct AnnotationWriter {
    storage: Arc<dyn AnnotationStorage>,
    output_prefix: String,
    preview_base_url: String,
}

impl AnnotationWriter {
    /// ストレージと出力先設定から構築する。
    pub fn new(
        storage: Arc<dyn AnnotationStorage>,
        output_prefix: String,
        preview_base_url: String,
    ) -> Self {
        Self {
            storage,
            output_prefix,
            preview_base_url,
        }
    }

    /// `day` のパーティションにバッチを書き込む。
    pub async fn store(
        &self,
        batch: &AnnotationBatch,
        day: NaiveDate,
    ) -> Result<WriteResponse, GatewayError> {
        let partition = PartitionPath::for_day(self.storage.bucket(), &self.output_prefix, day);

        let entries = match self.storage.list(partition.dir()).await {
            Ok(entries) => entries,
            Err(StorageError::NotFound(_)) => {
                tracing::info!(partition = %partition, "パーティションが存在しないため新規作成します");
                Vec::new()
            }
            Err(e) => return Err(e.into()),
        };

        let suffix = next_suffix(&entries).ok_or_else(|| {
            GatewayError::Storage(format!("連番が上限に達しました: {partition}"))
        })?;
        let object = partition.object(&annotation_filename(suffix));

        let data = encode_batch(batch)?;
        let size = data.len();
        self.storage
            .put(&object.key, Bytes::from(data), PARQUET_CONTENT_TYPE)
            .await?;

        tracing::info!(
            path = %object.path(),
            records = batch.len(),
            bytes = size,
            "アノテーションを書き込みました"
        );

        Ok(WriteResponse {
            filename: object.path(),
            preview: object.preview_url(&self.preview_base_url),
        })
    }
}
