//! # Parquetシリアライズ
//!
//! `AnnotationBatch` の4列を、文字列4列のArrow RecordBatchに変換してParquetに書き出す。
//! 圧縮はSnappy（pandas `to_parquet` の既定と同じ）。

use std::sync::Arc;

use annotation_types::{AnnotationBatch, COLUMNS};
use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema, SchemaRef};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;

use crate::error::GatewayError;

/// Parquetオブジェクトのcontent-type。
pub const PARQUET_CONTENT_TYPE: &str = "application/vnd.apache.parquet";

/// 4列すべてnull不可の文字列列とするスキーマ。
pub fn annotation_schema() -> SchemaRef {
    Arc::new(Schema::new(
        COLUMNS
            .iter()
            .map(|name| Field::new(*name, DataType::Utf8, false))
            .collect::<Vec<_>>(),
    ))
}

/// バッチをArrow RecordBatchに変換する。列長の不一致はエラー。
fn to_record_batch(batch: &AnnotationBatch) -> Result<RecordBatch, GatewayError> {
    let columns: Vec<ArrayRef> = batch
        .columns()
        .iter()
        .map(|(_, values)| Arc::new(StringArray::from_iter_values(values.iter())) as ArrayRef)
        .collect();

    RecordBatch::try_new(annotation_schema(), columns)
        .map_err(|e| GatewayError::Internal(format!("RecordBatchの構築に失敗: {e}")))
}

/// バッチをParquetファイルのバイト列にシリアライズする。
pub fn encode_batch(batch: &AnnotationBatch) -> Result<Vec<u8>, GatewayError> {
    let record_batch = to_record_batch(batch)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, record_batch.schema(), Some(props))
        .map_err(|e| GatewayError::Internal(format!("Parquetライターの作成に失敗: {e}")))?;
    writer
        .write(&record_batch)
        .map_err(|e| GatewayError::Internal(format!("Parquetの書き込みに失敗: {e}")))?;
    writer
        .close()
        .map_err(|e| GatewayError::Internal(format!("Parquetフッターの書き込みに失敗: {e}")))?;

    Ok(buf)
}
