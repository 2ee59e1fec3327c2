//! # POST /writes3/
//!
//! アノテーションのバッチを受け取り、当日のパーティションにParquetファイルとして保存する。

use std::sync::Arc;

use annotation_types::WriteResponse;
use axum::extract::State;
use axum::Json;
use tracing::Instrument;

use crate::config::GatewayState;
use crate::error::GatewayError;
use crate::validate::ValidatedBatch;

/// POST /writes3/: アノテーションの保存。
///
/// ボディの検証に失敗した場合はストレージに一切アクセスせず422を返す。
/// 日付はリクエスト受信時のローカル時刻で決まる。
pub async fn handle_writes3(
    State(state): State<Arc<GatewayState>>,
    ValidatedBatch(batch): ValidatedBatch,
) -> Result<Json<WriteResponse>, GatewayError> {
    let request_id = uuid::Uuid::new_v4();
    let span = tracing::info_span!("writes3", %request_id, records = batch.len());

    async move {
        let today = chrono::Local::now().date_naive();
        let response = state.writer.store(&batch, today).await?;
        Ok::<_, GatewayError>(Json(response))
    }
    .instrument(span)
    .await
}
