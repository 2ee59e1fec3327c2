//! # GET /healthz
//!
//! 死活監視用エンドポイント。ストレージには触れない。

use annotation_types::HealthResponse;
use axum::Json;

/// GET /healthz: 稼働中であることとバージョンを返す。
pub async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
