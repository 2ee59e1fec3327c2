//! # Gateway エラー型
//!
//! 全エンドポイントで共通のエラー型。
//! 検証エラーはフィールド単位の詳細を返し、ストレージ障害は詳細をログにのみ残す。

use annotation_types::{FieldViolation, ValidationErrorBody};
use axum::http::StatusCode;
use axum::Json;

use crate::storage::StorageError;

/// Gatewayエラー型。
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// リクエストボディがスキーマに適合しない
    #[error("リクエストの検証に失敗: {} 件", .0.len())]
    Validation(Vec<FieldViolation>),
    /// ボディを読み取れない・Content-Typeが不正（状態コードはaxumのリジェクションに従う）
    #[error("リクエストを受け付けられません ({status}): {message}")]
    Rejected {
        status: StatusCode,
        message: String,
    },
    /// ストレージ操作に失敗（一覧取得・書き込み・連番の枯渇）
    #[error("ストレージ操作に失敗: {0}")]
    Storage(String),
    /// 内部エラー（Parquetシリアライズ失敗等）
    #[error("内部エラー: {0}")]
    Internal(String),
}

impl From<StorageError> for GatewayError {
    fn from(e: StorageError) -> Self {
        GatewayError::Storage(e.to_string())
    }
}

impl axum::response::IntoResponse for GatewayError {
    fn into_response(self) -> axum::response::Response {
        match self {
            GatewayError::Validation(detail) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ValidationErrorBody { detail }),
            )
                .into_response(),
            GatewayError::Rejected { status, message } => {
                (status, Json(serde_json::json!({ "detail": message }))).into_response()
            }
            GatewayError::Storage(_) | GatewayError::Internal(_) => {
                // 内部の詳細はクライアントに返さない
                tracing::error!(error = %self, "リクエスト処理に失敗");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(serde_json::json!({ "detail": "Internal Server Error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::response::IntoResponse;

    #[tokio::test]
    async fn test_storage_error_hides_detail() {
        let response =
            GatewayError::Storage("AccessDenied: secret-bucket-name".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("secret-bucket-name"));
        assert!(text.contains("Internal Server Error"));
    }

    #[tokio::test]
    async fn test_validation_error_is_422_with_detail() {
        let response = GatewayError::Validation(vec![FieldViolation {
            loc: vec!["body".into(), "code".into()],
            msg: "Field required".to_string(),
            kind: "missing".to_string(),
        }])
        .into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: ValidationErrorBody = serde_json::from_slice(&body).unwrap();
        assert_eq!(parsed.detail.len(), 1);
        assert_eq!(parsed.detail[0].kind, "missing");
    }

    #[tokio::test]
    async fn test_rejected_keeps_status() {
        let response = GatewayError::Rejected {
            status: StatusCode::UNSUPPORTED_MEDIA_TYPE,
            message: "Expected request with `Content-Type: application/json`".to_string(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(parsed["detail"].as_str().unwrap().contains("application/json"));
    }
}
