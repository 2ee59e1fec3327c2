//! # リクエスト検証
//!
//! `POST /writes3/` のボディを `AnnotationBatch` として取り出すエクストラクタ。
//! ハンドラより前に実行されるため、失敗時はストレージに一切アクセスしない。
//!
//! 検査内容:
//! - `Content-Type: application/json` であること
//! - ボディがJSONオブジェクトであること
//! - 4フィールドが存在し、いずれも文字列の配列であること（serdeの型検査）
//! - 4配列の長さが一致すること（`product` の長さを基準とする）
//!
//! 未知のフィールドは無視する。

use annotation_types::{AnnotationBatch, FieldViolation, COLUMN_PRODUCT};
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde_json::{Map, Value};
use serde_path_to_error::Segment;

use crate::error::GatewayError;

/// 検証済みのアノテーションバッチ。
#[derive(Debug)]
pub struct ValidatedBatch(pub AnnotationBatch);

impl<S> FromRequest<S> for ValidatedBatch
where
    S: Send + Sync,
{
    type Rejection = GatewayError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(object) = Json::<Map<String, Value>>::from_request(req, state)
            .await
            .map_err(json_rejection)?;

        let batch: AnnotationBatch = serde_path_to_error::deserialize(Value::Object(object))
            .map_err(|e| GatewayError::Validation(vec![schema_violation(&e)]))?;

        check_lengths(&batch)?;
        Ok(Self(batch))
    }
}

fn violation(loc: Vec<Value>, msg: impl Into<String>, kind: &str) -> FieldViolation {
    FieldViolation {
        loc,
        msg: msg.into(),
        kind: kind.to_string(),
    }
}

/// ボディの読み取り・JSON解析の失敗をエラーに変換する。
fn json_rejection(rejection: JsonRejection) -> GatewayError {
    match rejection {
        JsonRejection::JsonSyntaxError(e) => GatewayError::Validation(vec![violation(
            vec![Value::from("body")],
            format!("JSON decode error: {}", e.body_text()),
            "json_invalid",
        )]),
        // オブジェクト以外のJSON値（配列・文字列等）
        JsonRejection::JsonDataError(_) => GatewayError::Validation(vec![violation(
            vec![Value::from("body")],
            "Input should be a valid dictionary or object to extract fields from",
            "model_attributes_type",
        )]),
        other => GatewayError::Rejected {
            status: other.status(),
            message: other.body_text(),
        },
    }
}

/// serdeの型エラーをフィールド単位の違反に変換する。
fn schema_violation(err: &serde_path_to_error::Error<serde_json::Error>) -> FieldViolation {
    let mut loc = vec![Value::from("body")];
    for segment in err.path() {
        match segment {
            Segment::Map { key } => loc.push(Value::from(key.as_str())),
            Segment::Seq { index } => loc.push(Value::from(*index)),
            Segment::Enum { .. } | Segment::Unknown => {}
        }
    }

    let message = err.inner().to_string();
    if let Some(field) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        loc.push(Value::from(field));
        return violation(loc, "Field required", "missing");
    }
    if message.ends_with("expected a sequence") {
        return violation(loc, "Input should be a valid list", "list_type");
    }
    if message.ends_with("expected a string") {
        return violation(loc, "Input should be a valid string", "string_type");
    }
    violation(loc, message, "value_error")
}

/// 4列の長さが `product` と一致することを確認する。不一致の列ごとに違反を返す。
fn check_lengths(batch: &AnnotationBatch) -> Result<(), GatewayError> {
    let expected = batch.len();
    let mismatched: Vec<FieldViolation> = batch
        .columns()
        .iter()
        .filter(|(_, values)| values.len() != expected)
        .map(|(field, values)| {
            violation(
                vec![Value::from("body"), Value::from(*field)],
                format!(
                    "List should have {expected} items to match '{COLUMN_PRODUCT}', found {}",
                    values.len()
                ),
                "length_mismatch",
            )
        })
        .collect();

    if mismatched.is_empty() {
        Ok(())
    } else {
        Err(GatewayError::Validation(mismatched))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, StatusCode};

    async fn extract(content_type: Option<&str>, body: &str) -> Result<AnnotationBatch, GatewayError> {
        let mut builder = Request::builder().method("POST").uri("/writes3/");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let req = builder.body(Body::from(body.to_string())).unwrap();
        ValidatedBatch::from_request(req, &()).await.map(|v| v.0)
    }

    async fn violations(body: serde_json::Value) -> Vec<FieldViolation> {
        match extract(Some("application/json"), &body.to_string()).await {
            Err(GatewayError::Validation(v)) => v,
            other => panic!("検証エラーを期待: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_valid_payload() {
        let body = serde_json::json!({
            "product": ["Tablette graphique"],
            "code": ["05.4.0.3"],
            "coicop": ["Ustensiles et articles de cuisine (SD)"],
            "timestamp": ["2024-09-11T14:53:16.723Z"],
            "extra": 42
        });
        let batch = extract(Some("application/json"), &body.to_string()).await.unwrap();
        assert_eq!(batch.product, vec!["Tablette graphique"]);
        assert_eq!(batch.timestamp, vec!["2024-09-11T14:53:16.723Z"]);
    }

    #[tokio::test]
    async fn test_empty_arrays_are_valid() {
        let body = serde_json::json!({"product": [], "code": [], "coicop": [], "timestamp": []});
        let batch = extract(Some("application/json"), &body.to_string()).await.unwrap();
        assert!(batch.is_empty());
    }

    #[tokio::test]
    async fn test_missing_field() {
        let v = violations(serde_json::json!({"product": [], "code": [], "coicop": []})).await;
        assert_eq!(v.len(), 1);
        assert_eq!(v[0].kind, "missing");
        assert_eq!(v[0].loc, vec![Value::from("body"), Value::from("timestamp")]);
    }

    #[tokio::test]
    async fn test_field_not_a_list() {
        let v = violations(serde_json::json!({
            "product": "not-a-list",
            "code": [],
            "coicop": [],
            "timestamp": []
        }))
        .await;
        assert_eq!(v[0].kind, "list_type");
        assert_eq!(v[0].loc, vec![Value::from("body"), Value::from("product")]);
    }

    #[tokio::test]
    async fn test_non_string_element_has_index_loc() {
        let v = violations(serde_json::json!({
            "product": ["a", "b"],
            "code": ["1", 2],
            "coicop": ["x", "y"],
            "timestamp": ["t", "u"]
        }))
        .await;
        assert_eq!(v[0].kind, "string_type");
        assert_eq!(
            v[0].loc,
            vec![Value::from("body"), Value::from("code"), Value::from(1)]
        );
    }

    #[tokio::test]
    async fn test_mismatched_lengths_are_rejected() {
        let v = violations(serde_json::json!({
            "product": ["a", "b"],
            "code": ["1"],
            "coicop": [],
            "timestamp": []
        }))
        .await;
        assert_eq!(v.len(), 3);
        assert!(v.iter().all(|x| x.kind == "length_mismatch"));
        assert_eq!(v[0].loc, vec![Value::from("body"), Value::from("code")]);
        assert!(v[0].msg.contains("found 1"));
    }

    #[tokio::test]
    async fn test_invalid_json_and_non_object() {
        match extract(Some("application/json"), "{not json").await {
            Err(GatewayError::Validation(v)) => assert_eq!(v[0].kind, "json_invalid"),
            other => panic!("検証エラーを期待: {other:?}"),
        }
        let v = violations(serde_json::json!([[], [], [], []])).await;
        assert_eq!(v[0].kind, "model_attributes_type");
    }

    #[tokio::test]
    async fn test_body_without_json_content_type_is_rejected() {
        let body = serde_json::json!({"product": [], "code": [], "coicop": [], "timestamp": []});
        for content_type in [None, Some("text/plain")] {
            match extract(content_type, &body.to_string()).await {
                Err(GatewayError::Rejected { status, .. }) => {
                    assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE)
                }
                other => panic!("415を期待: {other:?}"),
            }
        }
    }
}
