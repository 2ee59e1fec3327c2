//! # アノテーションGateway 共有型定義
//!
//! `POST /writes3/` のリクエスト・レスポンスと、検証エラーの構造体を提供する。
//!
//! ## 列の規則
//! - 4列（`product`, `code`, `coicop`, `timestamp`）はすべて文字列配列
//! - i番目の要素同士が1レコードを構成する（インデックスで整列）

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// 列定義
// ---------------------------------------------------------------------------

/// 商品名の列名。
pub const COLUMN_PRODUCT: &str = "product";
/// 商品コードの列名。
pub const COLUMN_CODE: &str = "code";
/// COICOP分類の列名。
pub const COLUMN_COICOP: &str = "coicop";
/// 記録時刻の列名。
pub const COLUMN_TIMESTAMP: &str = "timestamp";

/// リクエストスキーマの列名（出現順）。Parquetファイルの列順もこれに従う。
pub const COLUMNS: [&str; 4] = [COLUMN_PRODUCT, COLUMN_CODE, COLUMN_COICOP, COLUMN_TIMESTAMP];

// ---------------------------------------------------------------------------
// /writes3 (リクエスト・レスポンス)
// ---------------------------------------------------------------------------

/// アノテーションのバッチ。4つの並列な文字列配列からなる。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationBatch {
    /// 商品名
    pub product: Vec<String>,
    /// 商品コード
    pub code: Vec<String>,
    /// COICOP分類
    pub coicop: Vec<String>,
    /// 記録時刻（ISO 8601文字列、解釈はしない）
    pub timestamp: Vec<String>,
}

impl AnnotationBatch {
    /// 列名と値の組を列順に返す。
    pub fn columns(&self) -> [(&'static str, &[String]); 4] {
        [
            (COLUMN_PRODUCT, self.product.as_slice()),
            (COLUMN_CODE, self.code.as_slice()),
            (COLUMN_COICOP, self.coicop.as_slice()),
            (COLUMN_TIMESTAMP, self.timestamp.as_slice()),
        ]
    }

    /// レコード数。整列済みのバッチでのみ意味を持つ（`product`の長さを基準とする）。
    pub fn len(&self) -> usize {
        self.product.len()
    }

    /// レコードが0件かどうか。
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 4列すべての長さが一致しているかどうか。
    pub fn is_aligned(&self) -> bool {
        let n = self.len();
        self.columns().iter().all(|(_, values)| values.len() == n)
    }
}

/// `POST /writes3/` の成功レスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteResponse {
    /// バケット名を先頭に含む保存先パス
    pub filename: String,
    /// データエクスプローラーのプレビューURL
    pub preview: String,
}

// ---------------------------------------------------------------------------
// 検証エラー
// ---------------------------------------------------------------------------

/// 1フィールド分の検証エラー。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    /// エラー位置（例: `["body", "product", 2]`）
    pub loc: Vec<serde_json::Value>,
    /// 人間向けメッセージ
    pub msg: String,
    /// 機械判定用の種別（`missing`, `list_type`, `string_type`, `json_invalid`, `length_mismatch` 等）
    #[serde(rename = "type")]
    pub kind: String,
}

/// 検証エラー時のレスポンスボディ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorBody {
    /// フィールドごとのエラー
    pub detail: Vec<FieldViolation>,
}

// ---------------------------------------------------------------------------
// ヘルスチェック
// ---------------------------------------------------------------------------

/// `GET /healthz` レスポンス。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 常に `"ok"`
    pub status: String,
    /// Gatewayのバージョン
    pub version: String,
}
