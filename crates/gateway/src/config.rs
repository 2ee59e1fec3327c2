//! # Gateway設定・共有状態
//!
//! 環境変数からの設定読み込みとGatewayの共有状態の定義。
//! 設定は起動時に一度だけ読み込まれ、以降変更されない。

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use crate::storage::AnnotationStorage;
use crate::writer::AnnotationWriter;

/// 既定のS3互換エンドポイント。
pub const DEFAULT_S3_ENDPOINT: &str = "https://minio.lab.sspcloud.fr";
/// 既定のバケット名。
pub const DEFAULT_BUCKET: &str = "projet-budget-famille";
/// 既定の出力プレフィックス（バケット内）。
pub const DEFAULT_OUTPUT_PREFIX: &str = "data/output-annotation";
/// 既定のプレビューURLベース。
pub const DEFAULT_PREVIEW_BASE_URL: &str = "https://datalab.sspcloud.fr/data-explorer?source=";

/// ストレージバックエンドの種別。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    /// S3互換ストレージ
    S3,
    /// プロセス内メモリ（ローカル起動用）
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "s3" => Ok(StorageBackend::S3),
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("未知のSTORAGE_BACKENDです: {other} (s3 | memory)"),
        }
    }
}

/// S3互換ストレージの接続設定。
#[derive(Debug, Clone)]
pub struct S3Settings {
    /// エンドポイントURL
    pub endpoint: String,
    /// リージョン名（MinIOでは任意の値でよい）
    pub region: String,
    /// バケット名
    pub bucket: String,
    /// アクセスキー（Noneの場合は認証情報チェーンに委ねる）
    pub access_key: Option<String>,
    /// シークレットキー
    pub secret_key: Option<String>,
    /// 一時認証のセッショントークン
    pub session_token: Option<String>,
}

/// Gatewayの起動設定。
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// 待ち受けアドレス
    pub listen_addr: SocketAddr,
    /// ストレージバックエンド
    pub backend: StorageBackend,
    /// S3互換ストレージ設定（`backend` がMemoryの場合もバケット名は使われる）
    pub s3: S3Settings,
    /// バケット内の出力プレフィックス
    pub output_prefix: String,
    /// プレビューURLのベース
    pub preview_base_url: String,
    /// リクエストタイムアウト
    pub request_timeout: Duration,
}

impl GatewayConfig {
    /// 環境変数から構築する。未設定の項目は既定値を使う。
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// 任意の参照関数から構築する（テスト用に環境変数を差し替えられる）。
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        // 複数の名前を先頭から順に試す。空文字列は未設定とみなす。
        let get = |names: &[&str]| -> Option<String> {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|v| !v.is_empty())
        };

        let listen_addr: SocketAddr = get(&["LISTEN_ADDR"])
            .unwrap_or_else(|| "0.0.0.0:3000".to_string())
            .parse()
            .context("LISTEN_ADDRはホスト:ポート形式である必要があります")?;

        let backend = get(&["STORAGE_BACKEND"])
            .map(|s| s.parse::<StorageBackend>())
            .transpose()?
            .unwrap_or(StorageBackend::S3);

        let s3 = S3Settings {
            endpoint: get(&["S3_ENDPOINT", "AWS_S3_ENDPOINT"])
                .map(|ep| normalize_endpoint(&ep))
                .unwrap_or_else(|| DEFAULT_S3_ENDPOINT.to_string()),
            region: get(&["S3_REGION", "AWS_DEFAULT_REGION"])
                .unwrap_or_else(|| "us-east-1".to_string()),
            bucket: get(&["S3_BUCKET"]).unwrap_or_else(|| DEFAULT_BUCKET.to_string()),
            access_key: get(&["AWS_ACCESS_KEY_ID", "S3_ACCESS_KEY"]),
            secret_key: get(&["AWS_SECRET_ACCESS_KEY", "S3_SECRET_KEY"]),
            session_token: get(&["AWS_SESSION_TOKEN"]),
        };

        let output_prefix = get(&["OUTPUT_PREFIX"])
            .unwrap_or_else(|| DEFAULT_OUTPUT_PREFIX.to_string())
            .trim_matches('/')
            .to_string();

        let preview_base_url = get(&["PREVIEW_BASE_URL"])
            .unwrap_or_else(|| DEFAULT_PREVIEW_BASE_URL.to_string());

        let timeout_secs = get(&["REQUEST_TIMEOUT_SECS"])
            .map(|s| s.parse::<u64>())
            .transpose()
            .context("REQUEST_TIMEOUT_SECSは秒数（整数）である必要があります")?
            .unwrap_or(30);

        Ok(Self {
            listen_addr,
            backend,
            s3,
            output_prefix,
            preview_base_url,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// スキームのないエンドポイント（SSPCloudの `AWS_S3_ENDPOINT` 等）にhttpsを補う。
fn normalize_endpoint(endpoint: &str) -> String {
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        endpoint.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", endpoint.trim_end_matches('/'))
    }
}

/// Gatewayの共有状態。
pub struct GatewayState {
    /// アノテーション書き込み処理
    pub writer: AnnotationWriter,
}

impl GatewayState {
    /// ストレージと設定から共有状態を構築する。
    pub fn new(storage: Arc<dyn AnnotationStorage>, config: &GatewayConfig) -> Self {
        Self {
            writer: AnnotationWriter::new(
                storage,
                config.output_prefix.clone(),
                config.preview_base_url.clone(),
            ),
        }
    }
}
