//! # アノテーションGateway
//!
//! 商品アノテーションのバッチを受け取り、オブジェクトストレージ上の
//! 日付パーティションに連番付きのParquetファイルとして追記するHTTPサービス。
//!
//! ## 役割
//! - リクエストボディの検証（4列の文字列配列、長さ一致）
//! - 当日パーティション内の次の連番ファイル名の割り当て
//! - Parquetへのシリアライズとストレージへの書き込み
//! - 保存先パスとデータエクスプローラーのプレビューURLの返却
//!
//! ## API エンドポイント
//! - `POST /writes3/`: アノテーションの保存
//! - `GET /healthz`: 死活監視

mod columnar;
mod config;
mod endpoints;
mod error;
mod layout;
mod storage;
mod validate;
mod writer;

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::config::{GatewayConfig, GatewayState, StorageBackend};
use crate::storage::{AnnotationStorage, MemoryStorage};

/// ルーターを構築する。
///
/// CORSはすべてのオリジン・メソッド・ヘッダーを許可し、認証情報は許可しない。
fn build_router(state: Arc<GatewayState>, request_timeout: Duration) -> axum::Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    axum::Router::new()
        .route("/writes3/", axum::routing::post(endpoints::handle_writes3))
        .route("/writes3", axum::routing::post(endpoints::handle_writes3))
        .route("/healthz", axum::routing::get(endpoints::handle_health))
        .with_state(state)
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// S3互換ストレージを構築する。
#[cfg(feature = "vendor-aws")]
fn s3_storage(config: &GatewayConfig) -> anyhow::Result<Arc<dyn AnnotationStorage>> {
    Ok(Arc::new(storage::S3Storage::from_settings(&config.s3)?))
}

#[cfg(not(feature = "vendor-aws"))]
fn s3_storage(_config: &GatewayConfig) -> anyhow::Result<Arc<dyn AnnotationStorage>> {
    anyhow::bail!("S3バックエンドを使うには vendor-aws feature を有効にしてください")
}

/// Ctrl-C または SIGTERM を待つ。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Ctrl-Cハンドラの登録に失敗");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "SIGTERMハンドラの登録に失敗");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("シャットダウンします");
}

// ---------------------------------------------------------------------------
// エントリポイント
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = GatewayConfig::from_env()?;

    let storage: Arc<dyn AnnotationStorage> = match config.backend {
        StorageBackend::S3 => s3_storage(&config)?,
        StorageBackend::Memory => {
            tracing::warn!("MemoryStorageで起動します（書き込みは再起動で失われます）");
            Arc::new(MemoryStorage::new(config.s3.bucket.clone()))
        }
    };

    let state = Arc::new(GatewayState::new(storage, &config));
    let app = build_router(state, config.request_timeout);

    tracing::info!(
        output_prefix = %config.output_prefix,
        timeout_secs = config.request_timeout.as_secs(),
        "Gatewayを {} で起動します",
        config.listen_addr
    );

    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

// ---------------------------------------------------------------------------
// テスト
// ---------------------------------------------------------------------------
