//! HTTP API
//!
//! - GET  /api/health   -> 稼働状況とモデルの読み込み状態
//! - GET  /api/classes  -> クラス一覧
//! - POST /api/predict  -> 画像分類（メモリ上で処理）

pub mod error;
pub mod handlers;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use error::ApiError;
pub use state::AppState;

/// ルーターを組み立てる
pub fn construct_router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/api/health", get(handlers::health_check))
        .route("/api/classes", get(handlers::list_classes))
        .route("/api/predict", post(handlers::predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
