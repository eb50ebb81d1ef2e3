//! HTTP request handlers

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};

use crate::api::error::{self, ApiError};
use crate::api::state::AppState;
use crate::ml::classify_bytes;
use crate::taxonomy;
use crate::types::{ClassesResponse, HealthResponse, PredictionResult};

/// 画像を受け取るmultipartフィールド名
pub const IMAGE_FIELD: &str = "image";

/// ヘルスチェック（常に200）
pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let status = if state.model_loaded() {
        "healthy"
    } else {
        "unhealthy"
    };

    let health = HealthResponse {
        status: status.to_string(),
        model_loaded: state.model_loaded(),
        classes_loaded: state.class_map.len(),
        processing: "in-memory".to_string(),
    };

    (StatusCode::OK, Json(health))
}

/// クラス一覧（インデックス順）
pub async fn list_classes(State(state): State<AppState>) -> Result<Json<ClassesResponse>, ApiError> {
    if state.class_map.is_empty() {
        return Err(ApiError::internal(error::CLASSES_NOT_LOADED, "class map is empty"));
    }

    let classes = state
        .class_map
        .ordered_labels()
        .map_err(|e| ApiError::internal(error::CLASSES_FAILED, e))?;

    Ok(Json(ClassesResponse {
        total: classes.len(),
        classes,
    }))
}

/// アップロード画像を分類
///
/// 検証順: imageフィールド → ファイル名 → モデルの有無 → 推論
pub async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PredictionResult>, ApiError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("multipart rejected: {}", e);
        ApiError::bad_request(error::NO_IMAGE)
    })?;

    let (classifier, image_bytes) = loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return Err(ApiError::bad_request(error::NO_IMAGE)),
            Err(e) => {
                return Err(ApiError::from_multipart(e, |e| {
                    tracing::debug!("multipart parse error: {}", e);
                    ApiError::bad_request(error::NO_IMAGE)
                }))
            }
        };

        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        // filename属性のないパートはファイルとして扱わない
        let Some(file_name) = field.file_name().map(str::to_owned) else {
            continue;
        };

        if file_name.is_empty() {
            return Err(ApiError::bad_request(error::EMPTY_FILENAME));
        }

        let Some(classifier) = state.classifier.clone() else {
            return Err(ApiError::internal(error::MODEL_NOT_LOADED, "model is not loaded"));
        };

        let bytes = field.bytes().await.map_err(|e| {
            ApiError::from_multipart(e, |e| ApiError::internal(error::PROCESSING_FAILED, e))
        })?;

        tracing::debug!(file_name = %file_name, size = bytes.len(), "画像を受信しました");
        break (classifier, bytes);
    };

    let class_map = state.class_map.clone();
    let prediction = tokio::task::spawn_blocking(move || {
        classify_bytes(classifier.as_ref(), &class_map, &image_bytes)
    })
    .await
    .map_err(|e| ApiError::internal(error::PROCESSING_FAILED, format!("推論スレッドエラー: {}", e)))?;

    let (label, confidence) = prediction
        .ok_or_else(|| ApiError::internal(error::PREDICTION_FAILED, "classifier returned no result"))?;

    let result = taxonomy::describe(&label, confidence);
    tracing::info!(
        label = %result.label,
        confidence = result.confidence_percentage,
        category = %result.category,
        "予測しました"
    );

    Ok(Json(result))
}
