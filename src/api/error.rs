use axum::{
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

pub const NO_IMAGE: &str = "No image file provided";
pub const EMPTY_FILENAME: &str = "Empty filename";
pub const MODEL_NOT_LOADED: &str = "Model not loaded. Please check server logs.";
pub const PREDICTION_FAILED: &str = "Prediction failed";
pub const PROCESSING_FAILED: &str = "Failed to process image";
pub const CLASSES_NOT_LOADED: &str = "Class names not loaded";
pub const CLASSES_FAILED: &str = "Failed to get classes";
pub const IMAGE_TOO_LARGE: &str = "Image too large";

/// `{"error": "..."}` として返すエラー
///
/// 内部の詳細はログにのみ出力し、レスポンスには公開用メッセージだけを載せる。
#[derive(Debug, Clone)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        let msg = msg.into();
        tracing::warn!("Bad request: {}", msg);
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg,
        }
    }

    pub fn payload_too_large() -> Self {
        tracing::warn!("Payload too large");
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: IMAGE_TOO_LARGE.to_string(),
        }
    }

    /// 500。`details` はログにだけ残る
    pub fn internal(public_message: impl Into<String>, details: impl std::fmt::Display) -> Self {
        let message = public_message.into();
        tracing::error!("Internal error: {} ({})", message, details);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }

    /// multipartの読み取りエラーを分類する
    ///
    /// サイズ超過は413、それ以外は `fallback` を使う。
    pub fn from_multipart(err: MultipartError, fallback: impl FnOnce(MultipartError) -> Self) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::payload_too_large()
        } else {
            fallback(err)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorBody<'a> {
            error: &'a str,
        }

        (
            self.status,
            Json(ErrorBody {
                error: &self.message,
            }),
        )
            .into_response()
    }
}
