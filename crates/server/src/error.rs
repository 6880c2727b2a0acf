use axum::{
    extract::{multipart::MultipartError, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use insight_ocr::PipelineError;
use insight_predict::{ChurnError, ForecastError, TableError};
use insight_storage::StorageError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    /// Bad file type, missing columns, bad parameter values.
    #[error("{0}")]
    BadRequest(String),
    /// A required form part is missing or has the wrong type.
    #[error("{0}")]
    Unprocessable(String),
    #[error("invalid api key")]
    Unauthorized,
    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Unprocessable(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "unprocessable_entity", msg)
            }
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "invalid api key".to_string(),
            ),
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error, message })).into_response()
    }
}

impl From<StorageError> for ApiError {
    fn from(e: StorageError) -> Self {
        ApiError::Internal(e.to_string())
    }
}

impl From<PipelineError> for ApiError {
    fn from(e: PipelineError) -> Self {
        if e.is_bad_input() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl From<ForecastError> for ApiError {
    fn from(e: ForecastError) -> Self {
        if e.is_validation() {
            ApiError::BadRequest(e.to_string())
        } else {
            ApiError::Internal(e.to_string())
        }
    }
}

impl From<ChurnError> for ApiError {
    fn from(e: ChurnError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<TableError> for ApiError {
    fn from(e: TableError) -> Self {
        ApiError::BadRequest(e.to_string())
    }
}

impl From<MultipartError> for ApiError {
    fn from(e: MultipartError) -> Self {
        ApiError::BadRequest(format!("Failed to read upload: {}", e.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::BadRequest(e.body_text())
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        ApiError::Internal(format!("worker task failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn unauthorized_has_fixed_message() {
        let resp = ApiError::Unauthorized.into_response();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(resp).await,
            serde_json::json!({"error": "unauthorized", "message": "invalid api key"})
        );
    }

    #[tokio::test]
    async fn internal_detail_is_not_leaked() {
        let resp = ApiError::Internal("disk on fire at /secret".into()).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn unreadable_pdf_is_a_bad_request() {
        let err = PipelineError::from(insight_ocr::DocumentError::Rasterize(
            "Syntax Error: Couldn't read xref table".to_string(),
        ));
        let resp = ApiError::from(err).into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "bad_request");
    }

    #[test]
    fn missing_pdftoppm_is_internal() {
        let err = PipelineError::from(insight_ocr::DocumentError::ToolNotFound);
        assert!(matches!(ApiError::from(err), ApiError::Internal(_)));
    }

    #[test]
    fn forecast_errors_split_by_cause() {
        assert!(matches!(
            ApiError::from(ForecastError::MissingColumns),
            ApiError::BadRequest(_)
        ));
        assert!(matches!(
            ApiError::from(ForecastError::Fit(insight_predict::FitError::TooShort(2))),
            ApiError::Internal(_)
        ));
    }
}
