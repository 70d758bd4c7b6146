use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use devcamper_core::error::AppError;

use crate::dto::ErrorResponse;

/// Wrapper so we can implement `IntoResponse` for `AppError`.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(AppError::Validation(rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self(AppError::Validation(rejection.body_text()))
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self(AppError::UploadRejected(format!(
            "Please upload a file: {}",
            rejection.body_text()
        )))
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self(AppError::UploadRejected(err.body_text()))
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::NotFound { .. } | AppError::MalformedId(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::DuplicateKey(_)
            | AppError::UploadRejected(_)
            | AppError::SerializationError(_) => StatusCode::BAD_REQUEST,
            AppError::GeocoderError(_) => StatusCode::BAD_GATEWAY,
            AppError::DatabaseError(_)
            | AppError::ConfigError(_)
            | AppError::IoError(_)
            | AppError::Generic(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        match &self.0 {
            AppError::DuplicateKey(constraint) => {
                tracing::debug!(constraint = %constraint, "Duplicate key rejected");
            }
            err if status.is_server_error() => {
                tracing::error!(status = status.as_u16(), error = %err, "Request failed");
            }
            _ => {}
        }

        let body = ErrorResponse {
            success: false,
            error: self.0.to_string(),
        };

        (status, axum::Json(body)).into_response()
    }
}
