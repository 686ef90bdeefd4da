use axum::async_trait;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Request};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::de::DeserializeOwned;
use serde::Serialize;

use carimpact_analytics::{AnalysisError, ProviderError};

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub code: String,
}

/// HTTP-facing error: the analysis taxonomy mapped to a status and a stable
/// machine-readable code, so the dashboard can message "couldn't load data"
/// differently from "your input parameters are invalid".
#[derive(Debug, Clone)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
    is_operational: bool,
}

impl AppError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_REQUEST, "INVALID_PARAMETER", message)
    }

    pub fn insufficient_data(message: impl Into<String>) -> Self {
        Self::operational(
            StatusCode::UNPROCESSABLE_ENTITY,
            "INSUFFICIENT_DATA",
            message,
        )
    }

    pub fn data_source(message: impl Into<String>) -> Self {
        Self::operational(StatusCode::BAD_GATEWAY, "DATA_SOURCE_ERROR", message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            code: "INTERNAL_ERROR".to_string(),
            message: message.into(),
            is_operational: false,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    fn operational(
        status: StatusCode,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            status,
            code: code.into(),
            message: message.into(),
            is_operational: true,
        }
    }
}

/// JSON body extractor whose rejections use the same error envelope as every
/// other failure, instead of axum's plain-text default.
pub struct AppJson<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(AppJson(value)),
            Err(rejection) => Err(app_error_from_rejection(rejection)),
        }
    }
}

fn app_error_from_rejection(rejection: JsonRejection) -> AppError {
    AppError::invalid_parameter(rejection.body_text())
}

impl From<AnalysisError> for AppError {
    fn from(err: AnalysisError) -> Self {
        match err {
            AnalysisError::InvalidParameter(message) => Self::invalid_parameter(message),
            AnalysisError::InsufficientData(message) => Self::insufficient_data(message),
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::UnknownDealer(id) => Self::not_found(format!("unknown dealer {id}")),
            ProviderError::Fetch(message) => Self::data_source(message),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let message = if self.is_operational {
            self.message
        } else {
            "internal server error".to_string()
        };

        let body = ErrorResponse {
            success: false,
            error: message,
            code: self.code,
        };

        (self.status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analysis_error_mapping_preserves_kind() {
        let err: AppError = AnalysisError::InvalidParameter("bad dates".to_string()).into();
        assert_eq!(err.code(), "INVALID_PARAMETER");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);

        let err: AppError = AnalysisError::InsufficientData("short window".to_string()).into();
        assert_eq!(err.code(), "INSUFFICIENT_DATA");
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_provider_error_mapping_is_distinct() {
        let err: AppError = ProviderError::UnknownDealer(7).into();
        assert_eq!(err.code(), "NOT_FOUND");

        let err: AppError = ProviderError::Fetch("timeout".to_string()).into();
        assert_eq!(err.code(), "DATA_SOURCE_ERROR");
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_internal_error_hides_message() {
        let err = AppError::internal("secret detail");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
