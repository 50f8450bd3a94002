use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::services::error::{FieldErrors, ServiceError};

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] ServiceError),
    /// The body could not be read as JSON of the expected shape
    #[error(transparent)]
    Body(#[from] JsonRejection),
    /// A query parameter could not be parsed
    #[error("Invalid query parameters: {0}")]
    Params(FieldErrors),
    #[error("{0}")]
    Unauthenticated(&'static str),
    #[error("Method \"{0}\" not allowed.")]
    MethodNotAllowed(Method),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn not_provided() -> Self {
        Self::Unauthenticated("Authentication credentials were not provided.")
    }

    pub fn invalid_token() -> Self {
        Self::Unauthenticated("Invalid token.")
    }
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Service(ServiceError::NotFound { .. }) => {
                detail(StatusCode::NOT_FOUND, "Not found.")
            }
            ApiError::Service(ServiceError::InvalidPage(_)) => {
                detail(StatusCode::NOT_FOUND, "Invalid page.")
            }
            ApiError::Service(ServiceError::Validation(errors)) | ApiError::Params(errors) => {
                (StatusCode::BAD_REQUEST, Json(errors)).into_response()
            }
            ApiError::Service(ServiceError::Database(err)) => {
                log::error!("Database error while handling request: {err:?}");
                detail(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A server error occurred.",
                )
            }
            ApiError::Body(rejection) => {
                let status = match rejection {
                    JsonRejection::MissingJsonContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
                    _ => StatusCode::BAD_REQUEST,
                };
                detail(status, rejection.body_text())
            }
            ApiError::Unauthenticated(message) => {
                let mut response = detail(StatusCode::UNAUTHORIZED, message);
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Token"));
                response
            }
            ApiError::MethodNotAllowed(method) => detail(
                StatusCode::METHOD_NOT_ALLOWED,
                format!("Method \"{method}\" not allowed."),
            ),
        }
    }
}

/// Fallback for verbs a resource does not offer.
pub async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}
