//! Maps [`crawlctl_core::Error`] onto the REST error envelope (§6/§7)

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use crawlctl_core::{Error, ErrorEnvelope};

pub struct ApiError(pub Error);

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let envelope = ErrorEnvelope::from(&self.0);
        let status = StatusCode::from_u16(envelope.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(envelope)).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
