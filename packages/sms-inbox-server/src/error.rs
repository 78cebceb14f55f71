//! API error responses.
//!
//! Every failing `/api` call answers with `{"error": "<message>"}`; this is
//! the only place status codes for those failures are chosen.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sms_inbox_core::ErrorBody;
use thiserror::Error;

use crate::gateway::GatewayError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::BadRequest(_) | ApiError::Gateway(GatewayError::InvalidCursor) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Gateway(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), "Request failed: {}", self);
        }
        (status, Json(ErrorBody { error: self.to_string() })).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
