//! Uniform error envelope for HTTP responses.
//!
//! Every failed HTTP request is answered with `{"status": ..., "message": ...}`
//! where `status` is `"fail"` for client errors and `"error"` for server errors.

use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use chess_relay::server::WsServerError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Internal(String),
}

impl From<WsServerError> for ApiError {
    fn from(value: WsServerError) -> Self {
        Self::Internal(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: String,
    pub message: String,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status_code = self.status_code();

        if status_code.is_server_error() {
            log::error!("Request failed: {self}");
        } else {
            log::debug!("Request failed: {self}");
        }

        HttpResponse::build(status_code).json(ErrorResponse {
            status: if status_code.is_client_error() {
                "fail"
            } else {
                "error"
            }
            .to_string(),
            message: self.to_string(),
        })
    }
}
