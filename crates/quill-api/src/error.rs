//! HTTP mapping for the core error taxonomy.
//!
//! Internal details never cross the boundary: clients get a generic
//! message while the cause is logged server-side.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use quill_core::error::AppError;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub struct ApiError(pub AppError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// The client-facing message for this error.
    pub fn message(&self) -> String {
        match &self.0 {
            AppError::NotFound(what, _) => format!("{what} not found"),
            AppError::ValidationError(msg)
            | AppError::Unauthorized(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::Internal(_) => "Server error".to_string(),
        }
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self.0 {
            AppError::NotFound(..) => StatusCode::NOT_FOUND,
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let AppError::Internal(detail) = &self.0 {
            log::error!("{detail}");
        }
        HttpResponse::build(self.status_code()).json(json!({ "message": self.message() }))
    }
}
