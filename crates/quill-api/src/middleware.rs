//! quill/crates/quill-api/src/middleware.rs
//!
//! The auth gate and the CORS policy.

use actix_cors::Cors;
use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::middleware::Logger;
use actix_web::{web, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;
use quill_core::error::AppError;
use quill_core::models::User;

use crate::error::ApiError;
use crate::AppState;

/// Pulls the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(req: &HttpRequest) -> Result<&str, ApiError> {
    let raw = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| ApiError(AppError::Unauthorized("No token provided".to_string())))?;

    raw.strip_prefix("Bearer ")
        .ok_or_else(|| ApiError(AppError::Unauthorized("Invalid or expired token".to_string())))
}

/// The identity resolved by the auth gate, handed to protected handlers
/// as an explicit argument.
///
/// Extraction verifies the bearer token and resolves its subject to a
/// live user record; a token whose subject no longer exists is rejected
/// the same way as an invalid token. Each request is authenticated
/// independently.
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = ApiError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let req = req.clone();
        Box::pin(async move {
            let token = bearer_token(&req)?;
            let state = req
                .app_data::<web::Data<AppState>>()
                .ok_or_else(|| ApiError(AppError::Internal("app state not configured".into())))?;

            let claims = state.tokens.verify(token)?;
            let user = state
                .users
                .find_by_id(claims.user_id)
                .await?
                .ok_or_else(|| {
                    AppError::Unauthorized("Invalid or expired token".to_string())
                })?;

            Ok(CurrentUser(user))
        })
    }
}

// Returns the standard request-logging middleware.
// The 'default' logger outputs:
// remote-ip "request-line" status-code response-size "referrer" "user-agent"
pub fn standard_middleware() -> Logger {
    Logger::default()
}

/// Configures CORS (Cross-Origin Resource Sharing).
/// Credentials are only supported when a concrete client origin is set.
pub fn cors_policy(client_origin: &str) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE"])
        .allow_any_header()
        .max_age(3600);

    if client_origin == "*" {
        cors.allow_any_origin()
    } else {
        cors.allowed_origin(client_origin).supports_credentials()
    }
}
