//! # quill-api
//!
//! The web routing and orchestration layer for Quill.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod uploads;

use actix_web::{web, HttpResponse};
use quill_core::traits::{MediaStore, PasswordHasher, PostRepo, TokenService, UserRepo};
use serde_json::json;

/// State shared across all Actix-web workers.
pub struct AppState {
    pub users: Box<dyn UserRepo>,
    pub posts: Box<dyn PostRepo>,
    pub media: Box<dyn MediaStore>,
    pub hasher: Box<dyn PasswordHasher>,
    pub tokens: Box<dyn TokenService>,
}

async fn health() -> HttpResponse {
    HttpResponse::Ok().json(json!({ "ok": true }))
}

/// Configures the routes for the blog backend.
///
/// # Developer Note
/// We use a scoped configuration to allow the main binary to mount
/// the API under different paths if needed (e.g., /api/v1/).
/// Protected routes take `CurrentUser` as a handler argument, which is
/// where the auth gate runs.
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/signup", web::post().to(handlers::auth::signup))
            .route("/login", web::post().to(handlers::auth::login))
            .route("/verify", web::get().to(handlers::auth::verify))
            .route("/me", web::get().to(handlers::auth::me))
            .route("/update", web::put().to(handlers::auth::update_profile))
            .route("/preferences", web::put().to(handlers::auth::update_preferences))
            .route("/avatar", web::post().to(handlers::auth::upload_avatar))
            .route("/avatar/select", web::put().to(handlers::auth::select_avatar))
            .route("/delete", web::delete().to(handlers::auth::delete_account))
            .route("/stats/post", web::post().to(handlers::auth::increment_post_stat))
            .route("/stats", web::get().to(handlers::auth::stats)),
    )
    .service(
        web::scope("/blogs")
            .route("", web::post().to(handlers::blogs::create_post))
            .route("", web::get().to(handlers::blogs::list_posts))
            .route("/{id}", web::get().to(handlers::blogs::get_post)),
    )
    .route("/health", web::get().to(health));
}
