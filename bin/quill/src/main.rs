//! # Quill Binary
//!
//! The entry point that assembles the application based on compile-time features.

use actix_web::{web, App, HttpServer};
use quill_api::middleware::{cors_policy, standard_middleware};
use quill_api::{configure_routes, AppState};

mod config;
use config::AppConfig;

// Feature-gated imports: This is the "Compiled-to-Order" magic
#[cfg(feature = "db-sqlite")]
use quill_db_sqlite::{SqlitePostRepo, SqliteUserRepo};

#[cfg(feature = "storage-local")]
use quill_storage_local::LocalMediaStore;

#[cfg(feature = "auth-jwt")]
use quill_auth_jwt::{Argon2PasswordHasher, JwtTokenService};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let config = AppConfig::from_env();

    // Uploaded files must have somewhere to land before the first request.
    std::fs::create_dir_all(&config.upload_dir)?;

    // 1. Initialize Database Implementation
    #[cfg(feature = "db-sqlite")]
    let pool = quill_db_sqlite::connect(&config.database_url)
        .await
        .expect("Failed to init SQLite");

    // 2. Initialize Storage Implementation
    #[cfg(feature = "storage-local")]
    let media = LocalMediaStore::new(config.upload_dir.clone(), "/uploads".to_string());

    // 3. Initialize Auth Implementations
    #[cfg(feature = "auth-jwt")]
    let hasher = Argon2PasswordHasher;
    #[cfg(feature = "auth-jwt")]
    let tokens = JwtTokenService::new(&config.jwt_secret);

    // 4. Wrap in AppState (Using dynamic dispatch for maximum flexibility)
    let state = web::Data::new(AppState {
        users: Box::new(SqliteUserRepo::new(pool.clone())),
        posts: Box::new(SqlitePostRepo::new(pool)),
        media: Box::new(media),
        hasher: Box::new(hasher),
        tokens: Box::new(tokens),
    });

    log::info!(
        "🚀 Quill starting on http://{}:{}",
        config.host,
        config.port
    );

    let client_origin = config.client_origin.clone();
    let upload_dir = config.upload_dir.clone();

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(standard_middleware())
            .wrap(cors_policy(&client_origin))
            .configure(configure_routes)
            .service(actix_files::Files::new("/uploads", &upload_dir))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    Ok(())
}
