//! Environment-backed configuration, read once at startup after `.env`
//! has been loaded.

use std::env;
use std::path::PathBuf;

pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    /// Server-held signing secret for session tokens; required.
    pub jwt_secret: String,
    pub upload_dir: PathBuf,
    pub client_origin: String,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(5000),
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "sqlite:quill.db".to_string()),
            jwt_secret: env::var("JWT_SECRET").expect("JWT_SECRET must be set"),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data/uploads")),
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),
        }
    }
}
