//! # Domain Models
//!
//! These structs represent the core entities of Quill.
//! We use UUID v7 for time-ordered, globally unique identification;
//! the public-facing `user_id` is a plain v4.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    /// Public-facing identifier, distinct from the primary key
    pub user_id: Uuid,
    /// Stored lowercased and trimmed; unique across all users
    pub email: String,
    pub username: String,
    /// Argon2 digest of the password; never serialized into a response
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Currently selected avatar path, empty when unset
    pub avatar: String,
    /// Append-only history of every avatar path the user uploaded
    pub avatars: Vec<String>,
    pub preferences: Preferences,
    pub stats: Stats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Builds a fresh account record around an already-hashed secret.
    pub fn new(email: String, username: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            user_id: Uuid::new_v4(),
            email,
            username,
            password_hash,
            avatar: String::new(),
            avatars: Vec::new(),
            preferences: Preferences::default(),
            stats: Stats::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Per-user settings, replaced wholesale on update (no field-level merge).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
    pub dark_mode: bool,
}

/// Denormalized counters kept on the user row.
///
/// `posts` is incremented independently of the actual post count;
/// the two are not reconciled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub posts: i64,
    pub likes: i64,
}

/// A partial profile update; at least one field must be present.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfilePatch {
    pub username: Option<String>,
    pub email: Option<String>,
}

impl ProfilePatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.email.is_none()
    }
}

/// A published blog post.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    /// References a User id; not enforced by the store, so a deleted
    /// author leaves this dangling
    pub author_id: Uuid,
    pub reading_time: String,
    /// Absolute URL of the uploaded header image, when one was attached
    pub image: Option<String>,
    pub description: Option<String>,
    pub content: String,
    pub tags: Vec<String>,
    pub links: Vec<String>,
    /// Users who liked the post; no endpoint mutates this yet
    pub likes: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The author fields exposed alongside a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorRef {
    pub id: Uuid,
    pub username: String,
    pub avatar: String,
}

/// A post joined with its author; `author` is None when the author
/// row no longer exists.
#[derive(Debug, Clone, Serialize)]
pub struct PostWithAuthor {
    #[serde(flatten)]
    pub post: Post,
    pub author: Option<AuthorRef>,
}

/// Verified token contents, handed from the token service to the auth gate.
#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    #[serde(rename = "id")]
    pub user_id: Uuid,
    #[serde(rename = "iat")]
    pub issued_at: i64,
    #[serde(rename = "exp")]
    pub expires_at: i64,
}
