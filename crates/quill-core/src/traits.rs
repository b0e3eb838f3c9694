//! # Core Traits (Ports)
//!
//! Any plugin must implement these traits to be used by the binary.

use crate::error::Result;
use crate::models::{AuthToken, Post, PostWithAuthor, Preferences, ProfilePatch, Stats, User};
use async_trait::async_trait;
use uuid::Uuid;

/// Data persistence contract for account records.
#[async_trait]
pub trait UserRepo: Send + Sync {
    async fn create(&self, user: User) -> Result<User>;
    /// Lookup by normalized (lowercased) email.
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Applies a partial username/email patch; returns the updated row.
    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> Result<Option<User>>;
    /// Replaces the whole preferences record; no field-level merge.
    async fn replace_preferences(&self, id: Uuid, prefs: Preferences) -> Result<Option<User>>;

    /// Appends `path` to the upload history and makes it the active avatar.
    async fn add_avatar(&self, id: Uuid, path: &str) -> Result<Option<User>>;
    /// Switches the active avatar to an already-uploaded path.
    async fn set_avatar(&self, id: Uuid, path: &str) -> Result<()>;

    /// Single-statement increment of the posts counter.
    async fn increment_post_count(&self, id: Uuid) -> Result<Stats>;
    async fn stats(&self, id: Uuid) -> Result<Option<Stats>>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Data persistence contract for posts.
#[async_trait]
pub trait PostRepo: Send + Sync {
    /// Inserts the post and returns it with the author expanded.
    async fn create(&self, post: Post) -> Result<PostWithAuthor>;
    /// All posts, newest first, author expanded.
    async fn list(&self) -> Result<Vec<PostWithAuthor>>;
    async fn get(&self, id: Uuid) -> Result<Option<PostWithAuthor>>;
    /// Live count of posts owned by `author_id`.
    async fn count_by_author(&self, author_id: Uuid) -> Result<i64>;
}

/// Media storage contract for handling uploads.
///
/// Both methods persist the raw bytes under the configured root and return
/// a path relative to the serving prefix (e.g. `/uploads/<filename>`).
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Stores an avatar under a filename embedding the owner id and a
    /// timestamp; the original extension is preserved.
    async fn save_avatar(&self, owner: Uuid, original_name: &str, data: Vec<u8>) -> Result<String>;
    /// Stores a post image under a timestamp + random suffix + original name.
    async fn save_post_image(&self, original_name: &str, data: Vec<u8>) -> Result<String>;
}

/// One-way hashing of account secrets.
pub trait PasswordHasher: Send + Sync {
    /// Salted digest; two calls with the same input yield different digests.
    fn hash(&self, plaintext: &str) -> Result<String>;
    /// Constant-time comparison. A malformed digest verifies as false,
    /// it never surfaces an error.
    fn verify(&self, plaintext: &str, digest: &str) -> bool;
}

/// Issues and verifies the signed bearer tokens that bind a request
/// to a user identity. Verification is stateless.
pub trait TokenService: Send + Sync {
    fn issue(&self, user_id: Uuid) -> Result<String>;
    fn verify(&self, token: &str) -> Result<AuthToken>;
}
