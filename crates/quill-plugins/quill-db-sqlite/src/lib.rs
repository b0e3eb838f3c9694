//! # quill-db-sqlite Implementation
//!
//! This module implements the data mapping between the SQLite relational
//! model and the `quill-core` domain models. JSON-bucket columns
//! (`avatars`, `preferences`, `tags`, `links`, `likes`) are stored as TEXT.

use async_trait::async_trait;
use chrono::Utc;
use quill_core::error::{AppError, Result};
use quill_core::models::{AuthorRef, Post, PostWithAuthor, Preferences, ProfilePatch, Stats, User};
use quill_core::traits::{PostRepo, UserRepo};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::Row;
use std::str::FromStr;
use uuid::Uuid;

// Helpers for UUID conversion
fn uuid_to_blob(id: Uuid) -> Vec<u8> {
    id.as_bytes().to_vec()
}

fn blob_to_uuid(blob: &[u8]) -> Uuid {
    Uuid::from_slice(blob).unwrap_or_default()
}

fn map_db_err(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            return AppError::Conflict("User already exists".to_string());
        }
    }
    AppError::Internal(format!("database error: {e}"))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(format!("encode failed: {e}")))
}

/// Opens (and if necessary creates) the database and applies the schema.
pub async fn connect(url: &str) -> Result<SqlitePool> {
    let opts = SqliteConnectOptions::from_str(url)
        .map_err(|e| AppError::Internal(format!("bad database url: {e}")))?
        .create_if_missing(true);

    // An in-memory database exists per connection; one connection keeps
    // every query on the same database.
    let max_connections = if url.contains(":memory:") { 1 } else { 5 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await
        .map_err(map_db_err)?;

    init_schema(&pool).await?;
    log::info!("sqlite schema ready at {url}");
    Ok(pool)
}

async fn init_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id            BLOB PRIMARY KEY,
            user_id       BLOB NOT NULL UNIQUE,
            email         TEXT NOT NULL UNIQUE,
            username      TEXT NOT NULL,
            password_hash TEXT NOT NULL,
            avatar        TEXT NOT NULL DEFAULT '',
            avatars       TEXT NOT NULL DEFAULT '[]',
            preferences   TEXT NOT NULL DEFAULT '{}',
            stats_posts   INTEGER NOT NULL DEFAULT 0,
            stats_likes   INTEGER NOT NULL DEFAULT 0,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(map_db_err)?;

    // No foreign key on author_id: deleting an account leaves its posts
    // behind with a dangling reference.
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS posts (
            id           BLOB PRIMARY KEY,
            title        TEXT NOT NULL,
            author_id    BLOB NOT NULL,
            reading_time TEXT NOT NULL DEFAULT 'Quick',
            image        TEXT,
            description  TEXT,
            content      TEXT NOT NULL,
            tags         TEXT NOT NULL DEFAULT '[]',
            links        TEXT NOT NULL DEFAULT '[]',
            likes        TEXT NOT NULL DEFAULT '[]',
            created_at   TEXT NOT NULL,
            updated_at   TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(map_db_err)?;

    Ok(())
}

fn row_to_user(row: &SqliteRow) -> User {
    User {
        id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
        user_id: blob_to_uuid(row.get::<Vec<u8>, _>("user_id").as_slice()),
        email: row.get("email"),
        username: row.get("username"),
        password_hash: row.get("password_hash"),
        avatar: row.get("avatar"),
        avatars: serde_json::from_str(&row.get::<String, _>("avatars")).unwrap_or_default(),
        preferences: serde_json::from_str(&row.get::<String, _>("preferences")).unwrap_or_default(),
        stats: Stats {
            posts: row.get("stats_posts"),
            likes: row.get("stats_likes"),
        },
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

const SELECT_USER: &str = "SELECT id, user_id, email, username, password_hash, avatar, avatars, \
                           preferences, stats_posts, stats_likes, created_at, updated_at FROM users";

pub struct SqliteUserRepo {
    pool: SqlitePool,
}

impl SqliteUserRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn fetch_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE id = ?"))
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }
}

#[async_trait]
impl UserRepo for SqliteUserRepo {
    async fn create(&self, user: User) -> Result<User> {
        sqlx::query(
            "INSERT INTO users (id, user_id, email, username, password_hash, avatar, avatars, \
             preferences, stats_posts, stats_likes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(user.id))
        .bind(uuid_to_blob(user.user_id))
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.avatar)
        .bind(to_json(&user.avatars)?)
        .bind(to_json(&user.preferences)?)
        .bind(user.stats.posts)
        .bind(user.stats.likes)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(&format!("{SELECT_USER} WHERE email = ?"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(row.as_ref().map(row_to_user))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.fetch_by_id(id).await
    }

    async fn update_profile(&self, id: Uuid, patch: ProfilePatch) -> Result<Option<User>> {
        sqlx::query(
            "UPDATE users SET username = COALESCE(?, username), \
             email = COALESCE(?, email), updated_at = ? WHERE id = ?",
        )
        .bind(patch.username)
        .bind(patch.email)
        .bind(Utc::now())
        .bind(uuid_to_blob(id))
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        self.fetch_by_id(id).await
    }

    async fn replace_preferences(&self, id: Uuid, prefs: Preferences) -> Result<Option<User>> {
        sqlx::query("UPDATE users SET preferences = ?, updated_at = ? WHERE id = ?")
            .bind(to_json(&prefs)?)
            .bind(Utc::now())
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        self.fetch_by_id(id).await
    }

    async fn add_avatar(&self, id: Uuid, path: &str) -> Result<Option<User>> {
        let user = match self.fetch_by_id(id).await? {
            Some(u) => u,
            None => return Ok(None),
        };

        let mut avatars = user.avatars;
        avatars.push(path.to_string());

        sqlx::query("UPDATE users SET avatars = ?, avatar = ?, updated_at = ? WHERE id = ?")
            .bind(to_json(&avatars)?)
            .bind(path)
            .bind(Utc::now())
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        self.fetch_by_id(id).await
    }

    async fn set_avatar(&self, id: Uuid, path: &str) -> Result<()> {
        sqlx::query("UPDATE users SET avatar = ?, updated_at = ? WHERE id = ?")
            .bind(path)
            .bind(Utc::now())
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }

    /// The increment is a single statement so concurrent requests never
    /// lose an update.
    async fn increment_post_count(&self, id: Uuid) -> Result<Stats> {
        sqlx::query("UPDATE users SET stats_posts = stats_posts + 1, updated_at = ? WHERE id = ?")
            .bind(Utc::now())
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;

        self.stats(id)
            .await?
            .ok_or_else(|| AppError::NotFound("User".to_string(), id.to_string()))
    }

    async fn stats(&self, id: Uuid) -> Result<Option<Stats>> {
        let row = sqlx::query("SELECT stats_posts, stats_likes FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(row.map(|r| Stats {
            posts: r.get("stats_posts"),
            likes: r.get("stats_likes"),
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(uuid_to_blob(id))
            .execute(&self.pool)
            .await
            .map_err(map_db_err)?;
        Ok(())
    }
}

const SELECT_POST: &str = "SELECT p.id, p.title, p.author_id, p.reading_time, p.image, \
                           p.description, p.content, p.tags, p.links, p.likes, p.created_at, \
                           p.updated_at, u.username AS author_username, u.avatar AS author_avatar \
                           FROM posts p LEFT JOIN users u ON u.id = p.author_id";

fn row_to_post(row: &SqliteRow) -> PostWithAuthor {
    let author_id = blob_to_uuid(row.get::<Vec<u8>, _>("author_id").as_slice());
    let author = row
        .get::<Option<String>, _>("author_username")
        .map(|username| AuthorRef {
            id: author_id,
            username,
            avatar: row
                .get::<Option<String>, _>("author_avatar")
                .unwrap_or_default(),
        });

    PostWithAuthor {
        post: Post {
            id: blob_to_uuid(row.get::<Vec<u8>, _>("id").as_slice()),
            title: row.get("title"),
            author_id,
            reading_time: row.get("reading_time"),
            image: row.get("image"),
            description: row.get("description"),
            content: row.get("content"),
            tags: serde_json::from_str(&row.get::<String, _>("tags")).unwrap_or_default(),
            links: serde_json::from_str(&row.get::<String, _>("links")).unwrap_or_default(),
            likes: serde_json::from_str(&row.get::<String, _>("likes")).unwrap_or_default(),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        },
        author,
    }
}

pub struct SqlitePostRepo {
    pool: SqlitePool,
}

impl SqlitePostRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepo for SqlitePostRepo {
    async fn create(&self, post: Post) -> Result<PostWithAuthor> {
        sqlx::query(
            "INSERT INTO posts (id, title, author_id, reading_time, image, description, \
             content, tags, links, likes, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(uuid_to_blob(post.id))
        .bind(&post.title)
        .bind(uuid_to_blob(post.author_id))
        .bind(&post.reading_time)
        .bind(&post.image)
        .bind(&post.description)
        .bind(&post.content)
        .bind(to_json(&post.tags)?)
        .bind(to_json(&post.links)?)
        .bind(to_json(&post.likes)?)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(map_db_err)?;

        let author = sqlx::query("SELECT username, avatar FROM users WHERE id = ?")
            .bind(uuid_to_blob(post.author_id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?
            .map(|row| AuthorRef {
                id: post.author_id,
                username: row.get("username"),
                avatar: row.get("avatar"),
            });

        Ok(PostWithAuthor { post, author })
    }

    async fn list(&self) -> Result<Vec<PostWithAuthor>> {
        let rows = sqlx::query(&format!("{SELECT_POST} ORDER BY p.created_at DESC"))
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(rows.iter().map(row_to_post).collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<PostWithAuthor>> {
        let row = sqlx::query(&format!("{SELECT_POST} WHERE p.id = ?"))
            .bind(uuid_to_blob(id))
            .fetch_optional(&self.pool)
            .await
            .map_err(map_db_err)?;

        Ok(row.as_ref().map(row_to_post))
    }

    async fn count_by_author(&self, author_id: Uuid) -> Result<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts WHERE author_id = ?")
            .bind(uuid_to_blob(author_id))
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    async fn repos() -> (SqliteUserRepo, SqlitePostRepo) {
        let pool = connect("sqlite::memory:").await.unwrap();
        (SqliteUserRepo::new(pool.clone()), SqlitePostRepo::new(pool))
    }

    fn sample_user(email: &str) -> User {
        User::new(email.to_string(), "writer".to_string(), "$digest".to_string())
    }

    fn sample_post(author: Uuid, title: &str, created_at: chrono::DateTime<Utc>) -> Post {
        Post {
            id: Uuid::now_v7(),
            title: title.to_string(),
            author_id: author,
            reading_time: "Quick".to_string(),
            image: None,
            description: Some("desc".to_string()),
            content: "body".to_string(),
            tags: vec!["a".to_string(), "b".to_string()],
            links: vec![],
            likes: vec![],
            created_at,
            updated_at: created_at,
        }
    }

    #[tokio::test]
    async fn test_create_and_find_user() {
        let (users, _) = repos().await;
        let created = users.create(sample_user("a@b.com")).await.unwrap();

        let found = users.find_by_email("a@b.com").await.unwrap().unwrap();
        assert_eq!(found.id, created.id);
        assert_eq!(found.user_id, created.user_id);
        assert!(found.avatars.is_empty());

        assert!(users.find_by_email("missing@b.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_conflict() {
        let (users, _) = repos().await;
        users.create(sample_user("a@b.com")).await.unwrap();

        let err = users.create(sample_user("a@b.com")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_partial_profile_update() {
        let (users, _) = repos().await;
        let user = users.create(sample_user("a@b.com")).await.unwrap();

        let patch = ProfilePatch {
            username: Some("renamed".to_string()),
            email: None,
        };
        let updated = users.update_profile(user.id, patch).await.unwrap().unwrap();
        assert_eq!(updated.username, "renamed");
        assert_eq!(updated.email, "a@b.com");
    }

    #[tokio::test]
    async fn test_preferences_replaced_wholesale() {
        let (users, _) = repos().await;
        let user = users.create(sample_user("a@b.com")).await.unwrap();

        let updated = users
            .replace_preferences(user.id, Preferences { dark_mode: true })
            .await
            .unwrap()
            .unwrap();
        assert!(updated.preferences.dark_mode);

        let reset = users
            .replace_preferences(user.id, Preferences::default())
            .await
            .unwrap()
            .unwrap();
        assert!(!reset.preferences.dark_mode);
    }

    #[tokio::test]
    async fn test_avatar_history_and_selection() {
        let (users, _) = repos().await;
        let user = users.create(sample_user("a@b.com")).await.unwrap();

        let updated = users
            .add_avatar(user.id, "/uploads/one.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.avatar, "/uploads/one.png");

        let updated = users
            .add_avatar(user.id, "/uploads/two.png")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.avatar, "/uploads/two.png");
        assert_eq!(updated.avatars, vec!["/uploads/one.png", "/uploads/two.png"]);

        users.set_avatar(user.id, "/uploads/one.png").await.unwrap();
        let reloaded = users.find_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(reloaded.avatar, "/uploads/one.png");
        assert_eq!(reloaded.avatars.len(), 2);
    }

    #[tokio::test]
    async fn test_post_counter_increments() {
        let (users, _) = repos().await;
        let user = users.create(sample_user("a@b.com")).await.unwrap();

        users.increment_post_count(user.id).await.unwrap();
        let stats = users.increment_post_count(user.id).await.unwrap();
        assert_eq!(stats.posts, 2);
        assert_eq!(stats.likes, 0);
    }

    #[tokio::test]
    async fn test_delete_user() {
        let (users, _) = repos().await;
        let user = users.create(sample_user("a@b.com")).await.unwrap();
        users.delete(user.id).await.unwrap();
        assert!(users.find_by_id(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_posts_listed_newest_first() {
        let (users, posts) = repos().await;
        let author = users.create(sample_user("a@b.com")).await.unwrap();

        let now = Utc::now();
        posts
            .create(sample_post(author.id, "older", now - Duration::hours(2)))
            .await
            .unwrap();
        posts
            .create(sample_post(author.id, "newest", now))
            .await
            .unwrap();
        posts
            .create(sample_post(author.id, "middle", now - Duration::hours(1)))
            .await
            .unwrap();

        let listed = posts.list().await.unwrap();
        let titles: Vec<_> = listed.iter().map(|p| p.post.title.as_str()).collect();
        assert_eq!(titles, vec!["newest", "middle", "older"]);

        assert_eq!(posts.count_by_author(author.id).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_author_expansion() {
        let (users, posts) = repos().await;
        let author = users.create(sample_user("a@b.com")).await.unwrap();
        users.set_avatar(author.id, "/uploads/pic.png").await.unwrap();

        let created = posts
            .create(sample_post(author.id, "hello", Utc::now()))
            .await
            .unwrap();
        let expanded = created.author.unwrap();
        assert_eq!(expanded.username, "writer");
        assert_eq!(expanded.avatar, "/uploads/pic.png");

        let fetched = posts.get(created.post.id).await.unwrap().unwrap();
        assert!(fetched.author.is_some());

        assert!(posts.get(Uuid::now_v7()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_deleted_author_leaves_dangling_reference() {
        let (users, posts) = repos().await;
        let author = users.create(sample_user("a@b.com")).await.unwrap();
        let created = posts
            .create(sample_post(author.id, "orphan", Utc::now()))
            .await
            .unwrap();

        users.delete(author.id).await.unwrap();

        let fetched = posts.get(created.post.id).await.unwrap().unwrap();
        assert!(fetched.author.is_none());
    }
}
