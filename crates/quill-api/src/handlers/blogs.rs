//! Post routes: creation with optional image upload, listing, and
//! fetch by id.

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use chrono::Utc;
use quill_core::error::AppError;
use quill_core::models::Post;
use uuid::Uuid;

use crate::error::ApiError;
use crate::middleware::CurrentUser;
use crate::uploads::{read_form, split_csv};
use crate::AppState;

pub async fn create_post(
    state: web::Data<AppState>,
    user: CurrentUser,
    req: HttpRequest,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut form = read_form(&mut payload, None).await?;

    let title = form.fields.remove("title").unwrap_or_default();
    let content = form.fields.remove("content").unwrap_or_default();
    if title.trim().is_empty() || content.trim().is_empty() {
        return Err(ApiError(AppError::ValidationError(
            "Title and content are required".to_string(),
        )));
    }

    // The stored image URL is absolute, built from this request's
    // connection info.
    let image = match form.take_file("image") {
        Some(file) => {
            let rel = state.media.save_post_image(&file.filename, file.data).await?;
            let conn = req.connection_info();
            Some(format!("{}://{}{}", conn.scheme(), conn.host(), rel))
        }
        None => None,
    };

    let now = Utc::now();
    let post = Post {
        id: Uuid::now_v7(),
        title: title.trim().to_string(),
        author_id: user.0.id,
        reading_time: form
            .fields
            .remove("readingTime")
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| "Quick".to_string()),
        image,
        description: form.fields.remove("description"),
        content,
        tags: split_csv(form.fields.remove("tags")),
        links: split_csv(form.fields.remove("links")),
        likes: Vec::new(),
        created_at: now,
        updated_at: now,
    };

    let created = state.posts.create(post).await?;
    Ok(HttpResponse::Created().json(created))
}

/// Every post, newest first, author expanded. No pagination.
pub async fn list_posts(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let posts = state.posts.list().await?;
    Ok(HttpResponse::Ok().json(posts))
}

pub async fn get_post(
    state: web::Data<AppState>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let id = path.into_inner();
    let post = state
        .posts
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Blog".to_string(), id.to_string()))?;
    Ok(HttpResponse::Ok().json(post))
}
