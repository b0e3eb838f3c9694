//! Account routes: signup, login, token verification, profile,
//! preferences, avatars, stats, and deletion.

use actix_multipart::Multipart;
use actix_web::{web, HttpRequest, HttpResponse};
use quill_core::error::AppError;
use quill_core::models::{Preferences, ProfilePatch, User};
use serde::Deserialize;
use serde_json::json;

use crate::error::ApiError;
use crate::middleware::{bearer_token, CurrentUser};
use crate::uploads::{read_form, AVATAR_ALLOWED_TYPES, AVATAR_MAX_BYTES};
use crate::AppState;

/// Symbols accepted by the password strength policy.
const PASSWORD_SYMBOLS: &str = "@$!%*?&";

/// At least 12 characters with one lowercase, one uppercase, one digit
/// and one symbol.
fn password_meets_policy(password: &str) -> bool {
    password.len() >= 12
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_digit())
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

fn invalid_credentials() -> ApiError {
    ApiError(AppError::ValidationError("Invalid credentials".to_string()))
}

fn user_gone(id: uuid::Uuid) -> AppError {
    AppError::NotFound("User".to_string(), id.to_string())
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct SignupRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

pub async fn signup(
    state: web::Data<AppState>,
    body: web::Json<SignupRequest>,
) -> Result<HttpResponse, ApiError> {
    let SignupRequest {
        email,
        username,
        password,
    } = body.into_inner();

    if email.trim().is_empty() || username.trim().is_empty() || password.is_empty() {
        return Err(ApiError(AppError::ValidationError(
            "All fields are required".to_string(),
        )));
    }

    if !password_meets_policy(&password) {
        return Err(ApiError(AppError::ValidationError(
            "Password must be at least 12 characters and include uppercase, lowercase, number, and symbol"
                .to_string(),
        )));
    }

    let email = email.trim().to_lowercase();
    if state.users.find_by_email(&email).await?.is_some() {
        return Err(ApiError(AppError::Conflict(
            "User already exists".to_string(),
        )));
    }

    // The read-then-write check above races with concurrent signups; the
    // store's unique constraint on email is the backstop and still maps
    // to a conflict here.
    let digest = state.hasher.hash(&password)?;
    let user = state
        .users
        .create(User::new(email, username.trim().to_string(), digest))
        .await?;

    let token = state.tokens.issue(user.id)?;
    Ok(HttpResponse::Created().json(json!({ "token": token, "userId": user.id })))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Unknown email and wrong password answer identically, so the response
/// never reveals which factor failed.
pub async fn login(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let email = body.email.trim().to_lowercase();

    let user = state
        .users
        .find_by_email(&email)
        .await?
        .ok_or_else(invalid_credentials)?;

    if !state.hasher.verify(&body.password, &user.password_hash) {
        return Err(invalid_credentials());
    }

    let token = state.tokens.issue(user.id)?;
    Ok(HttpResponse::Ok().json(json!({ "token": token, "userId": user.id })))
}

/// Checks the presented token without touching the user store.
pub async fn verify(state: web::Data<AppState>, req: HttpRequest) -> HttpResponse {
    let token = match bearer_token(&req) {
        Ok(t) => t,
        Err(e) => {
            return HttpResponse::Unauthorized()
                .json(json!({ "valid": false, "message": e.message() }))
        }
    };

    match state.tokens.verify(token) {
        Ok(claims) => HttpResponse::Ok().json(json!({ "valid": true, "user": claims })),
        Err(_) => HttpResponse::Unauthorized()
            .json(json!({ "valid": false, "message": "Invalid or expired token" })),
    }
}

/// Full profile minus the secret. The posts stat is recomputed live from
/// the content store; the likes stat comes from the stored counter.
pub async fn me(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let CurrentUser(user) = user;
    let live_posts = state.posts.count_by_author(user.id).await?;

    let mut body = serde_json::to_value(&user)
        .map_err(|e| AppError::Internal(format!("profile encoding failed: {e}")))?;
    body["stats"] = json!({ "posts": live_posts, "likes": user.stats.likes });

    Ok(HttpResponse::Ok().json(body))
}

pub async fn update_profile(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<ProfilePatch>,
) -> Result<HttpResponse, ApiError> {
    let mut patch = body.into_inner();
    patch.username = patch
        .username
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    patch.email = patch
        .email
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty());

    if patch.is_empty() {
        return Err(ApiError(AppError::ValidationError(
            "Nothing to update".to_string(),
        )));
    }

    let updated = state
        .users
        .update_profile(user.0.id, patch)
        .await?
        .ok_or_else(|| user_gone(user.0.id))?;

    Ok(HttpResponse::Ok().json(updated))
}

/// Whole-record replacement: omitted fields fall back to their type
/// defaults, so `{}` clears every preference.
pub async fn update_preferences(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<Preferences>,
) -> Result<HttpResponse, ApiError> {
    let updated = state
        .users
        .replace_preferences(user.0.id, body.into_inner())
        .await?
        .ok_or_else(|| user_gone(user.0.id))?;

    Ok(HttpResponse::Ok().json(updated))
}

pub async fn upload_avatar(
    state: web::Data<AppState>,
    user: CurrentUser,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut form = read_form(&mut payload, Some(AVATAR_MAX_BYTES)).await?;

    let file = form
        .take_file("avatar")
        .ok_or_else(|| ApiError(AppError::ValidationError("No file uploaded".to_string())))?;

    if !AVATAR_ALLOWED_TYPES.contains(&file.content_type.as_str()) {
        return Err(ApiError(AppError::ValidationError(
            "Only images are allowed".to_string(),
        )));
    }

    let path = state
        .media
        .save_avatar(user.0.id, &file.filename, file.data)
        .await?;

    let updated = state
        .users
        .add_avatar(user.0.id, &path)
        .await?
        .ok_or_else(|| user_gone(user.0.id))?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Avatar uploaded successfully",
        "avatar": updated.avatar,
        "avatars": updated.avatars,
    })))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct SelectAvatarRequest {
    pub avatar: String,
}

/// Only a path the user has previously uploaded can become the active
/// avatar; anything else is rejected without changing state.
pub async fn select_avatar(
    state: web::Data<AppState>,
    user: CurrentUser,
    body: web::Json<SelectAvatarRequest>,
) -> Result<HttpResponse, ApiError> {
    let avatar = body.into_inner().avatar;
    if avatar.is_empty() {
        return Err(ApiError(AppError::ValidationError(
            "Avatar not provided".to_string(),
        )));
    }

    if !user.0.avatars.contains(&avatar) {
        return Err(ApiError(AppError::ValidationError(
            "Avatar not in your uploads".to_string(),
        )));
    }

    state.users.set_avatar(user.0.id, &avatar).await?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Avatar updated successfully",
        "avatar": avatar,
    })))
}

/// Removes the account only. Authored posts, files on disk and already
/// issued tokens are left behind.
pub async fn delete_account(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    state.users.delete(user.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Account deleted successfully" })))
}

pub async fn increment_post_stat(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let stats = state.users.increment_post_count(user.0.id).await?;
    Ok(HttpResponse::Ok().json(stats))
}

pub async fn stats(
    state: web::Data<AppState>,
    user: CurrentUser,
) -> Result<HttpResponse, ApiError> {
    let stats = state
        .users
        .stats(user.0.id)
        .await?
        .ok_or_else(|| user_gone(user.0.id))?;
    Ok(HttpResponse::Ok().json(stats))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_policy() {
        assert!(password_meets_policy("LongEnough1234!"));
        assert!(!password_meets_policy("short1!"));
        assert!(!password_meets_policy("nouppercase123!"));
        assert!(!password_meets_policy("NOLOWERCASE123!"));
        assert!(!password_meets_policy("NoDigitsHere!!"));
        assert!(!password_meets_policy("NoSymbolsHere123"));
    }
}
