//! Account endpoints (/user/*)

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;
use crate::domain::users::{self, User};
use crate::services::auth::{self, AuthUser};
use crate::services::error::LogErr;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/user/signup", post(signup))
        .route("/user/login", post(login))
        .route("/user/update", post(update))
}

#[derive(Deserialize)]
struct IdentityRequest {
    email: Option<String>,
    username: Option<String>,
}

/// POST /user/signup - create an account with an email and/or username
async fn signup(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IdentityRequest>,
) -> Result<Json<User>, StatusCode> {
    if req.email.is_none() && req.username.is_none() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = users::create_user(&state.db, req.email.as_deref(), req.username.as_deref())
        .await
        .map_err(|e| match &e {
            // Unique violation means the identity is already taken
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StatusCode::BAD_REQUEST
            }
            _ => {
                eprintln!("Create user error: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        })?;

    Ok(Json(user))
}

#[derive(Serialize)]
struct LoginResponse {
    #[serde(flatten)]
    user: User,
    access: String,
}

/// POST /user/login - look the account up and issue an access token
async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IdentityRequest>,
) -> Result<Json<LoginResponse>, StatusCode> {
    if req.email.is_none() && req.username.is_none() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user = users::find_by_email_or_username(
        &state.db,
        req.email.as_deref(),
        req.username.as_deref(),
    )
    .await
    .log_500("Find user error")?
    .ok_or(StatusCode::NOT_FOUND)?;

    let access =
        auth::create_access_token(user.id, &state.jwt_secret).log_500("Create token error")?;

    Ok(Json(LoginResponse { user, access }))
}

/// POST /user/update - change email/username for the authenticated user
async fn update(
    State(state): State<Arc<AppState>>,
    AuthUser(user_id): AuthUser,
    Json(req): Json<IdentityRequest>,
) -> Result<Json<User>, StatusCode> {
    let taken = users::identity_taken(
        &state.db,
        user_id,
        req.email.as_deref(),
        req.username.as_deref(),
    )
    .await
    .log_500("Identity check error")?;
    if taken {
        return Err(StatusCode::BAD_REQUEST);
    }

    let user = users::update_user(
        &state.db,
        user_id,
        req.email.as_deref(),
        req.username.as_deref(),
    )
    .await
    .log_500("Update user error")?
    .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(user))
}
