//! `/auth` routes — login, logout, own profile, password rotation and
//! admin-only registration.
//!
//! There is no public self-registration: `POST /auth/register` is the only
//! way to create a user and it requires an authenticated admin, so no
//! role-escalation path exists.

use axum::{
    extract::{Extension, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    auth::{generate_token, hash_password, verify_password},
    db::Db,
    errors::{AppError, AppResult},
    middleware::{auth_guard::AuthUser, role_guard::require_admin},
    state::AppState,
    validation,
};

/// Fixed short-lived token window.
const TOKEN_HOURS: i64 = 1;

// ── Request / response types ──────────────────────────────────

#[derive(Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

#[derive(Deserialize)]
struct RegisterRequest {
    username:   String,
    email:      String,
    password:   String,
    first_name: String,
    last_name:  String,
    role:       String,
}

#[derive(Deserialize)]
struct ChangePasswordRequest {
    current_password: String,
    new_password:     String,
}

#[derive(Serialize)]
struct LoginResponse {
    access_token: String,
    user:         UserResponse,
}

#[derive(Serialize, sqlx::FromRow)]
struct UserResponse {
    id:         String,
    username:   String,
    email:      String,
    first_name: String,
    last_name:  String,
    role:       String,
    is_active:  bool,
}

// ── Database row types (runtime queries — no DATABASE_URL at compile time) ──

#[derive(sqlx::FromRow)]
struct CredentialRow {
    id:            String,
    username:      String,
    email:         String,
    password_hash: String,
    first_name:    String,
    last_name:     String,
    role:          String,
    is_active:     bool,
}

// ── Routers ───────────────────────────────────────────────────

pub fn public_router() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

pub fn router() -> Router<AppState> {
    use axum::middleware;
    Router::new()
        .route("/auth/register", post(register).route_layer(middleware::from_fn(require_admin)))
        .route("/auth/logout",          post(logout))
        .route("/auth/me",              get(me))
        .route("/auth/change-password", put(change_password))
}

// ── Handlers ──────────────────────────────────────────────────

/// POST /auth/login — exchange username + password for a bearer token.
async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<impl IntoResponse> {
    let pool = &state.pool;

    validation::require("username", &body.username)?;
    validation::require("password", &body.password)?;

    let row = sqlx::query_as::<_, CredentialRow>(
        "SELECT id, username, email, password_hash, first_name, last_name, role, is_active
         FROM users WHERE username = ? LIMIT 1",
    )
    .bind(&body.username)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    verify_password(&body.password, &row.password_hash)?;

    if !row.is_active {
        return Err(AppError::Forbidden);
    }

    let access_token = issue_token(pool, &row.id).await?;

    Ok(Json(LoginResponse {
        access_token,
        user: UserResponse {
            id:         row.id,
            username:   row.username,
            email:      row.email,
            first_name: row.first_name,
            last_name:  row.last_name,
            role:       row.role,
            is_active:  row.is_active,
        },
    }))
}

/// POST /auth/logout — revoke the presented token.
async fn logout(
    State(state): State<AppState>,
    headers: axum::http::HeaderMap,
) -> AppResult<impl IntoResponse> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        sqlx::query("DELETE FROM auth_tokens WHERE token = ?")
            .bind(token.trim())
            .execute(&state.pool)
            .await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

/// GET /auth/me — return the currently authenticated user.
async fn me(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
) -> AppResult<Json<UserResponse>> {
    let row = sqlx::query_as::<_, UserResponse>(
        "SELECT id, username, email, first_name, last_name, role, is_active
         FROM users WHERE id = ? LIMIT 1",
    )
    .bind(&auth.user_id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;

    Ok(Json(row))
}

/// PUT /auth/change-password — rotate own credential.
async fn change_password(
    Extension(auth): Extension<AuthUser>,
    State(state): State<AppState>,
    Json(body): Json<ChangePasswordRequest>,
) -> AppResult<impl IntoResponse> {
    let pool = &state.pool;

    validation::require("current_password", &body.current_password)?;
    validation::require("new_password", &body.new_password)?;
    validation::validate_password(&body.new_password)?;

    let current_hash: Option<String> =
        sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?")
            .bind(&auth.user_id)
            .fetch_optional(pool)
            .await?;
    let current_hash = current_hash.ok_or(AppError::NotFound)?;

    verify_password(&body.current_password, &current_hash)
        .map_err(|_| AppError::Unauthorized)?;

    let new_hash = hash_password(&body.new_password)?;
    sqlx::query("UPDATE users SET password_hash = ?, updated_at = NOW() WHERE id = ?")
        .bind(new_hash)
        .bind(&auth.user_id)
        .execute(pool)
        .await?;

    Ok(Json(serde_json::json!({ "message": "Password updated successfully" })))
}

/// POST /auth/register — create a new user of any role (admin only).
///
/// The submitted role is stored as-is and is immutable afterwards — no other
/// endpoint writes the role column.
async fn register(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<impl IntoResponse> {
    let pool = &state.pool;

    validation::validate_registration(&validation::RegistrationInput {
        username:   &body.username,
        email:      &body.email,
        password:   &body.password,
        first_name: &body.first_name,
        last_name:  &body.last_name,
        role:       &body.role,
    })?;

    // Advisory uniqueness pre-checks; the UNIQUE constraints re-check at insert.
    let username_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE username = ?)")
            .bind(&body.username)
            .fetch_one(pool)
            .await?;
    if username_taken {
        return Err(AppError::Conflict("Username already exists".into()));
    }

    let email_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE email = ?)")
            .bind(&body.email)
            .fetch_one(pool)
            .await?;
    if email_taken {
        return Err(AppError::Conflict("Email already exists".into()));
    }

    let hash = hash_password(&body.password)?;
    let id   = Uuid::new_v4().to_string();

    let insert_result = sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, first_name, last_name, role, is_active)
         VALUES (?, ?, ?, ?, ?, ?, ?, 1)",
    )
    .bind(&id)
    .bind(&body.username)
    .bind(&body.email)
    .bind(hash)
    .bind(&body.first_name)
    .bind(&body.last_name)
    .bind(&body.role)
    .execute(pool)
    .await;

    // Guard against duplicate key (race between pre-check and insert)
    if let Err(sqlx::Error::Database(ref db_err)) = insert_result {
        if db_err.code().as_deref() == Some("23000") {
            return Err(AppError::Conflict("Username or email already exists".into()));
        }
    }
    insert_result?;

    let user = sqlx::query_as::<_, UserResponse>(
        "SELECT id, username, email, first_name, last_name, role, is_active
         FROM users WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

// ── Internal helpers ──────────────────────────────────────────

async fn issue_token(pool: &Db, user_id: &str) -> AppResult<String> {
    let token = generate_token();
    let id    = Uuid::new_v4().to_string();
    let expires_at = (Utc::now() + chrono::Duration::hours(TOKEN_HOURS)).naive_utc();

    sqlx::query("INSERT INTO auth_tokens (id, user_id, token, expires_at) VALUES (?, ?, ?, ?)")
        .bind(id)
        .bind(user_id)
        .bind(&token)
        .bind(expires_at)
        .execute(pool)
        .await?;

    Ok(token)
}
