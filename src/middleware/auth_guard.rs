//! Authentication guard middleware.
//!
//! Reads the `Authorization: Bearer` header, validates the token against
//! `auth_tokens` in the DB, and injects an `AuthUser` extension into the
//! request for downstream handlers.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{
    errors::AppError,
    models::UserRole,
    state::AppState,
};

/// Authenticated user extracted from a valid bearer token. Injected into
/// request extensions by `require_auth`; downstream handlers use
/// `Extension<AuthUser>`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub role:    UserRole,
}

/// Middleware: require a valid, unexpired bearer token.
/// On success, inserts `AuthUser` into request extensions.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req).ok_or(AppError::Unauthorized)?;

    #[derive(sqlx::FromRow)]
    struct TokenRow {
        id:   String,
        role: String,
    }

    let row = sqlx::query_as::<_, TokenRow>(
        "SELECT u.id, u.role
         FROM auth_tokens t
         JOIN users u ON u.id = t.user_id
         WHERE t.token = ?
           AND t.expires_at > NOW()
           AND u.is_active = 1
         LIMIT 1",
    )
    .bind(&token)
    .fetch_optional(&state.pool)
    .await
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e)))?
    .ok_or(AppError::Unauthorized)?;

    let role = UserRole::parse(&row.role).ok_or(AppError::Unauthorized)?;

    req.extensions_mut().insert(AuthUser {
        user_id: row.id,
        role,
    });

    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}
