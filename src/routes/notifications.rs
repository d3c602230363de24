//! `/notifications` routes — every authenticated role reads its own feed.

use axum::{
    extract::{Extension, Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::Serialize;

use crate::{
    errors::{AppError, AppResult},
    middleware::auth_guard::AuthUser,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", put(mark_read))
}

#[derive(sqlx::FromRow, Serialize)]
struct NotificationRow {
    id:         String,
    title:      String,
    message:    String,
    is_read:    bool,
    created_at: chrono::NaiveDateTime,
}

/// GET /notifications — the caller's notifications, newest first.
async fn list_notifications(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> AppResult<Json<Vec<NotificationRow>>> {
    let rows: Vec<NotificationRow> = sqlx::query_as::<_, NotificationRow>(
        "SELECT id, title, message, is_read, created_at
         FROM notifications
         WHERE user_id = ?
         ORDER BY created_at DESC",
    )
    .bind(&user.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// PUT /notifications/{id}/read — mark one of the caller's notifications read.
async fn mark_read(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    // Absent or someone else's — both read as "not found". An existence
    // check is used instead of `rows_affected`, which MySQL reports as 0
    // when the row is already marked read.
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM notifications WHERE id = ? AND user_id = ?)",
    )
    .bind(&id)
    .bind(&user.user_id)
    .fetch_one(&state.pool)
    .await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ? AND user_id = ?")
        .bind(&id)
        .bind(&user.user_id)
        .execute(&state.pool)
        .await?;
    Ok(Json(serde_json::json!({ "message": "Notification marked as read" })))
}
