//! Notification creation helper.
//!
//! Notifications are a side channel: failing to write one must never fail the
//! operation that triggered it, so callers invoke [`notify`] best-effort and
//! the failure is logged here.

use uuid::Uuid;

use crate::db::Db;

/// Insert a notification for `user_id`. Errors are logged, not propagated.
pub async fn notify(pool: &Db, user_id: &str, title: &str, message: &str) {
    let result = sqlx::query(
        "INSERT INTO notifications (id, user_id, title, message, is_read) VALUES (?, ?, ?, ?, 0)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(user_id)
    .bind(title)
    .bind(message)
    .execute(pool)
    .await;

    if let Err(err) = result {
        tracing::warn!(error = ?err, user_id, title, "Failed to create notification");
    }
}
