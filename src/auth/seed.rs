use uuid::Uuid;

use crate::auth::hash_password;
use crate::db::Db;

/// Seeds the bootstrap admin account (username: "admin").
///
/// Registration requires an already-authenticated admin, so a fresh database
/// must be given one here. Safe to call on every startup — existence is
/// checked before inserting, and an existing admin is never touched.
pub async fn seed_admin(pool: &Db) -> anyhow::Result<()> {
    const ADMIN_USERNAME: &str = "admin";
    const ADMIN_EMAIL: &str = "admin@example.edu";
    const ADMIN_PASSWORD: &str = "admin123";

    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE role = 'admin')",
    )
    .fetch_one(pool)
    .await?;

    if exists {
        return Ok(());
    }

    let hash = hash_password(ADMIN_PASSWORD)?;
    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO users (id, username, email, password_hash, first_name, last_name, role, is_active)
         VALUES (?, ?, ?, ?, 'System', 'Administrator', 'admin', 1)",
    )
    .bind(id)
    .bind(ADMIN_USERNAME)
    .bind(ADMIN_EMAIL)
    .bind(hash)
    .execute(pool)
    .await?;

    tracing::info!(username = ADMIN_USERNAME, "Seeded bootstrap admin account");
    Ok(())
}
