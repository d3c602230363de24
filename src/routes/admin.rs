//! `/admin` routes — user, school and practice-session management plus
//! Assignment Graph edge creation. All routes in this module require the
//! `Admin` role (enforced via the `require_admin` route layer).

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    graph,
    middleware::{auth_guard::AuthUser, role_guard::require_admin},
    services::notifications,
    state::AppState,
    validation,
};

pub fn router() -> Router<AppState> {
    use axum::middleware;
    // require_admin reads Extension<AuthUser> (injected by require_auth in mod.rs);
    // it does not need AppState, so plain from_fn is sufficient.
    let admin_guard = middleware::from_fn(require_admin);
    Router::new()
        .route("/admin/users",            get(list_users))
        .route("/admin/users/{id}",       get(get_user).put(update_user).delete(deactivate_user))
        .route("/admin/schools",          get(list_schools).post(create_school))
        .route("/admin/schools/{id}",     put(update_school).delete(delete_school))
        .route("/admin/sessions",         get(list_sessions).post(create_session))
        .route("/admin/assign-school",    post(assign_school))
        .route("/admin/assign-lecturer",  post(assign_lecturer))
        .route("/admin/dashboard",        get(dashboard))
        .route_layer(admin_guard)
}

// ── Row types ────────────────────────────────────────────────

#[derive(sqlx::FromRow, Serialize)]
struct UserRow {
    id:         String,
    username:   String,
    email:      String,
    first_name: String,
    last_name:  String,
    role:       String,
    is_active:  bool,
}

#[derive(sqlx::FromRow, Serialize)]
struct SchoolRow {
    id:             String,
    name:           String,
    address:        String,
    city:           String,
    state:          String,
    contact_person: Option<String>,
    contact_email:  Option<String>,
    contact_phone:  Option<String>,
}

#[derive(sqlx::FromRow, Serialize)]
struct SessionRow {
    id:          String,
    title:       String,
    start_date:  chrono::NaiveDate,
    end_date:    chrono::NaiveDate,
    description: Option<String>,
    status:      String,
}

// ── Request bodies ───────────────────────────────────────────

#[derive(Deserialize)]
struct ListUsersQuery {
    role:      Option<String>,
    is_active: Option<bool>,
}

#[derive(Deserialize)]
struct UpdateUserBody {
    email:      Option<String>,
    first_name: Option<String>,
    last_name:  Option<String>,
    is_active:  Option<bool>,
    // No `role` field — roles are immutable after registration.
}

#[derive(Deserialize)]
struct CreateSchoolBody {
    name:           String,
    address:        String,
    city:           String,
    state:          String,
    contact_person: Option<String>,
    contact_email:  Option<String>,
    contact_phone:  Option<String>,
}

#[derive(Deserialize)]
struct UpdateSchoolBody {
    name:           Option<String>,
    address:        Option<String>,
    city:           Option<String>,
    state:          Option<String>,
    contact_person: Option<String>,
    contact_email:  Option<String>,
    contact_phone:  Option<String>,
}

#[derive(Deserialize)]
struct CreateSessionBody {
    title:       String,
    start_date:  String,
    end_date:    String,
    description: Option<String>,
    status:      Option<String>,
}

#[derive(Deserialize)]
struct AssignSchoolBody {
    student_id: String,
    school_id:  String,
}

#[derive(Deserialize)]
struct AssignLecturerBody {
    student_id:  String,
    lecturer_id: String,
}

// ── User management ──────────────────────────────────────────

async fn list_users(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Query(filter): Query<ListUsersQuery>,
) -> AppResult<Json<Vec<UserRow>>> {
    let pool = &state.pool;
    // Optional filters narrow the listing; both bind as no-ops when absent.
    let rows: Vec<UserRow> = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, first_name, last_name, role, is_active
         FROM users
         WHERE (? IS NULL OR role = ?)
           AND (? IS NULL OR is_active = ?)
         ORDER BY role, username",
    )
    .bind(&filter.role)
    .bind(&filter.role)
    .bind(filter.is_active)
    .bind(filter.is_active)
    .fetch_all(pool)
    .await?;
    Ok(Json(rows))
}

async fn get_user(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<UserRow>> {
    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, first_name, last_name, role, is_active
         FROM users WHERE id = ?",
    )
    .bind(&id)
    .fetch_optional(&state.pool)
    .await?
    .ok_or(AppError::NotFound)?;
    Ok(Json(row))
}

/// Validate a user patch in full. Runs before any write so that a bad later
/// field cannot leave an earlier field already committed.
fn validate_user_patch(body: &UpdateUserBody, is_self: bool) -> AppResult<()> {
    if let Some(ref email) = body.email {
        validation::validate_email(email)?;
    }
    if let Some(ref first_name) = body.first_name {
        validation::require("first_name", first_name)?;
    }
    if let Some(ref last_name) = body.last_name {
        validation::require("last_name", last_name)?;
    }
    // The patch route must not offer a way around the self-deactivation
    // guard on DELETE.
    if body.is_active == Some(false) && is_self {
        return Err(AppError::BadRequest("Cannot deactivate your own account".into()));
    }
    Ok(())
}

/// Sparse patch: only fields present in the payload are written, and only
/// after the whole payload has validated.
async fn update_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateUserBody>,
) -> AppResult<Json<UserRow>> {
    let pool = &state.pool;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(&id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    validate_user_patch(&body, id == admin.user_id)?;

    if let Some(ref email) = body.email {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ? AND id <> ?)",
        )
        .bind(email)
        .bind(&id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(AppError::Conflict("Email already exists".into()));
        }
    }

    if let Some(ref email) = body.email {
        sqlx::query("UPDATE users SET email = ?, updated_at = NOW() WHERE id = ?")
            .bind(email)
            .bind(&id)
            .execute(pool)
            .await?;
    }
    if let Some(ref first_name) = body.first_name {
        sqlx::query("UPDATE users SET first_name = ?, updated_at = NOW() WHERE id = ?")
            .bind(first_name)
            .bind(&id)
            .execute(pool)
            .await?;
    }
    if let Some(ref last_name) = body.last_name {
        sqlx::query("UPDATE users SET last_name = ?, updated_at = NOW() WHERE id = ?")
            .bind(last_name)
            .bind(&id)
            .execute(pool)
            .await?;
    }
    if let Some(is_active) = body.is_active {
        sqlx::query("UPDATE users SET is_active = ?, updated_at = NOW() WHERE id = ?")
            .bind(is_active)
            .bind(&id)
            .execute(pool)
            .await?;
    }

    let row = sqlx::query_as::<_, UserRow>(
        "SELECT id, username, email, first_name, last_name, role, is_active
         FROM users WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok(Json(row))
}

/// Soft delete: clears the active flag, never removes the row.
async fn deactivate_user(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    if id == admin.user_id {
        return Err(AppError::BadRequest("Cannot deactivate your own account".into()));
    }

    // Existence check rather than `rows_affected`; MySQL reports 0 affected
    // rows when the account is already inactive.
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM users WHERE id = ?)")
        .bind(&id)
        .fetch_one(&state.pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    sqlx::query("UPDATE users SET is_active = 0, updated_at = NOW() WHERE id = ?")
        .bind(&id)
        .execute(&state.pool)
        .await?;
    Ok(Json(serde_json::json!({ "message": "User deactivated successfully" })))
}

// ── School management ────────────────────────────────────────

async fn list_schools(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
) -> AppResult<Json<Vec<SchoolRow>>> {
    let rows: Vec<SchoolRow> = sqlx::query_as::<_, SchoolRow>(
        "SELECT id, name, address, city, state, contact_person, contact_email, contact_phone
         FROM schools ORDER BY name",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

async fn create_school(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Json(body): Json<CreateSchoolBody>,
) -> AppResult<(StatusCode, Json<SchoolRow>)> {
    let pool = &state.pool;

    validation::validate_school(&validation::SchoolInput {
        name:          &body.name,
        address:       &body.address,
        city:          &body.city,
        state:         &body.state,
        contact_email: body.contact_email.as_deref(),
        contact_phone: body.contact_phone.as_deref(),
    })?;

    let name_taken: bool =
        sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schools WHERE name = ?)")
            .bind(&body.name)
            .fetch_one(pool)
            .await?;
    if name_taken {
        return Err(AppError::Conflict("School with this name already exists".into()));
    }

    let id = Uuid::new_v4().to_string();
    let insert_result = sqlx::query(
        "INSERT INTO schools (id, name, address, city, state, contact_person, contact_email, contact_phone)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&body.name)
    .bind(&body.address)
    .bind(&body.city)
    .bind(&body.state)
    .bind(&body.contact_person)
    .bind(&body.contact_email)
    .bind(&body.contact_phone)
    .execute(pool)
    .await;

    if let Err(sqlx::Error::Database(ref db_err)) = insert_result {
        if db_err.code().as_deref() == Some("23000") {
            return Err(AppError::Conflict("School with this name already exists".into()));
        }
    }
    insert_result?;

    let row = sqlx::query_as::<_, SchoolRow>(
        "SELECT id, name, address, city, state, contact_person, contact_email, contact_phone
         FROM schools WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// Validate a school patch in full before any field is written.
fn validate_school_patch(body: &UpdateSchoolBody) -> AppResult<()> {
    if let Some(ref name) = body.name {
        validation::require("name", name)?;
    }
    if let Some(ref email) = body.contact_email {
        if !email.is_empty() {
            validation::validate_email(email)
                .map_err(|_| AppError::BadRequest("Invalid contact email format".into()))?;
        }
    }
    if let Some(ref phone) = body.contact_phone {
        if !phone.is_empty() {
            validation::validate_phone(phone)?;
        }
    }
    Ok(())
}

/// Sparse patch over school fields; the whole payload validates first.
async fn update_school(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateSchoolBody>,
) -> AppResult<Json<SchoolRow>> {
    let pool = &state.pool;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schools WHERE id = ?)")
        .bind(&id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    validate_school_patch(&body)?;

    if let Some(ref name) = body.name {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM schools WHERE name = ? AND id <> ?)",
        )
        .bind(name)
        .bind(&id)
        .fetch_one(pool)
        .await?;
        if taken {
            return Err(AppError::Conflict("School with this name already exists".into()));
        }
    }

    if let Some(ref name) = body.name {
        sqlx::query("UPDATE schools SET name = ?, updated_at = NOW() WHERE id = ?")
            .bind(name).bind(&id).execute(pool).await?;
    }
    if let Some(ref address) = body.address {
        sqlx::query("UPDATE schools SET address = ?, updated_at = NOW() WHERE id = ?")
            .bind(address).bind(&id).execute(pool).await?;
    }
    if let Some(ref city) = body.city {
        sqlx::query("UPDATE schools SET city = ?, updated_at = NOW() WHERE id = ?")
            .bind(city).bind(&id).execute(pool).await?;
    }
    if let Some(ref state_field) = body.state {
        sqlx::query("UPDATE schools SET state = ?, updated_at = NOW() WHERE id = ?")
            .bind(state_field).bind(&id).execute(pool).await?;
    }
    if let Some(ref person) = body.contact_person {
        sqlx::query("UPDATE schools SET contact_person = ?, updated_at = NOW() WHERE id = ?")
            .bind(person).bind(&id).execute(pool).await?;
    }
    if let Some(ref email) = body.contact_email {
        sqlx::query("UPDATE schools SET contact_email = ?, updated_at = NOW() WHERE id = ?")
            .bind(email).bind(&id).execute(pool).await?;
    }
    if let Some(ref phone) = body.contact_phone {
        sqlx::query("UPDATE schools SET contact_phone = ?, updated_at = NOW() WHERE id = ?")
            .bind(phone).bind(&id).execute(pool).await?;
    }

    let row = sqlx::query_as::<_, SchoolRow>(
        "SELECT id, name, address, city, state, contact_person, contact_email, contact_phone
         FROM schools WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok(Json(row))
}

/// Hard delete, blocked while the school still has assigned students.
/// Deletion is unrecoverable — there is no undelete.
async fn delete_school(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schools WHERE id = ?)")
        .bind(&id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(AppError::NotFound);
    }

    if graph::assigned_student_count(pool, &id).await? > 0 {
        return Err(AppError::BadRequest("Cannot delete school with assigned students".into()));
    }

    sqlx::query("DELETE FROM schools WHERE id = ?")
        .bind(&id)
        .execute(pool)
        .await?;
    Ok(Json(serde_json::json!({ "message": "School deleted successfully" })))
}

// ── Practice sessions ────────────────────────────────────────

async fn list_sessions(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
) -> AppResult<Json<Vec<SessionRow>>> {
    let rows: Vec<SessionRow> = sqlx::query_as::<_, SessionRow>(
        "SELECT id, title, start_date, end_date, description, status
         FROM practice_sessions ORDER BY start_date",
    )
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

async fn create_session(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Json(body): Json<CreateSessionBody>,
) -> AppResult<(StatusCode, Json<SessionRow>)> {
    let pool = &state.pool;

    let (start, end) = validation::validate_practice_session(&validation::SessionInput {
        title:      &body.title,
        start_date: &body.start_date,
        end_date:   &body.end_date,
        status:     body.status.as_deref(),
    })?;

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO practice_sessions (id, title, start_date, end_date, description, status)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&body.title)
    .bind(start)
    .bind(end)
    .bind(&body.description)
    .bind(body.status.as_deref().unwrap_or("upcoming"))
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, SessionRow>(
        "SELECT id, title, start_date, end_date, description, status
         FROM practice_sessions WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

// ── Assignment Graph edges ───────────────────────────────────

async fn assign_school(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Json(body): Json<AssignSchoolBody>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    validation::require("student_id", &body.student_id)?;
    validation::require("school_id", &body.school_id)?;

    graph::assign_school(pool, &body.student_id, &body.school_id).await?;

    let school_name: Option<String> =
        sqlx::query_scalar("SELECT name FROM schools WHERE id = ?")
            .bind(&body.school_id)
            .fetch_optional(pool)
            .await?;
    notifications::notify(
        pool,
        &body.student_id,
        "School assignment",
        &format!(
            "You have been assigned to {} for teaching practice",
            school_name.as_deref().unwrap_or("a school")
        ),
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "School assigned to student successfully" })))
}

async fn assign_lecturer(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
    Json(body): Json<AssignLecturerBody>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    validation::require("student_id", &body.student_id)?;
    validation::require("lecturer_id", &body.lecturer_id)?;

    graph::assign_lecturer(pool, &body.student_id, &body.lecturer_id).await?;

    notifications::notify(
        pool,
        &body.student_id,
        "Supervisor assignment",
        "A supervising lecturer has been assigned to you",
    )
    .await;

    Ok(Json(serde_json::json!({ "message": "Lecturer assigned to student successfully" })))
}

// ── Dashboard ────────────────────────────────────────────────

async fn dashboard(
    State(state): State<AppState>,
    Extension(_admin): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    #[derive(sqlx::FromRow)]
    struct RoleCount {
        role:  String,
        count: i64,
    }

    let role_counts: Vec<RoleCount> =
        sqlx::query_as::<_, RoleCount>("SELECT role, COUNT(*) AS count FROM users GROUP BY role")
            .fetch_all(pool)
            .await?;

    let count_for = |role: &str| {
        role_counts
            .iter()
            .find(|r| r.role == role)
            .map(|r| r.count)
            .unwrap_or(0)
    };

    let school_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schools")
        .fetch_one(pool)
        .await?;
    let active_sessions: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM practice_sessions WHERE status = 'ongoing'")
            .fetch_one(pool)
            .await?;

    Ok(Json(serde_json::json!({
        "user_counts": {
            "admin":    count_for("admin"),
            "lecturer": count_for("lecturer"),
            "student":  count_for("student"),
        },
        "school_count": school_count,
        "active_sessions": active_sessions,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_patch_rejects_invalid_fields_before_any_write() {
        // A valid first field must not survive a bad later field; the patch
        // is validated as a whole before the first UPDATE runs.
        let body = UpdateUserBody {
            email:      Some("new@example.edu".into()),
            first_name: Some("".into()),
            last_name:  None,
            is_active:  None,
        };
        assert!(validate_user_patch(&body, false).is_err());
    }

    #[test]
    fn user_patch_cannot_deactivate_own_account() {
        let body = UpdateUserBody {
            email:      None,
            first_name: None,
            last_name:  None,
            is_active:  Some(false),
        };
        let err = validate_user_patch(&body, true).unwrap_err();
        assert_eq!(err.to_string(), "Cannot deactivate your own account");

        // Re-activating yourself, or deactivating someone else, is fine.
        assert!(validate_user_patch(&body, false).is_ok());
        let reactivate = UpdateUserBody { is_active: Some(true), ..body };
        assert!(validate_user_patch(&reactivate, true).is_ok());
    }

    #[test]
    fn school_patch_rejects_bad_contact_fields() {
        let body = UpdateSchoolBody {
            name:           Some("Hillside Primary".into()),
            address:        None,
            city:           None,
            state:          None,
            contact_person: None,
            contact_email:  Some("not-an-email".into()),
            contact_phone:  None,
        };
        let err = validate_school_patch(&body).unwrap_err();
        assert_eq!(err.to_string(), "Invalid contact email format");
    }
}
