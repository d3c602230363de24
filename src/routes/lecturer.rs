//! `/lecturer` routes — supervised-student reads and evaluation lifecycle.
//! All routes require the `Lecturer` role; operations on a specific student
//! additionally require a live supervision edge in the Assignment Graph, and
//! its absence answers 404 so that unsupervised student ids are
//! indistinguishable from nonexistent ones.

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    graph,
    middleware::{auth_guard::AuthUser, role_guard::require_lecturer},
    services::notifications,
    state::AppState,
    validation,
};

pub fn router() -> Router<AppState> {
    use axum::middleware;
    let lecturer_guard = middleware::from_fn(require_lecturer);
    Router::new()
        .route("/lecturer/students",             get(list_students))
        .route("/lecturer/students/{id}",        get(student_details))
        .route("/lecturer/student-reports/{id}", get(student_reports))
        .route("/lecturer/evaluations",          get(list_evaluations).post(submit_evaluation))
        .route("/lecturer/evaluations/{id}",     axum::routing::put(update_evaluation))
        .route("/lecturer/dashboard",            get(dashboard))
        .route_layer(lecturer_guard)
}

// ── Row types ────────────────────────────────────────────────

#[derive(sqlx::FromRow, Serialize)]
struct StudentRow {
    id:         String,
    username:   String,
    email:      String,
    first_name: String,
    last_name:  String,
    is_active:  bool,
}

#[derive(sqlx::FromRow, Serialize)]
struct SchoolRow {
    id:      String,
    name:    String,
    address: String,
    city:    String,
    state:   String,
}

#[derive(sqlx::FromRow, Serialize)]
struct ReportRow {
    id:              String,
    student_id:      String,
    title:           String,
    content:         String,
    report_type:     String,
    file_path:       Option<String>,
    submission_date: chrono::NaiveDateTime,
    status:          String,
}

#[derive(sqlx::FromRow, Serialize)]
struct EvaluationRow {
    id:                   String,
    lecturer_id:          String,
    student_id:           String,
    visit_date:           chrono::NaiveDate,
    teaching_skills:      i32,
    classroom_management: i32,
    lesson_preparation:   i32,
    professionalism:      i32,
    comments:             Option<String>,
    overall_grade:        String,
    submission_date:      chrono::NaiveDateTime,
}

// ── Request bodies ───────────────────────────────────────────

#[derive(Deserialize)]
struct SubmitEvaluationBody {
    student_id:           String,
    visit_date:           String,
    teaching_skills:      i32,
    classroom_management: i32,
    lesson_preparation:   i32,
    professionalism:      i32,
    comments:             Option<String>,
    overall_grade:        String,
}

#[derive(Deserialize)]
struct UpdateEvaluationBody {
    visit_date:           Option<String>,
    teaching_skills:      Option<i32>,
    classroom_management: Option<i32>,
    lesson_preparation:   Option<i32>,
    professionalism:      Option<i32>,
    comments:             Option<String>,
    overall_grade:        Option<String>,
}

#[derive(Deserialize)]
struct ListEvaluationsQuery {
    student_id: Option<String>,
}

// ── Handlers ─────────────────────────────────────────────────

/// GET /lecturer/students — students currently supervised by the caller.
async fn list_students(
    State(state): State<AppState>,
    Extension(lecturer): Extension<AuthUser>,
) -> AppResult<Json<Vec<StudentRow>>> {
    let rows: Vec<StudentRow> = sqlx::query_as::<_, StudentRow>(
        "SELECT u.id, u.username, u.email, u.first_name, u.last_name, u.is_active
         FROM lecturer_students ls
         JOIN users u ON u.id = ls.student_id
         WHERE ls.lecturer_id = ?
         ORDER BY u.last_name, u.first_name",
    )
    .bind(&lecturer.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// GET /lecturer/students/{id} — one supervised student with their schools,
/// reports and the caller's own evaluations of them.
async fn student_details(
    State(state): State<AppState>,
    Extension(lecturer): Extension<AuthUser>,
    Path(student_id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    if !graph::supervises(pool, &lecturer.user_id, &student_id).await? {
        return Err(AppError::NotFound);
    }

    let student = sqlx::query_as::<_, StudentRow>(
        "SELECT id, username, email, first_name, last_name, is_active
         FROM users WHERE id = ? AND role = 'student'",
    )
    .bind(&student_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let schools: Vec<SchoolRow> = sqlx::query_as::<_, SchoolRow>(
        "SELECT s.id, s.name, s.address, s.city, s.state
         FROM student_schools ss
         JOIN schools s ON s.id = ss.school_id
         WHERE ss.student_id = ?
         ORDER BY s.name",
    )
    .bind(&student_id)
    .fetch_all(pool)
    .await?;

    let reports: Vec<ReportRow> = sqlx::query_as::<_, ReportRow>(
        "SELECT id, student_id, title, content, report_type, file_path, submission_date, status
         FROM reports WHERE student_id = ?
         ORDER BY submission_date DESC",
    )
    .bind(&student_id)
    .fetch_all(pool)
    .await?;

    let evaluations: Vec<EvaluationRow> = sqlx::query_as::<_, EvaluationRow>(
        "SELECT id, lecturer_id, student_id, visit_date, teaching_skills, classroom_management,
                lesson_preparation, professionalism, comments, overall_grade, submission_date
         FROM evaluations WHERE lecturer_id = ? AND student_id = ?
         ORDER BY submission_date DESC",
    )
    .bind(&lecturer.user_id)
    .bind(&student_id)
    .fetch_all(pool)
    .await?;

    Ok(Json(serde_json::json!({
        "student": student,
        "schools": schools,
        "reports": reports,
        "evaluations": evaluations,
    })))
}

/// GET /lecturer/student-reports/{id} — a supervised student's reports.
async fn student_reports(
    State(state): State<AppState>,
    Extension(lecturer): Extension<AuthUser>,
    Path(student_id): Path<String>,
) -> AppResult<Json<Vec<ReportRow>>> {
    let pool = &state.pool;

    if !graph::supervises(pool, &lecturer.user_id, &student_id).await? {
        return Err(AppError::NotFound);
    }

    let rows: Vec<ReportRow> = sqlx::query_as::<_, ReportRow>(
        "SELECT id, student_id, title, content, report_type, file_path, submission_date, status
         FROM reports WHERE student_id = ?
         ORDER BY submission_date DESC",
    )
    .bind(&student_id)
    .fetch_all(pool)
    .await?;
    Ok(Json(rows))
}

/// POST /lecturer/evaluations — submit an evaluation for a supervised student.
async fn submit_evaluation(
    State(state): State<AppState>,
    Extension(lecturer): Extension<AuthUser>,
    Json(body): Json<SubmitEvaluationBody>,
) -> AppResult<(StatusCode, Json<EvaluationRow>)> {
    let pool = &state.pool;

    let visit_date = validation::validate_evaluation(&validation::EvaluationInput {
        student_id:           &body.student_id,
        visit_date:           &body.visit_date,
        teaching_skills:      body.teaching_skills,
        classroom_management: body.classroom_management,
        lesson_preparation:   body.lesson_preparation,
        professionalism:      body.professionalism,
        overall_grade:        &body.overall_grade,
    })?;

    // Membership is checked at write time, not when the student list was
    // rendered — the graph may have changed in between.
    if !graph::supervises(pool, &lecturer.user_id, &body.student_id).await? {
        return Err(AppError::NotFound);
    }

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO evaluations
            (id, lecturer_id, student_id, visit_date, teaching_skills, classroom_management,
             lesson_preparation, professionalism, comments, overall_grade)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&id)
    .bind(&lecturer.user_id)
    .bind(&body.student_id)
    .bind(visit_date)
    .bind(body.teaching_skills)
    .bind(body.classroom_management)
    .bind(body.lesson_preparation)
    .bind(body.professionalism)
    .bind(&body.comments)
    .bind(&body.overall_grade)
    .execute(pool)
    .await?;

    notifications::notify(
        pool,
        &body.student_id,
        "New evaluation",
        "Your supervisor has submitted a new evaluation for you",
    )
    .await;

    let row = sqlx::query_as::<_, EvaluationRow>(
        "SELECT id, lecturer_id, student_id, visit_date, teaching_skills, classroom_management,
                lesson_preparation, professionalism, comments, overall_grade, submission_date
         FROM evaluations WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// GET /lecturer/evaluations — the caller's own evaluations, optionally
/// narrowed to one student.
async fn list_evaluations(
    State(state): State<AppState>,
    Extension(lecturer): Extension<AuthUser>,
    Query(filter): Query<ListEvaluationsQuery>,
) -> AppResult<Json<Vec<EvaluationRow>>> {
    let rows: Vec<EvaluationRow> = sqlx::query_as::<_, EvaluationRow>(
        "SELECT id, lecturer_id, student_id, visit_date, teaching_skills, classroom_management,
                lesson_preparation, professionalism, comments, overall_grade, submission_date
         FROM evaluations
         WHERE lecturer_id = ?
           AND (? IS NULL OR student_id = ?)
         ORDER BY submission_date DESC",
    )
    .bind(&lecturer.user_id)
    .bind(&filter.student_id)
    .bind(&filter.student_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// Validate an evaluation patch in full and parse its visit date. Runs
/// before any write so a bad later field cannot leave an earlier field
/// already committed.
fn validate_evaluation_patch(
    body: &UpdateEvaluationBody,
) -> AppResult<Option<chrono::NaiveDate>> {
    let visit_date = match body.visit_date.as_deref() {
        Some(raw) => Some(validation::parse_date("visit date", raw)?),
        None => None,
    };
    if let Some(value) = body.teaching_skills {
        validation::validate_rating("teaching_skills", value)?;
    }
    if let Some(value) = body.classroom_management {
        validation::validate_rating("classroom_management", value)?;
    }
    if let Some(value) = body.lesson_preparation {
        validation::validate_rating("lesson_preparation", value)?;
    }
    if let Some(value) = body.professionalism {
        validation::validate_rating("professionalism", value)?;
    }
    if let Some(ref grade) = body.overall_grade {
        validation::validate_grade(grade)?;
    }
    Ok(visit_date)
}

/// PUT /lecturer/evaluations/{id} — sparse patch of an own evaluation; the
/// whole payload validates before the first field is written.
async fn update_evaluation(
    State(state): State<AppState>,
    Extension(lecturer): Extension<AuthUser>,
    Path(id): Path<String>,
    Json(body): Json<UpdateEvaluationBody>,
) -> AppResult<Json<EvaluationRow>> {
    let pool = &state.pool;

    #[derive(sqlx::FromRow)]
    struct OwnerRow {
        student_id: String,
    }

    // Ownership scoping: an evaluation authored by someone else is "not found".
    let owner = sqlx::query_as::<_, OwnerRow>(
        "SELECT student_id FROM evaluations WHERE id = ? AND lecturer_id = ?",
    )
    .bind(&id)
    .bind(&lecturer.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    // The supervision edge must still exist at write time.
    if !graph::supervises(pool, &lecturer.user_id, &owner.student_id).await? {
        return Err(AppError::NotFound);
    }

    let visit_date = validate_evaluation_patch(&body)?;

    if let Some(visit_date) = visit_date {
        sqlx::query("UPDATE evaluations SET visit_date = ? WHERE id = ?")
            .bind(visit_date).bind(&id).execute(pool).await?;
    }
    if let Some(value) = body.teaching_skills {
        sqlx::query("UPDATE evaluations SET teaching_skills = ? WHERE id = ?")
            .bind(value).bind(&id).execute(pool).await?;
    }
    if let Some(value) = body.classroom_management {
        sqlx::query("UPDATE evaluations SET classroom_management = ? WHERE id = ?")
            .bind(value).bind(&id).execute(pool).await?;
    }
    if let Some(value) = body.lesson_preparation {
        sqlx::query("UPDATE evaluations SET lesson_preparation = ? WHERE id = ?")
            .bind(value).bind(&id).execute(pool).await?;
    }
    if let Some(value) = body.professionalism {
        sqlx::query("UPDATE evaluations SET professionalism = ? WHERE id = ?")
            .bind(value).bind(&id).execute(pool).await?;
    }
    if let Some(ref comments) = body.comments {
        sqlx::query("UPDATE evaluations SET comments = ? WHERE id = ?")
            .bind(comments).bind(&id).execute(pool).await?;
    }
    if let Some(ref grade) = body.overall_grade {
        sqlx::query("UPDATE evaluations SET overall_grade = ? WHERE id = ?")
            .bind(grade).bind(&id).execute(pool).await?;
    }

    let row = sqlx::query_as::<_, EvaluationRow>(
        "SELECT id, lecturer_id, student_id, visit_date, teaching_skills, classroom_management,
                lesson_preparation, professionalism, comments, overall_grade, submission_date
         FROM evaluations WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok(Json(row))
}

/// GET /lecturer/dashboard — supervised-student count and recent activity.
async fn dashboard(
    State(state): State<AppState>,
    Extension(lecturer): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    let student_count = graph::supervised_student_count(pool, &lecturer.user_id).await?;

    let recent_evaluations: Vec<EvaluationRow> = sqlx::query_as::<_, EvaluationRow>(
        "SELECT id, lecturer_id, student_id, visit_date, teaching_skills, classroom_management,
                lesson_preparation, professionalism, comments, overall_grade, submission_date
         FROM evaluations WHERE lecturer_id = ?
         ORDER BY submission_date DESC LIMIT 5",
    )
    .bind(&lecturer.user_id)
    .fetch_all(pool)
    .await?;

    let recent_reports: Vec<ReportRow> = sqlx::query_as::<_, ReportRow>(
        "SELECT r.id, r.student_id, r.title, r.content, r.report_type, r.file_path,
                r.submission_date, r.status
         FROM reports r
         JOIN lecturer_students ls ON ls.student_id = r.student_id
         WHERE ls.lecturer_id = ?
         ORDER BY r.submission_date DESC LIMIT 5",
    )
    .bind(&lecturer.user_id)
    .fetch_all(pool)
    .await?;

    Ok(Json(serde_json::json!({
        "student_count": student_count,
        "recent_evaluations": recent_evaluations,
        "recent_reports": recent_reports,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluation_patch_with_any_bad_field_is_rejected_whole() {
        // A valid visit_date paired with an out-of-range rating must fail
        // before anything is written; the date is not committed on its own.
        let body = UpdateEvaluationBody {
            visit_date:           Some("2025-01-02".into()),
            teaching_skills:      Some(11),
            classroom_management: None,
            lesson_preparation:   None,
            professionalism:      None,
            comments:             None,
            overall_grade:        None,
        };
        let err = validate_evaluation_patch(&body).unwrap_err();
        assert_eq!(err.to_string(), "teaching_skills must be between 1 and 10");
    }

    #[test]
    fn evaluation_patch_parses_visit_date_once_valid() {
        let body = UpdateEvaluationBody {
            visit_date:           Some("2025-01-02".into()),
            teaching_skills:      Some(9),
            classroom_management: None,
            lesson_preparation:   None,
            professionalism:      None,
            comments:             Some("Improved pacing".into()),
            overall_grade:        Some("A-".into()),
        };
        let date = validate_evaluation_patch(&body).unwrap();
        assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2025, 1, 2));
    }
}
