//! `/student` routes — own schools/supervisors/evaluations reads and the
//! report lifecycle with optional file attachments.
//!
//! Reports accept either JSON or `multipart/form-data`; the multipart form
//! carries the same fields plus an optional `file` part. Attachments are
//! written under `uploads/reports/` and served statically at `/uploads`.

use axum::{
    extract::{Extension, FromRequest, Multipart, Path, Query, Request, State},
    http::{header, StatusCode},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::fs;
use uuid::Uuid;

use crate::{
    errors::{AppError, AppResult},
    middleware::{auth_guard::AuthUser, role_guard::require_student},
    state::AppState,
    validation,
};

/// Directory where report attachments are stored (relative to the binary's cwd).
const UPLOAD_DIR: &str = "uploads/reports";

/// Accepted attachment extensions.
const ALLOWED_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "jpg", "jpeg", "png"];

pub fn router() -> Router<AppState> {
    use axum::middleware;
    let student_guard = middleware::from_fn(require_student);
    Router::new()
        .route("/student/schools",      get(assigned_schools))
        .route("/student/supervisors",  get(supervisors))
        .route("/student/reports",      get(list_reports).post(submit_report))
        .route("/student/reports/{id}", axum::routing::put(update_report))
        .route("/student/evaluations",  get(list_evaluations))
        .route("/student/dashboard",    get(dashboard))
        .route_layer(student_guard)
}

// ── Row types ────────────────────────────────────────────────

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
struct SupervisorRow {
    id:         String,
    username:   String,
    email:      String,
    first_name: String,
    last_name:  String,
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
    visit_date:           chrono::NaiveDate,
    teaching_skills:      i32,
    classroom_management: i32,
    lesson_preparation:   i32,
    professionalism:      i32,
    comments:             Option<String>,
    overall_grade:        String,
    submission_date:      chrono::NaiveDateTime,
    lecturer_first_name:  String,
    lecturer_last_name:   String,
}

// ── Request bodies ───────────────────────────────────────────

#[derive(Deserialize)]
struct CreateReportBody {
    title:       String,
    content:     String,
    report_type: String,
}

#[derive(Deserialize)]
struct UpdateReportBody {
    title:       Option<String>,
    content:     Option<String>,
    report_type: Option<String>,
}

#[derive(Deserialize)]
struct ListReportsQuery {
    report_type: Option<String>,
}

/// Report fields collected from either transport, plus the optional upload.
#[derive(Default)]
struct ReportForm {
    title:       Option<String>,
    content:     Option<String>,
    report_type: Option<String>,
    file:        Option<(String, Vec<u8>)>, // (original filename, bytes)
}

// ── Read handlers ────────────────────────────────────────────

/// GET /student/schools — schools the caller is assigned to.
async fn assigned_schools(
    State(state): State<AppState>,
    Extension(student): Extension<AuthUser>,
) -> AppResult<Json<Vec<SchoolRow>>> {
    let rows: Vec<SchoolRow> = sqlx::query_as::<_, SchoolRow>(
        "SELECT s.id, s.name, s.address, s.city, s.state,
                s.contact_person, s.contact_email, s.contact_phone
         FROM student_schools ss
         JOIN schools s ON s.id = ss.school_id
         WHERE ss.student_id = ?
         ORDER BY s.name",
    )
    .bind(&student.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// GET /student/supervisors — lecturers supervising the caller.
async fn supervisors(
    State(state): State<AppState>,
    Extension(student): Extension<AuthUser>,
) -> AppResult<Json<Vec<SupervisorRow>>> {
    let rows: Vec<SupervisorRow> = sqlx::query_as::<_, SupervisorRow>(
        "SELECT u.id, u.username, u.email, u.first_name, u.last_name
         FROM lecturer_students ls
         JOIN users u ON u.id = ls.lecturer_id
         WHERE ls.student_id = ?
         ORDER BY u.last_name, u.first_name",
    )
    .bind(&student.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// GET /student/reports — own reports, optionally filtered by type.
async fn list_reports(
    State(state): State<AppState>,
    Extension(student): Extension<AuthUser>,
    Query(filter): Query<ListReportsQuery>,
) -> AppResult<Json<Vec<ReportRow>>> {
    let rows: Vec<ReportRow> = sqlx::query_as::<_, ReportRow>(
        "SELECT id, student_id, title, content, report_type, file_path, submission_date, status
         FROM reports
         WHERE student_id = ?
           AND (? IS NULL OR report_type = ?)
         ORDER BY submission_date DESC",
    )
    .bind(&student.user_id)
    .bind(&filter.report_type)
    .bind(&filter.report_type)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

/// GET /student/evaluations — evaluations about the caller, with the
/// authoring lecturer's name attached.
async fn list_evaluations(
    State(state): State<AppState>,
    Extension(student): Extension<AuthUser>,
) -> AppResult<Json<Vec<EvaluationRow>>> {
    let rows: Vec<EvaluationRow> = sqlx::query_as::<_, EvaluationRow>(
        "SELECT e.id, e.lecturer_id, e.visit_date, e.teaching_skills, e.classroom_management,
                e.lesson_preparation, e.professionalism, e.comments, e.overall_grade,
                e.submission_date,
                u.first_name AS lecturer_first_name, u.last_name AS lecturer_last_name
         FROM evaluations e
         JOIN users u ON u.id = e.lecturer_id
         WHERE e.student_id = ?
         ORDER BY e.submission_date DESC",
    )
    .bind(&student.user_id)
    .fetch_all(&state.pool)
    .await?;
    Ok(Json(rows))
}

// ── Report mutation handlers ─────────────────────────────────

/// POST /student/reports — create a report from JSON or multipart form data.
async fn submit_report(
    State(state): State<AppState>,
    Extension(student): Extension<AuthUser>,
    req: Request,
) -> AppResult<(StatusCode, Json<ReportRow>)> {
    let pool = &state.pool;

    let form = extract_report_form(&state, req).await?;

    validation::validate_report(&validation::ReportInput {
        title:       form.title.as_deref().unwrap_or(""),
        content:     form.content.as_deref().unwrap_or(""),
        report_type: form.report_type.as_deref().unwrap_or(""),
    })?;

    // Validation passed; the attachment (if any) is written only now, so a
    // rejected payload leaves no orphan file behind.
    let file_path = match form.file {
        Some((orig_name, bytes)) => Some(save_attachment(&orig_name, &bytes).await?),
        None => None,
    };

    let id = Uuid::new_v4().to_string();
    sqlx::query(
        "INSERT INTO reports (id, student_id, title, content, report_type, file_path, status)
         VALUES (?, ?, ?, ?, ?, ?, 'submitted')",
    )
    .bind(&id)
    .bind(&student.user_id)
    .bind(form.title.as_deref().unwrap_or(""))
    .bind(form.content.as_deref().unwrap_or(""))
    .bind(form.report_type.as_deref().unwrap_or(""))
    .bind(&file_path)
    .execute(pool)
    .await?;

    let row = sqlx::query_as::<_, ReportRow>(
        "SELECT id, student_id, title, content, report_type, file_path, submission_date, status
         FROM reports WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok((StatusCode::CREATED, Json(row)))
}

/// PUT /student/reports/{id} — sparse patch of an own report; a new `file`
/// part replaces the previous attachment.
async fn update_report(
    State(state): State<AppState>,
    Extension(student): Extension<AuthUser>,
    Path(id): Path<String>,
    req: Request,
) -> AppResult<Json<ReportRow>> {
    let pool = &state.pool;

    #[derive(sqlx::FromRow)]
    struct OwnedReportRow {
        file_path: Option<String>,
    }

    // Someone else's report is "not found", never "forbidden".
    let existing = sqlx::query_as::<_, OwnedReportRow>(
        "SELECT file_path FROM reports WHERE id = ? AND student_id = ?",
    )
    .bind(&id)
    .bind(&student.user_id)
    .fetch_optional(pool)
    .await?
    .ok_or(AppError::NotFound)?;

    let form = extract_report_form(&state, req).await?;

    // The whole patch validates before the first write; a bad later field
    // must not leave an earlier field already committed.
    validate_report_patch(&form)?;

    if let Some(ref title) = form.title {
        sqlx::query("UPDATE reports SET title = ? WHERE id = ?")
            .bind(title).bind(&id).execute(pool).await?;
    }
    if let Some(ref content) = form.content {
        sqlx::query("UPDATE reports SET content = ? WHERE id = ?")
            .bind(content).bind(&id).execute(pool).await?;
    }
    if let Some(ref report_type) = form.report_type {
        sqlx::query("UPDATE reports SET report_type = ? WHERE id = ?")
            .bind(report_type).bind(&id).execute(pool).await?;
    }
    if let Some((orig_name, bytes)) = form.file {
        // Replacement drops the previous blob first, then stores the new one.
        // The removal is best-effort; a failure is logged and does not block.
        if let Some(old_path) = existing.file_path {
            remove_attachment(&old_path).await;
        }
        let new_path = save_attachment(&orig_name, &bytes).await?;
        sqlx::query("UPDATE reports SET file_path = ? WHERE id = ?")
            .bind(&new_path).bind(&id).execute(pool).await?;
    }

    let row = sqlx::query_as::<_, ReportRow>(
        "SELECT id, student_id, title, content, report_type, file_path, submission_date, status
         FROM reports WHERE id = ?",
    )
    .bind(&id)
    .fetch_one(pool)
    .await?;
    Ok(Json(row))
}

// ── Dashboard ────────────────────────────────────────────────

/// GET /student/dashboard — report counts by type, recent evaluations and
/// the caller's supervisors and schools.
async fn dashboard(
    State(state): State<AppState>,
    Extension(student): Extension<AuthUser>,
) -> AppResult<Json<serde_json::Value>> {
    let pool = &state.pool;

    #[derive(sqlx::FromRow)]
    struct TypeCount {
        report_type: String,
        count:       i64,
    }

    let type_counts: Vec<TypeCount> = sqlx::query_as::<_, TypeCount>(
        "SELECT report_type, COUNT(*) AS count
         FROM reports WHERE student_id = ?
         GROUP BY report_type",
    )
    .bind(&student.user_id)
    .fetch_all(pool)
    .await?;

    let report_counts: serde_json::Map<String, serde_json::Value> = type_counts
        .into_iter()
        .map(|t| (t.report_type, serde_json::json!(t.count)))
        .collect();

    let recent_evaluations: Vec<EvaluationRow> = sqlx::query_as::<_, EvaluationRow>(
        "SELECT e.id, e.lecturer_id, e.visit_date, e.teaching_skills, e.classroom_management,
                e.lesson_preparation, e.professionalism, e.comments, e.overall_grade,
                e.submission_date,
                u.first_name AS lecturer_first_name, u.last_name AS lecturer_last_name
         FROM evaluations e
         JOIN users u ON u.id = e.lecturer_id
         WHERE e.student_id = ?
         ORDER BY e.submission_date DESC LIMIT 5",
    )
    .bind(&student.user_id)
    .fetch_all(pool)
    .await?;

    let supervisors: Vec<String> = sqlx::query_scalar(
        "SELECT CONCAT(u.first_name, ' ', u.last_name)
         FROM lecturer_students ls
         JOIN users u ON u.id = ls.lecturer_id
         WHERE ls.student_id = ?
         ORDER BY u.last_name",
    )
    .bind(&student.user_id)
    .fetch_all(pool)
    .await?;

    let schools: Vec<String> = sqlx::query_scalar(
        "SELECT s.name
         FROM student_schools ss
         JOIN schools s ON s.id = ss.school_id
         WHERE ss.student_id = ?
         ORDER BY s.name",
    )
    .bind(&student.user_id)
    .fetch_all(pool)
    .await?;

    Ok(Json(serde_json::json!({
        "report_counts": report_counts,
        "recent_evaluations": recent_evaluations,
        "supervisors": supervisors,
        "schools": schools,
    })))
}

// ── Internal helpers ─────────────────────────────────────────

/// Pull report fields out of either a JSON body or a multipart form.
async fn extract_report_form(state: &AppState, req: Request) -> AppResult<ReportForm> {
    let is_multipart = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("multipart/form-data"))
        .unwrap_or(false);

    if !is_multipart {
        let Json(body) = Json::<UpdateReportBody>::from_request(req, state)
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;
        return Ok(ReportForm {
            title:       body.title,
            content:     body.content,
            report_type: body.report_type,
            file:        None,
        });
    }

    let mut multipart = Multipart::from_request(req, state)
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let mut form = ReportForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        match field.name() {
            Some("title") => {
                form.title = Some(field.text().await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?);
            }
            Some("content") => {
                form.content = Some(field.text().await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?);
            }
            Some("report_type") => {
                form.report_type = Some(field.text().await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?);
            }
            Some("file") => {
                let orig_name = field.file_name()
                    .map(|s| s.to_owned())
                    .unwrap_or_else(|| "upload".into());
                let bytes = field.bytes().await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                form.file = Some((orig_name, bytes.to_vec()));
            }
            _ => {}
        }
    }
    Ok(form)
}

/// Validate every present field of a report patch, including the upload's
/// extension, before any row or blob is touched.
fn validate_report_patch(form: &ReportForm) -> AppResult<()> {
    if let Some(ref title) = form.title {
        validation::require("title", title)?;
        validation::validate_report_title(title)?;
    }
    if let Some(ref content) = form.content {
        validation::require("content", content)?;
        validation::validate_report_content(content)?;
    }
    if let Some(ref report_type) = form.report_type {
        validation::require("report_type", report_type)?;
        validation::validate_report_type(report_type)?;
    }
    if let Some((ref orig_name, _)) = form.file {
        attachment_extension(orig_name)?;
    }
    Ok(())
}

/// Check an upload's extension against the allow-list and return it
/// lowercased. Runs during payload validation, before anything is stored.
fn attachment_extension(orig_name: &str) -> AppResult<String> {
    let ext = PathBuf::from(orig_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_lowercase();

    if !ALLOWED_EXTENSIONS.contains(&ext.as_str()) {
        return Err(AppError::BadRequest("Unsupported attachment type".into()));
    }
    Ok(ext)
}

/// Write an attachment to disk; returns the public `/uploads/...` path.
async fn save_attachment(orig_name: &str, bytes: &[u8]) -> AppResult<String> {
    let ext = attachment_extension(orig_name)?;

    fs::create_dir_all(UPLOAD_DIR).await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Could not create upload dir: {e}")))?;

    let filename  = format!("{}.{}", Uuid::new_v4(), ext);
    let disk_path = format!("{}/{}", UPLOAD_DIR, filename);
    fs::write(&disk_path, bytes).await
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Write failed: {e}")))?;

    Ok(format!("/uploads/reports/{}", filename))
}

/// Best-effort removal of a stored attachment; failures are logged only.
async fn remove_attachment(public_path: &str) {
    let disk_path = public_path.trim_start_matches('/');
    if let Err(err) = fs::remove_file(disk_path).await {
        tracing::warn!(error = ?err, path = disk_path, "Failed to remove replaced attachment");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_patch_with_any_bad_field_is_rejected_whole() {
        // A valid title paired with an unknown report type must fail before
        // anything is written; the title is not committed on its own.
        let form = ReportForm {
            title:       Some("Week 3 summary".into()),
            content:     None,
            report_type: Some("quarterly".into()),
            file:        None,
        };
        assert!(validate_report_patch(&form).is_err());
    }

    #[test]
    fn report_patch_rejects_disallowed_attachment_before_writes() {
        let form = ReportForm {
            title:       Some("Week 3 summary".into()),
            content:     Some("Observed two lessons.".into()),
            report_type: Some("weekly".into()),
            file:        Some(("notes.exe".into(), vec![0u8; 4])),
        };
        let err = validate_report_patch(&form).unwrap_err();
        assert_eq!(err.to_string(), "Unsupported attachment type");
    }

    #[test]
    fn attachment_extensions_are_checked_case_insensitively() {
        assert_eq!(attachment_extension("report.PDF").unwrap(), "pdf");
        assert_eq!(attachment_extension("photo.JpEg").unwrap(), "jpeg");
        assert!(attachment_extension("script.sh").is_err());
        assert!(attachment_extension("noextension").is_err());
    }
}
