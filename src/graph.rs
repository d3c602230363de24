//! Assignment Graph — the two many-to-many edge sets every scoped operation
//! depends on: student ↔ school and lecturer ↔ student.
//!
//! Membership checks are always evaluated against current state at call time;
//! nothing here is cached, because the authorization decisions built on top
//! require staleness-free reads. Edges are append-only — no unassign
//! operation exists in the endpoint surface.

use crate::db::Db;
use crate::errors::{AppError, AppResult};

/// MySQL SQLSTATE for integrity-constraint violations (duplicate key).
const DUP_KEY: &str = "23000";

/// Insert a student ↔ school edge.
///
/// Fails with `NotFound` if either id does not resolve (the student must be
/// an active `role=student` user), and with `Conflict` if the edge already
/// exists. The composite primary key on `student_schools` makes the duplicate
/// check race-free: a concurrent insert slipping past the pre-check surfaces
/// as a duplicate-key error and is converted to the same `Conflict`.
pub async fn assign_school(pool: &Db, student_id: &str, school_id: &str) -> AppResult<()> {
    let student_ok: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND role = 'student' AND is_active = 1)",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await?;
    if !student_ok {
        return Err(AppError::NotFound);
    }

    let school_ok: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM schools WHERE id = ?)")
        .bind(school_id)
        .fetch_one(pool)
        .await?;
    if !school_ok {
        return Err(AppError::NotFound);
    }

    let already: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM student_schools WHERE student_id = ? AND school_id = ?)",
    )
    .bind(student_id)
    .bind(school_id)
    .fetch_one(pool)
    .await?;
    if already {
        return Err(AppError::Conflict("Student already assigned to this school".into()));
    }

    let insert = sqlx::query("INSERT INTO student_schools (student_id, school_id) VALUES (?, ?)")
        .bind(student_id)
        .bind(school_id)
        .execute(pool)
        .await;

    if let Err(sqlx::Error::Database(ref db_err)) = insert {
        if db_err.code().as_deref() == Some(DUP_KEY) {
            return Err(AppError::Conflict("Student already assigned to this school".into()));
        }
    }
    insert?;
    Ok(())
}

/// Insert a lecturer ↔ student edge. Same contract as [`assign_school`],
/// with the supervisor side constrained to `role=lecturer`.
pub async fn assign_lecturer(pool: &Db, student_id: &str, lecturer_id: &str) -> AppResult<()> {
    let student_ok: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND role = 'student' AND is_active = 1)",
    )
    .bind(student_id)
    .fetch_one(pool)
    .await?;
    if !student_ok {
        return Err(AppError::NotFound);
    }

    let lecturer_ok: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ? AND role = 'lecturer' AND is_active = 1)",
    )
    .bind(lecturer_id)
    .fetch_one(pool)
    .await?;
    if !lecturer_ok {
        return Err(AppError::NotFound);
    }

    let already: bool = sqlx::query_scalar(
        "SELECT EXISTS(SELECT 1 FROM lecturer_students WHERE lecturer_id = ? AND student_id = ?)",
    )
    .bind(lecturer_id)
    .bind(student_id)
    .fetch_one(pool)
    .await?;
    if already {
        return Err(AppError::Conflict("Lecturer already assigned to this student".into()));
    }

    let insert =
        sqlx::query("INSERT INTO lecturer_students (lecturer_id, student_id) VALUES (?, ?)")
            .bind(lecturer_id)
            .bind(student_id)
            .execute(pool)
            .await;

    if let Err(sqlx::Error::Database(ref db_err)) = insert {
        if db_err.code().as_deref() == Some(DUP_KEY) {
            return Err(AppError::Conflict("Lecturer already assigned to this student".into()));
        }
    }
    insert?;
    Ok(())
}

/// Live membership check: does this lecturer currently supervise this student?
///
/// Called at every scoped read and again at evaluation write time — the graph
/// can change between a student appearing in a lecturer's list and a
/// subsequent submission.
pub async fn supervises(pool: &Db, lecturer_id: &str, student_id: &str) -> AppResult<bool> {
    let edge: bool = sqlx::query_scalar(
        "SELECT EXISTS(
            SELECT 1 FROM lecturer_students ls
            JOIN users u ON u.id = ls.student_id
            WHERE ls.lecturer_id = ? AND ls.student_id = ? AND u.role = 'student'
        )",
    )
    .bind(lecturer_id)
    .bind(student_id)
    .fetch_one(pool)
    .await?;
    Ok(edge)
}

/// Number of students currently assigned to a school. Gates school deletion
/// and feeds dashboard counts.
pub async fn assigned_student_count(pool: &Db, school_id: &str) -> AppResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM student_schools WHERE school_id = ?")
            .bind(school_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}

/// Number of students a lecturer supervises.
pub async fn supervised_student_count(pool: &Db, lecturer_id: &str) -> AppResult<i64> {
    let count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM lecturer_students WHERE lecturer_id = ?")
            .bind(lecturer_id)
            .fetch_one(pool)
            .await?;
    Ok(count)
}
