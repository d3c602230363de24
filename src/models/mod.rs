#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ── Users ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id:            String,
    pub username:      String,
    pub email:         String,
    pub password_hash: String,
    pub first_name:    String,
    pub last_name:     String,
    pub role:          UserRole,
    pub is_active:     bool,
    pub created_at:    NaiveDateTime,
    pub updated_at:    NaiveDateTime,
}

/// Role tag. Immutable after creation — no endpoint writes this column
/// outside of registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    Admin,
    Lecturer,
    Student,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Admin    => "admin",
            UserRole::Lecturer => "lecturer",
            UserRole::Student  => "student",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "admin"    => Some(UserRole::Admin),
            "lecturer" => Some(UserRole::Lecturer),
            "student"  => Some(UserRole::Student),
            _          => None,
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ── Auth tokens ──────────────────────────────────────────────

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthToken {
    pub id:         String,
    pub user_id:    String,
    pub token:      String,
    pub expires_at: NaiveDateTime,
    pub created_at: NaiveDateTime,
}

// ── Schools ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct School {
    pub id:             String,
    pub name:           String,
    pub address:        String,
    pub city:           String,
    pub state:          String,
    pub contact_person: Option<String>,
    pub contact_email:  Option<String>,
    pub contact_phone:  Option<String>,
    pub created_at:     NaiveDateTime,
    pub updated_at:     NaiveDateTime,
}

// ── Reports ──────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    pub id:              String,
    pub student_id:      String,
    pub title:           String,
    pub content:         String,
    pub report_type:     String,
    pub file_path:       Option<String>,
    pub submission_date: NaiveDateTime,
    pub status:          ReportStatus,
}

/// `Reviewed` is modeled but nothing in the endpoint surface transitions a
/// report out of `Submitted` yet.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReportStatus {
    Submitted,
    Reviewed,
}

/// Accepted `report_type` values, in declaration order.
pub const REPORT_TYPES: &[&str] = &["daily", "weekly", "lesson_plan", "reflection", "final"];

// ── Evaluations ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Evaluation {
    pub id:                   String,
    pub lecturer_id:          String,
    pub student_id:           String,
    pub visit_date:           NaiveDate,
    pub teaching_skills:      i32,
    pub classroom_management: i32,
    pub lesson_preparation:   i32,
    pub professionalism:      i32,
    pub comments:             Option<String>,
    pub overall_grade:        String,
    pub submission_date:      NaiveDateTime,
}

/// Letter grade scale for `overall_grade`.
pub const GRADES: &[&str] = &[
    "A+", "A", "A-", "B+", "B", "B-", "C+", "C", "C-", "D+", "D", "F",
];

// ── Practice sessions ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PracticeSession {
    pub id:          String,
    pub title:       String,
    pub start_date:  NaiveDate,
    pub end_date:    NaiveDate,
    pub description: Option<String>,
    pub status:      SessionStatus,
    pub created_at:  NaiveDateTime,
    pub updated_at:  NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, sqlx::Type, PartialEq, Eq)]
#[sqlx(type_name = "VARCHAR", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Upcoming,
    Ongoing,
    Completed,
}

pub const SESSION_STATUSES: &[&str] = &["upcoming", "ongoing", "completed"];

// ── Notifications ────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Notification {
    pub id:         String,
    pub user_id:    String,
    pub title:      String,
    pub message:    String,
    pub is_read:    bool,
    pub created_at: NaiveDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_its_string_form() {
        for role in [UserRole::Admin, UserRole::Lecturer, UserRole::Student] {
            assert_eq!(UserRole::parse(role.as_str()), Some(role));
        }
        assert_eq!(UserRole::parse("parent"), None);
        assert_eq!(UserRole::parse(""), None);
    }

    #[test]
    fn grade_scale_is_the_full_letter_range() {
        assert_eq!(GRADES.len(), 12);
        assert!(GRADES.contains(&"B+"));
        assert!(!GRADES.contains(&"E"));
    }
}
