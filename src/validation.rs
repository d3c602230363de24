//! Field and business-rule validation.
//!
//! Validators are pure functions returning `AppResult<()>`; the first failing
//! rule wins and its message is the only one surfaced. Rules run in
//! declaration order: required-field presence, then format, then ranges and
//! enumerations, then cross-field rules. Uniqueness against the store is
//! checked in the handlers (read-only `EXISTS` queries) and re-enforced by
//! schema constraints at insert time.

use chrono::NaiveDate;

use crate::errors::{AppError, AppResult};
use crate::models::{GRADES, REPORT_TYPES, SESSION_STATUSES};

// ── Field formats ─────────────────────────────────────────────

/// Username: 3–20 chars, letters/digits/underscore only.
pub fn validate_username(username: &str) -> AppResult<()> {
    let len_ok = (3..=20).contains(&username.len());
    if !len_ok || !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(AppError::BadRequest(
            "Username must be 3-20 characters and contain only letters, numbers, and underscores".into(),
        ));
    }
    Ok(())
}

/// Permissive local@domain.tld shape — not full RFC 5322.
pub fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.starts_with('.')
                && match domain.rsplit_once('.') {
                    Some((host, tld)) => {
                        !host.is_empty()
                            && tld.len() >= 2
                            && tld.chars().all(|c| c.is_ascii_alphabetic())
                    }
                    None => false,
                }
        }
        None => false,
    };
    if !valid {
        return Err(AppError::BadRequest("Invalid email format".into()));
    }
    Ok(())
}

/// Phone: optional leading `+`, then 10–15 digits.
pub fn validate_phone(phone: &str) -> AppResult<()> {
    let digits = phone.strip_prefix('+').unwrap_or(phone);
    if !(10..=15).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::BadRequest("Invalid phone number format".into()));
    }
    Ok(())
}

/// Minimum-strength policy: length only, no complexity rules.
pub fn validate_password(password: &str) -> AppResult<()> {
    if password.len() < 6 {
        return Err(AppError::BadRequest(
            "Password must be at least 6 characters long".into(),
        ));
    }
    Ok(())
}

// ── Enumerations ──────────────────────────────────────────────

pub fn validate_role(role: &str) -> AppResult<()> {
    if !matches!(role, "admin" | "lecturer" | "student") {
        return Err(AppError::BadRequest(
            "Role must be one of: admin, lecturer, student".into(),
        ));
    }
    Ok(())
}

pub fn validate_report_type(report_type: &str) -> AppResult<()> {
    if !REPORT_TYPES.contains(&report_type) {
        return Err(AppError::BadRequest(format!(
            "Report type must be one of: {}",
            REPORT_TYPES.join(", ")
        )));
    }
    Ok(())
}

pub fn validate_grade(grade: &str) -> AppResult<()> {
    if !GRADES.contains(&grade) {
        return Err(AppError::BadRequest(format!(
            "Overall grade must be one of: {}",
            GRADES.join(", ")
        )));
    }
    Ok(())
}

pub fn validate_session_status(status: &str) -> AppResult<()> {
    if !SESSION_STATUSES.contains(&status) {
        return Err(AppError::BadRequest(format!(
            "Status must be one of: {}",
            SESSION_STATUSES.join(", ")
        )));
    }
    Ok(())
}

// ── Ranges and dates ──────────────────────────────────────────

/// Evaluation ratings are integers on a 1–10 scale.
pub fn validate_rating(field: &str, value: i32) -> AppResult<()> {
    if !(1..=10).contains(&value) {
        return Err(AppError::BadRequest(format!(
            "{field} must be between 1 and 10"
        )));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` date, naming the field in the failure message.
pub fn parse_date(field: &str, raw: &str) -> AppResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AppError::BadRequest(format!("Invalid {field} format, use YYYY-MM-DD")))
}

// ── Required-field helper ─────────────────────────────────────

/// Presence check; runs before any format rule on the same field.
pub fn require(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    Ok(())
}

// ── Entity validators ─────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct RegistrationInput<'a> {
    pub username:   &'a str,
    pub email:      &'a str,
    pub password:   &'a str,
    pub first_name: &'a str,
    pub last_name:  &'a str,
    pub role:       &'a str,
}

pub fn validate_registration(input: &RegistrationInput<'_>) -> AppResult<()> {
    require("username", input.username)?;
    require("password", input.password)?;
    require("email", input.email)?;
    require("first_name", input.first_name)?;
    require("last_name", input.last_name)?;
    require("role", input.role)?;
    validate_username(input.username)?;
    validate_email(input.email)?;
    validate_password(input.password)?;
    validate_role(input.role)?;
    Ok(())
}

#[derive(Clone, Copy)]
pub struct SchoolInput<'a> {
    pub name:          &'a str,
    pub address:       &'a str,
    pub city:          &'a str,
    pub state:         &'a str,
    pub contact_email: Option<&'a str>,
    pub contact_phone: Option<&'a str>,
}

pub fn validate_school(input: &SchoolInput<'_>) -> AppResult<()> {
    require("name", input.name)?;
    require("address", input.address)?;
    require("city", input.city)?;
    require("state", input.state)?;
    if let Some(email) = input.contact_email.filter(|e| !e.is_empty()) {
        validate_email(email)
            .map_err(|_| AppError::BadRequest("Invalid contact email format".into()))?;
    }
    if let Some(phone) = input.contact_phone.filter(|p| !p.is_empty()) {
        validate_phone(phone)?;
    }
    Ok(())
}

#[derive(Clone, Copy)]
pub struct SessionInput<'a> {
    pub title:      &'a str,
    pub start_date: &'a str,
    pub end_date:   &'a str,
    pub status:     Option<&'a str>,
}

/// Returns the parsed (start, end) pair so the handler binds exactly what was
/// validated.
pub fn validate_practice_session(input: &SessionInput<'_>) -> AppResult<(NaiveDate, NaiveDate)> {
    require("title", input.title)?;
    require("start_date", input.start_date)?;
    require("end_date", input.end_date)?;
    let start = parse_date("start date", input.start_date)?;
    let end = parse_date("end date", input.end_date)?;
    // Strictly after — equal dates are invalid.
    if end <= start {
        return Err(AppError::BadRequest("End date must be after start date".into()));
    }
    if let Some(status) = input.status {
        validate_session_status(status)?;
    }
    Ok((start, end))
}

pub fn validate_report_title(title: &str) -> AppResult<()> {
    // Bounds are character counts, not byte lengths.
    let chars = title.chars().count();
    if chars < 5 || chars > 100 {
        return Err(AppError::BadRequest(
            "Title must be between 5 and 100 characters".into(),
        ));
    }
    Ok(())
}

pub fn validate_report_content(content: &str) -> AppResult<()> {
    if content.chars().count() < 10 {
        return Err(AppError::BadRequest(
            "Content must be at least 10 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Clone, Copy)]
pub struct ReportInput<'a> {
    pub title:       &'a str,
    pub content:     &'a str,
    pub report_type: &'a str,
}

pub fn validate_report(input: &ReportInput<'_>) -> AppResult<()> {
    require("title", input.title)?;
    require("content", input.content)?;
    require("report_type", input.report_type)?;
    validate_report_title(input.title)?;
    validate_report_content(input.content)?;
    validate_report_type(input.report_type)?;
    Ok(())
}

#[derive(Clone, Copy)]
pub struct EvaluationInput<'a> {
    pub student_id:           &'a str,
    pub visit_date:           &'a str,
    pub teaching_skills:      i32,
    pub classroom_management: i32,
    pub lesson_preparation:   i32,
    pub professionalism:      i32,
    pub overall_grade:        &'a str,
}

pub fn validate_evaluation(input: &EvaluationInput<'_>) -> AppResult<NaiveDate> {
    require("student_id", input.student_id)?;
    require("visit_date", input.visit_date)?;
    require("overall_grade", input.overall_grade)?;
    let visit_date = parse_date("visit date", input.visit_date)?;
    validate_rating("teaching_skills", input.teaching_skills)?;
    validate_rating("classroom_management", input.classroom_management)?;
    validate_rating("lesson_preparation", input.lesson_preparation)?;
    validate_rating("professionalism", input.professionalism)?;
    validate_grade(input.overall_grade)?;
    Ok(visit_date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: AppError) -> String {
        err.to_string()
    }

    // ── Formats ──────────────────────────────────────────────

    #[test]
    fn username_accepts_letters_digits_underscore() {
        assert!(validate_username("jane_d0e").is_ok());
        assert!(validate_username("abc").is_ok());
        assert!(validate_username("a".repeat(20).as_str()).is_ok());
    }

    #[test]
    fn username_rejects_bad_length_and_chars() {
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"a".repeat(21)).is_err());
        assert!(validate_username("jane doe").is_err());
        assert!(validate_username("jane-doe").is_err());
    }

    #[test]
    fn email_shape_is_permissive_but_requires_domain_and_tld() {
        assert!(validate_email("a.student@uni.edu").is_ok());
        assert!(validate_email("x+y@sub.example.co").is_ok());
        assert!(validate_email("no-at-sign").is_err());
        assert!(validate_email("@uni.edu").is_err());
        assert!(validate_email("user@uni").is_err());
        assert!(validate_email("user@uni.e1").is_err());
    }

    #[test]
    fn phone_allows_optional_plus_and_10_to_15_digits() {
        assert!(validate_phone("0123456789").is_ok());
        assert!(validate_phone("+234801234567").is_ok());
        assert!(validate_phone("123456789").is_err());        // 9 digits
        assert!(validate_phone("+1234567890123456").is_err()); // 16 digits
        assert!(validate_phone("01234 56789").is_err());
    }

    #[test]
    fn password_minimum_is_six_chars() {
        assert!(validate_password("12345").is_err());
        assert!(validate_password("123456").is_ok());
    }

    // ── Enumerations and ranges ──────────────────────────────

    #[test]
    fn role_set_is_closed() {
        for role in ["admin", "lecturer", "student"] {
            assert!(validate_role(role).is_ok());
        }
        assert!(validate_role("superadmin").is_err());
    }

    #[test]
    fn ratings_are_1_to_10_inclusive() {
        assert!(validate_rating("teaching_skills", 1).is_ok());
        assert!(validate_rating("teaching_skills", 10).is_ok());
        let err = validate_rating("teaching_skills", 11).unwrap_err();
        assert_eq!(message(err), "teaching_skills must be between 1 and 10");
        assert!(validate_rating("professionalism", 0).is_err());
        assert!(validate_rating("professionalism", -3).is_err());
    }

    #[test]
    fn grades_and_report_types_reject_outsiders() {
        assert!(validate_grade("B+").is_ok());
        assert!(validate_grade("E").is_err());
        assert!(validate_report_type("lesson_plan").is_ok());
        assert!(validate_report_type("monthly").is_err());
    }

    // ── Entity validators: first failure wins ────────────────

    #[test]
    fn registration_reports_missing_fields_in_declaration_order() {
        let mut input = RegistrationInput {
            username:   "",
            email:      "",
            password:   "",
            first_name: "",
            last_name:  "",
            role:       "",
        };
        assert_eq!(message(validate_registration(&input).unwrap_err()), "username is required");

        input.username = "jdoe";
        assert_eq!(message(validate_registration(&input).unwrap_err()), "password is required");

        input.password = "secret1";
        assert_eq!(message(validate_registration(&input).unwrap_err()), "email is required");
    }

    #[test]
    fn registration_checks_presence_before_format() {
        // A present-but-invalid email fails on format, not presence.
        let input = RegistrationInput {
            username:   "jdoe",
            email:      "not-an-email",
            password:   "secret1",
            first_name: "Jane",
            last_name:  "Doe",
            role:       "student",
        };
        assert_eq!(message(validate_registration(&input).unwrap_err()), "Invalid email format");
    }

    #[test]
    fn school_optional_contacts_are_skipped_when_absent_or_empty() {
        let input = SchoolInput {
            name:          "Oak High",
            address:       "Oak St",
            city:          "Springfield",
            state:         "IL",
            contact_email: None,
            contact_phone: Some(""),
        };
        assert!(validate_school(&input).is_ok());
    }

    #[test]
    fn school_requires_core_fields() {
        let input = SchoolInput {
            name:          "Oak High",
            address:       "",
            city:          "Springfield",
            state:         "IL",
            contact_email: None,
            contact_phone: None,
        };
        assert_eq!(message(validate_school(&input).unwrap_err()), "address is required");
    }

    #[test]
    fn session_end_date_must_be_strictly_after_start() {
        let ok = SessionInput {
            title:      "Spring placement",
            start_date: "2025-02-01",
            end_date:   "2025-05-01",
            status:     Some("upcoming"),
        };
        assert!(validate_practice_session(&ok).is_ok());

        let equal = SessionInput { end_date: "2025-02-01", ..ok };
        assert_eq!(
            message(validate_practice_session(&equal).unwrap_err()),
            "End date must be after start date"
        );
    }

    #[test]
    fn session_rejects_malformed_dates_and_statuses() {
        let bad_date = SessionInput {
            title:      "Spring placement",
            start_date: "01/02/2025",
            end_date:   "2025-05-01",
            status:     None,
        };
        assert!(validate_practice_session(&bad_date).is_err());

        let bad_status = SessionInput {
            title:      "Spring placement",
            start_date: "2025-02-01",
            end_date:   "2025-05-01",
            status:     Some("archived"),
        };
        assert_eq!(
            message(validate_practice_session(&bad_status).unwrap_err()),
            "Status must be one of: upcoming, ongoing, completed"
        );
    }

    #[test]
    fn report_bounds_are_5_to_100_title_and_10_content() {
        let ok = ReportInput { title: "Day 1", content: "0123456789", report_type: "daily" };
        assert!(validate_report(&ok).is_ok());

        let short_title = ReportInput { title: "Day", ..ok };
        assert_eq!(
            message(validate_report(&short_title).unwrap_err()),
            "Title must be between 5 and 100 characters"
        );

        let short_content = ReportInput { content: "012345678", ..ok };
        assert_eq!(
            message(validate_report(&short_content).unwrap_err()),
            "Content must be at least 10 characters"
        );
    }

    #[test]
    fn report_bounds_count_characters_not_bytes() {
        // 4 characters, 8 bytes — still short of the 5-character minimum.
        assert!(validate_report_title("éééé").is_err());
        assert!(validate_report_title("ééééé").is_ok());

        // 9 characters, 18 bytes — still short of the 10-character minimum.
        assert!(validate_report_content("ééééééééé").is_err());
        assert!(validate_report_content("éééééééééé").is_ok());
    }

    #[test]
    fn evaluation_validates_ratings_before_grade() {
        let input = EvaluationInput {
            student_id:           "s-1",
            visit_date:           "2025-03-10",
            teaching_skills:      11,
            classroom_management: 8,
            lesson_preparation:   8,
            professionalism:      8,
            overall_grade:        "Z",
        };
        // teaching_skills fails first even though the grade is also invalid.
        assert_eq!(
            message(validate_evaluation(&input).unwrap_err()),
            "teaching_skills must be between 1 and 10"
        );
    }

    #[test]
    fn evaluation_happy_path_returns_parsed_visit_date() {
        let input = EvaluationInput {
            student_id:           "s-1",
            visit_date:           "2025-03-10",
            teaching_skills:      8,
            classroom_management: 8,
            lesson_preparation:   8,
            professionalism:      8,
            overall_grade:        "B+",
        };
        let date = validate_evaluation(&input).unwrap();
        assert_eq!(date, chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
    }
}
