//! Role-based authorization guards.
//!
//! Each feature router declares its required role once via
//! `route_layer(middleware::from_fn(require_...))` instead of re-checking the
//! role inside every handler. Relationship-scoped checks (lecturer ↔ student)
//! stay in the handlers because they depend on the target entity.

use axum::{
    extract::{Extension, Request},
    middleware::Next,
    response::Response,
};

use crate::errors::AppError;
use crate::middleware::auth_guard::AuthUser;
use crate::models::UserRole;

/// Middleware: require the `admin` role.
pub async fn require_admin(
    Extension(user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.role != UserRole::Admin {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// Middleware: require the `lecturer` role.
pub async fn require_lecturer(
    Extension(user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.role != UserRole::Lecturer {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}

/// Middleware: require the `student` role.
pub async fn require_student(
    Extension(user): Extension<AuthUser>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if user.role != UserRole::Student {
        return Err(AppError::Forbidden);
    }
    Ok(next.run(req).await)
}
