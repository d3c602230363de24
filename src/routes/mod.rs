use axum::{middleware, Router};
use crate::{
    middleware::auth_guard::require_auth,
    state::AppState,
};

mod admin;
mod auth;
mod lecturer;
mod notifications;
mod student;

/// Build the full `/api` router.
///
/// `POST /auth/login` is the only public route; everything else is wrapped in
/// the bearer-token [`require_auth`] middleware. Role requirements are
/// declared per feature router via `route_layer` guards.
pub fn all_routes(state: AppState) -> Router<AppState> {
    let auth_mw = middleware::from_fn_with_state(state, require_auth);
    Router::new()
        .merge(auth::public_router())
        .merge(
            Router::new()
                .merge(auth::router())
                .merge(admin::router())
                .merge(lecturer::router())
                .merge(student::router())
                .merge(notifications::router())
                .route_layer(auth_mw),
        )
}
