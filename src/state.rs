//! Shared handles threaded through the router via `axum::extract::State`.

use crate::{config::Config, db::Db};

/// Per-request handle bundle. Cloning is cheap: the pool clones a reference
/// to its shared connection set and the config is plain owned strings.
#[derive(Clone)]
pub struct AppState {
    pub pool:   Db,
    pub config: Config,
}
