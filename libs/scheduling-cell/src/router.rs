// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use shared_config::AppConfig;

use crate::handlers;

/// Mounted under `/tenants`.
pub fn scheduling_routes(state: Arc<AppConfig>) -> Router {
    Router::new()
        .route("/{tenant_id}/rule-sets/{rule_set_id}/check", post(handlers::check_appointment))
        .route("/{tenant_id}/rule-sets/{rule_set_id}/slots", get(handlers::get_day_slots))
        .with_state(state)
}
