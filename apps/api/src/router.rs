use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};

use scheduling_cell::router::scheduling_routes;
use shared_config::AppConfig;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    let configured = state.is_configured();

    Router::new()
        .route("/", get(move || async move { health(configured) }))
        .nest("/tenants", scheduling_routes(state))
}

fn health(configured: bool) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "clinic-rules-api",
        "dataSourceConfigured": configured
    }))
}
