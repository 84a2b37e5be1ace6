use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::error::AppError;

use crate::models::{CheckAppointmentRequest, DaySlotsRequest};
use crate::services::scheduler::SlotSchedulerService;

#[axum::debug_handler]
pub async fn check_appointment(
    State(state): State<Arc<AppConfig>>,
    Path((tenant_id, rule_set_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<CheckAppointmentRequest>,
) -> Result<Json<Value>, AppError> {
    let scheduler = SlotSchedulerService::new(&state)?;

    let result = scheduler.check_appointment(tenant_id, rule_set_id, &request).await?;

    Ok(Json(json!(result)))
}

#[axum::debug_handler]
pub async fn get_day_slots(
    State(state): State<Arc<AppConfig>>,
    Path((tenant_id, rule_set_id)): Path<(Uuid, Uuid)>,
    Query(mut request): Query<DaySlotsRequest>,
) -> Result<Json<Value>, AppError> {
    let scheduler = SlotSchedulerService::new(&state)?;

    // Lead-time rules measure from the moment the grid is requested.
    if request.requested_at.is_none() {
        request.requested_at = Some(Utc::now());
    }

    let slots = scheduler.get_day_slots(tenant_id, rule_set_id, &request).await?;
    let available = slots.iter().filter(|slot| slot.is_available()).count();

    Ok(Json(json!({
        "date": request.date,
        "timezone": scheduler.timezone().name(),
        "slots": slots,
        "total": slots.len(),
        "available": available
    })))
}
