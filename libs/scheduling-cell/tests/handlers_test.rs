// libs/scheduling-cell/tests/handlers_test.rs
//
// Handlers and router against a mocked Supabase REST layer.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{Request, StatusCode},
    response::IntoResponse,
    Json,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use scheduling_cell::handlers::{check_appointment, get_day_slots};
use scheduling_cell::router::scheduling_routes;
use scheduling_cell::{CheckAppointmentRequest, DaySlotsRequest};
use shared_config::AppConfig;
use shared_models::error::AppError;

struct Ids {
    tenant: Uuid,
    rule_set: Uuid,
    rule: Uuid,
}

fn config_for(server: &MockServer) -> Arc<AppConfig> {
    let mut config = AppConfig::for_supabase(server.uri(), "test-anon-key");
    config.slot_granularity_minutes = 30;
    Arc::new(config)
}

/// Checkups blocked on Mondays; dr-a works 09:00-10:00 UTC on Mondays.
async fn mount_clinic(server: &MockServer) -> Ids {
    let ids = Ids {
        tenant: Uuid::new_v4(),
        rule_set: Uuid::new_v4(),
        rule: Uuid::new_v4(),
    };
    let and_id = Uuid::new_v4();

    let rows = json!([
        { "id": ids.rule, "tenant_id": ids.tenant, "rule_set_id": ids.rule_set,
          "is_root": true, "enabled": true, "parent_id": null, "sort_order": 0, "node_type": "AND" },
        { "id": and_id, "tenant_id": ids.tenant, "rule_set_id": ids.rule_set,
          "is_root": false, "parent_id": ids.rule, "sort_order": 0, "node_type": "AND" },
        { "id": Uuid::new_v4(), "tenant_id": ids.tenant, "rule_set_id": ids.rule_set,
          "is_root": false, "parent_id": and_id, "sort_order": 0, "node_type": "CONDITION",
          "condition_type": "APPOINTMENT_TYPE", "operator": "IS", "value_ids": ["checkup"] },
        { "id": Uuid::new_v4(), "tenant_id": ids.tenant, "rule_set_id": ids.rule_set,
          "is_root": false, "parent_id": and_id, "sort_order": 1, "node_type": "CONDITION",
          "condition_type": "DAY_OF_WEEK", "operator": "EQUALS", "value_number": 1 }
    ]);

    Mock::given(method("GET"))
        .and(path("/rest/v1/rule_conditions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(rows))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/practitioners"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            { "id": "dr-a", "tenant_id": ids.tenant, "display_name": "Dr Adams", "tags": ["senior"] }
        ])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/appointments"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/base_schedules"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "id": Uuid::new_v4(),
            "tenant_id": ids.tenant,
            "practitioner_id": "dr-a",
            "day_of_week": 1,
            "start_time": "09:00:00",
            "end_time": "10:00:00",
            "breaks": [],
            "location_id": "main"
        }])))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/rest/v1/manual_blocks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(server)
        .await;

    ids
}

fn checkup_request(start: &str) -> CheckAppointmentRequest {
    serde_json::from_value(json!({
        "appointmentTypeId": "checkup",
        "practitionerId": "dr-a",
        "startTime": start
    }))
    .unwrap()
}

#[tokio::test]
async fn check_handler_reports_blocking_rules() {
    let server = MockServer::start().await;
    let ids = mount_clinic(&server).await;

    let Json(body) = check_appointment(
        State(config_for(&server)),
        Path((ids.tenant, ids.rule_set)),
        Json(checkup_request("2024-03-04T09:30:00Z")),
    )
    .await
    .unwrap();

    assert_eq!(body, json!({ "isBlocked": true, "blockedByRuleIds": [ids.rule] }));
}

#[tokio::test]
async fn check_handler_allows_other_days() {
    let server = MockServer::start().await;
    let ids = mount_clinic(&server).await;

    let Json(body) = check_appointment(
        State(config_for(&server)),
        Path((ids.tenant, ids.rule_set)),
        Json(checkup_request("2024-03-05T09:30:00Z")),
    )
    .await
    .unwrap();

    assert_eq!(body["isBlocked"], json!(false));
    assert_eq!(body["blockedByRuleIds"], json!([]));
}

#[tokio::test]
async fn slots_handler_returns_annotated_grid() {
    let server = MockServer::start().await;
    let ids = mount_clinic(&server).await;
    let request: DaySlotsRequest = serde_json::from_value(json!({
        "date": "2024-03-04",
        "appointment_type_id": "checkup"
    }))
    .unwrap();

    let Json(body) = get_day_slots(State(config_for(&server)), Path((ids.tenant, ids.rule_set)), Query(request))
        .await
        .unwrap();

    assert_eq!(body["total"], json!(2));
    assert_eq!(body["available"], json!(0));
    assert_eq!(body["timezone"], json!("UTC"));
    let first = &body["slots"][0];
    assert_eq!(first["startTime"], json!("2024-03-04T09:00:00Z"));
    assert_eq!(first["durationMinutes"], json!(30));
    assert_eq!(first["practitionerId"], json!("dr-a"));
    assert_eq!(first["locationId"], json!("main"));
    assert_eq!(first["status"], json!("BLOCKED"));
    assert_eq!(first["blockedByRuleId"], json!(ids.rule));
    assert!(first["blockedReason"].is_string());
}

#[tokio::test]
async fn upstream_failure_maps_to_bad_gateway() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("database unavailable"))
        .mount(&server)
        .await;

    let err = check_appointment(
        State(config_for(&server)),
        Path((Uuid::new_v4(), Uuid::new_v4())),
        Json(checkup_request("2024-03-04T09:30:00Z")),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::UpstreamUnavailable(_)));
    assert_eq!(err.into_response().status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn router_serves_slots_by_query_string() {
    let server = MockServer::start().await;
    let ids = mount_clinic(&server).await;
    let app = scheduling_routes(config_for(&server));

    let uri = format!(
        "/{}/rule-sets/{}/slots?date=2024-03-05&appointment_type_id=checkup",
        ids.tenant, ids.rule_set
    );
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["date"], json!("2024-03-05"));
}

#[tokio::test]
async fn router_rejects_malformed_ids() {
    let server = MockServer::start().await;
    let app = scheduling_routes(config_for(&server));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/not-a-uuid/rule-sets/also-not/check")
                .header("content-type", "application/json")
                .body(Body::from(json!({}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
