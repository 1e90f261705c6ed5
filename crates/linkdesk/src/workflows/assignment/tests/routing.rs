use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::common::*;
use crate::workflows::assignment::router::{self, OpenSessionRequest};
use crate::workflows::assignment::{
    assignment_router, AssignmentConfig, AssignmentService, OrderId,
};

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request builds")
}

fn empty_request(method: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn open_route_returns_plan() {
    let (service, _, _) = build_service();
    let app = assignment_router(Arc::new(service));

    let response = app
        .oneshot(json_request(
            "POST",
            "/api/v1/orders/order-100/assignments",
            json!({ "domain_ids": ["D1", "D2", "D3"] }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::CREATED);
    let body = read_json_body(response).await;
    assert_eq!(body["order_id"], "order-100");
    assert_eq!(body["suggestions"][0]["confidence"], "perfect");
    assert_eq!(body["suggestions"][0]["score"], 100);
    assert_eq!(body["stats"]["fallback"], 1);
}

#[tokio::test]
async fn open_handler_maps_unavailable_analysis_to_bad_gateway() {
    let service = Arc::new(AssignmentService::new(
        Arc::new(MemoryLineItems::with_order(scenario_line_items())),
        Arc::new(UnavailableDomains),
        Arc::new(RecordingOrders::new(GatewayMode::AcceptAll)),
        AssignmentConfig::default(),
    ));

    let response = router::open_handler(
        State(service),
        Path(ORDER.to_string()),
        axum::Json(OpenSessionRequest {
            domain_ids: scenario_domain_ids(),
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn view_without_session_is_not_found() {
    let (service, _, _) = build_service();
    let app = assignment_router(Arc::new(service));

    let response = app
        .oneshot(empty_request("GET", "/api/v1/orders/order-100/assignments"))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = read_json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("order-100"));
}

#[tokio::test]
async fn reassign_route_reports_displaced_line_item() {
    let (service, _, _) = build_service();
    let service = Arc::new(service);
    service
        .open(&order_id(), &scenario_domain_ids())
        .expect("session opens");
    let app = assignment_router(service);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/orders/order-100/assignments/C",
            json!({ "domain_id": "D1" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["displaced"], "A");
    assert_eq!(body["suggestion"]["domain_id"], "D1");
    assert_eq!(body["session"]["stats"]["unassigned"], 1);
}

#[tokio::test]
async fn reassign_route_rejects_unknown_domain() {
    let (service, _, _) = build_service();
    let service = Arc::new(service);
    service
        .open(&order_id(), &scenario_domain_ids())
        .expect("session opens");
    let app = assignment_router(service);

    let response = app
        .oneshot(json_request(
            "PUT",
            "/api/v1/orders/order-100/assignments/A",
            json!({ "domain_id": "D77" }),
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unassign_and_regenerate_routes_round_trip() {
    let (service, _, _) = build_service();
    let service = Arc::new(service);
    service
        .open(&order_id(), &scenario_domain_ids())
        .expect("session opens");
    let app = assignment_router(service);

    let response = app
        .clone()
        .oneshot(empty_request(
            "DELETE",
            "/api/v1/orders/order-100/assignments/B",
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["stats"]["unassigned"], 1);

    let response = app
        .oneshot(empty_request(
            "POST",
            "/api/v1/orders/order-100/assignments/regenerate",
        ))
        .await
        .expect("router responds");
    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body["stats"]["unassigned"], 0);
}

#[tokio::test]
async fn commit_route_returns_per_item_outcomes() {
    let (service, _, orders) = build_service();
    let service = Arc::new(service);
    service
        .open(&order_id(), &scenario_domain_ids())
        .expect("session opens");
    let app = assignment_router(service);

    let response = app
        .oneshot(empty_request(
            "POST",
            "/api/v1/orders/order-100/assignments/commit",
        ))
        .await
        .expect("router responds");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let outcomes = body["outcomes"].as_array().expect("outcomes");
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes
        .iter()
        .all(|outcome| outcome["status"] == "persisted"));
    assert_eq!(orders.batches().len(), 1);
}

#[tokio::test]
async fn commit_route_maps_gateway_failure() {
    let (service, _, orders) = build_service();
    let service = Arc::new(service);
    service
        .open(&order_id(), &scenario_domain_ids())
        .expect("session opens");
    orders.set_mode(GatewayMode::Offline);

    let response = router::commit_handler(State(service.clone()), Path(ORDER.to_string())).await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert!(service.view(&order_id()).is_ok());
}

#[tokio::test]
async fn commit_route_rejects_empty_suggestion_set() {
    let (service, _, orders) = build_service();
    let service = Arc::new(service);
    service.open(&order_id(), &[]).expect("session opens");

    let response = router::commit_handler(State(service.clone()), Path(ORDER.to_string())).await;

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert!(orders.batches().is_empty());
    assert!(service.view(&order_id()).is_ok());
}

#[tokio::test]
async fn stalled_commit_leaves_other_orders_responsive() {
    let (service, line_items, orders) = build_service();
    let service = Arc::new(service);
    line_items.insert(OrderId("order-200".to_string()), scenario_line_items());
    service
        .open(&order_id(), &scenario_domain_ids())
        .expect("first session opens");
    service
        .open(&OrderId("order-200".to_string()), &scenario_domain_ids())
        .expect("second session opens");
    orders.set_mode(GatewayMode::Stall(Duration::from_millis(1500)));
    let app = assignment_router(service);

    let commit = tokio::spawn(app.clone().oneshot(empty_request(
        "POST",
        "/api/v1/orders/order-100/assignments/commit",
    )));
    tokio::task::spawn_blocking({
        let orders = orders.clone();
        move || orders.wait_for_batches(1)
    })
    .await
    .expect("batch observed");

    let started = Instant::now();
    let response = app
        .oneshot(empty_request("GET", "/api/v1/orders/order-200/assignments"))
        .await
        .expect("router responds");
    let waited = started.elapsed();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(waited < Duration::from_millis(500), "view waited {waited:?}");

    let committed = commit
        .await
        .expect("commit task joins")
        .expect("router responds");
    assert_eq!(committed.status(), StatusCode::OK);
}
