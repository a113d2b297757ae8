use std::path::Path;

use lib::slots::booking_gateway::BookingGateway;
use lib::slots::errors::{DecodeError, GatewayError};
use lib::slots::helpers::read_json;
use lib::slots::models::booking_model::{parse_date, Coordinate, ShiftType, SlotLevel, SlotNumber};
use lib::slots::snapshot_getter::{ShiftApi, SnapshotGetter};
use serde_json::{json, Value};
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fixture(name: &str) -> Value {
    read_json(Path::new(name)).unwrap()
}

fn morning_slot() -> Coordinate {
    Coordinate::new(
        parse_date("2025-03-03").unwrap(),
        ShiftType::Morning,
        SlotLevel::L3,
        SlotNumber::Two,
    )
}

async fn mount_snapshot(server: &MockServer, applications: Value) {
    Mock::given(method("GET"))
        .and(path("/api/applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(applications))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/slot_controls"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fixture("tests/test.slot_controls.json")),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn snapshot_is_fetched_with_the_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/applications"))
        .and(header("cookie", "session=abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fixture("tests/test.applications.json")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/slot_controls"))
        .and(header("cookie", "session=abc"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(fixture("tests/test.slot_controls.json")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &format!("{}/", server.uri()), "Student Coach")
        .with_session_cookie("session=abc");
    let snapshot = api.get_snapshot().await.unwrap();

    assert_eq!(snapshot.records().count(), 6);
    assert_eq!(snapshot.records_at(&morning_slot()).len(), 2);
    assert!(snapshot.control_at(&morning_slot()).unwrap().is_open);
}

#[tokio::test]
async fn unknown_status_on_the_wire_is_a_decode_error() {
    let server = MockServer::start().await;
    mount_snapshot(
        &server,
        json!([{
            "division": "Student Coach",
            "student_id": "S1",
            "student_name": "Alex",
            "date": "2025-03-03",
            "shift_type": "Morning",
            "slot_level": "L3",
            "slot_number": 1,
            "status": "On hold"
        }]),
    )
    .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    let err = api.get_snapshot().await.unwrap_err();
    assert!(matches!(
        err,
        GatewayError::Decode(DecodeError::UnknownStatus(ref status)) if status == "On hold"
    ));
}

#[tokio::test]
async fn server_error_on_fetch_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    assert!(matches!(
        api.get_snapshot().await,
        Err(GatewayError::Transport(_))
    ));
}

#[tokio::test]
async fn booking_posts_the_coordinate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .and(body_json(json!({
            "date": "2025-03-03",
            "shift_type": "Morning",
            "slot_level": "L3",
            "slot_number": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "success",
            "message": "Shift booked (Pending) — Preference 3",
            "preference": 3
        })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    let message = api.book(&morning_slot()).await.unwrap();
    assert_eq!(message.as_deref(), Some("Shift booked (Pending) — Preference 3"));
}

#[tokio::test]
async fn server_side_cap_refusal_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/submit"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "status": "error",
            "message": "You can only submit up to 3 preferences per month."
        })))
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    let err = api.book(&morning_slot()).await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected { status: 400, .. }));
    assert_eq!(
        err.to_string(),
        "You can only submit up to 3 preferences per month."
    );
}

#[tokio::test]
async fn cancel_uses_the_short_field_names() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/coach/cancel"))
        .and(body_json(json!({
            "date": "2025-03-03",
            "shift": "Morning",
            "level": "L3",
            "slot": 2
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    assert_eq!(api.cancel(&morning_slot()).await.unwrap(), None);
}

#[tokio::test]
async fn html_error_page_is_an_unexpected_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/coach/cancel"))
        .respond_with(ResponseTemplate::new(502).set_body_string("<html>Bad Gateway</html>"))
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    assert!(matches!(
        api.cancel(&morning_slot()).await,
        Err(GatewayError::UnexpectedResponse { status: 502, .. })
    ));
}

#[tokio::test]
async fn pending_applications_are_decoded() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/pending_applications"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([{
            "division": "Student Coach",
            "student_id": "S3",
            "student_name": "Chen",
            "date": "2025-03-03",
            "shift_type": "Morning",
            "slot_level": "L3",
            "slot_number": 2,
            "status": "Pending "
        }])))
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    let pending = api.pending_applications().await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].student_name, "Chen");
    assert_eq!(pending[0].coordinate, morning_slot());
}

#[tokio::test]
async fn approve_posts_the_applicant() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/approve"))
        .and(body_json(json!({
            "date": "2025-03-03",
            "shift": "Morning",
            "level": "L3",
            "slot": 2,
            "student_id": "S3"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "ok" })))
        .expect(1)
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    assert_eq!(api.approve(&morning_slot(), "S3").await.unwrap(), None);
}

#[tokio::test]
async fn reject_of_unknown_application_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/admin/reject"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "status": "not_found" })))
        .mount(&server)
        .await;

    let api = ShiftApi::new(reqwest::Client::new(), &server.uri(), "Student Coach");
    let err = api.reject(&morning_slot(), "S9").await.unwrap_err();
    assert!(matches!(err, GatewayError::Rejected { status: 200, .. }));
    assert_eq!(err.to_string(), "Booking not found");
}
