use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use scheduling_cell::collaborators::{NullNotifier, StaticTreatmentDirectory};
use scheduling_cell::models::CreateAvailabilityRequest;
use scheduling_cell::router::{appointment_routes, availability_routes, free_slot_routes};
use scheduling_cell::state::SchedulingState;
use scheduling_cell::store::memory::{InMemoryAppointmentStore, InMemoryAvailabilityStore};
use shared_utils::test_utils::{JwtTestUtils, TestConfig, TestUser};

// 2025-06-02 is a Monday.
fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

struct TestApp {
    state: Arc<SchedulingState>,
    jwt_secret: String,
    therapist_id: Uuid,
    treatment_id: Uuid,
}

impl TestApp {
    async fn new() -> Self {
        let config = TestConfig::default();
        let jwt_secret = config.jwt_secret.clone();
        let therapist_id = Uuid::new_v4();
        let treatment_id = Uuid::new_v4();

        let treatments =
            Arc::new(StaticTreatmentDirectory::new().with_treatment(treatment_id, 30, 40.0));

        let state = Arc::new(SchedulingState::new(
            config.to_arc(),
            Arc::new(InMemoryAvailabilityStore::new()),
            Arc::new(InMemoryAppointmentStore::new()),
            treatments,
            Arc::new(NullNotifier),
        ));

        state
            .availability
            .add_window(
                therapist_id,
                CreateAvailabilityRequest {
                    weekday: "monday".to_string(),
                    start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();

        Self {
            state,
            jwt_secret,
            therapist_id,
            treatment_id,
        }
    }

    fn appointment_app(&self) -> Router {
        appointment_routes(Arc::clone(&self.state))
    }

    fn bearer(&self, user: &TestUser) -> String {
        JwtTestUtils::bearer_header(user, &self.jwt_secret)
    }

    fn booking_payload(&self, patient_id: Uuid, start: DateTime<Utc>) -> Value {
        json!({
            "patient_id": patient_id,
            "therapist_id": self.therapist_id,
            "treatment_id": self.treatment_id,
            "start_time": start.to_rfc3339(),
            "notes": null,
        })
    }
}

async fn response_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn booking_requires_authentication() {
    let app = TestApp::new().await;

    let response = app
        .appointment_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .body(Body::from(
                    app.booking_payload(Uuid::new_v4(), monday_at(10, 0)).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn patient_books_their_own_appointment() {
    let app = TestApp::new().await;
    let patient_id = Uuid::new_v4();
    let patient = TestUser::patient("ana@example.com").with_id(patient_id);

    let response = app
        .appointment_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .header("Authorization", app.bearer(&patient))
                .body(Body::from(
                    app.booking_payload(patient_id, monday_at(10, 0)).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["patient_id"], json!(patient_id));
}

#[tokio::test]
async fn patient_cannot_book_for_someone_else() {
    let app = TestApp::new().await;
    let patient = TestUser::patient("ana@example.com");

    let response = app
        .appointment_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .header("Authorization", app.bearer(&patient))
                .body(Body::from(
                    app.booking_payload(Uuid::new_v4(), monday_at(10, 0)).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn conflicting_booking_maps_to_http_conflict() {
    let app = TestApp::new().await;
    let patient_id = Uuid::new_v4();
    let patient = TestUser::patient("ana@example.com").with_id(patient_id);

    for (start, expected) in [
        (monday_at(10, 0), StatusCode::OK),
        (monday_at(10, 15), StatusCode::CONFLICT),
    ] {
        let response = app
            .appointment_app()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/")
                    .header("content-type", "application/json")
                    .header("Authorization", app.bearer(&patient))
                    .body(Body::from(
                        app.booking_payload(patient_id, start).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), expected);
    }
}

#[tokio::test]
async fn booking_outside_availability_maps_to_bad_request() {
    let app = TestApp::new().await;
    let patient_id = Uuid::new_v4();
    let patient = TestUser::patient("ana@example.com").with_id(patient_id);

    // Tuesday: no window.
    let tuesday = Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap();
    let response = app
        .appointment_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/")
                .header("content-type", "application/json")
                .header("Authorization", app.bearer(&patient))
                .body(Body::from(app.booking_payload(patient_id, tuesday).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn override_flag_is_ignored_for_non_admins() {
    let app = TestApp::new().await;
    let patient_id = Uuid::new_v4();
    let patient = TestUser::patient("ana@example.com").with_id(patient_id);

    // Seed two appointments directly through the service layer.
    app.state
        .booking
        .create_appointment(serde_json::from_value(app.booking_payload(patient_id, monday_at(9, 0))).unwrap())
        .await
        .unwrap();
    let second = app
        .state
        .booking
        .create_appointment(serde_json::from_value(app.booking_payload(patient_id, monday_at(13, 0))).unwrap())
        .await
        .unwrap();

    // A patient asserting the override still gets the conflict.
    let response = app
        .appointment_app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/{}", second.id))
                .header("content-type", "application/json")
                .header("Authorization", app.bearer(&patient))
                .body(Body::from(
                    json!({
                        "start_time": monday_at(9, 15).to_rfc3339(),
                        "allow_override": true,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_override_moves_the_appointment() {
    let app = TestApp::new().await;
    let patient_id = Uuid::new_v4();
    let admin = TestUser::admin("admin@example.com");

    app.state
        .booking
        .create_appointment(serde_json::from_value(app.booking_payload(patient_id, monday_at(9, 0))).unwrap())
        .await
        .unwrap();
    let movable = app
        .state
        .booking
        .create_appointment(serde_json::from_value(app.booking_payload(patient_id, monday_at(13, 0))).unwrap())
        .await
        .unwrap();

    let response = app
        .appointment_app()
        .oneshot(
            Request::builder()
                .method("PUT")
                .uri(format!("/{}", movable.id))
                .header("content-type", "application/json")
                .header("Authorization", app.bearer(&admin))
                .body(Body::from(
                    json!({
                        "start_time": monday_at(9, 15).to_rfc3339(),
                        "allow_override": true,
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    let moved_to: DateTime<Utc> = serde_json::from_value(body["start_time"].clone()).unwrap();
    assert_eq!(moved_to, monday_at(9, 15));
}

#[tokio::test]
async fn cancelling_an_unknown_appointment_is_not_found() {
    let app = TestApp::new().await;
    let admin = TestUser::admin("admin@example.com");

    let response = app
        .appointment_app()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/{}", Uuid::new_v4()))
                .header("Authorization", app.bearer(&admin))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn free_slots_endpoint_lists_open_starts() {
    let app = TestApp::new().await;
    let patient = TestUser::patient("ana@example.com");

    let response = free_slot_routes(Arc::clone(&app.state))
        .oneshot(
            Request::builder()
                .method("GET")
                .uri(format!(
                    "/{}/2025-06-02?duration_minutes=240",
                    app.therapist_id
                ))
                .header("Authorization", app.bearer(&patient))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    // 09:00-17:00 window and a 4-hour duration leave exactly two starts.
    assert_eq!(body.as_array().map(|a| a.len()), Some(2));
}

#[tokio::test]
async fn inverted_availability_window_is_rejected() {
    let app = TestApp::new().await;
    let admin = TestUser::admin("admin@example.com");

    let response = availability_routes(Arc::clone(&app.state))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}", app.therapist_id))
                .header("content-type", "application/json")
                .header("Authorization", app.bearer(&admin))
                .body(Body::from(
                    json!({
                        "weekday": "monday",
                        "start_time": "15:00:00",
                        "end_time": "09:00:00",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn therapist_cannot_edit_another_therapists_schedule() {
    let app = TestApp::new().await;
    let other_therapist = TestUser::therapist("other@example.com");

    let response = availability_routes(Arc::clone(&app.state))
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/{}", app.therapist_id))
                .header("content-type", "application/json")
                .header("Authorization", app.bearer(&other_therapist))
                .body(Body::from(
                    json!({
                        "weekday": "tuesday",
                        "start_time": "09:00:00",
                        "end_time": "12:00:00",
                    })
                    .to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
