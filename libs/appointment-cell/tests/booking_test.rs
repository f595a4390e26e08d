use assert_matches::assert_matches;
use chrono::{NaiveDate, NaiveTime};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use appointment_cell::models::{
    AppointmentError, AppointmentStatus, AppointmentType, CreateAppointmentRequest, GENERIC_BOOKING_FAILURE,
};
use appointment_cell::services::resolver::{materialize_slots, other_appointments_summary};
use appointment_cell::services::AppointmentBookingService;
use shared_utils::test_utils::{MockApiResponses, TestConfig};

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

fn request() -> CreateAppointmentRequest {
    CreateAppointmentRequest {
        patient_id: "pat-1".to_string(),
        doctor_id: "doc-a".to_string(),
        appointment_date: tuesday(),
        start_time: t(9),
        end_time: t(10),
        appointment_type: AppointmentType::Consultation,
        reason: "Persistent headaches".to_string(),
        symptoms: Some("Dizziness in the morning".to_string()),
        is_urgent: false,
    }
}

#[tokio::test]
async fn test_patient_appointments_are_fetched_for_date() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/api/appointments/my"))
        .and(query_param("date", "2025-06-10"))
        .and(header("Authorization", "Bearer patient-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::appointments(vec![
            MockApiResponses::patient_appointment("Dr. A", "09:00", "10:00", "confirmed"),
            MockApiResponses::patient_appointment("Dr. B", "13:00", "14:00", "cancelled"),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let existing = service
        .get_my_appointments_for_date(tuesday(), "patient-token")
        .await
        .unwrap();

    assert_eq!(existing.len(), 2);
    assert_eq!(existing[0].status, AppointmentStatus::Confirmed);
    assert_eq!(existing[1].doctor_name(), "Dr. B");

    let slots = materialize_slots(&[], &existing);
    assert_eq!(slots.len(), 8);
    assert!(slots[0].is_patient_booked);
    assert!(slots[1..].iter().all(|s| s.is_selectable()));

    let summary = other_appointments_summary(&existing);
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].doctor_name, "Dr. A");
}

#[tokio::test]
async fn test_appointments_query_failure_is_an_error() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/api/appointments/my"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    assert!(service
        .get_my_appointments_for_date(tuesday(), "patient-token")
        .await
        .is_err());
}

#[tokio::test]
async fn test_create_appointment_posts_camel_case_draft() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(body_partial_json(json!({
            "patientId": "pat-1",
            "doctorId": "doc-a",
            "appointmentDate": "2025-06-10",
            "startTime": "09:00",
            "endTime": "10:00",
            "type": "consultation",
            "symptoms": "Dizziness in the morning",
            "isUrgent": false
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(MockApiResponses::created_appointment(
            "pat-1",
            "doc-a",
            "2025-06-10",
            "09:00",
            "10:00",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let appointment = service.create_appointment(&request(), "patient-token").await.unwrap();

    assert_eq!(appointment.patient_id.as_deref(), Some("pat-1"));
    assert_eq!(appointment.start_time, t(9));
    assert_eq!(appointment.status, AppointmentStatus::Pending);
}

#[tokio::test]
async fn test_backend_message_is_surfaced_on_rejection() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(
            ResponseTemplate::new(409).set_body_json(MockApiResponses::error_response("Slot is no longer available")),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let result = service.create_appointment(&request(), "patient-token").await;

    assert_matches!(result, Err(AppointmentError::BookingFailed(ref msg)) if msg == "Slot is no longer available");
}

#[tokio::test]
async fn test_generic_message_when_backend_is_silent() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let service = AppointmentBookingService::new(&config);
    let result = service.create_appointment(&request(), "patient-token").await;

    assert_matches!(result, Err(AppointmentError::BookingFailed(ref msg)) if msg == GENERIC_BOOKING_FAILURE);
}
