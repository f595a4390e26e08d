use chrono::{NaiveDate, NaiveTime};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use doctor_cell::models::DayOfWeek;
use doctor_cell::services::AvailabilityService;
use shared_utils::test_utils::{MockApiResponses, TestConfig};

fn tuesday() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

fn t(h: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, 0, 0).unwrap()
}

#[tokio::test]
async fn test_flat_response_is_normalized() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/api/doctors/doc-1/available-slots"))
        .and(query_param("date", "2025-06-10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
            MockApiResponses::flat_available_slot(
                "2025-06-10",
                "tuesday",
                MockApiResponses::time_slot("11:00", "12:00", true, 2, 2),
                0,
            ),
            MockApiResponses::flat_available_slot(
                "2025-06-10",
                "tuesday",
                MockApiResponses::time_slot("10:00", "11:00", true, 2, 0),
                2,
            ),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&config);
    let slots = service.get_available_slots("doc-1", tuesday(), Some("tok")).await.unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].time_slot.start_time, t(10));
    assert_eq!(slots[0].available_spots, 2);
    assert_eq!(slots[1].available_spots, 0);
    assert_eq!(slots[1].day_of_week, DayOfWeek::Tuesday);
}

#[tokio::test]
async fn test_nested_response_is_normalized() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/api/doctors/doc-1/available-slots"))
        .respond_with(ResponseTemplate::new(200).set_body_json(MockApiResponses::nested_available_slots(
            "2025-06-10",
            vec![
                MockApiResponses::time_slot("14:00", "15:00", true, 3, 1),
                MockApiResponses::time_slot("09:00", "10:00", false, 1, 0),
            ],
        )))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&config);
    let slots = service.get_available_slots("doc-1", tuesday(), None).await.unwrap();

    assert_eq!(slots.len(), 2);
    assert_eq!(slots[0].time_slot.start_time, t(9));
    assert!(!slots[0].time_slot.is_available);
    assert_eq!(slots[1].available_spots, 2);
    assert!(slots.iter().all(|s| s.date == tuesday()));
}

#[tokio::test]
async fn test_server_error_is_reported() {
    let mock_server = MockServer::start().await;
    let config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();

    Mock::given(method("GET"))
        .and(path("/api/doctors/doc-1/available-slots"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&config);
    assert!(service.get_available_slots("doc-1", tuesday(), None).await.is_err());
}

#[tokio::test]
async fn test_mock_mode_never_calls_backend() {
    let mock_server = MockServer::start().await;
    let mut config = TestConfig::with_api_url(&mock_server.uri()).to_app_config();
    config.mock_availability = true;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let service = AvailabilityService::new(&config);
    let today = chrono::Local::now().date_naive();
    let slots = service.get_available_slots("doc-1", today, None).await.unwrap();

    if DayOfWeek::of(today).is_weekend() {
        assert!(slots.is_empty());
    } else {
        assert_eq!(slots.len(), 8);
    }
}
