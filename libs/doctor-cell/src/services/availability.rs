use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use reqwest::Method;
use tracing::debug;

use shared_api_client::ApiClient;
use shared_config::AppConfig;

use crate::models::{AvailableSlot, AvailableSlotsPayload};
use crate::services::mock_schedule::MockScheduleGenerator;

pub struct AvailabilityService {
    client: Arc<ApiClient>,
    mock: Option<MockScheduleGenerator>,
}

impl AvailabilityService {
    pub fn new(config: &AppConfig) -> Self {
        Self::with_client(Arc::new(ApiClient::new(config)), config.mock_availability)
    }

    pub fn with_client(client: Arc<ApiClient>, mock_availability: bool) -> Self {
        Self {
            client,
            mock: mock_availability.then(MockScheduleGenerator::default),
        }
    }

    /// Available slots for a doctor on one date, in canonical flat form and
    /// sorted by start time. An empty list means the backend had no slot data.
    pub async fn get_available_slots(
        &self,
        doctor_id: &str,
        date: NaiveDate,
        auth_token: Option<&str>,
    ) -> Result<Vec<AvailableSlot>> {
        if let Some(generator) = &self.mock {
            debug!("Serving mock availability for doctor {} on {}", doctor_id, date);
            let today = Local::now().date_naive();
            return Ok(generator.available_slots(doctor_id, date, today));
        }

        debug!("Fetching available slots for doctor {} on {}", doctor_id, date);

        let path = format!("/api/doctors/{}/available-slots", doctor_id);
        let payload: AvailableSlotsPayload = self
            .client
            .request(
                Method::GET,
                &path,
                &[("date", date.format("%Y-%m-%d").to_string())],
                auth_token,
                None,
            )
            .await?;

        let slots = payload.normalize(date);
        debug!("Found {} slots for doctor {} on {}", slots.len(), doctor_id, date);
        Ok(slots)
    }
}
