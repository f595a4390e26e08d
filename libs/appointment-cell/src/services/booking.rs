use std::sync::Arc;

use anyhow::Result;
use chrono::NaiveDate;
use reqwest::Method;
use tracing::{debug, error, info};

use shared_api_client::{api_error_message, ApiClient};
use shared_config::AppConfig;

use crate::models::{
    Appointment, AppointmentError, CreateAppointmentRequest, PatientAppointmentsResponse,
    GENERIC_BOOKING_FAILURE,
};

pub struct AppointmentBookingService {
    client: Arc<ApiClient>,
}

impl AppointmentBookingService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            client: Arc::new(ApiClient::new(config)),
        }
    }

    pub fn with_client(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// The signed-in patient's own appointments on `date`; the backend infers
    /// the patient from the token.
    pub async fn get_my_appointments_for_date(
        &self,
        date: NaiveDate,
        auth_token: &str,
    ) -> Result<Vec<Appointment>> {
        debug!("Fetching patient appointments for {}", date);

        let response: PatientAppointmentsResponse = self
            .client
            .request(
                Method::GET,
                "/api/appointments/my",
                &[("date", date.format("%Y-%m-%d").to_string())],
                Some(auth_token),
                None,
            )
            .await?;

        debug!("Patient has {} appointments on {}", response.appointments.len(), date);
        Ok(response.appointments)
    }

    /// Sends one create-appointment request. No retry is attempted.
    pub async fn create_appointment(
        &self,
        request: &CreateAppointmentRequest,
        auth_token: &str,
    ) -> Result<Appointment, AppointmentError> {
        info!(
            "Booking appointment for patient {} with doctor {} on {} at {}",
            request.patient_id, request.doctor_id, request.appointment_date, request.start_time
        );

        let body = serde_json::to_value(request)
            .map_err(|e| AppointmentError::ExternalService(e.to_string()))?;

        let appointment: Appointment = self
            .client
            .request(Method::POST, "/api/appointments", &[], Some(auth_token), Some(body))
            .await
            .map_err(|e| {
                error!("Create appointment failed: {}", e);
                AppointmentError::BookingFailed(
                    api_error_message(&e).unwrap_or_else(|| GENERIC_BOOKING_FAILURE.to_string()),
                )
            })?;

        info!("Appointment {} booked", appointment.id);
        Ok(appointment)
    }
}
