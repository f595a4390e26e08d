use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use doctor_cell::models::Doctor;
use shared_models::auth::Session;
use shared_models::validation::FieldError;
use shared_utils::time_format::{format_hhmm, hhmm};

use crate::models::{
    Appointment, AppointmentError, AppointmentType, CreateAppointmentRequest, SIGN_IN_MESSAGE,
};
use crate::services::validation::{derive_end_time, validate_appointment_form, AppointmentForm};

pub const PRIORITY_BADGE: &str = "Priority";

/// Free-form fields the patient fills in. The schedule triple is fixed at mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsInput {
    #[serde(rename = "type")]
    pub appointment_type: Option<String>,
    pub reason: String,
    pub symptoms: Option<String>,
    pub is_urgent: bool,
}

/// Partial update; absent fields are left as they are.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailsUpdate {
    #[serde(default, rename = "type")]
    pub appointment_type: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub is_urgent: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionState {
    Editing,
    Submitting,
    Succeeded,
    Failed,
}

impl SubmissionState {
    pub fn is_editable(self) -> bool {
        matches!(self, SubmissionState::Editing | SubmissionState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentSummary {
    pub doctor_name: String,
    pub specialization: String,
    pub date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub type_label: Option<&'static str>,
    pub badge: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetailCollectorView {
    pub summary: AppointmentSummary,
    pub input: DetailsInput,
    pub state: SubmissionState,
    pub field_errors: Vec<FieldError>,
    pub notice: Option<String>,
    pub booked_appointment_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct DetailCollector {
    doctor: Doctor,
    date: NaiveDate,
    start_time: NaiveTime,
    end_time: NaiveTime,
    input: DetailsInput,
    state: SubmissionState,
    field_errors: Vec<FieldError>,
    notice: Option<String>,
    booked: Option<Appointment>,
}

impl DetailCollector {
    /// Mounts an empty form for a finalized doctor/date/time choice.
    pub fn new(doctor: Doctor, date: NaiveDate, start_time: NaiveTime) -> Result<Self, AppointmentError> {
        let end_time = derive_end_time(start_time)?;
        debug!(
            "Detail collector mounted for doctor {} on {} {}-{}",
            doctor.id,
            date,
            format_hhmm(start_time),
            format_hhmm(end_time)
        );

        Ok(Self {
            doctor,
            date,
            start_time,
            end_time,
            input: DetailsInput::default(),
            state: SubmissionState::Editing,
            field_errors: Vec::new(),
            notice: None,
            booked: None,
        })
    }

    pub fn doctor(&self) -> &Doctor {
        &self.doctor
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn start_time(&self) -> NaiveTime {
        self.start_time
    }

    pub fn end_time(&self) -> NaiveTime {
        self.end_time
    }

    pub fn input(&self) -> &DetailsInput {
        &self.input
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn field_errors(&self) -> &[FieldError] {
        &self.field_errors
    }

    pub fn booked_appointment(&self) -> Option<&Appointment> {
        self.booked.as_ref()
    }

    pub fn update(&mut self, update: DetailsUpdate) -> Result<(), AppointmentError> {
        match self.state {
            SubmissionState::Submitting => return Err(AppointmentError::SubmissionInProgress),
            SubmissionState::Succeeded => return Err(AppointmentError::AlreadyBooked),
            _ => {}
        }

        if let Some(appointment_type) = update.appointment_type {
            self.input.appointment_type = Some(appointment_type);
        }
        if let Some(reason) = update.reason {
            self.input.reason = reason;
        }
        if let Some(symptoms) = update.symptoms {
            self.input.symptoms = Some(symptoms);
        }
        if let Some(is_urgent) = update.is_urgent {
            self.input.is_urgent = is_urgent;
        }
        Ok(())
    }

    /// The full form as validated, schedule fields included.
    pub fn form(&self) -> AppointmentForm {
        AppointmentForm {
            appointment_date: self.date.format("%Y-%m-%d").to_string(),
            start_time: format_hhmm(self.start_time),
            end_time: Some(format_hhmm(self.end_time)),
            appointment_type: self.input.appointment_type.clone(),
            reason: self.input.reason.clone(),
            symptoms: self.input.symptoms.clone(),
            is_urgent: self.input.is_urgent,
        }
    }

    /// Validates and latches the form for submission. The returned request must
    /// be settled with [`finish_submission`](Self::finish_submission).
    pub fn begin_submission(
        &mut self,
        session: &Session,
        today: NaiveDate,
    ) -> Result<CreateAppointmentRequest, AppointmentError> {
        match self.state {
            SubmissionState::Submitting => {
                warn!("Rejected duplicate submission while one is in flight");
                return Err(AppointmentError::SubmissionInProgress);
            }
            SubmissionState::Succeeded => {
                warn!("Rejected submission after successful booking");
                return Err(AppointmentError::AlreadyBooked);
            }
            _ => {}
        }

        if !session.is_authenticated {
            self.notice = Some(SIGN_IN_MESSAGE.to_string());
            return Err(AppointmentError::NotAuthenticated);
        }

        let valid = match validate_appointment_form(&self.form(), today) {
            Ok(valid) => valid,
            Err(errors) => {
                debug!("Appointment form rejected: {}", errors);
                self.field_errors = errors.errors.clone();
                return Err(errors.into());
            }
        };

        self.field_errors.clear();
        self.notice = None;
        self.state = SubmissionState::Submitting;

        Ok(CreateAppointmentRequest {
            patient_id: session.user_id.clone(),
            doctor_id: self.doctor.id.clone(),
            appointment_date: valid.appointment_date,
            start_time: valid.start_time,
            end_time: valid.end_time,
            appointment_type: valid.appointment_type,
            reason: valid.reason,
            symptoms: valid.symptoms,
            is_urgent: valid.is_urgent,
        })
    }

    /// Settles the in-flight submission. A failure keeps the form for another try.
    pub fn finish_submission(
        &mut self,
        result: Result<Appointment, AppointmentError>,
    ) -> Result<&Appointment, AppointmentError> {
        if self.state != SubmissionState::Submitting {
            return Err(AppointmentError::NoSubmissionInFlight);
        }

        match result {
            Ok(appointment) => {
                info!("Appointment {} confirmed by backend", appointment.id);
                self.state = SubmissionState::Succeeded;
                self.notice = None;
                Ok(&*self.booked.insert(appointment))
            }
            Err(e) => {
                let message = match &e {
                    AppointmentError::BookingFailed(message) => message.clone(),
                    other => other.to_string(),
                };
                warn!("Appointment submission failed: {}", message);
                self.state = SubmissionState::Failed;
                self.notice = Some(message);
                Err(e)
            }
        }
    }

    pub fn summary(&self) -> AppointmentSummary {
        AppointmentSummary {
            doctor_name: self.doctor.name.clone(),
            specialization: self.doctor.specialization.clone(),
            date: self.date,
            start_time: self.start_time,
            end_time: self.end_time,
            type_label: self
                .input
                .appointment_type
                .as_deref()
                .and_then(|raw| raw.parse::<AppointmentType>().ok())
                .map(AppointmentType::label),
            badge: self.input.is_urgent.then_some(PRIORITY_BADGE),
        }
    }

    pub fn view(&self) -> DetailCollectorView {
        DetailCollectorView {
            summary: self.summary(),
            input: self.input.clone(),
            state: self.state,
            field_errors: self.field_errors.clone(),
            notice: self.notice.clone(),
            booked_appointment_id: self.booked.as_ref().map(|a| a.id.clone()),
        }
    }
}
