// libs/appointment-cell/src/models.rs
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use shared_models::error::AppError;
use shared_models::validation::ValidationErrors;
use shared_utils::time_format::hhmm;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    Pending,
    Confirmed,
    InProgress,
    Completed,
    Cancelled,
    NoShow,
    Rescheduled,
    #[serde(other)]
    Other,
}

impl AppointmentStatus {
    /// Whether the appointment still occupies its time.
    pub fn is_active(self) -> bool {
        matches!(
            self,
            AppointmentStatus::Pending | AppointmentStatus::Confirmed | AppointmentStatus::InProgress
        )
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Pending => write!(f, "pending"),
            AppointmentStatus::Confirmed => write!(f, "confirmed"),
            AppointmentStatus::InProgress => write!(f, "in_progress"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Cancelled => write!(f, "cancelled"),
            AppointmentStatus::NoShow => write!(f, "no_show"),
            AppointmentStatus::Rescheduled => write!(f, "rescheduled"),
            AppointmentStatus::Other => write!(f, "other"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    Consultation,
    FollowUp,
    Emergency,
    RoutineCheckup,
    SpecialistReferral,
}

impl AppointmentType {
    pub const ALL: [AppointmentType; 5] = [
        AppointmentType::Consultation,
        AppointmentType::FollowUp,
        AppointmentType::Emergency,
        AppointmentType::RoutineCheckup,
        AppointmentType::SpecialistReferral,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            AppointmentType::Consultation => "consultation",
            AppointmentType::FollowUp => "follow_up",
            AppointmentType::Emergency => "emergency",
            AppointmentType::RoutineCheckup => "routine_checkup",
            AppointmentType::SpecialistReferral => "specialist_referral",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AppointmentType::Consultation => "Consultation",
            AppointmentType::FollowUp => "Follow-up",
            AppointmentType::Emergency => "Emergency",
            AppointmentType::RoutineCheckup => "Routine Checkup",
            AppointmentType::SpecialistReferral => "Specialist Referral",
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AppointmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AppointmentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s.trim())
            .ok_or_else(|| format!("Unknown appointment type: {}", s))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppointmentDoctor {
    pub name: String,
}

/// An appointment record as the booking API returns it to the patient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: String,
    #[serde(default)]
    pub patient_id: Option<String>,
    #[serde(default)]
    pub doctor_id: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default)]
    pub status: AppointmentStatus,
    #[serde(default, rename = "type")]
    pub appointment_type: Option<AppointmentType>,
    #[serde(default)]
    pub doctor: Option<AppointmentDoctor>,
    #[serde(default)]
    pub is_urgent: bool,
}

impl Appointment {
    pub fn doctor_name(&self) -> &str {
        self.doctor
            .as_ref()
            .map(|d| d.name.as_str())
            .unwrap_or("Unknown doctor")
    }

    pub fn occupies(&self, start: NaiveTime, end: NaiveTime) -> bool {
        self.status.is_active() && self.start_time == start && self.end_time == end
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatientAppointmentsResponse {
    #[serde(default)]
    pub appointments: Vec<Appointment>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(rename = "type")]
    pub appointment_type: AppointmentType,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symptoms: Option<String>,
    pub is_urgent: bool,
}

// ==============================================================================
// ERRORS
// ==============================================================================

pub const SIGN_IN_MESSAGE: &str = "Please sign in to book an appointment";
pub const GENERIC_BOOKING_FAILURE: &str = "Failed to book appointment";

#[derive(Error, Debug)]
pub enum AppointmentError {
    #[error("Please sign in to book an appointment")]
    NotAuthenticated,

    #[error("Validation error: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid appointment time: {0}")]
    InvalidTime(String),

    #[error("An appointment submission is already in progress")]
    SubmissionInProgress,

    #[error("This appointment has already been booked")]
    AlreadyBooked,

    #[error("No appointment submission is in progress")]
    NoSubmissionInFlight,

    #[error("{0}")]
    BookingFailed(String),

    #[error("External service error: {0}")]
    ExternalService(String),
}

impl From<ValidationErrors> for AppointmentError {
    fn from(errors: ValidationErrors) -> Self {
        AppointmentError::Validation(errors)
    }
}

impl From<AppointmentError> for AppError {
    fn from(err: AppointmentError) -> Self {
        match err {
            AppointmentError::NotAuthenticated => AppError::Auth(SIGN_IN_MESSAGE.to_string()),
            AppointmentError::Validation(errors) => AppError::InvalidFields(errors.errors),
            AppointmentError::InvalidTime(msg) => AppError::ValidationError(msg),
            AppointmentError::SubmissionInProgress | AppointmentError::AlreadyBooked => {
                AppError::Conflict(err.to_string())
            }
            AppointmentError::NoSubmissionInFlight => AppError::BadRequest(err.to_string()),
            AppointmentError::BookingFailed(msg) => AppError::ExternalService(msg),
            AppointmentError::ExternalService(msg) => AppError::ExternalService(msg),
        }
    }
}
