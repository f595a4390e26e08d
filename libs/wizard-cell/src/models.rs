use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use appointment_cell::models::AppointmentError;
use appointment_cell::services::{DayCell, DetailCollectorView, SlotBoardView, SlotSelectionError};
use doctor_cell::models::Doctor;
use doctor_cell::services::DoctorSelectorView;
use shared_config::AppConfig;
use shared_models::error::AppError;
use shared_utils::time_format::hhmm_option;

pub const TOTAL_STEPS: u8 = 4;
pub const BOOKING_SUCCESS_NOTICE: &str = "Appointment booked successfully!";

// ==============================================================================
// STEPS AND SELECTION
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(into = "u8")]
pub enum WizardStep {
    ChooseDoctor = 1,
    ChooseSchedule = 2,
    EnterDetails = 3,
    Confirmation = 4,
}

impl WizardStep {
    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn next(self) -> Option<Self> {
        match self {
            WizardStep::ChooseDoctor => Some(WizardStep::ChooseSchedule),
            WizardStep::ChooseSchedule => Some(WizardStep::EnterDetails),
            WizardStep::EnterDetails => Some(WizardStep::Confirmation),
            WizardStep::Confirmation => None,
        }
    }

    pub fn previous(self) -> Option<Self> {
        match self {
            WizardStep::ChooseDoctor => None,
            WizardStep::ChooseSchedule => Some(WizardStep::ChooseDoctor),
            WizardStep::EnterDetails => Some(WizardStep::ChooseSchedule),
            WizardStep::Confirmation => Some(WizardStep::EnterDetails),
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            WizardStep::ChooseDoctor => "Choose a doctor",
            WizardStep::ChooseSchedule => "Pick a date and time",
            WizardStep::EnterDetails => "Appointment details",
            WizardStep::Confirmation => "Confirmation",
        }
    }
}

impl From<WizardStep> for u8 {
    fn from(step: WizardStep) -> Self {
        step.number()
    }
}

/// What the patient has chosen so far. Changing an earlier choice clears every
/// later one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSelection {
    pub doctor: Option<Doctor>,
    pub date: Option<NaiveDate>,
    #[serde(with = "hhmm_option")]
    pub time: Option<NaiveTime>,
}

impl WizardSelection {
    /// Returns false when the same doctor was already chosen; nothing is reset then.
    pub fn choose_doctor(&mut self, doctor: Doctor) -> bool {
        if self.doctor.as_ref().is_some_and(|d| d.id == doctor.id) {
            return false;
        }
        self.doctor = Some(doctor);
        self.date = None;
        self.time = None;
        true
    }

    pub fn choose_date(&mut self, date: NaiveDate) {
        self.date = Some(date);
        self.time = None;
    }

    pub fn choose_time(&mut self, time: NaiveTime) {
        self.time = Some(time);
    }

    pub fn has_doctor(&self) -> bool {
        self.doctor.is_some()
    }

    pub fn has_schedule(&self) -> bool {
        self.date.is_some() && self.time.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardPhase {
    Active,
    Completed,
    Cancelled,
}

/// Where the caller should go once the wizard closes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Navigation {
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationPaths {
    pub login: String,
    pub dashboard: String,
    pub appointments: String,
}

impl NavigationPaths {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            login: config.login_path.clone(),
            dashboard: config.dashboard_path.clone(),
            appointments: config.appointments_path.clone(),
        }
    }
}

// ==============================================================================
// SNAPSHOT
// ==============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeekSnapshot {
    pub week_start: NaiveDate,
    pub days: Vec<DayCell>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WizardSnapshot {
    pub id: Uuid,
    pub step: WizardStep,
    pub step_title: &'static str,
    pub total_steps: u8,
    pub phase: WizardPhase,
    pub can_proceed: bool,
    pub selection: WizardSelection,
    pub doctor_selector: DoctorSelectorView,
    pub week: WeekSnapshot,
    pub slots: SlotBoardView,
    pub details: Option<DetailCollectorView>,
    pub navigation: Option<Navigation>,
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DoctorSearchParams {
    pub search: Option<String>,
    pub specialization: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectDoctorRequest {
    pub doctor_id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectDateRequest {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectTimeRequest {
    pub time: String,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum WizardError {
    #[error("Please sign in to book an appointment")]
    NotAuthenticated { login_path: String },

    #[error("Only patients can book appointments")]
    NotPatient { login_path: String },

    #[error("Booking wizard not found")]
    NotFound,

    #[error("This booking wizard is no longer active ({0:?})")]
    Closed(WizardPhase),

    #[error("{0}")]
    StepGuard(String),

    #[error("Doctor {0} is not in the current search results")]
    DoctorNotFound(String),

    #[error("{date} cannot be booked: {reason}")]
    DateNotSelectable { date: NaiveDate, reason: &'static str },

    #[error("Invalid time: {0}")]
    InvalidTime(String),

    #[error(transparent)]
    Slot(#[from] SlotSelectionError),

    #[error(transparent)]
    Appointment(#[from] AppointmentError),
}

impl From<WizardError> for AppError {
    fn from(err: WizardError) -> Self {
        match err {
            WizardError::NotAuthenticated { ref login_path } => AppError::LoginRequired {
                message: err.to_string(),
                login_path: login_path.clone(),
            },
            WizardError::NotPatient { ref login_path } => AppError::Forbidden {
                message: err.to_string(),
                login_path: login_path.clone(),
            },
            WizardError::NotFound => AppError::NotFound(err.to_string()),
            WizardError::Closed(_) | WizardError::Slot(_) => AppError::Conflict(err.to_string()),
            WizardError::StepGuard(_)
            | WizardError::DoctorNotFound(_)
            | WizardError::DateNotSelectable { .. } => AppError::BadRequest(err.to_string()),
            WizardError::InvalidTime(msg) => AppError::ValidationError(msg),
            WizardError::Appointment(e) => e.into(),
        }
    }
}
