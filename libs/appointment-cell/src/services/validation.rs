use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveTime, Timelike};
use regex::Regex;
use serde::{Deserialize, Serialize};

use shared_models::validation::ValidationErrors;
use shared_utils::time_format::{format_hhmm, parse_hhmm};

use crate::models::{AppointmentError, AppointmentType};

pub const REASON_MIN_CHARS: usize = 10;
pub const REASON_MAX_CHARS: usize = 500;
pub const SYMPTOMS_MAX_CHARS: usize = 1000;

fn time_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):[0-5]\d$").expect("time pattern compiles"))
}

/// `HH:MM`, 24-hour, zero-padded.
pub fn is_valid_time_format(value: &str) -> bool {
    time_pattern().is_match(value)
}

/// One hour after `start`, minutes unchanged. Starts in the 23rd hour have no
/// same-day end and are rejected.
pub fn derive_end_time(start: NaiveTime) -> Result<NaiveTime, AppointmentError> {
    NaiveTime::from_hms_opt(start.hour() + 1, start.minute(), 0).ok_or_else(|| {
        AppointmentError::InvalidTime(format!(
            "{} is too late to book a one-hour appointment",
            format_hhmm(start)
        ))
    })
}

pub fn derive_end_time_str(start: &str) -> Result<String, AppointmentError> {
    if !is_valid_time_format(start) {
        return Err(AppointmentError::InvalidTime(format!("'{}' is not a valid HH:MM time", start)));
    }
    let start = parse_hhmm(start)
        .ok_or_else(|| AppointmentError::InvalidTime(format!("'{}' is not a valid HH:MM time", start)))?;
    derive_end_time(start).map(format_hhmm)
}

/// Cross-field rule shared by every payload carrying a time range: when both
/// ends are present and well-formed, the end must be strictly after the start.
pub fn validate_time_range(start_time: Option<&str>, end_time: Option<&str>) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_time_range(start_time, end_time, &mut errors);
    errors.into_result(())
}

fn check_time_range(start_time: Option<&str>, end_time: Option<&str>, errors: &mut ValidationErrors) {
    for (field, value) in [("startTime", start_time), ("endTime", end_time)] {
        if let Some(value) = value {
            if !is_valid_time_format(value) {
                errors.add(field, "Time must be in HH:MM format");
            }
        }
    }

    if let (Some(start), Some(end)) = (
        start_time.filter(|s| is_valid_time_format(s)).and_then(parse_hhmm),
        end_time.filter(|s| is_valid_time_format(s)).and_then(parse_hhmm),
    ) {
        if end <= start {
            errors.add("endTime", "End time must be after start time");
        }
    }
}

/// Raw appointment fields as entered, before any parsing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentForm {
    pub appointment_date: String,
    pub start_time: String,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default, rename = "type")]
    pub appointment_type: Option<String>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub symptoms: Option<String>,
    #[serde(default)]
    pub is_urgent: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidAppointment {
    pub appointment_date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub appointment_type: AppointmentType,
    pub reason: String,
    pub symptoms: Option<String>,
    pub is_urgent: bool,
}

/// Checks every field and returns all problems at once. A missing end time is
/// derived from the start time.
pub fn validate_appointment_form(form: &AppointmentForm, today: NaiveDate) -> Result<ValidAppointment, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let appointment_date = match NaiveDate::parse_from_str(form.appointment_date.trim(), "%Y-%m-%d") {
        Ok(date) if date < today => {
            errors.add("appointmentDate", "Appointment date cannot be in the past");
            None
        }
        Ok(date) => Some(date),
        Err(_) => {
            errors.add("appointmentDate", "Please select a valid date");
            None
        }
    };

    let end_time_input = form
        .end_time
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    check_time_range(Some(form.start_time.trim()), end_time_input, &mut errors);

    let start_time = Some(form.start_time.trim())
        .filter(|s| is_valid_time_format(s))
        .and_then(parse_hhmm);
    let end_time = match (start_time, end_time_input) {
        (_, Some(end)) => Some(end).filter(|s| is_valid_time_format(s)).and_then(parse_hhmm),
        (Some(start), None) => match derive_end_time(start) {
            Ok(end) => Some(end),
            Err(e) => {
                errors.add("startTime", e.to_string());
                None
            }
        },
        (None, None) => None,
    };

    let appointment_type = match form.appointment_type.as_deref().map(str::trim) {
        None | Some("") => {
            errors.add("type", "Please select an appointment type");
            None
        }
        Some(raw) => match raw.parse::<AppointmentType>() {
            Ok(t) => Some(t),
            Err(_) => {
                errors.add("type", "Please select a valid appointment type");
                None
            }
        },
    };

    let reason_chars = form.reason.chars().count();
    if reason_chars < REASON_MIN_CHARS {
        errors.add(
            "reason",
            format!("Reason must be at least {} characters", REASON_MIN_CHARS),
        );
    } else if reason_chars > REASON_MAX_CHARS {
        errors.add(
            "reason",
            format!("Reason must be at most {} characters", REASON_MAX_CHARS),
        );
    }

    let symptoms = form
        .symptoms
        .as_ref()
        .filter(|s| !s.trim().is_empty())
        .cloned();
    if let Some(symptoms) = &symptoms {
        if symptoms.chars().count() > SYMPTOMS_MAX_CHARS {
            errors.add(
                "symptoms",
                format!("Symptoms must be at most {} characters", SYMPTOMS_MAX_CHARS),
            );
        }
    }

    match (appointment_date, start_time, end_time, appointment_type) {
        (Some(appointment_date), Some(start_time), Some(end_time), Some(appointment_type)) if errors.is_empty() => {
            Ok(ValidAppointment {
                appointment_date,
                start_time,
                end_time,
                appointment_type,
                reason: form.reason.clone(),
                symptoms,
                is_urgent: form.is_urgent,
            })
        }
        _ => Err(errors),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 9).unwrap()
    }

    fn form() -> AppointmentForm {
        AppointmentForm {
            appointment_date: "2025-06-10".to_string(),
            start_time: "09:00".to_string(),
            end_time: None,
            appointment_type: Some("consultation".to_string()),
            reason: "Persistent headaches".to_string(),
            symptoms: None,
            is_urgent: false,
        }
    }

    #[test]
    fn end_time_adds_one_hour_keeping_minutes() {
        assert_eq!(derive_end_time_str("09:00").unwrap(), "10:00");
        assert_eq!(derive_end_time_str("16:45").unwrap(), "17:45");
        assert_eq!(derive_end_time_str("00:05").unwrap(), "01:05");
        assert_eq!(derive_end_time_str("22:59").unwrap(), "23:59");
    }

    #[test]
    fn end_time_rejects_last_hour_and_garbage() {
        assert!(derive_end_time_str("23:00").is_err());
        assert!(derive_end_time_str("9:00").is_err());
        assert!(derive_end_time_str("noon").is_err());
    }

    #[test]
    fn time_format_is_strict() {
        assert!(is_valid_time_format("00:00"));
        assert!(is_valid_time_format("23:59"));
        assert!(!is_valid_time_format("24:00"));
        assert!(!is_valid_time_format("12:60"));
        assert!(!is_valid_time_format("7:30"));
        assert!(!is_valid_time_format("07:30:00"));
    }

    #[test]
    fn time_range_must_move_forward() {
        let err = validate_time_range(Some("10:00"), Some("09:00")).unwrap_err();
        assert!(err.has_field("endTime"));
        assert!(validate_time_range(Some("10:00"), Some("10:00")).is_err());
        assert!(validate_time_range(Some("09:00"), Some("10:00")).is_ok());
        assert!(validate_time_range(Some("09:00"), None).is_ok());
        assert!(validate_time_range(None, None).is_ok());
    }

    #[test]
    fn reason_length_bounds() {
        for (len, ok) in [(9, false), (10, true), (500, true), (501, false)] {
            let mut f = form();
            f.reason = "a".repeat(len);
            let result = validate_appointment_form(&f, today());
            assert_eq!(result.is_ok(), ok, "reason of length {}", len);
            if !ok {
                assert!(result.unwrap_err().has_field("reason"));
            }
        }
    }

    #[test]
    fn reason_counts_characters_not_bytes() {
        let mut f = form();
        f.reason = "é".repeat(10);
        assert!(validate_appointment_form(&f, today()).is_ok());
    }

    #[test]
    fn symptoms_are_optional_and_bounded() {
        let mut f = form();
        f.symptoms = Some("   ".to_string());
        assert_eq!(validate_appointment_form(&f, today()).unwrap().symptoms, None);

        f.symptoms = Some("s".repeat(1000));
        assert!(validate_appointment_form(&f, today()).is_ok());

        f.symptoms = Some("s".repeat(1001));
        assert!(validate_appointment_form(&f, today()).unwrap_err().has_field("symptoms"));
    }

    #[test]
    fn type_is_required_and_enumerated() {
        let mut f = form();
        f.appointment_type = None;
        assert!(validate_appointment_form(&f, today()).unwrap_err().has_field("type"));

        f.appointment_type = Some("surgery".to_string());
        assert!(validate_appointment_form(&f, today()).unwrap_err().has_field("type"));

        f.appointment_type = Some("specialist_referral".to_string());
        assert_eq!(
            validate_appointment_form(&f, today()).unwrap().appointment_type,
            AppointmentType::SpecialistReferral
        );
    }

    #[test]
    fn past_dates_are_rejected() {
        let mut f = form();
        f.appointment_date = "2025-06-08".to_string();
        assert!(validate_appointment_form(&f, today()).unwrap_err().has_field("appointmentDate"));

        f.appointment_date = "2025-06-09".to_string();
        assert!(validate_appointment_form(&f, today()).is_ok());

        f.appointment_date = "June 9".to_string();
        assert!(validate_appointment_form(&f, today()).unwrap_err().has_field("appointmentDate"));
    }

    #[test]
    fn explicit_range_is_cross_checked() {
        let mut f = form();
        f.start_time = "10:00".to_string();
        f.end_time = Some("09:00".to_string());
        assert!(validate_appointment_form(&f, today()).unwrap_err().has_field("endTime"));

        f.start_time = "09:00".to_string();
        f.end_time = Some("10:00".to_string());
        let valid = validate_appointment_form(&f, today()).unwrap();
        assert_eq!(valid.end_time, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    }

    #[test]
    fn missing_end_time_is_derived() {
        let mut f = form();
        f.start_time = "16:45".to_string();
        let valid = validate_appointment_form(&f, today()).unwrap();
        assert_eq!(valid.end_time, NaiveTime::from_hms_opt(17, 45, 0).unwrap());
    }

    #[test]
    fn all_problems_are_reported_together() {
        let f = AppointmentForm {
            appointment_date: "2025-06-01".to_string(),
            start_time: "25:00".to_string(),
            end_time: None,
            appointment_type: None,
            reason: "short".to_string(),
            symptoms: None,
            is_urgent: false,
        };
        let errors = validate_appointment_form(&f, today()).unwrap_err();
        for field in ["appointmentDate", "startTime", "type", "reason"] {
            assert!(errors.has_field(field), "missing error for {}", field);
        }
    }
}
