use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};
use serde::{Deserialize, Serialize};
use tracing::warn;

use shared_utils::time_format::hhmm;

/// Filter value meaning "no specialization filter".
pub const ALL_SPECIALIZATIONS: &str = "all";
pub const DIRECTORY_PAGE_SIZE: u32 = 50;

// ==============================================================================
// DOCTOR DIRECTORY
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: String,
    pub name: String,
    pub specialization: String,
    #[serde(default)]
    pub consultation_fee: f64,
    #[serde(default, alias = "experienceYears", alias = "yearsOfExperience")]
    pub experience: u32,
    #[serde(default = "default_true")]
    pub is_available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DoctorSearchQuery {
    pub search: Option<String>,
    pub specialization: Option<String>,
    pub is_available: bool,
    pub page: u32,
    pub limit: u32,
}

impl DoctorSearchQuery {
    /// The query the selector issues for the given search box and filter values.
    pub fn for_selector(search: &str, specialization: &str) -> Self {
        let search = search.trim();
        let specialization = specialization.trim();

        Self {
            search: (!search.is_empty()).then(|| search.to_string()),
            specialization: (!specialization.is_empty()
                && !specialization.eq_ignore_ascii_case(ALL_SPECIALIZATIONS))
            .then(|| specialization.to_string()),
            is_available: true,
            page: 1,
            limit: DIRECTORY_PAGE_SIZE,
        }
    }

    pub fn to_query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if let Some(specialization) = &self.specialization {
            pairs.push(("specialization", specialization.clone()));
        }
        pairs.push(("isAvailable", self.is_available.to_string()));
        pairs.push(("page", self.page.to_string()));
        pairs.push(("limit", self.limit.to_string()));
        pairs
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    #[serde(default)]
    pub page: u32,
    #[serde(default)]
    pub limit: u32,
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoctorDirectoryResponse {
    pub doctors: Vec<Doctor>,
    #[serde(default)]
    pub pagination: Pagination,
}

// ==============================================================================
// SCHEDULES AND SLOTS
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayOfWeek {
    #[serde(alias = "Monday", alias = "MONDAY", alias = "mon", alias = "Mon")]
    Monday,
    #[serde(alias = "Tuesday", alias = "TUESDAY", alias = "tue", alias = "Tue")]
    Tuesday,
    #[serde(alias = "Wednesday", alias = "WEDNESDAY", alias = "wed", alias = "Wed")]
    Wednesday,
    #[serde(alias = "Thursday", alias = "THURSDAY", alias = "thu", alias = "Thu")]
    Thursday,
    #[serde(alias = "Friday", alias = "FRIDAY", alias = "fri", alias = "Fri")]
    Friday,
    #[serde(alias = "Saturday", alias = "SATURDAY", alias = "sat", alias = "Sat")]
    Saturday,
    #[serde(alias = "Sunday", alias = "SUNDAY", alias = "sun", alias = "Sun")]
    Sunday,
}

impl DayOfWeek {
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn is_weekend(self) -> bool {
        matches!(self, DayOfWeek::Saturday | DayOfWeek::Sunday)
    }

    pub fn short_label(self) -> &'static str {
        match self {
            DayOfWeek::Monday => "Mon",
            DayOfWeek::Tuesday => "Tue",
            DayOfWeek::Wednesday => "Wed",
            DayOfWeek::Thursday => "Thu",
            DayOfWeek::Friday => "Fri",
            DayOfWeek::Saturday => "Sat",
            DayOfWeek::Sunday => "Sun",
        }
    }
}

impl From<Weekday> for DayOfWeek {
    fn from(weekday: Weekday) -> Self {
        match weekday {
            Weekday::Mon => DayOfWeek::Monday,
            Weekday::Tue => DayOfWeek::Tuesday,
            Weekday::Wed => DayOfWeek::Wednesday,
            Weekday::Thu => DayOfWeek::Thursday,
            Weekday::Fri => DayOfWeek::Friday,
            Weekday::Sat => DayOfWeek::Saturday,
            Weekday::Sun => DayOfWeek::Sunday,
        }
    }
}

impl fmt::Display for DayOfWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DayOfWeek::Monday => "monday",
            DayOfWeek::Tuesday => "tuesday",
            DayOfWeek::Wednesday => "wednesday",
            DayOfWeek::Thursday => "thursday",
            DayOfWeek::Friday => "friday",
            DayOfWeek::Saturday => "saturday",
            DayOfWeek::Sunday => "sunday",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeSlot {
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    #[serde(default = "default_true")]
    pub is_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_appointments: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_appointments: Option<u32>,
}

impl TimeSlot {
    pub fn new(start_time: NaiveTime, end_time: NaiveTime, is_available: bool) -> Self {
        Self {
            start_time,
            end_time,
            is_available,
            max_appointments: None,
            current_appointments: None,
        }
    }

    pub fn with_capacity(mut self, max: u32, current: u32) -> Self {
        self.max_appointments = Some(max);
        self.current_appointments = Some(current);
        self
    }

    pub fn has_valid_range(&self) -> bool {
        self.start_time < self.end_time
    }

    /// Open means flagged available with room left for another booking.
    pub fn is_open(&self) -> bool {
        self.is_available && self.remaining_capacity() > 0
    }

    /// Bookings still possible; without counters an available slot counts as one spot.
    pub fn remaining_capacity(&self) -> u32 {
        match self.max_appointments {
            Some(max) => max.saturating_sub(self.current_appointments.unwrap_or(0)),
            None if self.is_available => 1,
            None => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DaySchedule {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub slots: Vec<TimeSlot>,
}

impl DaySchedule {
    pub fn is_closed(&self) -> bool {
        self.day_of_week.is_weekend() || self.slots.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlot {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub time_slot: TimeSlot,
    pub available_spots: u32,
}

impl AvailableSlot {
    pub fn from_time_slot(date: NaiveDate, time_slot: TimeSlot) -> Self {
        let available_spots = time_slot.remaining_capacity();
        Self {
            date,
            day_of_week: DayOfWeek::of(date),
            time_slot,
            available_spots,
        }
    }
}

// ==============================================================================
// AVAILABLE-SLOTS WIRE SHAPES
// ==============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAvailableSlot {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub time_slot: TimeSlot,
    #[serde(default)]
    pub available_spots: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedDaySlots {
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub available_slots: Vec<TimeSlot>,
}

/// The available-slots endpoint answers either with a flat list or with one
/// nested day object. Both collapse into `Vec<AvailableSlot>` via [`normalize`].
///
/// [`normalize`]: AvailableSlotsPayload::normalize
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum AvailableSlotsPayload {
    Flat(Vec<RawAvailableSlot>),
    Nested(NestedDaySlots),
}

impl AvailableSlotsPayload {
    pub fn normalize(self, requested_date: NaiveDate) -> Vec<AvailableSlot> {
        let mut slots: Vec<AvailableSlot> = match self {
            AvailableSlotsPayload::Flat(raw) => raw
                .into_iter()
                .filter(|slot| match slot.date {
                    Some(date) if date != requested_date => {
                        warn!("Dropping slot for {} from response for {}", date, requested_date);
                        false
                    }
                    _ => true,
                })
                .map(|slot| {
                    let spots = slot
                        .available_spots
                        .unwrap_or_else(|| slot.time_slot.remaining_capacity());
                    AvailableSlot {
                        available_spots: spots,
                        ..AvailableSlot::from_time_slot(requested_date, slot.time_slot)
                    }
                })
                .collect(),
            AvailableSlotsPayload::Nested(day) => {
                if let Some(date) = day.date.filter(|d| *d != requested_date) {
                    warn!("Nested slots dated {} returned for {}", date, requested_date);
                }
                day.available_slots
                    .into_iter()
                    .map(|slot| AvailableSlot::from_time_slot(requested_date, slot))
                    .collect()
            }
        };

        slots.retain(|slot| {
            let valid = slot.time_slot.has_valid_range();
            if !valid {
                warn!(
                    "Dropping slot with start {} not before end {}",
                    slot.time_slot.start_time, slot.time_slot.end_time
                );
            }
            valid
        });
        slots.sort_by_key(|slot| slot.time_slot.start_time);
        slots
    }
}

fn default_true() -> bool {
    true
}
