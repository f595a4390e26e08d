//! Availability resolution for the date/time stage: which calendar days can be
//! picked, and which time slots on the picked day can be booked by this patient.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use doctor_cell::models::{AvailableSlot, DayOfWeek};
use shared_utils::time_format::hhmm;

use crate::models::{Appointment, AppointmentStatus};

pub const DEFAULT_FIRST_HOUR: u32 = 9;
pub const DEFAULT_END_HOUR: u32 = 17;
pub const DEFAULT_SLOT_CAPACITY: u32 = 2;

pub const CLOSED_MARKER: &str = "Closed";
pub const ALREADY_BOOKED_MARKER: &str = "Already Booked";
pub const UNAVAILABLE_MARKER: &str = "Unavailable";
pub const SLOT_LOAD_FAILURE: &str = "Failed to load available time slots";

// ==============================================================================
// CALENDAR
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateEligibility {
    Selectable,
    Past,
    Weekend,
}

impl DateEligibility {
    pub fn is_selectable(self) -> bool {
        self == DateEligibility::Selectable
    }
}

/// Only today or later, Monday to Friday.
pub fn date_eligibility(date: NaiveDate, today: NaiveDate) -> DateEligibility {
    if date < today {
        DateEligibility::Past
    } else if DayOfWeek::of(date).is_weekend() {
        DateEligibility::Weekend
    } else {
        DateEligibility::Selectable
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub date: NaiveDate,
    pub day_of_week: DayOfWeek,
    pub label: &'static str,
    pub day_of_month: u32,
    pub is_today: bool,
    pub is_past: bool,
    pub is_weekend: bool,
    pub is_selectable: bool,
    pub marker: Option<&'static str>,
}

/// A Monday-first week around an anchor date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeekView {
    anchor: NaiveDate,
}

impl WeekView {
    pub fn new(anchor: NaiveDate) -> Self {
        Self { anchor }
    }

    pub fn anchor(&self) -> NaiveDate {
        self.anchor
    }

    pub fn week_start(&self) -> NaiveDate {
        self.anchor - Duration::days(self.anchor.weekday().num_days_from_monday() as i64)
    }

    pub fn previous_week(&mut self) {
        self.anchor -= Duration::days(7);
    }

    pub fn next_week(&mut self) {
        self.anchor += Duration::days(7);
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        let start = self.week_start();
        (0..7).map(|offset| start + Duration::days(offset)).collect()
    }

    pub fn days(&self, today: NaiveDate) -> Vec<DayCell> {
        self.dates()
            .into_iter()
            .map(|date| {
                let day_of_week = DayOfWeek::of(date);
                let eligibility = date_eligibility(date, today);
                DayCell {
                    date,
                    day_of_week,
                    label: day_of_week.short_label(),
                    day_of_month: date.day(),
                    is_today: date == today,
                    is_past: date < today,
                    is_weekend: day_of_week.is_weekend(),
                    is_selectable: eligibility.is_selectable(),
                    marker: day_of_week.is_weekend().then_some(CLOSED_MARKER),
                }
            })
            .collect()
    }
}

// ==============================================================================
// SLOT MATERIALIZATION
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSlot {
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
    pub is_available: bool,
    pub is_patient_booked: bool,
    pub available_spots: u32,
    pub max_appointments: Option<u32>,
    pub marker: Option<&'static str>,
}

impl ResolvedSlot {
    fn new(
        start_time: NaiveTime,
        end_time: NaiveTime,
        is_available: bool,
        is_patient_booked: bool,
        available_spots: u32,
        max_appointments: Option<u32>,
    ) -> Self {
        let marker = if is_patient_booked {
            Some(ALREADY_BOOKED_MARKER)
        } else if !is_available {
            Some(UNAVAILABLE_MARKER)
        } else {
            None
        };

        Self {
            start_time,
            end_time,
            is_available,
            is_patient_booked,
            available_spots,
            max_appointments,
            marker,
        }
    }

    pub fn is_selectable(&self) -> bool {
        self.is_available && !self.is_patient_booked
    }
}

fn patient_booked(existing: &[Appointment], start: NaiveTime, end: NaiveTime) -> bool {
    existing.iter().any(|appointment| appointment.occupies(start, end))
}

/// Merges the doctor's slots with the patient's own appointments. When the
/// backend has no slot data at all, the default weekday schedule is used.
pub fn materialize_slots(backend_slots: &[AvailableSlot], existing: &[Appointment]) -> Vec<ResolvedSlot> {
    if backend_slots.is_empty() {
        debug!("No backend slots, synthesizing default schedule");
        return default_schedule(existing);
    }

    backend_slots
        .iter()
        .map(|slot| {
            let time_slot = &slot.time_slot;
            let booked = patient_booked(existing, time_slot.start_time, time_slot.end_time);
            ResolvedSlot::new(
                time_slot.start_time,
                time_slot.end_time,
                time_slot.is_available && !booked && slot.available_spots > 0,
                booked,
                slot.available_spots,
                time_slot.max_appointments,
            )
        })
        .collect()
}

/// Hourly slots starting 09:00 through 16:00, two places each.
pub fn default_schedule(existing: &[Appointment]) -> Vec<ResolvedSlot> {
    (DEFAULT_FIRST_HOUR..DEFAULT_END_HOUR)
        .filter_map(|hour| {
            let start = NaiveTime::from_hms_opt(hour, 0, 0)?;
            let end = NaiveTime::from_hms_opt(hour + 1, 0, 0)?;
            let booked = patient_booked(existing, start, end);
            Some(ResolvedSlot::new(
                start,
                end,
                !booked,
                booked,
                DEFAULT_SLOT_CAPACITY - u32::from(booked),
                Some(DEFAULT_SLOT_CAPACITY),
            ))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedAppointmentSummary {
    pub doctor_name: String,
    pub status: AppointmentStatus,
    #[serde(with = "hhmm")]
    pub start_time: NaiveTime,
    #[serde(with = "hhmm")]
    pub end_time: NaiveTime,
}

/// The patient's other confirmed appointments on the day. Informational only;
/// pending ones still block their slot but are not listed.
pub fn other_appointments_summary(existing: &[Appointment]) -> Vec<BookedAppointmentSummary> {
    let mut summary: Vec<BookedAppointmentSummary> = existing
        .iter()
        .filter(|a| a.status == AppointmentStatus::Confirmed)
        .map(|a| BookedAppointmentSummary {
            doctor_name: a.doctor_name().to_string(),
            status: a.status,
            start_time: a.start_time,
            end_time: a.end_time,
        })
        .collect();
    summary.sort_by_key(|s| s.start_time);
    summary
}

// ==============================================================================
// SLOT BOARD
// ==============================================================================

/// Identifies one slot load. Only the most recently issued ticket may be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotLoadTicket {
    pub date: NaiveDate,
    generation: u64,
}

/// Both halves of a slot load; built only after both fetches settle.
#[derive(Debug, Clone, Default)]
pub struct SlotLoad {
    pub slots: Vec<AvailableSlot>,
    pub existing: Vec<Appointment>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SlotBoardState {
    Idle,
    Loading {
        date: NaiveDate,
    },
    Ready {
        date: NaiveDate,
        slots: Vec<ResolvedSlot>,
        other_appointments: Vec<BookedAppointmentSummary>,
    },
    Failed {
        date: NaiveDate,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotSelectionError {
    #[error("Time slots for this date have not finished loading")]
    NotLoaded,
    #[error("No slot starts at {0} on this date")]
    UnknownSlot(String),
    #[error("You already have an appointment at this time")]
    AlreadyBooked,
    #[error("This time slot is not available")]
    Unavailable,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotBoardView {
    pub status: &'static str,
    pub date: Option<NaiveDate>,
    pub slots: Vec<ResolvedSlot>,
    pub other_appointments: Vec<BookedAppointmentSummary>,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SlotBoard {
    generation: u64,
    state: SlotBoardState,
}

impl Default for SlotBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SlotBoard {
    pub fn new() -> Self {
        Self {
            generation: 0,
            state: SlotBoardState::Idle,
        }
    }

    pub fn state(&self) -> &SlotBoardState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.state, SlotBoardState::Loading { .. })
    }

    /// Starts loading `date`, superseding any load still in flight.
    pub fn begin(&mut self, date: NaiveDate) -> SlotLoadTicket {
        self.generation += 1;
        self.state = SlotBoardState::Loading { date };
        SlotLoadTicket {
            date,
            generation: self.generation,
        }
    }

    /// Applies a finished load. Returns false when the ticket was superseded and
    /// the result was discarded.
    pub fn complete(&mut self, ticket: SlotLoadTicket, result: anyhow::Result<SlotLoad>) -> bool {
        if ticket.generation != self.generation {
            warn!(
                "Discarding stale slot response for {} (generation {} != {})",
                ticket.date, ticket.generation, self.generation
            );
            return false;
        }

        self.state = match result {
            Ok(load) => {
                let slots = materialize_slots(&load.slots, &load.existing);
                debug!(
                    "Resolved {} slots for {} ({} selectable)",
                    slots.len(),
                    ticket.date,
                    slots.iter().filter(|s| s.is_selectable()).count()
                );
                SlotBoardState::Ready {
                    date: ticket.date,
                    slots,
                    other_appointments: other_appointments_summary(&load.existing),
                }
            }
            Err(e) => {
                warn!("Slot load for {} failed: {}", ticket.date, e);
                SlotBoardState::Failed {
                    date: ticket.date,
                    message: SLOT_LOAD_FAILURE.to_string(),
                }
            }
        };
        true
    }

    /// Clears the board; any load in flight becomes stale.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.state = SlotBoardState::Idle;
    }

    pub fn selectable_slot(&self, date: NaiveDate, time: NaiveTime) -> Result<&ResolvedSlot, SlotSelectionError> {
        let slots = match &self.state {
            SlotBoardState::Ready { date: loaded, slots, .. } if *loaded == date => slots,
            _ => return Err(SlotSelectionError::NotLoaded),
        };

        let slot = slots
            .iter()
            .find(|s| s.start_time == time)
            .ok_or_else(|| SlotSelectionError::UnknownSlot(time.format("%H:%M").to_string()))?;

        if slot.is_patient_booked {
            Err(SlotSelectionError::AlreadyBooked)
        } else if !slot.is_available {
            Err(SlotSelectionError::Unavailable)
        } else {
            Ok(slot)
        }
    }

    pub fn view(&self) -> SlotBoardView {
        match &self.state {
            SlotBoardState::Idle => SlotBoardView {
                status: "idle",
                date: None,
                slots: Vec::new(),
                other_appointments: Vec::new(),
                error: None,
            },
            SlotBoardState::Loading { date } => SlotBoardView {
                status: "loading",
                date: Some(*date),
                slots: Vec::new(),
                other_appointments: Vec::new(),
                error: None,
            },
            SlotBoardState::Ready { date, slots, other_appointments } => SlotBoardView {
                status: "ready",
                date: Some(*date),
                slots: slots.clone(),
                other_appointments: other_appointments.clone(),
                error: None,
            },
            SlotBoardState::Failed { date, message } => SlotBoardView {
                status: "failed",
                date: Some(*date),
                slots: Vec::new(),
                other_appointments: Vec::new(),
                error: Some(message.clone()),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AppointmentDoctor;
    use anyhow::anyhow;
    use doctor_cell::models::TimeSlot;

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn appointment(start: NaiveTime, end: NaiveTime, status: AppointmentStatus) -> Appointment {
        Appointment {
            id: "apt-1".to_string(),
            patient_id: None,
            doctor_id: Some("doc-a".to_string()),
            appointment_date: None,
            start_time: start,
            end_time: end,
            status,
            appointment_type: None,
            doctor: Some(AppointmentDoctor {
                name: "Dr. A".to_string(),
            }),
            is_urgent: false,
        }
    }

    fn backend_slot(start: u32, is_available: bool, spots: u32) -> AvailableSlot {
        AvailableSlot {
            available_spots: spots,
            ..AvailableSlot::from_time_slot(
                d(2025, 6, 10),
                TimeSlot::new(t(start, 0), t(start + 1, 0), is_available),
            )
        }
    }

    #[test]
    fn weekends_and_past_dates_are_not_selectable() {
        let today = d(2025, 6, 10);
        assert_eq!(date_eligibility(d(2025, 6, 10), today), DateEligibility::Selectable);
        assert_eq!(date_eligibility(d(2025, 6, 9), today), DateEligibility::Past);
        assert_eq!(date_eligibility(d(2025, 6, 14), today), DateEligibility::Weekend);
        assert_eq!(date_eligibility(d(2025, 6, 15), today), DateEligibility::Weekend);
        assert_eq!(date_eligibility(d(2025, 6, 16), today), DateEligibility::Selectable);
    }

    #[test]
    fn week_is_monday_first() {
        let week = WeekView::new(d(2025, 6, 12));
        let dates = week.dates();
        assert_eq!(dates.len(), 7);
        assert_eq!(dates[0], d(2025, 6, 9));
        assert_eq!(dates[6], d(2025, 6, 15));

        let week = WeekView::new(d(2025, 6, 15));
        assert_eq!(week.week_start(), d(2025, 6, 9));
    }

    #[test]
    fn week_navigation_moves_seven_days() {
        let mut week = WeekView::new(d(2025, 6, 12));
        week.next_week();
        assert_eq!(week.anchor(), d(2025, 6, 19));
        assert_eq!(week.week_start(), d(2025, 6, 16));
        week.previous_week();
        week.previous_week();
        assert_eq!(week.week_start(), d(2025, 6, 2));
    }

    #[test]
    fn day_cells_mark_closed_weekends() {
        let today = d(2025, 6, 11);
        let days = WeekView::new(today).days(today);

        assert!(days[0].is_past && !days[0].is_selectable);
        assert!(days[2].is_today && days[2].is_selectable);
        assert!(days[4].is_selectable);
        for weekend in &days[5..] {
            assert!(weekend.is_weekend);
            assert!(!weekend.is_selectable);
            assert_eq!(weekend.marker, Some(CLOSED_MARKER));
        }
        assert_eq!(days[0].label, "Mon");
    }

    #[test]
    fn empty_backend_yields_default_schedule() {
        let slots = materialize_slots(&[], &[]);
        assert_eq!(slots.len(), 8);
        assert_eq!(slots[0].start_time, t(9, 0));
        assert_eq!(slots[7].start_time, t(16, 0));
        for slot in &slots {
            assert_eq!(slot.end_time - slot.start_time, Duration::hours(1));
            assert_eq!(slot.max_appointments, Some(2));
            assert!(slot.is_selectable());
        }
    }

    #[test]
    fn default_schedule_marks_patient_booking() {
        let existing = vec![appointment(t(9, 0), t(10, 0), AppointmentStatus::Confirmed)];
        let slots = materialize_slots(&[], &existing);

        assert!(slots[0].is_patient_booked);
        assert!(!slots[0].is_selectable());
        assert_eq!(slots[0].marker, Some(ALREADY_BOOKED_MARKER));
        assert!(slots[1..].iter().all(|s| s.is_selectable()));
    }

    #[test]
    fn backend_slots_combine_flags_booking_and_capacity() {
        let backend = vec![
            backend_slot(9, true, 2),
            backend_slot(10, true, 0),
            backend_slot(11, false, 2),
            backend_slot(12, false, 1),
        ];
        let existing = vec![
            appointment(t(9, 0), t(10, 0), AppointmentStatus::Pending),
            appointment(t(12, 0), t(13, 0), AppointmentStatus::Confirmed),
        ];

        let slots = materialize_slots(&backend, &existing);

        assert!(slots[0].is_patient_booked && !slots[0].is_available);
        assert!(!slots[1].is_available && !slots[1].is_patient_booked);
        assert_eq!(slots[1].marker, Some(UNAVAILABLE_MARKER));
        assert!(!slots[2].is_available);
        // patient booking takes precedence over generic unavailability
        assert_eq!(slots[3].marker, Some(ALREADY_BOOKED_MARKER));
        assert!(slots.iter().all(|s| !s.is_selectable()));
    }

    #[test]
    fn only_identical_ranges_count_as_booked() {
        let backend = vec![backend_slot(9, true, 2)];
        let existing = vec![appointment(t(9, 30), t(10, 30), AppointmentStatus::Confirmed)];
        assert!(materialize_slots(&backend, &existing)[0].is_selectable());
    }

    #[test]
    fn cancelled_appointments_do_not_block() {
        let existing = vec![appointment(t(9, 0), t(10, 0), AppointmentStatus::Cancelled)];
        let slots = materialize_slots(&[], &existing);
        assert!(slots[0].is_selectable());
        assert!(other_appointments_summary(&existing).is_empty());
    }

    #[test]
    fn stale_loads_are_discarded() {
        let mut board = SlotBoard::new();
        let first = board.begin(d(2025, 6, 10));
        let second = board.begin(d(2025, 6, 11));

        assert!(board.complete(second, Ok(SlotLoad::default())));
        assert!(!board.complete(first, Ok(SlotLoad::default())));

        match board.state() {
            SlotBoardState::Ready { date, .. } => assert_eq!(*date, d(2025, 6, 11)),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn loading_until_complete_then_failed_on_error() {
        let mut board = SlotBoard::new();
        let ticket = board.begin(d(2025, 6, 10));
        assert!(board.is_loading());
        assert_eq!(
            board.selectable_slot(d(2025, 6, 10), t(9, 0)),
            Err(SlotSelectionError::NotLoaded)
        );

        board.complete(ticket, Err(anyhow!("timeout")));
        let view = board.view();
        assert_eq!(view.status, "failed");
        assert_eq!(view.error.as_deref(), Some(SLOT_LOAD_FAILURE));
    }

    #[test]
    fn reset_invalidates_in_flight_load() {
        let mut board = SlotBoard::new();
        let ticket = board.begin(d(2025, 6, 10));
        board.reset();
        assert!(!board.complete(ticket, Ok(SlotLoad::default())));
        assert_eq!(board.state(), &SlotBoardState::Idle);
    }

    #[test]
    fn selection_honours_booking_and_availability() {
        let date = d(2025, 6, 10);
        let mut board = SlotBoard::new();
        let ticket = board.begin(date);
        board.complete(
            ticket,
            Ok(SlotLoad {
                slots: vec![
                    backend_slot(9, true, 2),
                    backend_slot(10, false, 2),
                    backend_slot(11, true, 2),
                ],
                existing: vec![appointment(t(9, 0), t(10, 0), AppointmentStatus::Confirmed)],
            }),
        );

        assert_eq!(board.selectable_slot(date, t(9, 0)), Err(SlotSelectionError::AlreadyBooked));
        assert_eq!(board.selectable_slot(date, t(10, 0)), Err(SlotSelectionError::Unavailable));
        assert!(matches!(
            board.selectable_slot(date, t(12, 0)),
            Err(SlotSelectionError::UnknownSlot(_))
        ));
        assert_eq!(board.selectable_slot(date, t(11, 0)).unwrap().start_time, t(11, 0));
        assert_eq!(
            board.selectable_slot(d(2025, 6, 11), t(11, 0)),
            Err(SlotSelectionError::NotLoaded)
        );
    }

    #[test]
    fn summary_lists_confirmed_appointments_in_order() {
        let existing = vec![
            appointment(t(14, 0), t(15, 0), AppointmentStatus::Confirmed),
            appointment(t(11, 0), t(12, 0), AppointmentStatus::Pending),
            appointment(t(9, 0), t(10, 0), AppointmentStatus::Confirmed),
        ];
        let summary = other_appointments_summary(&existing);
        assert_eq!(summary.len(), 2);
        assert!(summary.iter().all(|s| s.status == AppointmentStatus::Confirmed));
        assert_eq!(summary[0].start_time, t(9, 0));
        assert_eq!(summary[0].doctor_name, "Dr. A");
    }
}
