use chrono::{Duration, NaiveDate, NaiveTime};
use rand::{rngs::StdRng, Rng, SeedableRng};
use sha2::{Digest, Sha256};

use crate::models::{AvailableSlot, DayOfWeek, DaySchedule, TimeSlot};

pub const MOCK_WINDOW_DAYS: i64 = 30;
const FIRST_HOUR: u32 = 9;
const LAST_HOUR: u32 = 17;
const MOCK_CAPACITY: u32 = 2;

/// Fabricates plausible per-doctor availability for demos and offline runs.
/// Output is deterministic for a given doctor id and date.
#[derive(Debug, Clone)]
pub struct MockScheduleGenerator {
    window_days: i64,
    availability_ratio: f64,
}

impl Default for MockScheduleGenerator {
    fn default() -> Self {
        Self {
            window_days: MOCK_WINDOW_DAYS,
            availability_ratio: 0.7,
        }
    }
}

impl MockScheduleGenerator {
    pub fn new(window_days: i64, availability_ratio: f64) -> Self {
        Self {
            window_days,
            availability_ratio: availability_ratio.clamp(0.0, 1.0),
        }
    }

    /// One schedule per day of the window starting at `start`; weekends are closed.
    pub fn generate(&self, doctor_id: &str, start: NaiveDate) -> Vec<DaySchedule> {
        (0..self.window_days)
            .map(|offset| {
                let date = start + Duration::days(offset);
                DaySchedule {
                    date,
                    day_of_week: DayOfWeek::of(date),
                    slots: self.slots_for_day(doctor_id, date),
                }
            })
            .collect()
    }

    /// Slots for `date`, empty when the date falls outside the window.
    pub fn available_slots(&self, doctor_id: &str, date: NaiveDate, window_start: NaiveDate) -> Vec<AvailableSlot> {
        let window_end = window_start + Duration::days(self.window_days);
        if date < window_start || date >= window_end {
            return Vec::new();
        }

        self.slots_for_day(doctor_id, date)
            .into_iter()
            .map(|slot| AvailableSlot::from_time_slot(date, slot))
            .collect()
    }

    fn slots_for_day(&self, doctor_id: &str, date: NaiveDate) -> Vec<TimeSlot> {
        if DayOfWeek::of(date).is_weekend() {
            return Vec::new();
        }

        let mut rng = StdRng::seed_from_u64(seed(doctor_id, date));

        (FIRST_HOUR..LAST_HOUR)
            .filter_map(|hour| {
                let start = NaiveTime::from_hms_opt(hour, 0, 0)?;
                let end = NaiveTime::from_hms_opt(hour + 1, 0, 0)?;
                let is_available = rng.gen_bool(self.availability_ratio);
                let current = rng.gen_range(0..=MOCK_CAPACITY);
                Some(TimeSlot::new(start, end, is_available).with_capacity(MOCK_CAPACITY, current))
            })
            .collect()
    }
}

/// First eight bytes of SHA-256 over `"{doctor_id}|{YYYY-MM-DD}"`, little endian.
/// Stable across builds and toolchains.
fn seed(doctor_id: &str, date: NaiveDate) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(doctor_id.as_bytes());
    hasher.update(b"|");
    hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
    let digest = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}
