pub mod booking;
pub mod details;
pub mod resolver;
pub mod validation;

pub use booking::AppointmentBookingService;
pub use details::{DetailCollector, DetailCollectorView, DetailsInput, DetailsUpdate, SubmissionState};
pub use resolver::{
    date_eligibility, materialize_slots, DateEligibility, DayCell, ResolvedSlot, SlotBoard, SlotBoardView, SlotLoad,
    SlotLoadTicket, SlotSelectionError, WeekView,
};
pub use validation::{derive_end_time, validate_appointment_form, validate_time_range, AppointmentForm};
