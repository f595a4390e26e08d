pub mod availability;
pub mod directory;
pub mod mock_schedule;
pub mod selector;

pub use availability::AvailabilityService;
pub use directory::DoctorDirectoryService;
pub use mock_schedule::MockScheduleGenerator;
pub use selector::{DoctorSelector, DoctorSelectorView, SearchTicket};
