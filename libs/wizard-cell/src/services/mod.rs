pub mod controller;
pub mod store;

pub use controller::{SlotFetch, WizardController};
pub use store::{SharedWizard, WizardStore};
