use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::{Doctor, DoctorDirectoryResponse, DoctorSearchQuery, ALL_SPECIALIZATIONS};

/// Identifies one directory search so late answers to older searches can be dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchTicket(u64);

/// Presentation-local state of the doctor-selection stage. The chosen doctor
/// itself belongs to the wizard, not to the selector.
#[derive(Debug, Clone)]
pub struct DoctorSelector {
    search: String,
    specialization: String,
    doctors: Vec<Doctor>,
    specializations_seen: BTreeSet<String>,
    is_loading: bool,
    error: Option<String>,
    generation: u64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSelectorView {
    pub search: String,
    pub specialization: String,
    pub specialization_options: Vec<String>,
    pub doctors: Vec<Doctor>,
    pub is_loading: bool,
    pub error: Option<String>,
}

impl Default for DoctorSelector {
    fn default() -> Self {
        Self::new()
    }
}

impl DoctorSelector {
    pub fn new() -> Self {
        Self {
            search: String::new(),
            specialization: ALL_SPECIALIZATIONS.to_string(),
            doctors: Vec::new(),
            specializations_seen: BTreeSet::new(),
            is_loading: false,
            error: None,
            generation: 0,
        }
    }

    /// Records the new filter values and returns the query to issue for them.
    pub fn begin_search(&mut self, search: &str, specialization: Option<&str>) -> (SearchTicket, DoctorSearchQuery) {
        self.search = search.to_string();
        self.specialization = specialization
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(ALL_SPECIALIZATIONS)
            .to_string();
        self.is_loading = true;
        self.error = None;
        self.generation += 1;

        let query = DoctorSearchQuery::for_selector(&self.search, &self.specialization);
        (SearchTicket(self.generation), query)
    }

    /// Applies a finished search. Returns false when the answer belongs to a
    /// superseded search and was ignored.
    pub fn complete_search(
        &mut self,
        ticket: SearchTicket,
        result: anyhow::Result<DoctorDirectoryResponse>,
    ) -> bool {
        if ticket.0 != self.generation {
            warn!("Ignoring stale doctor search result (ticket {})", ticket.0);
            return false;
        }

        self.is_loading = false;
        match result {
            Ok(response) => {
                debug!("Doctor selector received {} doctors", response.doctors.len());
                self.specializations_seen
                    .extend(response.doctors.iter().map(|d| d.specialization.clone()));
                self.doctors = response.doctors;
                self.error = None;
            }
            Err(e) => {
                warn!("Doctor search failed: {}", e);
                self.doctors.clear();
                self.error = Some("Failed to load doctors. Please try again.".to_string());
            }
        }
        true
    }

    pub fn find(&self, doctor_id: &str) -> Option<&Doctor> {
        self.doctors.iter().find(|d| d.id == doctor_id)
    }

    pub fn doctors(&self) -> &[Doctor] {
        &self.doctors
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// Filter options: "all" followed by every specialization seen so far.
    pub fn specialization_options(&self) -> Vec<String> {
        std::iter::once(ALL_SPECIALIZATIONS.to_string())
            .chain(self.specializations_seen.iter().cloned())
            .collect()
    }

    pub fn view(&self) -> DoctorSelectorView {
        DoctorSelectorView {
            search: self.search.clone(),
            specialization: self.specialization.clone(),
            specialization_options: self.specialization_options(),
            doctors: self.doctors.clone(),
            is_loading: self.is_loading,
            error: self.error.clone(),
        }
    }
}
