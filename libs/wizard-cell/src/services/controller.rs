use chrono::{NaiveDate, NaiveTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use appointment_cell::models::{Appointment, AppointmentError, CreateAppointmentRequest};
use appointment_cell::services::validation::is_valid_time_format;
use appointment_cell::services::{
    date_eligibility, DateEligibility, DetailCollector, DetailsUpdate, SlotBoard, SlotLoad, SlotLoadTicket,
    SubmissionState, WeekView,
};
use doctor_cell::models::{DoctorDirectoryResponse, DoctorSearchQuery};
use doctor_cell::services::{DoctorSelector, SearchTicket};
use shared_models::auth::Session;
use shared_utils::time_format::parse_hhmm;

use crate::models::{
    Navigation, NavigationPaths, WeekSnapshot, WizardError, WizardPhase, WizardSelection, WizardSnapshot,
    WizardStep, BOOKING_SUCCESS_NOTICE, TOTAL_STEPS,
};

const DOCTOR_REQUIRED: &str = "Please select a doctor to continue";
const SCHEDULE_REQUIRED: &str = "Please select a date and time to continue";

/// Everything the slot fetch for a newly chosen date needs, captured while the
/// wizard is locked so the fetch itself can run unlocked.
#[derive(Debug, Clone)]
pub struct SlotFetch {
    pub ticket: SlotLoadTicket,
    pub doctor_id: String,
    pub date: NaiveDate,
}

/// One patient's pass through the booking flow: doctor, then date and time,
/// then details, then the booked confirmation.
#[derive(Debug)]
pub struct WizardController {
    id: Uuid,
    session: Session,
    paths: NavigationPaths,
    step: WizardStep,
    phase: WizardPhase,
    selection: WizardSelection,
    week: WeekView,
    doctors: DoctorSelector,
    slots: SlotBoard,
    details: Option<DetailCollector>,
    navigation: Option<Navigation>,
}

impl WizardController {
    /// Builds a wizard for a signed-in patient. Nothing is created otherwise.
    pub fn start(session: Session, paths: NavigationPaths, today: NaiveDate) -> Result<Self, WizardError> {
        if !session.is_authenticated {
            warn!("Refusing to start booking wizard without a session");
            return Err(WizardError::NotAuthenticated { login_path: paths.login });
        }
        if !session.is_patient() {
            warn!("Refusing to start booking wizard for non-patient {}", session.user_id);
            return Err(WizardError::NotPatient { login_path: paths.login });
        }

        let id = Uuid::new_v4();
        info!("Booking wizard {} started for patient {}", id, session.user_id);

        Ok(Self {
            id,
            session,
            paths,
            step: WizardStep::ChooseDoctor,
            phase: WizardPhase::Active,
            selection: WizardSelection::default(),
            week: WeekView::new(today),
            doctors: DoctorSelector::new(),
            slots: SlotBoard::new(),
            details: None,
            navigation: None,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn owner_id(&self) -> &str {
        &self.session.user_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn step(&self) -> WizardStep {
        self.step
    }

    pub fn phase(&self) -> WizardPhase {
        self.phase
    }

    pub fn selection(&self) -> &WizardSelection {
        &self.selection
    }

    pub fn slots(&self) -> &SlotBoard {
        &self.slots
    }

    pub fn details(&self) -> Option<&DetailCollector> {
        self.details.as_ref()
    }

    pub fn navigation(&self) -> Option<&Navigation> {
        self.navigation.as_ref()
    }

    fn ensure_active(&self) -> Result<(), WizardError> {
        match self.phase {
            WizardPhase::Active => Ok(()),
            closed => Err(WizardError::Closed(closed)),
        }
    }

    fn ensure_step(&self, step: WizardStep) -> Result<(), WizardError> {
        self.ensure_active()?;
        if self.step != step {
            return Err(WizardError::StepGuard(format!(
                "This action belongs to step {} but the wizard is on step {}",
                step.number(),
                self.step.number()
            )));
        }
        Ok(())
    }

    fn ensure_not_submitting(&self) -> Result<(), WizardError> {
        match self.details.as_ref().map(DetailCollector::state) {
            Some(SubmissionState::Submitting) => Err(AppointmentError::SubmissionInProgress.into()),
            _ => Ok(()),
        }
    }

    // ==========================================================================
    // STEP NAVIGATION
    // ==========================================================================

    pub fn can_proceed(&self, step: WizardStep) -> bool {
        match step {
            WizardStep::ChooseDoctor => self.selection.has_doctor(),
            WizardStep::ChooseSchedule => self.selection.has_schedule(),
            WizardStep::EnterDetails | WizardStep::Confirmation => true,
        }
    }

    pub fn advance(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_active()?;

        let Some(next) = self.step.next() else {
            return Ok(self.step);
        };

        if !self.can_proceed(self.step) {
            let message = match self.step {
                WizardStep::ChooseDoctor => DOCTOR_REQUIRED,
                _ => SCHEDULE_REQUIRED,
            };
            warn!("Wizard {} cannot leave step {}: {}", self.id, self.step.number(), message);
            return Err(WizardError::StepGuard(message.to_string()));
        }

        if next == WizardStep::EnterDetails {
            self.details = Some(self.mount_details()?);
        }

        debug!("Wizard {} advanced {} -> {}", self.id, self.step.number(), next.number());
        self.step = next;
        Ok(self.step)
    }

    pub fn retreat(&mut self) -> Result<WizardStep, WizardError> {
        self.ensure_active()?;
        self.ensure_not_submitting()?;

        let Some(previous) = self.step.previous() else {
            return Ok(self.step);
        };

        if previous < WizardStep::EnterDetails {
            self.details = None;
        }

        debug!("Wizard {} retreated {} -> {}", self.id, self.step.number(), previous.number());
        self.step = previous;
        Ok(self.step)
    }

    fn mount_details(&self) -> Result<DetailCollector, WizardError> {
        match (&self.selection.doctor, self.selection.date, self.selection.time) {
            (Some(doctor), Some(date), Some(time)) => Ok(DetailCollector::new(doctor.clone(), date, time)?),
            _ => Err(WizardError::StepGuard(SCHEDULE_REQUIRED.to_string())),
        }
    }

    // ==========================================================================
    // DOCTOR SELECTION
    // ==========================================================================

    pub fn begin_doctor_search(
        &mut self,
        search: &str,
        specialization: Option<&str>,
    ) -> Result<(SearchTicket, DoctorSearchQuery), WizardError> {
        self.ensure_step(WizardStep::ChooseDoctor)?;
        Ok(self.doctors.begin_search(search, specialization))
    }

    pub fn complete_doctor_search(
        &mut self,
        ticket: SearchTicket,
        result: anyhow::Result<DoctorDirectoryResponse>,
    ) -> bool {
        self.doctors.complete_search(ticket, result)
    }

    /// Returns true when the selection changed. Re-selecting the current doctor
    /// keeps the chosen date and time.
    pub fn select_doctor(&mut self, doctor_id: &str) -> Result<bool, WizardError> {
        self.ensure_step(WizardStep::ChooseDoctor)?;

        let doctor = self
            .doctors
            .find(doctor_id)
            .cloned()
            .ok_or_else(|| WizardError::DoctorNotFound(doctor_id.to_string()))?;

        let changed = self.selection.choose_doctor(doctor);
        if changed {
            debug!("Wizard {} doctor set to {}; schedule cleared", self.id, doctor_id);
            self.slots.reset();
        }
        Ok(changed)
    }

    // ==========================================================================
    // DATE AND TIME SELECTION
    // ==========================================================================

    pub fn previous_week(&mut self) -> Result<NaiveDate, WizardError> {
        self.ensure_active()?;
        self.week.previous_week();
        Ok(self.week.week_start())
    }

    pub fn next_week(&mut self) -> Result<NaiveDate, WizardError> {
        self.ensure_active()?;
        self.week.next_week();
        Ok(self.week.week_start())
    }

    /// Chooses a date and clears the time. The returned fetch must be settled
    /// through [`apply_slot_load`](Self::apply_slot_load).
    pub fn select_date(&mut self, date: NaiveDate, today: NaiveDate) -> Result<SlotFetch, WizardError> {
        self.ensure_step(WizardStep::ChooseSchedule)?;

        let doctor_id = self
            .selection
            .doctor
            .as_ref()
            .map(|d| d.id.clone())
            .ok_or_else(|| WizardError::StepGuard(DOCTOR_REQUIRED.to_string()))?;

        match date_eligibility(date, today) {
            DateEligibility::Selectable => {}
            DateEligibility::Past => {
                return Err(WizardError::DateNotSelectable {
                    date,
                    reason: "date is in the past",
                })
            }
            DateEligibility::Weekend => {
                return Err(WizardError::DateNotSelectable {
                    date,
                    reason: "the clinic is closed on weekends",
                })
            }
        }

        self.selection.choose_date(date);
        let ticket = self.slots.begin(date);
        debug!("Wizard {} date set to {}; loading slots", self.id, date);

        Ok(SlotFetch { ticket, doctor_id, date })
    }

    /// Returns false when the load was superseded by a later date choice.
    pub fn apply_slot_load(&mut self, ticket: SlotLoadTicket, result: anyhow::Result<SlotLoad>) -> bool {
        if self.phase != WizardPhase::Active || self.selection.date != Some(ticket.date) {
            warn!("Wizard {} dropping slot load for {}", self.id, ticket.date);
            return false;
        }
        self.slots.complete(ticket, result)
    }

    pub fn select_time(&mut self, time: &str) -> Result<NaiveTime, WizardError> {
        self.ensure_step(WizardStep::ChooseSchedule)?;

        let date = self
            .selection
            .date
            .ok_or_else(|| WizardError::StepGuard("Please select a date first".to_string()))?;

        let time = Some(time.trim())
            .filter(|t| is_valid_time_format(t))
            .and_then(parse_hhmm)
            .ok_or_else(|| WizardError::InvalidTime(format!("'{}' is not a valid HH:MM time", time)))?;

        let start = self.slots.selectable_slot(date, time)?.start_time;
        self.selection.choose_time(start);
        debug!("Wizard {} time set to {}", self.id, start.format("%H:%M"));
        Ok(start)
    }

    // ==========================================================================
    // DETAILS AND SUBMISSION
    // ==========================================================================

    fn details_mut(&mut self) -> Result<&mut DetailCollector, WizardError> {
        self.ensure_active()?;
        if self.step < WizardStep::EnterDetails {
            return Err(WizardError::StepGuard(
                "Appointment details are entered after choosing a date and time".to_string(),
            ));
        }
        self.details
            .as_mut()
            .ok_or_else(|| WizardError::StepGuard(SCHEDULE_REQUIRED.to_string()))
    }

    pub fn update_details(&mut self, update: DetailsUpdate) -> Result<(), WizardError> {
        Ok(self.details_mut()?.update(update)?)
    }

    pub fn begin_submission(&mut self, today: NaiveDate) -> Result<CreateAppointmentRequest, WizardError> {
        let session = self.session.clone();
        Ok(self.details_mut()?.begin_submission(&session, today)?)
    }

    /// Settles the create-appointment call. Success closes the wizard and says
    /// where to go next.
    pub fn finish_submission(
        &mut self,
        result: Result<Appointment, AppointmentError>,
    ) -> Result<Navigation, WizardError> {
        let details = self
            .details
            .as_mut()
            .ok_or(WizardError::Appointment(AppointmentError::NoSubmissionInFlight))?;

        let appointment_id = details.finish_submission(result)?.id.clone();

        info!("Wizard {} completed with appointment {}", self.id, appointment_id);
        self.step = WizardStep::Confirmation;
        self.phase = WizardPhase::Completed;
        let navigation = Navigation {
            to: self.paths.appointments.clone(),
            notice: Some(BOOKING_SUCCESS_NOTICE.to_string()),
        };
        self.navigation = Some(navigation.clone());
        Ok(navigation)
    }

    /// Abandons the wizard. Nothing is persisted.
    pub fn cancel(&mut self) -> Result<Navigation, WizardError> {
        self.ensure_active()?;
        self.ensure_not_submitting()?;

        info!("Wizard {} cancelled at step {}", self.id, self.step.number());
        self.phase = WizardPhase::Cancelled;
        self.slots.reset();
        let navigation = Navigation {
            to: self.paths.dashboard.clone(),
            notice: None,
        };
        self.navigation = Some(navigation.clone());
        Ok(navigation)
    }

    pub fn snapshot(&self, today: NaiveDate) -> WizardSnapshot {
        WizardSnapshot {
            id: self.id,
            step: self.step,
            step_title: self.step.title(),
            total_steps: TOTAL_STEPS,
            phase: self.phase,
            can_proceed: self.can_proceed(self.step),
            selection: self.selection.clone(),
            doctor_selector: self.doctors.view(),
            week: WeekSnapshot {
                week_start: self.week.week_start(),
                days: self.week.days(today),
            },
            slots: self.slots.view(),
            details: self.details.as_ref().map(DetailCollector::view),
            navigation: self.navigation.clone(),
        }
    }
}
