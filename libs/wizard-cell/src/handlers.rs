use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Extension, Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{Local, NaiveDate};
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use appointment_cell::services::{AppointmentBookingService, DetailsUpdate, SlotLoad};
use doctor_cell::services::{AvailabilityService, DoctorDirectoryService};
use shared_config::AppConfig;
use shared_models::auth::Session;
use shared_models::error::AppError;

use crate::models::{
    DoctorSearchParams, NavigationPaths, SelectDateRequest, SelectDoctorRequest, SelectTimeRequest,
};
use crate::services::{SharedWizard, WizardController, WizardStore};

/// Router state: the session store plus one client per remote collaborator.
#[derive(Clone)]
pub struct WizardState {
    pub config: Arc<AppConfig>,
    pub store: WizardStore,
    pub directory: Arc<DoctorDirectoryService>,
    pub availability: Arc<AvailabilityService>,
    pub booking: Arc<AppointmentBookingService>,
}

impl WizardState {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self {
            directory: Arc::new(DoctorDirectoryService::new(&config)),
            availability: Arc::new(AvailabilityService::new(&config)),
            booking: Arc::new(AppointmentBookingService::new(&config)),
            store: WizardStore::with_idle_ttl(Duration::from_secs(config.wizard_idle_secs)),
            config,
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

async fn snapshot_json(wizard: &SharedWizard) -> Json<Value> {
    Json(json!(wizard.lock().await.snapshot(today())))
}

/// Runs a directory search without holding the wizard lock while the request
/// is in flight.
async fn run_doctor_search(
    state: &WizardState,
    wizard: &SharedWizard,
    token: &str,
    search: &str,
    specialization: Option<&str>,
) -> Result<(), AppError> {
    let (ticket, query) = wizard.lock().await.begin_doctor_search(search, specialization)?;
    let result = state.directory.search_doctors(&query, Some(token)).await;
    wizard.lock().await.complete_doctor_search(ticket, result);
    Ok(())
}

// ==============================================================================
// LIFECYCLE
// ==============================================================================

#[axum::debug_handler]
pub async fn start_wizard(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let token = session.token.clone();
    let controller = WizardController::start(session, NavigationPaths::from_config(&state.config), today())?;
    let (id, wizard) = state.store.insert(controller).await;
    info!("Booking wizard {} created", id);

    run_doctor_search(&state, &wizard, &token, "", None).await?;

    Ok((StatusCode::CREATED, snapshot_json(&wizard).await))
}

#[axum::debug_handler]
pub async fn get_wizard(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    Ok(snapshot_json(&wizard).await)
}

#[axum::debug_handler]
pub async fn cancel_wizard(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.cancel()?;
    let response = snapshot_json(&wizard).await;
    state.store.remove(wizard_id).await;
    Ok(response)
}

// ==============================================================================
// STEP NAVIGATION
// ==============================================================================

#[axum::debug_handler]
pub async fn advance_step(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.advance()?;
    Ok(snapshot_json(&wizard).await)
}

#[axum::debug_handler]
pub async fn retreat_step(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.retreat()?;
    Ok(snapshot_json(&wizard).await)
}

// ==============================================================================
// DOCTOR STAGE
// ==============================================================================

#[axum::debug_handler]
pub async fn search_doctors(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
    Query(params): Query<DoctorSearchParams>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    run_doctor_search(
        &state,
        &wizard,
        &session.token,
        params.search.as_deref().unwrap_or(""),
        params.specialization.as_deref(),
    )
    .await?;
    Ok(snapshot_json(&wizard).await)
}

#[axum::debug_handler]
pub async fn select_doctor(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
    Json(request): Json<SelectDoctorRequest>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.select_doctor(&request.doctor_id)?;
    Ok(snapshot_json(&wizard).await)
}

// ==============================================================================
// SCHEDULE STAGE
// ==============================================================================

#[axum::debug_handler]
pub async fn previous_week(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.previous_week()?;
    Ok(snapshot_json(&wizard).await)
}

#[axum::debug_handler]
pub async fn next_week(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.next_week()?;
    Ok(snapshot_json(&wizard).await)
}

/// Picks a date, then fetches the doctor's slots and the patient's own
/// appointments together. The merged view is applied only once both settle.
#[axum::debug_handler]
pub async fn select_date(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
    Json(request): Json<SelectDateRequest>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    let fetch = wizard.lock().await.select_date(request.date, today())?;

    let (slots, existing) = tokio::join!(
        state
            .availability
            .get_available_slots(&fetch.doctor_id, fetch.date, Some(&session.token)),
        state.booking.get_my_appointments_for_date(fetch.date, &session.token),
    );

    let load = match (slots, existing) {
        (Ok(slots), Ok(existing)) => Ok(SlotLoad { slots, existing }),
        (Err(e), _) | (_, Err(e)) => Err(e),
    };

    let applied = wizard.lock().await.apply_slot_load(fetch.ticket, load);
    debug!("Slot load for wizard {} on {} applied: {}", wizard_id, fetch.date, applied);

    Ok(snapshot_json(&wizard).await)
}

#[axum::debug_handler]
pub async fn select_time(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
    Json(request): Json<SelectTimeRequest>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.select_time(&request.time)?;
    Ok(snapshot_json(&wizard).await)
}

// ==============================================================================
// DETAILS STAGE
// ==============================================================================

#[axum::debug_handler]
pub async fn update_details(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
    Json(update): Json<DetailsUpdate>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    wizard.lock().await.update_details(update)?;
    Ok(snapshot_json(&wizard).await)
}

/// Sends the create-appointment request once. The wizard stays latched while
/// the request is in flight, so a concurrent submit is refused.
#[axum::debug_handler]
pub async fn submit_appointment(
    State(state): State<WizardState>,
    Extension(session): Extension<Session>,
    Path(wizard_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wizard = state.store.get(wizard_id, &session.user_id).await?;
    let request = wizard.lock().await.begin_submission(today())?;

    let result = state.booking.create_appointment(&request, &session.token).await;

    wizard.lock().await.finish_submission(result)?;
    let response = snapshot_json(&wizard).await;
    state.store.remove(wizard_id).await;
    Ok(response)
}
