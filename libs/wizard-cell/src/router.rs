use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, patch, post},
    Router,
};

use shared_config::AppConfig;
use shared_utils::extractor::auth_middleware;

use crate::handlers::{self, WizardState};

pub fn wizard_routes(config: Arc<AppConfig>) -> Router {
    wizard_routes_with_state(WizardState::new(config))
}

/// Every wizard route requires a signed-in user; the patient role is checked
/// when a wizard is created.
pub fn wizard_routes_with_state(state: WizardState) -> Router {
    let config = state.config.clone();

    Router::new()
        .route("/", post(handlers::start_wizard))
        .route("/{wizard_id}", get(handlers::get_wizard))
        .route("/{wizard_id}/cancel", post(handlers::cancel_wizard))
        // Step navigation
        .route("/{wizard_id}/advance", post(handlers::advance_step))
        .route("/{wizard_id}/retreat", post(handlers::retreat_step))
        // Doctor stage
        .route("/{wizard_id}/doctors", get(handlers::search_doctors))
        .route("/{wizard_id}/doctor", post(handlers::select_doctor))
        // Schedule stage
        .route("/{wizard_id}/week/previous", post(handlers::previous_week))
        .route("/{wizard_id}/week/next", post(handlers::next_week))
        .route("/{wizard_id}/date", post(handlers::select_date))
        .route("/{wizard_id}/time", post(handlers::select_time))
        // Details stage
        .route("/{wizard_id}/details", patch(handlers::update_details))
        .route("/{wizard_id}/submit", post(handlers::submit_appointment))
        .layer(middleware::from_fn_with_state(config, auth_middleware))
        .with_state(state)
}
