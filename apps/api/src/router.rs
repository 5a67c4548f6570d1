use std::sync::Arc;

use axum::{routing::get, Router};

use auth_cell::router::{admin_routes, auth_routes};
use notification_cell::router::device_token_routes;
use notification_cell::services::dispatch::DispatchNotifier;
use patient_cell::router::patient_routes;
use scheduling_cell::router::{appointment_routes, availability_routes, free_slot_routes};
use scheduling_cell::state::SchedulingState;
use scheduling_cell::store::supabase::{SupabaseAppointmentStore, SupabaseAvailabilityStore};
use shared_config::AppConfig;
use shared_database::supabase::SupabaseClient;
use therapist_cell::router::therapist_routes;
use treatment_cell::router::treatment_routes;
use treatment_cell::services::directory::SupabaseTreatmentDirectory;

pub fn create_router(state: Arc<AppConfig>) -> Router {
    // One client, one scheduling state, one gate registry for the process.
    let supabase = Arc::new(SupabaseClient::new(&state));

    let availability_store = Arc::new(SupabaseAvailabilityStore::new(Arc::clone(&supabase)));
    let appointment_store = Arc::new(SupabaseAppointmentStore::new(Arc::clone(&supabase)));
    let treatments = Arc::new(SupabaseTreatmentDirectory::new(Arc::clone(&supabase)));
    let notifier = Arc::new(DispatchNotifier::new(
        Arc::clone(&state),
        Arc::clone(&supabase),
    ));

    let scheduling = Arc::new(SchedulingState::new(
        Arc::clone(&state),
        availability_store,
        appointment_store,
        treatments,
        notifier,
    ));

    Router::new()
        .route("/", get(|| async { "FisioBook API is running!" }))
        .nest("/auth", auth_routes(state.clone()))
        .nest("/admin", admin_routes(state.clone()))
        .nest("/patients", patient_routes(state.clone()))
        .nest("/therapists", therapist_routes(state.clone()))
        .nest("/treatments", treatment_routes(state.clone()))
        .nest("/appointments", appointment_routes(Arc::clone(&scheduling)))
        .nest("/free-slots", free_slot_routes(Arc::clone(&scheduling)))
        .nest("/availability", availability_routes(scheduling))
        .nest("/device-tokens", device_token_routes(state))
}
