// libs/scheduling-cell/src/router.rs
use std::sync::Arc;

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::state::SchedulingState;

pub fn appointment_routes(state: Arc<SchedulingState>) -> Router {
    let protected_routes = Router::new()
        .route("/", post(handlers::book_appointment))
        .route("/", get(handlers::list_appointments))
        .route("/{appointment_id}", get(handlers::get_appointment))
        .route("/{appointment_id}", put(handlers::update_appointment))
        .route("/{appointment_id}", delete(handlers::cancel_appointment))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}

pub fn free_slot_routes(state: Arc<SchedulingState>) -> Router {
    let protected_routes = Router::new()
        .route(
            "/{therapist_id}/{date}",
            get(handlers::list_free_slots),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}

pub fn availability_routes(state: Arc<SchedulingState>) -> Router {
    let protected_routes = Router::new()
        .route("/{therapist_id}", post(handlers::add_availability_window))
        .route("/{therapist_id}", get(handlers::list_availability_windows))
        .route(
            "/windows/{window_id}",
            delete(handlers::remove_availability_window),
        )
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            auth_middleware,
        ));

    Router::new().merge(protected_routes).with_state(state)
}
