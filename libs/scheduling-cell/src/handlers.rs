// libs/scheduling-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{
    Appointment, BookAppointmentRequest, CreateAvailabilityRequest, FreeSlotsQuery,
    UpdateAppointmentRequest, WeeklyAvailability,
};
use crate::state::SchedulingState;

fn caller_uuid(user: &User) -> Result<Uuid, AppError> {
    Uuid::parse_str(&user.id)
        .map_err(|_| AppError::Auth("Caller id is not a valid uuid".to_string()))
}

/// Admins see everything; a patient owns their bookings; a therapist is the
/// counterparty on theirs.
fn can_access(user: &User, appointment: &Appointment) -> bool {
    user.is_admin()
        || (user.has_role("patient") && appointment.patient_id.to_string() == user.id)
        || (user.has_role("therapist") && appointment.therapist_id.to_string() == user.id)
}

// ==============================================================================
// APPOINTMENT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Json(request): Json<BookAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    // A patient books for themselves; therapists and admins may book on a
    // patient's behalf.
    let is_own_booking = request.patient_id.to_string() == user.id;
    if !is_own_booking && !user.is_admin() && !user.has_role("therapist") {
        return Err(AppError::Forbidden(
            "Not authorized to book an appointment for this patient".to_string(),
        ));
    }

    let appointment = state.booking.create_appointment(request).await?;
    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let appointments = match user.role.as_deref() {
        Some("admin") => state.booking.all_appointments().await?,
        Some("therapist") => {
            state
                .booking
                .appointments_for_therapist(caller_uuid(&user)?)
                .await?
        }
        Some("patient") => {
            state
                .booking
                .appointments_for_patient(caller_uuid(&user)?)
                .await?
        }
        _ => {
            return Err(AppError::Forbidden(
                "Role is not allowed to list appointments".to_string(),
            ))
        }
    };

    Ok(Json(appointments))
}

#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.booking.get_appointment(appointment_id).await?;

    if !can_access(&user, &appointment) {
        return Err(AppError::Forbidden(
            "Not authorized to view this appointment".to_string(),
        ));
    }

    Ok(Json(appointment))
}

#[axum::debug_handler]
pub async fn update_appointment(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Json<Appointment>, AppError> {
    let current = state.booking.get_appointment(appointment_id).await?;

    if !can_access(&user, &current) {
        return Err(AppError::Forbidden(
            "Not authorized to modify this appointment".to_string(),
        ));
    }

    // The override flag is caller-asserted but only honored for admins.
    let allow_override = request.allow_override.unwrap_or(false) && user.is_admin();

    let updated = state
        .booking
        .update_appointment(appointment_id, request, allow_override)
        .await?;

    Ok(Json(updated))
}

#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(appointment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let current = state.booking.get_appointment(appointment_id).await?;

    if !can_access(&user, &current) {
        return Err(AppError::Forbidden(
            "Not authorized to cancel this appointment".to_string(),
        ));
    }

    let cancelled = state.booking.cancel_appointment(appointment_id).await?;

    Ok(Json(json!({
        "detail": "Appointment cancelled",
        "appointment": cancelled,
    })))
}

// ==============================================================================
// FREE SLOT HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn list_free_slots(
    State(state): State<Arc<SchedulingState>>,
    Path((therapist_id, date)): Path<(Uuid, NaiveDate)>,
    Query(query): Query<FreeSlotsQuery>,
) -> Result<Json<Vec<DateTime<Utc>>>, AppError> {
    let slots = state
        .free_slots
        .free_slots(therapist_id, date, query.duration_minutes)
        .await?;

    Ok(Json(slots))
}

// ==============================================================================
// AVAILABILITY HANDLERS
// ==============================================================================

#[axum::debug_handler]
pub async fn add_availability_window(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(therapist_id): Path<Uuid>,
    Json(request): Json<CreateAvailabilityRequest>,
) -> Result<Json<WeeklyAvailability>, AppError> {
    let is_own_schedule =
        user.has_role("therapist") && therapist_id.to_string() == user.id;
    if !is_own_schedule && !user.is_admin() {
        return Err(AppError::Forbidden(
            "Not authorized to manage this therapist's availability".to_string(),
        ));
    }

    let window = state.availability.add_window(therapist_id, request).await?;
    Ok(Json(window))
}

#[axum::debug_handler]
pub async fn list_availability_windows(
    State(state): State<Arc<SchedulingState>>,
    Path(therapist_id): Path<Uuid>,
) -> Result<Json<Vec<WeeklyAvailability>>, AppError> {
    let windows = state.availability.list_windows(therapist_id).await?;
    Ok(Json(windows))
}

#[axum::debug_handler]
pub async fn remove_availability_window(
    State(state): State<Arc<SchedulingState>>,
    Extension(user): Extension<User>,
    Path(window_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["therapist", "admin"])?;

    state.availability.remove_window(window_id).await?;

    Ok(Json(json!({ "detail": "Availability window removed" })))
}
