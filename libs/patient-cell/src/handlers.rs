// libs/patient-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;
use shared_utils::extractor::require_role;

use crate::models::{CreatePatientRequest, UpdatePatientRequest};
use crate::services::patient::PatientService;

/// Patients may only touch their own record; admins have blanket access.
fn authorize_record_access(user: &User, patient_id: Uuid) -> Result<(), AppError> {
    if user.is_admin() || patient_id.to_string() == user.id {
        Ok(())
    } else {
        Err(AppError::Forbidden(
            "Not authorized to access this patient record".to_string(),
        ))
    }
}

#[axum::debug_handler]
pub async fn create_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Json(request): Json<CreatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    let service = PatientService::new(&state);
    let patient = service
        .create_patient(request, auth.token())
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "therapist"])?;

    let service = PatientService::new(&state);
    let patients = service
        .list_patients(auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(patients)))
}

#[axum::debug_handler]
pub async fn get_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    authorize_record_access(&user, patient_id)?;

    let service = PatientService::new(&state);
    let patient = service
        .get_patient(patient_id, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Patient not found".to_string()))?;

    Ok(Json(json!(patient)))
}

#[axum::debug_handler]
pub async fn update_patient(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(patient_id): Path<Uuid>,
    Json(request): Json<UpdatePatientRequest>,
) -> Result<Json<Value>, AppError> {
    authorize_record_access(&user, patient_id)?;

    let service = PatientService::new(&state);
    let patient = service
        .update_patient(patient_id, request, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(patient)))
}
