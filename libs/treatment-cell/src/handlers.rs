// libs/treatment-cell/src/handlers.rs
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

use crate::models::CreateTreatmentRequest;
use crate::services::treatment::TreatmentService;

#[axum::debug_handler]
pub async fn create_treatment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTreatmentRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = TreatmentService::new(&state);
    let treatment = service
        .create_treatment(request, auth.token())
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!(treatment)))
}

#[axum::debug_handler]
pub async fn list_treatments(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
) -> Result<Json<Value>, AppError> {
    let service = TreatmentService::new(&state);
    let treatments = service
        .list_treatments(auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(treatments)))
}

#[axum::debug_handler]
pub async fn get_treatment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Path(treatment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let service = TreatmentService::new(&state);
    let treatment = service
        .get_treatment(treatment_id, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Treatment not found".to_string()))?;

    Ok(Json(json!(treatment)))
}

#[axum::debug_handler]
pub async fn delete_treatment(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(treatment_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = TreatmentService::new(&state);
    service
        .delete_treatment(treatment_id, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!({ "detail": "Treatment deleted" })))
}
