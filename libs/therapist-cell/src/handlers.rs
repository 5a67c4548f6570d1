// libs/therapist-cell/src/handlers.rs
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

use crate::models::CreateTherapistRequest;
use crate::services::therapist::TherapistService;

#[axum::debug_handler]
pub async fn create_therapist(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<CreateTherapistRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = TherapistService::new(&state);
    let therapist = service
        .create_therapist(request, auth.token())
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    Ok(Json(json!(therapist)))
}

#[axum::debug_handler]
pub async fn list_therapists(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    let service = TherapistService::new(&state);
    let therapists = service
        .list_therapists(auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(therapists)))
}

#[axum::debug_handler]
pub async fn get_therapist(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Path(therapist_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin", "therapist"])?;

    let service = TherapistService::new(&state);
    let therapist = service
        .get_therapist(therapist_id, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?
        .ok_or_else(|| AppError::NotFound("Therapist not found".to_string()))?;

    Ok(Json(json!(therapist)))
}
