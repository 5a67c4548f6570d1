// libs/notification-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, State},
    Json,
};
use axum_extra::TypedHeader;
use headers::{authorization::Bearer, Authorization};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::User;
use shared_models::error::AppError;

use crate::models::RegisterDeviceTokenRequest;
use crate::services::device::DeviceTokenService;

/// Callers register push tokens for themselves only; the user id comes from
/// the validated token, never from the payload.
#[axum::debug_handler]
pub async fn register_device_token(
    State(state): State<Arc<AppConfig>>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    Extension(user): Extension<User>,
    Json(request): Json<RegisterDeviceTokenRequest>,
) -> Result<Json<Value>, AppError> {
    let service = DeviceTokenService::new(&state);
    let token = service
        .register_token(&user.id, request, auth.token())
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(json!(token)))
}
