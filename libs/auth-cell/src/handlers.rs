// libs/auth-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::{TokenResponse, User};
use shared_models::error::AppError;
use shared_utils::extractor::require_role;
use shared_utils::jwt::validate_token;

use crate::services::promotion::UserPromotionService;

fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get("Authorization")
        .ok_or_else(|| AppError::Auth("Missing authorization header".to_string()))?;

    let auth_value = auth_header
        .to_str()
        .map_err(|_| AppError::Auth("Invalid authorization header format".to_string()))?;

    if !auth_value.starts_with("Bearer ") {
        return Err(AppError::Auth("Invalid authorization header format".to_string()));
    }

    Ok(auth_value[7..].to_string())
}

#[axum::debug_handler]
pub async fn validate(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, AppError> {
    debug!("Validating token");

    let token = extract_bearer_token(&headers)?;

    match validate_token(&token, &config.supabase_jwt_secret) {
        Ok(user) => Ok(Json(TokenResponse {
            valid: true,
            user_id: user.id,
            email: user.email,
            role: user.role,
        })),
        Err(err) => Err(AppError::Auth(err)),
    }
}

#[axum::debug_handler]
pub async fn verify(
    State(config): State<Arc<AppConfig>>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    debug!("Verifying token");

    let token = extract_bearer_token(&headers)?;

    match validate_token(&token, &config.supabase_jwt_secret) {
        Ok(_) => Ok(Json(json!({ "valid": true }))),
        Err(_) => Ok(Json(json!({ "valid": false }))),
    }
}

#[derive(Debug, Deserialize)]
pub struct PromoteUserRequest {
    pub role: String,
}

/// Convert a patient account into a therapist account. Admin only.
#[axum::debug_handler]
pub async fn promote_user(
    State(config): State<Arc<AppConfig>>,
    Extension(user): Extension<User>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<PromoteUserRequest>,
) -> Result<Json<Value>, AppError> {
    require_role(&user, &["admin"])?;

    if !matches!(request.role.as_str(), "therapist" | "admin") {
        return Err(AppError::ValidationError(format!(
            "Cannot promote a user to role '{}'",
            request.role
        )));
    }

    let service = UserPromotionService::new(&config);
    let detail = service
        .promote(user_id, &request.role)
        .await
        .map_err(AppError::from)?;

    Ok(Json(json!({ "detail": detail })))
}
