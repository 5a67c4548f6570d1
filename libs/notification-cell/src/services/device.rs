// libs/notification-cell/src/services/device.rs
use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{DeviceToken, RegisterDeviceTokenRequest};

pub struct DeviceTokenService {
    supabase: SupabaseClient,
}

impl DeviceTokenService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    /// Registering an already-known token for the same user is a no-op that
    /// returns the stored row.
    pub async fn register_token(
        &self,
        supabase_user_id: &str,
        request: RegisterDeviceTokenRequest,
        auth_token: &str,
    ) -> Result<DeviceToken> {
        debug!("Registering device token for user {}", supabase_user_id);

        let existing_path = format!(
            "/rest/v1/device_tokens?supabase_user_id=eq.{}&token=eq.{}",
            supabase_user_id, request.token
        );
        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &existing_path,
            Some(auth_token),
            None,
        ).await?;

        if let Some(row) = existing.into_iter().next() {
            return Ok(serde_json::from_value(row)?);
        }

        let token_data = json!({
            "supabase_user_id": supabase_user_id,
            "token": request.token,
            "platform": request.platform,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/device_tokens",
            Some(auth_token),
            Some(token_data),
            Some(return_representation()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to register device token"));
        }

        let token: DeviceToken = serde_json::from_value(result[0].clone())?;
        Ok(token)
    }
}
