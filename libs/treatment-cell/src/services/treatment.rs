// libs/treatment-cell/src/services/treatment.rs
use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreateTreatmentRequest, Treatment};

pub struct TreatmentService {
    supabase: SupabaseClient,
}

impl TreatmentService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_treatment(
        &self,
        request: CreateTreatmentRequest,
        auth_token: &str,
    ) -> Result<Treatment> {
        debug!("Creating treatment: {}", request.name);

        if request.duration_minutes <= 0 {
            return Err(anyhow!("Treatment duration must be positive"));
        }
        if request.price < 0.0 {
            return Err(anyhow!("Treatment price must not be negative"));
        }

        // Treatment names are unique.
        let existing_path = format!("/rest/v1/treatments?name=eq.{}", request.name);
        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &existing_path,
            Some(auth_token),
            None,
        ).await?;

        if !existing.is_empty() {
            return Err(anyhow!("Treatment '{}' already exists", request.name));
        }

        let treatment_data = json!({
            "name": request.name,
            "description": request.description,
            "duration_minutes": request.duration_minutes,
            "price": request.price,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/treatments",
            Some(auth_token),
            Some(treatment_data),
            Some(return_representation()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create treatment"));
        }

        let treatment: Treatment = serde_json::from_value(result[0].clone())?;
        debug!("Treatment created with ID: {}", treatment.id);

        Ok(treatment)
    }

    pub async fn get_treatment(
        &self,
        treatment_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Treatment>> {
        let path = format!("/rest/v1/treatments?id=eq.{}", treatment_id);
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            &path,
            Some(auth_token),
            None,
        ).await?;

        match result.into_iter().next() {
            Some(row) => Ok(Some(serde_json::from_value(row)?)),
            None => Ok(None),
        }
    }

    pub async fn list_treatments(&self, auth_token: &str) -> Result<Vec<Treatment>> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/treatments?order=name.asc",
            Some(auth_token),
            None,
        ).await?;

        let treatments: Vec<Treatment> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(treatments)
    }

    pub async fn delete_treatment(&self, treatment_id: Uuid, auth_token: &str) -> Result<()> {
        debug!("Deleting treatment: {}", treatment_id);

        let path = format!("/rest/v1/treatments?id=eq.{}", treatment_id);
        let _: Vec<Value> = self.supabase.request(
            Method::DELETE,
            &path,
            Some(auth_token),
            None,
        ).await?;

        Ok(())
    }
}
