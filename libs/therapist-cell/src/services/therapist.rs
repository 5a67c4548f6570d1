// libs/therapist-cell/src/services/therapist.rs
use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreateTherapistRequest, Therapist};

pub struct TherapistService {
    supabase: SupabaseClient,
}

impl TherapistService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_therapist(
        &self,
        request: CreateTherapistRequest,
        auth_token: &str,
    ) -> Result<Therapist> {
        debug!("Creating therapist record for: {}", request.email);

        let existing_path = format!("/rest/v1/therapists?email=eq.{}", request.email);
        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &existing_path,
            Some(auth_token),
            None,
        ).await?;

        if !existing.is_empty() {
            return Err(anyhow!("Therapist with email {} already exists", request.email));
        }

        let therapist_data = json!({
            "name": request.name,
            "specialty": request.specialty,
            "email": request.email,
            "phone": request.phone,
            "supabase_user_id": request.supabase_user_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/therapists",
            Some(auth_token),
            Some(therapist_data),
            Some(return_representation()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create therapist record"));
        }

        let therapist: Therapist = serde_json::from_value(result[0].clone())?;
        debug!("Therapist record created with ID: {}", therapist.id);

        Ok(therapist)
    }

    pub async fn get_therapist(
        &self,
        therapist_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Therapist>> {
        let path = format!("/rest/v1/therapists?id=eq.{}", therapist_id);
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

    pub async fn list_therapists(&self, auth_token: &str) -> Result<Vec<Therapist>> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/therapists?order=name.asc",
            Some(auth_token),
            None,
        ).await?;

        let therapists: Vec<Therapist> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(therapists)
    }
}
