// libs/auth-cell/src/services/promotion.rs
//
// Admin workflow that turns a patient account into a therapist account: the
// patient record is replaced by a therapist record and the role claim is
// updated through the Supabase auth admin API.

use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};
use shared_models::error::AppError;

#[derive(Debug, Error)]
pub enum PromotionError {
    #[error("Patient not found")]
    PatientNotFound,

    #[error("Store error: {0}")]
    Store(String),
}

impl From<PromotionError> for AppError {
    fn from(err: PromotionError) -> Self {
        match &err {
            PromotionError::PatientNotFound => AppError::NotFound(err.to_string()),
            PromotionError::Store(_) => AppError::Database(err.to_string()),
        }
    }
}

fn store_error(err: anyhow::Error) -> PromotionError {
    PromotionError::Store(err.to_string())
}

pub struct UserPromotionService {
    supabase: SupabaseClient,
}

impl UserPromotionService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn promote(&self, user_id: Uuid, role: &str) -> Result<String, PromotionError> {
        debug!("Promoting user {} to role {}", user_id, role);

        let patient_path = format!("/rest/v1/patients?supabase_user_id=eq.{}", user_id);
        let patients: Vec<Value> = self
            .supabase
            .service_request(Method::GET, &patient_path, None)
            .await
            .map_err(store_error)?;

        let patient = patients
            .into_iter()
            .next()
            .ok_or(PromotionError::PatientNotFound)?;

        let first_name = patient["first_name"].as_str().unwrap_or_default();
        let last_name = patient["last_name"].as_str().unwrap_or_default();
        let full_name = format!("{} {}", first_name, last_name).trim().to_string();
        let email = patient["email"].as_str().unwrap_or_default().to_string();
        let phone = patient["phone"].as_str().map(|s| s.to_string());

        // Already promoted under this auth account: just drop the patient row.
        let existing_path = format!("/rest/v1/therapists?supabase_user_id=eq.{}", user_id);
        let existing: Vec<Value> = self
            .supabase
            .service_request(Method::GET, &existing_path, None)
            .await
            .map_err(store_error)?;

        if let Some(therapist) = existing.into_iter().next() {
            self.delete_patient(user_id).await?;
            let name = therapist["name"].as_str().unwrap_or("therapist");
            return Ok(format!("User already promoted as {}.", name));
        }

        // A therapist record with the same email gets claimed by this account.
        let by_email_path = format!("/rest/v1/therapists?email=eq.{}", email);
        let by_email: Vec<Value> = self
            .supabase
            .service_request(Method::GET, &by_email_path, None)
            .await
            .map_err(store_error)?;

        if let Some(therapist) = by_email.into_iter().next() {
            let therapist_id = therapist["id"].as_str().unwrap_or_default().to_string();
            let update_path = format!("/rest/v1/therapists?id=eq.{}", therapist_id);
            let update_data = json!({
                "name": full_name,
                "phone": phone,
                "supabase_user_id": user_id,
            });
            let _: Vec<Value> = self
                .supabase
                .service_request_with_headers(
                    Method::PATCH,
                    &update_path,
                    Some(update_data),
                    Some(return_representation()),
                )
                .await
                .map_err(store_error)?;
        } else {
            let therapist_data = json!({
                "name": full_name,
                "specialty": "General",
                "email": email,
                "phone": phone,
                "supabase_user_id": user_id,
                "created_at": Utc::now().to_rfc3339(),
            });
            let _: Vec<Value> = self
                .supabase
                .service_request_with_headers(
                    Method::POST,
                    "/rest/v1/therapists",
                    Some(therapist_data),
                    Some(return_representation()),
                )
                .await
                .map_err(store_error)?;
        }

        self.delete_patient(user_id).await?;
        self.update_role_claim(user_id, role).await?;

        info!("User {} promoted to {}", user_id, role);
        Ok(format!("User {} promoted to {} successfully.", full_name, role))
    }

    async fn delete_patient(&self, user_id: Uuid) -> Result<(), PromotionError> {
        let path = format!("/rest/v1/patients?supabase_user_id=eq.{}", user_id);
        let _: Vec<Value> = self
            .supabase
            .service_request(Method::DELETE, &path, None)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn update_role_claim(&self, user_id: Uuid, role: &str) -> Result<(), PromotionError> {
        let path = format!("/auth/v1/admin/users/{}", user_id);
        let body = json!({ "app_metadata": { "role": role } });
        let _: Value = self
            .supabase
            .service_request(Method::PUT, &path, Some(body))
            .await
            .map_err(store_error)?;
        Ok(())
    }
}
