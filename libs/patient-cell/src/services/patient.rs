// libs/patient-cell/src/services/patient.rs
use anyhow::{anyhow, Result};
use chrono::Utc;
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{CreatePatientRequest, Patient, UpdatePatientRequest};

pub struct PatientService {
    supabase: SupabaseClient,
}

impl PatientService {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            supabase: SupabaseClient::new(config),
        }
    }

    pub async fn create_patient(
        &self,
        request: CreatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Creating patient record for: {}", request.email);

        let existing_check_path = format!("/rest/v1/patients?email=eq.{}", request.email);
        let existing: Vec<Value> = self.supabase.request(
            Method::GET,
            &existing_check_path,
            Some(auth_token),
            None,
        ).await?;

        if !existing.is_empty() {
            return Err(anyhow!("Patient with email {} already exists", request.email));
        }

        let patient_data = json!({
            "first_name": request.first_name,
            "last_name": request.last_name,
            "email": request.email,
            "phone": request.phone,
            "supabase_user_id": request.supabase_user_id,
            "created_at": Utc::now().to_rfc3339(),
        });

        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::POST,
            "/rest/v1/patients",
            Some(auth_token),
            Some(patient_data),
            Some(return_representation()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to create patient record"));
        }

        let patient: Patient = serde_json::from_value(result[0].clone())?;
        debug!("Patient record created with ID: {}", patient.id);

        Ok(patient)
    }

    pub async fn get_patient(
        &self,
        patient_id: Uuid,
        auth_token: &str,
    ) -> Result<Option<Patient>> {
        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
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

    pub async fn list_patients(&self, auth_token: &str) -> Result<Vec<Patient>> {
        let result: Vec<Value> = self.supabase.request(
            Method::GET,
            "/rest/v1/patients?order=last_name.asc",
            Some(auth_token),
            None,
        ).await?;

        let patients: Vec<Patient> = result
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(patients)
    }

    pub async fn update_patient(
        &self,
        patient_id: Uuid,
        request: UpdatePatientRequest,
        auth_token: &str,
    ) -> Result<Patient> {
        debug!("Updating patient record: {}", patient_id);

        let mut update_data = serde_json::Map::new();

        if let Some(first_name) = request.first_name {
            update_data.insert("first_name".to_string(), json!(first_name));
        }
        if let Some(last_name) = request.last_name {
            update_data.insert("last_name".to_string(), json!(last_name));
        }
        if let Some(phone) = request.phone {
            update_data.insert("phone".to_string(), json!(phone));
        }

        let path = format!("/rest/v1/patients?id=eq.{}", patient_id);
        let result: Vec<Value> = self.supabase.request_with_headers(
            Method::PATCH,
            &path,
            Some(auth_token),
            Some(Value::Object(update_data)),
            Some(return_representation()),
        ).await?;

        if result.is_empty() {
            return Err(anyhow!("Failed to update patient record"));
        }

        let updated_patient: Patient = serde_json::from_value(result[0].clone())?;
        Ok(updated_patient)
    }
}
