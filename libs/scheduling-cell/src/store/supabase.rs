// libs/scheduling-cell/src/store/supabase.rs
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

use shared_database::supabase::{return_representation, SupabaseClient};

use crate::models::{Appointment, SchedulingError, WeeklyAvailability};
use crate::store::{AppointmentStore, AvailabilityStore};

fn store_error(err: anyhow::Error) -> SchedulingError {
    SchedulingError::StoreUnavailable(err.to_string())
}

fn parse_rows<T: serde::de::DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, SchedulingError> {
    rows.into_iter()
        .map(serde_json::from_value)
        .collect::<Result<Vec<T>, _>>()
        .map_err(|e| SchedulingError::StoreUnavailable(format!("Failed to parse rows: {}", e)))
}

pub struct SupabaseAvailabilityStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAvailabilityStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }
}

#[async_trait]
impl AvailabilityStore for SupabaseAvailabilityStore {
    async fn insert_window(
        &self,
        window: WeeklyAvailability,
    ) -> Result<WeeklyAvailability, SchedulingError> {
        debug!("Storing availability window for therapist {}", window.therapist_id);

        let window_data = json!({
            "id": window.id,
            "therapist_id": window.therapist_id,
            "weekday": window.weekday,
            "start_time": window.start_time.format("%H:%M:%S").to_string(),
            "end_time": window.end_time.format("%H:%M:%S").to_string(),
            "created_at": window.created_at.to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .service_request_with_headers(
                Method::POST,
                "/rest/v1/therapist_availability",
                Some(window_data),
                Some(return_representation()),
            )
            .await
            .map_err(store_error)?;

        let mut windows: Vec<WeeklyAvailability> = parse_rows(result)?;
        windows
            .pop()
            .ok_or_else(|| SchedulingError::StoreUnavailable("Window insert returned no row".to_string()))
    }

    async fn windows_for_therapist(
        &self,
        therapist_id: Uuid,
    ) -> Result<Vec<WeeklyAvailability>, SchedulingError> {
        let path = format!(
            "/rest/v1/therapist_availability?therapist_id=eq.{}",
            therapist_id
        );
        let result: Vec<Value> = self
            .supabase
            .service_request(Method::GET, &path, None)
            .await
            .map_err(store_error)?;

        parse_rows(result)
    }

    async fn delete_window(&self, window_id: Uuid) -> Result<(), SchedulingError> {
        let path = format!("/rest/v1/therapist_availability?id=eq.{}", window_id);
        let _: Vec<Value> = self
            .supabase
            .service_request(Method::DELETE, &path, None)
            .await
            .map_err(store_error)?;

        Ok(())
    }
}

pub struct SupabaseAppointmentStore {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseAppointmentStore {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn fetch(&self, path: &str) -> Result<Vec<Appointment>, SchedulingError> {
        let result: Vec<Value> = self
            .supabase
            .service_request(Method::GET, path, None)
            .await
            .map_err(store_error)?;

        parse_rows(result)
    }
}

#[async_trait]
impl AppointmentStore for SupabaseAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, SchedulingError> {
        debug!(
            "Inserting appointment {} for therapist {}",
            appointment.id, appointment.therapist_id
        );

        let appointment_data = json!({
            "id": appointment.id,
            "patient_id": appointment.patient_id,
            "therapist_id": appointment.therapist_id,
            "treatment_id": appointment.treatment_id,
            "start_time": appointment.start_time.to_rfc3339(),
            "notes": appointment.notes,
            "created_at": appointment.created_at.to_rfc3339(),
            "updated_at": appointment.updated_at.to_rfc3339(),
        });

        let result: Vec<Value> = self
            .supabase
            .service_request_with_headers(
                Method::POST,
                "/rest/v1/appointments",
                Some(appointment_data),
                Some(return_representation()),
            )
            .await
            .map_err(store_error)?;

        let mut rows: Vec<Appointment> = parse_rows(result)?;
        rows.pop().ok_or_else(|| {
            SchedulingError::StoreUnavailable("Appointment insert returned no row".to_string())
        })
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError> {
        let update_data = json!({
            "start_time": appointment.start_time.to_rfc3339(),
            "notes": appointment.notes,
            "updated_at": appointment.updated_at.to_rfc3339(),
        });

        let path = format!("/rest/v1/appointments?id=eq.{}", appointment.id);
        let result: Vec<Value> = self
            .supabase
            .service_request_with_headers(
                Method::PATCH,
                &path,
                Some(update_data),
                Some(return_representation()),
            )
            .await
            .map_err(store_error)?;

        let mut rows: Vec<Appointment> = parse_rows(result)?;
        rows.pop()
            .ok_or(SchedulingError::NotFound("appointment"))
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<bool, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let result: Vec<Value> = self
            .supabase
            .service_request_with_headers(
                Method::DELETE,
                &path,
                None,
                Some(return_representation()),
            )
            .await
            .map_err(store_error)?;

        Ok(!result.is_empty())
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        let path = format!("/rest/v1/appointments?id=eq.{}", appointment_id);
        let mut rows = self.fetch(&path).await?;
        Ok(rows.pop())
    }

    async fn for_therapist_on(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let day_start = date
            .and_hms_opt(0, 0, 0)
            .map(|t| t.and_utc())
            .unwrap_or_else(Utc::now);
        let day_end = day_start + Duration::days(1);

        let path = format!(
            "/rest/v1/appointments?therapist_id=eq.{}&start_time=gte.{}&start_time=lt.{}&order=start_time.asc",
            therapist_id,
            urlencoding::encode(&day_start.to_rfc3339()),
            urlencoding::encode(&day_end.to_rfc3339()),
        );
        self.fetch(&path).await
    }

    async fn for_therapist(
        &self,
        therapist_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?therapist_id=eq.{}&order=start_time.asc",
            therapist_id
        );
        self.fetch(&path).await
    }

    async fn for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, SchedulingError> {
        let path = format!(
            "/rest/v1/appointments?patient_id=eq.{}&order=start_time.asc",
            patient_id
        );
        self.fetch(&path).await
    }

    async fn all(&self) -> Result<Vec<Appointment>, SchedulingError> {
        self.fetch("/rest/v1/appointments?order=start_time.asc").await
    }
}
