// libs/treatment-cell/src/services/directory.rs
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

use scheduling_cell::collaborators::TreatmentDirectory;
use scheduling_cell::models::SchedulingError;
use shared_database::supabase::SupabaseClient;

#[derive(Debug, Deserialize)]
struct TreatmentTiming {
    duration_minutes: i64,
    price: f64,
}

/// Production `TreatmentDirectory`: resolves duration and price straight from
/// the treatments table on every call, so the scheduling core always decides
/// against current data.
pub struct SupabaseTreatmentDirectory {
    supabase: Arc<SupabaseClient>,
}

impl SupabaseTreatmentDirectory {
    pub fn new(supabase: Arc<SupabaseClient>) -> Self {
        Self { supabase }
    }

    async fn resolve(&self, treatment_id: Uuid) -> Result<TreatmentTiming, SchedulingError> {
        let path = format!(
            "/rest/v1/treatments?id=eq.{}&select=duration_minutes,price",
            treatment_id
        );

        let rows: Vec<Value> = self
            .supabase
            .service_request(Method::GET, &path, None)
            .await
            .map_err(|e| SchedulingError::StoreUnavailable(e.to_string()))?;

        let row = rows
            .into_iter()
            .next()
            .ok_or(SchedulingError::NotFound("treatment"))?;

        let timing: TreatmentTiming = serde_json::from_value(row).map_err(|e| {
            SchedulingError::StoreUnavailable(format!("Failed to parse treatment: {}", e))
        })?;

        debug!(
            "Resolved treatment {}: {} minutes",
            treatment_id, timing.duration_minutes
        );
        Ok(timing)
    }
}

#[async_trait]
impl TreatmentDirectory for SupabaseTreatmentDirectory {
    async fn resolve_duration(&self, treatment_id: Uuid) -> Result<i64, SchedulingError> {
        Ok(self.resolve(treatment_id).await?.duration_minutes)
    }

    async fn resolve_price(&self, treatment_id: Uuid) -> Result<f64, SchedulingError> {
        Ok(self.resolve(treatment_id).await?.price)
    }
}
