// libs/treatment-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Treatment {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTreatmentRequest {
    pub name: String,
    pub description: Option<String>,
    pub duration_minutes: i64,
    pub price: f64,
}
