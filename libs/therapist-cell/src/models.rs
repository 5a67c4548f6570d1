// libs/therapist-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Therapist {
    pub id: Uuid,
    pub name: String,
    pub specialty: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub supabase_user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTherapistRequest {
    pub name: String,
    pub specialty: Option<String>,
    pub email: String,
    pub phone: Option<String>,
    pub supabase_user_id: Option<String>,
}
