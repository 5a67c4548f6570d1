// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, Datelike, Duration, NaiveTime, Utc, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ==============================================================================
// CORE SCHEDULING MODELS
// ==============================================================================

/// A recurring open-hours window for a therapist on one weekday.
/// Windows are never edited in place; replacing one means delete + create.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub id: Uuid,
    pub therapist_id: Uuid,
    pub weekday: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub created_at: DateTime<Utc>,
}

/// A committed booking. There is no status column: cancellation deletes the
/// row, so an appointment is active exactly while it is stored. The end time
/// is always derived from the treatment's duration at the moment it is
/// needed, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub treatment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn end_time(&self, duration_minutes: i64) -> DateTime<Utc> {
        self.start_time + Duration::minutes(duration_minutes)
    }
}

/// Lower-case English weekday name, the form windows are stored in.
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

impl WeeklyAvailability {
    pub fn matches_date(&self, date: chrono::NaiveDate) -> bool {
        self.weekday == weekday_name(date.weekday())
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAvailabilityRequest {
    pub weekday: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: Uuid,
    pub therapist_id: Uuid,
    pub treatment_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub start_time: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    /// Caller-asserted overlap override; the handlers restrict it to admins
    /// before it ever reaches the booking engine.
    pub allow_override: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct FreeSlotsQuery {
    pub duration_minutes: i64,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum SchedulingError {
    #[error("Availability window start must be before end")]
    InvalidRange,

    #[error("Requested time is outside the therapist's availability")]
    OutsideAvailability,

    #[error("Requested time overlaps appointment {appointment_id}")]
    SlotConflict { appointment_id: Uuid },

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl From<SchedulingError> for shared_models::error::AppError {
    fn from(err: SchedulingError) -> Self {
        use shared_models::error::AppError;
        match &err {
            SchedulingError::InvalidRange => AppError::ValidationError(err.to_string()),
            SchedulingError::OutsideAvailability => AppError::BadRequest(err.to_string()),
            SchedulingError::SlotConflict { .. } => AppError::Conflict(err.to_string()),
            SchedulingError::NotFound(_) => AppError::NotFound(err.to_string()),
            SchedulingError::StoreUnavailable(_) => AppError::ServiceUnavailable(err.to_string()),
        }
    }
}
