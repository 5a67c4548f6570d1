// libs/scheduling-cell/src/store/mod.rs
//
// Store seams for the scheduling core. Conflict checks must always read
// committed, current data, so neither trait exposes any caching surface.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{Appointment, SchedulingError, WeeklyAvailability};

#[async_trait]
pub trait AvailabilityStore: Send + Sync {
    async fn insert_window(
        &self,
        window: WeeklyAvailability,
    ) -> Result<WeeklyAvailability, SchedulingError>;

    /// All windows for a therapist, in no particular order. Empty is fine.
    async fn windows_for_therapist(
        &self,
        therapist_id: Uuid,
    ) -> Result<Vec<WeeklyAvailability>, SchedulingError>;

    /// Idempotent: removing an absent window is a no-op.
    async fn delete_window(&self, window_id: Uuid) -> Result<(), SchedulingError>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, SchedulingError>;

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError>;

    /// Returns false when the id was not stored.
    async fn delete(&self, appointment_id: Uuid) -> Result<bool, SchedulingError>;

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, SchedulingError>;

    /// Appointments whose start time falls on the given UTC date. Appointments
    /// cannot span midnight, so this is the full conflict set for any interval
    /// starting that day.
    async fn for_therapist_on(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError>;

    async fn for_therapist(&self, therapist_id: Uuid)
        -> Result<Vec<Appointment>, SchedulingError>;

    async fn for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, SchedulingError>;

    async fn all(&self) -> Result<Vec<Appointment>, SchedulingError>;
}
