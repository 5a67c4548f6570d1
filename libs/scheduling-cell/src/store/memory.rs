// libs/scheduling-cell/src/store/memory.rs
//
// In-memory store implementations. These back the core's tests (where the
// locking discipline has to be exercised against real shared state) and
// local development without a database.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::models::{Appointment, SchedulingError, WeeklyAvailability};
use crate::store::{AppointmentStore, AvailabilityStore};

#[derive(Debug, Default, Clone)]
pub struct InMemoryAvailabilityStore {
    windows: Arc<RwLock<HashMap<Uuid, WeeklyAvailability>>>,
}

impl InMemoryAvailabilityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityStore for InMemoryAvailabilityStore {
    async fn insert_window(
        &self,
        window: WeeklyAvailability,
    ) -> Result<WeeklyAvailability, SchedulingError> {
        let mut windows = self.windows.write().await;
        windows.insert(window.id, window.clone());
        Ok(window)
    }

    async fn windows_for_therapist(
        &self,
        therapist_id: Uuid,
    ) -> Result<Vec<WeeklyAvailability>, SchedulingError> {
        let windows = self.windows.read().await;
        Ok(windows
            .values()
            .filter(|w| w.therapist_id == therapist_id)
            .cloned()
            .collect())
    }

    async fn delete_window(&self, window_id: Uuid) -> Result<(), SchedulingError> {
        let mut windows = self.windows.write().await;
        windows.remove(&window_id);
        Ok(())
    }
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryAppointmentStore {
    appointments: Arc<RwLock<HashMap<Uuid, Appointment>>>,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sorted(mut appointments: Vec<Appointment>) -> Vec<Appointment> {
        appointments.sort_by_key(|a| a.start_time);
        appointments
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, appointment: Appointment) -> Result<Appointment, SchedulingError> {
        let mut appointments = self.appointments.write().await;
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment)
    }

    async fn update(&self, appointment: &Appointment) -> Result<Appointment, SchedulingError> {
        let mut appointments = self.appointments.write().await;
        if !appointments.contains_key(&appointment.id) {
            return Err(SchedulingError::NotFound("appointment"));
        }
        appointments.insert(appointment.id, appointment.clone());
        Ok(appointment.clone())
    }

    async fn delete(&self, appointment_id: Uuid) -> Result<bool, SchedulingError> {
        let mut appointments = self.appointments.write().await;
        Ok(appointments.remove(&appointment_id).is_some())
    }

    async fn get(&self, appointment_id: Uuid) -> Result<Option<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        Ok(appointments.get(&appointment_id).cloned())
    }

    async fn for_therapist_on(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        Ok(Self::sorted(
            appointments
                .values()
                .filter(|a| a.therapist_id == therapist_id && a.start_time.date_naive() == date)
                .cloned()
                .collect(),
        ))
    }

    async fn for_therapist(
        &self,
        therapist_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        Ok(Self::sorted(
            appointments
                .values()
                .filter(|a| a.therapist_id == therapist_id)
                .cloned()
                .collect(),
        ))
    }

    async fn for_patient(&self, patient_id: Uuid) -> Result<Vec<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        Ok(Self::sorted(
            appointments
                .values()
                .filter(|a| a.patient_id == patient_id)
                .cloned()
                .collect(),
        ))
    }

    async fn all(&self) -> Result<Vec<Appointment>, SchedulingError> {
        let appointments = self.appointments.read().await;
        Ok(Self::sorted(appointments.values().cloned().collect()))
    }
}
