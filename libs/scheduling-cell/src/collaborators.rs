// libs/scheduling-cell/src/collaborators.rs
//
// Boundary contracts the scheduling core consumes. The production
// implementations live in their own cells (treatment-cell,
// notification-cell); the core only sees these traits.

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use crate::models::{Appointment, SchedulingError};

/// Resolves treatment metadata at the moment scheduling decisions need it.
#[async_trait]
pub trait TreatmentDirectory: Send + Sync {
    async fn resolve_duration(&self, treatment_id: Uuid) -> Result<i64, SchedulingError>;
    async fn resolve_price(&self, treatment_id: Uuid) -> Result<f64, SchedulingError>;
}

#[derive(Debug, Clone)]
pub enum AppointmentEvent {
    Booked(Appointment),
    Rescheduled(Appointment),
    Cancelled(Appointment),
}

impl AppointmentEvent {
    pub fn appointment(&self) -> &Appointment {
        match self {
            AppointmentEvent::Booked(a)
            | AppointmentEvent::Rescheduled(a)
            | AppointmentEvent::Cancelled(a) => a,
        }
    }
}

/// Fire-and-forget notification sink. Implementations must swallow their own
/// failures; the booking engine never inspects the outcome.
#[async_trait]
pub trait AppointmentNotifier: Send + Sync {
    async fn dispatch(&self, event: AppointmentEvent);
}

/// Fixed in-memory treatment table, used by tests and local development.
#[derive(Debug, Default, Clone)]
pub struct StaticTreatmentDirectory {
    entries: HashMap<Uuid, (i64, f64)>,
}

impl StaticTreatmentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_treatment(mut self, treatment_id: Uuid, duration_minutes: i64, price: f64) -> Self {
        self.entries.insert(treatment_id, (duration_minutes, price));
        self
    }
}

#[async_trait]
impl TreatmentDirectory for StaticTreatmentDirectory {
    async fn resolve_duration(&self, treatment_id: Uuid) -> Result<i64, SchedulingError> {
        self.entries
            .get(&treatment_id)
            .map(|(duration, _)| *duration)
            .ok_or(SchedulingError::NotFound("treatment"))
    }

    async fn resolve_price(&self, treatment_id: Uuid) -> Result<f64, SchedulingError> {
        self.entries
            .get(&treatment_id)
            .map(|(_, price)| *price)
            .ok_or(SchedulingError::NotFound("treatment"))
    }
}

/// Notifier that only logs. Stands in wherever delivery is not configured.
#[derive(Debug, Default, Clone)]
pub struct NullNotifier;

#[async_trait]
impl AppointmentNotifier for NullNotifier {
    async fn dispatch(&self, event: AppointmentEvent) {
        debug!("Notification suppressed for appointment {}", event.appointment().id);
    }
}
