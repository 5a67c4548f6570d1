// libs/scheduling-cell/src/services/booking.rs
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::collaborators::{AppointmentEvent, AppointmentNotifier, TreatmentDirectory};
use crate::models::{
    Appointment, BookAppointmentRequest, SchedulingError, UpdateAppointmentRequest,
};
use crate::services::conflict::ConflictChecker;
use crate::store::AppointmentStore;

/// Per-therapist mutual-exclusion gates. Booking and rescheduling are
/// check-then-act against shared schedule state; every such sequence runs
/// with its therapist's gate held, so two racing requests for the same
/// therapist serialize and the loser observes the winner's committed row.
///
/// The registry lives for the process and is shared by reference; gates are
/// created lazily on first use and never removed.
pub struct TherapistGates {
    gates: Mutex<HashMap<Uuid, Arc<AsyncMutex<()>>>>,
}

impl TherapistGates {
    pub fn new() -> Self {
        Self {
            gates: Mutex::new(HashMap::new()),
        }
    }

    pub async fn acquire(&self, therapist_id: Uuid) -> OwnedMutexGuard<()> {
        let gate = {
            let mut gates = self.gates.lock().expect("therapist gate registry poisoned");
            Arc::clone(
                gates
                    .entry(therapist_id)
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        gate.lock_owned().await
    }
}

impl Default for TherapistGates {
    fn default() -> Self {
        Self::new()
    }
}

/// The booking engine: validates and commits appointment writes atomically
/// with respect to other requests for the same therapist.
pub struct BookingService {
    appointments: Arc<dyn AppointmentStore>,
    treatments: Arc<dyn TreatmentDirectory>,
    notifier: Arc<dyn AppointmentNotifier>,
    conflicts: ConflictChecker,
    gates: Arc<TherapistGates>,
}

impl BookingService {
    pub fn new(
        appointments: Arc<dyn AppointmentStore>,
        treatments: Arc<dyn TreatmentDirectory>,
        notifier: Arc<dyn AppointmentNotifier>,
        conflicts: ConflictChecker,
        gates: Arc<TherapistGates>,
    ) -> Self {
        Self {
            appointments,
            treatments,
            notifier,
            conflicts,
            gates,
        }
    }

    #[instrument(skip(self, request), fields(therapist_id = %request.therapist_id))]
    pub async fn create_appointment(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let duration = self.treatments.resolve_duration(request.treatment_id).await?;

        let start = request.start_time;
        let end = start + Duration::minutes(duration);

        // Check and insert under the therapist's gate.
        let _gate = self.gates.acquire(request.therapist_id).await;

        self.conflicts
            .ensure_within_availability(request.therapist_id, start, end)
            .await?;
        self.conflicts
            .ensure_no_overlap(request.therapist_id, start, end, None)
            .await?;

        let now = Utc::now();
        let appointment = Appointment {
            id: Uuid::new_v4(),
            patient_id: request.patient_id,
            therapist_id: request.therapist_id,
            treatment_id: request.treatment_id,
            start_time: start,
            notes: request.notes,
            created_at: now,
            updated_at: now,
        };

        let stored = self.appointments.insert(appointment).await?;
        drop(_gate);

        info!(
            "Appointment {} booked for therapist {} at {}",
            stored.id, stored.therapist_id, stored.start_time
        );
        self.dispatch(AppointmentEvent::Booked(stored.clone()));

        Ok(stored)
    }

    /// Notes-only changes commit unconditionally. A start-time change re-runs
    /// the conflict checks under the therapist gate, excluding the
    /// appointment's own row from the overlap scan. `allow_override` bypasses
    /// the overlap predicate only; availability containment always holds.
    #[instrument(skip(self, changes), fields(appointment_id = %appointment_id))]
    pub async fn update_appointment(
        &self,
        appointment_id: Uuid,
        changes: UpdateAppointmentRequest,
        allow_override: bool,
    ) -> Result<Appointment, SchedulingError> {
        let mut current = self
            .appointments
            .get(appointment_id)
            .await?
            .ok_or(SchedulingError::NotFound("appointment"))?;

        let Some(new_start) = changes.start_time else {
            if let Some(notes) = changes.notes {
                current.notes = Some(notes);
            }
            current.updated_at = Utc::now();
            return self.appointments.update(&current).await;
        };

        let duration = self.treatments.resolve_duration(current.treatment_id).await?;
        let new_end = new_start + Duration::minutes(duration);

        let _gate = self.gates.acquire(current.therapist_id).await;

        self.conflicts
            .ensure_within_availability(current.therapist_id, new_start, new_end)
            .await?;

        if allow_override {
            warn!(
                "Overlap check bypassed by override while rescheduling appointment {}",
                current.id
            );
        } else {
            self.conflicts
                .ensure_no_overlap(current.therapist_id, new_start, new_end, Some(current.id))
                .await?;
        }

        current.start_time = new_start;
        if let Some(notes) = changes.notes {
            current.notes = Some(notes);
        }
        current.updated_at = Utc::now();

        let updated = self.appointments.update(&current).await?;
        drop(_gate);

        info!(
            "Appointment {} rescheduled to {}",
            updated.id, updated.start_time
        );
        self.dispatch(AppointmentEvent::Rescheduled(updated.clone()));

        Ok(updated)
    }

    pub async fn get_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, SchedulingError> {
        self.appointments
            .get(appointment_id)
            .await?
            .ok_or(SchedulingError::NotFound("appointment"))
    }

    /// Cancellation removes the record. Cancelling an id that is not stored
    /// (including a second cancellation of the same id) is a not-found error.
    #[instrument(skip(self))]
    pub async fn cancel_appointment(
        &self,
        appointment_id: Uuid,
    ) -> Result<Appointment, SchedulingError> {
        let current = self
            .appointments
            .get(appointment_id)
            .await?
            .ok_or(SchedulingError::NotFound("appointment"))?;

        if !self.appointments.delete(appointment_id).await? {
            return Err(SchedulingError::NotFound("appointment"));
        }

        info!("Appointment {} cancelled", appointment_id);
        self.dispatch(AppointmentEvent::Cancelled(current.clone()));

        Ok(current)
    }

    pub async fn appointments_for_patient(
        &self,
        patient_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.appointments.for_patient(patient_id).await
    }

    pub async fn appointments_for_therapist(
        &self,
        therapist_id: Uuid,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        self.appointments.for_therapist(therapist_id).await
    }

    pub async fn all_appointments(&self) -> Result<Vec<Appointment>, SchedulingError> {
        self.appointments.all().await
    }

    /// Notification happens outside the transactional boundary; a failed or
    /// slow dispatch never affects the committed booking.
    fn dispatch(&self, event: AppointmentEvent) {
        let notifier = Arc::clone(&self.notifier);
        debug!(
            "Dispatching notification for appointment {}",
            event.appointment().id
        );
        tokio::spawn(async move {
            notifier.dispatch(event).await;
        });
    }
}
