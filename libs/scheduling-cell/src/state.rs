// libs/scheduling-cell/src/state.rs
use std::sync::Arc;

use shared_config::AppConfig;

use crate::collaborators::{AppointmentNotifier, TreatmentDirectory};
use crate::services::availability::AvailabilityService;
use crate::services::booking::{BookingService, TherapistGates};
use crate::services::conflict::ConflictChecker;
use crate::services::slots::FreeSlotService;
use crate::store::{AppointmentStore, AvailabilityStore};

/// Process-wide scheduling state: the services plus the per-therapist gate
/// registry. Built once at startup and shared by reference; nothing in here
/// is reconstructed per request.
pub struct SchedulingState {
    pub config: Arc<AppConfig>,
    pub availability: AvailabilityService,
    pub free_slots: FreeSlotService,
    pub booking: BookingService,
}

impl SchedulingState {
    pub fn new(
        config: Arc<AppConfig>,
        availability_store: Arc<dyn AvailabilityStore>,
        appointment_store: Arc<dyn AppointmentStore>,
        treatments: Arc<dyn TreatmentDirectory>,
        notifier: Arc<dyn AppointmentNotifier>,
    ) -> Self {
        let gates = Arc::new(TherapistGates::new());

        let conflicts = ConflictChecker::new(
            Arc::clone(&availability_store),
            Arc::clone(&appointment_store),
            Arc::clone(&treatments),
        );

        let availability = AvailabilityService::new(Arc::clone(&availability_store));
        let free_slots = FreeSlotService::new(
            Arc::clone(&availability_store),
            Arc::clone(&appointment_store),
            Arc::clone(&treatments),
        );
        let booking = BookingService::new(
            appointment_store,
            treatments,
            notifier,
            conflicts,
            gates,
        );

        Self {
            config,
            availability,
            free_slots,
            booking,
        }
    }
}
