use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, TimeZone, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use scheduling_cell::collaborators::{
    AppointmentEvent, AppointmentNotifier, NullNotifier, StaticTreatmentDirectory,
};
use scheduling_cell::models::{
    BookAppointmentRequest, CreateAvailabilityRequest, SchedulingError, UpdateAppointmentRequest,
};
use scheduling_cell::state::SchedulingState;
use scheduling_cell::store::memory::{InMemoryAppointmentStore, InMemoryAvailabilityStore};
use shared_utils::test_utils::TestConfig;

// 2025-06-02 is a Monday; every fixture books against it.
fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
}

struct Harness {
    state: Arc<SchedulingState>,
    therapist_id: Uuid,
    patient_id: Uuid,
    treatment_id: Uuid,
}

impl Harness {
    /// Therapist with a Monday 09:00-17:00 window and one 30-minute treatment.
    async fn new() -> Self {
        Self::with_notifier(Arc::new(NullNotifier)).await
    }

    async fn with_notifier(notifier: Arc<dyn AppointmentNotifier>) -> Self {
        let therapist_id = Uuid::new_v4();
        let treatment_id = Uuid::new_v4();

        let treatments =
            Arc::new(StaticTreatmentDirectory::new().with_treatment(treatment_id, 30, 45.0));

        let state = Arc::new(SchedulingState::new(
            TestConfig::default().to_arc(),
            Arc::new(InMemoryAvailabilityStore::new()),
            Arc::new(InMemoryAppointmentStore::new()),
            treatments,
            notifier,
        ));

        state
            .availability
            .add_window(
                therapist_id,
                CreateAvailabilityRequest {
                    weekday: "Monday".to_string(),
                    start_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                    end_time: NaiveTime::from_hms_opt(17, 0, 0).unwrap(),
                },
            )
            .await
            .unwrap();

        Self {
            state,
            therapist_id,
            patient_id: Uuid::new_v4(),
            treatment_id,
        }
    }

    fn booking_at(&self, start: DateTime<Utc>) -> BookAppointmentRequest {
        BookAppointmentRequest {
            patient_id: self.patient_id,
            therapist_id: self.therapist_id,
            treatment_id: self.treatment_id,
            start_time: start,
            notes: None,
        }
    }
}

#[tokio::test]
async fn booking_within_availability_succeeds() {
    let harness = Harness::new().await;

    let appointment = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(10, 0)))
        .await
        .unwrap();

    assert_eq!(appointment.start_time, monday_at(10, 0));
    assert_eq!(appointment.therapist_id, harness.therapist_id);
}

#[tokio::test]
async fn booking_outside_window_hours_is_rejected() {
    let harness = Harness::new().await;

    // 16:45 + 30 minutes runs past the 17:00 window end.
    let result = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(16, 45)))
        .await;

    assert_matches!(result, Err(SchedulingError::OutsideAvailability));
}

#[tokio::test]
async fn booking_on_a_day_without_windows_is_rejected() {
    let harness = Harness::new().await;

    // 2025-06-03 is a Tuesday; the therapist only works Mondays.
    let tuesday = Utc.with_ymd_and_hms(2025, 6, 3, 10, 0, 0).unwrap();
    let result = harness
        .state
        .booking
        .create_appointment(harness.booking_at(tuesday))
        .await;

    assert_matches!(result, Err(SchedulingError::OutsideAvailability));
}

#[tokio::test]
async fn overlapping_booking_is_rejected_with_colliding_id() {
    let harness = Harness::new().await;

    let first = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(10, 0)))
        .await
        .unwrap();

    let result = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(10, 15)))
        .await;

    assert_matches!(
        result,
        Err(SchedulingError::SlotConflict { appointment_id }) if appointment_id == first.id
    );
}

#[tokio::test]
async fn touching_appointments_are_both_accepted() {
    let harness = Harness::new().await;

    harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(9, 30)))
        .await
        .unwrap();

    // Starts exactly where the first one ends.
    let second = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(10, 0)))
        .await;

    assert!(second.is_ok());
}

#[tokio::test]
async fn unknown_treatment_rejects_the_booking() {
    let harness = Harness::new().await;

    let request = BookAppointmentRequest {
        treatment_id: Uuid::new_v4(),
        ..harness.booking_at(monday_at(10, 0))
    };
    let result = harness.state.booking.create_appointment(request).await;

    assert_matches!(result, Err(SchedulingError::NotFound("treatment")));
}

#[tokio::test]
async fn notes_only_update_leaves_start_time_alone() {
    let harness = Harness::new().await;

    let appointment = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(11, 0)))
        .await
        .unwrap();

    let updated = harness
        .state
        .booking
        .update_appointment(
            appointment.id,
            UpdateAppointmentRequest {
                start_time: None,
                notes: Some("Bring previous scans".to_string()),
                allow_override: None,
            },
            false,
        )
        .await
        .unwrap();

    assert_eq!(updated.start_time, monday_at(11, 0));
    assert_eq!(updated.notes.as_deref(), Some("Bring previous scans"));
}

#[tokio::test]
async fn reschedule_onto_busy_slot_fails_without_override_and_succeeds_with_it() {
    let harness = Harness::new().await;

    // Existing appointment 09:00-09:30, and a second one at 13:00.
    harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(9, 0)))
        .await
        .unwrap();
    let movable = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(13, 0)))
        .await
        .unwrap();

    let move_into_conflict = UpdateAppointmentRequest {
        start_time: Some(monday_at(9, 15)),
        notes: None,
        allow_override: None,
    };

    let denied = harness
        .state
        .booking
        .update_appointment(movable.id, move_into_conflict.clone(), false)
        .await;
    assert_matches!(denied, Err(SchedulingError::SlotConflict { .. }));

    let overridden = harness
        .state
        .booking
        .update_appointment(movable.id, move_into_conflict, true)
        .await
        .unwrap();
    assert_eq!(overridden.start_time, monday_at(9, 15));

    // The store reflects the override.
    let stored = harness
        .state
        .booking
        .get_appointment(movable.id)
        .await
        .unwrap();
    assert_eq!(stored.start_time, monday_at(9, 15));
}

#[tokio::test]
async fn override_does_not_bypass_availability() {
    let harness = Harness::new().await;

    let appointment = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(10, 0)))
        .await
        .unwrap();

    // 20:00 is outside the 09:00-17:00 window; the override only waives the
    // overlap predicate.
    let result = harness
        .state
        .booking
        .update_appointment(
            appointment.id,
            UpdateAppointmentRequest {
                start_time: Some(monday_at(20, 0)),
                notes: None,
                allow_override: Some(true),
            },
            true,
        )
        .await;

    assert_matches!(result, Err(SchedulingError::OutsideAvailability));
}

#[tokio::test]
async fn reschedule_ignores_the_appointments_own_interval() {
    let harness = Harness::new().await;

    let appointment = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(9, 0)))
        .await
        .unwrap();

    // 09:10-09:40 overlaps only the appointment's own current slot.
    let updated = harness
        .state
        .booking
        .update_appointment(
            appointment.id,
            UpdateAppointmentRequest {
                start_time: Some(monday_at(9, 10)),
                notes: None,
                allow_override: None,
            },
            false,
        )
        .await
        .unwrap();

    assert_eq!(updated.start_time, monday_at(9, 10));
}

#[tokio::test]
async fn failed_reschedule_leaves_stored_appointment_untouched() {
    let harness = Harness::new().await;

    harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(9, 0)))
        .await
        .unwrap();
    let movable = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(13, 0)))
        .await
        .unwrap();

    let _ = harness
        .state
        .booking
        .update_appointment(
            movable.id,
            UpdateAppointmentRequest {
                start_time: Some(monday_at(9, 15)),
                notes: Some("should not stick".to_string()),
                allow_override: None,
            },
            false,
        )
        .await;

    let stored = harness
        .state
        .booking
        .get_appointment(movable.id)
        .await
        .unwrap();
    assert_eq!(stored.start_time, monday_at(13, 0));
    assert_eq!(stored.notes, None);
}

#[tokio::test]
async fn cancelling_twice_reports_not_found() {
    let harness = Harness::new().await;

    let appointment = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(14, 0)))
        .await
        .unwrap();

    harness
        .state
        .booking
        .cancel_appointment(appointment.id)
        .await
        .unwrap();

    let second = harness.state.booking.cancel_appointment(appointment.id).await;
    assert_matches!(second, Err(SchedulingError::NotFound("appointment")));

    // The slot is free again.
    let rebooked = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(14, 0)))
        .await;
    assert!(rebooked.is_ok());
}

#[tokio::test]
async fn concurrent_bookings_for_the_same_slot_admit_exactly_one() {
    let harness = Harness::new().await;
    let state = Arc::clone(&harness.state);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let state = Arc::clone(&state);
        let request = harness.booking_at(monday_at(10, 0));
        tasks.push(tokio::spawn(async move {
            state.booking.create_appointment(request).await
        }));
    }

    let mut successes = 0;
    let mut conflicts = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(SchedulingError::SlotConflict { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error under contention: {other:?}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(conflicts, 7);

    // The committed schedule holds a single appointment.
    let stored = harness
        .state
        .booking
        .appointments_for_therapist(harness.therapist_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn concurrent_partially_overlapping_bookings_never_double_book() {
    let harness = Harness::new().await;
    let state = Arc::clone(&harness.state);

    // Every pair of these 30-minute intervals intersects some other.
    let starts = [
        monday_at(10, 0),
        monday_at(10, 15),
        monday_at(10, 29),
        monday_at(9, 45),
    ];

    let mut tasks = Vec::new();
    for start in starts {
        let state = Arc::clone(&state);
        let request = harness.booking_at(start);
        tasks.push(tokio::spawn(async move {
            state.booking.create_appointment(request).await
        }));
    }
    for task in tasks {
        let _ = task.await.unwrap();
    }

    // Whatever subset won, no two stored intervals may intersect.
    let stored = harness
        .state
        .booking
        .appointments_for_therapist(harness.therapist_id)
        .await
        .unwrap();
    for a in &stored {
        for b in &stored {
            if a.id == b.id {
                continue;
            }
            let a_end = a.end_time(30);
            let b_end = b.end_time(30);
            assert!(
                a.start_time >= b_end || b.start_time >= a_end,
                "appointments {} and {} overlap",
                a.id,
                b.id
            );
        }
    }
}

struct RecordingNotifier {
    events: mpsc::UnboundedSender<AppointmentEvent>,
}

#[async_trait]
impl AppointmentNotifier for RecordingNotifier {
    async fn dispatch(&self, event: AppointmentEvent) {
        let _ = self.events.send(event);
    }
}

#[tokio::test]
async fn booking_dispatches_a_notification() {
    let (sender, mut receiver) = mpsc::unbounded_channel();
    let harness = Harness::with_notifier(Arc::new(RecordingNotifier { events: sender })).await;

    let appointment = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(10, 0)))
        .await
        .unwrap();

    let event = tokio::time::timeout(std::time::Duration::from_secs(1), receiver.recv())
        .await
        .expect("notification was never dispatched")
        .unwrap();

    assert_matches!(event, AppointmentEvent::Booked(a) if a.id == appointment.id);
}

struct ExplodingNotifier;

#[async_trait]
impl AppointmentNotifier for ExplodingNotifier {
    async fn dispatch(&self, _event: AppointmentEvent) {
        panic!("notification channel down");
    }
}

#[tokio::test]
async fn notifier_failure_never_fails_the_booking() {
    let harness = Harness::with_notifier(Arc::new(ExplodingNotifier)).await;

    let result = harness
        .state
        .booking
        .create_appointment(harness.booking_at(monday_at(10, 0)))
        .await;

    assert!(result.is_ok());

    // The committed row survives the notifier blowing up.
    let stored = harness
        .state
        .booking
        .appointments_for_therapist(harness.therapist_id)
        .await
        .unwrap();
    assert_eq!(stored.len(), 1);
}
