// libs/scheduling-cell/src/services/slots.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::collaborators::TreatmentDirectory;
use crate::models::SchedulingError;
use crate::services::conflict::intervals_overlap;
use crate::store::{AppointmentStore, AvailabilityStore};

/// Enumerates bookable start times for a therapist on a given day. Every call
/// recomputes from current store state; nothing is cached between calls.
pub struct FreeSlotService {
    availability: Arc<dyn AvailabilityStore>,
    appointments: Arc<dyn AppointmentStore>,
    treatments: Arc<dyn TreatmentDirectory>,
}

impl FreeSlotService {
    pub fn new(
        availability: Arc<dyn AvailabilityStore>,
        appointments: Arc<dyn AppointmentStore>,
        treatments: Arc<dyn TreatmentDirectory>,
    ) -> Self {
        Self {
            availability,
            appointments,
            treatments,
        }
    }

    /// Candidate start times stepped by `duration_minutes` from each matching
    /// window's start, keeping those that do not collide with an existing
    /// appointment. Ascending; candidates emitted by overlapping windows are
    /// not deduplicated.
    pub async fn free_slots(
        &self,
        therapist_id: Uuid,
        date: NaiveDate,
        duration_minutes: i64,
    ) -> Result<Vec<DateTime<Utc>>, SchedulingError> {
        if duration_minutes <= 0 {
            return Err(SchedulingError::InvalidRange);
        }

        let windows = self.availability.windows_for_therapist(therapist_id).await?;
        let existing = self
            .appointments
            .for_therapist_on(therapist_id, date)
            .await?;

        // Resolve every booked interval's end once up front.
        let mut durations: HashMap<Uuid, i64> = HashMap::new();
        let mut busy: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::with_capacity(existing.len());
        for appointment in &existing {
            let minutes = match durations.get(&appointment.treatment_id) {
                Some(minutes) => *minutes,
                None => {
                    let minutes = self
                        .treatments
                        .resolve_duration(appointment.treatment_id)
                        .await?;
                    durations.insert(appointment.treatment_id, minutes);
                    minutes
                }
            };
            busy.push((
                appointment.start_time,
                appointment.start_time + Duration::minutes(minutes),
            ));
        }

        let duration = Duration::minutes(duration_minutes);
        let mut slots = Vec::new();

        for window in windows.iter().filter(|w| w.matches_date(date)) {
            let window_end = date.and_time(window.end_time).and_utc();
            let mut candidate = date.and_time(window.start_time).and_utc();

            while candidate + duration <= window_end {
                let candidate_end = candidate + duration;
                let blocked = busy
                    .iter()
                    .any(|(start, end)| intervals_overlap(candidate, candidate_end, *start, *end));

                if !blocked {
                    slots.push(candidate);
                }

                candidate += duration;
            }
        }

        slots.sort();

        debug!(
            "Found {} free {}-minute slots for therapist {} on {}",
            slots.len(),
            duration_minutes,
            therapist_id,
            date
        );
        Ok(slots)
    }
}
