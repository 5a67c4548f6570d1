// libs/scheduling-cell/src/services/conflict.rs
use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::collaborators::TreatmentDirectory;
use crate::models::{weekday_name, SchedulingError, WeeklyAvailability};
use crate::store::{AppointmentStore, AvailabilityStore};

/// Half-open interval intersection: touching endpoints do not overlap.
pub fn intervals_overlap(
    start1: DateTime<Utc>,
    end1: DateTime<Utc>,
    start2: DateTime<Utc>,
    end2: DateTime<Utc>,
) -> bool {
    start1 < end2 && start2 < end1
}

/// Whether a window fully contains `[start, end)`. Both instants must fall on
/// the window's weekday; intervals reaching past midnight never qualify.
pub fn window_covers(
    window: &WeeklyAvailability,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
) -> bool {
    start.date_naive() == end.date_naive()
        && window.weekday == weekday_name(start.weekday())
        && window.start_time <= start.time()
        && end.time() <= window.end_time
}

/// Decides whether a proposed interval is legal for a therapist: covered by
/// some weekly window, and free of overlap with every other active
/// appointment. Both checks read the stores directly; the booking engine is
/// responsible for making read-check-write atomic.
pub struct ConflictChecker {
    availability: Arc<dyn AvailabilityStore>,
    appointments: Arc<dyn AppointmentStore>,
    treatments: Arc<dyn TreatmentDirectory>,
}

impl ConflictChecker {
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

    pub async fn ensure_within_availability(
        &self,
        therapist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<(), SchedulingError> {
        let windows = self.availability.windows_for_therapist(therapist_id).await?;

        if windows.iter().any(|w| window_covers(w, start, end)) {
            Ok(())
        } else {
            debug!(
                "No {} window of therapist {} covers {} - {}",
                weekday_name(start.weekday()),
                therapist_id,
                start,
                end
            );
            Err(SchedulingError::OutsideAvailability)
        }
    }

    pub async fn ensure_no_overlap(
        &self,
        therapist_id: Uuid,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        exclude_appointment_id: Option<Uuid>,
    ) -> Result<(), SchedulingError> {
        let existing = self
            .appointments
            .for_therapist_on(therapist_id, start.date_naive())
            .await?;

        // Durations are resolved fresh per check; the memo only spans this call.
        let mut durations: HashMap<Uuid, i64> = HashMap::new();

        for other in existing {
            if exclude_appointment_id == Some(other.id) {
                continue;
            }

            let minutes = match durations.get(&other.treatment_id) {
                Some(minutes) => *minutes,
                None => {
                    let minutes = self.treatments.resolve_duration(other.treatment_id).await?;
                    durations.insert(other.treatment_id, minutes);
                    minutes
                }
            };

            let other_end = other.start_time + Duration::minutes(minutes);
            if intervals_overlap(start, end, other.start_time, other_end) {
                warn!(
                    "Conflict for therapist {}: requested {} - {} collides with appointment {}",
                    therapist_id, start, end, other.id
                );
                return Err(SchedulingError::SlotConflict {
                    appointment_id: other.id,
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, TimeZone};

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn monday_window(start: (u32, u32), end: (u32, u32)) -> WeeklyAvailability {
        WeeklyAvailability {
            id: Uuid::new_v4(),
            therapist_id: Uuid::new_v4(),
            weekday: "monday".to_string(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            created_at: Utc::now(),
        }
    }

    // 2025-06-02 is a Monday.

    #[test]
    fn touching_intervals_do_not_overlap() {
        let a_start = utc(2025, 6, 2, 9, 0);
        let a_end = utc(2025, 6, 2, 10, 0);
        let b_start = utc(2025, 6, 2, 10, 0);
        let b_end = utc(2025, 6, 2, 11, 0);

        assert!(!intervals_overlap(a_start, a_end, b_start, b_end));
        assert!(!intervals_overlap(b_start, b_end, a_start, a_end));
    }

    #[test]
    fn nested_and_partial_intervals_overlap() {
        let a_start = utc(2025, 6, 2, 9, 0);
        let a_end = utc(2025, 6, 2, 10, 0);

        // Partial overlap from the right.
        assert!(intervals_overlap(
            a_start,
            a_end,
            utc(2025, 6, 2, 9, 30),
            utc(2025, 6, 2, 10, 30)
        ));
        // Fully nested.
        assert!(intervals_overlap(
            a_start,
            a_end,
            utc(2025, 6, 2, 9, 15),
            utc(2025, 6, 2, 9, 45)
        ));
    }

    #[test]
    fn window_covers_exact_bounds() {
        let window = monday_window((9, 0), (10, 0));

        assert!(window_covers(
            &window,
            utc(2025, 6, 2, 9, 0),
            utc(2025, 6, 2, 10, 0)
        ));
    }

    #[test]
    fn window_rejects_interval_past_its_end() {
        let window = monday_window((9, 0), (10, 0));

        assert!(!window_covers(
            &window,
            utc(2025, 6, 2, 9, 30),
            utc(2025, 6, 2, 10, 30)
        ));
    }

    #[test]
    fn window_rejects_wrong_weekday() {
        let window = monday_window((9, 0), (17, 0));

        // 2025-06-03 is a Tuesday.
        assert!(!window_covers(
            &window,
            utc(2025, 6, 3, 9, 0),
            utc(2025, 6, 3, 10, 0)
        ));
    }

    #[test]
    fn window_rejects_midnight_spanning_interval() {
        let window = monday_window((9, 0), (23, 59));

        // Ends at 00:00 the next day; the interval leaves Monday.
        assert!(!window_covers(
            &window,
            utc(2025, 6, 2, 23, 30),
            utc(2025, 6, 3, 0, 0)
        ));
    }
}
