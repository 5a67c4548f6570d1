// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use crate::models::{CreateAvailabilityRequest, SchedulingError, WeeklyAvailability};
use crate::store::AvailabilityStore;

/// Manages the recurring weekly windows a therapist can be booked in.
pub struct AvailabilityService {
    store: Arc<dyn AvailabilityStore>,
}

impl AvailabilityService {
    pub fn new(store: Arc<dyn AvailabilityStore>) -> Self {
        Self { store }
    }

    /// Create a window. The weekday string is lower-cased before storage;
    /// names outside the seven canonical ones are accepted but can never
    /// match a real date.
    pub async fn add_window(
        &self,
        therapist_id: Uuid,
        request: CreateAvailabilityRequest,
    ) -> Result<WeeklyAvailability, SchedulingError> {
        if request.start_time >= request.end_time {
            return Err(SchedulingError::InvalidRange);
        }

        let window = WeeklyAvailability {
            id: Uuid::new_v4(),
            therapist_id,
            weekday: request.weekday.to_lowercase(),
            start_time: request.start_time,
            end_time: request.end_time,
            created_at: Utc::now(),
        };

        debug!(
            "Adding {} window {}-{} for therapist {}",
            window.weekday, window.start_time, window.end_time, therapist_id
        );

        self.store.insert_window(window).await
    }

    pub async fn list_windows(
        &self,
        therapist_id: Uuid,
    ) -> Result<Vec<WeeklyAvailability>, SchedulingError> {
        self.store.windows_for_therapist(therapist_id).await
    }

    /// Removing an unknown window id is a no-op.
    pub async fn remove_window(&self, window_id: Uuid) -> Result<(), SchedulingError> {
        debug!("Removing availability window {}", window_id);
        self.store.delete_window(window_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::InMemoryAvailabilityStore;
    use assert_matches::assert_matches;
    use chrono::NaiveTime;

    fn service() -> AvailabilityService {
        AvailabilityService::new(Arc::new(InMemoryAvailabilityStore::new()))
    }

    fn window_request(weekday: &str, start: (u32, u32), end: (u32, u32)) -> CreateAvailabilityRequest {
        CreateAvailabilityRequest {
            weekday: weekday.to_string(),
            start_time: NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn add_window_normalizes_weekday() {
        let service = service();
        let therapist_id = Uuid::new_v4();

        let window = service
            .add_window(therapist_id, window_request("Monday", (9, 0), (12, 0)))
            .await
            .unwrap();

        assert_eq!(window.weekday, "monday");
        assert_eq!(window.therapist_id, therapist_id);
    }

    #[tokio::test]
    async fn add_window_rejects_inverted_range() {
        let service = service();

        let result = service
            .add_window(Uuid::new_v4(), window_request("tuesday", (14, 0), (9, 0)))
            .await;

        assert_matches!(result, Err(SchedulingError::InvalidRange));
    }

    #[tokio::test]
    async fn add_window_rejects_empty_range() {
        let service = service();

        let result = service
            .add_window(Uuid::new_v4(), window_request("tuesday", (9, 0), (9, 0)))
            .await;

        assert_matches!(result, Err(SchedulingError::InvalidRange));
    }

    #[tokio::test]
    async fn windows_can_coexist_on_the_same_weekday() {
        let service = service();
        let therapist_id = Uuid::new_v4();

        service
            .add_window(therapist_id, window_request("friday", (9, 0), (12, 0)))
            .await
            .unwrap();
        service
            .add_window(therapist_id, window_request("friday", (10, 0), (14, 0)))
            .await
            .unwrap();

        let windows = service.list_windows(therapist_id).await.unwrap();
        assert_eq!(windows.len(), 2);
    }

    #[tokio::test]
    async fn remove_window_is_idempotent() {
        let service = service();
        let therapist_id = Uuid::new_v4();

        let window = service
            .add_window(therapist_id, window_request("monday", (9, 0), (12, 0)))
            .await
            .unwrap();

        service.remove_window(window.id).await.unwrap();
        // A second removal of the same id is still Ok.
        service.remove_window(window.id).await.unwrap();

        assert!(service.list_windows(therapist_id).await.unwrap().is_empty());
    }
}
