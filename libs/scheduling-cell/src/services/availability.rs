// libs/scheduling-cell/src/services/availability.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::models::SchedulingError;
use crate::services::occupancy::RoomStateStore;
use crate::services::schedule::DoctorScheduleIndex;

/// Pure query component over the schedule index and the room ledger.
pub struct AvailabilityChecker {
    schedule: Arc<DoctorScheduleIndex>,
    rooms: Arc<RoomStateStore>,
}

impl AvailabilityChecker {
    pub fn new(schedule: Arc<DoctorScheduleIndex>, rooms: Arc<RoomStateStore>) -> Self {
        Self { schedule, rooms }
    }

    pub async fn doctor_available(&self, doctor_id: i64, at: DateTime<Utc>) -> bool {
        let available = self.schedule.is_free(doctor_id, at).await;
        debug!(
            "doctor {} at {}: {}",
            doctor_id,
            at,
            if available { "available" } else { "booked" }
        );
        available
    }

    pub async fn room_available(&self, room_number: i64) -> Result<bool, SchedulingError> {
        Ok(!self.rooms.is_occupied(room_number).await?)
    }
}
