// libs/scheduling-cell/src/services/schedule.rs
use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use shared_utils::time::truncate_to_minute;

use crate::models::SchedulingError;

/// Per-doctor index of booked slots. A slot is an exact minute-precision
/// instant; two bookings conflict only when their timestamps are identical.
pub struct DoctorScheduleIndex {
    slots: RwLock<HashMap<i64, HashMap<DateTime<Utc>, i64>>>,
}

impl DoctorScheduleIndex {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }

    /// Reserve a slot for an appointment. Re-reserving a slot already held
    /// by the same appointment is a silent no-op.
    pub async fn reserve(
        &self,
        doctor_id: i64,
        at: DateTime<Utc>,
        appointment_id: i64,
    ) -> Result<(), SchedulingError> {
        let at = truncate_to_minute(at);
        let mut slots = self.slots.write().await;
        let schedule = slots.entry(doctor_id).or_default();
        match schedule.get(&at) {
            Some(&existing) if existing != appointment_id => Err(SchedulingError::SlotTaken {
                doctor_id,
                date_time: at,
            }),
            _ => {
                schedule.insert(at, appointment_id);
                debug!(
                    "reserved slot {} for doctor {} (appointment {})",
                    at, doctor_id, appointment_id
                );
                Ok(())
            }
        }
    }

    /// Release a slot. Idempotent.
    pub async fn release(&self, doctor_id: i64, at: DateTime<Utc>) {
        let at = truncate_to_minute(at);
        if let Some(schedule) = self.slots.write().await.get_mut(&doctor_id) {
            if schedule.remove(&at).is_some() {
                debug!("released slot {} for doctor {}", at, doctor_id);
            }
        }
    }

    pub async fn is_free(&self, doctor_id: i64, at: DateTime<Utc>) -> bool {
        let at = truncate_to_minute(at);
        self.slots
            .read()
            .await
            .get(&doctor_id)
            .map_or(true, |schedule| !schedule.contains_key(&at))
    }

    /// All booked slots for a doctor, ordered by time.
    pub async fn booked_slots(&self, doctor_id: i64) -> Vec<(DateTime<Utc>, i64)> {
        let slots = self.slots.read().await;
        let mut booked: Vec<(DateTime<Utc>, i64)> = slots
            .get(&doctor_id)
            .map(|schedule| schedule.iter().map(|(at, id)| (*at, *id)).collect())
            .unwrap_or_default();
        booked.sort_by_key(|(at, _)| *at);
        booked
    }
}

impl Default for DoctorScheduleIndex {
    fn default() -> Self {
        Self::new()
    }
}
