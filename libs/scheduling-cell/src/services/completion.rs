// libs/scheduling-cell/src/services/completion.rs
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::models::{Encounter, SchedulingError};
use crate::services::booking::AppointmentRegistry;
use crate::services::occupancy::RoomStateStore;

/// Releases rooms once the clinical visit they were reserved for has been
/// recorded. The appointment record itself is left untouched.
pub struct EncounterCompletionHandler {
    registry: Arc<AppointmentRegistry>,
    rooms: Arc<RoomStateStore>,
}

impl EncounterCompletionHandler {
    pub fn new(registry: Arc<AppointmentRegistry>) -> Self {
        let rooms = registry.room_state();
        Self { registry, rooms }
    }

    /// Called after an encounter has been committed for a patient/doctor
    /// pair. Frees the room of every appointment for that pair whose date is
    /// on or before the encounter date, if the room is still held by that
    /// appointment. Returns how many rooms were released; a quiet zero when
    /// nothing matches.
    pub async fn on_encounter_recorded(
        &self,
        patient_id: i64,
        doctor_id: i64,
        encounter_date: NaiveDate,
    ) -> Result<usize, SchedulingError> {
        debug!(
            "encounter recorded for patient {} with doctor {} on {}",
            patient_id, doctor_id, encounter_date
        );

        let appointments = self.registry.find_by_patient(patient_id).await?;
        let mut released = 0usize;

        for appointment in appointments {
            if appointment.doctor_id != doctor_id {
                continue;
            }
            if appointment.date_time.date_naive() > encounter_date {
                continue;
            }
            let Some(room_number) = appointment.room_number else {
                continue;
            };
            match self.rooms.holder_of(room_number).await {
                Ok(Some(holder)) if holder == appointment.id => {
                    self.rooms.free(room_number).await?;
                    released += 1;
                    info!(
                        "released room {} held by appointment {}",
                        room_number, appointment.id
                    );
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "room {} referenced by appointment {} is not in the ledger: {}",
                    room_number, appointment.id, e
                ),
            }
        }

        if released == 0 {
            debug!(
                "no occupied rooms to release for patient {} with doctor {}",
                patient_id, doctor_id
            );
        }
        Ok(released)
    }

    pub async fn handle(&self, encounter: &Encounter) -> Result<usize, SchedulingError> {
        self.on_encounter_recorded(encounter.patient_id, encounter.doctor_id, encounter.date)
            .await
    }
}
