// libs/scheduling-cell/src/services/booking.rs
use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use directory_cell::services::{DoctorDirectory, PatientDirectory, RoomDirectory};
use shared_database::store::{AppointmentChanges, AppointmentRecord, AppointmentStore, NewAppointment};
use shared_utils::time::truncate_to_minute;

use crate::models::{Appointment, BookAppointmentRequest, SchedulingError, UpdateAppointmentRequest};
use crate::services::availability::AvailabilityChecker;
use crate::services::occupancy::RoomStateStore;
use crate::services::schedule::DoctorScheduleIndex;

/// Owns the appointment collection. Every mutation is an atomic
/// check-then-reserve: either the record, the doctor slot and the room
/// occupancy all change together, or none of them do.
pub struct AppointmentRegistry {
    store: Arc<dyn AppointmentStore>,
    patients: Arc<dyn PatientDirectory>,
    doctors: Arc<dyn DoctorDirectory>,
    room_directory: Arc<dyn RoomDirectory>,
    rooms: Arc<RoomStateStore>,
    schedule: Arc<DoctorScheduleIndex>,
    availability: AvailabilityChecker,
    write_lock: Mutex<()>,
}

impl AppointmentRegistry {
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        patients: Arc<dyn PatientDirectory>,
        doctors: Arc<dyn DoctorDirectory>,
        room_directory: Arc<dyn RoomDirectory>,
    ) -> Self {
        let rooms = Arc::new(RoomStateStore::new());
        let schedule = Arc::new(DoctorScheduleIndex::new());
        let availability = AvailabilityChecker::new(Arc::clone(&schedule), Arc::clone(&rooms));

        Self {
            store,
            patients,
            doctors,
            room_directory,
            rooms,
            schedule,
            availability,
            write_lock: Mutex::new(()),
        }
    }

    /// The room occupancy ledger, shared with the encounter completion
    /// handler. Never hand this to presentation-layer code.
    pub fn room_state(&self) -> Arc<RoomStateStore> {
        Arc::clone(&self.rooms)
    }

    pub fn schedule_index(&self) -> Arc<DoctorScheduleIndex> {
        Arc::clone(&self.schedule)
    }

    /// Rebuild the in-memory indexes from the room directory and the
    /// appointment store. Rooms flagged occupied get their holder resolved
    /// from the appointment that references them; a flag nobody claims is
    /// treated as stale and the room stays free.
    pub async fn hydrate(&self) -> Result<(), SchedulingError> {
        let _guard = self.write_lock.lock().await;
        info!("hydrating scheduling state from the room directory and appointment store");

        let mut seeded_occupied = HashSet::new();
        let listed = self
            .room_directory
            .list_rooms()
            .await
            .map_err(|e| SchedulingError::Directory(e.to_string()))?;
        for room in listed {
            self.rooms.register(room.room_number).await;
            if room.is_occupied {
                seeded_occupied.insert(room.room_number);
            }
        }

        let records = self
            .store
            .list_all()
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        for record in &records {
            if let Err(e) = self
                .schedule
                .reserve(record.doctor_id, record.date_time, record.id)
                .await
            {
                warn!("skipping appointment {} while hydrating: {}", record.id, e);
                continue;
            }
            let Some(room_number) = record.room_number else {
                continue;
            };
            if !seeded_occupied.contains(&room_number) {
                continue;
            }
            if let Err(e) = self.rooms.occupy(room_number, record.id).await {
                warn!(
                    "could not attach room {} to appointment {}: {}",
                    room_number, record.id, e
                );
            }
        }

        for room_number in seeded_occupied {
            if let Ok(false) = self.rooms.is_occupied(room_number).await {
                warn!(
                    "room {} flagged occupied but no appointment references it, leaving free",
                    room_number
                );
            }
        }

        info!("hydrated {} appointments", records.len());
        Ok(())
    }

    /// Book an appointment. Checks the doctor slot and the room, persists
    /// the record, then reserves both resources with the generated id as
    /// holder. Fails without side effects when either is unavailable.
    pub async fn create(
        &self,
        request: BookAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let _guard = self.write_lock.lock().await;
        info!(
            "booking appointment for patient {} with doctor {}",
            request.patient_id, request.doctor_id
        );

        if request.reason.trim().is_empty() {
            return Err(SchedulingError::Validation(
                "reason must not be empty".to_string(),
            ));
        }
        let date_time = truncate_to_minute(request.date_time);

        self.verify_patient(request.patient_id).await?;
        self.verify_doctor(request.doctor_id).await?;

        if !self
            .availability
            .doctor_available(request.doctor_id, date_time)
            .await
        {
            warn!(
                "doctor {} already booked at {}, rejecting",
                request.doctor_id, date_time
            );
            return Err(SchedulingError::SlotTaken {
                doctor_id: request.doctor_id,
                date_time,
            });
        }
        if let Some(room_number) = request.room_number {
            self.ensure_room_free(room_number).await?;
        }

        // Persist first: a storage failure must leave both leaves untouched.
        let record = self
            .store
            .insert(NewAppointment {
                patient_id: request.patient_id,
                doctor_id: request.doctor_id,
                room_number: request.room_number,
                date_time,
                reason: request.reason,
            })
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;

        if let Err(e) = self
            .schedule
            .reserve(record.doctor_id, record.date_time, record.id)
            .await
        {
            self.discard_row(record.id).await;
            return Err(e);
        }
        if let Some(room_number) = record.room_number {
            if let Err(e) = self.rooms.occupy(room_number, record.id).await {
                self.schedule.release(record.doctor_id, record.date_time).await;
                self.discard_row(record.id).await;
                return Err(e);
            }
        }

        info!(
            "appointment {} booked for patient {} with doctor {} at {}",
            record.id, record.patient_id, record.doctor_id, record.date_time
        );
        Ok(record.into())
    }

    /// Update an appointment in place. A changed timestamp or room releases
    /// the old reservation before the new slot is checked; any failure rolls
    /// the release back so it is never observable.
    pub async fn update(
        &self,
        id: i64,
        request: UpdateAppointmentRequest,
    ) -> Result<Appointment, SchedulingError> {
        let _guard = self.write_lock.lock().await;
        debug!("updating appointment {}", id);

        let current = self
            .store
            .get(id)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?
            .ok_or(SchedulingError::AppointmentNotFound(id))?;

        if let Some(reason) = &request.new_reason {
            if reason.trim().is_empty() {
                return Err(SchedulingError::Validation(
                    "reason must not be empty".to_string(),
                ));
            }
        }

        let new_date_time = request.new_date_time.map(truncate_to_minute);
        let time_changed = new_date_time.is_some_and(|t| t != current.date_time);
        let room_changed = request
            .new_room_number
            .is_some_and(|r| Some(r) != current.room_number);

        let changes = AppointmentChanges {
            date_time: new_date_time,
            room_number: if room_changed {
                request.new_room_number
            } else {
                None
            },
            reason: request.new_reason,
        };
        if changes.is_empty() {
            return Ok(current.into());
        }
        if !time_changed && !room_changed {
            // Notes-only update, no reservation work.
            return self.persist_update(id, changes).await;
        }

        let target_time = new_date_time.unwrap_or(current.date_time);
        let held_room = match current.room_number {
            Some(room) => (self.rooms.holder_of(room).await? == Some(id)).then_some(room),
            None => None,
        };

        // Release the old reservations before checking the new slot.
        if time_changed {
            self.schedule.release(current.doctor_id, current.date_time).await;
        }
        if room_changed {
            if let Some(room) = held_room {
                self.rooms.free(room).await?;
            }
        }

        if time_changed
            && !self
                .availability
                .doctor_available(current.doctor_id, target_time)
                .await
        {
            self.restore_reservations(&current, held_room, time_changed, room_changed)
                .await;
            return Err(SchedulingError::SlotTaken {
                doctor_id: current.doctor_id,
                date_time: target_time,
            });
        }
        if room_changed {
            if let Some(room) = request.new_room_number {
                if let Err(e) = self.ensure_room_free(room).await {
                    self.restore_reservations(&current, held_room, time_changed, room_changed)
                        .await;
                    return Err(e);
                }
            }
        }

        // Apply the new reservations.
        if time_changed {
            if let Err(e) = self.schedule.reserve(current.doctor_id, target_time, id).await {
                self.restore_reservations(&current, held_room, time_changed, room_changed)
                    .await;
                return Err(e);
            }
        }
        if room_changed {
            if let Some(room) = request.new_room_number {
                if let Err(e) = self.rooms.occupy(room, id).await {
                    if time_changed {
                        self.schedule.release(current.doctor_id, target_time).await;
                    }
                    self.restore_reservations(&current, held_room, time_changed, room_changed)
                        .await;
                    return Err(e);
                }
            }
        }

        match self.persist_update(id, changes).await {
            Ok(updated) => {
                info!("appointment {} updated", id);
                Ok(updated)
            }
            Err(e) => {
                if time_changed {
                    self.schedule.release(current.doctor_id, target_time).await;
                }
                if room_changed {
                    if let Some(room) = request.new_room_number {
                        if let Err(free_err) = self.rooms.free(room).await {
                            warn!("failed to release room {} after a storage error: {}", room, free_err);
                        }
                    }
                }
                self.restore_reservations(&current, held_room, time_changed, room_changed)
                    .await;
                Err(e)
            }
        }
    }

    /// Delete an appointment, releasing the doctor slot and freeing the room
    /// if it is still held by this appointment. False for unknown ids.
    pub async fn delete(&self, id: i64) -> Result<bool, SchedulingError> {
        let _guard = self.write_lock.lock().await;
        debug!("deleting appointment {}", id);

        let Some(record) = self
            .store
            .get(id)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?
        else {
            return Ok(false);
        };

        // Remove the row first: a storage failure leaves both leaves as-is.
        let deleted = self
            .store
            .delete(id)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        if !deleted {
            return Ok(false);
        }

        self.schedule.release(record.doctor_id, record.date_time).await;
        if let Some(room_number) = record.room_number {
            match self.rooms.holder_of(room_number).await {
                Ok(Some(holder)) if holder == id => {
                    self.rooms.free(room_number).await?;
                }
                Ok(_) => {}
                Err(e) => warn!(
                    "room {} referenced by deleted appointment {} is not in the ledger: {}",
                    room_number, id, e
                ),
            }
        }

        info!("appointment {} deleted", id);
        Ok(true)
    }

    // ==============================================================================
    // READ QUERIES
    // ==============================================================================

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Appointment>, SchedulingError> {
        let record = self
            .store
            .get(id)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        Ok(record.map(Appointment::from))
    }

    pub async fn find_all(&self) -> Result<Vec<Appointment>, SchedulingError> {
        let records = self
            .store
            .list_all()
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        Ok(records.into_iter().map(Appointment::from).collect())
    }

    pub async fn find_by_patient(
        &self,
        patient_id: i64,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let records = self
            .store
            .find_by_patient(patient_id)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        Ok(records.into_iter().map(Appointment::from).collect())
    }

    pub async fn find_by_doctor(
        &self,
        doctor_id: i64,
    ) -> Result<Vec<Appointment>, SchedulingError> {
        let records = self
            .store
            .find_by_doctor(doctor_id)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        Ok(records.into_iter().map(Appointment::from).collect())
    }

    /// Appointments on the given calendar day, sorted by timestamp.
    pub async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<Appointment>, SchedulingError> {
        let records = self
            .store
            .find_by_date(date)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?;
        let mut appointments: Vec<Appointment> =
            records.into_iter().map(Appointment::from).collect();
        appointments.sort_by_key(|a| a.date_time);
        Ok(appointments)
    }

    pub async fn is_doctor_available(&self, doctor_id: i64, at: DateTime<Utc>) -> bool {
        self.availability.doctor_available(doctor_id, at).await
    }

    // ==============================================================================
    // PRIVATE HELPER METHODS
    // ==============================================================================

    async fn verify_patient(&self, patient_id: i64) -> Result<(), SchedulingError> {
        let found = self
            .patients
            .lookup_by_id(patient_id)
            .await
            .map_err(|e| SchedulingError::Directory(e.to_string()))?;
        if found.is_none() {
            return Err(SchedulingError::PatientNotFound(patient_id));
        }
        Ok(())
    }

    async fn verify_doctor(&self, doctor_id: i64) -> Result<(), SchedulingError> {
        let found = self
            .doctors
            .lookup_by_id(doctor_id)
            .await
            .map_err(|e| SchedulingError::Directory(e.to_string()))?;
        if found.is_none() {
            return Err(SchedulingError::DoctorNotFound(doctor_id));
        }
        Ok(())
    }

    async fn ensure_room_free(&self, room_number: i64) -> Result<(), SchedulingError> {
        if self.availability.room_available(room_number).await? {
            return Ok(());
        }
        match self.rooms.holder_of(room_number).await? {
            Some(holder) => Err(SchedulingError::AlreadyOccupied {
                room_number,
                holder,
            }),
            // A free room with a stale holder counts as free.
            None => Ok(()),
        }
    }

    async fn persist_update(
        &self,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Appointment, SchedulingError> {
        let updated = self
            .store
            .update(id, changes)
            .await
            .map_err(|e| SchedulingError::Storage(e.to_string()))?
            .ok_or(SchedulingError::AppointmentNotFound(id))?;
        Ok(updated.into())
    }

    /// Re-reserve the slot and room an appointment held before a failed
    /// update. Both were released under the same write guard, so restoring
    /// them cannot race another booking.
    async fn restore_reservations(
        &self,
        record: &AppointmentRecord,
        held_room: Option<i64>,
        time_changed: bool,
        room_changed: bool,
    ) {
        if time_changed {
            if let Err(e) = self
                .schedule
                .reserve(record.doctor_id, record.date_time, record.id)
                .await
            {
                warn!(
                    "failed to restore doctor slot for appointment {}: {}",
                    record.id, e
                );
            }
        }
        if room_changed {
            if let Some(room) = held_room {
                if let Err(e) = self.rooms.occupy(room, record.id).await {
                    warn!(
                        "failed to restore room {} for appointment {}: {}",
                        room, record.id, e
                    );
                }
            }
        }
    }

    async fn discard_row(&self, id: i64) {
        if let Err(e) = self.store.delete(id).await {
            warn!("failed to discard appointment row {}: {}", id, e);
        }
    }
}
