// libs/scheduling-cell/src/models.rs
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use shared_database::store::AppointmentRecord;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

/// A booked appointment. The room reference is optional: an appointment may
/// be pending room assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Appointment {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub room_number: Option<i64>,
    pub date_time: DateTime<Utc>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AppointmentRecord> for Appointment {
    fn from(record: AppointmentRecord) -> Self {
        Self {
            id: record.id,
            patient_id: record.patient_id,
            doctor_id: record.doctor_id,
            room_number: record.room_number,
            date_time: record.date_time,
            reason: record.reason,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

// ==============================================================================
// REQUEST MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookAppointmentRequest {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date_time: DateTime<Utc>,
    pub reason: String,
    pub room_number: Option<i64>,
}

/// Partial update. Absent fields are left untouched; a changed timestamp or
/// room re-runs the availability checks for the new slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateAppointmentRequest {
    pub new_date_time: Option<DateTime<Utc>>,
    pub new_room_number: Option<i64>,
    pub new_reason: Option<String>,
}

/// A recorded clinical visit, consumed read-only as the room-release trigger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Encounter {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
pub enum SchedulingError {
    #[error("room {0} not found")]
    RoomNotFound(i64),

    #[error("room {room_number} is already occupied by appointment {holder}")]
    AlreadyOccupied { room_number: i64, holder: i64 },

    #[error("doctor {doctor_id} already has an appointment at {date_time}")]
    SlotTaken {
        doctor_id: i64,
        date_time: DateTime<Utc>,
    },

    #[error("patient {0} not found")]
    PatientNotFound(i64),

    #[error("doctor {0} not found")]
    DoctorNotFound(i64),

    #[error("appointment {0} not found")]
    AppointmentNotFound(i64),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("directory error: {0}")]
    Directory(String),
}

impl SchedulingError {
    /// True for errors the caller can recover from by retrying with
    /// different parameters.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            SchedulingError::AlreadyOccupied { .. } | SchedulingError::SlotTaken { .. }
        )
    }
}
