// libs/shared/database/src/store.rs
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::AppError;

/// A persisted appointment row. `room_number` is nullable: an appointment
/// may be pending room assignment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppointmentRecord {
    pub id: i64,
    pub patient_id: i64,
    pub doctor_id: i64,
    pub room_number: Option<i64>,
    pub date_time: DateTime<Utc>,
    pub reason: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewAppointment {
    pub patient_id: i64,
    pub doctor_id: i64,
    pub room_number: Option<i64>,
    pub date_time: DateTime<Utc>,
    pub reason: String,
}

/// Partial update for an appointment row. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppointmentChanges {
    pub date_time: Option<DateTime<Utc>>,
    pub room_number: Option<i64>,
    pub reason: Option<String>,
}

impl AppointmentChanges {
    pub fn is_empty(&self) -> bool {
        self.date_time.is_none() && self.room_number.is_none() && self.reason.is_none()
    }
}

/// Persistence contract for the appointment table. The id is assigned by the
/// store on insert and returned with the created row.
#[async_trait]
pub trait AppointmentStore: Send + Sync {
    async fn insert(&self, new: NewAppointment) -> Result<AppointmentRecord, AppError>;

    /// Apply a partial update; `Ok(None)` when no row has this id.
    async fn update(
        &self,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Option<AppointmentRecord>, AppError>;

    /// `Ok(false)` when no row has this id.
    async fn delete(&self, id: i64) -> Result<bool, AppError>;

    async fn get(&self, id: i64) -> Result<Option<AppointmentRecord>, AppError>;

    async fn list_all(&self) -> Result<Vec<AppointmentRecord>, AppError>;

    async fn find_by_patient(&self, patient_id: i64) -> Result<Vec<AppointmentRecord>, AppError>;

    async fn find_by_doctor(&self, doctor_id: i64) -> Result<Vec<AppointmentRecord>, AppError>;

    /// Rows whose timestamp falls on the given calendar day.
    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<AppointmentRecord>, AppError>;
}

/// Reference in-memory implementation with auto-increment id assignment.
pub struct InMemoryAppointmentStore {
    rows: RwLock<HashMap<i64, AppointmentRecord>>,
    next_id: AtomicI64,
}

impl InMemoryAppointmentStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    async fn collect_sorted<F>(&self, predicate: F) -> Vec<AppointmentRecord>
    where
        F: Fn(&AppointmentRecord) -> bool,
    {
        let rows = self.rows.read().await;
        let mut matched: Vec<AppointmentRecord> =
            rows.values().filter(|r| predicate(r)).cloned().collect();
        matched.sort_by_key(|r| r.id);
        matched
    }
}

impl Default for InMemoryAppointmentStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AppointmentStore for InMemoryAppointmentStore {
    async fn insert(&self, new: NewAppointment) -> Result<AppointmentRecord, AppError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let now = Utc::now();
        let record = AppointmentRecord {
            id,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            room_number: new.room_number,
            date_time: new.date_time,
            reason: new.reason,
            created_at: now,
            updated_at: now,
        };
        self.rows.write().await.insert(id, record.clone());
        debug!("inserted appointment row {}", id);
        Ok(record)
    }

    async fn update(
        &self,
        id: i64,
        changes: AppointmentChanges,
    ) -> Result<Option<AppointmentRecord>, AppError> {
        let mut rows = self.rows.write().await;
        let Some(row) = rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(date_time) = changes.date_time {
            row.date_time = date_time;
        }
        if let Some(room_number) = changes.room_number {
            row.room_number = Some(room_number);
        }
        if let Some(reason) = changes.reason {
            row.reason = reason;
        }
        row.updated_at = Utc::now();
        debug!("updated appointment row {}", id);
        Ok(Some(row.clone()))
    }

    async fn delete(&self, id: i64) -> Result<bool, AppError> {
        let removed = self.rows.write().await.remove(&id).is_some();
        if removed {
            debug!("deleted appointment row {}", id);
        }
        Ok(removed)
    }

    async fn get(&self, id: i64) -> Result<Option<AppointmentRecord>, AppError> {
        Ok(self.rows.read().await.get(&id).cloned())
    }

    async fn list_all(&self) -> Result<Vec<AppointmentRecord>, AppError> {
        Ok(self.collect_sorted(|_| true).await)
    }

    async fn find_by_patient(&self, patient_id: i64) -> Result<Vec<AppointmentRecord>, AppError> {
        Ok(self.collect_sorted(|r| r.patient_id == patient_id).await)
    }

    async fn find_by_doctor(&self, doctor_id: i64) -> Result<Vec<AppointmentRecord>, AppError> {
        Ok(self.collect_sorted(|r| r.doctor_id == doctor_id).await)
    }

    async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<AppointmentRecord>, AppError> {
        Ok(self
            .collect_sorted(|r| r.date_time.date_naive() == date)
            .await)
    }
}
