use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::AppError;

use crate::models::Doctor;

#[async_trait]
pub trait DoctorDirectory: Send + Sync {
    async fn lookup_by_id(&self, id: i64) -> Result<Option<Doctor>, AppError>;

    async fn lookup_by_stamp_code(&self, code: &str) -> Result<Option<Doctor>, AppError>;
}

pub struct InMemoryDoctorDirectory {
    doctors: RwLock<HashMap<i64, Doctor>>,
}

impl InMemoryDoctorDirectory {
    pub fn new() -> Self {
        Self {
            doctors: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_doctor(&self, doctor: Doctor) -> Result<(), AppError> {
        let mut doctors = self.doctors.write().await;
        if doctors
            .values()
            .any(|d| d.stamp_code == doctor.stamp_code && d.id != doctor.id)
        {
            return Err(AppError::Conflict(format!(
                "stamp code {} already in use",
                doctor.stamp_code
            )));
        }
        debug!("registered doctor {} ({})", doctor.id, doctor.full_name());
        doctors.insert(doctor.id, doctor);
        Ok(())
    }
}

impl Default for InMemoryDoctorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DoctorDirectory for InMemoryDoctorDirectory {
    async fn lookup_by_id(&self, id: i64) -> Result<Option<Doctor>, AppError> {
        Ok(self.doctors.read().await.get(&id).cloned())
    }

    async fn lookup_by_stamp_code(&self, code: &str) -> Result<Option<Doctor>, AppError> {
        Ok(self
            .doctors
            .read()
            .await
            .values()
            .find(|d| d.stamp_code == code)
            .cloned())
    }
}
