use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::AppError;

use crate::models::Patient;

/// Read-only lookup contract the scheduling core uses to validate patient
/// references. The core never mutates the directory.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn lookup_by_id(&self, id: i64) -> Result<Option<Patient>, AppError>;

    async fn lookup_by_cnp(&self, cnp: &str) -> Result<Option<Patient>, AppError>;
}

pub struct InMemoryPatientDirectory {
    patients: RwLock<HashMap<i64, Patient>>,
}

impl InMemoryPatientDirectory {
    pub fn new() -> Self {
        Self {
            patients: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_patient(&self, patient: Patient) -> Result<(), AppError> {
        let mut patients = self.patients.write().await;
        if patients.values().any(|p| p.cnp == patient.cnp && p.id != patient.id) {
            return Err(AppError::Conflict(format!(
                "patient with CNP {} already registered",
                patient.cnp
            )));
        }
        debug!("registered patient {} ({})", patient.id, patient.full_name());
        patients.insert(patient.id, patient);
        Ok(())
    }
}

impl Default for InMemoryPatientDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PatientDirectory for InMemoryPatientDirectory {
    async fn lookup_by_id(&self, id: i64) -> Result<Option<Patient>, AppError> {
        Ok(self.patients.read().await.get(&id).cloned())
    }

    async fn lookup_by_cnp(&self, cnp: &str) -> Result<Option<Patient>, AppError> {
        Ok(self
            .patients
            .read()
            .await
            .values()
            .find(|p| p.cnp == cnp)
            .cloned())
    }
}
