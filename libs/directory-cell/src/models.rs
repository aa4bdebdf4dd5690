// libs/directory-cell/src/models.rs
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Patient {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// National identity number, unique per patient.
    pub cnp: String,
}

impl Patient {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Doctor {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    /// Per-doctor seal code used for operator lookup.
    pub stamp_code: String,
}

impl Doctor {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// Directory view of a room. `is_occupied` is the persisted flag consumed as
/// seed state at hydration; live occupancy is tracked by the scheduling core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_number: i64,
    pub type_label: String,
    pub department_id: i64,
    pub is_occupied: bool,
}

/// Departments own their rooms by number; rooms point back by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Department {
    pub id: i64,
    pub name: String,
}
