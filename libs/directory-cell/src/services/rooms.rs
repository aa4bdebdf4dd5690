use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use shared_models::AppError;

use crate::models::{Department, Room};

/// Room and department registry. Supplies room existence and department
/// membership; the scheduling core consumes it read-only and owns live
/// occupancy itself.
#[async_trait]
pub trait RoomDirectory: Send + Sync {
    async fn lookup_by_number(&self, room_number: i64) -> Result<Option<Room>, AppError>;

    async fn list_rooms(&self) -> Result<Vec<Room>, AppError>;

    /// Index lookup: room number to owning department id.
    async fn department_of(&self, room_number: i64) -> Result<Option<i64>, AppError>;
}

pub struct InMemoryRoomDirectory {
    rooms: RwLock<HashMap<i64, Room>>,
    departments: RwLock<HashMap<i64, Department>>,
    department_rooms: RwLock<HashMap<i64, Vec<i64>>>,
}

impl InMemoryRoomDirectory {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            departments: RwLock::new(HashMap::new()),
            department_rooms: RwLock::new(HashMap::new()),
        }
    }

    pub async fn add_department(&self, department: Department) {
        debug!("registered department {} ({})", department.id, department.name);
        self.department_rooms
            .write()
            .await
            .entry(department.id)
            .or_default();
        self.departments
            .write()
            .await
            .insert(department.id, department);
    }

    /// Rooms belong to exactly one department, which must already exist.
    pub async fn add_room(&self, room: Room) -> Result<(), AppError> {
        if room.type_label.trim().is_empty() {
            return Err(AppError::ValidationError(
                "room type label must not be empty".to_string(),
            ));
        }
        if !self
            .departments
            .read()
            .await
            .contains_key(&room.department_id)
        {
            return Err(AppError::NotFound(format!(
                "department {} does not exist",
                room.department_id
            )));
        }
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.room_number) {
            return Err(AppError::Conflict(format!(
                "room {} already registered",
                room.room_number
            )));
        }
        let mut department_rooms = self.department_rooms.write().await;
        department_rooms
            .entry(room.department_id)
            .or_default()
            .push(room.room_number);
        debug!(
            "registered room {} ({}) in department {}",
            room.room_number, room.type_label, room.department_id
        );
        rooms.insert(room.room_number, room);
        Ok(())
    }

    pub async fn rooms_in_department(&self, department_id: i64) -> Vec<i64> {
        self.department_rooms
            .read()
            .await
            .get(&department_id)
            .cloned()
            .unwrap_or_default()
    }
}

impl Default for InMemoryRoomDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RoomDirectory for InMemoryRoomDirectory {
    async fn lookup_by_number(&self, room_number: i64) -> Result<Option<Room>, AppError> {
        Ok(self.rooms.read().await.get(&room_number).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<Room>, AppError> {
        let rooms = self.rooms.read().await;
        let mut all: Vec<Room> = rooms.values().cloned().collect();
        all.sort_by_key(|r| r.room_number);
        Ok(all)
    }

    async fn department_of(&self, room_number: i64) -> Result<Option<i64>, AppError> {
        Ok(self
            .rooms
            .read()
            .await
            .get(&room_number)
            .map(|r| r.department_id))
    }
}
