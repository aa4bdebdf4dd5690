// libs/scheduling-cell/src/services/occupancy.rs
use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::models::SchedulingError;

/// Occupancy of a single room. Invariant: `occupied == holder.is_some()`.
#[derive(Debug, Clone, Copy, Default)]
struct RoomState {
    occupied: bool,
    holder: Option<i64>,
}

/// In-memory occupancy ledger for every registered room. Holds which
/// appointment, if any, currently occupies each room.
pub struct RoomStateStore {
    rooms: RwLock<HashMap<i64, RoomState>>,
}

impl RoomStateStore {
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a room in the ledger. Idempotent; a room starts free.
    pub async fn register(&self, room_number: i64) {
        self.rooms.write().await.entry(room_number).or_default();
    }

    /// Hydration entry point: seed a room with persisted state. Pairs that
    /// would violate the occupancy invariant are normalized to free.
    pub async fn restore(&self, room_number: i64, occupied: bool, holder: Option<i64>) {
        let state = match (occupied, holder) {
            (true, Some(holder)) => RoomState {
                occupied: true,
                holder: Some(holder),
            },
            (true, None) => {
                warn!(
                    "room {} flagged occupied with no holder, restoring as free",
                    room_number
                );
                RoomState::default()
            }
            (false, Some(stale)) => {
                debug!(
                    "room {} carries stale holder {} while free, clearing it",
                    room_number, stale
                );
                RoomState::default()
            }
            (false, None) => RoomState::default(),
        };
        self.rooms.write().await.insert(room_number, state);
    }

    /// Mark a room occupied by the given appointment. Re-occupying with the
    /// same holder is a silent no-op; a different holder is rejected.
    pub async fn occupy(&self, room_number: i64, holder: i64) -> Result<(), SchedulingError> {
        let mut rooms = self.rooms.write().await;
        let state = rooms
            .get_mut(&room_number)
            .ok_or(SchedulingError::RoomNotFound(room_number))?;
        match state.holder {
            Some(current) if state.occupied && current != holder => {
                Err(SchedulingError::AlreadyOccupied {
                    room_number,
                    holder: current,
                })
            }
            _ => {
                state.occupied = true;
                state.holder = Some(holder);
                debug!("room {} occupied by appointment {}", room_number, holder);
                Ok(())
            }
        }
    }

    /// Clear the occupancy flag and holder. Idempotent.
    pub async fn free(&self, room_number: i64) -> Result<(), SchedulingError> {
        let mut rooms = self.rooms.write().await;
        let state = rooms
            .get_mut(&room_number)
            .ok_or(SchedulingError::RoomNotFound(room_number))?;
        if state.occupied {
            debug!("room {} freed", room_number);
        }
        state.occupied = false;
        state.holder = None;
        Ok(())
    }

    pub async fn is_occupied(&self, room_number: i64) -> Result<bool, SchedulingError> {
        self.rooms
            .read()
            .await
            .get(&room_number)
            .map(|state| state.occupied)
            .ok_or(SchedulingError::RoomNotFound(room_number))
    }

    pub async fn holder_of(&self, room_number: i64) -> Result<Option<i64>, SchedulingError> {
        self.rooms
            .read()
            .await
            .get(&room_number)
            .map(|state| state.holder)
            .ok_or(SchedulingError::RoomNotFound(room_number))
    }
}

impl Default for RoomStateStore {
    fn default() -> Self {
        Self::new()
    }
}
