use assert_matches::assert_matches;
use tokio_test::{assert_err, assert_ok};

use scheduling_cell::models::SchedulingError;
use scheduling_cell::services::RoomStateStore;

#[tokio::test]
async fn test_registered_room_starts_free() {
    let rooms = RoomStateStore::new();
    rooms.register(101).await;

    assert!(!rooms.is_occupied(101).await.unwrap());
    assert_eq!(rooms.holder_of(101).await.unwrap(), None);
}

#[tokio::test]
async fn test_occupy_sets_flag_and_holder_together() {
    let rooms = RoomStateStore::new();
    rooms.register(101).await;

    assert_ok!(rooms.occupy(101, 7).await);
    assert!(rooms.is_occupied(101).await.unwrap());
    assert_eq!(rooms.holder_of(101).await.unwrap(), Some(7));
}

#[tokio::test]
async fn test_reoccupy_by_same_holder_is_noop() {
    let rooms = RoomStateStore::new();
    rooms.register(101).await;
    rooms.occupy(101, 7).await.unwrap();

    assert_ok!(rooms.occupy(101, 7).await);
    assert_eq!(rooms.holder_of(101).await.unwrap(), Some(7));
}

#[tokio::test]
async fn test_occupy_by_different_holder_is_rejected_without_transition() {
    let rooms = RoomStateStore::new();
    rooms.register(101).await;
    rooms.occupy(101, 7).await.unwrap();

    let err = assert_err!(rooms.occupy(101, 8).await);
    assert_matches!(
        err,
        SchedulingError::AlreadyOccupied {
            room_number: 101,
            holder: 7
        }
    );
    assert_eq!(rooms.holder_of(101).await.unwrap(), Some(7));
}

#[tokio::test]
async fn test_free_is_idempotent() {
    let rooms = RoomStateStore::new();
    rooms.register(101).await;
    rooms.occupy(101, 7).await.unwrap();

    assert_ok!(rooms.free(101).await);
    assert!(!rooms.is_occupied(101).await.unwrap());
    assert_eq!(rooms.holder_of(101).await.unwrap(), None);

    // Freeing twice produces the same state as freeing once.
    assert_ok!(rooms.free(101).await);
    assert!(!rooms.is_occupied(101).await.unwrap());
    assert_eq!(rooms.holder_of(101).await.unwrap(), None);
}

#[tokio::test]
async fn test_unknown_room_is_reported() {
    let rooms = RoomStateStore::new();

    assert_matches!(rooms.occupy(999, 1).await, Err(SchedulingError::RoomNotFound(999)));
    assert_matches!(rooms.free(999).await, Err(SchedulingError::RoomNotFound(999)));
    assert_matches!(rooms.is_occupied(999).await, Err(SchedulingError::RoomNotFound(999)));
    assert_matches!(rooms.holder_of(999).await, Err(SchedulingError::RoomNotFound(999)));
}

#[tokio::test]
async fn test_restore_normalizes_inconsistent_pairs() {
    let rooms = RoomStateStore::new();

    // Stale holder on a free room is dropped.
    rooms.restore(101, false, Some(42)).await;
    assert!(!rooms.is_occupied(101).await.unwrap());
    assert_eq!(rooms.holder_of(101).await.unwrap(), None);

    // Occupied with no holder would break the invariant; restored free.
    rooms.restore(102, true, None).await;
    assert!(!rooms.is_occupied(102).await.unwrap());

    // A consistent pair is kept as-is.
    rooms.restore(103, true, Some(9)).await;
    assert!(rooms.is_occupied(103).await.unwrap());
    assert_eq!(rooms.holder_of(103).await.unwrap(), Some(9));
}

#[tokio::test]
async fn test_occupancy_flag_always_mirrors_holder() {
    let rooms = RoomStateStore::new();
    rooms.register(101).await;

    // Walk the state machine and check the invariant after every step.
    rooms.occupy(101, 1).await.unwrap();
    let _ = rooms.occupy(101, 2).await;
    rooms.free(101).await.unwrap();
    rooms.free(101).await.unwrap();
    rooms.occupy(101, 3).await.unwrap();

    let occupied = rooms.is_occupied(101).await.unwrap();
    let holder = rooms.holder_of(101).await.unwrap();
    assert_eq!(occupied, holder.is_some());
    assert_eq!(holder, Some(3));
}
