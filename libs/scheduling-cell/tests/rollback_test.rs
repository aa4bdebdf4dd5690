use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use futures::future::join_all;
use mockall::mock;

use directory_cell::services::{DoctorDirectory, PatientDirectory, RoomDirectory};
use scheduling_cell::models::{BookAppointmentRequest, SchedulingError, UpdateAppointmentRequest};
use scheduling_cell::services::AppointmentRegistry;
use shared_database::store::{
    AppointmentChanges, AppointmentRecord, AppointmentStore, NewAppointment,
};
use shared_models::AppError;
use shared_utils::test_utils::{dt, TestClinic};

mock! {
    pub Store {}

    #[async_trait]
    impl AppointmentStore for Store {
        async fn insert(&self, new: NewAppointment) -> Result<AppointmentRecord, AppError>;
        async fn update(
            &self,
            id: i64,
            changes: AppointmentChanges,
        ) -> Result<Option<AppointmentRecord>, AppError>;
        async fn delete(&self, id: i64) -> Result<bool, AppError>;
        async fn get(&self, id: i64) -> Result<Option<AppointmentRecord>, AppError>;
        async fn list_all(&self) -> Result<Vec<AppointmentRecord>, AppError>;
        async fn find_by_patient(&self, patient_id: i64) -> Result<Vec<AppointmentRecord>, AppError>;
        async fn find_by_doctor(&self, doctor_id: i64) -> Result<Vec<AppointmentRecord>, AppError>;
        async fn find_by_date(&self, date: NaiveDate) -> Result<Vec<AppointmentRecord>, AppError>;
    }
}

fn record_101() -> AppointmentRecord {
    AppointmentRecord {
        id: 7,
        patient_id: 1,
        doctor_id: 10,
        room_number: Some(101),
        date_time: dt(2025, 6, 1, 10, 0),
        reason: "checkup".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

async fn registry_with(store: MockStore) -> Arc<AppointmentRegistry> {
    let clinic = TestClinic::seeded().await;
    let store: Arc<dyn AppointmentStore> = Arc::new(store);
    let patients: Arc<dyn PatientDirectory> = clinic.patients.clone();
    let doctors: Arc<dyn DoctorDirectory> = clinic.doctors.clone();
    let rooms: Arc<dyn RoomDirectory> = clinic.rooms.clone();

    let registry = Arc::new(AppointmentRegistry::new(store, patients, doctors, rooms));
    registry.hydrate().await.expect("hydrate");
    registry
}

#[tokio::test]
async fn test_insert_failure_leaves_no_reservation_behind() {
    let mut store = MockStore::new();
    store.expect_list_all().returning(|| Ok(vec![]));
    store
        .expect_insert()
        .returning(|_| Err(AppError::Database("connection reset".to_string())));

    let registry = registry_with(store).await;
    let err = registry
        .create(BookAppointmentRequest {
            patient_id: 1,
            doctor_id: 10,
            date_time: dt(2025, 6, 1, 10, 0),
            reason: "checkup".to_string(),
            room_number: Some(101),
        })
        .await
        .unwrap_err();

    assert_matches!(err, SchedulingError::Storage(_));
    // The failed booking must not hold the slot or the room.
    assert!(registry.is_doctor_available(10, dt(2025, 6, 1, 10, 0)).await);
    assert!(!registry.room_state().is_occupied(101).await.unwrap());
}

#[tokio::test]
async fn test_update_failure_rolls_both_stores_back() {
    let mut store = MockStore::new();
    store.expect_list_all().returning(|| Ok(vec![]));
    store.expect_insert().returning(|new| {
        Ok(AppointmentRecord {
            id: 7,
            patient_id: new.patient_id,
            doctor_id: new.doctor_id,
            room_number: new.room_number,
            date_time: new.date_time,
            reason: new.reason,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        })
    });
    store
        .expect_get()
        .returning(|id| Ok((id == 7).then(record_101)));
    store
        .expect_update()
        .returning(|_, _| Err(AppError::Database("write timeout".to_string())));

    let registry = registry_with(store).await;
    registry
        .create(BookAppointmentRequest {
            patient_id: 1,
            doctor_id: 10,
            date_time: dt(2025, 6, 1, 10, 0),
            reason: "checkup".to_string(),
            room_number: Some(101),
        })
        .await
        .unwrap();

    let err = registry
        .update(
            7,
            UpdateAppointmentRequest {
                new_date_time: Some(dt(2025, 6, 1, 11, 0)),
                new_room_number: Some(102),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, SchedulingError::Storage(_));

    // Exactly the pre-call state: old slot and room held, new ones clean.
    assert!(!registry.is_doctor_available(10, dt(2025, 6, 1, 10, 0)).await);
    assert!(registry.is_doctor_available(10, dt(2025, 6, 1, 11, 0)).await);
    let rooms = registry.room_state();
    assert_eq!(rooms.holder_of(101).await.unwrap(), Some(7));
    assert!(!rooms.is_occupied(102).await.unwrap());
}

#[tokio::test]
async fn test_delete_failure_touches_nothing() {
    let mut store = MockStore::new();
    store.expect_list_all().returning(|| Ok(vec![record_101()]));
    store
        .expect_get()
        .returning(|id| Ok((id == 7).then(record_101)));
    store
        .expect_delete()
        .returning(|_| Err(AppError::Database("connection reset".to_string())));

    let clinic = TestClinic::seeded().await;
    // Seed the directory flag so hydration re-attaches room 101 to row 7.
    let occupied = TestClinic::empty();
    occupied
        .rooms
        .add_department(directory_cell::models::Department {
            id: 1,
            name: "General Medicine".to_string(),
        })
        .await;
    occupied
        .rooms
        .add_room(directory_cell::models::Room {
            room_number: 101,
            type_label: "consultation".to_string(),
            department_id: 1,
            is_occupied: true,
        })
        .await
        .unwrap();

    let store: Arc<dyn AppointmentStore> = Arc::new(store);
    let patients: Arc<dyn PatientDirectory> = clinic.patients.clone();
    let doctors: Arc<dyn DoctorDirectory> = clinic.doctors.clone();
    let rooms: Arc<dyn RoomDirectory> = occupied.rooms.clone();
    let registry = Arc::new(AppointmentRegistry::new(store, patients, doctors, rooms));
    registry.hydrate().await.unwrap();

    let err = registry.delete(7).await.unwrap_err();
    assert_matches!(err, SchedulingError::Storage(_));

    assert!(!registry.is_doctor_available(10, dt(2025, 6, 1, 10, 0)).await);
    assert_eq!(registry.room_state().holder_of(101).await.unwrap(), Some(7));
}

#[tokio::test]
async fn test_concurrent_bookings_for_one_slot_admit_exactly_one() {
    let clinic = TestClinic::seeded().await;
    let store: Arc<dyn AppointmentStore> = clinic.store.clone();
    let patients: Arc<dyn PatientDirectory> = clinic.patients.clone();
    let doctors: Arc<dyn DoctorDirectory> = clinic.doctors.clone();
    let rooms: Arc<dyn RoomDirectory> = clinic.rooms.clone();
    let registry = Arc::new(AppointmentRegistry::new(store, patients, doctors, rooms));
    registry.hydrate().await.unwrap();

    let tasks: Vec<_> = [1i64, 2]
        .into_iter()
        .map(|patient_id| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .create(BookAppointmentRequest {
                        patient_id,
                        doctor_id: 10,
                        date_time: dt(2025, 6, 1, 10, 0),
                        reason: "checkup".to_string(),
                        room_number: None,
                    })
                    .await
            })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    let succeeded = outcomes.iter().filter(|o| o.is_ok()).count();
    assert_eq!(succeeded, 1);
    let conflict = outcomes.iter().find(|o| o.is_err()).unwrap();
    assert_matches!(
        conflict.as_ref().unwrap_err(),
        SchedulingError::SlotTaken { doctor_id: 10, .. }
    );
    assert_eq!(registry.find_all().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_bookings_for_one_room_admit_exactly_one() {
    let clinic = TestClinic::seeded().await;
    let store: Arc<dyn AppointmentStore> = clinic.store.clone();
    let patients: Arc<dyn PatientDirectory> = clinic.patients.clone();
    let doctors: Arc<dyn DoctorDirectory> = clinic.doctors.clone();
    let rooms: Arc<dyn RoomDirectory> = clinic.rooms.clone();
    let registry = Arc::new(AppointmentRegistry::new(store, patients, doctors, rooms));
    registry.hydrate().await.unwrap();

    // Different doctors and minutes, so the room is the only contention.
    let tasks: Vec<_> = [(1i64, 10i64, 0u32), (2, 11, 30)]
        .into_iter()
        .map(|(patient_id, doctor_id, minute)| {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                registry
                    .create(BookAppointmentRequest {
                        patient_id,
                        doctor_id,
                        date_time: dt(2025, 6, 1, 10, minute),
                        reason: "checkup".to_string(),
                        room_number: Some(101),
                    })
                    .await
            })
        })
        .collect();

    let outcomes: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.expect("task panicked"))
        .collect();

    assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
    let conflict = outcomes.iter().find(|o| o.is_err()).unwrap();
    assert_matches!(
        conflict.as_ref().unwrap_err(),
        SchedulingError::AlreadyOccupied { room_number: 101, .. }
    );
}
