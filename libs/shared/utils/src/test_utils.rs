use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};

use directory_cell::models::{Department, Doctor, Patient, Room};
use directory_cell::services::{
    InMemoryDoctorDirectory, InMemoryPatientDirectory, InMemoryRoomDirectory,
};
use shared_database::store::InMemoryAppointmentStore;

/// Shared fixture: in-memory collaborators pre-seeded with a small clinic.
pub struct TestClinic {
    pub patients: Arc<InMemoryPatientDirectory>,
    pub doctors: Arc<InMemoryDoctorDirectory>,
    pub rooms: Arc<InMemoryRoomDirectory>,
    pub store: Arc<InMemoryAppointmentStore>,
}

impl TestClinic {
    pub fn empty() -> Self {
        Self {
            patients: Arc::new(InMemoryPatientDirectory::new()),
            doctors: Arc::new(InMemoryDoctorDirectory::new()),
            rooms: Arc::new(InMemoryRoomDirectory::new()),
            store: Arc::new(InMemoryAppointmentStore::new()),
        }
    }

    /// Two patients (1, 2), two doctors (10, 11), rooms 101/102 in General
    /// Medicine and 201 in Cardiology, all free.
    pub async fn seeded() -> Self {
        let clinic = Self::empty();

        clinic
            .patients
            .add_patient(Patient {
                id: 1,
                first_name: "Maria".to_string(),
                last_name: "Ionescu".to_string(),
                cnp: "2980101223344".to_string(),
            })
            .await
            .expect("seed patient 1");
        clinic
            .patients
            .add_patient(Patient {
                id: 2,
                first_name: "Andrei".to_string(),
                last_name: "Pop".to_string(),
                cnp: "1951230112233".to_string(),
            })
            .await
            .expect("seed patient 2");

        clinic
            .doctors
            .add_doctor(Doctor {
                id: 10,
                first_name: "Elena".to_string(),
                last_name: "Marinescu".to_string(),
                stamp_code: "EM510".to_string(),
            })
            .await
            .expect("seed doctor 10");
        clinic
            .doctors
            .add_doctor(Doctor {
                id: 11,
                first_name: "Radu".to_string(),
                last_name: "Stan".to_string(),
                stamp_code: "RS204".to_string(),
            })
            .await
            .expect("seed doctor 11");

        clinic
            .rooms
            .add_department(Department {
                id: 1,
                name: "General Medicine".to_string(),
            })
            .await;
        clinic
            .rooms
            .add_department(Department {
                id: 2,
                name: "Cardiology".to_string(),
            })
            .await;
        for (room_number, type_label, department_id) in [
            (101, "consultation", 1),
            (102, "therapy", 1),
            (201, "consultation", 2),
        ] {
            clinic
                .rooms
                .add_room(Room {
                    room_number,
                    type_label: type_label.to_string(),
                    department_id,
                    is_occupied: false,
                })
                .await
                .expect("seed room");
        }

        clinic
    }
}

/// Minute-precision UTC timestamp for test scenarios.
pub fn dt(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
        .single()
        .expect("valid timestamp")
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}
