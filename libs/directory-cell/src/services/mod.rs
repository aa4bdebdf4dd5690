pub mod doctors;
pub mod patients;
pub mod rooms;

pub use doctors::{DoctorDirectory, InMemoryDoctorDirectory};
pub use patients::{InMemoryPatientDirectory, PatientDirectory};
pub use rooms::{InMemoryRoomDirectory, RoomDirectory};
