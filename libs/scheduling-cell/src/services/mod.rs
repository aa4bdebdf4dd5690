pub mod availability;
pub mod booking;
pub mod completion;
pub mod occupancy;
pub mod schedule;

pub use availability::AvailabilityChecker;
pub use booking::AppointmentRegistry;
pub use completion::EncounterCompletionHandler;
pub use occupancy::RoomStateStore;
pub use schedule::DoctorScheduleIndex;
