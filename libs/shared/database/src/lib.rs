pub mod store;

pub use store::{
    AppointmentChanges, AppointmentRecord, AppointmentStore, InMemoryAppointmentStore,
    NewAppointment,
};
