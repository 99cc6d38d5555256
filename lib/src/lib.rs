// lib/src/lib.rs
// Storage engines and the hospital services built on top of them.

pub mod database;
pub mod engine;
pub mod storage_engine;

pub use crate::database::Database;
pub use crate::engine::{
    AppointmentManager, AppointmentUpdate, BookingRequest, DoctorDirectory, HospitalServices, InventoryService,
    PaymentRequest, PrescriptionRequest, ReminderSweep, UserDirectory,
};
pub use crate::storage_engine::{open_sled_db, AppointmentFilter};
