// lib/src/storage_engine/mod.rs

pub mod appointment_storage;
pub mod doctor_storage;
pub mod inventory_storage;
pub mod storage_utils;
pub mod user_storage;

pub use appointment_storage::{AppointmentFilter, AppointmentStorageEngine, SledAppointmentStorage};
pub use doctor_storage::{DoctorStorageEngine, SledDoctorStorage};
pub use inventory_storage::{InventoryStorageEngine, SledInventoryStorage};
pub use user_storage::{SledUserStorage, UserStorageEngine};

use std::path::Path;

use log::info;
use models::errors::HospitalResult;

/// Opens (creating if needed) the sled database at `path`.
pub fn open_sled_db(path: &Path) -> HospitalResult<sled::Db> {
    std::fs::create_dir_all(path)?;
    info!("Opening sled database at {:?}", path);
    Ok(sled::Config::new().path(path).open()?)
}

/// A database that lives only as long as the handle. Used by tests.
pub fn open_temporary_db() -> HospitalResult<sled::Db> {
    Ok(sled::Config::new().temporary(true).open()?)
}
