// lib/src/database.rs

use std::path::Path;
use std::sync::Arc;

use log::info;

use models::errors::HospitalResult;

use crate::storage_engine::{
    open_sled_db, open_temporary_db, AppointmentStorageEngine, DoctorStorageEngine, InventoryStorageEngine,
    SledAppointmentStorage, SledDoctorStorage, SledInventoryStorage, SledUserStorage, UserStorageEngine,
};

/// One sled database holding every collection, exposed through the
/// storage engine traits.
#[derive(Clone)]
pub struct Database {
    db: sled::Db,
    appointments: Arc<dyn AppointmentStorageEngine>,
    users: Arc<dyn UserStorageEngine>,
    doctors: Arc<dyn DoctorStorageEngine>,
    inventory: Arc<dyn InventoryStorageEngine>,
}

impl Database {
    /// Opens (or creates) the database under `data_directory`.
    pub fn open(data_directory: &Path) -> HospitalResult<Self> {
        Self::from_db(open_sled_db(data_directory)?)
    }

    /// A throwaway database removed when the last handle drops.
    pub fn temporary() -> HospitalResult<Self> {
        Self::from_db(open_temporary_db()?)
    }

    fn from_db(db: sled::Db) -> HospitalResult<Self> {
        Ok(Database {
            appointments: Arc::new(SledAppointmentStorage::new(&db)?),
            users: Arc::new(SledUserStorage::new(&db)?),
            doctors: Arc::new(SledDoctorStorage::new(&db)?),
            inventory: Arc::new(SledInventoryStorage::new(&db)?),
            db,
        })
    }

    pub fn appointments(&self) -> Arc<dyn AppointmentStorageEngine> {
        self.appointments.clone()
    }

    pub fn users(&self) -> Arc<dyn UserStorageEngine> {
        self.users.clone()
    }

    pub fn doctors(&self) -> Arc<dyn DoctorStorageEngine> {
        self.doctors.clone()
    }

    pub fn inventory(&self) -> Arc<dyn InventoryStorageEngine> {
        self.inventory.clone()
    }

    /// Flushes pending writes to disk. Called on shutdown.
    pub async fn flush(&self) -> HospitalResult<()> {
        let bytes = self.db.flush_async().await?;
        info!("Flushed {} bytes to disk", bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use models::medical::{NewUser, Role, User};

    #[tokio::test]
    async fn should_reopen_with_data_intact() {
        let dir = tempfile::tempdir().unwrap();
        let user = User::from_new_user(NewUser {
            name: "Front Desk".into(),
            email: "desk@hospital.org".into(),
            password: "secret123".into(),
            role: Role::Staff,
            phone: None,
            date_of_birth: None,
        })
        .unwrap();

        {
            let database = Database::open(dir.path()).unwrap();
            database.users().add_user(&user).await.unwrap();
            database.inventory().get_or_insert(models::medical::Inventory::seeded(Utc::now(), None)).await.unwrap();
            database.flush().await.unwrap();
        }

        let database = Database::open(dir.path()).unwrap();
        let found = database.users().get_user_by_email("desk@hospital.org").await.unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));
        assert!(database.inventory().get().await.unwrap().is_some());
    }
}
