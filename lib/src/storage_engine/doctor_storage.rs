// lib/src/storage_engine/doctor_storage.rs
use async_trait::async_trait;
use log::info;
use sled::transaction::ConflictableTransactionError;
use sled::{Db, Transactional, Tree};
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::medical::Doctor;

use crate::storage_engine::storage_utils::{abort, decode, decode_tx, encode, encode_tx, map_tx_error, uuid_from_bytes};

#[async_trait]
pub trait DoctorStorageEngine: Send + Sync + 'static {
    /// Adds a profile. A user may own at most one doctor profile.
    async fn add_doctor(&self, doctor: &Doctor) -> HospitalResult<()>;
    /// Runs `change` against the stored profile inside one transaction and
    /// returns the saved result. `change` may run more than once.
    async fn update_doctor(
        &self,
        id: &Uuid,
        change: &(dyn for<'u> Fn(&'u mut Doctor) -> HospitalResult<()> + Send + Sync),
    ) -> HospitalResult<Doctor>;
    async fn get_doctor(&self, id: &Uuid) -> HospitalResult<Option<Doctor>>;
    async fn get_doctor_by_user(&self, user: &Uuid) -> HospitalResult<Option<Doctor>>;
    async fn list_doctors(&self) -> HospitalResult<Vec<Doctor>>;
}

/// Sled-backed implementation of the `DoctorStorageEngine` trait.
#[derive(Debug, Clone)]
pub struct SledDoctorStorage {
    doctors: Tree,
    by_user: Tree,
}

impl SledDoctorStorage {
    pub fn new(db: &Db) -> HospitalResult<Self> {
        Ok(Self {
            doctors: db.open_tree("doctors")?,
            by_user: db.open_tree("doctors_by_user")?,
        })
    }
}

#[async_trait]
impl DoctorStorageEngine for SledDoctorStorage {
    async fn add_doctor(&self, doctor: &Doctor) -> HospitalResult<()> {
        let id = &doctor.id.as_bytes()[..];
        let user = &doctor.user.as_bytes()[..];
        let bytes = encode(doctor)?;

        (&self.doctors, &self.by_user)
            .transaction(|(doctors, by_user)| {
                if by_user.get(user)?.is_some() {
                    return abort(HospitalError::Conflict("Doctor profile already exists for this user".to_string()));
                }
                doctors.insert(id, &bytes[..])?;
                by_user.insert(user, id)?;
                Ok(())
            })
            .map_err(map_tx_error)?;
        info!("Created doctor profile {} for user {}", doctor.id, doctor.user);
        Ok(())
    }

    async fn update_doctor(
        &self,
        id: &Uuid,
        change: &(dyn for<'u> Fn(&'u mut Doctor) -> HospitalResult<()> + Send + Sync),
    ) -> HospitalResult<Doctor> {
        let key = &id.as_bytes()[..];
        self.doctors
            .transaction(|doctors| {
                let Some(bytes) = doctors.get(key)? else {
                    return abort(HospitalError::NotFound("Doctor not found".to_string()));
                };
                let mut doctor: Doctor = decode_tx(&bytes)?;
                change(&mut doctor).map_err(ConflictableTransactionError::Abort)?;
                doctors.insert(key, encode_tx(&doctor)?)?;
                Ok(doctor)
            })
            .map_err(map_tx_error)
    }

    async fn get_doctor(&self, id: &Uuid) -> HospitalResult<Option<Doctor>> {
        match self.doctors.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_doctor_by_user(&self, user: &Uuid) -> HospitalResult<Option<Doctor>> {
        match self.by_user.get(user.as_bytes())? {
            Some(id) => self.get_doctor(&uuid_from_bytes(&id)?).await,
            None => Ok(None),
        }
    }

    async fn list_doctors(&self) -> HospitalResult<Vec<Doctor>> {
        let mut doctors = self
            .doctors
            .iter()
            .values()
            .map(|bytes| decode::<Doctor>(&bytes?))
            .collect::<HospitalResult<Vec<_>>>()?;
        doctors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(doctors)
    }
}
