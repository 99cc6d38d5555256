// lib/src/engine/doctors.rs
use std::sync::Arc;

use chrono::Utc;
use log::info;
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::medical::{Doctor, DoctorSummary, DoctorUpdate, NewDoctor, NewUser, Role, User};
use security::{authorize, Action, Caller, Resource};

use crate::engine::users::UserDirectory;
use crate::storage_engine::DoctorStorageEngine;

#[derive(Clone)]
pub struct DoctorDirectory {
    doctors: Arc<dyn DoctorStorageEngine>,
    users: UserDirectory,
}

impl DoctorDirectory {
    pub fn new(doctors: Arc<dyn DoctorStorageEngine>, users: UserDirectory) -> Self {
        Self { doctors, users }
    }

    pub async fn list_active(&self) -> HospitalResult<Vec<Doctor>> {
        let doctors = self.doctors.list_doctors().await?;
        Ok(doctors.into_iter().filter(|d| d.active).collect())
    }

    pub async fn get(&self, id: &Uuid) -> HospitalResult<Doctor> {
        self.doctors
            .get_doctor(id)
            .await?
            .ok_or_else(|| HospitalError::NotFound(format!("Doctor not found with id of {}", id)))
    }

    pub async fn get_by_user(&self, user: &Uuid) -> HospitalResult<Doctor> {
        self.doctors
            .get_doctor_by_user(user)
            .await?
            .ok_or_else(|| HospitalError::NotFound(format!("Doctor not found with user id of {}", user)))
    }

    /// Case-insensitive substring match on specialization, active doctors only.
    pub async fn search(&self, specialization: &str) -> HospitalResult<Vec<Doctor>> {
        let doctors = self.list_active().await?;
        Ok(doctors.into_iter().filter(|d| d.matches_specialization(specialization)).collect())
    }

    /// The doctor a patient may book, addressed by the doctor's user id.
    pub async fn bookable(&self, user: &Uuid) -> HospitalResult<Doctor> {
        match self.doctors.get_doctor_by_user(user).await? {
            Some(doctor) if doctor.active => Ok(doctor),
            _ => Err(HospitalError::NotFound("Doctor not found".to_string())),
        }
    }

    pub async fn summary_for_user(&self, user: &Uuid) -> HospitalResult<Option<DoctorSummary>> {
        Ok(self.doctors.get_doctor_by_user(user).await?.map(|d| d.summary()))
    }

    /// Creates the doctor's login account and profile together. Both are
    /// validated before anything is written.
    pub async fn create(&self, caller: &Caller, new: NewDoctor) -> HospitalResult<Doctor> {
        authorize(caller, Action::CreateDoctor, Resource::None)?;

        let user = User::from_new_user(NewUser {
            name: new.name.clone(),
            email: new.email.clone(),
            password: new.password.clone(),
            role: Role::Doctor,
            phone: Some(new.phone.clone()),
            date_of_birth: None,
        })?;
        let doctor = Doctor::from_new(user.id, &new, Utc::now())?;

        self.users.store(&user).await?;
        self.doctors.add_doctor(&doctor).await?;
        info!("Admin {} created doctor {} ({})", caller.id, doctor.id, doctor.specialization);
        Ok(doctor)
    }

    pub async fn update(&self, caller: &Caller, id: &Uuid, update: DoctorUpdate) -> HospitalResult<Doctor> {
        let current = self.get(id).await?;
        authorize(caller, Action::UpdateDoctor, Resource::Doctor { user: current.user })?;
        let now = Utc::now();
        self.doctors
            .update_doctor(id, &|doctor| Ok(doctor.apply_update(update.clone(), now)?))
            .await
    }

    /// Soft delete: the profile and its login account are both deactivated.
    pub async fn deactivate(&self, caller: &Caller, id: &Uuid) -> HospitalResult<Doctor> {
        authorize(caller, Action::DeactivateDoctor, Resource::None)?;
        let now = Utc::now();
        let doctor = self
            .doctors
            .update_doctor(id, &|doctor| {
                doctor.active = false;
                doctor.updated_at = now;
                Ok(())
            })
            .await?;
        self.users.deactivate(&doctor.user).await?;
        info!("Deactivated doctor {}", doctor.id);
        Ok(doctor)
    }
}
