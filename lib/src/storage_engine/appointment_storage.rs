// lib/src/storage_engine/appointment_storage.rs
// Appointments live in one tree keyed by id. Two index trees map
// (doctor, date, time) and (patient, date, time) to the appointment id; a
// record and both of its index entries are always written in the same
// transaction, so an occupied index key means the slot is taken.

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info};
use sled::{transaction::ConflictableTransactionError, Db, Transactional, Tree};
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::identifiers::{slot_key, slot_prefix, SlotLabel};
use models::medical::{Appointment, AppointmentPatch, AppointmentStatus};

use crate::storage_engine::storage_utils::{abort, decode, decode_tx, encode, encode_tx, map_tx_error};

/// Narrows [`AppointmentStorageEngine::find_by_query`]. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    pub patient: Option<Uuid>,
    pub doctor: Option<Uuid>,
    pub date: Option<String>,
    pub status: Option<AppointmentStatus>,
}

impl AppointmentFilter {
    pub fn for_patient(patient: Uuid) -> Self {
        AppointmentFilter { patient: Some(patient), ..Default::default() }
    }

    pub fn for_doctor(doctor: Uuid) -> Self {
        AppointmentFilter { doctor: Some(doctor), ..Default::default() }
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = Some(status);
        self
    }

    fn matches(&self, appointment: &Appointment) -> bool {
        self.patient.is_none_or(|p| appointment.patient == p)
            && self.doctor.is_none_or(|d| appointment.doctor == d)
            && self.date.as_deref().is_none_or(|d| appointment.date == d)
            && self.status.is_none_or(|s| appointment.status == s)
    }
}

fn not_found() -> HospitalError {
    HospitalError::NotFound("Appointment not found".to_string())
}

#[async_trait]
pub trait AppointmentStorageEngine: Send + Sync + 'static {
    /// Persists a new appointment. Fails with `Conflict` if the doctor or the
    /// patient already holds the same date and time.
    async fn create(&self, appointment: &Appointment) -> HospitalResult<()>;
    async fn find_by_id(&self, id: &Uuid) -> HospitalResult<Option<Appointment>>;
    /// Matching appointments, newest `created_at` first.
    async fn find_by_query(&self, filter: &AppointmentFilter) -> HospitalResult<Vec<Appointment>>;
    /// Applies `patch` against the committed record and returns the result.
    async fn update(&self, id: &Uuid, patch: &AppointmentPatch) -> HospitalResult<Appointment>;
    /// Hard delete. Frees both slot index entries.
    async fn delete(&self, id: &Uuid) -> HospitalResult<Appointment>;
    /// Times held for `doctor` on `date`, in key order.
    async fn booked_slots(&self, doctor: &Uuid, date: &SlotLabel) -> HospitalResult<Vec<String>>;
}

/// Sled-backed implementation of the `AppointmentStorageEngine` trait.
#[derive(Debug, Clone)]
pub struct SledAppointmentStorage {
    appointments: Tree,
    doctor_slots: Tree,
    patient_slots: Tree,
}

impl SledAppointmentStorage {
    pub fn new(db: &Db) -> HospitalResult<Self> {
        Ok(Self {
            appointments: db.open_tree("appointments")?,
            doctor_slots: db.open_tree("doctor_slots")?,
            patient_slots: db.open_tree("patient_slots")?,
        })
    }

    fn slot_keys(appointment: &Appointment) -> HospitalResult<(Vec<u8>, Vec<u8>)> {
        let date = appointment.date_label()?;
        let time = appointment.time_label()?;
        Ok((
            slot_key(&appointment.doctor, &date, &time),
            slot_key(&appointment.patient, &date, &time),
        ))
    }

    fn scan_doctor_day(&self, doctor: &Uuid, date: &str) -> HospitalResult<Vec<Appointment>> {
        let date = SlotLabel::new(date)?;
        let mut found = Vec::new();
        for item in self.doctor_slots.scan_prefix(slot_prefix(doctor, &date)) {
            let (_key, id) = item?;
            if let Some(bytes) = self.appointments.get(&id)? {
                found.push(decode(&bytes)?);
            }
        }
        Ok(found)
    }
}

#[async_trait]
impl AppointmentStorageEngine for SledAppointmentStorage {
    async fn create(&self, appointment: &Appointment) -> HospitalResult<()> {
        let (doctor_key, patient_key) = Self::slot_keys(appointment)?;
        let id = &appointment.id.as_bytes()[..];
        let bytes = encode(appointment)?;

        (&self.appointments, &self.doctor_slots, &self.patient_slots)
            .transaction(|(appointments, doctor_slots, patient_slots)| {
                if doctor_slots.get(&doctor_key[..])?.is_some() || patient_slots.get(&patient_key[..])?.is_some() {
                    return abort(HospitalError::slot_taken());
                }
                if appointments.get(id)?.is_some() {
                    return abort(HospitalError::Conflict("Appointment already exists".to_string()));
                }
                appointments.insert(id, &bytes[..])?;
                doctor_slots.insert(&doctor_key[..], id)?;
                patient_slots.insert(&patient_key[..], id)?;
                Ok(())
            })
            .map_err(map_tx_error)?;

        info!(
            "Booked appointment {} for patient {} with doctor {} on {} at {}",
            appointment.id, appointment.patient, appointment.doctor, appointment.date, appointment.time
        );
        Ok(())
    }

    async fn find_by_id(&self, id: &Uuid) -> HospitalResult<Option<Appointment>> {
        match self.appointments.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_by_query(&self, filter: &AppointmentFilter) -> HospitalResult<Vec<Appointment>> {
        let candidates = match (&filter.doctor, &filter.date) {
            (Some(doctor), Some(date)) => self.scan_doctor_day(doctor, date)?,
            _ => self
                .appointments
                .iter()
                .values()
                .map(|bytes| decode::<Appointment>(&bytes?))
                .collect::<HospitalResult<Vec<_>>>()?,
        };

        let mut matching: Vec<Appointment> = candidates.into_iter().filter(|a| filter.matches(a)).collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        debug!("Appointment query {:?} matched {} records", filter, matching.len());
        Ok(matching)
    }

    async fn update(&self, id: &Uuid, patch: &AppointmentPatch) -> HospitalResult<Appointment> {
        let key = &id.as_bytes()[..];
        let now = Utc::now();
        let updated = self
            .appointments
            .transaction(|appointments| {
                let Some(bytes) = appointments.get(key)? else {
                    return abort(not_found());
                };
                let mut appointment: Appointment = decode_tx(&bytes)?;
                appointment
                    .apply(patch, now)
                    .map_err(|e| ConflictableTransactionError::Abort(HospitalError::from(e)))?;
                appointments.insert(key, encode_tx(&appointment)?)?;
                Ok(appointment)
            })
            .map_err(map_tx_error)?;
        debug!("Updated appointment {} (status {})", id, updated.status);
        Ok(updated)
    }

    async fn delete(&self, id: &Uuid) -> HospitalResult<Appointment> {
        let key = &id.as_bytes()[..];
        let removed = (&self.appointments, &self.doctor_slots, &self.patient_slots)
            .transaction(|(appointments, doctor_slots, patient_slots)| {
                let Some(bytes) = appointments.remove(key)? else {
                    return abort(not_found());
                };
                let appointment: Appointment = decode_tx(&bytes)?;
                let (doctor_key, patient_key) =
                    Self::slot_keys(&appointment).map_err(ConflictableTransactionError::Abort)?;
                for (tree, slot) in [(doctor_slots, doctor_key), (patient_slots, patient_key)] {
                    if tree.get(&slot[..])?.as_deref() == Some(key) {
                        tree.remove(&slot[..])?;
                    }
                }
                Ok(appointment)
            })
            .map_err(map_tx_error)?;
        info!("Deleted appointment {}", id);
        Ok(removed)
    }

    async fn booked_slots(&self, doctor: &Uuid, date: &SlotLabel) -> HospitalResult<Vec<String>> {
        let prefix = slot_prefix(doctor, date);
        self.doctor_slots
            .scan_prefix(&prefix)
            .keys()
            .map(|key| {
                let key = key?;
                Ok(String::from_utf8_lossy(&key[prefix.len()..]).into_owned())
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use models::medical::{Billing, BookingChannel, NewAppointment, PaymentMethod};

    use crate::storage_engine::open_temporary_db;

    fn storage() -> SledAppointmentStorage {
        SledAppointmentStorage::new(&open_temporary_db().unwrap()).unwrap()
    }

    fn appointment(patient: Uuid, doctor: Uuid, date: &str, time: &str) -> Appointment {
        let now = Utc::now();
        Appointment::new(
            NewAppointment {
                patient,
                doctor,
                department: None,
                date: date.into(),
                time: time.into(),
                reason: "Checkup".into(),
                billing: Billing::for_booking(500, BookingChannel::SelfService, now),
                created_by: patient,
            },
            now,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn should_reject_second_booking_of_doctor_slot() {
        let store = storage();
        let doctor = Uuid::new_v4();
        store.create(&appointment(Uuid::new_v4(), doctor, "2025-03-01", "10:00")).await.unwrap();

        let err = store
            .create(&appointment(Uuid::new_v4(), doctor, "2025-03-01", "10:00"))
            .await
            .unwrap_err();
        assert!(matches!(err, HospitalError::Conflict(ref m) if m.contains("already booked")));
        assert_eq!(store.find_by_query(&AppointmentFilter::default()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn should_reject_patient_double_booking_across_doctors() {
        let store = storage();
        let patient = Uuid::new_v4();
        store.create(&appointment(patient, Uuid::new_v4(), "2025-03-01", "10:00")).await.unwrap();
        assert!(store.create(&appointment(patient, Uuid::new_v4(), "2025-03-01", "10:00")).await.is_err());
        store.create(&appointment(patient, Uuid::new_v4(), "2025-03-01", "11:00")).await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_of_one_slot_commit_once() {
        let store = Arc::new(storage());
        let doctor = Uuid::new_v4();
        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            let appt = appointment(Uuid::new_v4(), doctor, "2025-03-01", "09:00");
            handles.push(tokio::spawn(async move { store.create(&appt).await }));
        }
        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
        let slots = store.booked_slots(&doctor, &SlotLabel::new("2025-03-01").unwrap()).await.unwrap();
        assert_eq!(slots, vec!["09:00".to_string()]);
    }

    #[tokio::test]
    async fn should_list_newest_first_and_filter() {
        let store = storage();
        let patient = Uuid::new_v4();
        let doctor = Uuid::new_v4();
        let mut first = appointment(patient, doctor, "2025-03-01", "09:00");
        first.created_at = Utc::now() - chrono::Duration::minutes(5);
        let second = appointment(patient, doctor, "2025-03-02", "09:00");
        let other = appointment(Uuid::new_v4(), Uuid::new_v4(), "2025-03-01", "09:00");
        for a in [&first, &second, &other] {
            store.create(a).await.unwrap();
        }

        let mine = store.find_by_query(&AppointmentFilter::for_patient(patient)).await.unwrap();
        assert_eq!(mine.iter().map(|a| a.id).collect::<Vec<_>>(), vec![second.id, first.id]);

        let day = AppointmentFilter { doctor: Some(doctor), date: Some("2025-03-01".into()), ..Default::default() };
        assert_eq!(store.find_by_query(&day).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn update_checks_transition_against_stored_state() {
        let store = storage();
        let appt = appointment(Uuid::new_v4(), Uuid::new_v4(), "2025-03-01", "09:00");
        store.create(&appt).await.unwrap();

        let cancel = AppointmentPatch { status: Some(AppointmentStatus::Cancelled), ..Default::default() };
        assert_eq!(store.update(&appt.id, &cancel).await.unwrap().status, AppointmentStatus::Cancelled);

        let complete = AppointmentPatch { status: Some(AppointmentStatus::Completed), ..Default::default() };
        assert!(matches!(store.update(&appt.id, &complete).await, Err(HospitalError::Validation(_))));

        let pay = AppointmentPatch { settle_payment: Some(PaymentMethod::Cash), ..Default::default() };
        let paid = store.update(&appt.id, &pay).await.unwrap();
        assert!(paid.billing.is_fully_paid());
        assert_eq!(store.find_by_id(&appt.id).await.unwrap().unwrap(), paid);
    }

    #[tokio::test]
    async fn update_of_missing_id_is_not_found() {
        let store = storage();
        let patch = AppointmentPatch { notes: Some("x".into()), ..Default::default() };
        assert!(matches!(store.update(&Uuid::new_v4(), &patch).await, Err(HospitalError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_frees_the_slot() {
        let store = storage();
        let doctor = Uuid::new_v4();
        let appt = appointment(Uuid::new_v4(), doctor, "2025-03-01", "09:00");
        store.create(&appt).await.unwrap();
        store.delete(&appt.id).await.unwrap();

        assert!(store.find_by_id(&appt.id).await.unwrap().is_none());
        assert!(matches!(store.delete(&appt.id).await, Err(HospitalError::NotFound(_))));
        store.create(&appointment(Uuid::new_v4(), doctor, "2025-03-01", "09:00")).await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_appointment_keeps_its_slot() {
        let store = storage();
        let doctor = Uuid::new_v4();
        let appt = appointment(Uuid::new_v4(), doctor, "2025-03-01", "09:00");
        store.create(&appt).await.unwrap();
        let cancel = AppointmentPatch { status: Some(AppointmentStatus::Cancelled), ..Default::default() };
        store.update(&appt.id, &cancel).await.unwrap();

        assert!(store.create(&appointment(Uuid::new_v4(), doctor, "2025-03-01", "09:00")).await.is_err());
    }

    #[tokio::test]
    async fn persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let appt = appointment(Uuid::new_v4(), Uuid::new_v4(), "2025-03-01", "09:00");
        {
            let db = crate::storage_engine::open_sled_db(dir.path()).unwrap();
            SledAppointmentStorage::new(&db).unwrap().create(&appt).await.unwrap();
            db.flush().unwrap();
        }
        let db = crate::storage_engine::open_sled_db(dir.path()).unwrap();
        let stored = SledAppointmentStorage::new(&db).unwrap().find_by_id(&appt.id).await.unwrap();
        assert_eq!(stored, Some(appt));
    }
}
