// lib/src/engine/appointments.rs
// Booking, lifecycle changes, prescriptions and payment for appointments.
// Every operation authorizes through `security::authorize`, writes through
// the storage engine, and queues patient notifications after the write has
// committed.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{debug, error, info, warn};
use serde::Deserialize;
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::identifiers::SlotLabel;
use models::medical::{
    Appointment, AppointmentPatch, AppointmentStatus, AppointmentView, Billing, BookingChannel, Medicine,
    NewAppointment, PaymentMethod, Prescription, Role,
};
use notifications_service::{NotificationEvent, NotificationQueue};
use security::{appointment_scope, authorize, Action, AppointmentScope, Caller, Resource};

use crate::engine::doctors::DoctorDirectory;
use crate::engine::users::UserDirectory;
use crate::storage_engine::{AppointmentFilter, AppointmentStorageEngine};

/// Body of a booking request. `doctor_id` is the doctor's user id. The
/// patient fields are only read for walk-in bookings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookingRequest {
    pub doctor_id: Option<Uuid>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub reason: Option<String>,
    pub department: Option<String>,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    #[serde(rename = "patientDOB")]
    pub patient_dob: Option<NaiveDate>,
}

/// Fields a caller may change through a plain appointment update.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppointmentUpdate {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrescriptionRequest {
    pub diagnosis: String,
    pub medicines: Vec<Medicine>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaymentRequest {
    pub payment_method: Option<PaymentMethod>,
}

fn not_found() -> HospitalError {
    HospitalError::NotFound("Appointment not found".to_string())
}

fn filled(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn resource_of(appointment: &Appointment) -> Resource {
    Resource::Appointment { patient: appointment.patient, doctor: appointment.doctor }
}

fn hides_prescription(caller: &Caller, appointment: &Appointment) -> bool {
    caller.is(Role::Patient) && !appointment.billing.is_fully_paid()
}

#[derive(Clone)]
pub struct AppointmentManager {
    store: Arc<dyn AppointmentStorageEngine>,
    users: UserDirectory,
    doctors: DoctorDirectory,
    notifications: NotificationQueue,
}

impl AppointmentManager {
    pub fn new(
        store: Arc<dyn AppointmentStorageEngine>,
        users: UserDirectory,
        doctors: DoctorDirectory,
        notifications: NotificationQueue,
    ) -> Self {
        Self { store, users, doctors, notifications }
    }

    pub async fn book(&self, caller: &Caller, request: BookingRequest) -> HospitalResult<AppointmentView> {
        let (Some(doctor_id), Some(date), Some(time), Some(reason)) = (
            request.doctor_id,
            filled(&request.date),
            filled(&request.time),
            filled(&request.reason),
        ) else {
            return Err(HospitalError::invalid("Please provide doctor, date, time, and reason"));
        };

        let (patient, channel) = match caller.role {
            Role::Staff | Role::Admin => {
                authorize(caller, Action::BookForWalkIn, Resource::None)?;
                let (Some(name), Some(email)) = (filled(&request.patient_name), filled(&request.patient_email))
                else {
                    return Err(HospitalError::invalid("Please provide patient name and email for offline booking"));
                };
                let patient = self.users.register_patient(name, email, request.patient_dob).await?;
                (patient.id, BookingChannel::StaffAssisted)
            }
            _ => {
                authorize(caller, Action::BookForSelf, Resource::None)?;
                (caller.id, BookingChannel::SelfService)
            }
        };

        let doctor = self.doctors.bookable(&doctor_id).await?;
        let now = Utc::now();
        let appointment = Appointment::new(
            NewAppointment {
                patient,
                doctor: doctor.user,
                department: request.department,
                date: date.to_string(),
                time: time.to_string(),
                reason: reason.to_string(),
                billing: Billing::for_booking(doctor.consultation_fee, channel, now),
                created_by: caller.id,
            },
            now,
        )?;
        self.store.create(&appointment).await?;
        info!(
            "Booked appointment {} with doctor {} on {} at {} ({:?})",
            appointment.id, doctor.id, appointment.date, appointment.time, channel
        );

        let view = self.committed_view(caller, &appointment).await;
        if let Some(patient) = &view.patient {
            self.notifications.push(NotificationEvent::AppointmentConfirmed {
                patient_email: patient.email.clone(),
                patient_name: patient.name.clone(),
                doctor_name: doctor.name.clone(),
                date: appointment.date.clone(),
                time: appointment.time.clone(),
                reason: appointment.reason.clone(),
                status: appointment.status.to_string(),
                consultation_fee: appointment.billing.consultation_fee(),
                advance_paid_amount: appointment.billing.paid_amount(),
                remaining_amount: appointment.billing.remaining(),
            });
        }
        Ok(view)
    }

    pub async fn list(&self, caller: &Caller) -> HospitalResult<Vec<AppointmentView>> {
        let filter = match appointment_scope(caller)? {
            AppointmentScope::All => AppointmentFilter::default(),
            AppointmentScope::Patient(id) => AppointmentFilter::for_patient(id),
            AppointmentScope::Doctor(id) => AppointmentFilter::for_doctor(id),
        };
        let appointments = self.store.find_by_query(&filter).await?;
        let mut views = Vec::with_capacity(appointments.len());
        for appointment in &appointments {
            views.push(self.view_for(caller, appointment).await?);
        }
        Ok(views)
    }

    pub async fn get(&self, caller: &Caller, id: &Uuid) -> HospitalResult<AppointmentView> {
        let appointment = self.fetch(id).await?;
        authorize(caller, Action::ViewAppointment, resource_of(&appointment))?;
        self.view_for(caller, &appointment).await
    }

    /// Status and notes changes. Completion only happens through a
    /// prescription, and nothing moves back to scheduled.
    pub async fn update(&self, caller: &Caller, id: &Uuid, update: AppointmentUpdate) -> HospitalResult<AppointmentView> {
        let appointment = self.fetch(id).await?;
        let resource = resource_of(&appointment);
        if update.status.is_none() && update.notes.is_none() {
            return Err(HospitalError::invalid("Please provide a status or notes to update"));
        }

        match update.status {
            Some(AppointmentStatus::Cancelled) => authorize(caller, Action::CancelAppointment, resource)?,
            Some(AppointmentStatus::NoShow) => authorize(caller, Action::MarkNoShow, resource)?,
            Some(AppointmentStatus::Completed) => {
                return Err(HospitalError::invalid("Appointments are completed by adding a prescription"));
            }
            Some(AppointmentStatus::Scheduled) => {
                return Err(HospitalError::invalid("An appointment cannot be moved back to scheduled"));
            }
            None => {}
        }
        if update.notes.is_some() {
            authorize(caller, Action::EditNotes, resource)?;
        }

        let patch = AppointmentPatch { status: update.status, notes: update.notes, ..Default::default() };
        let updated = self.store.update(id, &patch).await?;
        debug!("Appointment {} updated by {} {}", id, caller.role, caller.id);
        self.view_for(caller, &updated).await
    }

    pub async fn attach_prescription(
        &self,
        caller: &Caller,
        id: &Uuid,
        request: PrescriptionRequest,
    ) -> HospitalResult<AppointmentView> {
        let appointment = self.fetch(id).await?;
        authorize(caller, Action::AttachPrescription, resource_of(&appointment))?;

        let prescription = Prescription::new(&request.diagnosis, request.medicines, caller.id, Utc::now())?;
        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Completed),
            prescription: Some(prescription),
            ..Default::default()
        };
        let updated = self.store.update(id, &patch).await?;
        info!("Prescription attached to appointment {}", id);

        if updated.billing.is_paid() {
            self.send_receipt(&updated).await;
        }
        Ok(self.committed_view(caller, &updated).await)
    }

    pub async fn record_payment(&self, caller: &Caller, id: &Uuid, request: PaymentRequest) -> HospitalResult<AppointmentView> {
        let appointment = self.fetch(id).await?;
        authorize(caller, Action::RecordPayment, resource_of(&appointment))?;

        let method = request.payment_method.unwrap_or_default();
        let patch = AppointmentPatch { settle_payment: Some(method), ..Default::default() };
        let updated = self.store.update(id, &patch).await?;
        info!("Payment for appointment {} settled by {}", id, method);

        if updated.prescription.as_ref().is_some_and(Prescription::has_diagnosis) {
            self.send_receipt(&updated).await;
        }
        Ok(self.committed_view(caller, &updated).await)
    }

    pub async fn delete(&self, caller: &Caller, id: &Uuid) -> HospitalResult<()> {
        authorize(caller, Action::DeleteAppointment, Resource::None)?;
        let removed = self.store.delete(id).await?;
        info!("Appointment {} deleted by admin {}", removed.id, caller.id);
        Ok(())
    }

    /// Times a doctor already has taken on `date`.
    pub async fn booked_slots(&self, caller: &Caller, doctor: &Uuid, date: &str) -> HospitalResult<Vec<String>> {
        authorize(caller, Action::ViewBookedSlots, Resource::None)?;
        let date = SlotLabel::new(date)?;
        self.store.booked_slots(doctor, &date).await
    }

    pub(crate) async fn scheduled(&self) -> HospitalResult<Vec<Appointment>> {
        let filter = AppointmentFilter::default().with_status(AppointmentStatus::Scheduled);
        self.store.find_by_query(&filter).await
    }

    pub(crate) async fn apply(&self, id: &Uuid, patch: &AppointmentPatch) -> HospitalResult<Appointment> {
        self.store.update(id, patch).await
    }

    pub(crate) fn notifications(&self) -> &NotificationQueue {
        &self.notifications
    }

    /// Patient email and name plus the doctor's display name, if both
    /// accounts still exist.
    pub(crate) async fn contacts(&self, appointment: &Appointment) -> HospitalResult<Option<Contacts>> {
        let Some(patient) = self.users.summary(&appointment.patient).await? else {
            warn!("Appointment {} refers to missing patient {}", appointment.id, appointment.patient);
            return Ok(None);
        };
        let doctor = match self.doctors.summary_for_user(&appointment.doctor).await? {
            Some(summary) => Some((summary.name, summary.email)),
            None => self.users.summary(&appointment.doctor).await?.map(|u| (u.name, u.email)),
        };
        let Some((doctor_name, doctor_email)) = doctor else {
            warn!("Appointment {} refers to missing doctor {}", appointment.id, appointment.doctor);
            return Ok(None);
        };
        Ok(Some(Contacts {
            patient_email: patient.email,
            patient_name: patient.name,
            doctor_name,
            doctor_email,
        }))
    }

    async fn fetch(&self, id: &Uuid) -> HospitalResult<Appointment> {
        self.store.find_by_id(id).await?.ok_or_else(not_found)
    }

    /// Queues the prescription receipt. Lookup failures are logged and
    /// dropped since the payment or prescription is already stored.
    async fn send_receipt(&self, appointment: &Appointment) {
        let Some(prescription) = &appointment.prescription else {
            return;
        };
        let contacts = match self.contacts(appointment).await {
            Ok(Some(contacts)) => contacts,
            Ok(None) => return,
            Err(e) => {
                error!("Receipt for appointment {} not sent: {}", appointment.id, e);
                return;
            }
        };
        self.notifications.push(NotificationEvent::PrescriptionReceipt {
            patient_email: contacts.patient_email,
            patient_name: contacts.patient_name,
            doctor_name: contacts.doctor_name,
            doctor_email: contacts.doctor_email,
            date: appointment.date.clone(),
            time: appointment.time.clone(),
            diagnosis: prescription.diagnosis.clone(),
            medicines: prescription.medicines.clone(),
            consultation_fee: appointment.billing.consultation_fee(),
            payment_method: appointment.billing.payment_method(),
            paid_at: appointment.billing.paid_at(),
        });
    }

    /// View of a record that was just written. Failing to resolve names
    /// leaves them empty instead of failing a committed change.
    async fn committed_view(&self, caller: &Caller, appointment: &Appointment) -> AppointmentView {
        match self.view_for(caller, appointment).await {
            Ok(view) => view,
            Err(e) => {
                warn!("Could not resolve participants of appointment {}: {}", appointment.id, e);
                AppointmentView::new(appointment, None, None, hides_prescription(caller, appointment))
            }
        }
    }

    /// Resolves patient and doctor for display. A patient who has not paid
    /// in full sees that a prescription exists but not its content.
    async fn view_for(&self, caller: &Caller, appointment: &Appointment) -> HospitalResult<AppointmentView> {
        let patient = self.users.summary(&appointment.patient).await?;
        let doctor = self.doctors.summary_for_user(&appointment.doctor).await?;
        Ok(AppointmentView::new(appointment, patient, doctor, hides_prescription(caller, appointment)))
    }
}

pub(crate) struct Contacts {
    pub patient_email: String,
    pub patient_name: String,
    pub doctor_name: String,
    pub doctor_email: String,
}
