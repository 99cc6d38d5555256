// models/src/medical/appointment.rs
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};
use crate::identifiers::SlotLabel;
use crate::medical::billing::{Billing, BillingView, PaymentMethod};
use crate::medical::doctor::DoctorSummary;
use crate::medical::prescription::{Prescription, PrescriptionView};
use crate::medical::user::UserSummary;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AppointmentStatus {
    #[default]
    Scheduled,
    Completed,
    Cancelled,
    NoShow,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Scheduled => "scheduled",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
            AppointmentStatus::NoShow => "no-show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, AppointmentStatus::Scheduled)
    }

    /// Only `scheduled` may move, and only forward. Re-applying the current
    /// status is allowed so a prescription can be rewritten on a completed
    /// appointment.
    pub fn can_transition_to(&self, next: AppointmentStatus) -> bool {
        *self == next || (!self.is_terminal() && next != AppointmentStatus::Scheduled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AppointmentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(AppointmentStatus::Scheduled),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            "no-show" => Ok(AppointmentStatus::NoShow),
            other => Err(ValidationError::Message(format!("Unknown appointment status: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReminderKind {
    DayBefore,
    HourBefore,
}

/// Which reminders have gone out for an appointment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub day_before_sent: bool,
    pub hour_before_sent: bool,
    pub day_before_sent_at: Option<DateTime<Utc>>,
    pub hour_before_sent_at: Option<DateTime<Utc>>,
}

impl Reminders {
    pub fn is_sent(&self, kind: ReminderKind) -> bool {
        match kind {
            ReminderKind::DayBefore => self.day_before_sent,
            ReminderKind::HourBefore => self.hour_before_sent,
        }
    }

    pub fn mark_sent(&mut self, kind: ReminderKind, at: DateTime<Utc>) {
        match kind {
            ReminderKind::DayBefore => {
                self.day_before_sent = true;
                self.day_before_sent_at = Some(at);
            }
            ReminderKind::HourBefore => {
                self.hour_before_sent = true;
                self.hour_before_sent_at = Some(at);
            }
        }
    }
}

/// Input for [`Appointment::new`].
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub patient: Uuid,
    pub doctor: Uuid,
    pub department: Option<String>,
    pub date: String,
    pub time: String,
    pub reason: String,
    pub billing: Billing,
    pub created_by: Uuid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    pub id: Uuid,
    pub patient: Uuid,
    pub doctor: Uuid,
    pub department: Option<String>,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub prescription: Option<Prescription>,
    pub billing: Billing,
    pub reminders: Reminders,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    pub fn new(new: NewAppointment, now: DateTime<Utc>) -> ValidationResult<Self> {
        let date = SlotLabel::new(&new.date)?;
        let time = SlotLabel::new(&new.time)?;
        let reason = new.reason.trim();
        if reason.is_empty() {
            return Err(ValidationError::MissingField("a reason for the appointment"));
        }

        Ok(Appointment {
            id: Uuid::new_v4(),
            patient: new.patient,
            doctor: new.doctor,
            department: new.department.filter(|d| !d.trim().is_empty()),
            date: date.into_inner(),
            time: time.into_inner(),
            status: AppointmentStatus::Scheduled,
            reason: reason.to_string(),
            notes: None,
            prescription: None,
            billing: new.billing,
            reminders: Reminders::default(),
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn date_label(&self) -> ValidationResult<SlotLabel> {
        SlotLabel::new(&self.date)
    }

    pub fn time_label(&self) -> ValidationResult<SlotLabel> {
        SlotLabel::new(&self.time)
    }

    /// Applies `patch`, refusing any status change the lifecycle forbids.
    /// On error the appointment is left untouched.
    pub fn apply(&mut self, patch: &AppointmentPatch, now: DateTime<Utc>) -> ValidationResult<()> {
        if let Some(next) = patch.status {
            if !self.status.can_transition_to(next) {
                return Err(ValidationError::InvalidTransition { from: self.status, to: next });
            }
        }

        if let Some(next) = patch.status {
            self.status = next;
        }
        if let Some(notes) = &patch.notes {
            self.notes = Some(notes.clone());
        }
        if let Some(prescription) = &patch.prescription {
            self.prescription = Some(prescription.clone());
        }
        if let Some(method) = patch.settle_payment {
            self.billing.settle(method, now);
        }
        if let Some(kind) = patch.reminder_sent {
            self.reminders.mark_sent(kind, now);
        }
        self.updated_at = now;
        Ok(())
    }
}

/// A partial update. Every field left `None` is untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub notes: Option<String>,
    pub prescription: Option<Prescription>,
    pub settle_payment: Option<PaymentMethod>,
    pub reminder_sent: Option<ReminderKind>,
}

impl AppointmentPatch {
    pub fn is_empty(&self) -> bool {
        *self == AppointmentPatch::default()
    }
}

/// An appointment with its patient and doctor resolved for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentView {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub patient: Option<UserSummary>,
    pub doctor: Option<DoctorSummary>,
    pub department: Option<String>,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub reason: String,
    pub notes: Option<String>,
    pub prescription: Option<PrescriptionView>,
    pub prescription_locked: bool,
    pub billing: BillingView,
    pub reminders: Reminders,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AppointmentView {
    pub fn new(
        appointment: &Appointment,
        patient: Option<UserSummary>,
        doctor: Option<DoctorSummary>,
        hide_prescription: bool,
    ) -> Self {
        AppointmentView {
            id: appointment.id,
            patient_id: appointment.patient,
            doctor_id: appointment.doctor,
            patient,
            doctor,
            department: appointment.department.clone(),
            date: appointment.date.clone(),
            time: appointment.time.clone(),
            status: appointment.status,
            reason: appointment.reason.clone(),
            notes: appointment.notes.clone(),
            prescription: appointment
                .prescription
                .as_ref()
                .map(|p| PrescriptionView::from_prescription(p, hide_prescription)),
            prescription_locked: hide_prescription && appointment.prescription.is_some(),
            billing: appointment.billing.view(),
            reminders: appointment.reminders.clone(),
            created_by: appointment.created_by,
            created_at: appointment.created_at,
            updated_at: appointment.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::medical::billing::BookingChannel;

    fn booking() -> Appointment {
        let now = Utc::now();
        Appointment::new(
            NewAppointment {
                patient: Uuid::new_v4(),
                doctor: Uuid::new_v4(),
                department: None,
                date: "2025-03-01".into(),
                time: "10:30".into(),
                reason: "Checkup".into(),
                billing: Billing::for_booking(500, BookingChannel::SelfService, now),
                created_by: Uuid::new_v4(),
            },
            now,
        )
        .unwrap()
    }

    #[test]
    fn new_appointment_starts_scheduled() {
        let appt = booking();
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert!(appt.prescription.is_none());
        assert!(!appt.reminders.day_before_sent);
    }

    #[test]
    fn should_require_reason() {
        let now = Utc::now();
        let err = Appointment::new(
            NewAppointment {
                patient: Uuid::new_v4(),
                doctor: Uuid::new_v4(),
                department: None,
                date: "2025-03-01".into(),
                time: "10:30".into(),
                reason: " ".into(),
                billing: Billing::for_booking(0, BookingChannel::SelfService, now),
                created_by: Uuid::new_v4(),
            },
            now,
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("a reason for the appointment"));
    }

    #[test]
    fn status_lifecycle_only_moves_out_of_scheduled() {
        use AppointmentStatus::*;
        for next in [Completed, Cancelled, NoShow] {
            assert!(Scheduled.can_transition_to(next));
        }
        assert!(!Scheduled.is_terminal());
        for from in [Completed, Cancelled, NoShow] {
            assert!(from.is_terminal());
            for next in [Scheduled, Completed, Cancelled, NoShow] {
                assert_eq!(from.can_transition_to(next), from == next, "{from} -> {next}");
            }
        }
    }

    #[test]
    fn rejected_patch_leaves_appointment_untouched() {
        let mut appt = booking();
        appt.apply(&AppointmentPatch { status: Some(AppointmentStatus::Cancelled), ..Default::default() }, Utc::now())
            .unwrap();
        let before = appt.clone();

        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::Completed),
            notes: Some("late".into()),
            ..Default::default()
        };
        assert!(appt.apply(&patch, Utc::now()).is_err());
        assert_eq!(appt, before);
    }

    #[test]
    fn patch_settles_payment_and_marks_reminders() {
        let mut appt = booking();
        let patch = AppointmentPatch {
            settle_payment: Some(PaymentMethod::Card),
            reminder_sent: Some(ReminderKind::DayBefore),
            ..Default::default()
        };
        appt.apply(&patch, Utc::now()).unwrap();
        assert!(appt.billing.is_fully_paid());
        assert!(appt.reminders.is_sent(ReminderKind::DayBefore));
        assert!(!appt.reminders.is_sent(ReminderKind::HourBefore));
    }

    #[test]
    fn status_uses_kebab_case_on_the_wire() {
        assert_eq!(serde_json::to_string(&AppointmentStatus::NoShow).unwrap(), "\"no-show\"");
        assert_eq!("no-show".parse::<AppointmentStatus>().unwrap(), AppointmentStatus::NoShow);
    }
}
