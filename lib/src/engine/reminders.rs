// lib/src/engine/reminders.rs
use std::time::Duration;

use chrono::{Local, NaiveDateTime, TimeDelta};
use log::{debug, error, info};
use tokio::task::JoinHandle;

use models::errors::HospitalResult;
use models::medical::{Appointment, AppointmentPatch, ReminderKind};
use notifications_service::NotificationEvent;

use crate::engine::appointments::AppointmentManager;

const SLOT_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Appointment dates and times are wall-clock values in the hospital's
/// local time.
fn slot_start(appointment: &Appointment) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&format!("{} {}", appointment.date, appointment.time), SLOT_FORMAT).ok()
}

/// Sends day-before and hour-before reminders for scheduled appointments.
/// Each reminder is recorded on the appointment before it is queued, so a
/// reminder goes out at most once.
#[derive(Clone)]
pub struct ReminderSweep {
    appointments: AppointmentManager,
}

impl ReminderSweep {
    pub fn new(appointments: AppointmentManager) -> Self {
        Self { appointments }
    }

    /// One pass over all scheduled appointments. Returns the number of
    /// reminders queued.
    pub async fn run_once(&self, now: NaiveDateTime) -> HospitalResult<usize> {
        let mut sent = 0;
        for appointment in self.appointments.scheduled().await? {
            let Some(start) = slot_start(&appointment) else {
                debug!(
                    "Skipping reminder for appointment {}: unparseable slot {} {}",
                    appointment.id, appointment.date, appointment.time
                );
                continue;
            };
            let until = start - now;
            if until < TimeDelta::zero() {
                continue;
            }

            let reminders = &appointment.reminders;
            // Inside the last hour only the hour-before reminder is sent; the
            // day-before one is marked so it does not follow later.
            if until <= TimeDelta::hours(1) && !reminders.hour_before_sent {
                if !reminders.day_before_sent {
                    self.mark(&appointment, ReminderKind::DayBefore).await?;
                }
                sent += self.remind(&appointment, ReminderKind::HourBefore).await?;
            } else if until <= TimeDelta::hours(24) && !reminders.day_before_sent {
                sent += self.remind(&appointment, ReminderKind::DayBefore).await?;
            }
        }
        if sent > 0 {
            info!("Queued {} appointment reminder(s)", sent);
        }
        Ok(sent)
    }

    async fn mark(&self, appointment: &Appointment, kind: ReminderKind) -> HospitalResult<()> {
        let patch = AppointmentPatch { reminder_sent: Some(kind), ..Default::default() };
        self.appointments.apply(&appointment.id, &patch).await?;
        Ok(())
    }

    async fn remind(&self, appointment: &Appointment, kind: ReminderKind) -> HospitalResult<usize> {
        let Some(contacts) = self.appointments.contacts(appointment).await? else {
            return Ok(0);
        };
        self.mark(appointment, kind).await?;
        self.appointments.notifications().push(NotificationEvent::AppointmentReminder {
            kind,
            patient_email: contacts.patient_email,
            patient_name: contacts.patient_name,
            doctor_name: contacts.doctor_name,
            date: appointment.date.clone(),
            time: appointment.time.clone(),
        });
        Ok(1)
    }

    /// Runs `run_once` every `period` until the runtime shuts down.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                if let Err(e) = self.run_once(Local::now().naive_local()).await {
                    error!("Reminder sweep failed: {}", e);
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use chrono::{NaiveDate, Utc};
    use models::medical::{Billing, BookingChannel, NewAppointment, NewUser, Role};
    use notifications_service::NotificationQueue;
    use tokio::sync::mpsc::UnboundedReceiver;
    use uuid::Uuid;

    use crate::engine::doctors::DoctorDirectory;
    use crate::engine::users::UserDirectory;
    use crate::storage_engine::{
        open_temporary_db, AppointmentStorageEngine, SledAppointmentStorage, SledDoctorStorage, SledUserStorage,
    };

    struct Fixture {
        sweep: ReminderSweep,
        store: Arc<SledAppointmentStorage>,
        events: UnboundedReceiver<NotificationEvent>,
        patient: Uuid,
        doctor: Uuid,
    }

    async fn fixture() -> Fixture {
        let db = open_temporary_db().unwrap();
        let users = UserDirectory::new(Arc::new(SledUserStorage::new(&db).unwrap()));
        let doctors = DoctorDirectory::new(Arc::new(SledDoctorStorage::new(&db).unwrap()), users.clone());
        let store = Arc::new(SledAppointmentStorage::new(&db).unwrap());
        let (queue, events) = NotificationQueue::channel();
        let manager = AppointmentManager::new(store.clone(), users.clone(), doctors, queue);

        let account = |email: &str, role| NewUser {
            name: "Nikhil Jain".into(),
            email: email.into(),
            password: "secret123".into(),
            role,
            phone: None,
            date_of_birth: None,
        };
        let patient = users.register(account("nikhil@example.com", Role::Patient)).await.unwrap();
        let doctor = users.register(account("doc@hospital.org", Role::Doctor)).await.unwrap();

        Fixture { sweep: ReminderSweep::new(manager), store, events, patient: patient.id, doctor: doctor.id }
    }

    async fn book(f: &Fixture, date: &str, time: &str) -> Uuid {
        let now = Utc::now();
        let appt = Appointment::new(
            NewAppointment {
                patient: f.patient,
                doctor: f.doctor,
                department: None,
                date: date.into(),
                time: time.into(),
                reason: "Follow-up".into(),
                billing: Billing::for_booking(400, BookingChannel::SelfService, now),
                created_by: f.patient,
            },
            now,
        )
        .unwrap();
        f.store.create(&appt).await.unwrap();
        appt.id
    }

    fn at(date: &str, time: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("{date} {time}"), SLOT_FORMAT).unwrap()
    }

    #[tokio::test]
    async fn day_before_reminder_is_sent_once() {
        let mut f = fixture().await;
        let id = book(&f, "2031-03-10", "15:00").await;

        assert_eq!(f.sweep.run_once(at("2031-03-09", "09:00")).await.unwrap(), 0);
        assert_eq!(f.sweep.run_once(at("2031-03-09", "16:00")).await.unwrap(), 1);
        assert_eq!(f.sweep.run_once(at("2031-03-09", "17:00")).await.unwrap(), 0);

        assert!(matches!(
            f.events.try_recv(),
            Ok(NotificationEvent::AppointmentReminder { kind: ReminderKind::DayBefore, .. })
        ));
        let stored = f.store.find_by_id(&id).await.unwrap().unwrap();
        assert!(stored.reminders.day_before_sent);
        assert!(!stored.reminders.hour_before_sent);
    }

    #[tokio::test]
    async fn hour_before_follows_day_before() {
        let mut f = fixture().await;
        book(&f, "2031-03-10", "15:00").await;

        assert_eq!(f.sweep.run_once(at("2031-03-10", "08:00")).await.unwrap(), 1);
        assert_eq!(f.sweep.run_once(at("2031-03-10", "14:30")).await.unwrap(), 1);
        assert_eq!(f.sweep.run_once(at("2031-03-10", "14:45")).await.unwrap(), 0);

        let kinds: Vec<_> = std::iter::from_fn(|| f.events.try_recv().ok())
            .map(|e| match e {
                NotificationEvent::AppointmentReminder { kind, .. } => kind,
                other => panic!("unexpected event {other:?}"),
            })
            .collect();
        assert_eq!(kinds, vec![ReminderKind::DayBefore, ReminderKind::HourBefore]);
    }

    #[tokio::test]
    async fn late_booking_gets_only_the_hour_reminder() {
        let f = fixture().await;
        let id = book(&f, "2031-03-10", "15:00").await;

        assert_eq!(f.sweep.run_once(at("2031-03-10", "14:20")).await.unwrap(), 1);
        assert_eq!(f.sweep.run_once(at("2031-03-10", "14:40")).await.unwrap(), 0);
        let stored = f.store.find_by_id(&id).await.unwrap().unwrap();
        assert!(stored.reminders.day_before_sent && stored.reminders.hour_before_sent);
    }

    #[tokio::test]
    async fn past_and_unparseable_slots_are_skipped() {
        let f = fixture().await;
        book(&f, "2031-03-10", "15:00").await;
        book(&f, "next tuesday", "after lunch").await;

        let now = NaiveDate::from_ymd_opt(2031, 3, 11).unwrap().and_hms_opt(9, 0, 0).unwrap();
        assert_eq!(f.sweep.run_once(now).await.unwrap(), 0);
    }
}
