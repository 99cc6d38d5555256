// notifications_service/src/notifications.rs
// Outbound patient notifications. The engine pushes events onto a queue and
// never waits for delivery; a background task hands each event to a Notifier.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use models::errors::{HospitalError, HospitalResult};
use models::medical::{Medicine, PaymentMethod, ReminderKind};

pub const HOSPITAL_NAME: &str = "Chikitsamitra Hospital";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NotificationEvent {
    #[serde(rename_all = "camelCase")]
    AppointmentConfirmed {
        patient_email: String,
        patient_name: String,
        doctor_name: String,
        date: String,
        time: String,
        reason: String,
        status: String,
        consultation_fee: u64,
        advance_paid_amount: u64,
        remaining_amount: u64,
    },
    #[serde(rename_all = "camelCase")]
    PrescriptionReceipt {
        patient_email: String,
        patient_name: String,
        doctor_name: String,
        doctor_email: String,
        date: String,
        time: String,
        diagnosis: String,
        medicines: Vec<Medicine>,
        consultation_fee: u64,
        payment_method: Option<PaymentMethod>,
        paid_at: Option<DateTime<Utc>>,
    },
    #[serde(rename_all = "camelCase")]
    AppointmentReminder {
        kind: ReminderKind,
        patient_email: String,
        patient_name: String,
        doctor_name: String,
        date: String,
        time: String,
    },
}

impl NotificationEvent {
    pub fn recipient(&self) -> &str {
        match self {
            NotificationEvent::AppointmentConfirmed { patient_email, .. }
            | NotificationEvent::PrescriptionReceipt { patient_email, .. }
            | NotificationEvent::AppointmentReminder { patient_email, .. } => patient_email,
        }
    }

    pub fn subject(&self) -> String {
        match self {
            NotificationEvent::AppointmentConfirmed { .. } => {
                format!("Appointment Confirmation - {}", HOSPITAL_NAME)
            }
            NotificationEvent::PrescriptionReceipt { .. } => {
                format!("Prescription & Payment Receipt - {}", HOSPITAL_NAME)
            }
            NotificationEvent::AppointmentReminder { kind: ReminderKind::DayBefore, .. } => {
                format!("Appointment Reminder: tomorrow - {}", HOSPITAL_NAME)
            }
            NotificationEvent::AppointmentReminder { kind: ReminderKind::HourBefore, .. } => {
                format!("Urgent: your appointment starts within the hour - {}", HOSPITAL_NAME)
            }
        }
    }

    /// Plain-text body, used by the log notifier and sent alongside the
    /// structured event to the webhook.
    pub fn render(&self) -> String {
        match self {
            NotificationEvent::AppointmentConfirmed {
                patient_name,
                doctor_name,
                date,
                time,
                reason,
                status,
                consultation_fee,
                advance_paid_amount,
                remaining_amount,
                ..
            } => format!(
                "Dear {patient_name}, your appointment with {doctor_name} on {date} at {time} is {status}. \
                 Reason: {reason}. Fee {consultation_fee}, paid now {advance_paid_amount}, \
                 remaining at the hospital {remaining_amount}."
            ),
            NotificationEvent::PrescriptionReceipt {
                patient_name,
                doctor_name,
                date,
                time,
                diagnosis,
                medicines,
                consultation_fee,
                payment_method,
                ..
            } => {
                let medicines = medicines
                    .iter()
                    .map(|m| format!("{} {} {} for {}", m.name, m.dosage, m.frequency, m.duration))
                    .collect::<Vec<_>>()
                    .join("; ");
                let method = payment_method.map(|m| m.to_string()).unwrap_or_else(|| "online".to_string());
                format!(
                    "Dear {patient_name}, your consultation with Dr. {doctor_name} on {date} at {time} is complete. \
                     Diagnosis: {diagnosis}. Medicines: {medicines}. Paid {consultation_fee} by {method}."
                )
            }
            NotificationEvent::AppointmentReminder { kind, patient_name, doctor_name, date, time, .. } => {
                let when = match kind {
                    ReminderKind::DayBefore => "in 24 hours",
                    ReminderKind::HourBefore => "within the hour",
                };
                format!("Dear {patient_name}, your appointment with {doctor_name} on {date} at {time} is {when}.")
            }
        }
    }
}

/// Delivers one event. Implementations report delivery problems as
/// `HospitalError::ExternalServiceFailure`.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn send(&self, event: &NotificationEvent) -> HospitalResult<()>;
}

/// Writes every event to the log. The default when no gateway is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, event: &NotificationEvent) -> HospitalResult<()> {
        info!("[notification] to={} subject=\"{}\" body=\"{}\"", event.recipient(), event.subject(), event.render());
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to: &'a str,
    subject: String,
    text: String,
    event: &'a NotificationEvent,
}

/// POSTs events as JSON to an email gateway.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Self {
        WebhookNotifier { client: reqwest::Client::new(), url: url.into() }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, event: &NotificationEvent) -> HospitalResult<()> {
        let payload = WebhookPayload {
            to: event.recipient(),
            subject: event.subject(),
            text: event.render(),
            event,
        };
        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| HospitalError::ExternalServiceFailure(format!("email gateway unreachable: {}", e)))?;
        if !response.status().is_success() {
            return Err(HospitalError::ExternalServiceFailure(format!(
                "email gateway answered {}",
                response.status()
            )));
        }
        debug!("Email gateway accepted '{}' for {}", payload.subject, payload.to);
        Ok(())
    }
}

/// Producer side of the notification channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NotificationQueue {
    tx: UnboundedSender<NotificationEvent>,
}

impl NotificationQueue {
    /// A queue plus its receiving end, without a dispatcher. Tests read the
    /// receiver directly.
    pub fn channel() -> (Self, UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (NotificationQueue { tx }, rx)
    }

    /// A queue whose events are drained into `notifier` by a spawned task.
    /// Must be called inside a tokio runtime.
    pub fn spawn(notifier: Arc<dyn Notifier>) -> (Self, JoinHandle<()>) {
        let (queue, rx) = Self::channel();
        let handle = tokio::spawn(dispatch(rx, notifier));
        (queue, handle)
    }

    /// Never fails the caller. A closed channel is logged and the event dropped.
    pub fn push(&self, event: NotificationEvent) {
        if let Err(e) = self.tx.send(event) {
            warn!("Notification dropped, dispatcher is gone: {}", e.0.subject());
        }
    }
}

pub async fn dispatch(mut rx: UnboundedReceiver<NotificationEvent>, notifier: Arc<dyn Notifier>) {
    while let Some(event) = rx.recv().await {
        if let Err(e) = notifier.send(&event).await {
            error!("Failed to deliver '{}' to {}: {}", event.subject(), event.recipient(), e);
        }
    }
    debug!("Notification dispatcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<NotificationEvent>>,
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, event: &NotificationEvent) -> HospitalResult<()> {
            self.sent.lock().await.push(event.clone());
            Ok(())
        }
    }

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn send(&self, _event: &NotificationEvent) -> HospitalResult<()> {
            Err(HospitalError::ExternalServiceFailure("smtp down".into()))
        }
    }

    fn reminder(email: &str) -> NotificationEvent {
        NotificationEvent::AppointmentReminder {
            kind: ReminderKind::DayBefore,
            patient_email: email.into(),
            patient_name: "Asha".into(),
            doctor_name: "Dr. Iyer".into(),
            date: "2025-03-01".into(),
            time: "10:30".into(),
        }
    }

    #[tokio::test]
    async fn should_deliver_in_order() {
        let notifier = Arc::new(RecordingNotifier::default());
        let (queue, rx) = NotificationQueue::channel();
        queue.push(reminder("a@x.com"));
        queue.push(reminder("b@x.com"));
        drop(queue);
        dispatch(rx, notifier.clone()).await;

        let sent = notifier.sent.lock().await;
        let recipients: Vec<_> = sent.iter().map(|e| e.recipient().to_string()).collect();
        assert_eq!(recipients, vec!["a@x.com", "b@x.com"]);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_dispatcher() {
        let (queue, handle) = NotificationQueue::spawn(Arc::new(FailingNotifier));
        queue.push(reminder("a@x.com"));
        queue.push(reminder("b@x.com"));
        drop(queue);
        handle.await.unwrap();
    }

    #[tokio::test]
    async fn push_after_dispatcher_exit_is_harmless() {
        let (queue, rx) = NotificationQueue::channel();
        drop(rx);
        queue.push(reminder("a@x.com"));
    }

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        assert!(LogNotifier.send(&reminder("a@x.com")).await.is_ok());
    }

    #[tokio::test]
    async fn webhook_reports_unreachable_gateway() {
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/unreachable");
        let err = notifier.send(&reminder("a@x.com")).await.unwrap_err();
        assert!(matches!(err, HospitalError::ExternalServiceFailure(_)));
    }

    #[test]
    fn event_is_tagged_on_the_wire() {
        let json = serde_json::to_value(reminder("a@x.com")).unwrap();
        assert_eq!(json["type"], "appointmentReminder");
        assert_eq!(json["kind"], "day-before");
        assert_eq!(json["patientEmail"], "a@x.com");
    }
}
