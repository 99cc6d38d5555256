// notifications_service/src/lib.rs

pub mod notifications;

pub use notifications::{
    dispatch, LogNotifier, NotificationEvent, NotificationQueue, Notifier, WebhookNotifier, HOSPITAL_NAME,
};
