// lib/src/engine/mod.rs

pub mod appointments;
pub mod doctors;
pub mod inventory;
pub mod reminders;
pub mod users;

pub use appointments::{AppointmentManager, AppointmentUpdate, BookingRequest, PaymentRequest, PrescriptionRequest};
pub use doctors::DoctorDirectory;
pub use inventory::InventoryService;
pub use reminders::ReminderSweep;
pub use users::UserDirectory;

use notifications_service::NotificationQueue;

use crate::database::Database;

/// Everything the HTTP layer calls into. Cheap to clone.
#[derive(Clone)]
pub struct HospitalServices {
    pub appointments: AppointmentManager,
    pub doctors: DoctorDirectory,
    pub users: UserDirectory,
    pub inventory: InventoryService,
}

impl HospitalServices {
    pub fn new(database: &Database, notifications: NotificationQueue) -> Self {
        let users = UserDirectory::new(database.users());
        let doctors = DoctorDirectory::new(database.doctors(), users.clone());
        let appointments = AppointmentManager::new(database.appointments(), users.clone(), doctors.clone(), notifications);
        let inventory = InventoryService::new(database.inventory());
        Self { appointments, doctors, users, inventory }
    }

    pub fn reminder_sweep(&self) -> ReminderSweep {
        ReminderSweep::new(self.appointments.clone())
    }
}
