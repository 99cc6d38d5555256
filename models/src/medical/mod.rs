// models/src/medical/mod.rs

pub mod appointment;
pub mod billing;
pub mod doctor;
pub mod inventory;
pub mod prescription;
pub mod role;
pub mod user;

pub use appointment::{
    Appointment, AppointmentPatch, AppointmentStatus, AppointmentView, NewAppointment, ReminderKind, Reminders,
};
pub use billing::{Billing, BillingView, BookingChannel, PaymentMethod};
pub use doctor::{Doctor, DoctorSummary, DoctorUpdate, NewDoctor};
pub use inventory::{Inventory, InventoryStats, InventoryUpdate, InventoryView, OxygenStats, ResourceStats};
pub use prescription::{Medicine, Prescription, PrescriptionView};
pub use role::Role;
pub use user::{NewUser, User, UserProfile, UserSummary, UserUpdate};
