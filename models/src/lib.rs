// models/src/lib.rs
// Shared domain types for the hospital service: appointments, billing,
// prescriptions, doctors, users and the inventory aggregate.

pub mod errors;
pub mod identifiers;
pub mod medical;

pub use errors::{HospitalError, HospitalResult, ValidationError, ValidationResult};
pub use identifiers::SlotLabel;
