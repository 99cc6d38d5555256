// security/src/policy.rs
// The single authorization decision point. Handlers and engine services
// describe what they are about to do and to which record, and this module
// says yes or no.

use std::fmt;

use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::medical::Role;

use crate::Caller;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    ListAppointments,
    ViewAppointment,
    ViewBookedSlots,
    BookForSelf,
    BookForWalkIn,
    CancelAppointment,
    MarkNoShow,
    EditNotes,
    AttachPrescription,
    RecordPayment,
    DeleteAppointment,
    ListUsers { role: Option<Role> },
    ViewUser,
    UpdateUser,
    CreateDoctor,
    UpdateDoctor,
    DeactivateDoctor,
    UpdateInventory,
    InitializeInventory,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Action::ListAppointments => "list appointments",
            Action::ViewAppointment => "view this appointment",
            Action::ViewBookedSlots => "view booked slots",
            Action::BookForSelf => "book an appointment for themselves",
            Action::BookForWalkIn => "book an appointment for a walk-in patient",
            Action::CancelAppointment => "cancel this appointment",
            Action::MarkNoShow => "mark this appointment as no-show",
            Action::EditNotes => "edit notes on this appointment",
            Action::AttachPrescription => "add a prescription to this appointment",
            Action::RecordPayment => "record payment for this appointment",
            Action::DeleteAppointment => "delete appointments",
            Action::ListUsers { .. } => "list users",
            Action::ViewUser => "view this user",
            Action::UpdateUser => "update users",
            Action::CreateDoctor => "create doctors",
            Action::UpdateDoctor => "update this doctor",
            Action::DeactivateDoctor => "deactivate doctors",
            Action::UpdateInventory => "update inventory",
            Action::InitializeInventory => "initialize inventory",
        };
        f.write_str(text)
    }
}

/// The record an action touches. Ownership checks read the ids from here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    None,
    Appointment { patient: Uuid, doctor: Uuid },
    User(Uuid),
    /// A doctor profile, identified by the user id of its owner.
    Doctor { user: Uuid },
}

/// Which appointments a caller may list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppointmentScope {
    All,
    Patient(Uuid),
    Doctor(Uuid),
}

fn deny(caller: &Caller, action: Action) -> HospitalError {
    HospitalError::Forbidden(format!("User role {} is not authorized to {}", caller.role, action))
}

fn owns_as_patient(caller: &Caller, resource: Resource) -> bool {
    matches!(resource, Resource::Appointment { patient, .. } if caller.is(Role::Patient) && patient == caller.id)
}

fn owns_as_doctor(caller: &Caller, resource: Resource) -> bool {
    matches!(resource, Resource::Appointment { doctor, .. } if caller.is(Role::Doctor) && doctor == caller.id)
}

/// Actions that need no caller at all.
pub fn allows_anonymous(action: Action) -> bool {
    matches!(action, Action::ListUsers { role: Some(Role::Doctor) })
}

pub fn authorize(caller: &Caller, action: Action, resource: Resource) -> HospitalResult<()> {
    let admin = caller.is(Role::Admin);
    let allowed = match action {
        Action::ListAppointments => !caller.is(Role::InventoryManager),
        Action::ViewAppointment => {
            admin || caller.is(Role::Staff) || owns_as_patient(caller, resource) || owns_as_doctor(caller, resource)
        }
        Action::ViewBookedSlots => true,
        Action::BookForSelf => caller.is(Role::Patient),
        Action::BookForWalkIn => admin || caller.is(Role::Staff),
        Action::CancelAppointment | Action::RecordPayment => admin || owns_as_patient(caller, resource),
        Action::MarkNoShow | Action::EditNotes => admin || owns_as_doctor(caller, resource),
        Action::AttachPrescription => owns_as_doctor(caller, resource),
        Action::ListUsers { .. } => admin || allows_anonymous(action),
        Action::ViewUser => admin || resource == Resource::User(caller.id),
        Action::UpdateDoctor => {
            admin || (caller.is(Role::Doctor) && resource == Resource::Doctor { user: caller.id })
        }
        Action::UpdateInventory => admin || caller.is(Role::InventoryManager),
        Action::DeleteAppointment
        | Action::UpdateUser
        | Action::CreateDoctor
        | Action::DeactivateDoctor
        | Action::InitializeInventory => admin,
    };

    if allowed {
        Ok(())
    } else {
        Err(deny(caller, action))
    }
}

pub fn appointment_scope(caller: &Caller) -> HospitalResult<AppointmentScope> {
    match caller.role {
        Role::Admin | Role::Staff => Ok(AppointmentScope::All),
        Role::Patient => Ok(AppointmentScope::Patient(caller.id)),
        Role::Doctor => Ok(AppointmentScope::Doctor(caller.id)),
        Role::InventoryManager => Err(deny(caller, Action::ListAppointments)),
    }
}
