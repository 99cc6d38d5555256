// models/src/errors.rs

use std::io;

pub use thiserror::Error;
use uuid::Error as UuidError;

use crate::medical::AppointmentStatus;

/// Every failure the hospital service can report. The HTTP layer maps the
/// first five variants to 400/409/404/401/403; everything else is a 500.
#[derive(Debug, Error)]
pub enum HospitalError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    /// Raised by notifiers. Never returned to an HTTP caller.
    #[error("External service failure: {0}")]
    ExternalServiceFailure(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    #[error("An internal error occurred: {0}")]
    InternalError(String),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("UUID parsing error: {0}")]
    Uuid(#[from] UuidError),
}

impl HospitalError {
    /// Shorthand for a free-form validation failure.
    pub fn invalid(message: impl Into<String>) -> Self {
        HospitalError::Validation(ValidationError::Message(message.into()))
    }

    pub fn slot_taken() -> Self {
        HospitalError::Conflict("This time slot is already booked. Please choose another time.".to_string())
    }

    /// True for failures caused by the caller rather than by the service.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HospitalError::Validation(_)
                | HospitalError::Conflict(_)
                | HospitalError::NotFound(_)
                | HospitalError::Unauthorized(_)
                | HospitalError::Forbidden(_)
        )
    }
}

impl From<serde_json::Error> for HospitalError {
    fn from(err: serde_json::Error) -> Self {
        HospitalError::SerializationError(format!("JSON processing error: {}", err))
    }
}

impl From<bcrypt::BcryptError> for HospitalError {
    fn from(err: bcrypt::BcryptError) -> Self {
        HospitalError::InternalError(format!("Password hashing failed: {}", err))
    }
}

#[cfg(feature = "sled-errors")]
impl From<sled::Error> for HospitalError {
    fn from(err: sled::Error) -> Self {
        HospitalError::StorageError(err.to_string())
    }
}

#[cfg(feature = "bincode-errors")]
impl From<bincode::error::EncodeError> for HospitalError {
    fn from(err: bincode::error::EncodeError) -> Self {
        HospitalError::SerializationError(format!("bincode encode error: {}", err))
    }
}

#[cfg(feature = "bincode-errors")]
impl From<bincode::error::DecodeError> for HospitalError {
    fn from(err: bincode::error::DecodeError) -> Self {
        HospitalError::DeserializationError(format!("bincode decode error: {}", err))
    }
}

/// A validation error.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// A free-form message shown to the client as is.
    #[error("{0}")]
    Message(String),
    /// A required field was missing or blank.
    #[error("Please add {0}")]
    MissingField(&'static str),
    /// A field exceeded its maximum length.
    #[error("{field} cannot be more than {max} characters")]
    TooLong { field: &'static str, max: usize },
    /// A field is shorter than its minimum length.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: &'static str, min: usize },
    #[error("Please add a valid email")]
    InvalidEmail,
    /// A date or time slot label was empty or too long.
    #[error("slot label '{0}' is invalid")]
    InvalidSlotLabel(String),
    /// A monetary amount was negative.
    #[error("{0} cannot be negative")]
    NegativeAmount(&'static str),
    /// An occupied counter exceeded its total.
    #[error("{0} cannot exceed {1}")]
    ExceedsTotal(&'static str, &'static str),
    #[error("Cannot change appointment status from {from} to {to}")]
    InvalidTransition {
        from: AppointmentStatus,
        to: AppointmentStatus,
    },
}

/// A type alias for a `Result` that returns a `HospitalError` on failure.
pub type HospitalResult<T> = Result<T, HospitalError>;

/// A type alias for a `Result` that returns a `ValidationError` on failure.
pub type ValidationResult<T> = Result<T, ValidationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_classify_client_errors() {
        assert!(HospitalError::slot_taken().is_client_error());
        assert!(HospitalError::invalid("bad").is_client_error());
        assert!(!HospitalError::StorageError("disk".into()).is_client_error());
        assert!(!HospitalError::ExternalServiceFailure("smtp".into()).is_client_error());
    }

    #[test]
    fn should_render_transition_error() {
        let err = ValidationError::InvalidTransition {
            from: AppointmentStatus::Completed,
            to: AppointmentStatus::Cancelled,
        };
        assert_eq!(err.to_string(), "Cannot change appointment status from completed to cancelled");
    }
}
