// models/src/identifiers.rs

use core::ops::Deref;
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// A calendar day or wall-clock slot as entered by the client.
///
/// Slot labels are opaque: `"2025-03-01"` and `"2025-3-1"` are different
/// days as far as double-booking is concerned. The value must be between 1
/// and 255 bytes in length (inclusive) after trimming.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, PartialOrd, Ord, Serialize)]
pub struct SlotLabel(String);

impl SlotLabel {
    pub fn new(value: &str) -> ValidationResult<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.len() > u8::MAX as usize {
            return Err(ValidationError::InvalidSlotLabel(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for SlotLabel {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for SlotLabel {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl FromStr for SlotLabel {
    type Err = ValidationError;

    fn from_str(s: &str) -> ValidationResult<Self> {
        Self::new(s)
    }
}

impl fmt::Display for SlotLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Builds the index key for an (owner, date, time) triple.
///
/// Layout: 16 owner bytes, date length as a single byte, date bytes, time
/// bytes. The length byte keeps `("a|b", "c")` and `("a", "b|c")` apart, and
/// [`slot_prefix`] of the same owner and date is a strict prefix of every key
/// for that day.
pub fn slot_key(owner: &Uuid, date: &SlotLabel, time: &SlotLabel) -> Vec<u8> {
    let mut key = slot_prefix(owner, date);
    key.extend_from_slice(time.as_bytes());
    key
}

/// Prefix shared by all slot keys of `owner` on `date`.
pub fn slot_prefix(owner: &Uuid, date: &SlotLabel) -> Vec<u8> {
    let mut key = Vec::with_capacity(16 + 1 + date.len() + 8);
    key.extend_from_slice(owner.as_bytes());
    key.push(date.len() as u8);
    key.extend_from_slice(date.as_bytes());
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_not_create_empty_label() {
        let label = SlotLabel::new("   ");
        assert_eq!(label.unwrap_err(), ValidationError::InvalidSlotLabel("   ".to_string()));
    }

    #[test]
    fn should_not_create_too_long_label() {
        assert!(SlotLabel::new(&"a".repeat(256)).is_err());
    }

    #[test]
    fn should_trim_label() {
        let label = SlotLabel::from_str(" 10:30 ").unwrap();
        assert_eq!(label.as_ref(), "10:30");
    }

    #[test]
    fn should_keep_ambiguous_triples_apart() {
        let owner = Uuid::new_v4();
        let a = slot_key(&owner, &SlotLabel::new("a|b").unwrap(), &SlotLabel::new("c").unwrap());
        let b = slot_key(&owner, &SlotLabel::new("a").unwrap(), &SlotLabel::new("b|c").unwrap());
        assert_ne!(a, b);
    }

    #[test]
    fn should_share_day_prefix() {
        let owner = Uuid::new_v4();
        let date = SlotLabel::new("2025-03-01").unwrap();
        let key = slot_key(&owner, &date, &SlotLabel::new("09:00").unwrap());
        assert!(key.starts_with(&slot_prefix(&owner, &date)));
        assert_eq!(&key[slot_prefix(&owner, &date).len()..], b"09:00");
    }
}
