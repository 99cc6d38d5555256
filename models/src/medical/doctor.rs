// models/src/medical/doctor.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};

/// A doctor's practice profile. `user` links the profile to the doctor's
/// login account; appointments reference that user id, not the profile id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Doctor {
    pub id: Uuid,
    pub user: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub specialization: String,
    pub qualification: String,
    pub experience: u32,
    pub consultation_fee: u64,
    pub available_from: String,
    pub available_to: String,
    pub languages: String,
    pub rating: f64,
    pub total_ratings: u32,
    pub total_appointments: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to onboard a doctor: the login account and the profile together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewDoctor {
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub specialization: String,
    pub qualification: String,
    pub experience: u32,
    pub consultation_fee: i64,
    pub available_from: String,
    pub available_to: String,
    pub languages: Option<String>,
}

/// Profile fields a doctor (or an admin) may edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorUpdate {
    pub specialization: Option<String>,
    pub qualification: Option<String>,
    pub experience: Option<u32>,
    pub consultation_fee: Option<i64>,
    pub available_from: Option<String>,
    pub available_to: Option<String>,
    pub languages: Option<String>,
    pub phone: Option<String>,
}

fn required(value: &str, what: &'static str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        Err(ValidationError::MissingField(what))
    } else {
        Ok(value.to_string())
    }
}

fn fee(value: i64) -> ValidationResult<u64> {
    u64::try_from(value).map_err(|_| ValidationError::NegativeAmount("Consultation fee"))
}

impl Doctor {
    pub fn from_new(user: Uuid, new: &NewDoctor, now: DateTime<Utc>) -> ValidationResult<Self> {
        Ok(Doctor {
            id: Uuid::new_v4(),
            user,
            name: required(&new.name, "a name")?,
            email: required(&new.email, "an email")?.to_ascii_lowercase(),
            phone: required(&new.phone, "a phone number")?,
            specialization: required(&new.specialization, "specialization")?,
            qualification: required(&new.qualification, "qualification")?,
            experience: new.experience,
            consultation_fee: fee(new.consultation_fee)?,
            available_from: required(&new.available_from, "available from time")?,
            available_to: required(&new.available_to, "available to time")?,
            languages: new
                .languages
                .as_deref()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .unwrap_or("English")
                .to_string(),
            rating: 0.0,
            total_ratings: 0,
            total_appointments: 0,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Applies the editable fields. Validates everything first, so a bad
    /// fee leaves the profile unchanged.
    pub fn apply_update(&mut self, update: DoctorUpdate, now: DateTime<Utc>) -> ValidationResult<()> {
        let consultation_fee = update.consultation_fee.map(fee).transpose()?;
        let specialization = update.specialization.as_deref().map(|s| required(s, "specialization")).transpose()?;
        let qualification = update.qualification.as_deref().map(|s| required(s, "qualification")).transpose()?;
        let available_from = update.available_from.as_deref().map(|s| required(s, "available from time")).transpose()?;
        let available_to = update.available_to.as_deref().map(|s| required(s, "available to time")).transpose()?;
        let phone = update.phone.as_deref().map(|s| required(s, "a phone number")).transpose()?;

        if let Some(v) = consultation_fee {
            self.consultation_fee = v;
        }
        if let Some(v) = specialization {
            self.specialization = v;
        }
        if let Some(v) = qualification {
            self.qualification = v;
        }
        if let Some(v) = update.experience {
            self.experience = v;
        }
        if let Some(v) = available_from {
            self.available_from = v;
        }
        if let Some(v) = available_to {
            self.available_to = v;
        }
        if let Some(v) = update.languages {
            self.languages = v;
        }
        if let Some(v) = phone {
            self.phone = v;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn matches_specialization(&self, needle: &str) -> bool {
        self.specialization.to_lowercase().contains(&needle.trim().to_lowercase())
    }

    pub fn summary(&self) -> DoctorSummary {
        DoctorSummary {
            id: self.user,
            name: self.name.clone(),
            email: self.email.clone(),
            specialization: self.specialization.clone(),
            consultation_fee: self.consultation_fee,
        }
    }
}

/// The part of a doctor shown next to an appointment. `id` is the doctor's user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub specialization: String,
    pub consultation_fee: u64,
}
