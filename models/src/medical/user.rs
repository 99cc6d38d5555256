// models/src/medical/user.rs
// Accounts for every role. Passwords are stored as bcrypt hashes only.

use bcrypt::{hash, BcryptError};
use chrono::{DateTime, NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{ValidationError, ValidationResult};
use crate::medical::role::Role;

pub const PASSWORD_HASH_COST: u32 = 10;
pub const MAX_NAME_LEN: usize = 50;
pub const MAX_PHONE_LEN: usize = 20;
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\w+([\.-]?\w+)*@\w+([\.-]?\w+)*(\.\w{2,3})+$").expect("email pattern is valid")
});

/// Lower-cases and trims an email so lookups and the uniqueness index agree.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

pub fn validate_email(email: &str) -> ValidationResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(ValidationError::InvalidEmail)
    }
}

fn validate_name(name: &str) -> ValidationResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ValidationError::MissingField("a name"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong { field: "Name", max: MAX_NAME_LEN });
    }
    Ok(name.to_string())
}

fn validate_phone(phone: Option<String>) -> ValidationResult<Option<String>> {
    match phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty()) {
        Some(p) if p.chars().count() > MAX_PHONE_LEN => {
            Err(ValidationError::TooLong { field: "Phone number", max: MAX_PHONE_LEN })
        }
        other => Ok(other),
    }
}

// --- DTO for New User Registration ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
}

// --- Stored User Struct ---
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub blood_group: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Hashes a plaintext password.
    pub fn hash_password(password: &str) -> Result<String, BcryptError> {
        hash(password, PASSWORD_HASH_COST)
    }

    /// Validates a `NewUser` and builds the stored record with a hashed password.
    pub fn from_new_user(new_user: NewUser) -> Result<Self, crate::errors::HospitalError> {
        let name = validate_name(&new_user.name)?;
        let email = normalize_email(&new_user.email);
        validate_email(&email)?;
        if new_user.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::TooShort { field: "Password", min: MIN_PASSWORD_LEN }.into());
        }
        let phone = validate_phone(new_user.phone)?;
        let password_hash = Self::hash_password(&new_user.password)?;
        let now = Utc::now();

        Ok(User {
            id: Uuid::new_v4(),
            name,
            email,
            password_hash,
            role: new_user.role,
            phone,
            date_of_birth: new_user.date_of_birth,
            blood_group: None,
            active: true,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, update: UserUpdate, now: DateTime<Utc>) -> ValidationResult<()> {
        let name = match update.name {
            Some(name) => Some(validate_name(&name)?),
            None => None,
        };
        let phone = match update.phone {
            Some(phone) => Some(validate_phone(Some(phone))?),
            None => None,
        };

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(phone) = phone {
            self.phone = phone;
        }
        if let Some(dob) = update.date_of_birth {
            self.date_of_birth = Some(dob);
        }
        if let Some(group) = update.blood_group {
            self.blood_group = Some(group.trim().to_string()).filter(|g| !g.is_empty());
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
            role: self.role,
            phone: self.phone.clone(),
            date_of_birth: self.date_of_birth,
            blood_group: self.blood_group.clone(),
            active: self.active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields an admin may change on an account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdate {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub blood_group: Option<String>,
}

/// The part of a user shown next to an appointment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

/// A user as returned by the API. Never carries the password hash.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub date_of_birth: Option<NaiveDate>,
    pub blood_group: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::HospitalError;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Asha Rao".into(),
            email: email.into(),
            password: "secret123".into(),
            role: Role::Patient,
            phone: Some("9876543210".into()),
            date_of_birth: None,
        }
    }

    #[test]
    fn should_hash_password_and_normalize_email() {
        let user = User::from_new_user(new_user(" Asha@Example.com ")).unwrap();
        assert_eq!(user.email, "asha@example.com");
        assert_ne!(user.password_hash, "secret123");
        assert!(bcrypt::verify("secret123", &user.password_hash).unwrap());
        assert!(!bcrypt::verify("wrong", &user.password_hash).unwrap());
        assert!(user.active);
    }

    #[test]
    fn should_reject_invalid_email() {
        let err = User::from_new_user(new_user("not-an-email")).unwrap_err();
        assert!(matches!(err, HospitalError::Validation(ValidationError::InvalidEmail)));
    }

    #[test]
    fn should_reject_short_password() {
        let mut input = new_user("a@b.com");
        input.password = "abc".into();
        assert!(matches!(
            User::from_new_user(input),
            Err(HospitalError::Validation(ValidationError::TooShort { .. }))
        ));
    }

    #[test]
    fn profile_never_contains_password_hash() {
        let user = User::from_new_user(new_user("asha@example.com")).unwrap();
        let json = serde_json::to_value(user.profile()).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "patient");
    }

    #[test]
    fn update_validates_before_changing_anything() {
        let mut user = User::from_new_user(new_user("asha@example.com")).unwrap();
        let before = user.clone();
        let update = UserUpdate {
            name: Some("x".repeat(51)),
            blood_group: Some("O+".into()),
            ..Default::default()
        };
        assert!(user.apply_update(update, Utc::now()).is_err());
        assert_eq!(user, before);

        user.apply_update(UserUpdate { blood_group: Some("O+".into()), ..Default::default() }, Utc::now())
            .unwrap();
        assert_eq!(user.blood_group.as_deref(), Some("O+"));
    }
}
