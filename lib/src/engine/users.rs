// lib/src/engine/users.rs
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use log::{info, warn};
use rand::distributions::Alphanumeric;
use rand::Rng;
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::medical::{NewUser, Role, User, UserProfile, UserSummary, UserUpdate};
use security::{allows_anonymous, authorize, Action, Caller, Resource};

use crate::storage_engine::UserStorageEngine;

/// Appended to every generated walk-in password so it satisfies the
/// upper-case, digit and symbol rules of the patient portal.
const GENERATED_PASSWORD_SUFFIX: &str = "A1!";

fn generate_password() -> String {
    let mut password: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(8)
        .map(char::from)
        .collect();
    password.push_str(GENERATED_PASSWORD_SUFFIX);
    password
}

/// Account lookups and maintenance on top of a `UserStorageEngine`.
#[derive(Clone)]
pub struct UserDirectory {
    users: Arc<dyn UserStorageEngine>,
}

impl UserDirectory {
    pub fn new(users: Arc<dyn UserStorageEngine>) -> Self {
        Self { users }
    }

    /// Validates and stores a new account.
    pub async fn register(&self, new_user: NewUser) -> HospitalResult<User> {
        let user = User::from_new_user(new_user)?;
        self.store(&user).await?;
        Ok(user)
    }

    pub(crate) async fn store(&self, user: &User) -> HospitalResult<()> {
        self.users.add_user(user).await
    }

    pub async fn get(&self, id: &Uuid) -> HospitalResult<User> {
        self.users
            .get_user_by_id(id)
            .await?
            .ok_or_else(|| HospitalError::NotFound(format!("User not found with id of {}", id)))
    }

    pub async fn find_by_email(&self, email: &str) -> HospitalResult<Option<User>> {
        self.users.get_user_by_email(email).await
    }

    pub async fn summary(&self, id: &Uuid) -> HospitalResult<Option<UserSummary>> {
        Ok(self.users.get_user_by_id(id).await?.map(|u| u.summary()))
    }

    /// Resolves the account behind a verified token. The stored role wins
    /// over whatever the token claims.
    pub async fn authenticate(&self, id: &Uuid) -> HospitalResult<Caller> {
        match self.users.get_user_by_id(id).await? {
            Some(user) if user.active => Ok(Caller::new(user.id, user.role)),
            Some(_) => Err(HospitalError::Unauthorized("User account is deactivated".to_string())),
            None => Err(HospitalError::Unauthorized("Not authorized, user not found".to_string())),
        }
    }

    pub async fn list(&self, caller: Option<&Caller>, role: Option<Role>) -> HospitalResult<Vec<UserProfile>> {
        let action = Action::ListUsers { role };
        match caller {
            Some(caller) => authorize(caller, action, Resource::None)?,
            None if allows_anonymous(action) => {}
            None => return Err(HospitalError::Unauthorized("Not authorized to access this route".to_string())),
        }
        let users = self.users.list_users(role).await?;
        Ok(users.iter().map(User::profile).collect())
    }

    pub async fn view(&self, caller: &Caller, id: &Uuid) -> HospitalResult<UserProfile> {
        authorize(caller, Action::ViewUser, Resource::User(*id))?;
        Ok(self.get(id).await?.profile())
    }

    pub async fn update(&self, caller: &Caller, id: &Uuid, update: UserUpdate) -> HospitalResult<UserProfile> {
        authorize(caller, Action::UpdateUser, Resource::User(*id))?;
        let now = Utc::now();
        let user = self
            .users
            .update_user(id, &|user| Ok(user.apply_update(update.clone(), now)?))
            .await?;
        Ok(user.profile())
    }

    pub(crate) async fn deactivate(&self, id: &Uuid) -> HospitalResult<()> {
        let now = Utc::now();
        self.users
            .update_user(id, &|user| {
                user.active = false;
                user.updated_at = now;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Finds the patient account for a walk-in by email, creating one with a
    /// generated password when none exists.
    pub async fn register_patient(
        &self,
        name: &str,
        email: &str,
        date_of_birth: Option<NaiveDate>,
    ) -> HospitalResult<User> {
        if let Some(existing) = self.users.get_user_by_email(email).await? {
            return Self::existing_patient(existing);
        }

        let new_user = NewUser {
            name: name.to_string(),
            email: email.to_string(),
            password: generate_password(),
            role: Role::Patient,
            phone: None,
            date_of_birth,
        };
        match self.register(new_user).await {
            Ok(user) => {
                info!("Registered walk-in patient {}", user.id);
                Ok(user)
            }
            // Another booking created the same account first.
            Err(HospitalError::Conflict(_)) => match self.users.get_user_by_email(email).await? {
                Some(existing) => Self::existing_patient(existing),
                None => Err(HospitalError::InternalError(format!("walk-in account for {} vanished", email))),
            },
            Err(e) => Err(e),
        }
    }

    fn existing_patient(user: User) -> HospitalResult<User> {
        if user.role != Role::Patient {
            warn!("Walk-in booking used the email of a {} account", user.role);
            return Err(HospitalError::invalid("This email belongs to a staff account and cannot be booked as a patient"));
        }
        Ok(user)
    }
}
