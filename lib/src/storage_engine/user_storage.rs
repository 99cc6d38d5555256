// lib/src/storage_engine/user_storage.rs
use async_trait::async_trait;
use log::{debug, info};
use sled::transaction::ConflictableTransactionError;
use sled::{Db, Transactional, Tree};
use uuid::Uuid;

use models::errors::{HospitalError, HospitalResult};
use models::medical::user::normalize_email;
use models::medical::{Role, User};

use crate::storage_engine::storage_utils::{abort, decode, decode_tx, encode, encode_tx, map_tx_error, uuid_from_bytes};

#[async_trait]
pub trait UserStorageEngine: Send + Sync + 'static {
    /// Adds a new user. Fails with `Conflict` if the email is taken.
    async fn add_user(&self, user: &User) -> HospitalResult<()>;
    /// Runs `change` against the stored user inside one transaction, moving
    /// the email index entry if the email changed. `change` may run more
    /// than once.
    async fn update_user(
        &self,
        id: &Uuid,
        change: &(dyn for<'u> Fn(&'u mut User) -> HospitalResult<()> + Send + Sync),
    ) -> HospitalResult<User>;
    async fn get_user_by_id(&self, id: &Uuid) -> HospitalResult<Option<User>>;
    async fn get_user_by_email(&self, email: &str) -> HospitalResult<Option<User>>;
    /// All users, or only those holding `role`, oldest first.
    async fn list_users(&self, role: Option<Role>) -> HospitalResult<Vec<User>>;
}

/// Sled-backed implementation of the `UserStorageEngine` trait. Users are
/// keyed by id; a second tree maps normalized email to id.
#[derive(Debug, Clone)]
pub struct SledUserStorage {
    users: Tree,
    emails: Tree,
}

impl SledUserStorage {
    pub fn new(db: &Db) -> HospitalResult<Self> {
        Ok(Self {
            users: db.open_tree("users")?,
            emails: db.open_tree("users_by_email")?,
        })
    }
}

fn email_taken() -> HospitalError {
    HospitalError::Conflict("User already exists".to_string())
}

#[async_trait]
impl UserStorageEngine for SledUserStorage {
    async fn add_user(&self, user: &User) -> HospitalResult<()> {
        let id = &user.id.as_bytes()[..];
        let email = normalize_email(&user.email);
        let bytes = encode(user)?;

        (&self.users, &self.emails)
            .transaction(|(users, emails)| {
                if emails.get(email.as_bytes())?.is_some() {
                    return abort(email_taken());
                }
                if users.get(id)?.is_some() {
                    return abort(HospitalError::Conflict(format!("User {} already exists", user.id)));
                }
                users.insert(id, &bytes[..])?;
                emails.insert(email.as_bytes(), id)?;
                Ok(())
            })
            .map_err(map_tx_error)?;
        info!("Created {} account {}", user.role, user.id);
        Ok(())
    }

    async fn update_user(
        &self,
        id: &Uuid,
        change: &(dyn for<'u> Fn(&'u mut User) -> HospitalResult<()> + Send + Sync),
    ) -> HospitalResult<User> {
        let key = &id.as_bytes()[..];

        let updated = (&self.users, &self.emails)
            .transaction(|(users, emails)| {
                let Some(bytes) = users.get(key)? else {
                    return abort(HospitalError::NotFound(format!("User not found with id of {}", id)));
                };
                let previous: User = decode_tx(&bytes)?;
                let mut user = previous.clone();
                change(&mut user).map_err(ConflictableTransactionError::Abort)?;

                let previous_email = normalize_email(&previous.email);
                let email = normalize_email(&user.email);
                if previous_email != email {
                    if emails.get(email.as_bytes())?.is_some() {
                        return abort(email_taken());
                    }
                    emails.remove(previous_email.as_bytes())?;
                    emails.insert(email.as_bytes(), key)?;
                }
                users.insert(key, encode_tx(&user)?)?;
                Ok(user)
            })
            .map_err(map_tx_error)?;
        debug!("Updated user {}", id);
        Ok(updated)
    }

    async fn get_user_by_id(&self, id: &Uuid) -> HospitalResult<Option<User>> {
        match self.users.get(id.as_bytes())? {
            Some(bytes) => Ok(Some(decode(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn get_user_by_email(&self, email: &str) -> HospitalResult<Option<User>> {
        match self.emails.get(normalize_email(email).as_bytes())? {
            Some(id) => self.get_user_by_id(&uuid_from_bytes(&id)?).await,
            None => Ok(None),
        }
    }

    async fn list_users(&self, role: Option<Role>) -> HospitalResult<Vec<User>> {
        let mut users = Vec::new();
        for bytes in self.users.iter().values() {
            let user: User = decode(&bytes?)?;
            if role.is_none_or(|r| user.role == r) {
                users.push(user);
            }
        }
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use models::medical::NewUser;

    use crate::storage_engine::open_temporary_db;

    fn user(email: &str, role: Role) -> User {
        User::from_new_user(NewUser {
            name: "Test User".into(),
            email: email.into(),
            password: "secret123".into(),
            role,
            phone: None,
            date_of_birth: None,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn should_add_and_find_by_email() {
        let store = SledUserStorage::new(&open_temporary_db().unwrap()).unwrap();
        let u = user("asha@example.com", Role::Patient);
        store.add_user(&u).await.unwrap();

        assert_eq!(store.get_user_by_email("ASHA@example.com").await.unwrap(), Some(u.clone()));
        assert_eq!(store.get_user_by_id(&u.id).await.unwrap(), Some(u));
        assert!(store.get_user_by_email("nobody@example.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn should_reject_duplicate_email() {
        let store = SledUserStorage::new(&open_temporary_db().unwrap()).unwrap();
        store.add_user(&user("asha@example.com", Role::Patient)).await.unwrap();
        let err = store.add_user(&user("asha@example.com", Role::Doctor)).await.unwrap_err();
        assert!(matches!(err, HospitalError::Conflict(_)));
    }

    #[tokio::test]
    async fn should_filter_by_role() {
        let store = SledUserStorage::new(&open_temporary_db().unwrap()).unwrap();
        store.add_user(&user("a@example.com", Role::Patient)).await.unwrap();
        store.add_user(&user("b@example.com", Role::Doctor)).await.unwrap();
        store.add_user(&user("c@example.com", Role::Doctor)).await.unwrap();

        assert_eq!(store.list_users(Some(Role::Doctor)).await.unwrap().len(), 2);
        assert_eq!(store.list_users(None).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn update_moves_email_index() {
        let store = SledUserStorage::new(&open_temporary_db().unwrap()).unwrap();
        let u = user("old@example.com", Role::Patient);
        store.add_user(&u).await.unwrap();
        let moved = store
            .update_user(&u.id, &|user| {
                user.email = "new@example.com".into();
                Ok(())
            })
            .await
            .unwrap();
        assert_eq!(moved.email, "new@example.com");

        assert!(store.get_user_by_email("old@example.com").await.unwrap().is_none());
        assert_eq!(store.get_user_by_email("new@example.com").await.unwrap().map(|x| x.id), Some(u.id));
    }

    #[tokio::test]
    async fn update_of_unknown_user_is_not_found() {
        let store = SledUserStorage::new(&open_temporary_db().unwrap()).unwrap();
        let u = user("ghost@example.com", Role::Patient);
        assert!(matches!(store.update_user(&u.id, &|_| Ok(())).await, Err(HospitalError::NotFound(_))));
    }
}
