// ============================
// backend-lib/src/storage.rs
// ============================
//! User store abstraction with an in-memory implementation.
use std::{collections::HashMap, sync::Arc};

use accounts_common::UserResponse;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;

/// A stored user row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub id: String,
    pub lastname: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserRecord {
    /// Public projection, without the password hash
    pub fn to_response(&self, is_logged_in: bool) -> UserResponse {
        UserResponse {
            id: self.id.clone(),
            lastname: self.lastname.clone(),
            firstname: self.firstname.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            email: self.email.clone(),
            is_logged_in,
            is_admin: false,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Fields of a user about to be created
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: String,
    pub lastname: String,
    pub firstname: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub password_hash: String,
}

/// Contact fields a user may change
#[derive(Debug, Clone)]
pub struct UserUpdate {
    pub id: String,
    pub email: String,
    pub phone: String,
    pub address: String,
}

/// Store failures. `Conflict` names the unique column that was violated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("unique constraint violated on column `{column}`")]
    Conflict { column: String },

    #[error("store failure: {0}")]
    Backend(String),
}

/// Trait for user store backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user; email, phone and id are unique
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, StoreError>;

    /// Fetch a user by (already lower-cased) email
    async fn get_by_email(&self, email: &str) -> Result<UserRecord, StoreError>;

    async fn get_by_id(&self, id: &str) -> Result<UserRecord, StoreError>;

    /// Update contact fields
    async fn update_user(&self, update: UserUpdate) -> Result<UserRecord, StoreError>;

    /// Replace the password hash
    async fn update_credential(&self, id: &str, password_hash: &str) -> Result<UserRecord, StoreError>;

    async fn delete_user(&self, id: &str) -> Result<(), StoreError>;
}

/// In-memory implementation of the `UserStore` trait
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<HashMap<String, UserRecord>>>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users
    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }
}

/// Find a unique-column clash with any user other than `except_id`
fn find_conflict(
    users: &HashMap<String, UserRecord>,
    except_id: &str,
    email: &str,
    phone: &str,
) -> Option<StoreError> {
    users
        .values()
        .filter(|u| u.id != except_id)
        .find_map(|u| {
            if u.email == email {
                Some("email")
            } else if u.phone == phone {
                Some("phone")
            } else {
                None
            }
        })
        .map(|column| StoreError::Conflict {
            column: column.to_string(),
        })
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create_user(&self, user: NewUser) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;

        if users.contains_key(&user.id) {
            return Err(StoreError::Conflict {
                column: "id".to_string(),
            });
        }
        if let Some(conflict) = find_conflict(&users, &user.id, &user.email, &user.phone) {
            return Err(conflict);
        }

        let now = Utc::now();
        let record = UserRecord {
            id: user.id,
            lastname: user.lastname,
            firstname: user.firstname,
            email: user.email,
            phone: user.phone,
            address: user.address,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    async fn get_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        let users = self.users.read().await;
        users
            .values()
            .find(|u| u.email == email)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: &str) -> Result<UserRecord, StoreError> {
        let users = self.users.read().await;
        users.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn update_user(&self, update: UserUpdate) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;

        if !users.contains_key(&update.id) {
            return Err(StoreError::NotFound);
        }
        if let Some(conflict) = find_conflict(&users, &update.id, &update.email, &update.phone) {
            return Err(conflict);
        }

        let record = users.get_mut(&update.id).ok_or(StoreError::NotFound)?;
        record.email = update.email;
        record.phone = update.phone;
        record.address = update.address;
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn update_credential(&self, id: &str, password_hash: &str) -> Result<UserRecord, StoreError> {
        let mut users = self.users.write().await;
        let record = users.get_mut(id).ok_or(StoreError::NotFound)?;
        record.password_hash = password_hash.to_string();
        record.updated_at = Utc::now();
        Ok(record.clone())
    }

    async fn delete_user(&self, id: &str) -> Result<(), StoreError> {
        let mut users = self.users.write().await;
        users.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(id: &str, email: &str, phone: &str) -> NewUser {
        NewUser {
            id: id.to_string(),
            lastname: "Doe".to_string(),
            firstname: "Jane".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            address: "1 Main Street".to_string(),
            password_hash: "$scrypt$fake".to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_fetch() {
        let store = MemoryUserStore::new();
        let created = store.create_user(new_user("u1", "a@test.com", "08012345678")).await.unwrap();
        assert_eq!(created.created_at, created.updated_at);

        assert_eq!(store.get_by_id("u1").await.unwrap(), created);
        assert_eq!(store.get_by_email("a@test.com").await.unwrap(), created);
        assert_eq!(store.get_by_email("b@test.com").await, Err(StoreError::NotFound));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_conflicts_name_the_column() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("u1", "a@test.com", "08012345678")).await.unwrap();

        let email_clash = store.create_user(new_user("u2", "a@test.com", "08099999999")).await;
        assert_eq!(email_clash, Err(StoreError::Conflict { column: "email".into() }));

        let phone_clash = store.create_user(new_user("u2", "b@test.com", "08012345678")).await;
        assert_eq!(phone_clash, Err(StoreError::Conflict { column: "phone".into() }));

        let id_clash = store.create_user(new_user("u1", "c@test.com", "08000000000")).await;
        assert_eq!(id_clash, Err(StoreError::Conflict { column: "id".into() }));
    }

    #[tokio::test]
    async fn test_update_credential_and_delete() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("u1", "a@test.com", "08012345678")).await.unwrap();

        let updated = store.update_credential("u1", "$scrypt$other").await.unwrap();
        assert_eq!(updated.password_hash, "$scrypt$other");
        assert!(updated.updated_at >= updated.created_at);

        store.delete_user("u1").await.unwrap();
        assert_eq!(store.delete_user("u1").await, Err(StoreError::NotFound));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_user_keeps_own_values() {
        let store = MemoryUserStore::new();
        store.create_user(new_user("u1", "a@test.com", "08012345678")).await.unwrap();
        store.create_user(new_user("u2", "b@test.com", "08087654321")).await.unwrap();

        // unchanged email/phone on the same row is not a conflict
        let same = UserUpdate {
            id: "u1".into(),
            email: "a@test.com".into(),
            phone: "08012345678".into(),
            address: "2 Side Road".into(),
        };
        assert_eq!(store.update_user(same).await.unwrap().address, "2 Side Road");

        let steal = UserUpdate {
            id: "u1".into(),
            email: "b@test.com".into(),
            phone: "08012345678".into(),
            address: "2 Side Road".into(),
        };
        assert_eq!(
            store.update_user(steal).await,
            Err(StoreError::Conflict { column: "email".into() })
        );
    }
}
