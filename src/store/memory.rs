/// In-process storage adapters.
///
/// Each map sits behind a single mutex, which gives `delete_by_access_token_id`
/// the same remove-and-report atomicity as a `DELETE ... WHERE` with an
/// affected-row check.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use crate::domain::{NewUser, RefreshTokenRecord, User};
use crate::error::StoreError;
use crate::store::{TokenStore, UserDirectory};

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, StoreError> {
    mutex
        .lock()
        .map_err(|_| StoreError::Unavailable("in-memory store lock poisoned".to_string()))
}

#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: Mutex<HashMap<String, User>>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.lock().map(|users| users.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = lock(&self.users)?;

        if users.values().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }

        let user = User {
            id: Uuid::new_v4().to_string(),
            username: new_user.username,
            email: new_user.email,
            password_hash: new_user.password_hash,
            created_at: Utc::now(),
        };
        users.insert(user.id.clone(), user.clone());

        Ok(user)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?.get(id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(lock(&self.users)?
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.users)?.remove(id).is_some())
    }
}

/// Records keyed by `access_token_id`.
#[derive(Debug, Default)]
pub struct InMemoryTokenStore {
    records: Mutex<HashMap<String, RefreshTokenRecord>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Live records owned by `user_id`.
    pub fn count_for_user(&self, user_id: &str) -> usize {
        self.records
            .lock()
            .map(|records| records.values().filter(|r| r.user_id == user_id).count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), StoreError> {
        let mut records = lock(&self.records)?;

        if records.contains_key(&record.access_token_id) {
            return Err(StoreError::Database(
                "refresh record for this access token already exists".to_string(),
            ));
        }
        records.insert(record.access_token_id.clone(), record.clone());

        Ok(())
    }

    async fn find_by_access_token_id(
        &self,
        access_token_id: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError> {
        Ok(lock(&self.records)?.get(access_token_id).cloned())
    }

    async fn delete_by_access_token_id(&self, access_token_id: &str) -> Result<bool, StoreError> {
        Ok(lock(&self.records)?.remove(access_token_id).is_some())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = lock(&self.records)?;
        let before = records.len();
        records.retain(|_, r| !r.is_expired_at(now));
        Ok((before - records.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "alice".to_string(),
            email: email.to_string(),
            password_hash: "$2b$04$hash".to_string(),
        }
    }

    fn record(access_token_id: &str, expires_at: DateTime<Utc>) -> RefreshTokenRecord {
        RefreshTokenRecord {
            user_id: "user-1".to_string(),
            token_hash: "hash".to_string(),
            access_token_id: access_token_id.to_string(),
            expires_at,
        }
    }

    #[tokio::test]
    async fn create_and_find_user() {
        let directory = InMemoryUserDirectory::new();
        let user = directory.create(new_user("alice@x.com")).await.unwrap();

        let by_id = directory.find_by_id(&user.id).await.unwrap();
        let by_email = directory.find_by_email("alice@x.com").await.unwrap();

        assert_eq!(by_id, Some(user.clone()));
        assert_eq!(by_email, Some(user));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let directory = InMemoryUserDirectory::new();
        directory.create(new_user("alice@x.com")).await.unwrap();

        let result = directory.create(new_user("alice@x.com")).await;
        assert!(matches!(result, Err(StoreError::DuplicateEmail)));
        assert_eq!(directory.len(), 1);
    }

    #[tokio::test]
    async fn delete_user_reports_existence() {
        let directory = InMemoryUserDirectory::new();
        let user = directory.create(new_user("alice@x.com")).await.unwrap();

        assert!(directory.delete(&user.id).await.unwrap());
        assert!(!directory.delete(&user.id).await.unwrap());
        assert!(directory.find_by_id(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_by_access_token_id_succeeds_once() {
        let store = InMemoryTokenStore::new();
        store.put(&record("jti-1", Utc::now())).await.unwrap();

        assert!(store.delete_by_access_token_id("jti-1").await.unwrap());
        assert!(!store.delete_by_access_token_id("jti-1").await.unwrap());
        assert!(store.find_by_access_token_id("jti-1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn second_record_for_same_access_token_is_rejected() {
        let store = InMemoryTokenStore::new();
        store.put(&record("jti-1", Utc::now())).await.unwrap();

        assert!(store.put(&record("jti-1", Utc::now())).await.is_err());
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_expired_keeps_live_records() {
        let store = InMemoryTokenStore::new();
        let now = Utc::now();
        store.put(&record("old", now - Duration::hours(1))).await.unwrap();
        store.put(&record("live", now + Duration::hours(1))).await.unwrap();

        let removed = store.delete_expired(now).await.unwrap();

        assert_eq!(removed, 1);
        assert!(store.find_by_access_token_id("live").await.unwrap().is_some());
        assert_eq!(store.count_for_user("user-1"), 1);
    }
}
