/// Storage capabilities consumed by the credential and token components.
///
/// Both traits are implemented by `postgres` (production) and `memory`
/// (tests and local runs). Implementations must make
/// `delete_by_access_token_id` an atomic conditional delete: when several
/// callers race on the same id, exactly one observes `true`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{NewUser, RefreshTokenRecord, User};
use crate::error::StoreError;

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryTokenStore, InMemoryUserDirectory};
pub use postgres::{PgTokenStore, PgUserDirectory};

/// User directory collaborator
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Fails with `StoreError::DuplicateEmail` when the email is taken.
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: &str) -> Result<Option<User>, StoreError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Removes a user. Returns whether the user existed.
    async fn delete(&self, id: &str) -> Result<bool, StoreError>;
}

/// Refresh-token record store collaborator
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn put(&self, record: &RefreshTokenRecord) -> Result<(), StoreError>;

    /// Indexed point lookup on `access_token_id`.
    async fn find_by_access_token_id(
        &self,
        access_token_id: &str,
    ) -> Result<Option<RefreshTokenRecord>, StoreError>;

    /// Atomic delete-if-present. Returns whether a record was removed.
    async fn delete_by_access_token_id(&self, access_token_id: &str) -> Result<bool, StoreError>;

    /// Drops every record whose expiry is before `now`. Returns the count.
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}
