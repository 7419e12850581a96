//! Data store adapter.
//!
//! A [`Store`] hands out one [`Session`] per inbound call. Everything a
//! handler reads or writes goes through that session; nothing is visible to
//! other calls until [`Session::commit`], and dropping a session discards its
//! changes.

#[cfg(test)]
pub mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::{Item, ItemWithOwner, User, UserWithItems};

pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    #[error("foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &error {
            let constraint = db.constraint().unwrap_or_default().to_owned();
            if db.is_unique_violation() {
                return Self::UniqueViolation { constraint };
            }
            if db.is_foreign_key_violation() {
                return Self::ForeignKeyViolation { constraint };
            }
        }
        Self::Database(error)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    /// Open a unit of work.
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError>;
}

#[async_trait]
pub trait Session: Send {
    async fn list_users(&mut self) -> Result<Vec<UserWithItems>, StoreError>;

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_with_items(&mut self, id: Uuid)
    -> Result<Option<UserWithItems>, StoreError>;

    async fn insert_user(&mut self, user: &User) -> Result<User, StoreError>;

    async fn update_user(&mut self, user: &User) -> Result<User, StoreError>;

    async fn delete_user(&mut self, id: Uuid) -> Result<(), StoreError>;

    /// Returns the number of items removed.
    async fn delete_items_owned_by(&mut self, owner_id: Uuid) -> Result<u64, StoreError>;

    async fn list_items(&mut self) -> Result<Vec<ItemWithOwner>, StoreError>;

    async fn find_item(&mut self, id: Uuid) -> Result<Option<Item>, StoreError>;

    async fn find_item_with_owner(&mut self, id: Uuid)
    -> Result<Option<ItemWithOwner>, StoreError>;

    async fn insert_item(&mut self, item: &Item) -> Result<Item, StoreError>;

    async fn update_item(&mut self, item: &Item) -> Result<Item, StoreError>;

    async fn delete_item(&mut self, id: Uuid) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
