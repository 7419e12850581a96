//! In-memory store for handler tests.
//!
//! Mirrors the PostgreSQL constraints the handlers rely on: unique emails and
//! items referencing existing users. A session reads a private snapshot and
//! records its writes; commit replays them row by row onto the shared tables
//! and re-checks both constraints there.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use uuid::Uuid;

use super::{Session, Store, StoreError};
use crate::models::{Item, ItemWithOwner, User, UserWithItems};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    items: Vec<Item>,
}

impl Tables {
    fn user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|user| user.id == id)
    }

    fn check_email(&self, user: &User) -> Result<(), StoreError> {
        let taken = self
            .users
            .iter()
            .any(|other| other.id != user.id && other.email == user.email);
        if taken {
            return Err(StoreError::UniqueViolation {
                constraint: "users_email_key".to_owned(),
            });
        }
        Ok(())
    }

    fn check_owner(&self, item: &Item) -> Result<(), StoreError> {
        match self.user(item.owner_id) {
            Some(_) => Ok(()),
            None => Err(StoreError::ForeignKeyViolation {
                constraint: "items_owner_id_fkey".to_owned(),
            }),
        }
    }

    fn check_all(&self) -> Result<(), StoreError> {
        for user in &self.users {
            self.check_email(user)?;
        }
        for item in &self.items {
            self.check_owner(item)?;
        }
        Ok(())
    }

    fn apply(&mut self, change: &Change) {
        match change {
            Change::PutUser(user) => put(&mut self.users, user, |u| u.id),
            Change::DeleteUser(id) => self.users.retain(|user| user.id != *id),
            Change::PutItem(item) => put(&mut self.items, item, |i| i.id),
            Change::DeleteItem(id) => self.items.retain(|item| item.id != *id),
        }
    }

    fn with_owner(&self, item: &Item) -> Option<ItemWithOwner> {
        self.user(item.owner_id).map(|owner| ItemWithOwner {
            item: item.clone(),
            owner: owner.clone(),
        })
    }
}

fn put<T: Clone>(rows: &mut Vec<T>, row: &T, id: impl Fn(&T) -> Uuid) {
    match rows.iter_mut().find(|stored| id(stored) == id(row)) {
        Some(slot) => *slot = row.clone(),
        None => rows.push(row.clone()),
    }
}

#[derive(Debug, Clone)]
enum Change {
    PutUser(User),
    DeleteUser(Uuid),
    PutItem(Item),
    DeleteItem(Uuid),
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn users(&self) -> Vec<User> {
        self.tables.lock().unwrap().users.clone()
    }

    pub fn items(&self) -> Vec<Item> {
        self.tables.lock().unwrap().items.clone()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        let working = self.tables.lock().unwrap().clone();
        Ok(Box::new(MemorySession {
            shared: Arc::clone(&self.tables),
            working,
            changes: Vec::new(),
        }))
    }
}

pub struct MemorySession {
    shared: Arc<Mutex<Tables>>,
    working: Tables,
    changes: Vec<Change>,
}

impl MemorySession {
    fn record(&mut self, change: Change) {
        self.working.apply(&change);
        self.changes.push(change);
    }
}

#[async_trait]
impl Session for MemorySession {
    async fn list_users(&mut self) -> Result<Vec<UserWithItems>, StoreError> {
        Ok(UserWithItems::group(
            self.working.users.clone(),
            self.working.items.clone(),
        ))
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.working.user(id).cloned())
    }

    async fn find_user_with_items(
        &mut self,
        id: Uuid,
    ) -> Result<Option<UserWithItems>, StoreError> {
        Ok(self.working.user(id).map(|user| UserWithItems {
            user: user.clone(),
            items: self
                .working
                .items
                .iter()
                .filter(|item| item.owner_id == id)
                .cloned()
                .collect(),
        }))
    }

    async fn insert_user(&mut self, user: &User) -> Result<User, StoreError> {
        self.working.check_email(user)?;
        self.record(Change::PutUser(user.clone()));
        Ok(user.clone())
    }

    async fn update_user(&mut self, user: &User) -> Result<User, StoreError> {
        self.working.check_email(user)?;
        if self.working.user(user.id).is_none() {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        self.record(Change::PutUser(user.clone()));
        Ok(user.clone())
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<(), StoreError> {
        if self.working.items.iter().any(|item| item.owner_id == id) {
            return Err(StoreError::ForeignKeyViolation {
                constraint: "items_owner_id_fkey".to_owned(),
            });
        }
        self.record(Change::DeleteUser(id));
        Ok(())
    }

    async fn delete_items_owned_by(&mut self, owner_id: Uuid) -> Result<u64, StoreError> {
        let owned: Vec<Uuid> = self
            .working
            .items
            .iter()
            .filter(|item| item.owner_id == owner_id)
            .map(|item| item.id)
            .collect();
        for id in &owned {
            self.record(Change::DeleteItem(*id));
        }
        Ok(owned.len() as u64)
    }

    async fn list_items(&mut self) -> Result<Vec<ItemWithOwner>, StoreError> {
        Ok(self
            .working
            .items
            .iter()
            .filter_map(|item| self.working.with_owner(item))
            .collect())
    }

    async fn find_item(&mut self, id: Uuid) -> Result<Option<Item>, StoreError> {
        Ok(self.working.items.iter().find(|item| item.id == id).cloned())
    }

    async fn find_item_with_owner(
        &mut self,
        id: Uuid,
    ) -> Result<Option<ItemWithOwner>, StoreError> {
        Ok(self
            .working
            .items
            .iter()
            .find(|item| item.id == id)
            .and_then(|item| self.working.with_owner(item)))
    }

    async fn insert_item(&mut self, item: &Item) -> Result<Item, StoreError> {
        self.working.check_owner(item)?;
        self.record(Change::PutItem(item.clone()));
        Ok(item.clone())
    }

    async fn update_item(&mut self, item: &Item) -> Result<Item, StoreError> {
        self.working.check_owner(item)?;
        if !self.working.items.iter().any(|stored| stored.id == item.id) {
            return Err(StoreError::Database(sqlx::Error::RowNotFound));
        }
        self.record(Change::PutItem(item.clone()));
        Ok(item.clone())
    }

    async fn delete_item(&mut self, id: Uuid) -> Result<(), StoreError> {
        self.record(Change::DeleteItem(id));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemorySession { shared, changes, .. } = *self;
        let mut tables = shared.lock().unwrap();
        let mut next = tables.clone();
        for change in &changes {
            next.apply(change);
        }
        next.check_all()?;
        *tables = next;
        Ok(())
    }
}

/// A store whose database is never reachable.
pub struct UnavailableStore;

#[async_trait]
impl Store for UnavailableStore {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::models::{NewItem, NewUser};

    fn user(name: &str) -> User {
        User::create(NewUser {
            name: name.to_owned(),
            email: format!("{}@example.com", name.to_lowercase()),
        })
    }

    async fn seed(store: &MemoryStore, users: &[&User]) {
        let mut session = store.begin().await.unwrap();
        for user in users {
            session.insert_user(user).await.unwrap();
        }
        session.commit().await.unwrap();
    }

    #[tokio::test]
    async fn interleaved_sessions_keep_each_others_rows() {
        let store = MemoryStore::new();
        let ann = user("Ann");
        let bob = user("Bob");
        seed(&store, &[&ann, &bob]).await;

        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first
            .update_user(&User {
                name: "Annie".to_owned(),
                ..ann.clone()
            })
            .await
            .unwrap();
        second
            .update_user(&User {
                name: "Robert".to_owned(),
                ..bob.clone()
            })
            .await
            .unwrap();
        first.commit().await.unwrap();
        second.commit().await.unwrap();

        let names: Vec<_> = store.users().into_iter().map(|u| u.name).collect();
        assert_eq!(names, ["Annie", "Robert"]);
    }

    #[tokio::test]
    async fn delete_racing_an_item_insert_conflicts() {
        let store = MemoryStore::new();
        let ann = user("Ann");
        seed(&store, &[&ann]).await;

        let mut deleting = store.begin().await.unwrap();
        assert_eq!(deleting.delete_items_owned_by(ann.id).await.unwrap(), 0);
        deleting.delete_user(ann.id).await.unwrap();

        let mut inserting = store.begin().await.unwrap();
        let item = Item::create(NewItem {
            title: "lamp".to_owned(),
            description: "brass".to_owned(),
            owner_id: ann.id,
        });
        inserting.insert_item(&item).await.unwrap();
        inserting.commit().await.unwrap();

        let err = deleting.commit().await.unwrap_err();
        assert!(matches!(err, StoreError::ForeignKeyViolation { .. }));
        assert!(matches!(AppError::from(err), AppError::Conflict(_)));
        assert_eq!(store.users(), [ann]);
        assert_eq!(store.items(), [item]);
    }

    #[tokio::test]
    async fn duplicate_email_from_concurrent_sessions_is_rejected_on_commit() {
        let store = MemoryStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();
        first.insert_user(&user("Ann")).await.unwrap();
        second.insert_user(&user("Ann")).await.unwrap();

        first.commit().await.unwrap();
        let err = second.commit().await.unwrap_err();

        assert!(matches!(err, StoreError::UniqueViolation { .. }));
        assert_eq!(store.users().len(), 1);
    }
}
