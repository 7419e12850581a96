use std::collections::HashMap;

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Item {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
}

/// Validated input for a new user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

/// Validated input for a new item. The owner has not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
}

/// Fields to overwrite on a user; `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Fields to overwrite on an item; `None` leaves the stored value as is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub owner_id: Option<Uuid>,
}

impl User {
    pub fn create(new: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
        }
    }

    pub fn apply(&mut self, changes: UserChanges) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(email) = changes.email {
            self.email = email;
        }
    }
}

impl Item {
    pub fn create(new: NewItem) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: new.title,
            description: new.description,
            owner_id: new.owner_id,
        }
    }

    pub fn apply(&mut self, changes: ItemChanges) {
        if let Some(title) = changes.title {
            self.title = title;
        }
        if let Some(description) = changes.description {
            self.description = description;
        }
        if let Some(owner_id) = changes.owner_id {
            self.owner_id = owner_id;
        }
    }
}

/// A user with the items it owns eagerly attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserWithItems {
    pub user: User,
    pub items: Vec<Item>,
}

impl UserWithItems {
    /// Attach each item to its owner, keeping the order of `users`.
    /// Items whose owner is not in `users` are dropped.
    pub fn group(users: Vec<User>, items: Vec<Item>) -> Vec<Self> {
        let mut by_owner: HashMap<Uuid, Vec<Item>> = HashMap::new();
        for item in items {
            by_owner.entry(item.owner_id).or_default().push(item);
        }

        users
            .into_iter()
            .map(|user| {
                let items = by_owner.remove(&user.id).unwrap_or_default();
                Self { user, items }
            })
            .collect()
    }
}

/// An item with its owner eagerly attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemWithOwner {
    pub item: Item,
    pub owner: User,
}
