use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Row, Transaction, postgres::PgRow};
use uuid::Uuid;

use super::{Session, Store, StoreError};
use crate::models::{Item, ItemWithOwner, User, UserWithItems};

const ITEM_WITH_OWNER: &str = r#"
    SELECT i.id, i.title, i.description, i.owner_id,
           u.name AS owner_name, u.email AS owner_email
    FROM items i
    JOIN users u ON u.id = i.owner_id
"#;

const ITEM_WITH_OWNER_BY_ID: &str = r#"
    SELECT i.id, i.title, i.description, i.owner_id,
           u.name AS owner_name, u.email AS owner_email
    FROM items i
    JOIN users u ON u.id = i.owner_id
    WHERE i.id = $1
"#;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Session>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgSession { tx }))
    }
}

/// Rolled back on drop unless committed.
pub struct PgSession {
    tx: Transaction<'static, Postgres>,
}

fn item_with_owner(row: &PgRow) -> ItemWithOwner {
    let owner_id: Uuid = row.get("owner_id");
    ItemWithOwner {
        item: Item {
            id: row.get("id"),
            title: row.get("title"),
            description: row.get("description"),
            owner_id,
        },
        owner: User {
            id: owner_id,
            name: row.get("owner_name"),
            email: row.get("owner_email"),
        },
    }
}

impl PgSession {
    async fn items_owned_by(&mut self, owner_ids: &[Uuid]) -> Result<Vec<Item>, StoreError> {
        let items = sqlx::query_as::<_, Item>(
            "SELECT id, title, description, owner_id FROM items WHERE owner_id = ANY($1)",
        )
        .bind(owner_ids)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(items)
    }
}

#[async_trait]
impl Session for PgSession {
    async fn list_users(&mut self) -> Result<Vec<UserWithItems>, StoreError> {
        let users = sqlx::query_as::<_, User>("SELECT id, name, email FROM users")
            .fetch_all(&mut *self.tx)
            .await?;

        let ids: Vec<Uuid> = users.iter().map(|user| user.id).collect();
        let items = self.items_owned_by(&ids).await?;

        Ok(UserWithItems::group(users, items))
    }

    async fn find_user(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>("SELECT id, name, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(user)
    }

    async fn find_user_with_items(
        &mut self,
        id: Uuid,
    ) -> Result<Option<UserWithItems>, StoreError> {
        let Some(user) = self.find_user(id).await? else {
            return Ok(None);
        };
        let items = self.items_owned_by(&[id]).await?;
        Ok(Some(UserWithItems { user, items }))
    }

    async fn insert_user(&mut self, user: &User) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, name, email) VALUES ($1, $2, $3) RETURNING id, name, email",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn update_user(&mut self, user: &User) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(
            "UPDATE users SET name = $2, email = $3 WHERE id = $1 RETURNING id, name, email",
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(user)
    }

    async fn delete_user(&mut self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn delete_items_owned_by(&mut self, owner_id: Uuid) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM items WHERE owner_id = $1")
            .bind(owner_id)
            .execute(&mut *self.tx)
            .await?;
        Ok(result.rows_affected())
    }

    async fn list_items(&mut self) -> Result<Vec<ItemWithOwner>, StoreError> {
        let rows = sqlx::query(ITEM_WITH_OWNER)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(rows.iter().map(item_with_owner).collect())
    }

    async fn find_item(&mut self, id: Uuid) -> Result<Option<Item>, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            "SELECT id, title, description, owner_id FROM items WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn find_item_with_owner(
        &mut self,
        id: Uuid,
    ) -> Result<Option<ItemWithOwner>, StoreError> {
        let row = sqlx::query(ITEM_WITH_OWNER_BY_ID)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row.as_ref().map(item_with_owner))
    }

    async fn insert_item(&mut self, item: &Item) -> Result<Item, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            INSERT INTO items (id, title, description, owner_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id, title, description, owner_id
            "#,
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.owner_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn update_item(&mut self, item: &Item) -> Result<Item, StoreError> {
        let item = sqlx::query_as::<_, Item>(
            r#"
            UPDATE items SET title = $2, description = $3, owner_id = $4
            WHERE id = $1
            RETURNING id, title, description, owner_id
            "#,
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.description)
        .bind(item.owner_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(item)
    }

    async fn delete_item(&mut self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}
