use async_trait::async_trait;
use common_auth::Role;
use sqlx::{FromRow, PgPool};

use super::{
    CredentialStore, Item, MenuStore, NewItem, NewUser, OrderRecord, OrderStore, Stats,
    StoreError, StoreResult, UserRecord,
};

const FOREIGN_KEY_VIOLATION: &str = "23503";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct UserRow {
    id: i64,
    username: String,
    password: String,
    role: String,
    bank: i64,
}

impl TryFrom<UserRow> for UserRecord {
    type Error = StoreError;

    fn try_from(row: UserRow) -> StoreResult<Self> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|err| StoreError::InvalidRow(format!("user {}: {err}", row.id)))?;
        Ok(UserRecord {
            id: row.id,
            username: row.username,
            password_hash: row.password,
            role,
            balance: row.bank,
        })
    }
}

fn constraint_code(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password, role, bank FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(UserRecord::try_from).transpose()
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        // The unique index decides; no separate existence lookup.
        let row = sqlx::query_as::<_, UserRow>(
            "INSERT INTO users (username, password, role, bank) VALUES ($1, $2, $3, $4)
             ON CONFLICT (username) DO NOTHING
             RETURNING id, username, password, role, bank",
        )
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.balance)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => UserRecord::try_from(row),
            None => Err(StoreError::Duplicate),
        }
    }

    async fn adjust_balance(&self, user_id: i64, balance: i64) -> StoreResult<()> {
        let result = sqlx::query("UPDATE users SET bank = $1 WHERE id = $2")
            .bind(balance)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl MenuStore for PgStore {
    async fn add_item(&self, item: NewItem) -> StoreResult<Item> {
        let item = sqlx::query_as::<_, Item>(
            "INSERT INTO items (name, price) VALUES ($1, $2) RETURNING id, name, price",
        )
        .bind(item.name)
        .bind(item.price)
        .fetch_one(&self.pool)
        .await?;
        Ok(item)
    }

    async fn remove_item(&self, item_id: i64) -> StoreResult<bool> {
        match sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(item_id)
            .execute(&self.pool)
            .await
        {
            Ok(result) => Ok(result.rows_affected() > 0),
            Err(err) if constraint_code(&err).as_deref() == Some(FOREIGN_KEY_VIOLATION) => {
                Err(StoreError::InUse)
            }
            Err(err) => Err(err.into()),
        }
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let items = sqlx::query_as::<_, Item>("SELECT id, name, price FROM items ORDER BY id")
            .fetch_all(&self.pool)
            .await?;
        Ok(items)
    }

    async fn find_item(&self, item_id: i64) -> StoreResult<Option<Item>> {
        let item = sqlx::query_as::<_, Item>("SELECT id, name, price FROM items WHERE id = $1")
            .bind(item_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(item)
    }
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(
        &self,
        user_id: i64,
        item_id: i64,
        price: i64,
        status: &str,
    ) -> StoreResult<OrderRecord> {
        let mut tx = self.pool.begin().await?;

        let debited = sqlx::query("UPDATE users SET bank = bank - $1 WHERE id = $2 AND bank >= $1")
            .bind(price)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;
        if debited.rows_affected() == 0 {
            let exists = sqlx::query_scalar::<_, i64>("SELECT id FROM users WHERE id = $1")
                .bind(user_id)
                .fetch_optional(&mut *tx)
                .await?
                .is_some();
            tx.rollback().await?;
            return Err(if exists {
                StoreError::InsufficientFunds
            } else {
                StoreError::UnknownUser
            });
        }

        let order = match sqlx::query_as::<_, OrderRecord>(
            "INSERT INTO orders (user_id, item_id, status) VALUES ($1, $2, $3)
             RETURNING id, user_id, item_id, status",
        )
        .bind(user_id)
        .bind(item_id)
        .bind(status)
        .fetch_one(&mut *tx)
        .await
        {
            Ok(order) => order,
            Err(err) => {
                // Dropping the transaction rolls the debit back.
                if constraint_code(&err).as_deref() == Some(FOREIGN_KEY_VIOLATION) {
                    return Err(StoreError::NotFound);
                }
                return Err(err.into());
            }
        };

        tx.commit().await?;
        Ok(order)
    }

    async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderRecord>> {
        let order = sqlx::query_as::<_, OrderRecord>(
            "SELECT id, user_id, item_id, status FROM orders WHERE id = $1",
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(order)
    }

    async fn update_status(&self, order_id: i64, expected: &str, next: &str) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET status = $1 WHERE id = $2 AND status = $3")
            .bind(next)
            .bind(order_id)
            .bind(expected)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_order(&self, order_id: i64, expected: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM orders WHERE id = $1 AND status = $2")
            .bind(order_id)
            .bind(expected)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_sale(&self, price: i64) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE stats SET items_sold = items_sold + 1, revenue = revenue + $1 WHERE id = 1",
        )
        .bind(price)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn stats(&self) -> StoreResult<Stats> {
        let stats = sqlx::query_as::<_, Stats>("SELECT items_sold, revenue FROM stats WHERE id = 1")
            .fetch_optional(&self.pool)
            .await?;
        Ok(stats.unwrap_or_default())
    }
}
