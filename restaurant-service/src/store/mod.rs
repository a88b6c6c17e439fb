//! Persistence seams for users, menu items, orders and the revenue stats row.
//!
//! `PgStore` is the production backend; `MemoryStore` keeps the same
//! semantics in process for local runs and tests.

use async_trait::async_trait;
use common_auth::Role;
use serde::Serialize;
use thiserror::Error;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("record already exists")]
    Duplicate,
    #[error("record not found")]
    NotFound,
    #[error("balance too low for this debit")]
    InsufficientFunds,
    #[error("user does not exist")]
    UnknownUser,
    #[error("record is still referenced")]
    InUse,
    #[error("invalid stored value: {0}")]
    InvalidRow(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserRecord {
    pub id: i64,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub balance: i64,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub balance: i64,
}

impl NewUser {
    /// Signup defaults: plain user, empty bank.
    pub fn customer(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
            role: Role::User,
            balance: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Item {
    pub id: i64,
    pub name: String,
    pub price: i64,
}

#[derive(Debug, Clone)]
pub struct NewItem {
    pub name: String,
    pub price: i64,
}

/// An order row. `status` is kept as stored so unknown values surface upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct OrderRecord {
    pub id: i64,
    pub user_id: i64,
    pub item_id: i64,
    pub status: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Stats {
    pub items_sold: i64,
    pub revenue: i64,
}

#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>>;

    /// Fails with `Duplicate` when the username is taken.
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord>;

    /// Overwrites the balance; the caller computes the new value.
    async fn adjust_balance(&self, user_id: i64, balance: i64) -> StoreResult<()>;
}

#[async_trait]
pub trait MenuStore: Send + Sync {
    async fn add_item(&self, item: NewItem) -> StoreResult<Item>;

    /// Returns whether a row was removed. Missing ids are not an error.
    async fn remove_item(&self, item_id: i64) -> StoreResult<bool>;

    async fn list_items(&self) -> StoreResult<Vec<Item>>;

    async fn find_item(&self, item_id: i64) -> StoreResult<Option<Item>>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Debits `price` from the user and inserts a `created` order as one unit.
    /// The debit is conditional on `balance >= price`; otherwise nothing changes
    /// and `InsufficientFunds` is returned. A missing user is `UnknownUser`, a
    /// missing item `NotFound`.
    async fn place_order(
        &self,
        user_id: i64,
        item_id: i64,
        price: i64,
        status: &str,
    ) -> StoreResult<OrderRecord>;

    async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderRecord>>;

    /// Compare-and-set on the status column; `false` when the row is gone or moved on.
    async fn update_status(&self, order_id: i64, expected: &str, next: &str) -> StoreResult<bool>;

    /// Deletes the order only while it still has `expected` status.
    async fn delete_order(&self, order_id: i64, expected: &str) -> StoreResult<bool>;

    async fn record_sale(&self, price: i64) -> StoreResult<()>;

    async fn stats(&self) -> StoreResult<Stats>;
}

/// Everything the service needs from persistence.
pub trait Store: CredentialStore + MenuStore + OrderStore {}

impl<T> Store for T where T: CredentialStore + MenuStore + OrderStore {}
