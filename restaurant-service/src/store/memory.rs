use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::{
    CredentialStore, Item, MenuStore, NewItem, NewUser, OrderRecord, OrderStore, Stats,
    StoreError, StoreResult, UserRecord,
};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, UserRecord>,
    items: BTreeMap<i64, Item>,
    orders: BTreeMap<i64, OrderRecord>,
    stats: Stats,
    next_user_id: i64,
    next_item_id: i64,
    next_order_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// In-process store with the same observable behaviour as [`super::PgStore`].
///
/// A single mutex serialises every operation, which gives each call the
/// atomicity the Postgres backend gets from transactions and conditional updates.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        // Closures never leave the tables half-updated, so poisoning is ignored.
        let mut guard = self.tables.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        Ok(self.with_tables(|t| {
            t.users
                .values()
                .find(|user| user.username == username)
                .cloned()
        }))
    }

    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        self.with_tables(|t| {
            if t.users.values().any(|existing| existing.username == user.username) {
                return Err(StoreError::Duplicate);
            }
            let id = Tables::next_id(&mut t.next_user_id);
            let record = UserRecord {
                id,
                username: user.username,
                password_hash: user.password_hash,
                role: user.role,
                balance: user.balance,
            };
            t.users.insert(id, record.clone());
            Ok(record)
        })
    }

    async fn adjust_balance(&self, user_id: i64, balance: i64) -> StoreResult<()> {
        self.with_tables(|t| match t.users.get_mut(&user_id) {
            Some(user) => {
                user.balance = balance;
                Ok(())
            }
            None => Err(StoreError::NotFound),
        })
    }
}

#[async_trait]
impl MenuStore for MemoryStore {
    async fn add_item(&self, item: NewItem) -> StoreResult<Item> {
        Ok(self.with_tables(|t| {
            let id = Tables::next_id(&mut t.next_item_id);
            let item = Item { id, name: item.name, price: item.price };
            t.items.insert(id, item.clone());
            item
        }))
    }

    async fn remove_item(&self, item_id: i64) -> StoreResult<bool> {
        self.with_tables(|t| {
            if t.orders.values().any(|order| order.item_id == item_id) {
                return Err(StoreError::InUse);
            }
            Ok(t.items.remove(&item_id).is_some())
        })
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        Ok(self.with_tables(|t| t.items.values().cloned().collect()))
    }

    async fn find_item(&self, item_id: i64) -> StoreResult<Option<Item>> {
        Ok(self.with_tables(|t| t.items.get(&item_id).cloned()))
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(
        &self,
        user_id: i64,
        item_id: i64,
        price: i64,
        status: &str,
    ) -> StoreResult<OrderRecord> {
        self.with_tables(|t| {
            if !t.items.contains_key(&item_id) {
                return Err(StoreError::NotFound);
            }
            let user = t.users.get_mut(&user_id).ok_or(StoreError::UnknownUser)?;
            if user.balance < price {
                return Err(StoreError::InsufficientFunds);
            }
            user.balance -= price;

            let id = Tables::next_id(&mut t.next_order_id);
            let order = OrderRecord { id, user_id, item_id, status: status.to_string() };
            t.orders.insert(id, order.clone());
            Ok(order)
        })
    }

    async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderRecord>> {
        Ok(self.with_tables(|t| t.orders.get(&order_id).cloned()))
    }

    async fn update_status(&self, order_id: i64, expected: &str, next: &str) -> StoreResult<bool> {
        Ok(self.with_tables(|t| match t.orders.get_mut(&order_id) {
            Some(order) if order.status == expected => {
                order.status = next.to_string();
                true
            }
            _ => false,
        }))
    }

    async fn delete_order(&self, order_id: i64, expected: &str) -> StoreResult<bool> {
        Ok(self.with_tables(|t| {
            let matches = t
                .orders
                .get(&order_id)
                .is_some_and(|order| order.status == expected);
            if matches {
                t.orders.remove(&order_id);
            }
            matches
        }))
    }

    async fn record_sale(&self, price: i64) -> StoreResult<()> {
        self.with_tables(|t| {
            t.stats.items_sold += 1;
            t.stats.revenue += price;
        });
        Ok(())
    }

    async fn stats(&self) -> StoreResult<Stats> {
        Ok(self.with_tables(|t| t.stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryStore::new();
        store.create_user(NewUser::customer("alice", "h1")).await.unwrap();
        let err = store
            .create_user(NewUser::customer("alice", "h2"))
            .await
            .expect_err("duplicate");
        assert!(matches!(err, StoreError::Duplicate));
    }

    #[tokio::test]
    async fn place_order_is_all_or_nothing() {
        let store = MemoryStore::new();
        let user = store.create_user(NewUser::customer("bob", "h")).await.unwrap();
        let item = store.add_item(NewItem { name: "Soup".into(), price: 8 }).await.unwrap();
        store.adjust_balance(user.id, 5).await.unwrap();

        let err = store.place_order(user.id, item.id, 8, "created").await.expect_err("too poor");
        assert!(matches!(err, StoreError::InsufficientFunds));
        let unchanged = store.find_by_username("bob").await.unwrap().unwrap();
        assert_eq!(unchanged.balance, 5);
        assert!(store.find_order(1).await.unwrap().is_none());

        let err = store.place_order(user.id, 999, 1, "created").await.expect_err("no item");
        assert!(matches!(err, StoreError::NotFound));
        assert_eq!(store.find_by_username("bob").await.unwrap().unwrap().balance, 5);
    }

    #[tokio::test]
    async fn status_compare_and_set() {
        let store = MemoryStore::new();
        let user = store.create_user(NewUser::customer("carol", "h")).await.unwrap();
        let item = store.add_item(NewItem { name: "Tea".into(), price: 0 }).await.unwrap();
        let order = store.place_order(user.id, item.id, 0, "created").await.unwrap();

        assert!(!store.update_status(order.id, "done", "created").await.unwrap());
        assert!(store.update_status(order.id, "created", "being_made").await.unwrap());
        assert!(!store.delete_order(order.id, "created").await.unwrap());
        assert!(store.find_order(order.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn debit_for_missing_user_is_unknown_user() {
        let store = MemoryStore::new();
        let item = store.add_item(NewItem { name: "Tea".into(), price: 1 }).await.unwrap();
        let err = store.place_order(77, item.id, 1, "created").await.expect_err("no user");
        assert!(matches!(err, StoreError::UnknownUser));
        assert!(store.find_order(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn poisoned_lock_keeps_serving() {
        let store = MemoryStore::new();
        store.create_user(NewUser::customer("erin", "h")).await.unwrap();

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            store.with_tables(|_| panic!("handler bug"));
        }));
        assert!(panicked.is_err());
        assert!(store.tables.is_poisoned());

        let erin = store.find_by_username("erin").await.expect("store still usable");
        assert!(erin.is_some());
        store.add_item(NewItem { name: "Cake".into(), price: 2 }).await.unwrap();
    }

    #[tokio::test]
    async fn referenced_item_cannot_be_removed() {
        let store = MemoryStore::new();
        let user = store.create_user(NewUser::customer("dave", "h")).await.unwrap();
        let item = store.add_item(NewItem { name: "Pie".into(), price: 0 }).await.unwrap();
        store.place_order(user.id, item.id, 0, "created").await.unwrap();

        assert!(matches!(store.remove_item(item.id).await, Err(StoreError::InUse)));
        assert!(!store.remove_item(12345).await.unwrap());
    }
}
