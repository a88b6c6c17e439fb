use std::sync::Arc;

use async_trait::async_trait;
use common_auth::{JwtConfig, JwtVerifier, Role, TokenSigner};
use restaurant_service::accounts::{ensure_admin, login, signup};
use restaurant_service::guard::Guard;
use restaurant_service::menu::{add_item, list_items, remove_item};
use restaurant_service::orders::{advance_status, place_order, revenue_snapshot, StatusChange};
use restaurant_service::store::{
    CredentialStore, Item, MemoryStore, MenuStore, NewItem, NewUser, OrderRecord, OrderStore,
    Stats, Store, StoreError, StoreResult, UserRecord,
};
use restaurant_service::ServiceError;

const SECRET: &str = "ordering-flow-secret";

struct Harness {
    store: Arc<dyn Store>,
    signer: TokenSigner,
    guard: Guard,
}

impl Harness {
    fn new(store: Arc<dyn Store>) -> Self {
        let config = JwtConfig::new("restaurant-service", "restaurant-clients");
        let signer = TokenSigner::new(SECRET, config.clone()).unwrap();
        let verifier = Arc::new(JwtVerifier::new(SECRET, config).unwrap());
        let guard = Guard::new(verifier, store.clone());
        Self { store, signer, guard }
    }

    async fn token(&self, username: &str, password: &str) -> String {
        login(self.store.as_ref(), &self.signer, username, password)
            .await
            .expect("login")
            .token
    }
}

#[tokio::test]
async fn full_ordering_scenario() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    let store = h.store.as_ref();

    ensure_admin(store, "root", "toor").await.unwrap();
    let admin = h.guard.resolve(&h.token("root", "toor").await).await.unwrap();
    assert_eq!(admin.role, Role::Admin);

    let burger = add_item(store, &admin, NewItem { name: "Burger".into(), price: 10 })
        .await
        .unwrap();
    assert_eq!(list_items(store).await.unwrap(), vec![burger.clone()]);

    let alice_record = signup(store, "alice", "pw").await.unwrap();
    assert_eq!(alice_record.balance, 0);
    let alice_token = h.token("alice", "pw").await;

    let alice = h.guard.resolve(&alice_token).await.unwrap();
    let err = place_order(store, &alice, burger.id, burger.price).await.expect_err("broke");
    assert!(matches!(err, ServiceError::InsufficientFunds));

    store.adjust_balance(alice_record.id, 20).await.unwrap();
    let alice = h.guard.resolve(&alice_token).await.unwrap();
    assert_eq!(alice.balance, 20);
    let placed = place_order(store, &alice, burger.id, burger.price).await.unwrap();
    assert_eq!(placed.order.status, "created");
    assert_eq!(h.guard.resolve(&alice_token).await.unwrap().balance, 10);

    let order_id = placed.order.id;
    for _ in 0..2 {
        assert!(matches!(
            advance_status(store, &admin, order_id).await.unwrap(),
            StatusChange::Advanced { .. }
        ));
    }
    assert_eq!(
        advance_status(store, &admin, order_id).await.unwrap(),
        StatusChange::Removed { order_id }
    );
    assert!(matches!(
        advance_status(store, &admin, order_id).await,
        Err(ServiceError::OrderNotFound(_))
    ));

    assert_eq!(
        revenue_snapshot(store, &admin).await.unwrap(),
        Stats { items_sold: 1, revenue: 10 }
    );
}

#[tokio::test]
async fn user_token_rejected_by_admin_operations() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    let store = h.store.as_ref();
    signup(store, "bob", "pw").await.unwrap();
    let bob = h.guard.resolve(&h.token("bob", "pw").await).await.unwrap();

    let forbidden = |r: Result<(), ServiceError>| matches!(r, Err(ServiceError::Forbidden { required: Role::Admin }));
    assert!(forbidden(add_item(store, &bob, NewItem { name: "Fries".into(), price: 3 }).await.map(|_| ())));
    assert!(forbidden(remove_item(store, &bob, 1).await));
    assert!(forbidden(advance_status(store, &bob, 1).await.map(|_| ())));
    assert!(forbidden(revenue_snapshot(store, &bob).await.map(|_| ())));
    assert!(list_items(store).await.unwrap().is_empty());
}

#[tokio::test]
async fn wrong_password_never_yields_token() {
    let h = Harness::new(Arc::new(MemoryStore::new()));
    signup(h.store.as_ref(), "carol", "right").await.unwrap();
    for attempt in ["wrong", "", "Right", "right "] {
        let result = login(h.store.as_ref(), &h.signer, "carol", attempt).await;
        assert!(matches!(result, Err(ServiceError::IncorrectPassword)), "attempt {attempt:?}");
    }
}

/// Delegates to a [`MemoryStore`] but refuses to update the stats row.
struct BrokenStats(MemoryStore);

#[async_trait]
impl CredentialStore for BrokenStats {
    async fn find_by_username(&self, username: &str) -> StoreResult<Option<UserRecord>> {
        self.0.find_by_username(username).await
    }
    async fn create_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        self.0.create_user(user).await
    }
    async fn adjust_balance(&self, user_id: i64, balance: i64) -> StoreResult<()> {
        self.0.adjust_balance(user_id, balance).await
    }
}

#[async_trait]
impl MenuStore for BrokenStats {
    async fn add_item(&self, item: NewItem) -> StoreResult<Item> {
        self.0.add_item(item).await
    }
    async fn remove_item(&self, item_id: i64) -> StoreResult<bool> {
        self.0.remove_item(item_id).await
    }
    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        self.0.list_items().await
    }
    async fn find_item(&self, item_id: i64) -> StoreResult<Option<Item>> {
        self.0.find_item(item_id).await
    }
}

#[async_trait]
impl OrderStore for BrokenStats {
    async fn place_order(&self, user_id: i64, item_id: i64, price: i64, status: &str) -> StoreResult<OrderRecord> {
        self.0.place_order(user_id, item_id, price, status).await
    }
    async fn find_order(&self, order_id: i64) -> StoreResult<Option<OrderRecord>> {
        self.0.find_order(order_id).await
    }
    async fn update_status(&self, order_id: i64, expected: &str, next: &str) -> StoreResult<bool> {
        self.0.update_status(order_id, expected, next).await
    }
    async fn delete_order(&self, order_id: i64, expected: &str) -> StoreResult<bool> {
        self.0.delete_order(order_id, expected).await
    }
    async fn record_sale(&self, _price: i64) -> StoreResult<()> {
        Err(StoreError::NotFound)
    }
    async fn stats(&self) -> StoreResult<Stats> {
        self.0.stats().await
    }
}

#[tokio::test]
async fn stats_failure_does_not_fail_the_order() {
    let h = Harness::new(Arc::new(BrokenStats(MemoryStore::new())));
    let store = h.store.as_ref();
    let item = store.add_item(NewItem { name: "Soup".into(), price: 4 }).await.unwrap();
    let user = store.create_user(NewUser::customer("dave", "hash")).await.unwrap();
    store.adjust_balance(user.id, 4).await.unwrap();
    let dave = restaurant_service::guard::AuthenticatedUser {
        id: user.id,
        username: user.username,
        role: user.role,
        balance: 4,
    };

    let placed = place_order(store, &dave, item.id, 4).await.expect("order still placed");
    assert!(!placed.stats_recorded);
    assert_eq!(store.find_by_username("dave").await.unwrap().unwrap().balance, 0);
    assert_eq!(store.stats().await.unwrap(), Stats::default());
}
