use common_auth::Role;
use tracing::info;

use crate::error::{ServiceError, ServiceResult};
use crate::guard::{require_role, AuthenticatedUser};
use crate::store::{Item, NewItem, Store, StoreError};

fn validate(item: &NewItem) -> ServiceResult<()> {
    if item.name.trim().is_empty() {
        return Err(ServiceError::validation("invalid_item", "Item name must not be empty"));
    }
    if item.price < 0 {
        return Err(ServiceError::validation("invalid_item", "Item price must not be negative"));
    }
    Ok(())
}

pub async fn add_item(store: &dyn Store, requester: &AuthenticatedUser, item: NewItem) -> ServiceResult<Item> {
    require_role(requester, Role::Admin)?;
    validate(&item)?;
    let item = store
        .add_item(NewItem { name: item.name.trim().to_string(), price: item.price })
        .await?;
    info!(item_id = item.id, name = %item.name, price = item.price, "Menu item added");
    Ok(item)
}

/// Idempotent: removing an id that is not on the menu succeeds.
pub async fn remove_item(store: &dyn Store, requester: &AuthenticatedUser, item_id: i64) -> ServiceResult<()> {
    require_role(requester, Role::Admin)?;
    match store.remove_item(item_id).await {
        Ok(removed) => {
            info!(item_id, removed, "Menu item remove requested");
            Ok(())
        }
        Err(StoreError::InUse) => Err(ServiceError::ItemInUse(item_id)),
        Err(err) => Err(err.into()),
    }
}

pub async fn list_items(store: &dyn Store) -> ServiceResult<Vec<Item>> {
    Ok(store.list_items().await?)
}
