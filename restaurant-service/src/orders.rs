//! Order placement, the status state machine and the revenue snapshot.
//!
//! Status flow: `created -> being_made -> done -> (row deleted)`.

use std::fmt;

use common_auth::{AuthError, Role};
use serde::Serialize;
use tracing::{info, warn};

use crate::error::{ServiceError, ServiceResult};
use crate::guard::{require_role, AuthenticatedUser};
use crate::store::{OrderRecord, Stats, Store, StoreError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Created,
    BeingMade,
    Done,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Created => "created",
            OrderStatus::BeingMade => "being_made",
            OrderStatus::Done => "done",
        }
    }

    /// Parses a stored status. Rows written by older deployments used "being made".
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "created" => Some(OrderStatus::Created),
            "being_made" | "being made" => Some(OrderStatus::BeingMade),
            "done" => Some(OrderStatus::Done),
            _ => None,
        }
    }

    /// The state reached by one advance; `None` means the order is removed.
    pub fn next(self) -> Option<Self> {
        match self {
            OrderStatus::Created => Some(OrderStatus::BeingMade),
            OrderStatus::BeingMade => Some(OrderStatus::Done),
            OrderStatus::Done => None,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub order: OrderRecord,
    pub price: i64,
    /// False when the order went through but the stats row was not updated.
    pub stats_recorded: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusChange {
    Advanced { order_id: i64, from: OrderStatus, to: OrderStatus },
    Removed { order_id: i64 },
}

/// Resolves the charge for `item_id`. The catalog price is authoritative; a
/// client-supplied price must agree with it.
pub async fn price_for(store: &dyn Store, item_id: i64, requested: Option<i64>) -> ServiceResult<i64> {
    let item = store
        .find_item(item_id)
        .await?
        .ok_or(ServiceError::ItemNotFound(item_id))?;
    match requested {
        Some(price) if price != item.price => Err(ServiceError::validation(
            "price_mismatch",
            format!("item {item_id} costs {}, not {price}", item.price),
        )),
        _ => Ok(item.price),
    }
}

pub async fn place_order(
    store: &dyn Store,
    user: &AuthenticatedUser,
    item_id: i64,
    price: i64,
) -> ServiceResult<PlacedOrder> {
    if price < 0 {
        return Err(ServiceError::validation("invalid_price", "Price must not be negative"));
    }
    if user.balance < price {
        return Err(ServiceError::InsufficientFunds);
    }

    // Debit and insert commit together; the store re-checks the balance.
    let order = match store
        .place_order(user.id, item_id, price, OrderStatus::Created.as_str())
        .await
    {
        Ok(order) => order,
        Err(StoreError::InsufficientFunds) => return Err(ServiceError::InsufficientFunds),
        Err(StoreError::NotFound) => return Err(ServiceError::ItemNotFound(item_id)),
        Err(StoreError::UnknownUser) => {
            return Err(AuthError::UnknownSubject(user.username.clone()).into())
        }
        Err(err) => return Err(err.into()),
    };
    info!(order_id = order.id, user_id = user.id, item_id, price, "Order placed");

    let stats_recorded = match store.record_sale(price).await {
        Ok(()) => true,
        Err(err) => {
            warn!(order_id = order.id, error = %err, "Failed to update revenue stats");
            false
        }
    };

    Ok(PlacedOrder { order, price, stats_recorded })
}

pub async fn advance_status(
    store: &dyn Store,
    requester: &AuthenticatedUser,
    order_id: i64,
) -> ServiceResult<StatusChange> {
    require_role(requester, Role::Admin)?;

    let order = store
        .find_order(order_id)
        .await?
        .ok_or(ServiceError::OrderNotFound(order_id))?;
    let current = OrderStatus::parse(&order.status).ok_or_else(|| ServiceError::InvalidState {
        order_id,
        status: order.status.clone(),
    })?;

    let applied = match current.next() {
        Some(next) => store.update_status(order_id, &order.status, next.as_str()).await?,
        None => store.delete_order(order_id, &order.status).await?,
    };
    if !applied {
        return match store.find_order(order_id).await? {
            None => Err(ServiceError::OrderNotFound(order_id)),
            Some(_) => Err(ServiceError::ConcurrentUpdate(order_id)),
        };
    }

    let change = match current.next() {
        Some(to) => StatusChange::Advanced { order_id, from: current, to },
        None => StatusChange::Removed { order_id },
    };
    info!(order_id, from = %current, ?change, "Order status advanced");
    Ok(change)
}

pub async fn revenue_snapshot(store: &dyn Store, requester: &AuthenticatedUser) -> ServiceResult<Stats> {
    require_role(requester, Role::Admin)?;
    Ok(store.stats().await?)
}
