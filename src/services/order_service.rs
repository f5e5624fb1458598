use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    dto::orders::OrderList,
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{CartLine, OrderWithInventory},
    store::{NewInventoryLine, NewOrder, OrderRepository},
};

/// Σ(quantity × current unit price).
pub fn compute_bill(lines: &[CartLine]) -> Decimal {
    lines
        .iter()
        .map(|line| line.product.price * Decimal::from(line.quantity))
        .sum()
}

/// Converts the caller's cart into an order with inventory snapshots and
/// empties the cart, all inside one checkout scope.
///
/// Any failure before `commit` drops the scope, which rolls back every write:
/// the cart stays as it was and no order becomes visible. There is no
/// idempotency key, so a retried request after a lost response places a
/// second order.
pub async fn place_order<S>(store: &S, user: &AuthUser) -> AppResult<OrderWithInventory>
where
    S: OrderRepository + ?Sized,
{
    let mut txn = store.begin_checkout().await?;

    let lines = txn.lock_cart(user.user_id).await?;
    if lines.is_empty() {
        return Err(AppError::InvalidState("Cart is empty".into()));
    }

    let bill = compute_bill(&lines);

    let order = txn
        .insert_order(NewOrder {
            user_id: user.user_id,
            bill,
            created_at: Utc::now(),
        })
        .await?;

    let mut inventory = Vec::with_capacity(lines.len());
    for line in &lines {
        let snapshot = txn
            .insert_inventory_line(NewInventoryLine {
                order_id: order.id,
                name: line.product.name.clone(),
                price: line.product.price,
                quantity: line.quantity,
            })
            .await?;
        inventory.push(snapshot);
    }

    txn.clear_cart(user.user_id).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = %order.id,
        user_id = %user.user_id,
        lines = inventory.len(),
        bill = %order.bill,
        "order placed"
    );

    Ok(OrderWithInventory { order, inventory })
}

pub async fn list_orders<S>(store: &S, user: &AuthUser) -> AppResult<OrderList>
where
    S: OrderRepository + ?Sized,
{
    let items = store.list_orders(Some(user.user_id)).await?;
    Ok(OrderList { items })
}

pub async fn list_all_orders<S>(store: &S, user: &AuthUser) -> AppResult<OrderList>
where
    S: OrderRepository + ?Sized,
{
    ensure_admin(user)?;
    let items = store.list_orders(None).await?;
    Ok(OrderList { items })
}

pub async fn get_order<S>(store: &S, user: &AuthUser, id: Uuid) -> AppResult<OrderWithInventory>
where
    S: OrderRepository + ?Sized,
{
    store
        .find_order(user.user_id, id)
        .await?
        .ok_or(AppError::NotFound)
}
