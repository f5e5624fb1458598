use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartList, UpdateCartItemRequest},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    store::{CartRepository, CatalogRepository},
};

fn ensure_positive(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

pub async fn list_cart<S>(store: &S, user: &AuthUser) -> AppResult<CartList>
where
    S: CartRepository + ?Sized,
{
    let items = store.list_cart(user.user_id).await?;
    Ok(CartList { items })
}

/// Adds `quantity` of a product, merging into an existing row for the same product.
pub async fn add_to_cart<S>(
    store: &S,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<CartItem>
where
    S: CatalogRepository + CartRepository + ?Sized,
{
    ensure_positive(payload.quantity)?;

    if store.find_product(payload.product_id).await?.is_none() {
        return Err(AppError::NotFound);
    }

    let cart_item = store
        .add_or_increment(user.user_id, payload.product_id, payload.quantity)
        .await?;

    tracing::debug!(
        user_id = %user.user_id,
        product_id = %payload.product_id,
        quantity = cart_item.quantity,
        "cart item saved"
    );
    Ok(cart_item)
}

pub async fn update_cart_item<S>(
    store: &S,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<CartItem>
where
    S: CartRepository + ?Sized,
{
    ensure_positive(payload.quantity)?;
    store
        .set_quantity(user.user_id, item_id, payload.quantity)
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn remove_from_cart<S>(store: &S, user: &AuthUser, item_id: Uuid) -> AppResult<()>
where
    S: CartRepository + ?Sized,
{
    if !store.remove_item(user.user_id, item_id).await? {
        return Err(AppError::NotFound);
    }
    tracing::debug!(user_id = %user.user_id, cart_item_id = %item_id, "cart item removed");
    Ok(())
}
