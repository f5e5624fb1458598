use axum::{
    Json, Router,
    extract::State,
    routing::{get, put},
};
use uuid::Uuid;

use crate::{
    dto::cart::{AddToCartRequest, CartList, UpdateCartItemRequest},
    error::AppResult,
    extract::{AppJson, AppPath},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Deleted, Meta},
    services::cart_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(cart_list).post(add_to_cart))
        .route("/{id}", put(update_cart_item).delete(remove_from_cart))
}

#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "Cart lines with their products", body = ApiResponse<CartList>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Cart"
)]
pub async fn cart_list(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<CartList>>> {
    let data = cart_service::list_cart(state.store.as_ref(), &user).await?;
    let meta = Meta::all(data.items.len());
    Ok(Json(ApiResponse::success("Cart", data, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/cart",
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Item added or merged", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Product not found")
    ),
    tag = "Cart"
)]
pub async fn add_to_cart(
    State(state): State<AppState>,
    user: AuthUser,
    AppJson(payload): AppJson<AddToCartRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let item = cart_service::add_to_cart(state.store.as_ref(), &user, payload).await?;
    Ok(Json(ApiResponse::success("Added to cart", item, None)))
}

#[utoipa::path(
    put,
    path = "/cart/{id}",
    params(("id" = Uuid, Path, description = "Cart item id")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Quantity updated", body = ApiResponse<CartItem>),
        (status = 400, description = "Invalid quantity"),
        (status = 404, description = "Cart item not found")
    ),
    tag = "Cart"
)]
pub async fn update_cart_item(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateCartItemRequest>,
) -> AppResult<Json<ApiResponse<CartItem>>> {
    let item = cart_service::update_cart_item(state.store.as_ref(), &user, id, payload).await?;
    Ok(Json(ApiResponse::success("Cart item updated", item, None)))
}

#[utoipa::path(
    delete,
    path = "/cart/{id}",
    params(("id" = Uuid, Path, description = "Cart item id")),
    responses(
        (status = 200, description = "Removed from cart", body = ApiResponse<Deleted>),
        (status = 404, description = "Cart item not found")
    ),
    tag = "Cart"
)]
pub async fn remove_from_cart(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    cart_service::remove_from_cart(state.store.as_ref(), &user, id).await?;
    Ok(Json(ApiResponse::success(
        "Removed from cart",
        Deleted { id },
        None,
    )))
}
