use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::orders::OrderList,
    error::AppResult,
    extract::AppPath,
    middleware::auth::{AdminUser, AuthUser},
    models::OrderWithInventory,
    response::{ApiResponse, Meta},
    services::order_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_orders).post(place_order))
        .route("/all", get(list_all_orders))
        .route("/{id}", get(get_order))
}

#[utoipa::path(
    post,
    path = "/orders",
    responses(
        (status = 201, description = "Order placed from the cart", body = ApiResponse<OrderWithInventory>),
        (status = 400, description = "Cart is empty"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Orders"
)]
pub async fn place_order(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<(StatusCode, Json<ApiResponse<OrderWithInventory>>)> {
    let placed = order_service::place_order(state.store.as_ref(), &user).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Order placed", placed, None)),
    ))
}

#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "Caller's orders, newest first", body = ApiResponse<OrderList>)
    ),
    tag = "Orders"
)]
pub async fn list_orders(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let data = order_service::list_orders(state.store.as_ref(), &user).await?;
    let meta = Meta::all(data.items.len());
    Ok(Json(ApiResponse::success("Orders", data, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/orders/all",
    responses(
        (status = 200, description = "Every order", body = ApiResponse<OrderList>),
        (status = 403, description = "Admin only")
    ),
    tag = "Orders"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let data = order_service::list_all_orders(state.store.as_ref(), &user).await?;
    let meta = Meta::all(data.items.len());
    Ok(Json(ApiResponse::success("Orders", data, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order id")),
    responses(
        (status = 200, description = "Order with its inventory", body = ApiResponse<OrderWithInventory>),
        (status = 404, description = "Order not found")
    ),
    tag = "Orders"
)]
pub async fn get_order(
    State(state): State<AppState>,
    user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<OrderWithInventory>>> {
    let order = order_service::get_order(state.store.as_ref(), &user, id).await?;
    Ok(Json(ApiResponse::success(
        "Order",
        order,
        Some(Meta::empty()),
    )))
}
