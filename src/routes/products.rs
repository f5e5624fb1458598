use axum::{
    Json, Router,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    routing::get,
};
use uuid::Uuid;

use crate::{
    dto::products::{PhotoUpload, ProductForm, ProductFormSchema, ProductList},
    error::{AppError, AppResult},
    extract::{AppPath, AppQuery},
    middleware::auth::{AdminUser, AuthUser},
    models::Product,
    response::{ApiResponse, Deleted, Meta},
    routes::params::Pagination,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

/// Reads the multipart body; the `photo` part is a file, the rest are text.
async fn read_product_form(mut multipart: Multipart) -> AppResult<ProductForm> {
    let mut form = ProductForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == "photo" {
            let file_name = field.file_name().unwrap_or("photo").to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            if !bytes.is_empty() {
                form.photo = Some(PhotoUpload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            form.set_text(&name, value)?;
        }
    }
    Ok(form)
}

#[utoipa::path(
    get,
    path = "/products",
    params(Pagination),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    _user: AuthUser,
    AppQuery(pagination): AppQuery<Pagination>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let (data, meta) = product_service::list_products(state.store.as_ref(), pagination).await?;
    Ok(Json(ApiResponse::success("Products", data, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    _user: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let product = product_service::get_product(state.store.as_ref(), id).await?;
    Ok(Json(ApiResponse::success(
        "Product",
        product,
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body(content = ProductFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Missing field or photo"),
        (status = 403, description = "Admin only")
    ),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<(StatusCode, Json<ApiResponse<Product>>)> {
    let form = read_product_form(multipart?).await?;
    let product = product_service::create_product(
        state.store.as_ref(),
        state.photos.as_ref(),
        &user,
        form,
    )
    .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Product created", product, None)),
    ))
}

#[utoipa::path(
    put,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    request_body(content = ProductFormSchema, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Update product", body = ApiResponse<Product>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    AppPath(id): AppPath<Uuid>,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let form = read_product_form(multipart?).await?;
    let product = product_service::update_product(
        state.store.as_ref(),
        state.photos.as_ref(),
        &user,
        id,
        form,
    )
    .await?;
    Ok(Json(ApiResponse::success("Product updated", product, None)))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product id")),
    responses(
        (status = 200, description = "Delete product", body = ApiResponse<Deleted>),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Product not found")
    ),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    AdminUser(user): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<Json<ApiResponse<Deleted>>> {
    product_service::delete_product(state.store.as_ref(), state.photos.as_ref(), &user, id).await?;
    Ok(Json(ApiResponse::success(
        "Product deleted",
        Deleted { id },
        None,
    )))
}
