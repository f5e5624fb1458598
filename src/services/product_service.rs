use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    dto::products::{PhotoUpload, ProductForm, ProductList},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::Meta,
    routes::params::Pagination,
    storage::{PhotoStorage, reference_from_url},
    store::{CatalogRepository, NewProduct, ProductChanges},
};

/// Largest value a `NUMERIC(12, 2)` price column holds.
pub const MAX_PRICE: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

pub async fn list_products<S>(store: &S, pagination: Pagination) -> AppResult<(ProductList, Meta)>
where
    S: CatalogRepository + ?Sized,
{
    let (page, limit, offset) = pagination.normalize();
    let (items, total) = store.list_products(limit as u64, offset as u64).await?;
    Ok((ProductList { items }, Meta::new(page, limit, total as i64)))
}

pub async fn get_product<S>(store: &S, id: Uuid) -> AppResult<Product>
where
    S: CatalogRepository + ?Sized,
{
    store.find_product(id).await?.ok_or(AppError::NotFound)
}

pub async fn create_product<S>(
    store: &S,
    photos: &dyn PhotoStorage,
    user: &AuthUser,
    form: ProductForm,
) -> AppResult<Product>
where
    S: CatalogRepository + ?Sized,
{
    ensure_admin(user)?;
    let ProductForm {
        name,
        description,
        price,
        photo,
    } = form;

    let name = validate_name(name.ok_or_else(|| AppError::BadRequest("name is required".into()))?)?;
    let description =
        description.ok_or_else(|| AppError::BadRequest("description is required".into()))?;
    let price = validate_price(price.ok_or_else(|| AppError::BadRequest("price is required".into()))?)?;
    let photo = photo.ok_or_else(|| AppError::BadRequest("Photo is required".into()))?;

    let photo = store_photo(photos, photo).await?;
    let inserted = store
        .insert_product(NewProduct {
            name,
            description,
            price,
            photo: photo.clone(),
        })
        .await;
    let product = match inserted {
        Ok(product) => product,
        Err(err) => {
            discard_photo(photos, &photo).await;
            return Err(err);
        }
    };

    tracing::info!(product_id = %product.id, user_id = %user.user_id, "product created");
    Ok(product)
}

/// Applies only the fields present in the form. A replaced photo is removed
/// from storage once the row points at the new one.
pub async fn update_product<S>(
    store: &S,
    photos: &dyn PhotoStorage,
    user: &AuthUser,
    id: Uuid,
    form: ProductForm,
) -> AppResult<Product>
where
    S: CatalogRepository + ?Sized,
{
    ensure_admin(user)?;
    let existing = store.find_product(id).await?.ok_or(AppError::NotFound)?;

    let name = form.name.map(validate_name).transpose()?;
    let price = form.price.map(validate_price).transpose()?;
    let photo = match form.photo {
        Some(photo) => Some(store_photo(photos, photo).await?),
        None => None,
    };
    let changes = ProductChanges {
        name,
        description: form.description,
        price,
        photo: photo.clone(),
    };

    let product = match store.update_product(id, changes).await {
        Ok(Some(product)) => product,
        outcome => {
            if let Some(photo) = &photo {
                discard_photo(photos, photo).await;
            }
            return Err(outcome.err().unwrap_or(AppError::NotFound));
        }
    };

    if photo.is_some() && existing.photo != product.photo {
        discard_photo(photos, &existing.photo).await;
    }

    tracing::info!(product_id = %product.id, user_id = %user.user_id, "product updated");
    Ok(product)
}

pub async fn delete_product<S>(
    store: &S,
    photos: &dyn PhotoStorage,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<()>
where
    S: CatalogRepository + ?Sized,
{
    ensure_admin(user)?;
    let existing = store.find_product(id).await?.ok_or(AppError::NotFound)?;
    if !store.delete_product(id).await? {
        return Err(AppError::NotFound);
    }
    discard_photo(photos, &existing.photo).await;
    tracing::info!(product_id = %id, user_id = %user.user_id, "product deleted");
    Ok(())
}

fn validate_name(name: String) -> AppResult<String> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    Ok(name)
}

fn validate_price(price: Decimal) -> AppResult<Decimal> {
    if price.is_sign_negative() {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if price.normalize().scale() > 2 {
        return Err(AppError::BadRequest(
            "price supports at most 2 decimal places".into(),
        ));
    }
    if price > MAX_PRICE {
        return Err(AppError::BadRequest(format!(
            "price must not exceed {MAX_PRICE}"
        )));
    }
    Ok(price)
}

/// Stores the upload and returns its public URL.
async fn store_photo(photos: &dyn PhotoStorage, photo: PhotoUpload) -> AppResult<String> {
    if photo.bytes.is_empty() {
        return Err(AppError::BadRequest("Photo is required".into()));
    }
    let reference = photos.store(&photo.file_name, photo.bytes).await?;
    Ok(photos.resolve(&reference))
}

// Removal failures are logged, not returned.
async fn discard_photo(photos: &dyn PhotoStorage, url: &str) {
    let Some(reference) = reference_from_url(url) else {
        return;
    };
    if let Err(err) = photos.remove(reference).await {
        tracing::warn!(error = %err, reference, "unable to remove photo");
    }
}
