use rust_decimal::Decimal;
use storefront_api::{
    config::AppConfig,
    db::{create_pool, run_migrations},
    dto::auth::RegisterRequest,
    error::AppError,
    models::Role,
    services::auth_service::register_user,
    storage::{LocalPhotoStorage, PhotoStorage},
    store::{CatalogRepository, NewProduct, PgStore},
};

// 1x1 transparent PNG used as a placeholder photo.
const PLACEHOLDER_PNG: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url, 2).await?;
    run_migrations(&pool).await?;
    let store = PgStore::new(pool);
    let photos = LocalPhotoStorage::new(&config.upload_dir).await?;

    ensure_user(&store, "Admin", "admin@example.com", "admin123", Role::Admin).await?;
    ensure_user(&store, "Customer", "user@example.com", "user123", Role::Customer).await?;
    seed_products(&store, &photos).await?;

    println!("Seed completed");
    Ok(())
}

async fn ensure_user(
    store: &PgStore,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> anyhow::Result<()> {
    let request = RegisterRequest {
        name: name.into(),
        email: email.into(),
        password: password.into(),
        role: Some(role),
    };
    match register_user(store, request).await {
        Ok(user) => println!("Created user {} (role={})", user.email, role.as_str()),
        Err(AppError::Conflict(_)) => println!("User {email} already exists"),
        Err(err) => return Err(err.into()),
    }
    Ok(())
}

async fn seed_products(store: &PgStore, photos: &LocalPhotoStorage) -> anyhow::Result<()> {
    let (_, total) = store.list_products(1, 0).await?;
    if total > 0 {
        println!("Catalog already has {total} products, skipping");
        return Ok(());
    }

    let products = [
        ("Axum Hoodie", "Warm hoodie for Rustaceans", Decimal::new(5500, 2)),
        ("Ferris Mug", "Coffee tastes better with Ferris", Decimal::new(1200, 2)),
        ("Rust Sticker Pack", "Decorate your laptop", Decimal::new(500, 2)),
        ("E-book: Async Rust", "Learn async Rust patterns", Decimal::new(2500, 2)),
    ];

    for (name, description, price) in products {
        let reference = photos
            .store("placeholder.png", PLACEHOLDER_PNG.to_vec())
            .await?;
        store
            .insert_product(NewProduct {
                name: name.into(),
                description: description.into(),
                price,
                photo: photos.resolve(&reference),
            })
            .await?;
    }

    println!("Seeded products");
    Ok(())
}
