use rust_decimal::Decimal;
use storefront_api::{
    db::{create_pool, run_migrations},
    dto::{auth::RegisterRequest, cart::AddToCartRequest},
    error::AppError,
    middleware::auth::AuthUser,
    models::Role,
    services::{auth_service, cart_service, order_service},
    store::{CartRepository, CatalogRepository, NewProduct, PgStore},
};
use uuid::Uuid;

// Cart -> checkout -> history against a real database, then a second checkout
// of the now-empty cart.
#[tokio::test]
async fn checkout_flow_against_postgres() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;
    let store = PgStore::new(pool);

    let registered = auth_service::register_user(
        &store,
        RegisterRequest {
            name: "Flow".into(),
            email: format!("flow-{}@example.com", Uuid::new_v4()),
            password: "pw".into(),
            role: None,
        },
    )
    .await?;
    let user = AuthUser {
        user_id: registered.id,
        role: Role::Customer,
    };

    let a = store
        .insert_product(NewProduct {
            name: "Flow A".into(),
            description: "first".into(),
            price: Decimal::new(1000, 2),
            photo: "/uploads/a.png".into(),
        })
        .await?;
    let b = store
        .insert_product(NewProduct {
            name: "Flow B".into(),
            description: "second".into(),
            price: Decimal::new(500, 2),
            photo: "/uploads/b.png".into(),
        })
        .await?;

    for (product_id, quantity) in [(a.id, 1), (a.id, 1), (b.id, 1)] {
        cart_service::add_to_cart(
            &store,
            &user,
            AddToCartRequest {
                product_id,
                quantity,
            },
        )
        .await?;
    }
    let cart = store.list_cart(user.user_id).await?;
    assert_eq!(cart.len(), 2);

    let placed = order_service::place_order(&store, &user).await?;
    assert_eq!(placed.order.bill, Decimal::new(2500, 2));
    assert_eq!(placed.inventory.len(), 2);
    assert!(store.list_cart(user.user_id).await?.is_empty());

    let again = order_service::place_order(&store, &user).await;
    assert!(matches!(again, Err(AppError::InvalidState(_))));

    // snapshots outlive the catalog rows they were copied from
    store.delete_product(a.id).await?;
    store.delete_product(b.id).await?;
    let fetched = order_service::get_order(&store, &user, placed.order.id).await?;
    assert_eq!(fetched.inventory_total(), Decimal::new(2500, 2));

    let history = order_service::list_orders(&store, &user).await?;
    assert_eq!(history.items.len(), 1);

    Ok(())
}

fn database_url() -> Option<String> {
    std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .ok()
}

async fn customer_with_product(store: &PgStore, price: Decimal) -> anyhow::Result<(AuthUser, Uuid)> {
    let registered = auth_service::register_user(
        store,
        RegisterRequest {
            name: "Race".into(),
            email: format!("race-{}@example.com", Uuid::new_v4()),
            password: "pw".into(),
            role: None,
        },
    )
    .await?;
    let product = store
        .insert_product(NewProduct {
            name: format!("Race {}", Uuid::new_v4()),
            description: "contended".into(),
            price,
            photo: "/uploads/race.png".into(),
        })
        .await?;
    let user = AuthUser {
        user_id: registered.id,
        role: Role::Customer,
    };
    Ok((user, product.id))
}

// Two checkouts of the same cart race on the row lock; exactly one wins.
#[tokio::test]
async fn concurrent_checkouts_against_postgres_charge_once() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL.");
        return Ok(());
    };

    let pool = create_pool(&database_url, 5).await?;
    run_migrations(&pool).await?;
    let store = PgStore::new(pool);
    let (user, product_id) = customer_with_product(&store, Decimal::new(750, 2)).await?;
    store.add_or_increment(user.user_id, product_id, 2).await?;

    let (first, second) = tokio::join!(
        order_service::place_order(&store, &user),
        order_service::place_order(&store, &user)
    );

    let outcomes = [first, second];
    let placed: Vec<_> = outcomes.iter().filter_map(|r| r.as_ref().ok()).collect();
    let empty = outcomes
        .iter()
        .filter(|r| matches!(r, Err(AppError::InvalidState(_))))
        .count();
    assert_eq!((placed.len(), empty), (1, 1));
    assert_eq!(placed[0].order.bill, Decimal::new(1500, 2));

    let history = order_service::list_orders(&store, &user).await?;
    assert_eq!(history.items.len(), 1);
    assert!(store.list_cart(user.user_id).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn quantity_overflow_is_bad_request_against_postgres() -> anyhow::Result<()> {
    let Some(database_url) = database_url() else {
        eprintln!("Skipping test: set TEST_DATABASE_URL or DATABASE_URL.");
        return Ok(());
    };

    let pool = create_pool(&database_url, 2).await?;
    run_migrations(&pool).await?;
    let store = PgStore::new(pool);
    let (user, product_id) = customer_with_product(&store, Decimal::ONE).await?;

    store.add_or_increment(user.user_id, product_id, i32::MAX).await?;
    let err = store
        .add_or_increment(user.user_id, product_id, 1)
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(store.list_cart(user.user_id).await?[0].quantity, i32::MAX);

    Ok(())
}
