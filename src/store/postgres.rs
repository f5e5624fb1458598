use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, SqlErr, TransactionTrait,
};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::{DbPool, OrmConn, create_orm_conn},
    entity::{
        cart_items::{self, Column as CartCol, Entity as CartItems},
        inventory_lines::{self, Column as LineCol, Entity as InventoryLines},
        orders::{self, Column as OrderCol, Entity as Orders},
        products::{self, Column as ProdCol, Entity as Products},
        users::{self, Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    models::{CartItem, CartLine, InventoryLine, Order, OrderWithInventory, Product, Role, User},
};

use super::{
    CartRepository, CatalogRepository, CheckoutTx, NewInventoryLine, NewOrder, NewProduct,
    NewUser, OrderRepository, ProductChanges, UserRepository,
};

/// Postgres-backed store. Raw sqlx for the hand-written joins and upserts,
/// SeaORM for everything else; both share one pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
    orm: OrmConn,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        let orm = create_orm_conn(pool.clone());
        Self { pool, orm }
    }
}

// SQLSTATE numeric_value_out_of_range
const NUMERIC_OUT_OF_RANGE: &str = "22003";

fn map_write_err(err: DbErr, conflict: &str) -> AppError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => AppError::Conflict(conflict.to_string()),
        Some(SqlErr::ForeignKeyConstraintViolation(_)) => AppError::NotFound,
        _ => AppError::OrmError(err),
    }
}

#[async_trait]
impl UserRepository for PgStore {
    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let model = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(user.name),
            email: Set(user.email),
            password_hash: Set(user.password_hash),
            role: Set(user.role.as_str().to_string()),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await
        .map_err(|err| map_write_err(err, "Email is already taken"))?;
        Ok(user_from_entity(model))
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = Users::find()
            .filter(UserCol::Email.eq(email))
            .one(&self.orm)
            .await?
            .map(user_from_entity);
        Ok(user)
    }
}

#[async_trait]
impl CatalogRepository for PgStore {
    async fn list_products(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)> {
        let finder = Products::find().order_by_desc(ProdCol::CreatedAt);
        let total = finder.clone().count(&self.orm).await?;
        let items = finder
            .limit(limit)
            .offset(offset)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(product_from_entity)
            .collect();
        Ok((items, total))
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let product = Products::find_by_id(id)
            .one(&self.orm)
            .await?
            .map(product_from_entity);
        Ok(product)
    }

    async fn insert_product(&self, product: NewProduct) -> AppResult<Product> {
        let model = products::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(product.name),
            description: Set(product.description),
            price: Set(product.price),
            photo: Set(product.photo),
            created_at: NotSet,
            updated_at: NotSet,
        }
        .insert(&self.orm)
        .await?;
        Ok(product_from_entity(model))
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>> {
        let existing = Products::find_by_id(id).one(&self.orm).await?;
        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: products::ActiveModel = existing.into();
        if let Some(name) = changes.name {
            active.name = Set(name);
        }
        if let Some(description) = changes.description {
            active.description = Set(description);
        }
        if let Some(price) = changes.price {
            active.price = Set(price);
        }
        if let Some(photo) = changes.photo {
            active.photo = Set(photo);
        }
        active.updated_at = Set(Utc::now().into());

        let product = active.update(&self.orm).await?;
        Ok(Some(product_from_entity(product)))
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let result = Products::delete_by_id(id).exec(&self.orm).await?;
        Ok(result.rows_affected > 0)
    }
}

#[derive(FromRow)]
struct CartItemRow {
    id: Uuid,
    user_id: Uuid,
    product_id: Uuid,
    quantity: i32,
    created_at: DateTime<Utc>,
}

impl From<CartItemRow> for CartItem {
    fn from(row: CartItemRow) -> Self {
        CartItem {
            id: row.id,
            user_id: row.user_id,
            product_id: row.product_id,
            quantity: row.quantity,
            created_at: row.created_at,
        }
    }
}

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    name: String,
    description: String,
    price: Decimal,
    photo: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[async_trait]
impl CartRepository for PgStore {
    async fn add_or_increment(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartItem> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r#"
            INSERT INTO cart_items (id, user_id, product_id, quantity)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id, product_id)
            DO UPDATE SET quantity = cart_items.quantity + EXCLUDED.quantity
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(product_id)
        .bind(quantity)
        .fetch_one(&self.pool)
        .await
        .map_err(|err| {
            let (missing_product, overflow) = match err.as_database_error() {
                Some(db_err) => (
                    db_err.is_foreign_key_violation(),
                    db_err.code().as_deref() == Some(NUMERIC_OUT_OF_RANGE),
                ),
                None => (false, false),
            };
            if missing_product {
                AppError::NotFound
            } else if overflow {
                AppError::BadRequest("quantity is too large".into())
            } else {
                AppError::DbError(err)
            }
        })?;
        Ok(row.into())
    }

    async fn list_cart(&self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartWithProductRow>(
            r#"
            SELECT ci.id AS cart_id, ci.quantity,
                   p.id AS product_id, p.name, p.description, p.price, p.photo,
                   p.created_at, p.updated_at
            FROM cart_items ci
            JOIN products p ON p.id = ci.product_id
            WHERE ci.user_id = $1
            ORDER BY ci.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|row| CartLine {
                id: row.cart_id,
                product_id: row.product_id,
                quantity: row.quantity,
                product: Product {
                    id: row.product_id,
                    name: row.name,
                    description: row.description,
                    price: row.price,
                    photo: row.photo,
                    created_at: row.created_at,
                    updated_at: row.updated_at,
                },
            })
            .collect();
        Ok(items)
    }

    async fn set_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> AppResult<Option<CartItem>> {
        let row = sqlx::query_as::<_, CartItemRow>(
            r#"
            UPDATE cart_items
            SET quantity = $3
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, product_id, quantity, created_at
            "#,
        )
        .bind(item_id)
        .bind(user_id)
        .bind(quantity)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(CartItem::from))
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let result = CartItems::delete_many()
            .filter(
                Condition::all()
                    .add(CartCol::Id.eq(item_id))
                    .add(CartCol::UserId.eq(user_id)),
            )
            .exec(&self.orm)
            .await?;
        Ok(result.rows_affected > 0)
    }
}

#[async_trait]
impl OrderRepository for PgStore {
    async fn begin_checkout(&self) -> AppResult<Box<dyn CheckoutTx>> {
        let txn = self.orm.begin().await?;
        Ok(Box::new(PgCheckoutTx { txn }))
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> AppResult<Vec<OrderWithInventory>> {
        let mut finder = Orders::find();
        if let Some(user_id) = user_id {
            finder = finder.filter(OrderCol::UserId.eq(user_id));
        }
        let orders = finder
            .order_by_desc(OrderCol::CreatedAt)
            .all(&self.orm)
            .await?;
        self.attach_inventory(orders).await
    }

    async fn find_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<OrderWithInventory>> {
        let order = Orders::find()
            .filter(
                Condition::all()
                    .add(OrderCol::UserId.eq(user_id))
                    .add(OrderCol::Id.eq(order_id)),
            )
            .one(&self.orm)
            .await?;
        let Some(order) = order else {
            return Ok(None);
        };
        Ok(self.attach_inventory(vec![order]).await?.pop())
    }
}

impl PgStore {
    async fn attach_inventory(
        &self,
        orders: Vec<orders::Model>,
    ) -> AppResult<Vec<OrderWithInventory>> {
        if orders.is_empty() {
            return Ok(Vec::new());
        }
        let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
        let mut lines_by_order: HashMap<Uuid, Vec<InventoryLine>> = HashMap::new();
        for line in InventoryLines::find()
            .filter(LineCol::OrderId.is_in(ids))
            .all(&self.orm)
            .await?
        {
            lines_by_order
                .entry(line.order_id)
                .or_default()
                .push(inventory_from_entity(line));
        }

        Ok(orders
            .into_iter()
            .map(|order| OrderWithInventory {
                inventory: lines_by_order.remove(&order.id).unwrap_or_default(),
                order: order_from_entity(order),
            })
            .collect())
    }
}

/// Wraps a SeaORM transaction; SeaORM rolls it back when dropped uncommitted.
struct PgCheckoutTx {
    txn: DatabaseTransaction,
}

#[async_trait]
impl CheckoutTx for PgCheckoutTx {
    async fn lock_cart(&mut self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        // FOR UPDATE on the cart rows serializes concurrent checkouts of one cart
        let items = CartItems::find()
            .filter(CartCol::UserId.eq(user_id))
            .order_by_asc(CartCol::CreatedAt)
            .lock(LockType::Update)
            .all(&self.txn)
            .await?;
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
        let products: HashMap<Uuid, products::Model> = Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(&self.txn)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect();

        Ok(items
            .into_iter()
            .filter_map(|item: cart_items::Model| {
                let product = products.get(&item.product_id)?.clone();
                Some(CartLine {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    product: product_from_entity(product),
                })
            })
            .collect())
    }

    async fn insert_order(&mut self, order: NewOrder) -> AppResult<Order> {
        let model = orders::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(order.user_id),
            bill: Set(order.bill),
            created_at: Set(order.created_at.into()),
        }
        .insert(&self.txn)
        .await?;
        Ok(order_from_entity(model))
    }

    async fn insert_inventory_line(&mut self, line: NewInventoryLine) -> AppResult<InventoryLine> {
        let model = inventory_lines::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(line.order_id),
            name: Set(line.name),
            price: Set(line.price),
            quantity: Set(line.quantity),
        }
        .insert(&self.txn)
        .await?;
        Ok(inventory_from_entity(model))
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> AppResult<u64> {
        let result = CartItems::delete_many()
            .filter(CartCol::UserId.eq(user_id))
            .exec(&self.txn)
            .await?;
        Ok(result.rows_affected)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        self.txn.commit().await?;
        Ok(())
    }
}

fn user_from_entity(model: users::Model) -> User {
    User {
        id: model.id,
        name: model.name,
        email: model.email,
        password_hash: model.password_hash,
        role: Role::from_db(&model.role),
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn product_from_entity(model: products::Model) -> Product {
    Product {
        id: model.id,
        name: model.name,
        description: model.description,
        price: model.price,
        photo: model.photo,
        created_at: model.created_at.with_timezone(&Utc),
        updated_at: model.updated_at.with_timezone(&Utc),
    }
}

fn order_from_entity(model: orders::Model) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        bill: model.bill,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn inventory_from_entity(model: inventory_lines::Model) -> InventoryLine {
    InventoryLine {
        id: model.id,
        order_id: model.order_id,
        name: model.name,
        price: model.price,
        quantity: model.quantity,
    }
}
