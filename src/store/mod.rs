//! Data-access seams. Services only see these traits; `AppState` carries a
//! `dyn Store` so handlers never reach for a global connection.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{CartItem, CartLine, InventoryLine, Order, OrderWithInventory, Product, Role, User},
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub photo: String,
}

/// Per-field presence: `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub photo: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub bill: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewInventoryLine {
    pub order_id: Uuid,
    pub name: String,
    pub price: Decimal,
    pub quantity: i32,
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;
    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Newest first. Returns the page and the total row count.
    async fn list_products(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)>;
    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>>;
    async fn insert_product(&self, product: NewProduct) -> AppResult<Product>;
    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>>;
    async fn delete_product(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait CartRepository: Send + Sync {
    /// Inserts the `(user, product)` row or adds `quantity` to the existing one.
    async fn add_or_increment(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartItem>;
    async fn list_cart(&self, user_id: Uuid) -> AppResult<Vec<CartLine>>;
    /// `None` when no row with that id belongs to the user.
    async fn set_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> AppResult<Option<CartItem>>;
    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn begin_checkout(&self) -> AppResult<Box<dyn CheckoutTx>>;
    /// `Some(user)` restricts to one owner, `None` lists every order.
    async fn list_orders(&self, user_id: Option<Uuid>) -> AppResult<Vec<OrderWithInventory>>;
    async fn find_order(&self, user_id: Uuid, order_id: Uuid)
    -> AppResult<Option<OrderWithInventory>>;
}

/// One atomic checkout scope. Nothing is visible to other readers until
/// `commit`; dropping the value without committing rolls everything back.
#[async_trait]
pub trait CheckoutTx: Send {
    /// Loads the user's cart with product details and locks the cart rows
    /// until the scope ends.
    async fn lock_cart(&mut self, user_id: Uuid) -> AppResult<Vec<CartLine>>;
    async fn insert_order(&mut self, order: NewOrder) -> AppResult<Order>;
    async fn insert_inventory_line(&mut self, line: NewInventoryLine) -> AppResult<InventoryLine>;
    async fn clear_cart(&mut self, user_id: Uuid) -> AppResult<u64>;
    async fn commit(self: Box<Self>) -> AppResult<()>;
}

/// Everything the HTTP layer needs from persistence.
pub trait Store: UserRepository + CatalogRepository + CartRepository + OrderRepository {}

impl<T> Store for T where T: UserRepository + CatalogRepository + CartRepository + OrderRepository {}
