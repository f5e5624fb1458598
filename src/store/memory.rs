use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{CartItem, CartLine, InventoryLine, Order, OrderWithInventory, Product, User},
};

use super::{
    CartRepository, CatalogRepository, CheckoutTx, NewInventoryLine, NewOrder, NewProduct,
    NewUser, OrderRepository, ProductChanges, UserRepository,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    products: Vec<Product>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    inventory_lines: Vec<InventoryLine>,
}

impl Tables {
    fn cart_lines(&self, user_id: Uuid) -> Vec<CartLine> {
        self.cart_items
            .iter()
            .rev()
            .filter(|item| item.user_id == user_id)
            .filter_map(|item| {
                let product = self.products.iter().find(|p| p.id == item.product_id)?;
                Some(CartLine {
                    id: item.id,
                    product_id: item.product_id,
                    quantity: item.quantity,
                    product: product.clone(),
                })
            })
            .collect()
    }

    fn with_inventory(&self, order: &Order) -> OrderWithInventory {
        OrderWithInventory {
            order: order.clone(),
            inventory: self
                .inventory_lines
                .iter()
                .filter(|line| line.order_id == order.id)
                .cloned()
                .collect(),
        }
    }
}

/// Process-local store used by tests and by anyone embedding the services
/// without Postgres. A checkout holds the table lock for its whole scope.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of orders across all users.
    pub async fn order_count(&self) -> usize {
        self.tables.lock().await.orders.len()
    }

    pub async fn inventory_line_count(&self) -> usize {
        self.tables.lock().await.inventory_lines.len()
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> AppResult<User> {
        let mut tables = self.tables.lock().await;
        if tables.users.iter().any(|u| u.email == user.email) {
            return Err(AppError::Conflict("Email is already taken".into()));
        }
        let user = User {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            created_at: Utc::now(),
        };
        tables.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn list_products(&self, limit: u64, offset: u64) -> AppResult<(Vec<Product>, u64)> {
        let tables = self.tables.lock().await;
        let total = tables.products.len() as u64;
        let items = tables
            .products
            .iter()
            .rev()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok((items, total))
    }

    async fn find_product(&self, id: Uuid) -> AppResult<Option<Product>> {
        let tables = self.tables.lock().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn insert_product(&self, product: NewProduct) -> AppResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: product.name,
            description: product.description,
            price: product.price,
            photo: product.photo,
            created_at: now,
            updated_at: now,
        };
        self.tables.lock().await.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: Uuid, changes: ProductChanges) -> AppResult<Option<Product>> {
        let mut tables = self.tables.lock().await;
        let Some(product) = tables.products.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            product.name = name;
        }
        if let Some(description) = changes.description {
            product.description = description;
        }
        if let Some(price) = changes.price {
            product.price = price;
        }
        if let Some(photo) = changes.photo {
            product.photo = photo;
        }
        product.updated_at = Utc::now();
        Ok(Some(product.clone()))
    }

    async fn delete_product(&self, id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.products.len();
        tables.products.retain(|p| p.id != id);
        if tables.products.len() == before {
            return Ok(false);
        }
        tables.cart_items.retain(|item| item.product_id != id);
        Ok(true)
    }
}

#[async_trait]
impl CartRepository for MemoryStore {
    async fn add_or_increment(
        &self,
        user_id: Uuid,
        product_id: Uuid,
        quantity: i32,
    ) -> AppResult<CartItem> {
        let mut tables = self.tables.lock().await;
        if !tables.products.iter().any(|p| p.id == product_id) {
            return Err(AppError::NotFound);
        }
        if let Some(item) = tables
            .cart_items
            .iter_mut()
            .find(|item| item.user_id == user_id && item.product_id == product_id)
        {
            item.quantity = item
                .quantity
                .checked_add(quantity)
                .ok_or_else(|| AppError::BadRequest("quantity is too large".into()))?;
            return Ok(item.clone());
        }
        let item = CartItem {
            id: Uuid::new_v4(),
            user_id,
            product_id,
            quantity,
            created_at: Utc::now(),
        };
        tables.cart_items.push(item.clone());
        Ok(item)
    }

    async fn list_cart(&self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        Ok(self.tables.lock().await.cart_lines(user_id))
    }

    async fn set_quantity(
        &self,
        user_id: Uuid,
        item_id: Uuid,
        quantity: i32,
    ) -> AppResult<Option<CartItem>> {
        let mut tables = self.tables.lock().await;
        let item = tables
            .cart_items
            .iter_mut()
            .find(|item| item.id == item_id && item.user_id == user_id);
        Ok(item.map(|item| {
            item.quantity = quantity;
            item.clone()
        }))
    }

    async fn remove_item(&self, user_id: Uuid, item_id: Uuid) -> AppResult<bool> {
        let mut tables = self.tables.lock().await;
        let before = tables.cart_items.len();
        tables
            .cart_items
            .retain(|item| !(item.id == item_id && item.user_id == user_id));
        Ok(tables.cart_items.len() != before)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn begin_checkout(&self) -> AppResult<Box<dyn CheckoutTx>> {
        let guard = self.tables.clone().lock_owned().await;
        let staged = guard.clone();
        Ok(Box::new(MemoryCheckoutTx { guard, staged }))
    }

    async fn list_orders(&self, user_id: Option<Uuid>) -> AppResult<Vec<OrderWithInventory>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .rev()
            .filter(|order| user_id.is_none_or(|id| order.user_id == id))
            .map(|order| tables.with_inventory(order))
            .collect())
    }

    async fn find_order(
        &self,
        user_id: Uuid,
        order_id: Uuid,
    ) -> AppResult<Option<OrderWithInventory>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .orders
            .iter()
            .find(|order| order.id == order_id && order.user_id == user_id)
            .map(|order| tables.with_inventory(order)))
    }
}

/// Works on a private copy of the tables; `commit` swaps it in while the
/// lock is still held, dropping discards it.
struct MemoryCheckoutTx {
    guard: OwnedMutexGuard<Tables>,
    staged: Tables,
}

#[async_trait]
impl CheckoutTx for MemoryCheckoutTx {
    async fn lock_cart(&mut self, user_id: Uuid) -> AppResult<Vec<CartLine>> {
        Ok(self.staged.cart_lines(user_id))
    }

    async fn insert_order(&mut self, order: NewOrder) -> AppResult<Order> {
        let order = Order {
            id: Uuid::new_v4(),
            user_id: order.user_id,
            bill: order.bill,
            created_at: order.created_at,
        };
        self.staged.orders.push(order.clone());
        Ok(order)
    }

    async fn insert_inventory_line(&mut self, line: NewInventoryLine) -> AppResult<InventoryLine> {
        let line = InventoryLine {
            id: Uuid::new_v4(),
            order_id: line.order_id,
            name: line.name,
            price: line.price,
            quantity: line.quantity,
        };
        self.staged.inventory_lines.push(line.clone());
        Ok(line)
    }

    async fn clear_cart(&mut self, user_id: Uuid) -> AppResult<u64> {
        let before = self.staged.cart_items.len();
        self.staged.cart_items.retain(|item| item.user_id != user_id);
        Ok((before - self.staged.cart_items.len()) as u64)
    }

    async fn commit(self: Box<Self>) -> AppResult<()> {
        let MemoryCheckoutTx { mut guard, staged } = *self;
        *guard = staged;
        Ok(())
    }
}
