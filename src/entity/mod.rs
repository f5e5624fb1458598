pub mod cart_items;
pub mod inventory_lines;
pub mod orders;
pub mod products;
pub mod users;

pub use cart_items::Entity as CartItems;
pub use inventory_lines::Entity as InventoryLines;
pub use orders::Entity as Orders;
pub use products::Entity as Products;
pub use users::Entity as Users;
