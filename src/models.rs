use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Authorization tier carried in the session token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Default)]
pub enum Role {
    #[serde(alias = "admin", alias = "ADMIN")]
    Admin,
    #[default]
    #[serde(alias = "customer", alias = "user", alias = "User")]
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Customer => "Customer",
        }
    }

    /// Roles are persisted as text; anything that is not `Admin` is an
    /// ordinary customer.
    pub fn from_db(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Role::Admin
        } else {
            Role::Customer
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    #[schema(ignore)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: Decimal,
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

/// A cart row joined with the live catalog entry it points at.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub product: Product,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(value_type = String, example = "25.00")]
    pub bill: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Snapshot of a purchased product, copied by value at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InventoryLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub name: String,
    #[schema(value_type = String, example = "10.00")]
    pub price: Decimal,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderWithInventory {
    pub order: Order,
    pub inventory: Vec<InventoryLine>,
}

impl OrderWithInventory {
    /// Σ(price × quantity) over the snapshot lines.
    pub fn inventory_total(&self) -> Decimal {
        self.inventory
            .iter()
            .map(|line| line.price * Decimal::from(line.quantity))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_accepts_legacy_spellings() {
        let admin: Role = serde_json::from_str("\"admin\"").unwrap();
        let customer: Role = serde_json::from_str("\"user\"").unwrap();
        assert_eq!(admin, Role::Admin);
        assert_eq!(customer, Role::Customer);
        assert_eq!(serde_json::to_string(&Role::Admin).unwrap(), "\"Admin\"");
    }

    #[test]
    fn role_from_db_defaults_to_customer() {
        assert_eq!(Role::from_db("Admin"), Role::Admin);
        assert_eq!(Role::from_db("anything"), Role::Customer);
    }

    #[test]
    fn user_serialization_omits_password_hash() {
        let user = User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            password_hash: "$argon2id$secret".into(),
            role: Role::Customer,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&user).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "Customer");
    }
}
