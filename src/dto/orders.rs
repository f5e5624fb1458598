use serde::Serialize;
use utoipa::ToSchema;

use crate::models::OrderWithInventory;

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct OrderList {
    #[schema(value_type = Vec<OrderWithInventory>)]
    pub items: Vec<OrderWithInventory>,
}
