use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    dto::{
        auth::{LoginRequest, LoginResponse, RegisterRequest, UserResponse},
        cart::{AddToCartRequest, CartList, UpdateCartItemRequest},
        orders::OrderList,
        products::{ProductFormSchema, ProductList},
    },
    models::{CartItem, CartLine, InventoryLine, Order, OrderWithInventory, Product, Role},
    response::{ApiResponse, Deleted, Meta},
    routes::{auth, cart, health, orders, params, products},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        auth::register,
        auth::login,
        products::list_products,
        products::get_product,
        products::create_product,
        products::update_product,
        products::delete_product,
        cart::cart_list,
        cart::add_to_cart,
        cart::update_cart_item,
        cart::remove_from_cart,
        orders::place_order,
        orders::list_orders,
        orders::list_all_orders,
        orders::get_order
    ),
    components(
        schemas(
            Role,
            UserResponse,
            RegisterRequest,
            LoginRequest,
            LoginResponse,
            Product,
            ProductList,
            ProductFormSchema,
            CartItem,
            CartLine,
            CartList,
            AddToCartRequest,
            UpdateCartItemRequest,
            Order,
            InventoryLine,
            OrderWithInventory,
            OrderList,
            params::Pagination,
            Deleted,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartList>,
            ApiResponse<OrderWithInventory>,
            ApiResponse<OrderList>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Users", description = "Registration and login"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Orders", description = "Checkout and order history"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
