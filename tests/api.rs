use std::sync::Arc;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use storefront_api::{
    jwt::JwtKeys, routes::create_app, state::AppState, storage::MemoryPhotoStorage,
    store::MemoryStore,
};
use tower::ServiceExt;

const BOUNDARY: &str = "storefront-test-boundary";

struct TestApp {
    router: Router,
    store: MemoryStore,
    photos: MemoryPhotoStorage,
}

impl TestApp {
    fn new() -> Self {
        let store = MemoryStore::new();
        let photos = MemoryPhotoStorage::new();
        let state = AppState::new(
            Arc::new(store.clone()),
            Arc::new(photos.clone()),
            JwtKeys::new("api-test-secret", 1),
        );
        Self {
            router: create_app(state),
            store,
            photos,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    async fn multipart(
        &self,
        method: Method,
        uri: &str,
        token: &str,
        fields: &[(&str, &str)],
        photo: Option<&[u8]>,
    ) -> (StatusCode, Value) {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        if let Some(bytes) = photo {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"photo\"; filename=\"mug.png\"\r\nContent-Type: image/png\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(bytes);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap();
        self.send(request).await
    }

    async fn signup(&self, email: &str, role: &str) -> String {
        let (status, _) = self
            .json(
                Method::POST,
                "/users/register",
                None,
                Some(json!({
                    "name": "Test",
                    "email": email,
                    "password": "secret-pw",
                    "role": role,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .json(
                Method::POST,
                "/users/login",
                None,
                Some(json!({ "email": email, "password": "secret-pw" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    async fn create_product(&self, admin: &str, name: &str, price: &str) -> String {
        let (status, body) = self
            .multipart(
                Method::POST,
                "/products",
                admin,
                &[("name", name), ("description", "test item"), ("price", price)],
                Some(b"\x89PNG"),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn protected_routes_require_a_token() {
    let app = TestApp::new();
    for uri in ["/products", "/cart", "/orders"] {
        let (status, body) = app.json(Method::GET, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["data"]["error"].is_string());
    }

    let (status, _) = app
        .json(Method::GET, "/cart", Some("not-a-token"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn login_with_wrong_password_is_unauthorized() {
    let app = TestApp::new();
    app.signup("eve@example.com", "customer").await;

    let (status, body) = app
        .json(
            Method::POST,
            "/users/login",
            None,
            Some(json!({ "email": "eve@example.com", "password": "nope" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().ends_with("Invalid credentials"));
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let app = TestApp::new();
    app.signup("dup@example.com", "customer").await;

    let (status, _) = app
        .json(
            Method::POST,
            "/users/register",
            None,
            Some(json!({ "name": "Again", "email": "dup@example.com", "password": "x" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn customers_cannot_reach_admin_routes() {
    let app = TestApp::new();
    let customer = app.signup("cust@example.com", "customer").await;

    let (status, _) = app
        .multipart(
            Method::POST,
            "/products",
            &customer,
            &[("name", "Mug"), ("description", "d"), ("price", "3.00")],
            Some(b"png"),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.json(Method::GET, "/orders/all", Some(&customer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(app.photos.is_empty().await);
}

#[tokio::test]
async fn product_without_photo_is_rejected() {
    let app = TestApp::new();
    let admin = app.signup("admin@example.com", "admin").await;

    let (status, body) = app
        .multipart(
            Method::POST,
            "/products",
            &admin,
            &[("name", "Mug"), ("description", "d"), ("price", "3.00")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().ends_with("Photo is required"));
}

#[tokio::test]
async fn admin_manages_catalog() {
    let app = TestApp::new();
    let admin = app.signup("admin@example.com", "admin").await;
    let id = app.create_product(&admin, "Mug", "12.50").await;

    let (status, body) = app
        .multipart(
            Method::PUT,
            &format!("/products/{id}"),
            &admin,
            &[("price", "9.99")],
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["price"], "9.99");
    assert_eq!(body["data"]["name"], "Mug");

    let (status, body) = app
        .json(Method::GET, "/products?page=1&perPage=10", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["meta"]["total"], 1);

    let (status, _) = app
        .json(Method::DELETE, &format!("/products/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::GET, &format!("/products/{id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn cart_to_order_round_trip() {
    let app = TestApp::new();
    let admin = app.signup("admin@example.com", "admin").await;
    let customer = app.signup("cust@example.com", "customer").await;
    let a = app.create_product(&admin, "A", "10").await;
    let b = app.create_product(&admin, "B", "5").await;

    for (product, quantity) in [(&a, 1), (&a, 1), (&b, 1)] {
        let (status, _) = app
            .json(
                Method::POST,
                "/cart",
                Some(&customer),
                Some(json!({ "productId": product, "quantity": quantity })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, cart) = app.json(Method::GET, "/cart", Some(&customer), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cart["data"].as_array().unwrap().len(), 2);

    let (status, placed) = app.json(Method::POST, "/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::CREATED, "{placed}");
    assert_eq!(placed["data"]["order"]["bill"], "25");
    assert_eq!(placed["data"]["inventory"].as_array().unwrap().len(), 2);

    let (_, cart) = app.json(Method::GET, "/cart", Some(&customer), None).await;
    assert!(cart["data"].as_array().unwrap().is_empty());

    let (status, body) = app.json(Method::POST, "/orders", Some(&customer), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");

    let order_id = placed["data"]["order"]["id"].as_str().unwrap();
    let (status, _) = app
        .json(Method::GET, &format!("/orders/{order_id}"), Some(&customer), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = app
        .json(Method::GET, &format!("/orders/{order_id}"), Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, all) = app.json(Method::GET, "/orders/all", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["data"].as_array().unwrap().len(), 1);
    assert_eq!(app.store.order_count().await, 1);
}

#[tokio::test]
async fn unknown_paths_fall_back_to_not_found() {
    let app = TestApp::new();
    let (status, body) = app.json(Method::GET, "/nope", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["data"]["path"], "/nope");
}

#[tokio::test]
async fn malformed_input_gets_the_json_error_body() {
    let app = TestApp::new();

    let (status, body) = app
        .json(
            Method::POST,
            "/users/register",
            None,
            Some(json!({ "name": "x", "email": "a@b.c" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].as_str().unwrap().contains("password"));
    assert!(body["meta"].is_object());

    let token = app.signup("shape@example.com", "customer").await;
    let (status, body) = app
        .json(Method::DELETE, "/cart/not-a-uuid", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["error"].is_string());

    let (status, _) = app
        .json(
            Method::POST,
            "/cart",
            Some(&token),
            Some(json!({ "productId": "nope", "quantity": 1 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::GET, "/products?page=first", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn huge_page_number_returns_an_empty_page() {
    let app = TestApp::new();
    let admin = app.signup("admin@example.com", "admin").await;
    app.create_product(&admin, "Mug", "1.00").await;

    let (status, body) = app
        .json(
            Method::GET,
            "/products?page=9223372036854775807&perPage=100",
            Some(&admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].as_array().unwrap().is_empty());
    assert_eq!(body["meta"]["total"], 1);
}
