use std::sync::Arc;

use crate::{jwt::JwtKeys, storage::PhotoStorage, store::Store};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub photos: Arc<dyn PhotoStorage>,
    pub jwt: JwtKeys,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, photos: Arc<dyn PhotoStorage>, jwt: JwtKeys) -> Self {
        Self { store, photos, jwt }
    }
}
