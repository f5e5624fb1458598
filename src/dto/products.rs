use std::str::FromStr;

use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{error::AppError, models::Product};

/// An uploaded product photo, held in memory until it is handed to storage.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Multipart product fields. `None` means the field was not sent at all,
/// which lets updates tell "omitted" apart from "set to empty".
#[derive(Debug, Clone, Default)]
pub struct ProductForm {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub photo: Option<PhotoUpload>,
}

impl ProductForm {
    pub fn set_text(&mut self, field: &str, value: String) -> Result<(), AppError> {
        match field {
            "name" => self.name = Some(value),
            "description" => self.description = Some(value),
            "price" => {
                let price = Decimal::from_str(value.trim())
                    .map_err(|_| AppError::BadRequest("price must be a decimal number".into()))?;
                self.price = Some(price);
            }
            // unknown fields are ignored, like a JSON body with extra keys
            _ => {}
        }
        Ok(())
    }
}

/// Documentation-only shape of the multipart body.
#[allow(dead_code)]
#[derive(ToSchema)]
pub struct ProductFormSchema {
    pub name: String,
    pub description: String,
    #[schema(value_type = String, example = "19.99")]
    pub price: String,
    #[schema(value_type = String, format = Binary)]
    pub photo: Vec<u8>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
