use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::models::Product;

/// Text fields of the multipart product form.
#[derive(Debug, Default, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 120, message = "product name should not be more than 120 chars"))]
    pub name: String,
    #[validate(range(min = 1, message = "price must be greater than 0"))]
    pub price: i64,
    pub description: String,
    pub collection_id: Uuid,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: i32,
}

/// A file part of the multipart product form.
#[derive(Debug, Clone)]
pub struct PhotoUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 120, message = "product name should not be more than 120 chars"))]
    pub name: Option<String>,
    #[validate(range(min = 1, message = "price must be greater than 0"))]
    pub price: Option<i64>,
    pub description: Option<String>,
    #[validate(range(min = 0, message = "stock cannot be negative"))]
    pub stock: Option<i32>,
    pub collection_id: Option<Uuid>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}
