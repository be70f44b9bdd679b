use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Collection;

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(default)]
pub struct CollectionRequest {
    #[validate(length(max = 120, message = "Collection name should not be more than 120 chars"))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CollectionList {
    #[schema(value_type = Vec<Collection>)]
    pub items: Vec<Collection>,
}
