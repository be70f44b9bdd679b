use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::Coupon;

#[derive(Debug, Default, Deserialize, ToSchema, Validate)]
#[serde(default)]
pub struct CreateCouponRequest {
    #[validate(length(max = 64, message = "Coupon code should not be more than 64 chars"))]
    pub code: String,
    /// Percentage off.
    #[validate(range(min = 1, max = 100, message = "Discount must be between 1 and 100"))]
    pub discount: Option<i32>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCouponRequest {
    pub active: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct CouponList {
    #[schema(value_type = Vec<Coupon>)]
    pub items: Vec<Coupon>,
}
