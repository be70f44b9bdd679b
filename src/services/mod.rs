pub mod auth_service;
pub mod collection_service;
pub mod coupon_service;
pub mod order_service;
pub mod product_service;
