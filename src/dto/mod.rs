pub mod auth;
pub mod collections;
pub mod coupons;
pub mod orders;
pub mod products;
