use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod collections;
pub mod coupons;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/collection", collections::router())
        .nest("/coupon", coupons::router())
        .nest("/product", products::router())
        .nest("/order", orders::router())
}
