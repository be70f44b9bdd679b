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
        auth::{AuthResponse, ForgotPasswordRequest, LoginRequest, ResetPasswordRequest, SignupRequest},
        collections::{CollectionList, CollectionRequest},
        coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest},
        orders::{
            OrderLine, OrderList, OrderWithItems, PaymentOrderRequest, PlaceOrderRequest,
            UpdateOrderStatusRequest,
        },
        products::{ProductList, UpdateProductRequest},
    },
    models::{Collection, Coupon, Order, OrderItem, OrderStatus, Photo, Product, Role, User},
    response::{ApiResponse, Meta},
    routes::{auth, collections, coupons, health, orders, params, products},
    utils::payment::GatewayOrder,
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
        auth::signup,
        auth::login,
        auth::logout,
        auth::profile,
        auth::forgot_password,
        auth::reset_password,
        collections::list_collections,
        collections::create_collection,
        collections::update_collection,
        collections::delete_collection,
        coupons::create_coupon,
        coupons::update_coupon,
        coupons::delete_coupon,
        coupons::list_coupons,
        products::list_products,
        products::get_product,
        products::products_by_collection,
        products::create_product,
        products::update_product,
        products::delete_product,
        orders::create_payment_order,
        orders::place_order,
        orders::my_orders,
        orders::get_order,
        orders::list_all_orders,
        orders::update_order_status
    ),
    components(
        schemas(
            User,
            Role,
            Photo,
            Product,
            Collection,
            Coupon,
            Order,
            OrderItem,
            OrderStatus,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            ForgotPasswordRequest,
            ResetPasswordRequest,
            CollectionRequest,
            CollectionList,
            CreateCouponRequest,
            UpdateCouponRequest,
            CouponList,
            products::ProductForm,
            UpdateProductRequest,
            ProductList,
            OrderLine,
            PaymentOrderRequest,
            PlaceOrderRequest,
            UpdateOrderStatusRequest,
            OrderWithItems,
            OrderList,
            GatewayOrder,
            params::Pagination,
            params::ProductQuery,
            params::OrderListQuery,
            Meta,
            ApiResponse<User>,
            ApiResponse<AuthResponse>,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Auth", description = "Signup, login and password reset"),
        (name = "Collections", description = "Product collections"),
        (name = "Coupons", description = "Discount coupons"),
        (name = "Products", description = "Product catalogue"),
        (name = "Orders", description = "Payment and order endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
