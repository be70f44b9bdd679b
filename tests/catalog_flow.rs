mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{
    MemoryStore, auth_user, collection_model, coupon_model, mock_db, mock_state, product_model,
};
use ecomm_api::{
    dto::{
        collections::CollectionRequest,
        coupons::CreateCouponRequest,
        orders::{OrderLine, PaymentOrderRequest, PlaceOrderRequest, UpdateOrderStatusRequest},
        products::{NewProduct, PhotoUpload, UpdateProductRequest},
    },
    entity::{collections, coupons, order_items, orders, products},
    error::AppError,
    models::{Photo, Role},
    routes::params::OrderListQuery,
    services::{collection_service, coupon_service, order_service, product_service},
};
use sea_orm::MockExecResult;
use std::sync::Arc;
use uuid::Uuid;

fn deleted(rows: u64) -> MockExecResult {
    MockExecResult {
        last_insert_id: 0,
        rows_affected: rows,
    }
}

fn photo(bytes: &[u8], content_type: &str) -> PhotoUpload {
    PhotoUpload {
        content_type: content_type.to_string(),
        bytes: bytes.to_vec(),
    }
}

fn new_product(collection_id: Uuid) -> NewProduct {
    NewProduct {
        name: "Crab Tee".into(),
        price: 1500,
        description: "Soft cotton".into(),
        collection_id,
        stock: 5,
    }
}

#[tokio::test]
async fn deleting_a_missing_collection_is_not_found() {
    let (state, _) = mock_state(mock_db().append_exec_results([deleted(0)]));

    let err = collection_service::delete_collection(&state, &auth_user(Role::Admin), Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(err.to_string(), "Collection not found");
}

#[tokio::test]
async fn only_admins_manage_collections() {
    let (state, _) = mock_state(mock_db());

    let err = collection_service::create_collection(
        &state,
        &auth_user(Role::Moderator),
        CollectionRequest {
            name: "Shoes".into(),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Forbidden));
}

#[tokio::test]
async fn collection_name_is_required() {
    let (state, _) = mock_state(mock_db());

    let err = collection_service::create_collection(
        &state,
        &auth_user(Role::Admin),
        CollectionRequest { name: "  ".into() },
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Collection name is required");
}

#[tokio::test]
async fn collections_are_listed_publicly() {
    let db = mock_db().append_query_results([vec![collection_model("Shoes"), collection_model("Hats")]]);
    let (state, _) = mock_state(db);

    let resp = collection_service::list_collections(&state).await.unwrap();

    assert_eq!(resp.data.unwrap().items.len(), 2);
}

#[tokio::test]
async fn coupon_needs_code_and_discount() {
    let (state, _) = mock_state(mock_db());

    let err = coupon_service::create_coupon(
        &state,
        &auth_user(Role::Admin),
        CreateCouponRequest {
            code: "SAVE10".into(),
            discount: None,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Code and discount are required");
}

#[tokio::test]
async fn duplicate_coupon_codes_are_rejected() {
    let db = mock_db().append_query_results([vec![coupon_model("SAVE10", 10, true)]]);
    let (state, _) = mock_state(db);

    let err = coupon_service::create_coupon(
        &state,
        &auth_user(Role::Admin),
        CreateCouponRequest {
            code: " save10 ".into(),
            discount: Some(10),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Coupon already exists");
}

#[tokio::test]
async fn moderators_can_list_coupons_but_users_cannot() {
    let db = mock_db().append_query_results([vec![coupon_model("SAVE10", 10, true)]]);
    let (state, _) = mock_state(db);

    let resp = coupon_service::list_coupons(&state, &auth_user(Role::Moderator))
        .await
        .unwrap();
    assert_eq!(resp.data.unwrap().items.len(), 1);

    let err = coupon_service::list_coupons(&state, &auth_user(Role::User))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn product_creation_uploads_every_photo() {
    let collection = collection_model("Apparel");
    let db = mock_db()
        .append_query_results([vec![collection.clone()]])
        .append_query_results([vec![product_model(1500, 5)]]);
    let (state, doubles) = mock_state(db);

    product_service::create_product(
        &state,
        &auth_user(Role::Admin),
        new_product(collection.id),
        vec![photo(b"front", "image/png"), photo(b"back", "image/jpeg")],
    )
    .await
    .unwrap();

    let keys = doubles.storage.keys();
    assert_eq!(keys.len(), 2);
    assert!(keys[0].starts_with("products/") && keys[0].ends_with("/photo_1.png"));
    assert!(keys[1].ends_with("/photo_2.jpg"));
}

#[tokio::test]
async fn failed_upload_removes_the_photos_already_stored() {
    let collection = collection_model("Apparel");
    let db = mock_db().append_query_results([vec![collection.clone()]]);
    let doubles = common::Doubles {
        storage: std::sync::Arc::new(MemoryStore::failing_on("photo_2")),
        ..Default::default()
    };
    let state = common::state_with(db.into_connection(), &doubles);

    let err = product_service::create_product(
        &state,
        &auth_user(Role::Admin),
        new_product(collection.id),
        vec![photo(b"front", "image/png"), photo(b"back", "image/png")],
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(doubles.storage.keys().is_empty());
    let removed = doubles.storage.deleted.lock().unwrap();
    assert_eq!(removed.len(), 1);
    assert!(removed[0].ends_with("photo_1.png"));
}

#[tokio::test]
async fn product_in_unknown_collection_is_rejected() {
    let db = mock_db().append_query_results([Vec::<collections::Model>::new()]);
    let (state, doubles) = mock_state(db);

    let err = product_service::create_product(
        &state,
        &auth_user(Role::Admin),
        new_product(Uuid::new_v4()),
        vec![photo(b"front", "image/png")],
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Collection not found");
    assert!(doubles.storage.keys().is_empty());
}

#[tokio::test]
async fn deleting_a_product_removes_its_photos() {
    let mut product = product_model(1500, 5);
    product.photos = products::Photos(vec![
        Photo {
            key: "products/x/photo_1.png".into(),
            secure_url: "https://cdn.test/products/x/photo_1.png".into(),
        },
        Photo {
            key: "products/x/photo_2.png".into(),
            secure_url: "https://cdn.test/products/x/photo_2.png".into(),
        },
    ]);
    let db = mock_db()
        .append_query_results([vec![product.clone()]])
        .append_exec_results([deleted(1)]);
    let (state, doubles) = mock_state(db);

    product_service::delete_product(&state, &auth_user(Role::Admin), product.id)
        .await
        .unwrap();

    let mut removed = doubles.storage.deleted.lock().unwrap().clone();
    removed.sort();
    assert_eq!(removed, vec!["products/x/photo_1.png", "products/x/photo_2.png"]);
}

#[tokio::test]
async fn missing_product_is_not_found() {
    let (state, _) = mock_state(mock_db().append_query_results([Vec::<products::Model>::new()]));

    let err = product_service::get_product(&state, Uuid::new_v4())
        .await
        .unwrap_err();

    assert_eq!(err.status(), StatusCode::NOT_FOUND);
    assert_eq!(err.to_string(), "No product found");
}

#[tokio::test]
async fn payment_order_applies_the_coupon() {
    let product = product_model(500, 10);
    let db = mock_db()
        .append_query_results([vec![product.clone()]])
        .append_query_results([vec![coupon_model("SAVE10", 10, true)]]);
    let (state, doubles) = mock_state(db);

    let resp = order_service::create_payment_order(
        &state,
        &auth_user(Role::User),
        PaymentOrderRequest {
            products: vec![OrderLine {
                product_id: product.id,
                count: 2,
            }],
            coupon_code: Some(" save10 ".into()),
        },
    )
    .await
    .unwrap();

    assert_eq!(resp.data.unwrap().amount, 900);
    let requests = doubles.payments.requests.lock().unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].amount, 900);
    assert_eq!(requests[0].currency, "INR");
    assert!(requests[0].receipt.starts_with("receipt_"));
}

#[tokio::test]
async fn payment_order_requires_products() {
    let (state, _) = mock_state(mock_db());

    let err = order_service::create_payment_order(
        &state,
        &auth_user(Role::User),
        PaymentOrderRequest::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "No product found");
}

#[tokio::test]
async fn payment_order_checks_stock() {
    let product = product_model(500, 1);
    let (state, doubles) = mock_state(mock_db().append_query_results([vec![product.clone()]]));

    let err = order_service::create_payment_order(
        &state,
        &auth_user(Role::User),
        PaymentOrderRequest {
            products: vec![OrderLine {
                product_id: product.id,
                count: 2,
            }],
            coupon_code: None,
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Product quantity not in stock");
    assert!(doubles.payments.requests.lock().unwrap().is_empty());
}

#[tokio::test]
async fn inactive_coupon_is_not_valid() {
    let product = product_model(500, 10);
    let db = mock_db()
        .append_query_results([vec![product.clone()]])
        .append_query_results([Vec::<coupons::Model>::new()]);
    let (state, _) = mock_state(db);

    let err = order_service::create_payment_order(
        &state,
        &auth_user(Role::User),
        PaymentOrderRequest {
            products: vec![OrderLine {
                product_id: product.id,
                count: 1,
            }],
            coupon_code: Some("OLD".into()),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Coupon is not valid");
}

#[tokio::test]
async fn placing_an_order_moves_stock_to_sold() {
    let user = auth_user(Role::User);
    let product = product_model(700, 4);
    let now = Utc::now();
    let order = orders::Model {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        coupon_code: None,
        transaction_id: "pay_123".into(),
        address: "1 Main St".into(),
        phone_number: "5550001111".into(),
        amount: 2100,
        status: "ORDERED".into(),
        created_at: now.into(),
        updated_at: now.into(),
    };
    let item = order_items::Model {
        id: Uuid::new_v4(),
        order_id: order.id,
        product_id: product.id,
        count: 3,
        price: 700,
        created_at: now.into(),
    };
    let mut updated = product.clone();
    updated.stock = 1;
    updated.sold = 3;

    let db = mock_db()
        .append_query_results([vec![product.clone()], vec![updated]])
        .append_query_results([vec![order.clone()]])
        .append_query_results([vec![item]]);
    let (state, _) = mock_state(db);

    let resp = order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            transaction_id: "pay_123".into(),
            products: vec![OrderLine {
                product_id: product.id,
                count: 3,
            }],
            coupon_code: None,
            address: "1 Main St".into(),
            phone_number: "5550001111".into(),
        },
    )
    .await
    .unwrap();

    let placed = resp.data.unwrap();
    assert_eq!(placed.order.id, order.id);
    assert_eq!(placed.items.len(), 1);
    assert_eq!(placed.items[0].count, 3);
}

#[tokio::test]
async fn checkout_locks_products_in_id_order() {
    let user = auth_user(Role::User);
    let mut lo = product_model(100, 5);
    lo.id = Uuid::from_u128(1);
    let mut hi = product_model(200, 5);
    hi.id = Uuid::from_u128(2);
    let now = Utc::now();
    let order = orders::Model {
        id: Uuid::new_v4(),
        user_id: user.user_id,
        coupon_code: None,
        transaction_id: "pay_lock".into(),
        address: "1 Main St".into(),
        phone_number: "5550001111".into(),
        amount: 500,
        status: "ORDERED".into(),
        created_at: now.into(),
        updated_at: now.into(),
    };
    let item = |product: &products::Model, count| order_items::Model {
        id: Uuid::new_v4(),
        order_id: order.id,
        product_id: product.id,
        count,
        price: product.price,
        created_at: now.into(),
    };

    let db = mock_db()
        .append_query_results([vec![lo.clone()], vec![hi.clone()]])
        .append_query_results([vec![lo.clone()], vec![hi.clone()]])
        .append_query_results([vec![order.clone()]])
        .append_query_results([vec![item(&lo, 1)], vec![item(&hi, 2)]]);
    let (state, _) = mock_state(db);

    order_service::place_order(
        &state,
        &user,
        PlaceOrderRequest {
            transaction_id: "pay_lock".into(),
            products: vec![
                OrderLine {
                    product_id: hi.id,
                    count: 2,
                },
                OrderLine {
                    product_id: lo.id,
                    count: 1,
                },
            ],
            coupon_code: None,
            address: "1 Main St".into(),
            phone_number: "5550001111".into(),
        },
    )
    .await
    .unwrap();

    let orm = Arc::try_unwrap(state.orm).ok().unwrap();
    let log = format!("{:?}", orm.into_transaction_log());
    let first_lo = log.find(&lo.id.to_string()).unwrap();
    let first_hi = log.find(&hi.id.to_string()).unwrap();
    assert!(first_lo < first_hi, "rows locked out of id order: {log}");
}

#[tokio::test]
async fn blank_address_is_rejected_after_trimming() {
    let (state, _) = mock_state(mock_db());

    let err = order_service::place_order(
        &state,
        &auth_user(Role::User),
        PlaceOrderRequest {
            transaction_id: "pay_123".into(),
            products: vec![OrderLine {
                product_id: Uuid::new_v4(),
                count: 1,
            }],
            coupon_code: None,
            address: "   ".into(),
            phone_number: "5550001111".into(),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.to_string(), "address: address is required");
}

#[tokio::test]
async fn blank_product_name_is_rejected_on_update() {
    let (state, _) = mock_state(mock_db());

    let err = product_service::update_product(
        &state,
        &auth_user(Role::Admin),
        Uuid::new_v4(),
        UpdateProductRequest {
            name: Some("  \t ".into()),
            ..Default::default()
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, AppError::Validation(_)));
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_order_status_is_rejected() {
    let (state, _) = mock_state(mock_db());

    let err = order_service::update_order_status(
        &state,
        &auth_user(Role::Admin),
        Uuid::new_v4(),
        UpdateOrderStatusRequest {
            status: "LOST".into(),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.to_string(), "Invalid order status");
}

#[tokio::test]
async fn only_admins_list_every_order() {
    let (state, _) = mock_state(mock_db());

    let err = order_service::list_all_orders(
        &state,
        &auth_user(Role::Moderator),
        OrderListQuery::default(),
    )
    .await
    .unwrap_err();

    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}
