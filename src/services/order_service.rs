use std::collections::BTreeMap;

use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::orders::{
        OrderLine, OrderList, OrderWithItems, PaymentOrderRequest, PlaceOrderRequest,
        UpdateOrderStatusRequest,
    },
    entity::{
        coupons::{Column as CouponCol, Entity as Coupons},
        order_items::{ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems},
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
        products::{ActiveModel as ProductActive, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderItem, OrderStatus, Role},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, Pagination, SortOrder},
    services::coupon_service::normalize_code,
    state::AppState,
    utils::payment::{GatewayOrder, GatewayOrderRequest},
};

const NO_PRODUCT: &str = "No product found";
const NOT_FOUND: &str = "Order not found";

/// Priced cart: what the customer pays and for which rows.
#[derive(Debug)]
struct Quote {
    lines: Vec<(ProductModel, i32)>,
    amount: i64,
    coupon_code: Option<String>,
}

/// Subtracts a percentage discount, rounding the discount down.
pub fn apply_discount(total: i64, percent: i32) -> i64 {
    let percent = i64::from(percent.clamp(0, 100));
    total - total * percent / 100
}

/// Sums counts of repeated products. The result is sorted by product id so
/// concurrent checkouts take row locks in the same order.
pub fn merge_lines(lines: &[OrderLine]) -> Vec<(Uuid, i32)> {
    let mut counts: BTreeMap<Uuid, i32> = BTreeMap::new();
    for line in lines {
        let entry = counts.entry(line.product_id).or_insert(0);
        *entry = entry.saturating_add(line.count);
    }
    counts.into_iter().collect()
}

async fn price_cart<C: ConnectionTrait>(
    conn: &C,
    lines: &[OrderLine],
    coupon_code: Option<&str>,
    lock: bool,
) -> AppResult<Quote> {
    if lines.is_empty() {
        return Err(AppError::bad_request(NO_PRODUCT));
    }

    let mut priced = Vec::new();
    let mut total: i64 = 0;
    for (product_id, count) in merge_lines(lines) {
        let mut finder = Products::find_by_id(product_id);
        if lock {
            finder = finder.lock(LockType::Update);
        }
        let product = finder
            .one(conn)
            .await?
            .ok_or_else(|| AppError::bad_request(NO_PRODUCT))?;

        if product.stock < count {
            return Err(AppError::bad_request("Product quantity not in stock"));
        }
        total = product
            .price
            .checked_mul(i64::from(count))
            .and_then(|line_total| total.checked_add(line_total))
            .ok_or_else(|| AppError::bad_request("Order total is too large"))?;
        priced.push((product, count));
    }

    let code = coupon_code.map(normalize_code).filter(|c| !c.is_empty());
    let amount = match &code {
        Some(code) => {
            let coupon = Coupons::find()
                .filter(CouponCol::Code.eq(code.as_str()))
                .filter(CouponCol::Active.eq(true))
                .one(conn)
                .await?
                .ok_or_else(|| AppError::bad_request("Coupon is not valid"))?;
            apply_discount(total, coupon.discount)
        }
        None => total,
    };

    Ok(Quote {
        lines: priced,
        amount,
        coupon_code: code,
    })
}

/// Prices the cart and opens an order with the payment gateway.
pub async fn create_payment_order(
    state: &AppState,
    user: &AuthUser,
    payload: PaymentOrderRequest,
) -> AppResult<ApiResponse<GatewayOrder>> {
    payload.validate()?;
    let quote = price_cart(
        &*state.orm,
        &payload.products,
        payload.coupon_code.as_deref(),
        false,
    )
    .await?;

    let request = GatewayOrderRequest {
        amount: quote.amount,
        currency: state.payments.currency().to_string(),
        receipt: format!("receipt_{}", Utc::now().timestamp_millis()),
    };
    let gateway_order = state.payments.create_order(request).await?;

    tracing::info!(
        user_id = %user.user_id,
        gateway_order_id = %gateway_order.id,
        amount = quote.amount,
        "payment order created"
    );
    Ok(ApiResponse::success(
        "Payment order id generated successfully",
        gateway_order,
        Some(Meta::empty()),
    ))
}

/// Persists a paid order, moving stock to sold within one transaction.
pub async fn place_order(
    state: &AppState,
    user: &AuthUser,
    payload: PlaceOrderRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let payload = PlaceOrderRequest {
        transaction_id: payload.transaction_id.trim().to_string(),
        address: payload.address.trim().to_string(),
        phone_number: payload.phone_number.trim().to_string(),
        ..payload
    };
    payload.validate()?;
    let txn = state.orm.begin().await?;

    let quote = price_cart(&txn, &payload.products, payload.coupon_code.as_deref(), true).await?;

    let now = Utc::now();
    for (product, count) in &quote.lines {
        let mut active: ProductActive = product.clone().into();
        active.stock = Set(product.stock - count);
        active.sold = Set(product.sold.saturating_add(*count));
        active.updated_at = Set(now.into());
        active.update(&txn).await?;
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        coupon_code: Set(quote.coupon_code.clone()),
        transaction_id: Set(payload.transaction_id),
        address: Set(payload.address),
        phone_number: Set(payload.phone_number),
        amount: Set(quote.amount),
        status: Set(OrderStatus::Ordered.as_str().to_string()),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&txn)
    .await?;

    let mut items = Vec::with_capacity(quote.lines.len());
    for (product, count) in &quote.lines {
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(product.id),
            count: Set(*count),
            price: Set(product.price),
            created_at: Set(now.into()),
        }
        .insert(&txn)
        .await?;
        items.push(OrderItem::from(item));
    }

    txn.commit().await?;

    tracing::info!(order_id = %order.id, user_id = %user.user_id, amount = order.amount, "order placed");
    Ok(ApiResponse::success(
        "Order placed",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn my_orders(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&*state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Ok",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

/// Owners see their own orders; admins see any.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let mut condition = Condition::all().add(OrderCol::Id.eq(id));
    if user.role != Role::Admin {
        condition = condition.add(OrderCol::UserId.eq(user.user_id));
    }

    let order = Orders::find()
        .filter(condition)
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        OrderWithItems {
            order: order.into(),
            items,
        },
        Some(Meta::empty()),
    ))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        let status: OrderStatus = status.parse().map_err(AppError::BadRequest)?;
        condition = condition.add(OrderCol::Status.eq(status.as_str()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(&*state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    let status: OrderStatus = payload
        .status
        .parse()
        .map_err(|_| AppError::bad_request("Invalid order status"))?;

    let existing = Orders::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let mut active: OrderActive = existing.into();
    active.status = Set(status.as_str().to_string());
    active.updated_at = Set(Utc::now().into());
    let order = active.update(&*state.orm).await?;

    tracing::info!(order_id = %order.id, status = %order.status, "order status updated");
    Ok(ApiResponse::success(
        "Order status updated",
        order.into(),
        Some(Meta::empty()),
    ))
}
