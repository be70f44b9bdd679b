use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, QueryFilter, QueryOrder, Set};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::coupons::{CouponList, CreateCouponRequest, UpdateCouponRequest},
    entity::coupons::{ActiveModel, Column, Entity as Coupons},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin, ensure_role},
    models::{Coupon, Role},
    response::{ApiResponse, Meta},
    state::AppState,
};

const NOT_FOUND: &str = "Coupon not found";
const STAFF: &[Role] = &[Role::Admin, Role::Moderator];

/// Codes are matched case-insensitively by storing them upper-cased.
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub async fn create_coupon(
    state: &AppState,
    user: &AuthUser,
    payload: CreateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_admin(user)?;
    let payload = CreateCouponRequest {
        code: normalize_code(&payload.code),
        discount: payload.discount,
    };
    let discount = match payload.discount {
        Some(discount) if !payload.code.is_empty() => discount,
        _ => return Err(AppError::bad_request("Code and discount are required")),
    };
    payload.validate()?;

    let exist = Coupons::find()
        .filter(Column::Code.eq(payload.code.as_str()))
        .one(&*state.orm)
        .await?;
    if exist.is_some() {
        return Err(AppError::bad_request("Coupon already exists"));
    }

    let now = Utc::now();
    let coupon = ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(payload.code),
        discount: Set(discount),
        active: Set(true),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&*state.orm)
    .await
    .map_err(|err| AppError::on_conflict(err, "Coupon already exists"))?;

    tracing::info!(coupon_id = %coupon.id, code = %coupon.code, "coupon created");
    Ok(ApiResponse::success(
        "Coupon created successfully",
        coupon.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateCouponRequest,
) -> AppResult<ApiResponse<Coupon>> {
    ensure_role(user, STAFF)?;
    let existing = Coupons::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let mut active: ActiveModel = existing.into();
    active.active = Set(payload.active);
    active.updated_at = Set(Utc::now().into());
    let coupon = active.update(&*state.orm).await?;

    Ok(ApiResponse::success(
        "Coupon updated successfully",
        coupon.into(),
        Some(Meta::empty()),
    ))
}

pub async fn delete_coupon(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_role(user, STAFF)?;
    let result = Coupons::delete_by_id(id).exec(&*state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found(NOT_FOUND));
    }

    Ok(ApiResponse::success(
        "Coupon deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_coupons(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<CouponList>> {
    ensure_role(user, STAFF)?;
    let items = Coupons::find()
        .order_by_desc(Column::CreatedAt)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Coupon::from)
        .collect();

    Ok(ApiResponse::success(
        "Coupons",
        CouponList { items },
        Some(Meta::empty()),
    ))
}
