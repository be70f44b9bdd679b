use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, QueryOrder, Set};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::collections::{CollectionList, CollectionRequest},
    entity::collections::{ActiveModel, Column, Entity as Collections},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Collection,
    response::{ApiResponse, Meta},
    state::AppState,
};

const NOT_FOUND: &str = "Collection not found";

fn normalized_name(payload: CollectionRequest) -> AppResult<String> {
    let payload = CollectionRequest {
        name: payload.name.trim().to_string(),
    };
    if payload.name.is_empty() {
        return Err(AppError::bad_request("Collection name is required"));
    }
    payload.validate()?;
    Ok(payload.name)
}

pub async fn create_collection(
    state: &AppState,
    user: &AuthUser,
    payload: CollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    ensure_admin(user)?;
    let name = normalized_name(payload)?;

    let now = Utc::now();
    let collection = ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    }
    .insert(&*state.orm)
    .await?;

    tracing::info!(collection_id = %collection.id, "collection created");
    Ok(ApiResponse::success(
        "Collection created successfully",
        collection.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_collection(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: CollectionRequest,
) -> AppResult<ApiResponse<Collection>> {
    ensure_admin(user)?;
    let name = normalized_name(payload)?;

    let existing = Collections::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let mut active: ActiveModel = existing.into();
    active.name = Set(name);
    active.updated_at = Set(Utc::now().into());
    let collection = active.update(&*state.orm).await?;

    Ok(ApiResponse::success(
        "Collection updated successfully",
        collection.into(),
        Some(Meta::empty()),
    ))
}

/// Referencing products are left alone; the database nulls their `collection_id`.
pub async fn delete_collection(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Collections::delete_by_id(id).exec(&*state.orm).await?;

    if result.rows_affected == 0 {
        return Err(AppError::not_found(NOT_FOUND));
    }

    tracing::info!(collection_id = %id, "collection deleted");
    Ok(ApiResponse::success(
        "Collection has been deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn list_collections(state: &AppState) -> AppResult<ApiResponse<CollectionList>> {
    let items = Collections::find()
        .order_by_desc(Column::CreatedAt)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Collection::from)
        .collect();

    Ok(ApiResponse::success(
        "Collections",
        CollectionList { items },
        Some(Meta::empty()),
    ))
}
