use chrono::Utc;
use futures::future::{join_all, try_join_all};
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::products::{NewProduct, PhotoUpload, ProductList, UpdateProductRequest},
    entity::{
        collections::Entity as Collections,
        products::{ActiveModel, Column, Entity as Products, Photos},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Photo, Product},
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
    utils::storage::{ObjectStore, StorageError},
};

const NOT_FOUND: &str = "No product found";

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination().normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Name).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Name => Column::Name,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&*state.orm).await? as i64;

    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success("Products", ProductList { items }, Some(meta)))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = Products::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;
    Ok(ApiResponse::success("Product", product.into(), None))
}

pub async fn products_by_collection(
    state: &AppState,
    collection_id: Uuid,
) -> AppResult<ApiResponse<ProductList>> {
    let items = Products::find()
        .filter(Column::CollectionId.eq(collection_id))
        .order_by_desc(Column::CreatedAt)
        .all(&*state.orm)
        .await?
        .into_iter()
        .map(Product::from)
        .collect();

    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(Meta::empty()),
    ))
}

/// Uploads the photos concurrently, then stores the product. Photos already
/// uploaded are removed again when any upload or the insert fails.
pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    fields: NewProduct,
    uploads: Vec<PhotoUpload>,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let fields = NewProduct {
        name: fields.name.trim().to_string(),
        ..fields
    };
    fields.validate()?;

    if Collections::find_by_id(fields.collection_id)
        .one(&*state.orm)
        .await?
        .is_none()
    {
        return Err(AppError::bad_request("Collection not found"));
    }

    let id = Uuid::new_v4();
    let photos = upload_photos(state.storage.as_ref(), id, uploads).await?;

    let now = Utc::now();
    let active = ActiveModel {
        id: Set(id),
        name: Set(fields.name),
        price: Set(fields.price),
        description: Set(Some(fields.description)),
        photos: Set(Photos(photos.clone())),
        stock: Set(fields.stock),
        sold: Set(0),
        collection_id: Set(Some(fields.collection_id)),
        created_at: Set(now.into()),
        updated_at: Set(now.into()),
    };
    let product = match active.insert(&*state.orm).await {
        Ok(product) => product,
        Err(err) => {
            remove_photos(state.storage.as_ref(), &photos).await;
            return Err(err.into());
        }
    };

    tracing::info!(product_id = %product.id, photos = photos.len(), "product created");
    Ok(ApiResponse::success(
        "Product created",
        product.into(),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let payload = UpdateProductRequest {
        name: payload.name.map(|name| name.trim().to_string()),
        ..payload
    };
    payload.validate()?;

    let existing = Products::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(description) = payload.description {
        active.description = Set(Some(description));
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }
    if let Some(collection_id) = payload.collection_id {
        if Collections::find_by_id(collection_id)
            .one(&*state.orm)
            .await?
            .is_none()
        {
            return Err(AppError::bad_request("Collection not found"));
        }
        active.collection_id = Set(Some(collection_id));
    }
    active.updated_at = Set(Utc::now().into());

    let product = active.update(&*state.orm).await?;

    Ok(ApiResponse::success(
        "Updated",
        product.into(),
        Some(Meta::empty()),
    ))
}

/// Removes every stored photo first; the record survives if storage refuses.
pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let product = Products::find_by_id(id)
        .one(&*state.orm)
        .await?
        .ok_or_else(|| AppError::not_found(NOT_FOUND))?;

    let store = state.storage.as_ref();
    try_join_all(
        product
            .photos
            .0
            .iter()
            .map(|photo| store.delete_object(&photo.key)),
    )
    .await?;

    Products::delete_by_id(product.id).exec(&*state.orm).await?;

    tracing::info!(product_id = %id, "product deleted");
    Ok(ApiResponse::success(
        "Product has been deleted successfully",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// `products/{id}/photo_{n}.{ext}`, `n` counting from 1.
pub fn photo_key(product_id: Uuid, position: usize, content_type: &str) -> String {
    let ext = match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/webp" => "webp",
        "image/gif" => "gif",
        _ => "png",
    };
    format!("products/{product_id}/photo_{position}.{ext}")
}

async fn upload_photos(
    store: &dyn ObjectStore,
    product_id: Uuid,
    uploads: Vec<PhotoUpload>,
) -> AppResult<Vec<Photo>> {
    let results = join_all(uploads.into_iter().enumerate().map(|(index, upload)| async move {
        let key = photo_key(product_id, index + 1, &upload.content_type);
        let secure_url = store
            .put_object(&key, upload.bytes, &upload.content_type)
            .await?;
        Ok::<_, StorageError>(Photo { key, secure_url })
    }))
    .await;

    let mut photos = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(photo) => photos.push(photo),
            Err(err) if first_error.is_none() => first_error = Some(err),
            Err(err) => tracing::warn!(error = %err, "photo upload failed"),
        }
    }

    if let Some(err) = first_error {
        remove_photos(store, &photos).await;
        return Err(err.into());
    }
    Ok(photos)
}

async fn remove_photos(store: &dyn ObjectStore, photos: &[Photo]) {
    let results = join_all(photos.iter().map(|photo| store.delete_object(&photo.key))).await;
    for err in results.into_iter().filter_map(Result::err) {
        tracing::warn!(error = %err, "orphaned photo cleanup failed");
    }
}
