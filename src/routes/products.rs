use std::collections::HashMap;

use axum::{
    Json, Router,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
    },
    routing::get,
};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::products::{NewProduct, PhotoUpload, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    extract::AppJson,
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::ApiResponse,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

const MISSING_FIELDS: &str = "Please fill all the fields";

/// Multipart layout accepted by `POST /api/product`; every file part is a photo.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct ProductForm {
    name: String,
    price: i64,
    description: String,
    collection_id: Uuid,
    stock: Option<i32>,
    #[schema(value_type = Vec<String>, format = Binary)]
    photos: Vec<Vec<u8>>,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
        .route("/collection/{id}", get(products_by_collection))
}

#[utoipa::path(
    get,
    path = "/api/product",
    params(ProductQuery),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<Product>),
        (status = 404, description = "No product found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/product/collection/{id}",
    params(
        ("id" = Uuid, Path, description = "Collection ID")
    ),
    responses(
        (status = 200, description = "Products of one collection", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn products_by_collection(
    Path(id): Path<Uuid>,
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::products_by_collection(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/product",
    request_body(content = ProductForm, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Create product", body = ApiResponse<Product>),
        (status = 400, description = "Missing fields or unknown collection"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> AppResult<Json<ApiResponse<Product>>> {
    ensure_admin(&user)?;
    let (fields, photos) = read_product_form(multipart?).await?;
    let resp = product_service::create_product(&state, &user, fields, photos).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/product/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<Product>),
        (status = 404, description = "No product found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    AppJson(payload): AppJson<UpdateProductRequest>,
) -> AppResult<Json<ApiResponse<Product>>> {
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/product/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product and its photos"),
        (status = 404, description = "No product found")
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

async fn read_product_form(mut multipart: Multipart) -> AppResult<(NewProduct, Vec<PhotoUpload>)> {
    let mut text = HashMap::new();
    let mut photos = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        if field.file_name().is_some() {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field.bytes().await?;
            if !bytes.is_empty() {
                photos.push(PhotoUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
        } else {
            text.insert(name, field.text().await?);
        }
    }

    Ok((product_fields(&text)?, photos))
}

/// Turns the text parts of the form into a [`NewProduct`].
pub fn product_fields(text: &HashMap<String, String>) -> AppResult<NewProduct> {
    let field = |key: &str| {
        text.get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| AppError::bad_request(MISSING_FIELDS))
    };

    let name = field("name")?;
    let price = field("price")?;
    let description = field("description")?;
    let collection_id = field("collection_id")?;

    let price = price
        .parse::<i64>()
        .map_err(|_| AppError::bad_request("price must be a whole number"))?;
    let collection_id = Uuid::parse_str(collection_id)
        .map_err(|_| AppError::bad_request("collection_id is invalid"))?;
    let stock = match text.get("stock").map(|v| v.trim()).filter(|v| !v.is_empty()) {
        Some(raw) => raw
            .parse::<i32>()
            .map_err(|_| AppError::bad_request("stock must be a whole number"))?,
        None => 0,
    };

    Ok(NewProduct {
        name: name.to_string(),
        price,
        description: description.to_string(),
        collection_id,
        stock,
    })
}
