use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use crate::{
    middleware::auth::{ApiKeyAuth, RequireAdmin},
    models::{
        product::{AddProductRequest, Product, ProductFilter, UpdateProductRequest},
        response::ApiError,
    },
    routes::service_error,
    services::products::ProductsService,
    AppState,
};

const FIND_ONE_PRODUCT_ERR: &str = "products-001";
const FIND_PRODUCT_ERR: &str = "products-002";
const INSERT_PRODUCT_ERR: &str = "products-003";
const DELETE_PRODUCT_ERR: &str = "products-004";
const UPDATE_PRODUCT_ERR: &str = "products-005";

const INVALID_CATEGORY: &str = "category id is invalid";

pub async fn find_one_product(
    State(state): State<AppState>,
    _: ApiKeyAuth,
    Path(product_id): Path<String>,
) -> Result<Json<Product>, ApiError> {
    ProductsService::find_one(&state.db, &product_id)
        .await
        .map(Json)
        .map_err(|e| service_error(FIND_ONE_PRODUCT_ERR, e))
}

pub async fn find_products(
    State(state): State<AppState>,
    _: ApiKeyAuth,
    Query(filter): Query<ProductFilter>,
) -> Result<Json<Vec<Product>>, ApiError> {
    ProductsService::find(&state.db, filter.search.as_deref())
        .await
        .map(Json)
        .map_err(|e| service_error(FIND_PRODUCT_ERR, e))
}

pub async fn add_product(
    State(state): State<AppState>,
    _: RequireAdmin,
    Json(body): Json<AddProductRequest>,
) -> Result<(StatusCode, Json<Product>), ApiError> {
    if body.category.id <= 0 {
        return Err(ApiError::bad_request(INSERT_PRODUCT_ERR, INVALID_CATEGORY));
    }

    let product = ProductsService::add(&state.db, &body)
        .await
        .map_err(|e| service_error(INSERT_PRODUCT_ERR, e))?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update_product(
    State(state): State<AppState>,
    _: RequireAdmin,
    Path(product_id): Path<String>,
    Json(body): Json<UpdateProductRequest>,
) -> Result<Json<Product>, ApiError> {
    if body.category.is_some_and(|c| c.id <= 0) {
        return Err(ApiError::bad_request(UPDATE_PRODUCT_ERR, INVALID_CATEGORY));
    }

    ProductsService::update(&state.db, &product_id, &body)
        .await
        .map(Json)
        .map_err(|e| service_error(UPDATE_PRODUCT_ERR, e))
}

pub async fn delete_product(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Path(product_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ProductsService::delete(&state.db, &product_id)
        .await
        .map_err(|e| service_error(DELETE_PRODUCT_ERR, e))?;
    tracing::info!(user_id = %admin.user_id, product_id = %product_id, "product deleted");
    Ok(StatusCode::NO_CONTENT)
}
