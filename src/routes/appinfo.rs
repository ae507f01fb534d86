use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::{json, Value};

use crate::{
    middleware::auth::{ApiKeyAuth, RequireAdmin},
    models::{
        appinfo::{ApiKeyResponse, Category, CategoryFilter},
        response::ApiError,
    },
    routes::service_error,
    services::appinfo::AppinfoService,
    AppState,
};

const GENERATE_API_KEY_ERR: &str = "appinfo-001";
const FIND_CATEGORY_ERR: &str = "appinfo-002";
const ADD_CATEGORY_ERR: &str = "appinfo-003";
const REMOVE_CATEGORY_ERR: &str = "appinfo-004";

pub async fn generate_api_key(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<ApiKeyResponse>, ApiError> {
    let key = AppinfoService::generate_api_key(&state.config.jwt)
        .map_err(|e| service_error(GENERATE_API_KEY_ERR, e))?;
    tracing::info!(user_id = %admin.user_id, "api key issued");
    Ok(Json(ApiKeyResponse { key }))
}

pub async fn find_categories(
    State(state): State<AppState>,
    _: ApiKeyAuth,
    Query(filter): Query<CategoryFilter>,
) -> Result<Json<Vec<Category>>, ApiError> {
    AppinfoService::find_categories(&state.db, filter.title.as_deref())
        .await
        .map(Json)
        .map_err(|e| service_error(FIND_CATEGORY_ERR, e))
}

pub async fn add_categories(
    State(state): State<AppState>,
    _: RequireAdmin,
    Json(body): Json<Vec<Category>>,
) -> Result<(StatusCode, Json<Vec<Category>>), ApiError> {
    let titles: Vec<String> = body
        .into_iter()
        .map(|c| c.title)
        .filter(|t| !t.trim().is_empty())
        .collect();
    if titles.is_empty() {
        return Err(ApiError::bad_request(ADD_CATEGORY_ERR, "categories request are empty"));
    }

    let inserted = AppinfoService::add_categories(&state.db, &titles)
        .await
        .map_err(|e| service_error(ADD_CATEGORY_ERR, e))?;
    Ok((StatusCode::CREATED, Json(inserted)))
}

pub async fn remove_category(
    State(state): State<AppState>,
    _: RequireAdmin,
    Path(category_id): Path<i32>,
) -> Result<Json<Value>, ApiError> {
    if category_id <= 0 {
        return Err(ApiError::bad_request(REMOVE_CATEGORY_ERR, "id must be more than 0"));
    }

    let removed = AppinfoService::remove_category(&state.db, category_id)
        .await
        .map_err(|e| service_error(REMOVE_CATEGORY_ERR, e))?;
    if !removed {
        return Err(ApiError::new(
            StatusCode::NOT_FOUND,
            REMOVE_CATEGORY_ERR,
            format!("category {category_id} not found"),
        ));
    }
    Ok(Json(json!({ "category_id": category_id })))
}
