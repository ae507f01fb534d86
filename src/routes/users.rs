use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::{
    middleware::auth::{AdminTokenAuth, ApiKeyAuth, RequireAdmin},
    models::{
        auth::{AuthenticatedUser, TokenKind},
        response::ApiError,
        user::{
            AdminTokenResponse, RefreshPassportRequest, SignInRequest, SignOutRequest,
            SignUpRequest, UserPassport, UserProfile, UserRole,
        },
    },
    routes::service_error,
    services::{token::TokenService, users::UsersService},
    AppState,
};

const SIGN_UP_CUSTOMER_ERR: &str = "users-001";
const SIGN_IN_ERR: &str = "users-002";
const REFRESH_PASSPORT_ERR: &str = "users-003";
const SIGN_OUT_ERR: &str = "users-004";
const SIGN_UP_ADMIN_ERR: &str = "users-005";
const GENERATE_ADMIN_TOKEN_ERR: &str = "users-006";
const GET_USER_PROFILE_ERR: &str = "users-007";

pub async fn sign_up_customer(
    State(state): State<AppState>,
    _: ApiKeyAuth,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<UserPassport>), ApiError> {
    let passport = UsersService::sign_up(&state.db, &state.config.jwt, &body, UserRole::Customer)
        .await
        .map_err(|e| service_error(SIGN_UP_CUSTOMER_ERR, e))?;
    Ok((StatusCode::CREATED, Json(passport)))
}

/// Creating an admin needs both an admin session and a fresh admin token.
pub async fn sign_up_admin(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    _: AdminTokenAuth,
    Json(body): Json<SignUpRequest>,
) -> Result<(StatusCode, Json<UserPassport>), ApiError> {
    let passport = UsersService::sign_up(&state.db, &state.config.jwt, &body, UserRole::Admin)
        .await
        .map_err(|e| service_error(SIGN_UP_ADMIN_ERR, e))?;
    tracing::info!(created_by = %admin.user_id, user_id = %passport.user.id, "admin account created");
    Ok((StatusCode::CREATED, Json(passport)))
}

pub async fn sign_in(
    State(state): State<AppState>,
    _: ApiKeyAuth,
    Json(body): Json<SignInRequest>,
) -> Result<Json<UserPassport>, ApiError> {
    UsersService::sign_in(&state.db, &state.config.jwt, &body.email, &body.password)
        .await
        .map(Json)
        .map_err(|e| service_error(SIGN_IN_ERR, e))
}

pub async fn refresh_passport(
    State(state): State<AppState>,
    _: ApiKeyAuth,
    Json(body): Json<RefreshPassportRequest>,
) -> Result<Json<UserPassport>, ApiError> {
    UsersService::refresh_passport(&state.db, &state.config.jwt, body.refresh_token.trim())
        .await
        .map(Json)
        .map_err(|e| service_error(REFRESH_PASSPORT_ERR, e))
}

pub async fn sign_out(
    State(state): State<AppState>,
    _: ApiKeyAuth,
    Json(body): Json<SignOutRequest>,
) -> Result<StatusCode, ApiError> {
    UsersService::sign_out(&state.db, body.oauth_id)
        .await
        .map_err(|e| service_error(SIGN_OUT_ERR, e))?;
    Ok(StatusCode::OK)
}

pub async fn generate_admin_token(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
) -> Result<Json<AdminTokenResponse>, ApiError> {
    let token = TokenService::issue(TokenKind::Admin, &state.config.jwt, None)
        .map_err(|e| ApiError::internal(GENERATE_ADMIN_TOKEN_ERR, e.to_string()))?;
    tracing::info!(user_id = %admin.user_id, "admin token issued");
    Ok(Json(AdminTokenResponse { token }))
}

pub async fn get_user_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserProfile>, ApiError> {
    let user_id = user_id.trim();
    user.ensure_owner(user_id)?;

    UsersService::get_profile(&state.db, user_id)
        .await
        .map(Json)
        .map_err(|e| service_error(GET_USER_PROFILE_ERR, e))
}
