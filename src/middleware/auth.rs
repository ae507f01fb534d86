use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    config::JwtConfig,
    models::{
        auth::{AuthenticatedUser, TokenKind},
        response::ApiError,
        user::UserRole,
    },
    services::token::{TokenError, TokenService},
    AppState,
};

const JWT_AUTH_ERR: &str = "middlewares-002";
const PARAMS_CHECK_ERR: &str = "middlewares-003";
const AUTHORIZE_ERR: &str = "middlewares-004";
const API_KEY_ERR: &str = "middlewares-005";
const ADMIN_TOKEN_ERR: &str = "middlewares-006";

pub const API_KEY_HEADER: &str = "X-Api-Key";
pub const ADMIN_TOKEN_HEADER: &str = "X-Admin-Token";

/// Verification failures are the caller's fault (401); anything else is ours (500).
fn token_rejection(trace_id: &'static str, err: TokenError) -> ApiError {
    if err.is_rejection() {
        ApiError::unauthorized(trace_id, err.to_string())
    } else {
        ApiError::internal(trace_id, err.to_string())
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

impl AuthenticatedUser {
    pub fn from_access_token(token: &str, jwt: &JwtConfig) -> Result<Self, ApiError> {
        let claims = TokenService::verify(TokenKind::Access, jwt, token)
            .map_err(|e| token_rejection(JWT_AUTH_ERR, e))?;
        let user = claims
            .claims
            .ok_or_else(|| token_rejection(JWT_AUTH_ERR, TokenError::ClaimShape))?;

        Ok(Self {
            user_id: user.id,
            role: user.role,
        })
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// A user may only address their own resources; admins may address anyone's.
    pub fn ensure_owner(&self, user_id: &str) -> Result<(), ApiError> {
        if self.is_admin() || self.user_id == user_id {
            Ok(())
        } else {
            Err(ApiError::unauthorized(PARAMS_CHECK_ERR, "no permission to access"))
        }
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = header(parts, "Authorization")
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::unauthorized(JWT_AUTH_ERR, "missing bearer token"))?;

        Self::from_access_token(token.trim(), &state.config.jwt)
    }
}

/// Access-token holder whose role is admin.
#[derive(Debug, Clone)]
pub struct RequireAdmin(pub AuthenticatedUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.is_admin() {
            return Err(ApiError::unauthorized(AUTHORIZE_ERR, "no permission to access"));
        }
        Ok(RequireAdmin(user))
    }
}

/// Validates the `X-Api-Key` header against the API-key secret.
#[derive(Debug)]
pub struct ApiKeyAuth;

impl FromRequestParts<AppState> for ApiKeyAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let key = header(parts, API_KEY_HEADER)
            .ok_or_else(|| ApiError::unauthorized(API_KEY_ERR, "apikey is required"))?;

        TokenService::verify(TokenKind::ApiKey, &state.config.jwt, key)
            .map_err(|e| token_rejection(API_KEY_ERR, e))?;
        Ok(ApiKeyAuth)
    }
}

/// Validates the short-lived `X-Admin-Token` header against the admin secret.
#[derive(Debug)]
pub struct AdminTokenAuth;

impl FromRequestParts<AppState> for AdminTokenAuth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = header(parts, ADMIN_TOKEN_HEADER)
            .ok_or_else(|| ApiError::unauthorized(ADMIN_TOKEN_ERR, "admin token is required"))?;

        TokenService::verify(TokenKind::Admin, &state.config.jwt, token)
            .map_err(|e| token_rejection(ADMIN_TOKEN_ERR, e))?;
        Ok(AdminTokenAuth)
    }
}
