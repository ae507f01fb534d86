pub mod appinfo;
pub mod monitor;
pub mod products;
pub mod users;

use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderName, Method, StatusCode},
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::{
    middleware::logger::request_logger,
    models::response::ApiError,
    services::{products::ProductError, token::TokenError, users::UserError},
    AppState,
};

const ROUTER_CHECK_ERR: &str = "middlewares-001";

/// Map a service failure to a response, keeping typed failures' statuses.
pub(crate) fn service_error(trace_id: &'static str, err: anyhow::Error) -> ApiError {
    if let Some(e) = err.downcast_ref::<UserError>() {
        let status = match e {
            UserError::AlreadyExists => StatusCode::BAD_REQUEST,
            UserError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            UserError::OauthNotFound | UserError::NotFound => StatusCode::NOT_FOUND,
        };
        return ApiError::new(status, trace_id, e.to_string());
    }
    if let Some(e) = err.downcast_ref::<ProductError>() {
        let status = match e {
            ProductError::NotFound => StatusCode::NOT_FOUND,
            ProductError::CategoryNotFound(_) => StatusCode::BAD_REQUEST,
        };
        return ApiError::new(status, trace_id, e.to_string());
    }
    if let Some(e) = err.downcast_ref::<TokenError>() {
        if e.is_rejection() {
            return ApiError::unauthorized(trace_id, e.to_string());
        }
    }
    ApiError::internal(trace_id, err.to_string())
}

async fn route_not_found() -> ApiError {
    ApiError::new(StatusCode::NOT_FOUND, ROUTER_CHECK_ERR, "router not found")
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static("x-api-key"),
            HeaderName::from_static("x-admin-token"),
        ])
        .allow_origin(Any)
}

pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.config.timeout_seconds);
    let body_limit = state.config.body_limit_bytes;

    Router::new()
        // Monitor
        .route("/", get(monitor::health_check))
        .route("/metrics", get(monitor::metrics_handler))
        // Users
        .route("/users/signup", post(users::sign_up_customer))
        .route("/users/signin", post(users::sign_in))
        .route("/users/refresh", post(users::refresh_passport))
        .route("/users/signout", post(users::sign_out))
        .route("/users/signup/admin", post(users::sign_up_admin))
        .route("/users/admin/secret", get(users::generate_admin_token))
        .route("/users/{user_id}", get(users::get_user_profile))
        // App info
        .route("/appinfo/apikey", get(appinfo::generate_api_key))
        .route(
            "/appinfo/categories",
            get(appinfo::find_categories).post(appinfo::add_categories),
        )
        .route("/appinfo/{category_id}/categories", delete(appinfo::remove_category))
        // Products
        .route("/products", get(products::find_products).post(products::add_product))
        .route(
            "/products/{product_id}",
            get(products::find_one_product)
                .patch(products::update_product)
                .delete(products::delete_product),
        )
        .fallback(route_not_found)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn(request_logger))
                .layer(TimeoutLayer::new(timeout))
                .layer(cors()),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, response::Response};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::{
        models::{auth::TokenKind, user::UserRole},
        services::token::TokenService,
        test_support::{access_token, test_state},
    };

    async fn send(state: &AppState, request: Request<Body>) -> Response {
        router(state.clone()).oneshot(request).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn get_with_bearer(uri: &str, token: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = test_state();
        let response = send(&state, Request::builder().uri("/").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["name"], "shop-api");
        assert_eq!(body["version"], "test");
    }

    #[tokio::test]
    async fn test_metrics_expose_token_counters() {
        let state = test_state();
        let token = access_token(&state, "a1", UserRole::Admin);
        send(&state, get_with_bearer("/users/admin/secret", &token)).await;

        let response =
            send(&state, Request::builder().uri("/metrics").body(Body::empty()).unwrap()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("shop_tokens_issued_total"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = test_state();
        let response =
            send(&state, Request::builder().uri("/orders").body(Body::empty()).unwrap()).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["trace_id"], ROUTER_CHECK_ERR);
    }

    #[tokio::test]
    async fn test_admin_secret_issues_admin_token() {
        let state = test_state();
        let token = access_token(&state, "a1", UserRole::Admin);
        let response = send(&state, get_with_bearer("/users/admin/secret", &token)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let admin = body["token"].as_str().unwrap();
        let claims = TokenService::verify(TokenKind::Admin, &state.config.jwt, admin).unwrap();
        assert_eq!(claims.sub, "admin-token");
    }

    #[tokio::test]
    async fn test_admin_secret_refused_to_customer() {
        let state = test_state();
        let token = access_token(&state, "u1", UserRole::Customer);
        let response = send(&state, get_with_bearer("/users/admin/secret", &token)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["trace_id"], "middlewares-004");
    }

    #[tokio::test]
    async fn test_generate_api_key() {
        let state = test_state();
        let token = access_token(&state, "a1", UserRole::Admin);
        let response = send(&state, get_with_bearer("/appinfo/apikey", &token)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        let key = body["key"].as_str().unwrap();
        assert!(TokenService::verify(TokenKind::ApiKey, &state.config.jwt, key).is_ok());
    }

    #[tokio::test]
    async fn test_expired_bearer_is_unauthorized() {
        let state = test_state();
        let issued = chrono::Utc::now() - chrono::Duration::days(1);
        let claims = crate::models::auth::UserClaims {
            id: "a1".into(),
            role: UserRole::Admin,
        };
        let token =
            TokenService::issue_at(TokenKind::Access, &state.config.jwt, Some(&claims), issued)
                .unwrap();
        let response = send(&state, get_with_bearer("/appinfo/apikey", &token)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["message"], "token had expired");
    }

    #[tokio::test]
    async fn test_categories_require_api_key() {
        let state = test_state();
        let request = Request::builder()
            .uri("/appinfo/categories")
            .body(Body::empty())
            .unwrap();
        let response = send(&state, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["trace_id"], "middlewares-005");
    }

    #[tokio::test]
    async fn test_sign_in_requires_api_key() {
        let state = test_state();
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users/signin")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"email":"a@b.c","password":"pw"}"#))
            .unwrap();
        let response = send(&state, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_profile_of_another_user_refused() {
        let state = test_state();
        let token = access_token(&state, "u1", UserRole::Customer);
        let response = send(&state, get_with_bearer("/users/u2", &token)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["trace_id"], "middlewares-003");
    }

    #[tokio::test]
    async fn test_admin_signup_requires_admin_token() {
        let state = test_state();
        let token = access_token(&state, "a1", UserRole::Admin);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/users/signup/admin")
            .header("Authorization", format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(
                r#"{"email":"root@shop.test","username":"root","password":"pw"}"#,
            ))
            .unwrap();
        let response = send(&state, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["trace_id"], "middlewares-006");
    }

    fn admin_json(state: &AppState, method: Method, uri: &str, body: &'static str) -> Request<Body> {
        let token = access_token(state, "a1", UserRole::Admin);
        Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", format!("Bearer {token}"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_products_require_api_key() {
        let state = test_state();
        for uri in ["/products", "/products/00000000-0000-0000-0000-000000000001"] {
            let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
            let response = send(&state, request).await;
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(json_body(response).await["trace_id"], "middlewares-005");
        }
    }

    #[tokio::test]
    async fn test_product_writes_refused_to_customer() {
        let state = test_state();
        let token = access_token(&state, "u1", UserRole::Customer);
        let request = Request::builder()
            .method(Method::DELETE)
            .uri("/products/00000000-0000-0000-0000-000000000001")
            .header("Authorization", format!("Bearer {token}"))
            .body(Body::empty())
            .unwrap();
        let response = send(&state, request).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["trace_id"], "middlewares-004");
    }

    #[tokio::test]
    async fn test_add_product_checks_category_id() {
        let state = test_state();
        let request = admin_json(
            &state,
            Method::POST,
            "/products",
            r#"{"title":"Coffee","category":{"id":0},"price":150}"#,
        );
        let response = send(&state, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["trace_id"], "products-003");
        assert_eq!(body["message"], "category id is invalid");
    }

    #[tokio::test]
    async fn test_update_product_checks_category_id() {
        let state = test_state();
        let request = admin_json(
            &state,
            Method::PATCH,
            "/products/00000000-0000-0000-0000-000000000001",
            r#"{"category":{"id":-1}}"#,
        );
        let response = send(&state, request).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["trace_id"], "products-005");
    }

    #[test]
    fn test_service_error_statuses() {
        let err = service_error("users-002", UserError::InvalidCredentials.into());
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);

        let err = service_error("users-003", TokenError::Expired.into());
        assert_eq!(err.status, StatusCode::UNAUTHORIZED);
        assert_eq!(err.message, "token had expired");

        let err = service_error("users-001", TokenError::InvalidExpiry.into());
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);

        let err = service_error("products-001", ProductError::NotFound.into());
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err = service_error("products-003", ProductError::CategoryNotFound(9).into());
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "category 9 not found");

        let err = service_error("users-001", anyhow::anyhow!("connection refused"));
        assert_eq!(err.status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}
