//! API router with Swagger UI

use std::sync::Arc;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use crate::domain::account::AccountRepositoryInterface;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::interfaces::http::middleware::{auth_middleware, AuthState};
use crate::interfaces::http::modules::{auth, health, profile};

/// Unified state for all routes. Axum extracts the specific handler state
/// via `FromRef`.
#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<dyn AccountRepositoryInterface>,
    pub jwt_config: JwtConfig,
}

// -- FromRef implementations so each handler keeps its own State<T> extractor --

impl FromRef<AppState> for auth::AuthHandlerState {
    fn from_ref(s: &AppState) -> Self {
        auth::AuthHandlerState {
            accounts: Arc::clone(&s.accounts),
            jwt_config: s.jwt_config.clone(),
        }
    }
}

impl FromRef<AppState> for profile::ProfileHandlerState {
    fn from_ref(s: &AppState) -> Self {
        profile::ProfileHandlerState {
            accounts: Arc::clone(&s.accounts),
        }
    }
}

impl FromRef<AppState> for AuthState {
    fn from_ref(s: &AppState) -> Self {
        AuthState {
            jwt_config: s.jwt_config.clone(),
        }
    }
}

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("JWT Bearer token"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        health::handlers::health_check,
        auth::handlers::register,
        auth::handlers::login,
        profile::handlers::get_profile,
    ),
    components(schemas(
        auth::dto::RegisterRequest,
        auth::dto::RegisterResponse,
        auth::dto::LoginRequest,
        auth::dto::LoginResponse,
        auth::dto::AccountInfo,
        profile::dto::ProfileResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Registration and login"),
        (name = "Profile", description = "Authenticated profile retrieval"),
        (name = "Health", description = "Liveness probe")
    )
)]
struct ApiDoc;

/// Build the application router.
pub fn create_api_router(state: AppState) -> Router {
    let auth_state = AuthState {
        jwt_config: state.jwt_config.clone(),
    };

    let public = Router::new()
        .route("/health", get(health::handlers::health_check))
        .route("/register", post(auth::handlers::register))
        .route("/login", post(auth::handlers::login));

    let protected = Router::new()
        .route("/profile", get(profile::handlers::get_profile))
        .layer(middleware::from_fn_with_state(auth_state, auth_middleware));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use sea_orm::{ConnectOptions, Database};
    use sea_orm_migration::MigratorTrait;
    use tower::Service;

    use crate::infrastructure::database::migrator::Migrator;
    use crate::infrastructure::database::repositories::SeaOrmAccountRepository;

    async fn test_app() -> (Router, Arc<dyn AccountRepositoryInterface>) {
        let mut opts = ConnectOptions::new("sqlite::memory:");
        opts.max_connections(1);
        let db = Database::connect(opts).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let accounts: Arc<dyn AccountRepositoryInterface> =
            Arc::new(SeaOrmAccountRepository::new(db));
        let state = AppState {
            accounts: Arc::clone(&accounts),
            jwt_config: JwtConfig {
                secret: "test-secret".to_string(),
                expiration_hours: 1,
                issuer: "account-service".to_string(),
            },
        };
        (create_api_router(state), accounts)
    }

    fn json_request(method: &str, uri: &str, body: &serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(body).unwrap()))
            .unwrap()
    }

    fn register_body() -> serde_json::Value {
        serde_json::json!({
            "username": "alice",
            "email": "a@x.com",
            "password": "pw123",
            "role": "admin"
        })
    }

    async fn send<S>(svc: &mut S, req: Request<Body>) -> axum::http::Response<Body>
    where
        S: Service<Request<Body>, Response = axum::http::Response<Body>>,
        S::Error: std::fmt::Debug,
    {
        svc.call(req).await.unwrap()
    }

    async fn body_json(resp: axum::http::Response<Body>) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn register_login_and_read_profile() {
        let (app, _) = test_app().await;
        let mut svc = app.into_service();

        // Register
        let resp = send(&mut svc, json_request("POST", "/register", &register_body())).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "User registered successfully");
        // The secret never appears in the response
        assert!(!body.to_string().contains("pw123"));

        // Login
        let login = serde_json::json!({ "username": "alice", "password": "pw123" });
        let resp = send(&mut svc, json_request("POST", "/login", &login)).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        let token = body["token"].as_str().unwrap().to_string();
        assert_eq!(body["user"]["role"], "admin");
        assert!(!body.to_string().contains("pw123"));

        // Profile
        let req = Request::builder()
            .uri("/profile")
            .header("authorization", format!("Bearer {}", token))
            .body(Body::empty())
            .unwrap();
        let resp = send(&mut svc, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["username"], "alice");
        assert_eq!(body["email"], "a@x.com");
        assert_eq!(body["role"], "admin");
    }

    #[tokio::test]
    async fn duplicate_username_returns_field_error_and_no_second_record() {
        let (app, accounts) = test_app().await;
        let mut svc = app.into_service();

        let resp = send(&mut svc, json_request("POST", "/register", &register_body())).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let mut dup = register_body();
        dup["email"] = serde_json::json!("other@x.com");
        let resp = send(&mut svc, json_request("POST", "/register", &dup)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(
            body["username"][0],
            "A user with that username already exists."
        );

        assert_eq!(accounts.count_accounts().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_returns_field_error() {
        let (app, _) = test_app().await;
        let mut svc = app.into_service();

        send(&mut svc, json_request("POST", "/register", &register_body())).await;

        let mut dup = register_body();
        dup["username"] = serde_json::json!("bob");
        let resp = send(&mut svc, json_request("POST", "/register", &dup)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["email"][0], "A user with that email already exists.");
    }

    #[tokio::test]
    async fn register_with_invalid_fields_returns_field_map() {
        let (app, accounts) = test_app().await;
        let mut svc = app.into_service();

        let bad = serde_json::json!({
            "username": "",
            "email": "not-an-email",
            "password": "pw123",
            "role": "admin"
        });
        let resp = send(&mut svc, json_request("POST", "/register", &bad)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["username"][0], "username is required");
        assert_eq!(body["email"][0], "invalid email format");

        // Nothing was persisted
        assert_eq!(accounts.count_accounts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn register_with_absent_field_returns_required_error() {
        let (app, accounts) = test_app().await;
        let mut svc = app.into_service();

        let mut body = register_body();
        body.as_object_mut().unwrap().remove("role");
        let resp = send(&mut svc, json_request("POST", "/register", &body)).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["role"][0], "This field is required.");

        assert_eq!(accounts.count_accounts().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn unauthenticated_profile_read_is_rejected() {
        let (app, _) = test_app().await;
        let mut svc = app.into_service();

        let req = Request::builder()
            .uri("/profile")
            .body(Body::empty())
            .unwrap();
        let resp = send(&mut svc, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_token_is_rejected() {
        let (app, _) = test_app().await;
        let mut svc = app.into_service();

        let req = Request::builder()
            .uri("/profile")
            .header("authorization", "Bearer not-a-jwt")
            .body(Body::empty())
            .unwrap();
        let resp = send(&mut svc, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_with_wrong_password_is_rejected() {
        let (app, _) = test_app().await;
        let mut svc = app.into_service();

        send(&mut svc, json_request("POST", "/register", &register_body())).await;

        let login = serde_json::json!({ "username": "alice", "password": "wrong" });
        let resp = send(&mut svc, json_request("POST", "/login", &login)).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn health_check_is_public() {
        let (app, _) = test_app().await;
        let mut svc = app.into_service();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();
        let resp = send(&mut svc, req).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }
}
