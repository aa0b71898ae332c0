use crate::{
    controller::{auth_controller, health_check_controller, page_controller, product_controller},
    middleware::route_guard::require_session,
    AppState,
};
use axum::{middleware::from_fn_with_state, routing::get, Router};
use service::config::SESSION_COOKIE_NAME;
use tower_http::services::ServeDir;

use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "OIDC Relying Party API"
        ),
        paths(
            auth_controller::login,
            auth_controller::callback,
            auth_controller::logout,
            auth_controller::logout_acknowledged,
            page_controller::home,
            page_controller::dashboard,
            product_controller::page,
            product_controller::index,
            health_check_controller::health_check,
        ),
        components(
            schemas(
                product_controller::Product,
                product_controller::ProductList,
            )
        ),
        modifiers(&SecurityAddon),
        tags(
            (name = "oidc_relying_party", description = "OpenID Connect login and session-protected resources")
        )
    )]
struct ApiDoc;

struct SecurityAddon;

// Defines our signed session cookie requirement for gaining access to the
// protected endpoints for OpenAPI.
impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "cookie_auth",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::with_description(
                    SESSION_COOKIE_NAME,
                    "Signed session token set by a successful /api/auth/callback",
                ))),
            )
        }
    }
}

/// The auth endpoints and the API docs are merged in beside the guarded
/// router, so the route guard never sees them.
pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(auth_routes(app_state.clone()))
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .merge(guarded_routes(app_state))
}

fn auth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/api/auth/login", get(auth_controller::login))
        .route("/api/auth/callback", get(auth_controller::callback))
        .route(
            "/api/auth/logout",
            get(auth_controller::logout).post(auth_controller::logout_acknowledged),
        )
        .with_state(app_state)
}

// Every request reaching this router, static assets included, passes the
// route guard first. Only configured prefixes are actually protected.
fn guarded_routes(app_state: AppState) -> Router {
    let static_dir = ServeDir::new(&app_state.config.static_dir);
    Router::new()
        .merge(page_routes())
        .merge(product_routes())
        .merge(health_routes())
        .fallback_service(static_dir)
        .layer(from_fn_with_state(app_state.clone(), require_session))
        .with_state(app_state)
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(page_controller::home))
        .route("/dashboard", get(page_controller::dashboard))
}

fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/products", get(product_controller::page))
        .route("/api/products", get(product_controller::index))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check_controller::health_check))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{state_from, test_config, test_state, StubProvider, AUTHORIZE_URL};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use tower::ServiceExt;

    async fn get(app: Router, uri: &str) -> Response {
        app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = get(define_routes(test_state()), "/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"healthy");
    }

    #[tokio::test]
    async fn test_openapi_document_lists_auth_endpoints() {
        let response = get(define_routes(test_state()), "/api-docs/openapi.json").await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let document: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(document["paths"]["/api/auth/callback"].is_object());
        assert!(document["components"]["securitySchemes"]["cookie_auth"].is_object());
    }

    #[tokio::test]
    async fn test_auth_routes_bypass_guard_even_under_protected_prefix() {
        let mut config = test_config();
        config.protected_path_prefixes = vec!["/api".to_string()];
        let app = define_routes(state_from(config, StubProvider::default()));

        let login = get(app.clone(), "/api/auth/login").await;
        assert_eq!(login.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(login.headers()[header::LOCATION], AUTHORIZE_URL);

        let products = get(app, "/api/products").await;
        assert_eq!(products.status(), StatusCode::TEMPORARY_REDIRECT);
        assert_eq!(products.headers()[header::LOCATION], "/api/auth/login");
    }

    #[tokio::test]
    async fn test_unknown_protected_subpath_is_guarded() {
        let response = get(define_routes(test_state()), "/dashboard/settings").await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }

    #[tokio::test]
    async fn test_unknown_public_path_falls_through_to_static_files() {
        let response = get(define_routes(test_state()), "/no-such-asset.css").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
