use crate::extractors::current_session::CurrentSession;

use axum::Json;
use log::*;
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub description: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub products: Vec<Product>,
}

fn catalog() -> Vec<Product> {
    [
        (
            "p-1001",
            "Wireless Headphones",
            129.99,
            "Noise-cancelling over-ear headphones",
        ),
        (
            "p-1002",
            "Smartwatch",
            199.0,
            "Fitness tracking and notifications",
        ),
        (
            "p-1003",
            "Mechanical Keyboard",
            89.5,
            "RGB backlit, blue switches",
        ),
    ]
    .into_iter()
    .map(|(id, name, price, description)| Product {
        id: id.to_string(),
        name: name.to_string(),
        price,
        description: description.to_string(),
    })
    .collect()
}

/// GET /products
///
/// Product listing behind the route guard.
#[utoipa::path(
    get,
    path = "/products",
    responses(
        (status = 200, description = "Product listing", body = ProductList),
        (status = 307, description = "No valid session, redirect to login"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn page(CurrentSession(_record): CurrentSession) -> Json<ProductList> {
    Json(ProductList {
        products: catalog(),
    })
}

/// GET /api/products
///
/// Not under a guarded prefix, so the session is validated here instead.
#[utoipa::path(
    get,
    path = "/api/products",
    responses(
        (status = 200, description = "Product listing", body = ProductList),
        (status = 401, description = "Unauthorized"),
    ),
    security(
        ("cookie_auth" = [])
    )
)]
pub async fn index(CurrentSession(record): CurrentSession) -> Json<ProductList> {
    debug!("Listing products for subject {}", record.user.sub);
    Json(ProductList {
        products: catalog(),
    })
}

#[cfg(test)]
mod tests {
    use crate::router::define_routes;
    use crate::test_support::{session_for, test_state};
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use chrono::Utc;
    use serde_json::{json, Value};
    use service::config::SESSION_COOKIE_NAME;
    use tower::ServiceExt;

    async fn get(uri: &str, token: Option<&str>) -> Response {
        let mut request = Request::builder().uri(uri);
        if let Some(token) = token {
            request = request.header(header::COOKIE, format!("{SESSION_COOKIE_NAME}={token}"));
        }
        define_routes(test_state())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_json(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_api_products_requires_session() {
        let response = get("/api/products", None).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(body_json(response).await, json!({"error": "Unauthorized"}));
    }

    #[tokio::test]
    async fn test_api_products_rejects_expired_session() {
        let now = Utc::now().timestamp();
        let token = session_for(now - 7200, now - 1);

        let response = get("/api/products", Some(&token)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_api_products_lists_catalog() {
        let now = Utc::now().timestamp();
        let token = session_for(now, now + 3600);

        let response = get("/api/products", Some(&token)).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        let products = body["products"].as_array().unwrap();
        assert_eq!(products.len(), 3);
        assert_eq!(products[0]["id"], "p-1001");
        assert_eq!(products[2]["price"], 89.5);
    }

    #[tokio::test]
    async fn test_products_page_is_guarded() {
        let response = get("/products", None).await;

        assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    }
}
