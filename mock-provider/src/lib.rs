//! Mock OpenID Connect identity provider.
//!
//! A development and test fixture exposing the endpoints a relying party
//! consumes: discovery, authorize, token, userinfo and jwks. Every login
//! succeeds for the same fixed user.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use log::*;
use serde::Deserialize;
use serde_json::{json, Value};
use url::Url;

mod keys;

use keys::SigningKey;
pub use keys::KEY_ID;

pub const CLIENT_ID: &str = "mock-client-id";
pub const AUTHORIZATION_CODE: &str = "mock-auth-code-123";
pub const ACCESS_TOKEN: &str = "mock-access-token-xyz";
pub const SUBJECT: &str = "mock-user-123";
pub const TOKEN_LIFETIME_SECS: i64 = 3600;

const USER_NAME: &str = "Mock User";
const USER_EMAIL: &str = "mockuser@example.com";
const USER_PICTURE: &str = "https://ui-avatars.com/api/?name=Mock+User";

/// Shared state behind the fixture's routes.
#[derive(Clone)]
pub struct MockProvider {
    issuer: Arc<str>,
    signing_key: Arc<SigningKey>,
}

impl MockProvider {
    /// Creates a provider for `issuer` with a freshly generated signing key.
    pub fn new(issuer: &str) -> anyhow::Result<Self> {
        Ok(Self {
            issuer: issuer.trim_end_matches('/').into(),
            signing_key: Arc::new(SigningKey::generate()?),
        })
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn router(self) -> Router {
        Router::new()
            .route("/.well-known/openid-configuration", get(discovery))
            .route("/authorize", get(authorize))
            .route("/token", post(token))
            .route("/userinfo", get(userinfo))
            .route("/jwks", get(jwks))
            .with_state(self)
    }
}

async fn discovery(State(provider): State<MockProvider>) -> Json<Value> {
    let issuer = provider.issuer();
    Json(json!({
        "issuer": issuer,
        "authorization_endpoint": format!("{issuer}/authorize"),
        "token_endpoint": format!("{issuer}/token"),
        "userinfo_endpoint": format!("{issuer}/userinfo"),
        "jwks_uri": format!("{issuer}/jwks"),
        "response_types_supported": ["code"],
        "subject_types_supported": ["public"],
        "id_token_signing_alg_values_supported": ["RS256"],
        "scopes_supported": ["openid", "profile", "email"],
        "token_endpoint_auth_methods_supported": ["client_secret_post", "client_secret_basic"],
        "claims_supported": ["sub", "name", "email", "picture"],
    }))
}

#[derive(Debug, Deserialize)]
struct AuthorizeParams {
    redirect_uri: Option<String>,
    state: Option<String>,
}

async fn authorize(Query(params): Query<AuthorizeParams>) -> Response {
    let (Some(redirect_uri), Some(state)) = (params.redirect_uri, params.state) else {
        return (StatusCode::BAD_REQUEST, "Missing redirect_uri or state").into_response();
    };

    let Ok(mut callback) = Url::parse(&redirect_uri) else {
        return (StatusCode::BAD_REQUEST, "Invalid redirect_uri").into_response();
    };
    callback
        .query_pairs_mut()
        .append_pair("code", AUTHORIZATION_CODE)
        .append_pair("state", &state);

    debug!("Authorizing mock user, redirecting to {}", callback);
    (StatusCode::FOUND, [(header::LOCATION, callback.to_string())]).into_response()
}

async fn token(State(provider): State<MockProvider>) -> Response {
    let now = Utc::now().timestamp();
    let claims = json!({
        "iss": provider.issuer(),
        "sub": SUBJECT,
        "aud": CLIENT_ID,
        "name": USER_NAME,
        "email": USER_EMAIL,
        "picture": USER_PICTURE,
        "email_verified": true,
        "iat": now,
        "exp": now + TOKEN_LIFETIME_SECS,
    });

    match provider.signing_key.sign(&claims) {
        Ok(id_token) => Json(json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "Bearer",
            "expires_in": TOKEN_LIFETIME_SECS,
            "id_token": id_token,
        }))
        .into_response(),
        Err(e) => {
            error!("Failed to sign ID token: {:?}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to sign ID token").into_response()
        }
    }
}

async fn userinfo() -> Json<Value> {
    Json(json!({
        "sub": SUBJECT,
        "name": USER_NAME,
        "email": USER_EMAIL,
        "picture": USER_PICTURE,
        "email_verified": true,
    }))
}

async fn jwks(State(provider): State<MockProvider>) -> Json<Value> {
    Json(provider.signing_key.jwks().clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
    use tower::ServiceExt;

    const ISSUER: &str = "http://localhost:4000";

    fn app() -> Router {
        MockProvider::new(ISSUER).unwrap().router()
    }

    async fn get_json(app: Router, uri: &str) -> Value {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_discovery_document_points_at_issuer() {
        let document = get_json(app(), "/.well-known/openid-configuration").await;

        assert_eq!(document["issuer"], ISSUER);
        assert_eq!(document["token_endpoint"], format!("{ISSUER}/token"));
        assert_eq!(document["jwks_uri"], format!("{ISSUER}/jwks"));
    }

    #[tokio::test]
    async fn test_authorize_redirects_with_code_and_state() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/authorize?redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fapi%2Fauth%2Fcallback&state=abc")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        let location = response.headers()[header::LOCATION].to_str().unwrap();
        assert_eq!(
            location,
            "http://localhost:3000/api/auth/callback?code=mock-auth-code-123&state=abc"
        );
    }

    #[tokio::test]
    async fn test_authorize_requires_state() {
        let response = app()
            .oneshot(
                Request::builder()
                    .uri("/authorize?redirect_uri=http%3A%2F%2Flocalhost%3A3000%2Fcb")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_id_token_verifies_against_published_key() {
        let provider = MockProvider::new(ISSUER).unwrap();
        let key_set = get_json(provider.clone().router(), "/jwks").await;

        let response = provider
            .router()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let tokens: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(tokens["access_token"], ACCESS_TOKEN);
        assert_eq!(tokens["expires_in"], TOKEN_LIFETIME_SECS);

        let id_token = tokens["id_token"].as_str().unwrap();
        assert_eq!(decode_header(id_token).unwrap().kid.as_deref(), Some(KEY_ID));

        let key = &key_set["keys"][0];
        let decoding_key =
            DecodingKey::from_rsa_components(key["n"].as_str().unwrap(), key["e"].as_str().unwrap())
                .unwrap();
        let mut validation = Validation::new(Algorithm::RS256);
        validation.set_issuer(&[ISSUER]);
        validation.set_audience(&[CLIENT_ID]);
        let claims = decode::<Value>(id_token, &decoding_key, &validation)
            .unwrap()
            .claims;

        assert_eq!(claims["sub"], SUBJECT);
    }

    #[tokio::test]
    async fn test_userinfo_returns_fixed_user() {
        let user = get_json(app(), "/userinfo").await;
        assert_eq!(user["sub"], SUBJECT);
        assert_eq!(user["email"], USER_EMAIL);
    }
}
