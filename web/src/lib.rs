use axum::http::{header::CONTENT_TYPE, HeaderValue, Method};
use domain::session::SessionCodec;
use domain::IdentityProvider;
use log::*;
use middleware::route_guard::ProtectedPaths;
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
mod cookies;
mod error;
mod extractors;
mod middleware;
mod router;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};
pub use router::define_routes;

/// Everything a request handler needs, cloned into every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    provider: Arc<dyn IdentityProvider>,
    session_codec: SessionCodec,
    protected_paths: ProtectedPaths,
}

impl AppState {
    pub fn new(
        config: Config,
        provider: Arc<dyn IdentityProvider>,
        session_codec: SessionCodec,
    ) -> Self {
        let protected_paths = ProtectedPaths::new(config.protected_path_prefixes.clone());
        Self {
            config,
            provider,
            session_codec,
            protected_paths,
        }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    pub fn session_codec(&self) -> &SessionCodec {
        &self.session_codec
    }

    pub(crate) fn protected_paths(&self) -> &ProtectedPaths {
        &self.protected_paths
    }

    /// Cookies carry the `Secure` attribute only in production.
    pub(crate) fn secure_cookies(&self) -> bool {
        self.config.is_production()
    }
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let interface = app_state
        .config
        .interface
        .clone()
        .unwrap_or_else(|| "127.0.0.1".to_string());
    let host = format!("{}:{}", interface, app_state.config.port);

    info!("Server starting... listening for connections on http://{host}");

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();
    debug!("allowed_origins: {:#?}", allowed_origins);

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([CONTENT_TYPE])
        .allow_origin(allowed_origins);

    let listener = TcpListener::bind(host).await?;
    axum::serve(listener, router::define_routes(app_state).layer(cors_layer)).await
}
