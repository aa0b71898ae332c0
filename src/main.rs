use domain::authentication::new_provider;
use domain::session::SessionCodec;
use log::*;
use service::{config::Config, logging::Logger};
use std::sync::Arc;
use web::AppState;

#[tokio::main]
async fn main() {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to initialize logger: {e}");
    }

    info!(
        "Starting OIDC relying party [{:?}] for issuer {}",
        config.runtime_env(),
        config.oidc_issuer().as_deref().unwrap_or("<unset>")
    );

    // A missing secret is only tolerated outside production.
    let session_codec = match SessionCodec::from_config(&config) {
        Ok(codec) => codec,
        Err(e) => {
            error!("Refusing to start without SESSION_SECRET in production: {e}");
            std::process::exit(1);
        }
    };

    let provider = match new_provider(&config) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            error!("Failed to build the identity provider client: {e}");
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(config, provider, session_codec);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped: {e}");
        std::process::exit(1);
    }
}
