use clap::Parser;
use log::*;
use mock_provider::MockProvider;
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Mock OpenID Connect provider for local development.
#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on.
    #[arg(short, long, env = "MOCK_PROVIDER_PORT", default_value_t = 4000)]
    port: u16,

    /// Issuer identifier advertised in discovery and ID tokens.
    /// Defaults to http://localhost:<port>.
    #[arg(long, env = "MOCK_PROVIDER_ISSUER")]
    issuer: Option<String>,

    #[arg(long, default_value_t = LevelFilter::Info)]
    log_level: LevelFilter,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    TermLogger::init(
        args.log_level,
        ConfigBuilder::new().build(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )?;

    let issuer = args
        .issuer
        .unwrap_or_else(|| format!("http://localhost:{}", args.port));
    let provider = MockProvider::new(&issuer)?;

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", args.port)).await?;
    info!("Mock OIDC provider running at {}", provider.issuer());

    axum::serve(listener, provider.router()).await?;
    Ok(())
}
