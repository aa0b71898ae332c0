use clap::Parser;
use dotenvy::dotenv;
use log::{warn, LevelFilter};
use secrecy::SecretString;
use std::fmt;
use std::str::FromStr;

/// Name of the cookie that carries the signed session token.
pub const SESSION_COOKIE_NAME: &str = "oidc_session";

/// Name of the transient cookie holding the login attempt's `state` value.
pub const STATE_COOKIE_NAME: &str = "oidc_state";

/// Name of the transient cookie holding the login attempt's PKCE code verifier.
pub const CODE_VERIFIER_COOKIE_NAME: &str = "oidc_code_verifier";

/// Lifetime of the transient login cookies (10 minutes).
pub const AUTHORIZATION_CONTEXT_MAX_AGE_SECS: i64 = 60 * 10;

// Only ever handed out outside of production, see `Config::session_secret`.
const DEVELOPMENT_SESSION_SECRET: &str = "default-secret-change-this-for-development-only";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl fmt::Display for RustEnvParseError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "expected one of: development, production, staging")
    }
}

impl std::error::Error for RustEnvParseError {}

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

/// Configuration problems that must stop the caller from going any further.
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// No session signing secret was configured while running in production.
    MissingSessionSecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ConfigError::MissingSessionSecret => {
                write!(f, "SESSION_SECRET environment variable is required in production")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// Issuer identifier of the OpenID Connect provider (its discovery document
    /// lives under `/.well-known/openid-configuration`).
    #[arg(long, env)]
    oidc_issuer: Option<String>,

    /// The client ID registered with the OpenID Connect provider.
    #[arg(long, env)]
    oidc_client_id: Option<String>,

    /// The client secret registered with the OpenID Connect provider.
    #[arg(long, env, hide_env_values = true)]
    oidc_client_secret: Option<String>,

    /// The redirect URI the provider sends the user back to after login.
    #[arg(long, env)]
    oidc_redirect_uri: Option<String>,

    /// Timeout in seconds for every call made to the OpenID Connect provider
    #[arg(long, env, default_value_t = 30)]
    pub oidc_http_timeout_secs: u64,

    /// Secret used to sign session tokens. Required when running in production.
    #[arg(long, env, hide_env_values = true)]
    session_secret: Option<String>,

    /// Path prefixes that require a valid session, checked in order.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "/dashboard,/products"
    )]
    pub protected_path_prefixes: Vec<String>,

    /// Directory of static assets served for any path no route matches
    #[arg(long, env, default_value = "public")]
    pub static_dir: String,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 3000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(short, long, env, default_value_t = LevelFilter::Info)]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(short, long, env, default_value_t = RustEnv::Development)]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn oidc_issuer(&self) -> Option<String> {
        self.oidc_issuer.clone()
    }

    pub fn set_oidc_issuer(mut self, issuer: String) -> Self {
        self.oidc_issuer = Some(issuer);
        self
    }

    pub fn oidc_client_id(&self) -> Option<String> {
        self.oidc_client_id.clone()
    }

    pub fn set_oidc_client_id(mut self, client_id: String) -> Self {
        self.oidc_client_id = Some(client_id);
        self
    }

    pub fn oidc_client_secret(&self) -> Option<String> {
        self.oidc_client_secret.clone()
    }

    pub fn set_oidc_client_secret(mut self, client_secret: String) -> Self {
        self.oidc_client_secret = Some(client_secret);
        self
    }

    pub fn oidc_redirect_uri(&self) -> Option<String> {
        self.oidc_redirect_uri.clone()
    }

    pub fn set_oidc_redirect_uri(mut self, redirect_uri: String) -> Self {
        self.oidc_redirect_uri = Some(redirect_uri);
        self
    }

    pub fn set_session_secret(mut self, secret: String) -> Self {
        self.session_secret = Some(secret);
        self
    }

    pub fn set_runtime_env(mut self, runtime_env: RustEnv) -> Self {
        self.runtime_env = runtime_env;
        self
    }

    /// Returns the secret used to sign session tokens.
    ///
    /// Outside of production an unset (or blank) secret falls back to a fixed,
    /// publicly known value and logs a warning. In production the same situation
    /// is an error.
    pub fn session_secret(&self) -> Result<SecretString, ConfigError> {
        match self.session_secret.as_deref().map(str::trim) {
            Some(secret) if !secret.is_empty() => Ok(SecretString::new(secret.to_string())),
            _ if self.is_production() => Err(ConfigError::MissingSessionSecret),
            _ => {
                warn!("SESSION_SECRET not set. Using default for development only.");
                Ok(SecretString::new(DEVELOPMENT_SESSION_SECRET.to_string()))
            }
        }
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
