//! Aurora personality-test service - entry point.
//!
//! Loads an optional config file, applies environment overrides and starts
//! the HTTP server.
//!
//! # Environment variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AURORA_CONFIG` | *(none)* | Path to a TOML/YAML/JSON config file. |
//! | `AURORA_PORT` | `3000` | TCP port to listen on. |
//! | `AURORA_DATA_DIR` | `data` | Root of the JSON document store. |
//! | `AURORA_STATIC_DIR` | `public` | Pages and assets. |
//! | `AURORA_PRODUCTION` | `false` | Forces `Secure` cookies. |
//! | `AURORA_SESSION_SECRET` | *(random)* | Session signing key. |
//! | `AURORA_ADMIN_PASSWORD` | *(none)* | Enables the admin panel. |
//! | `OPENAI_API_KEY` | *(none)* | Enables AI features. |
//! | `OPENAI_BASE_URL` | `https://api.openai.com/v1` | OpenAI-compatible endpoint. |
//! | `AURORA_LOG_JSON` | *(unset)* | Emit logs as JSON lines. |

use aurora_gateway::server::{GatewayServer, ServerConfig};
use aurora_kernel::config::load_config;
use eyre::WrapErr;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn apply_env(config: &mut ServerConfig) -> eyre::Result<()> {
    if let Some(port) = env("AURORA_PORT") {
        config.port = port
            .parse()
            .wrap_err_with(|| format!("AURORA_PORT '{port}' is not a port number"))?;
    }
    if let Some(dir) = env("AURORA_DATA_DIR") {
        config.data_dir = dir.into();
    }
    if let Some(dir) = env("AURORA_STATIC_DIR") {
        config.static_dir = dir.into();
    }
    if let Some(flag) = env("AURORA_PRODUCTION") {
        config.production = matches!(flag.as_str(), "1" | "true" | "yes");
    }
    if let Some(secret) = env("AURORA_SESSION_SECRET") {
        config.session_secret = Some(secret);
    }
    if let Some(password) = env("AURORA_ADMIN_PASSWORD") {
        config.admin_password = Some(password);
    }
    if let Some(key) = env("OPENAI_API_KEY") {
        config.ai.api_key = Some(key);
    }
    if let Some(url) = env("OPENAI_BASE_URL") {
        config.ai.base_url = url;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("aurora_gateway=info,tower_http=info"));
    if env("AURORA_LOG_JSON").is_some() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    let mut config = match env("AURORA_CONFIG") {
        Some(path) => load_config::<ServerConfig>(&path)
            .wrap_err_with(|| format!("failed to load config from {path}"))?,
        None => ServerConfig::default(),
    };
    apply_env(&mut config)?;

    info!(
        port = config.port,
        data_dir = %config.data_dir.display(),
        static_dir = %config.static_dir.display(),
        "Aurora configuration loaded"
    );

    let server = GatewayServer::from_config(config)
        .await
        .wrap_err("failed to initialise server")?;
    server.start().await.wrap_err("server stopped with an error")?;
    Ok(())
}
