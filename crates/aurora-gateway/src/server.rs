//! Axum-based HTTP server.
//!
//! [`GatewayServer`] wires the admission gateway, the `/api` handlers and the
//! static page directory into one running axum service.
//!
//! # Layout
//!
//! | Path | Served by |
//! |------|-----------|
//! | `/api/*` and `/api/v1/*` | [`crate::handlers::api_router`] |
//! | everything else | files under `static_dir` |
//!
//! Every request passes the admission pipeline first, so a versioned API
//! path is rewritten before routing and locale redirects happen before a
//! page is looked up.

use crate::admission::AdmissionGateway;
use crate::auth::PasswordAuthorizer;
use crate::backend::{AiSettings, ProviderSlot};
use crate::handlers;
use crate::session::resolve_secret;
use crate::state::AppState;
use crate::store::{FileJsonStore, KEY_AI_CONFIG};
use aurora_kernel::gateway::{AdmissionConfig, GatewayError};
use aurora_kernel::llm::ProviderError;
use aurora_kernel::storage::{JsonStore, StoreError};
use axum::Router;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{info, warn};

// ─────────────────────────────────────────────────────────────────────────────
// ServerConfig
// ─────────────────────────────────────────────────────────────────────────────

/// Runtime configuration for [`GatewayServer`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    /// TCP port to listen on (default: 3000).
    pub port: u16,
    /// Pages and assets served outside `/api`.
    pub static_dir: PathBuf,
    /// Root of the JSON document store.
    pub data_dir: PathBuf,
    /// Forces `Secure` on every cookie.
    pub production: bool,
    /// Signing key for session tokens. When unset a random per-process key is
    /// used and sessions do not survive a restart.
    #[serde(skip_serializing)]
    pub session_secret: Option<String>,
    /// Enables the admin panel.
    #[serde(skip_serializing)]
    pub admin_password: Option<String>,
    pub ai: AiSettings,
    pub admission: AdmissionConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: PathBuf::from("public"),
            data_dir: PathBuf::from("data"),
            production: false,
            session_secret: None,
            admin_password: None,
            ai: AiSettings::default(),
            admission: AdmissionConfig::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid admission config: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("server I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

// ─────────────────────────────────────────────────────────────────────────────
// GatewayServer
// ─────────────────────────────────────────────────────────────────────────────

pub struct GatewayServer {
    config: ServerConfig,
    state: Arc<AppState>,
    gateway: Arc<AdmissionGateway>,
}

impl GatewayServer {
    /// Assemble the service over an already opened store.
    pub fn new(mut config: ServerConfig, store: Arc<dyn JsonStore>) -> Result<Self, ServerError> {
        if config.production {
            config.admission.session.secure_cookie = true;
        }
        let secret = resolve_secret(config.session_secret.as_deref());
        let gateway = Arc::new(AdmissionGateway::new(
            config.admission.clone(),
            secret.clone(),
        )?);

        let state = Arc::new(AppState::new(
            store,
            Arc::new(ProviderSlot::from_settings(config.ai.clone())),
            Arc::new(PasswordAuthorizer::new(
                config.admin_password.as_deref(),
                secret,
            )),
            config.admission.locale.clone(),
            config.admission.session.secure_cookie,
        ));

        Ok(Self {
            config,
            state,
            gateway,
        })
    }

    /// Open the file store under `data_dir` and apply AI settings saved from
    /// the admin panel. The API key always comes from `config`.
    pub async fn from_config(mut config: ServerConfig) -> Result<Self, ServerError> {
        let store = Arc::new(FileJsonStore::open(&config.data_dir).await?);
        if let Some(saved) = store.read(KEY_AI_CONFIG).await? {
            match serde_json::from_value::<AiSettings>(saved) {
                Ok(mut settings) => {
                    settings.api_key = config.ai.api_key.take();
                    info!(model = %settings.model, "loaded saved AI settings");
                    config.ai = settings;
                }
                Err(e) => warn!(error = %e, "ignoring unreadable saved AI settings"),
            }
        }
        Self::new(config, store)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn gateway(&self) -> &Arc<AdmissionGateway> {
        &self.gateway
    }

    /// The complete service: admission in front of the API and static pages.
    pub fn router(&self) -> Router {
        let inner = handlers::api_router()
            .fallback_service(ServeDir::new(&self.config.static_dir))
            .with_state(self.state.clone());
        self.gateway
            .clone()
            .wrap(inner)
            .layer(TraceLayer::new_for_http())
    }

    /// Start the rate-limit sweeper, bind `host:port` and serve until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        let sweep_every = Duration::from_secs(self.config.admission.rate_limit.sweep_interval_secs);
        let sweeper = self.gateway.limiter().clone().spawn_sweeper(sweep_every);

        let app = self.router();
        let addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        info!(
            addr = %addr,
            production = self.config.production,
            ai_configured = self.state.ai.provider().is_configured(),
            admin_enabled = self.state.admin.is_configured(),
            "Aurora gateway listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!(error = %e, "failed to listen for shutdown signal");
                }
            })
            .await?;
        sweeper.abort();
        info!("Aurora gateway stopped");
        Ok(())
    }
}
