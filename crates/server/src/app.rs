//! Router assembly and the HTTP server

use crate::dashboard::{dashboard, templates};
use crate::error::Result;
use crate::routes::{chain_router, health, root};
use axum::{
    http::{self, Method},
    routing::get,
    Router,
};
use clap::Args;
use minijinja::Environment;
use sec_graphrag_agents::ChainRegistry;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ServerConfig {
    /// Address to serve the API and dashboard on
    #[arg(long, env = "SERVER_ADDRESS", default_value = "0.0.0.0:8080")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Shared, read-only handler state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ChainRegistry>,
    pub templates: Arc<Environment<'static>>,
}

impl AppState {
    pub fn new(registry: Arc<ChainRegistry>) -> Result<Self> {
        Ok(Self {
            registry,
            templates: Arc::new(templates()?),
        })
    }
}

pub struct AppBuilder {
    pub app: Router,
}

impl AppBuilder {
    pub fn new(registry: Arc<ChainRegistry>) -> Result<Self> {
        let state = AppState::new(registry)?;

        let mut app: Router<AppState> = Router::new()
            .route("/", get(root))
            .route("/health", get(health))
            .route("/dashboard", get(dashboard))
            .route("/dashboard/", get(dashboard));

        for path in state.registry.paths() {
            if let Some(chain) = state.registry.get(&path) {
                app = app.nest(&path, chain_router(chain));
            }
        }

        Ok(Self {
            app: app.with_state(state),
        })
    }

    pub fn with_trace_layer(self) -> Self {
        Self {
            app: self.app.layer(TraceLayer::new_for_http()),
        }
    }

    pub fn with_cors_layer(self) -> Self {
        let cors_layer = if cfg!(debug_assertions) {
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST])
                .allow_headers([http::header::CONTENT_TYPE])
                .allow_origin(AllowOrigin::any())
        };
        Self {
            app: self.app.layer(cors_layer),
        }
    }

    pub fn build(self) -> Router {
        self.app
    }
}

pub struct Server {
    config: ServerConfig,
    registry: Arc<ChainRegistry>,
}

impl Server {
    pub fn new(config: ServerConfig, registry: ChainRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    /// Bind the configured address and serve until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        let app = AppBuilder::new(self.registry.clone())?
            .with_trace_layer()
            .with_cors_layer()
            .build();

        let listener = TcpListener::bind(&self.config.address).await?;
        Self::serve(listener, app).await
    }

    pub async fn serve(listener: TcpListener, app: Router) -> Result<()> {
        info!("Listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
            })
            .await?;
        Ok(())
    }
}
