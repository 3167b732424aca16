use crate::config::Config;
use crate::hub::HubHandle;
use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use brakewatch_common::paths::ExtensionMatcher;
use brakewatch_common::Error;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};

pub mod routes_files;
pub mod routes_queue;
pub mod routes_status;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub hub: HubHandle,
    pub config: Arc<Config>,
    /// Extension set shared with the watcher
    pub matcher: Arc<ExtensionMatcher>,
}

impl AppContext {
    pub fn new(hub: HubHandle, config: Config) -> Self {
        let matcher = Arc::new(config.watch.matcher());
        Self {
            hub,
            config: Arc::new(config),
            matcher,
        }
    }
}

/// Map a library error to the status/body pair returned by handlers.
pub(crate) fn error_response(e: Error) -> (StatusCode, String) {
    let status =
        StatusCode::from_u16(e.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, e.to_string())
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let mut app = Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx);

    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {}", dir.display());
            app = app
                .nest_service("/static", ServeDir::new(&dir))
                .route_service("/", ServeFile::new(dir.join("index.html")));
        } else {
            tracing::warn!("Static directory does not exist: {}", dir.display());
        }
    }

    app
}

fn api_routes() -> Router<AppContext> {
    routes_queue::queue_routes()
        .merge(routes_status::status_routes())
        .merge(routes_files::files_routes())
}

async fn health_check(State(ctx): State<AppContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "subscribers": ctx.hub.connection_count().await,
    }))
}

/// Start the HTTP server and run until a shutdown signal arrives
pub async fn start_server(ctx: AppContext) -> Result<()> {
    let server = &ctx.config.server;
    let addr: SocketAddr = format!("{}:{}", server.host, server.port)
        .parse()
        .context("Invalid server address")?;
    let static_dir = Some(server.static_dir.clone());

    let app = create_router(ctx, static_dir);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
