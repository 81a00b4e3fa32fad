use crate::config::Config;
use crate::images::{parse_file_name, ImageService, ImageStore};
use crate::imagery::{ImageryProvider, ImageryRequest, SentinelHubProvider};
use anyhow::{Context, Result};
use axum::{
    extract::Request,
    http::{header, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

mod error;
pub mod routes_images;
pub mod routes_plugin;

pub use error::AppError;

const GREETING: &str = "Hello world!  Your web application is working!";

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    /// Fetch-and-save and lookup over the image store
    pub images: Arc<ImageService>,
}

impl AppContext {
    /// Build the context from configuration with the given imagery provider.
    pub fn new(config: Config, provider: Arc<dyn ImageryProvider>) -> Result<Self> {
        let store = ImageStore::open(&config.storage.image_dir).with_context(|| {
            format!(
                "Failed to open image store at {:?}",
                config.storage.image_dir
            )
        })?;
        let request = ImageryRequest::from(&config.imagery);
        let images = ImageService::new(provider, Arc::new(store), request);

        Ok(Self {
            config: Arc::new(config),
            images: Arc::new(images),
        })
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    let image_dir = ctx.images.store().base_dir().to_path_buf();

    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .merge(routes_images::image_routes())
        .merge(routes_plugin::plugin_routes())
        .nest_service(routes_images::STATIC_IMAGES_PREFIX, static_images(image_dir))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// File server over the store directory that exposes stored PNGs only.
fn static_images(image_dir: std::path::PathBuf) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(image_dir))
        .layer(middleware::from_fn(only_stored_images))
}

async fn only_stored_images(request: Request, next: Next) -> Response {
    let name = request.uri().path().trim_start_matches('/');
    if parse_file_name(name).is_none() {
        return StatusCode::NOT_FOUND.into_response();
    }
    next.run(request).await
}

async fn index() -> &'static str {
    GREETING
}

async fn health_check() -> impl IntoResponse {
    StatusCode::OK
}

/// Start the HTTP server against Sentinel Hub
pub async fn start_server(config: Config) -> Result<()> {
    let provider = Arc::new(SentinelHubProvider::from_config(&config.imagery));
    start_server_with_provider(config, provider).await
}

/// Start the HTTP server with an explicit imagery provider
pub async fn start_server_with_provider(
    config: Config,
    provider: Arc<dyn ImageryProvider>,
) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    let ctx = AppContext::new(config, provider)?;
    tracing::info!(
        "Storing images in {:?} ({} already present)",
        ctx.images.store().base_dir(),
        ctx.images.store().list().len()
    );

    let app = create_router(ctx);

    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
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
