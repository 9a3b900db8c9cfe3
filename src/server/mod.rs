use crate::config::Config;
use crate::pipeline::{Pipeline, HLS_MOUNT};
use crate::reaper::start_reaper_task;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, Method, Request, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use hlsforge_av::FfmpegEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod auth;
mod error;
pub mod routes_hls;
pub mod routes_upload;

pub use error::{AppError, BASIC_REALM};

/// Room for multipart boundaries, part headers and small form fields on top
/// of the file itself. A request whose non-file fields outgrow this hits the
/// body limit and is answered as an oversized upload.
const MULTIPART_OVERHEAD_BYTES: u64 = 64 * 1024;

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub pipeline: Arc<Pipeline>,
    /// Cancelled when the server shuts down; in-flight transcodes derive
    /// child tokens from it.
    pub shutdown: CancellationToken,
}

impl AppContext {
    pub fn new(config: Arc<Config>, pipeline: Arc<Pipeline>) -> Self {
        Self {
            config,
            pipeline,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let body_limit = ctx
        .config
        .storage
        .max_upload_bytes
        .saturating_add(MULTIPART_OVERHEAD_BYTES);
    let body_limit = usize::try_from(body_limit).unwrap_or(usize::MAX);

    let upload = post(routes_upload::upload)
        .route_layer(middleware::from_fn_with_state(
            ctx.clone(),
            auth::basic_auth_middleware,
        ))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .route("/health", get(health_check))
        .route("/upload", upload)
        .route(&format!("{HLS_MOUNT}/*path"), get(routes_hls::serve_artifact))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(preflight))
        .with_state(ctx)
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Answer every `OPTIONS` request with `204 No Content`, keeping whatever
/// CORS headers the inner layers attached.
async fn preflight(request: Request<Body>, next: Next) -> Response {
    if request.method() != Method::OPTIONS {
        return next.run(request).await;
    }

    let (mut parts, _) = next.run(request).await.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    parts.headers.remove(header::CONTENT_TYPE);
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::empty())
}

/// Start the HTTP server
pub async fn start_server(config: Config) -> Result<()> {
    if config.server.auth.password_hash.is_none() {
        anyhow::bail!(
            "server.auth.password_hash is not set; generate one with `hlsforge hash-password`"
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;

    tokio::fs::create_dir_all(&config.storage.root)
        .await
        .with_context(|| format!("Failed to create storage root {:?}", config.storage.root))?;

    let engine = FfmpegEngine::discover(config.transcode.ffmpeg_path.as_deref())
        .context("ffmpeg is required to run the server")?;
    tracing::info!("Using ffmpeg at {:?}", engine.program());

    let config = Arc::new(config);
    let pipeline = Arc::new(Pipeline::from_config(&config, Arc::new(engine)));
    let in_flight = pipeline.in_flight().clone();
    let ctx = AppContext::new(config.clone(), pipeline);
    let shutdown = ctx.shutdown.clone();

    let reaper = config.reaper.enabled.then(|| {
        start_reaper_task(
            config.storage.root.clone(),
            config.reaper.interval(),
            config.reaper.grace(),
            in_flight,
            shutdown.clone(),
        )
    });

    let app = create_router(ctx);

    tracing::info!(
        storage = %config.storage.root.display(),
        max_jobs = config.transcode.max_concurrent_jobs,
        "Starting server on {}",
        addr
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            shutdown.cancel();
        })
        .await?;

    if let Some(handle) = reaper {
        let _ = handle.await;
    }

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
