use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use axum_download::{Download, DownloadConfig, DownloadRequest, FsLocator};

#[derive(Clone)]
struct AppState {
    locator: FsLocator,
    config: Arc<DownloadConfig>,
}

// usage: serve [config.toml]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "axum_download=debug,info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => DownloadConfig::load(&PathBuf::from(path))?,
        None => DownloadConfig::default(),
    };
    tracing::info!(root = %config.root.display(), "serving downloads");

    let state = AppState {
        locator: FsLocator::from_config(&config),
        config: Arc::new(config),
    };

    let router = Router::new()
        .route("/", get(|| async { "Hello, World!" }))
        .route("/download/{*path}", get(download))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn download(
    State(state): State<AppState>,
    Path(path): Path<String>,
    request: DownloadRequest,
) -> Response {
    match Download::locate(&state.locator, &path, request).await {
        Ok(download) => download.with_config(&state.config).into_response(),
        Err(err) => err.into_response(),
    }
}
