// Static file server for the snapshot and map page
// Serves the snapshot directory as-is; every request reads the file from disk

use axum::http::{header, HeaderValue};
use axum::Router;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::services::ServeDir;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::error::ServerError;

/// Router serving `root`. Responses carry `Cache-Control: no-store` so the
/// map page always polls a fresh snapshot.
pub fn router(root: &Path) -> Router {
    Router::new()
        .fallback_service(ServeDir::new(root))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(TraceLayer::new_for_http())
}

/// Bind the HTTP port on all interfaces.
pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Serve `root` on `listener` until `shutdown` turns true.
pub async fn serve(
    listener: TcpListener,
    root: &Path,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), ServerError> {
    if let Ok(addr) = listener.local_addr() {
        info!("HTTP server on {} serving {}", addr, root.display());
    }
    axum::serve(listener, router(root))
        .with_graceful_shutdown(async move {
            let _ = shutdown.wait_for(|stop| *stop).await;
        })
        .await
        .map_err(ServerError::Serve)
}

/// Open `url` in the default browser without blocking the runtime.
pub async fn open_browser(url: String) {
    let result = tokio::task::spawn_blocking(move || webbrowser::open(&url).map(|_| url)).await;
    match result {
        Ok(Ok(url)) => info!("Opened {} in browser", url),
        Ok(Err(e)) => warn!("Failed to open browser: {}", e),
        Err(e) => warn!("Browser task failed: {}", e),
    }
}
