//! HTTP surface for lfv.
//!
//! A thin axum layer over [`lfv_kernel`]: every handler resolves its path
//! through the shared [`Sandbox`] and maps kernel errors to JSON responses.

pub mod error;
mod routes;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::http::{HeaderValue, Method, Uri};
use axum::routing::{get, post};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use lfv_kernel::{Config, ConfigError, DirectoryTree, Sandbox, SearchEngine};

pub use error::ApiError;

/// Shared handles, one of each per process.
pub struct AppState {
    pub sandbox: Arc<Sandbox>,
    pub tree: Arc<DirectoryTree>,
    pub search: Arc<SearchEngine>,
    pub(crate) cursor: tokio::sync::broadcast::Sender<routes::cursor::CursorMove>,
}

impl AppState {
    /// Build the sandbox, tree and search engine from configuration.
    pub fn new(config: &Config) -> Result<Self, ConfigError> {
        let sandbox = Arc::new(config.sandbox.build()?);
        Ok(Self::from_sandbox(sandbox, config))
    }

    pub fn from_sandbox(sandbox: Arc<Sandbox>, config: &Config) -> Self {
        let tree = Arc::new(DirectoryTree::new(config.tree.clone()));
        let search = Arc::new(SearchEngine::new(
            Arc::clone(&sandbox),
            Arc::clone(&tree),
            config.search.clone(),
        ));
        Self {
            sandbox,
            tree,
            search,
            cursor: routes::cursor::channel(),
        }
    }
}

/// All routes, with tracing and CORS layers.
pub fn router(state: Arc<AppState>, bind_addr: &SocketAddr) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/tree", get(routes::tree::get_tree))
        .route("/api/file-content", get(routes::content::get_file_content))
        .route("/serve/{*file}", get(routes::content::serve_file))
        .route("/api/new-base-dir-search", get(routes::base_dir::search_base_dir))
        .route("/api/new-base-dir", post(routes::base_dir::set_base_dir))
        .route("/api/file-search", get(routes::search::file_search))
        .route("/api/file-watcher", get(routes::watcher::file_watcher))
        .route(
            "/api/cursor-watcher",
            get(routes::cursor::cursor_events).post(routes::cursor::move_cursor),
        )
        .layer(build_cors_layer(bind_addr))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn serve(state: Arc<AppState>, bind_addr: SocketAddr) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let local_addr = listener.local_addr()?;
    let app = router(state, &local_addr);

    tracing::info!("lfv listening on http://{}", local_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

async fn health_check() -> &'static str {
    "OK"
}

/// Loopback binds only accept loopback origins; anything else allows any
/// origin, since the operator chose to expose the server.
fn build_cors_layer(bind_addr: &SocketAddr) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(AllowMethods::list([Method::GET, Method::POST, Method::OPTIONS]))
        .allow_headers(AllowHeaders::list([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::CACHE_CONTROL,
        ]));

    if bind_addr.ip().is_loopback() {
        layer.allow_origin(AllowOrigin::predicate(
            |origin: &HeaderValue, _req: &axum::http::request::Parts| {
                origin.to_str().is_ok_and(is_loopback_origin)
            },
        ))
    } else {
        layer.allow_origin(AllowOrigin::any())
    }
}

/// `http(s)://` origin whose host is exactly a loopback name.
fn is_loopback_origin(origin: &str) -> bool {
    let Ok(uri) = origin.parse::<Uri>() else {
        return false;
    };
    let scheme_ok = matches!(uri.scheme_str(), Some("http" | "https"));
    let host = uri.host().map(str::to_ascii_lowercase);
    scheme_ok && matches!(host.as_deref(), Some("localhost" | "127.0.0.1" | "[::1]"))
}
