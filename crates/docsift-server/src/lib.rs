//! HTTP surface for docsift: PDF upload and similarity query over axum.
//!
//! The [`SearchService`] is built once by the caller and shared with every
//! handler through router state.

mod error;
mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post};
use axum::Router;
use docsift_core::config::ServerConfig;
use docsift_core::SearchService;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::{ApiError, ErrorResponse};
pub use routes::{QueryParams, UploadResponse};

/// Build the router with all routes and layers.
pub fn router(service: Arc<SearchService>, config: &ServerConfig) -> Router {
    let app = Router::new()
        .route("/upload-pdf", post(routes::upload_pdf))
        .route("/query", get(routes::query))
        .route("/documents", get(routes::list_documents))
        .route("/documents/{id}", delete(routes::delete_document))
        .route("/health", get(routes::health))
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .with_state(service)
        .layer(TraceLayer::new_for_http());

    if config.enable_cors {
        app.layer(CorsLayer::permissive())
    } else {
        app
    }
}

/// Bind `config.bind` and serve until `shutdown` resolves.
pub async fn serve<F>(
    service: Arc<SearchService>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(&config.bind)
        .await
        .map_err(|e| ServerError::Bind(config.bind.clone(), e))?;
    serve_listener(listener, service, config, shutdown).await
}

/// Serve on an already bound listener until `shutdown` resolves.
pub async fn serve_listener<F>(
    listener: TcpListener,
    service: Arc<SearchService>,
    config: &ServerConfig,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr: SocketAddr = listener.local_addr().map_err(ServerError::Io)?;
    tracing::info!(%addr, "docsift HTTP server listening");

    axum::serve(listener, router(service, config))
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Io)?;
    tracing::info!("docsift HTTP server stopped");
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {0}: {1}")]
    Bind(String, std::io::Error),
    #[error("server error: {0}")]
    Io(std::io::Error),
}
