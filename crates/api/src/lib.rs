pub mod response;
pub mod routes;

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use common::Result;
use engine::EngineController;
use journal::Journal;

pub use response::ApiResponse;

/// Shared application state injected into every route handler.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<EngineController>,
    /// Durable history. Journal-backed routes answer 503 without it.
    pub journal: Option<Journal>,
}

/// The full HTTP surface with state applied.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_headers(Any)
        .allow_methods(Any);

    Router::new()
        .merge(routes::engine_router())
        .merge(routes::logs_router())
        .merge(routes::health_router())
        .with_state(state)
        .layer(cors)
}

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve<F>(state: AppState, addr: SocketAddr, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "Engine API listening");
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("Engine API stopped");
    Ok(())
}
