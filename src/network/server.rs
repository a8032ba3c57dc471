//! HTTP Server
//!
//! Binds the listener and serves the router until Ctrl+C.

use std::sync::Arc;

use axum::routing::{get, post, MethodRouter};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::Config;
use crate::engine::Engine;
use crate::error::{PokedexError, Result};
use crate::protocol::CommandType;

use super::handlers;

/// Build the façade router
///
/// Every route answers both with and without a trailing slash.
pub fn router(engine: Arc<Engine>) -> Router {
    let routes: Vec<(CommandType, MethodRouter<Arc<Engine>>)> = vec![
        (CommandType::LoadDatabase, get(handlers::load_database)),
        (CommandType::GetAll, get(handlers::get_all)),
        (CommandType::PageCount, get(handlers::get_pages_number)),
        (CommandType::IdList, get(handlers::get_id_list)),
        (CommandType::GetList, post(handlers::get_list)),
        (CommandType::Get, get(handlers::get)),
        (CommandType::Post, post(handlers::post)),
        (CommandType::Put, post(handlers::put).put(handlers::put)),
        (CommandType::Delete, get(handlers::delete).delete(handlers::delete)),
        (CommandType::Sort, get(handlers::ordenacao)),
        (CommandType::BuildIndex, get(handlers::indexacao)),
        (CommandType::Zip, get(handlers::zip)),
        (CommandType::Unzip, get(handlers::unzip)),
        (CommandType::Encrypt, get(handlers::encrypt)),
        (CommandType::Decrypt, post(handlers::decrypt)),
        (CommandType::MergeSearch, post(handlers::merge_search)),
        (CommandType::InvertedIndex, post(handlers::inverted_index)),
        (CommandType::ToKatakana, get(handlers::to_katakana)),
    ];

    let mut router = Router::new();
    for (command, method_router) in routes {
        let path = command.route();
        router = router
            .route(path, method_router.clone())
            .route(&format!("{}/", path), method_router);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(engine)
}

/// HTTP server for the Pokédex
pub struct Server {
    config: Config,
    engine: Arc<Engine>,
}

impl Server {
    /// Create a new server with the given config and engine
    pub fn new(config: Config, engine: Arc<Engine>) -> Self {
        Self { config, engine }
    }

    /// Serve until Ctrl+C
    pub async fn run(self) -> Result<()> {
        let addr = &self.config.listen_addr;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| PokedexError::Network(format!("bind {}: {}", addr, e)))?;
        info!(addr = %listener.local_addr()?, "HTTP server listening");

        axum::serve(listener, router(self.engine))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| PokedexError::Network(e.to_string()))?;

        info!("HTTP server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received Ctrl+C, initiating shutdown...");
    }
}
