//! JSON web API over hyper.

pub mod error;
pub mod handlers;
pub mod response;
pub mod router;
pub mod server;

use std::sync::Arc;

use parking_lot::Mutex;

use crate::cache::ConnectionCache;
use crate::catalog::Catalog;
use crate::config::ServerConfig;
use crate::raster::Rasterizer;

pub use error::ApiError;
pub use router::Router;
pub use server::Server;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Open database connections by connection id
    pub connections: Arc<Mutex<ConnectionCache<Arc<Catalog>>>>,
    pub rasterizer: Arc<Rasterizer>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            connections: Arc::new(Mutex::new(ConnectionCache::new(config.connection_ttl))),
            rasterizer: Arc::new(Rasterizer::new()),
            config: Arc::new(config),
        }
    }
}
