//! Hyper server setup and the connection sweeper.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use http_body_util::Full;
use hyper::body::{Bytes, Incoming as IncomingBody};
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnectionBuilder;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use super::AppState;
use super::router::Router;
use crate::catalog::Catalog;

/// HTTP server for the diagram API.
pub struct Server {
    addr: SocketAddr,
    router: Arc<Router>,
}

impl Server {
    /// Binds to the address in the router's configuration.
    pub fn new(router: Router) -> Self {
        Self {
            addr: router.state().config.addr,
            router: Arc::new(router),
        }
    }

    /// Accepts connections until `shutdown` resolves. The connection sweeper
    /// runs for the lifetime of the server and closes every cached
    /// connection on the way out.
    pub async fn serve(self, shutdown: impl Future<Output = ()>) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "server listening");

        let state = self.router.state().clone();
        let sweeper = spawn_sweeper(state.clone());
        tokio::pin!(shutdown);

        loop {
            let (stream, peer) = tokio::select! {
                accepted = listener.accept() => accepted?,
                () = &mut shutdown => break,
            };
            let io = TokioIo::new(stream);
            let router = Arc::clone(&self.router);

            tokio::task::spawn(async move {
                let builder = ConnectionBuilder::new(TokioExecutor::new());
                if let Err(err) = builder
                    .serve_connection(
                        io,
                        hyper::service::service_fn(move |req| handle_request(req, router.clone())),
                    )
                    .await
                {
                    tracing::warn!(%peer, error = %err, "error serving connection");
                }
            });
        }

        tracing::info!("shutting down");
        sweeper.abort();
        close_all(&state).await;
        Ok(())
    }
}

async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    Ok(router.route(req).await.map(Full::new))
}

/// Periodically evicts expired connections and closes their pools.
pub fn spawn_sweeper(state: AppState) -> JoinHandle<()> {
    let period = state.config.sweep_interval;
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep(&state).await;
        }
    })
}

/// One eviction pass. Returns the number of connections evicted.
pub async fn sweep(state: &AppState) -> usize {
    let expired = state.connections.lock().evict(Instant::now());
    let count = expired.len();
    for (id, catalog) in expired {
        release(&id, catalog).await;
    }
    count
}

async fn close_all(state: &AppState) {
    let open = state.connections.lock().drain();
    for (id, catalog) in open {
        release(&id, catalog).await;
    }
}

/// Close a catalog the cache no longer holds. A request still using it
/// keeps the pools alive; they are dropped with its last handle.
async fn release(id: &str, catalog: Arc<Catalog>) {
    match Arc::try_unwrap(catalog) {
        Ok(catalog) => {
            catalog.close().await;
            tracing::info!(connection_id = %id, "closed connection");
        }
        Err(_) => {
            tracing::info!(connection_id = %id, "connection evicted while in use");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;

    #[test]
    fn test_server_binds_configured_addr() {
        let addr = SocketAddr::from(([0, 0, 0, 0], 8089));
        let state = AppState::new(ServerConfig {
            addr,
            ..ServerConfig::default()
        });
        let server = Server::new(Router::new(state));
        assert_eq!(server.addr, addr);
    }
}
