use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::error::{HttpError, Result};
use crate::routes::build_router;
use crate::state::AppState;

/// Default listening port.
pub const DEFAULT_PORT: u16 = 8765;

/// Listener configuration. The facade only ever binds loopback.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    /// Total bind attempts before giving up. Zero is treated as one.
    pub bind_retries: u32,
    /// Pause between bind attempts.
    pub retry_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            bind_retries: 3,
            retry_delay: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Bind the listening socket, retrying while the port is busy.
///
/// Whoever holds the port is left alone.
pub async fn bind_with_retries(config: &ServerConfig) -> Result<TcpListener> {
    let addr = config.addr();
    let attempts = config.bind_retries.max(1);
    let mut attempt = 1;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(source) if attempt >= attempts => {
                return Err(HttpError::Bind {
                    addr,
                    attempts,
                    source,
                })
            }
            Err(err) => {
                tracing::warn!(%addr, attempt, attempts, error = %err, "port unavailable, retrying");
                tokio::time::sleep(config.retry_delay).await;
                attempt += 1;
            }
        }
    }
}

/// Serve the facade on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!("HTTP facade listening on http://{addr}");
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    tracing::info!("HTTP facade stopped");
    Ok(())
}

/// Bind with retries, then serve until `shutdown` resolves.
pub async fn run<F>(config: &ServerConfig, state: Arc<AppState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = bind_with_retries(config).await?;
    serve(listener, state, shutdown).await
}
