//! Web server for the chat relay.

use std::net::SocketAddr;

use tokio::net::TcpListener;

use crate::chat::Relay;
use crate::config::ServerConfig;
use crate::{ChatError, Result};

use super::router::create_router;

/// Web server exposing the relay.
pub struct WebServer {
    /// Server address.
    addr: SocketAddr,
    /// The room relay shared by every connection.
    relay: Relay,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &ServerConfig, relay: Relay) -> Result<Self> {
        let bind_addr = config.bind_addr();
        let addr = bind_addr
            .parse()
            .map_err(|e| ChatError::Config(format!("invalid server address {bind_addr}: {e}")))?;
        Ok(Self { addr, relay })
    }

    /// Get the server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    async fn bind(&self) -> Result<(TcpListener, SocketAddr)> {
        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;
        tracing::info!("Chat server listening on ws://{}/ws", local_addr);
        Ok((listener, local_addr))
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> Result<()> {
        let (listener, _) = self.bind().await?;
        axum::serve(listener, create_router(self.relay)).await?;
        Ok(())
    }

    /// Run the server in the background and return the actual bound address.
    ///
    /// This is useful for testing when binding to port 0.
    pub async fn run_with_addr(self) -> Result<SocketAddr> {
        let (listener, local_addr) = self.bind().await?;
        let router = create_router(self.relay);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!("Web server error: {}", e);
            }
        });

        Ok(local_addr)
    }
}
