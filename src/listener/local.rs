use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::TcpListener;
use tracing::{debug, warn};

use super::{Connection, Listener};
use crate::errors::AppError;

// Keeps a persistent accept error (e.g. out of file descriptors) from spinning
const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(50);

pub struct LocalListener {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl LocalListener {
    pub async fn bind(host: &str, port: u16) -> Result<Self, AppError> {
        let addr = format!("{host}:{port}");
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| AppError::Bind {
                addr: addr.clone(),
                source,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Listener for LocalListener {
    async fn accept(&mut self) -> Result<Connection, AppError> {
        loop {
            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    debug!("Accepted connection from {peer}");
                    return Ok(Box::new(stream));
                }
                Err(e) => {
                    warn!("Failed to accept connection: {e}");
                    tokio::time::sleep(ACCEPT_RETRY_DELAY).await;
                }
            }
        }
    }

    fn url(&self) -> String {
        format!("http://{}", self.local_addr)
    }
}
