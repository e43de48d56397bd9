use async_trait::async_trait;
use futures::TryStreamExt;
use ngrok::config::HttpTunnelBuilder;
use ngrok::prelude::*;
use ngrok::session::SessionBuilder;
use ngrok::tunnel::HttpTunnel;
use ngrok::Session;
use tracing::debug;

use super::{Connection, Listener};
use crate::errors::AppError;

/// Everything needed to open an ngrok HTTP endpoint.
#[derive(Clone, PartialEq, Eq)]
pub struct RelayOptions {
    pub token: String,
    /// Region code such as `us`, `eu` or `ap`
    pub region: Option<String>,
    /// Reserved domain to serve on instead of a random one
    pub domain: Option<String>,
}

// Keeps the token out of logs
impl std::fmt::Debug for RelayOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayOptions")
            .field("token", &"<redacted>")
            .field("region", &self.region)
            .field("domain", &self.domain)
            .finish()
    }
}

impl RelayOptions {
    /// Ingress address for the configured region, if any.
    pub fn server_addr(&self) -> Option<String> {
        self.region
            .as_deref()
            .map(|region| format!("connect.{region}.ngrok-agent.com:443"))
    }
}

pub struct RelayListener {
    // The tunnel dies with its session
    _session: Session,
    tunnel: HttpTunnel,
    url: String,
}

impl RelayListener {
    pub async fn connect(options: &RelayOptions) -> Result<Self, AppError> {
        let session = session_builder(options)
            .connect()
            .await
            .map_err(AppError::relay)?;
        let tunnel = endpoint_builder(&session, options)
            .listen()
            .await
            .map_err(AppError::relay)?;
        let url = tunnel.url().to_string();

        Ok(Self {
            _session: session,
            tunnel,
            url,
        })
    }
}

fn session_builder(options: &RelayOptions) -> SessionBuilder {
    let mut builder = Session::builder().authtoken(options.token.clone());
    if let Some(server_addr) = options.server_addr() {
        debug!("Using ngrok ingress {server_addr}");
        builder = builder.server_addr(server_addr);
    }
    builder
}

fn endpoint_builder(session: &Session, options: &RelayOptions) -> HttpTunnelBuilder {
    let mut endpoint = session.http_endpoint();
    if let Some(domain) = &options.domain {
        endpoint = endpoint.domain(domain.clone());
    }
    endpoint
}

#[async_trait]
impl Listener for RelayListener {
    async fn accept(&mut self) -> Result<Connection, AppError> {
        match self.tunnel.try_next().await {
            Ok(Some(conn)) => Ok(Box::new(conn)),
            Ok(None) => Err(AppError::RelayClosed("session ended".into())),
            Err(e) => Err(AppError::RelayClosed(e.to_string())),
        }
    }

    fn url(&self) -> String {
        self.url.clone()
    }
}
