use std::convert::Infallible;
use std::time::Duration;

use async_trait::async_trait;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::catcher::Catcher;
use crate::errors::AppError;

pub mod local;
pub mod relay;

pub use local::LocalListener;
pub use relay::{RelayListener, RelayOptions};

/// How long open connections get to finish their requests on shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

pub trait Io: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> Io for T {}

/// One accepted byte stream, ready to speak HTTP.
pub type Connection = Box<dyn Io>;

#[async_trait]
pub trait Listener: Send {
    /// Waits for the next connection.
    async fn accept(&mut self) -> Result<Connection, AppError>;
    /// Address clients should use to reach this listener.
    fn url(&self) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Local { host: String, port: u16 },
    Relay(RelayOptions),
}

/// Opens listeners. Swapped out in tests.
#[async_trait]
pub trait Binder: Send + Sync {
    async fn bind(&self, endpoint: &Endpoint) -> Result<Box<dyn Listener>, AppError>;
}

/// Binds real sockets and ngrok tunnels.
#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkBinder;

#[async_trait]
impl Binder for NetworkBinder {
    async fn bind(&self, endpoint: &Endpoint) -> Result<Box<dyn Listener>, AppError> {
        match endpoint {
            Endpoint::Local { host, port } => {
                Ok(Box::new(LocalListener::bind(host, *port).await?))
            }
            Endpoint::Relay(options) => Ok(Box::new(RelayListener::connect(options).await?)),
        }
    }
}

/// Accepts connections until `cancel_token` fires or the listener fails,
/// serving each one on its own task.
///
/// On cancellation, open connections finish their in-flight requests and
/// every pending report is printed before this returns.
pub async fn serve(
    mut listener: Box<dyn Listener>,
    catcher: Catcher,
    cancel_token: CancellationToken,
) -> Result<(), AppError> {
    let connections = TaskTracker::new();
    loop {
        let connection = tokio::select! {
            result = listener.accept() => result?,
            _ = cancel_token.cancelled() => {
                info!("Shutting down listener");
                break;
            }
        };

        let catcher = catcher.clone();
        let cancel_token = cancel_token.clone();
        connections.spawn(serve_connection(connection, catcher, cancel_token));
    }

    connections.close();
    if tokio::time::timeout(SHUTDOWN_GRACE, connections.wait())
        .await
        .is_err()
    {
        warn!("Dropping {} unfinished connection(s)", connections.len());
    }
    catcher.flush_reports().await;
    Ok(())
}

async fn serve_connection(
    connection: Connection,
    catcher: Catcher,
    cancel_token: CancellationToken,
) {
    let service = service_fn(move |request: Request<Incoming>| {
        let catcher = catcher.clone();
        async move { Ok::<_, Infallible>(catcher.handle(request).await) }
    });
    let builder = auto::Builder::new(TokioExecutor::new());
    let conn = builder.serve_connection(TokioIo::new(connection), service);
    tokio::pin!(conn);

    let result = tokio::select! {
        result = conn.as_mut() => result,
        _ = cancel_token.cancelled() => {
            conn.as_mut().graceful_shutdown();
            conn.await
        }
    };
    if let Err(e) = result {
        debug!("Connection closed with error: {e}");
    }
}
