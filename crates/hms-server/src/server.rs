//! TCP listener and connection handling for the mock server.

use crate::admin_api::Dispatcher;
use crate::builder::OngoingRequest;
use crate::config::ServerConfig;
use crate::expectation::{Method, Registry};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, error, info};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid server configuration: {0}")]
    Config(String),

    #[error("Failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Server task failed: {0}")]
    Join(#[from] JoinError),
}

/// One-shot shutdown signal shared by the accept loop, live connections and
/// the shutdown endpoint.
#[derive(Debug)]
pub struct Shutdown {
    requested: AtomicBool,
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            requested: AtomicBool::new(false),
            tx,
        }
    }

    /// Request shutdown. Returns true only for the first call.
    pub fn trigger(&self) -> bool {
        if self.requested.swap(true, Ordering::SeqCst) {
            return false;
        }
        // No receivers just means nothing is listening yet
        let _ = self.tx.send(());
        true
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_requested() {
            return;
        }
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// A running mock server.
///
/// Dropping the handle requests shutdown; use [`MockServer::stopped`] to wait
/// for the accept loop to exit.
#[derive(Debug)]
pub struct MockServer {
    addr: SocketAddr,
    registry: Arc<Registry>,
    shutdown: Arc<Shutdown>,
    task: Option<JoinHandle<()>>,
}

impl MockServer {
    /// Bind the configured address and start serving. Port 0 picks an
    /// ephemeral port; see [`MockServer::addr`].
    pub async fn start(config: &ServerConfig) -> Result<Self, ServerError> {
        config
            .validate()
            .map_err(|e| ServerError::Config(e.to_string()))?;
        let bind_addr = config
            .listen
            .socket_addr()
            .map_err(|e| ServerError::Config(e.to_string()))?;

        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|e| ServerError::Bind(bind_addr, e))?;
        let addr = listener.local_addr()?;
        info!("Mock server listening on http://{}", addr);

        let registry = Arc::new(Registry::new());
        let shutdown = Arc::new(Shutdown::new());
        let dispatcher = Arc::new(Dispatcher::new(
            Arc::clone(&registry),
            Arc::clone(&shutdown),
            config.admin.clone(),
        ));

        let task = tokio::spawn(accept_loop(listener, dispatcher, Arc::clone(&shutdown)));

        Ok(Self {
            addr,
            registry,
            shutdown,
            task: Some(task),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Absolute URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn shutdown_handle(&self) -> Arc<Shutdown> {
        Arc::clone(&self.shutdown)
    }

    /// Start describing an expectation for `uri` and `method`.
    pub fn when(&self, uri: &str, method: Method) -> OngoingRequest {
        OngoingRequest::new(Arc::clone(&self.registry), uri, method)
    }

    pub fn shutdown(&self) {
        if self.shutdown.trigger() {
            info!("Mock server on {} shutting down", self.addr);
        }
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.is_requested()
    }

    /// Wait for the accept loop to exit. Does not request shutdown itself.
    pub async fn stopped(mut self) -> Result<(), ServerError> {
        if let Some(task) = self.task.take() {
            task.await?;
        }
        Ok(())
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.shutdown.trigger();
        }
    }
}

async fn accept_loop(listener: TcpListener, dispatcher: Arc<Dispatcher>, shutdown: Arc<Shutdown>) {
    let mut shutdown_rx = shutdown.subscribe();
    if shutdown.is_requested() {
        return;
    }

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, peer)) => {
                        debug!("Accepted connection from {}", peer);
                        spawn_connection(stream, Arc::clone(&dispatcher), Arc::clone(&shutdown));
                    }
                    Err(e) => {
                        error!("Accept error: {}", e);
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop stopped");
                break;
            }
        }
    }
}

fn spawn_connection(stream: TcpStream, dispatcher: Arc<Dispatcher>, shutdown: Arc<Shutdown>) {
    let mut shutdown_rx = shutdown.subscribe();

    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let service = service_fn(move |req| {
            let dispatcher = Arc::clone(&dispatcher);
            async move { Ok::<_, Infallible>(dispatcher.route(req).await) }
        });

        let conn = http1::Builder::new().serve_connection(io, service);
        tokio::pin!(conn);

        if shutdown.is_requested() {
            conn.as_mut().graceful_shutdown();
        }

        tokio::select! {
            result = conn.as_mut() => {
                if let Err(e) = result {
                    debug!("Connection error: {}", e);
                }
            }
            _ = shutdown_rx.recv() => {
                // Finish the in-flight response, then close
                conn.as_mut().graceful_shutdown();
                if let Err(e) = conn.await {
                    debug!("Connection error during shutdown: {}", e);
                }
            }
        }
    });
}
