//! Embedded static file server for the pages under test
//!
//! Serves the working directory for the duration of a run so the browser can
//! load page files over plain HTTP, then shuts down gracefully.

use crate::CaptureError;
use axum::Router;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::services::ServeDir;
use tracing::{debug, error, info};

pub struct StaticServer {
    addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl StaticServer {
    /// Serves `root` on 127.0.0.1:`port` until [`StaticServer::stop`].
    ///
    /// Port 0 binds an ephemeral port; [`StaticServer::host`] reports the
    /// actual one.
    pub async fn start(root: impl Into<PathBuf>, port: u16) -> Result<Self, CaptureError> {
        let root = root.into();
        let router = Router::new().fallback_service(ServeDir::new(&root));

        let addr = SocketAddr::from(([127, 0, 0, 1], port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| CaptureError::ServerError(format!("failed to bind {addr}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| CaptureError::ServerError(e.to_string()))?;

        let (shutdown, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, router.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = rx.await;
                });
            if let Err(err) = server.await {
                error!("Static server exited with error: {err}");
            }
        });

        info!("Serving {} at http://localhost:{}/", root.display(), addr.port());
        Ok(Self {
            addr,
            shutdown,
            handle,
        })
    }

    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Base URL page paths are joined onto.
    pub fn host(&self) -> String {
        format!("http://localhost:{}/", self.addr.port())
    }

    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        let _ = self.handle.await;
        debug!("Static server stopped");
    }
}
