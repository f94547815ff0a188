//! OTP callback server
//!
//! Small HTTP surface in front of the inbox and readiness board:
//!
//! - `POST /otp` delivers a code for an account
//! - `GET /health` answers while the process is up
//! - `GET /readiness` reports every account's phase

mod handlers;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio_util::sync::CancellationToken;

use crate::inbox::OtpInbox;
use crate::readiness::ReadinessBoard;

/// Shared handler state
#[derive(Clone)]
pub struct CallbackState {
    pub inbox: Arc<OtpInbox>,
    pub board: Arc<ReadinessBoard>,
}

/// Build the callback router
pub fn router(state: CallbackState) -> Router {
    Router::new()
        .route("/otp", post(handlers::submit_otp))
        .route("/health", get(handlers::health))
        .route("/readiness", get(handlers::readiness))
        .with_state(state)
}

/// Bound callback server, ready to serve
pub struct CallbackServer {
    listener: TcpListener,
    app: Router,
}

impl CallbackServer {
    /// Bind the listener. Port 0 picks a free port.
    pub async fn bind(addr: impl ToSocketAddrs, state: CallbackState) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            app: router(state),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until `cancel` fires, then drain in-flight requests
    pub async fn serve(self, cancel: CancellationToken) -> io::Result<()> {
        if let Ok(addr) = self.listener.local_addr() {
            tracing::info!("Callback server listening on {}", addr);
        }

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(async move {
                cancel.cancelled().await;
                tracing::info!("Callback server shutting down");
            })
            .await
    }
}
