//! The HTTP plumbing shared by the agent and coordinator REST surfaces:
//! error-to-400 mapping, request logging and graceful serving.

use std::io;

use axum::{
    extract::Request,
    http::{StatusCode, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
    Json, Router,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::wire::ErrorBody;

/// A handler failure. Renders as status 400 with an `{"error": ...}` body,
/// so a misbehaving request can never take the server task down.
pub struct ApiError(anyhow::Error);

impl<E> From<E> for ApiError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

/// Fallback for paths outside the REST surface.
pub async fn unknown_path(uri: Uri) -> (StatusCode, String) {
    (
        StatusCode::NOT_FOUND,
        format!("Unknown path {}\n", uri.path()),
    )
}

/// Log every request with its method, path and response status: TRACE on
/// success, WARN on error.
pub async fn log_requests(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let response = next.run(request).await;
    let status = response.status().as_u16();
    if status < 400 {
        trace!("HTTP {method} {path}: status {status}");
    } else {
        warn!("HTTP {method} {path}: status {status}");
    }
    response
}

/// Bind the REST listener. Port 0 asks the OS for an ephemeral port, which
/// tests rely on.
pub async fn bind(port: u16) -> io::Result<TcpListener> {
    TcpListener::bind(("0.0.0.0", port)).await
}

/// Serve `router` until `shutdown` is cancelled, then stop accepting and
/// drain in-flight requests.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
}
