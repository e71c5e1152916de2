//! HTTP surface: `POST /conversations` and `GET /health`.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::router::{InboundRequest, InboundRouter};
use crate::{AppError, Result};

/// Handler for `GET /health`.
async fn health() -> &'static str {
    "ok"
}

async fn conversations(
    State(router): State<Arc<InboundRouter>>,
    body: std::result::Result<Json<InboundRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return error_response(&AppError::BadRequest(rejection.body_text()));
        }
    };

    match router.handle(request).await {
        Ok(accepted) => (StatusCode::ACCEPTED, Json(accepted)).into_response(),
        Err(err) => error_response(&err),
    }
}

fn error_response(err: &AppError) -> Response {
    let status = match err {
        AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        AppError::Conflict(_) => StatusCode::CONFLICT,
        AppError::NotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!(%err, "inbound request failed");
    }
    (status, Json(json!({ "error": err.to_string() }))).into_response()
}

/// Build the axum router.
pub fn app(router: Arc<InboundRouter>) -> Router {
    Router::new()
        .route("/conversations", post(conversations))
        .route("/health", get(health))
        .with_state(router)
}

/// Serve the inbound API on `bind` until `ct` is cancelled.
///
/// # Errors
///
/// Returns `AppError::Http` if the server fails to bind or serve.
pub async fn serve_http(
    router: Arc<InboundRouter>,
    bind: SocketAddr,
    ct: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .map_err(|err| AppError::Http(format!("failed to bind {bind}: {err}")))?;

    info!(%bind, "inbound API listening");

    axum::serve(listener, app(router))
        .with_graceful_shutdown(async move { ct.cancelled().await })
        .await
        .map_err(|err| AppError::Http(format!("server error: {err}")))?;

    info!("inbound API shut down");
    Ok(())
}
