//! HTTP receiver for push-delivered storage events.
//!
//! Events arrive in CloudEvents binary mode: the event type in the `ce-type`
//! header and the object resource as the JSON body.
//!
//! | Route | Response |
//! |---|---|
//! | `POST /` | `204` once the event has been handled, whatever the outcome |
//! | `POST /` with a missing or unknown `ce-type` | `400` |
//! | `GET /_health` | `200 ok` |
//!
//! Handler failures are logged by the handler and still answered with `204`:
//! a non-2xx response makes the push subscription redeliver, and failed
//! events are not retried.

use crate::catalog::Catalog;
use crate::event::{EventError, ImageEvent, StorageObject};
use crate::handler::Indexer;
use crate::metadata::MetadataExtractor;
use crate::storage::ObjectStore;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, info, warn};

pub const EVENT_TYPE_HEADER: &str = "ce-type";

pub fn router<S, M, C>(indexer: Arc<Indexer<S, M, C>>) -> Router
where
    S: ObjectStore + 'static,
    M: MetadataExtractor + 'static,
    C: Catalog + 'static,
{
    Router::new()
        .route("/", post(receive::<S, M, C>))
        .route("/_health", get(health))
        .with_state(indexer)
}

async fn health() -> &'static str {
    "ok"
}

async fn receive<S, M, C>(
    State(indexer): State<Arc<Indexer<S, M, C>>>,
    headers: HeaderMap,
    Json(object): Json<StorageObject>,
) -> Result<StatusCode, (StatusCode, String)>
where
    S: ObjectStore,
    M: MetadataExtractor,
    C: Catalog,
{
    let event_type = headers
        .get(EVENT_TYPE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(EventError::MissingEventType)
        .map_err(bad_request)?;
    let event = ImageEvent::from_notification(event_type, object).map_err(bad_request)?;

    debug!(key = %event.object_key, bucket = %event.bucket, kind = %event.kind, "Received storage event.");
    let outcome = indexer.handle(&event).await;
    debug!(key = %event.object_key, ?outcome, "Storage event handled.");

    Ok(StatusCode::NO_CONTENT)
}

fn bad_request(e: EventError) -> (StatusCode, String) {
    warn!(error = %e, "Rejected storage event.");
    (StatusCode::BAD_REQUEST, e.to_string())
}

/// Serve `router` on `addr` until SIGINT or SIGTERM.
pub async fn serve(router: Router, addr: SocketAddr) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "Listening for storage events.");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown())
        .await?;
    info!("Server stopped.");
    Ok(())
}

async fn shutdown() {
    let interrupt = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Cannot listen for SIGINT.");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Cannot listen for SIGTERM.");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = interrupt => {},
        _ = terminate => {},
    };
    info!("Shutting down gracefully...");
}
