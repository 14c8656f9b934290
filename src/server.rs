//! Read-only HTTP status endpoint.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::Serialize;
use tokio::net::TcpListener;

use crate::{
    book_db::BookQuery,
    error::{Error, Result},
    library::Library,
};

#[derive(Clone)]
struct AppState {
    version: Arc<str>,
    library: Arc<Library>,
}

#[derive(Debug, Serialize)]
struct StatusResponse<'a> {
    version: &'a str,
    books: usize,
}

/// Bind the listening socket. Failure here is fatal.
pub async fn bind(addr: &str) -> Result<TcpListener> {
    let listener = TcpListener::bind(addr).await.map_err(Error::Server)?;
    if let Ok(local) = listener.local_addr() {
        tracing::info!("Serving on {local}");
    }
    Ok(listener)
}

pub fn router(version: &str, library: Arc<Library>) -> Router {
    let state = AppState {
        version: Arc::from(version),
        library,
    };
    Router::new()
        .route("/api/status", get(status))
        .with_state(state)
}

/// Serve until the process exits.
pub async fn serve(listener: TcpListener, router: Router) -> Result<()> {
    axum::serve(listener, router).await?;
    Ok(())
}

async fn status(State(state): State<AppState>) -> impl IntoResponse {
    let library = Arc::clone(&state.library);
    let counted =
        tokio::task::spawn_blocking(move || library.db().count(&BookQuery::new()))
            .await;

    match counted {
        Ok(Ok(books)) => Json(StatusResponse {
            version: &state.version,
            books,
        })
        .into_response(),
        Ok(Err(e)) => {
            tracing::warn!("status: could not count books: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            tracing::warn!("status: count task failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
