//! HTTP API over a [`SearchService`].
//!
//! Search and indexing run on the blocking thread pool and stream their
//! events as line-delimited JSON with a `text/event-stream` content type.
//! Events pass through a channel of capacity one, so the pipeline runs at
//! most one event ahead of the client and stops once the client is gone.

use std::{fmt::Display, future::pending, io, sync::Arc};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use folio_index::{EventSink, ProgressEvent, SearchService, StreamClosed, with_pdf_extension};
use futures::stream;
use serde::Deserialize;
use serde_json::json;
use tokio::{fs, net::TcpListener, signal, sync::mpsc, task};
use tracing::{info, warn};

/// The service shared by all handlers.
pub type SharedService = Arc<SearchService>;

/// Builds the router.
///
/// Routes:
/// - `GET /search?q=...`: search events
/// - `GET /index_books`: indexing events
/// - `GET /pdf/title/{filename}`: `{"title"}`
/// - `GET /pdf/title_for_search/{filename}`: `{"title","filename"}`
/// - `GET /pdf/{filename}/{page}`: the PDF itself
pub fn router(service: SharedService) -> Router {
    Router::new()
        .route("/search", get(search))
        .route("/index_books", get(index_books))
        .route("/pdf/title/{filename}", get(title))
        .route("/pdf/title_for_search/{filename}", get(title_for_search))
        .route("/pdf/{filename}/{page}", get(pdf_file))
        .with_state(service)
}

/// Serves the API on `bind` until Ctrl-C.
pub async fn serve(service: SearchService, bind: &str) -> io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!(address = %listener.local_addr()?, "listening");

    axum::serve(listener, router(Arc::new(service)))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "cannot listen for ctrl-c");
        pending::<()>().await;
    }
    info!("shutting down");
}

/// Query string of `/search`.
#[derive(Debug, Deserialize)]
struct SearchParams {
    /// The raw query.
    #[serde(default)]
    q: String,
}

/// `GET /search`: an empty query answers `[]`, anything else streams events.
async fn search(
    State(service): State<SharedService>,
    Query(params): Query<SearchParams>,
) -> Response {
    if params.q.is_empty() {
        return Json(json!([])).into_response();
    }

    info!(query = %params.q, "search request");
    event_stream(move |sink| {
        if service.search(&params.q, sink).is_err() {
            info!(query = %params.q, "client went away during search");
        }
    })
}

/// `GET /index_books`: indexes new PDFs and drops deleted ones.
async fn index_books(State(service): State<SharedService>) -> Response {
    info!("index request");
    event_stream(move |sink| {
        if service.update_index(sink).is_err() {
            info!("client went away during indexing");
        }
    })
}

/// `GET /pdf/title/{filename}`.
async fn title(State(service): State<SharedService>, Path(filename): Path<String>) -> Response {
    let filename = with_pdf_extension(&filename);
    match task::spawn_blocking(move || service.title(&filename)).await {
        Ok(title) => Json(json!({ "title": title })).into_response(),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// `GET /pdf/title_for_search/{filename}`: 404 when the file is missing.
async fn title_for_search(
    State(service): State<SharedService>,
    Path(filename): Path<String>,
) -> Response {
    let filename = with_pdf_extension(&filename);
    let lookup = filename.clone();
    match task::spawn_blocking(move || service.search_title(&lookup)).await {
        Ok(Some(found)) => Json(found).into_response(),
        Ok(None) => error_response(
            StatusCode::NOT_FOUND,
            format!("PDF file '{filename}' not found"),
        ),
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e),
    }
}

/// `GET /pdf/{filename}/{page}`: the page number is for the viewer only.
async fn pdf_file(
    State(service): State<SharedService>,
    Path((filename, _page)): Path<(String, u32)>,
) -> Response {
    let filename = with_pdf_extension(&filename);
    let Some(path) = service.titles().library_file(&filename) else {
        return error_response(
            StatusCode::NOT_FOUND,
            format!("PDF file '{filename}' not found in data directory"),
        );
    };

    match fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "application/pdf")], bytes).into_response(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read PDF");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e)
        }
    }
}

/// A JSON `{"error": message}` body with `status`.
fn error_response(status: StatusCode, message: impl Display) -> Response {
    (status, Json(json!({ "error": message.to_string() }))).into_response()
}

/// Sends events into a bounded channel from a blocking thread.
struct ChannelSink {
    /// Sending half; the response body holds the receiver.
    sender: mpsc::Sender<ProgressEvent>,
}

impl EventSink for ChannelSink {
    fn emit(&mut self, event: ProgressEvent) -> Result<(), StreamClosed> {
        self.sender.blocking_send(event).map_err(|_| StreamClosed)
    }
}

/// Runs `produce` on the blocking pool and streams what it emits.
fn event_stream(produce: impl FnOnce(&mut ChannelSink) + Send + 'static) -> Response {
    let (sender, receiver) = mpsc::channel(1);
    task::spawn_blocking(move || produce(&mut ChannelSink { sender }));

    let lines = stream::unfold(receiver, |mut receiver| async move {
        let event = receiver.recv().await?;
        Some((encode(&event), receiver))
    });

    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(lines),
    )
        .into_response()
}

/// One event as a JSON line.
fn encode(event: &ProgressEvent) -> Result<Bytes, serde_json::Error> {
    let mut line = serde_json::to_vec(event)?;
    line.push(b'\n');
    Ok(Bytes::from(line))
}
