// src/api/sse.rs
// Bridges a diagnostic run onto a Server-Sent Events response

use std::convert::Infallible;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info_span, Instrument};
use uuid::Uuid;

use crate::diagnostic::{DiagnosticEvent, DiagnosticRun};

/// Events buffered between the pipeline and the HTTP body
const EVENT_BUFFER: usize = 100;

/// Start `run` in the background and stream its events.
///
/// The body stream holds a drop guard on the run's cancellation token, so a
/// client disconnect kills the process.
pub fn stream_run(
    run: DiagnosticRun,
    server_name: String,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (tx, mut rx) = mpsc::channel::<DiagnosticEvent>(EVENT_BUFFER);
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let span = info_span!(
        "diagnostic",
        id = %Uuid::new_v4(),
        tool = %run.tool(),
        target = %run.target()
    );
    tokio::spawn(
        async move {
            let outcome = run.execute(tx, cancel).await;
            debug!(?outcome, "Diagnostic stream closed");
        }
        .instrument(span),
    );

    let stream = async_stream::stream! {
        let _guard = guard;
        while let Some(event) = rx.recv().await {
            yield Ok(sse_event(&event, &server_name));
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// One `data:` frame: the event JSON plus the server label
pub fn sse_event(event: &DiagnosticEvent, server_name: &str) -> Event {
    Event::default().data(event_json(event, server_name))
}

pub fn event_json(event: &DiagnosticEvent, server_name: &str) -> String {
    let mut value = serde_json::to_value(event).unwrap_or_default();
    if let Some(object) = value.as_object_mut() {
        object.insert("server".to_string(), server_name.into());
    }
    value.to_string()
}
