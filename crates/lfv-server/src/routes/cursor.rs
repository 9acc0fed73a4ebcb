//! Editor cursor relay.
//!
//! An editor plugin posts `{file, line}`; every open viewer receives a
//! `cursor-changed` event and scrolls to it. Nothing is stored: a viewer that
//! connects later only sees later moves.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::Json;
use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;

use super::required;
use crate::AppState;
use crate::error::ApiError;

const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Moves buffered per slow viewer before it starts skipping.
pub(crate) const CURSOR_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct CursorMove {
    file: String,
    line: u64,
}

pub(crate) fn channel() -> broadcast::Sender<CursorMove> {
    broadcast::channel(CURSOR_CHANNEL_CAPACITY).0
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum CursorMessage<'a> {
    Connected,
    CursorChanged { file: &'a str, line: u64 },
}

impl CursorMessage<'_> {
    fn event(&self) -> Event {
        Event::default().data(serde_json::to_string(self).unwrap_or_default())
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct CursorRequest {
    file: Option<String>,
    line: Option<Value>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CursorAck {
    success: bool,
}

/// `POST /api/cursor-watcher` with `{"file": "..", "line": 12}`.
pub(crate) async fn move_cursor(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CursorRequest>,
) -> Result<Json<CursorAck>, ApiError> {
    let file = required(body.file, "file")?;
    let line = body
        .line
        .as_ref()
        .and_then(Value::as_u64)
        .ok_or_else(|| ApiError::bad_request("invalid_line", "line must be a non-negative integer"))?;

    // zero receivers just means no viewer is open
    let viewers = state.cursor.send(CursorMove { file, line }).unwrap_or(0);
    tracing::debug!(line, viewers, "cursor moved");
    Ok(Json(CursorAck { success: true }))
}

/// `GET /api/cursor-watcher`
pub(crate) async fn cursor_events(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let moves = BroadcastStream::new(state.cursor.subscribe()).filter_map(|result| async move {
        match result {
            Ok(CursorMove { file, line }) => Some(Ok::<_, Infallible>(
                CursorMessage::CursorChanged { file: &file, line }.event(),
            )),
            // stale positions are worthless; the next move catches the viewer up
            Err(e) => {
                tracing::debug!(error = %e, "cursor stream lagged");
                None
            }
        }
    });

    let stream = stream::once(async { Ok::<_, Infallible>(CursorMessage::Connected.event()) })
        .chain(moves);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(PING_INTERVAL).text("ping"))
}
