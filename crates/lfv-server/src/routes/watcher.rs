//! Server-sent change notifications.
//!
//! Each client gets `{"type":"connected"}` first, then one
//! `{"type":"file-changed",...}` per change to a file that has been read.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::{Stream, StreamExt, stream};
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;

use lfv_kernel::FileChange;

use crate::AppState;

const PING_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
enum WatchMessage {
    Connected,
    FileChanged {
        #[serde(skip_serializing_if = "Option::is_none")]
        path: Option<String>,
        revision: u64,
    },
}

impl WatchMessage {
    fn event(&self) -> Event {
        Event::default().data(serde_json::to_string(self).unwrap_or_default())
    }
}

/// `GET /api/file-watcher`
pub(crate) async fn file_watcher(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.tree.subscribe();
    let tree = Arc::clone(&state.tree);
    tracing::debug!("change stream opened");

    let changes = BroadcastStream::new(rx).map(move |result| {
        let message = match result {
            Ok(FileChange { path, revision, .. }) => WatchMessage::FileChanged {
                path: state
                    .sandbox
                    .root_relative(&path)
                    .map(|p| p.display().to_string()),
                revision,
            },
            // missed some; one generic change is enough for the client to re-fetch
            Err(BroadcastStreamRecvError::Lagged(n)) => {
                tracing::warn!(lagged = n, "change stream lagged");
                WatchMessage::FileChanged {
                    path: None,
                    revision: tree.watcher().revision(),
                }
            }
        };
        Ok::<_, Infallible>(message.event())
    });

    let stream = stream::once(async { Ok::<_, Infallible>(WatchMessage::Connected.event()) }).chain(changes);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(PING_INTERVAL).text("ping"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_shape() {
        let connected = serde_json::to_value(WatchMessage::Connected).unwrap();
        assert_eq!(connected, serde_json::json!({"type": "connected"}));

        let changed = serde_json::to_value(WatchMessage::FileChanged {
            path: Some("notes/a.md".into()),
            revision: 3,
        })
        .unwrap();
        assert_eq!(changed["type"], "file-changed");
        assert_eq!(changed["path"], "notes/a.md");
        assert_eq!(changed["revision"], 3);
    }
}
