//! Line-oriented runner for external search tools.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

use super::error::{SearchError, SearchResult};

/// Parsed lines kept before the child is stopped early.
pub(crate) const OUTPUT_ITEM_LIMIT: usize = 10_000;

/// Bytes of stderr kept for failure messages.
const STDERR_LIMIT: u64 = 8 * 1024;

/// Spawn `command`, feed each stdout line to `parse` and collect the items.
///
/// - deadline reached: the child is killed and the run fails with `Timeout`
/// - `cancel` fired: the child is killed and the items parsed so far return
/// - non-zero exit: fails only if nothing was parsed
pub(crate) async fn collect_lines<T>(
    tool: &str,
    mut command: Command,
    timeout: Duration,
    cancel: &CancellationToken,
    mut parse: impl FnMut(&str) -> Option<T>,
) -> SearchResult<Vec<T>> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => SearchError::unavailable(tool),
        _ => SearchError::failure(tool, format!("spawn failed: {e}")),
    })?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| SearchError::failure(tool, "stdout not captured"))?;

    // drain stderr alongside stdout so a chatty tool cannot fill the pipe
    let stderr = child.stderr.take();
    let stderr_task = tokio::spawn(async move {
        let mut buf = String::new();
        if let Some(stderr) = stderr {
            let _ = stderr.take(STDERR_LIMIT).read_to_string(&mut buf).await;
        }
        buf
    });

    let timed_out = || {
        tracing::warn!(tool, timeout_ms = timeout.as_millis() as u64, "search tool timed out");
        SearchError::Timeout {
            tool: tool.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    };

    let deadline = tokio::time::sleep(timeout);
    tokio::pin!(deadline);

    let mut reader = BufReader::new(stdout);
    let mut buf = Vec::new();
    let mut items = Vec::new();
    loop {
        buf.clear();
        tokio::select! {
            _ = &mut deadline => {
                let _ = child.start_kill();
                return Err(timed_out());
            }
            _ = cancel.cancelled() => {
                let _ = child.start_kill();
                tracing::debug!(tool, kept = items.len(), "search cancelled");
                return Ok(items);
            }
            read = reader.read_until(b'\n', &mut buf) => match read {
                Ok(0) => break,
                Ok(_) => {
                    // file names need not be UTF-8
                    let text = String::from_utf8_lossy(&buf);
                    let line = text.strip_suffix('\n').unwrap_or(&*text);
                    let line = line.strip_suffix('\r').unwrap_or(line);
                    if let Some(item) = parse(line) {
                        items.push(item);
                        if items.len() >= OUTPUT_ITEM_LIMIT {
                            let _ = child.start_kill();
                            tracing::debug!(tool, "output limit reached");
                            return Ok(items);
                        }
                    }
                }
                Err(e) => {
                    let _ = child.start_kill();
                    return Err(SearchError::failure(tool, format!("reading output: {e}")));
                }
            }
        }
    }

    // stdout closed; the exit must still land before the deadline
    let status = match tokio::time::timeout_at(deadline.deadline(), child.wait()).await {
        Ok(status) => status.map_err(|e| SearchError::failure(tool, format!("wait failed: {e}")))?,
        Err(_) => {
            let _ = child.start_kill();
            return Err(timed_out());
        }
    };

    if !status.success() {
        // a lingering grandchild may hold stderr open
        let stderr = tokio::time::timeout(Duration::from_millis(500), stderr_task)
            .await
            .ok()
            .and_then(Result::ok)
            .unwrap_or_default();
        if items.is_empty() {
            let detail = stderr.trim();
            let message = if detail.is_empty() {
                format!("exited with {status}")
            } else {
                format!("exited with {status}: {detail}")
            };
            return Err(SearchError::failure(tool, message));
        }
        tracing::debug!(tool, %status, kept = items.len(), "non-zero exit, keeping partial output");
    }

    Ok(items)
}
