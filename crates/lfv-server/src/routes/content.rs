use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};

use lfv_kernel::{Encoding, TextStats};

use super::required;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct ContentParams {
    file: Option<String>,
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ContentResponse {
    content: String,
    stats: TextStats,
}

/// `GET /api/file-content?file=..&encoding=..`
///
/// `utf-8` (default) returns the text and its stats; `base64` returns the
/// encoded bytes with zeroed stats.
pub(crate) async fn get_file_content(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ContentParams>,
) -> Result<Json<ContentResponse>, ApiError> {
    let file = required(params.file, "file")?;
    let encoding = match params.encoding.as_deref() {
        None | Some("") => Encoding::Utf8,
        Some(raw) => match raw.parse::<Encoding>() {
            Ok(Encoding::Raw) | Err(_) => {
                return Err(ApiError::bad_request(
                    "invalid_encoding",
                    format!("unsupported encoding: {raw}"),
                ));
            }
            Ok(encoding) => encoding,
        },
    };

    let path = state.sandbox.resolve_within_root(&file, false)?;
    let data = state.tree.read_file(&path, encoding).await?;
    let content = data.as_text().unwrap_or_default().to_string();

    let stats = match encoding {
        Encoding::Utf8 => TextStats::from_text(&content),
        _ => TextStats::default(),
    };

    Ok(Json(ContentResponse { content, stats }))
}

/// `GET /serve/{*file}`: raw bytes of a file under the base directory.
pub(crate) async fn serve_file(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let path = state.sandbox.resolve_within_base(&file, false)?;
    let data = state.tree.read_file(&path, Encoding::Raw).await?;

    Ok((
        [(header::CONTENT_TYPE, "application/octet-stream")],
        data.as_bytes().to_vec(),
    ))
}
