//! Changing the active base folder.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use lfv_kernel::{DirCompletion, complete_directory};

use super::required;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionParams {
    #[serde(default)]
    query: String,
}

/// `GET /api/new-base-dir-search?query=..`
pub(crate) async fn search_base_dir(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CompletionParams>,
) -> Json<DirCompletion> {
    Json(complete_directory(&state.sandbox, &params.query).await)
}

#[derive(Debug, Deserialize)]
pub(crate) struct RebaseRequest {
    dir: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct RebaseResponse {
    status: &'static str,
}

/// `POST /api/new-base-dir` with `{"dir": ".."}`.
///
/// Caches are left alone: they are keyed by absolute path.
pub(crate) async fn set_base_dir(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RebaseRequest>,
) -> Result<Json<RebaseResponse>, ApiError> {
    let dir = required(body.dir, "dir")?;
    state.sandbox.rebase(&dir)?;
    Ok(Json(RebaseResponse { status: "200" }))
}
