use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use lfv_kernel::{SearchResponse, SearchType};

use super::required;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct SearchParams {
    q: Option<String>,
    #[serde(rename = "type")]
    search_type: Option<String>,
    dir: Option<String>,
}

/// `GET /api/file-search?q=..&type=filename|content&dir=..`
pub(crate) async fn file_search(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let query = required(params.q, "q")?;
    let search_type = params
        .search_type
        .as_deref()
        .and_then(|t| t.parse::<SearchType>().ok())
        .ok_or_else(|| {
            ApiError::bad_request(
                "invalid_search_type",
                "search type must be 'filename' or 'content'",
            )
        })?;
    let dir = params.dir.filter(|d| !d.is_empty());

    // dropped with this future, so a client that goes away kills the search
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let response = state
        .search
        .search(&query, search_type, dir.as_deref(), &cancel)
        .await?;
    Ok(Json(response))
}
