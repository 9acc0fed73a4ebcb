use std::sync::Arc;

use axum::Json;
use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use lfv_kernel::{UNBOUNDED, WalkDirItem};

use super::required;
use crate::AppState;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub(crate) struct TreeParams {
    dir: Option<String>,
    depth: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct TreeResponse {
    files: WalkDirItem,
}

/// `GET /api/tree?dir=..&depth=..`
pub(crate) async fn get_tree(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TreeParams>,
) -> Result<Json<TreeResponse>, ApiError> {
    let dir = required(params.dir, "dir")?;
    let depth = parse_depth(&required(params.depth, "depth")?)?;

    let dir = state.sandbox.resolve_within_root(&dir, true)?;
    let walked = state.tree.walk(&dir, depth).await?;

    Ok(Json(TreeResponse {
        files: WalkDirItem::clone(&walked),
    }))
}

/// Accepts any JSON-style number. Fractions truncate, negatives clamp to 0,
/// and `Infinity` or anything too large means unbounded.
fn parse_depth(raw: &str) -> Result<usize, ApiError> {
    let depth: f64 = raw
        .trim()
        .parse()
        .map_err(|_| ApiError::bad_request("invalid_depth", format!("depth is not a number: {raw}")))?;

    if depth.is_nan() {
        return Err(ApiError::bad_request("invalid_depth", "depth is not a number"));
    }
    if depth <= 0.0 {
        return Ok(0);
    }
    if depth >= usize::MAX as f64 {
        return Ok(UNBOUNDED);
    }
    Ok(depth as usize)
}
