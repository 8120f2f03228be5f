//! Handlers that change what every viewer sees.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use super::AppState;
use super::auth::{Navigator, Presenter};
use super::params::{self, SlidePath};
use crate::error::ApiError;
use crate::live::nav::Resync;

#[derive(Debug, Default, Deserialize)]
pub struct GotoQuery {
    #[serde(default, deserialize_with = "params::saturating_opt")]
    pub clicks: Option<i64>,
}

pub async fn next(_: Navigator, State(state): State<AppState>) -> Json<Resync> {
    Json(state.live.next())
}

pub async fn prev(_: Navigator, State(state): State<AppState>) -> Json<Resync> {
    Json(state.live.prev())
}

pub async fn goto(
    _: Navigator,
    State(state): State<AppState>,
    Path(SlidePath { idx }): Path<SlidePath>,
    Query(query): Query<GotoQuery>,
) -> Json<Resync> {
    Json(state.live.goto(idx, query.clicks.unwrap_or(0)))
}

#[derive(Debug, Deserialize)]
struct DrawingRequest {
    slide_index: usize,
    changes: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct HistoryRequest {
    slide_index: usize,
}

#[derive(Debug, Serialize)]
pub struct DrawingAck {
    pub slide_index: usize,
    pub applied: usize,
}

#[derive(Debug, Serialize)]
pub struct HistoryAck {
    pub slide_index: usize,
    pub changed: bool,
    pub changes: Vec<Value>,
}

fn parse_body<T: for<'de> Deserialize<'de>>(body: &[u8]) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// The token guard runs before the body is read, so an unauthorized
/// request never reaches the store.
pub async fn drawing(
    _: Presenter,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<DrawingAck>, ApiError> {
    let request: DrawingRequest = parse_body(&body)?;
    let applied = state.live.apply_drawing(request.slide_index, &request.changes)?;
    debug!(slide_index = request.slide_index, applied, "drawing changes applied");
    Ok(Json(DrawingAck {
        slide_index: request.slide_index,
        applied,
    }))
}

pub async fn undo(
    _: Presenter,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<HistoryAck>, ApiError> {
    let request: HistoryRequest = parse_body(&body)?;
    let result = state.live.undo_drawing(request.slide_index);
    info!(slide_index = request.slide_index, changed = result.is_some(), "drawing undo");
    Ok(Json(history_ack(&state, request.slide_index, result)))
}

pub async fn redo(
    _: Presenter,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<HistoryAck>, ApiError> {
    let request: HistoryRequest = parse_body(&body)?;
    let result = state.live.redo_drawing(request.slide_index);
    info!(slide_index = request.slide_index, changed = result.is_some(), "drawing redo");
    Ok(Json(history_ack(&state, request.slide_index, result)))
}

fn history_ack(state: &AppState, slide_index: usize, result: Option<Vec<Value>>) -> HistoryAck {
    let changed = result.is_some();
    let changes = result.unwrap_or_else(|| state.live.drawing_changes(slide_index));
    HistoryAck {
        slide_index,
        changed,
        changes,
    }
}
