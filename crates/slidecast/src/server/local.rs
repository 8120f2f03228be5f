//! Read-only handlers. Local navigation computes a position from what the
//! caller sends and answers only that caller; shared state is never touched.

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::AppState;
use super::params::{self, SlidePath};
use crate::error::ApiError;
use crate::live::nav::{self, Position, Resync};
use crate::parser::Deck;

#[derive(Debug, Default, Deserialize)]
pub struct LocalQuery {
    #[serde(default, deserialize_with = "params::saturating_opt")]
    pub slide_index: Option<i64>,
    #[serde(default, deserialize_with = "params::saturating_opt")]
    pub clicks: Option<i64>,
}

/// Resync plus the target slide's markup, so the client can place itself
/// in one step.
#[derive(Debug, Serialize)]
pub struct LocalView {
    #[serde(flatten)]
    pub resync: Resync,
    pub html: String,
}

fn respond(state: &AppState, deck: &Deck, pos: Position) -> Json<LocalView> {
    Json(LocalView {
        resync: Resync::of(deck, pos),
        html: state.live.slide_html(deck, pos.slide_index),
    })
}

fn caller_position(deck: &Deck, query: &LocalQuery) -> Position {
    nav::clamp_position(
        deck,
        query.slide_index.unwrap_or(0),
        query.clicks.unwrap_or(0),
    )
}

pub async fn next(State(state): State<AppState>, Query(query): Query<LocalQuery>) -> Json<LocalView> {
    let deck = state.live.deck();
    let pos = nav::next_position(&deck, caller_position(&deck, &query));
    respond(&state, &deck, pos)
}

pub async fn prev(State(state): State<AppState>, Query(query): Query<LocalQuery>) -> Json<LocalView> {
    let deck = state.live.deck();
    let pos = nav::prev_position(&deck, caller_position(&deck, &query));
    respond(&state, &deck, pos)
}

/// Jump target comes from the path; `clicks` is clamped to that slide
/// exactly like a presenter `goto`.
pub async fn goto(
    State(state): State<AppState>,
    Path(SlidePath { idx }): Path<SlidePath>,
    Query(query): Query<LocalQuery>,
) -> Json<LocalView> {
    let deck = state.live.deck();
    let pos = nav::clamp_position(&deck, idx, query.clicks.unwrap_or(0));
    respond(&state, &deck, pos)
}

pub async fn current(State(state): State<AppState>) -> Json<Resync> {
    Json(state.live.resync())
}

pub async fn drawing(
    State(state): State<AppState>,
    Path(slide): Path<usize>,
) -> Result<Json<Value>, ApiError> {
    if slide >= state.live.deck().total() {
        return Err(ApiError::NotFound(format!("slide {slide}")));
    }
    Ok(Json(state.live.drawing_snapshot(slide).payload()))
}
