//! Position arithmetic shared by the presenter state machine and the
//! per-viewer local navigation handlers.
//!
//! Both paths go through [`clamp_position`], [`next_position`] and
//! [`prev_position`] so a deep link, a presenter `goto` and a local browse
//! all land on the same slide and step for the same input.

use serde::Serialize;

use crate::parser::Deck;

/// A slide index together with the number of revealed steps on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Position {
    pub slide_index: usize,
    pub clicks: usize,
}

impl Position {
    pub fn new(slide_index: usize, clicks: usize) -> Self {
        Self {
            slide_index,
            clicks,
        }
    }
}

/// Clamp an arbitrary (possibly negative or huge) pair into the deck.
pub fn clamp_position(deck: &Deck, slide_index: i64, clicks: i64) -> Position {
    let slide_index = slide_index.clamp(0, deck.last_index() as i64) as usize;
    let max = deck.max_clicks(slide_index) as i64;
    let clicks = clicks.clamp(0, max) as usize;
    Position::new(slide_index, clicks)
}

/// One step forward: reveal the next step, or move to the next slide, or
/// stay put at the very end.
pub fn next_position(deck: &Deck, pos: Position) -> Position {
    let pos = clamp_position(deck, pos.slide_index as i64, pos.clicks as i64);
    if pos.clicks < deck.max_clicks(pos.slide_index) {
        Position::new(pos.slide_index, pos.clicks + 1)
    } else if pos.slide_index < deck.last_index() {
        Position::new(pos.slide_index + 1, 0)
    } else {
        pos
    }
}

/// One step back. Leaving a slide backwards lands on the previous slide
/// fully revealed.
pub fn prev_position(deck: &Deck, pos: Position) -> Position {
    let pos = clamp_position(deck, pos.slide_index as i64, pos.clicks as i64);
    if pos.clicks > 0 {
        Position::new(pos.slide_index, pos.clicks - 1)
    } else if pos.slide_index > 0 {
        let prev = pos.slide_index - 1;
        Position::new(prev, deck.max_clicks(prev))
    } else {
        pos
    }
}

/// Everything a client needs to place itself, sent as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Resync {
    pub slide_index: usize,
    pub clicks: usize,
    pub max_clicks: usize,
    pub total_slides: usize,
}

impl Resync {
    pub fn of(deck: &Deck, pos: Position) -> Self {
        Self {
            slide_index: pos.slide_index,
            clicks: pos.clicks,
            max_clicks: deck.max_clicks(pos.slide_index),
            total_slides: deck.total(),
        }
    }
}
