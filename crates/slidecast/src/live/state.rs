use std::sync::Arc;

use super::nav::{self, Position, Resync};
use crate::parser::Deck;

/// Where the presentation currently is.
///
/// Mutating operations return `true` when the position actually changed so
/// the caller knows whether to broadcast.
#[derive(Debug, Clone)]
pub struct PresentationState {
    deck: Arc<Deck>,
    slide_index: usize,
    clicks: usize,
}

impl PresentationState {
    pub fn new(deck: Arc<Deck>) -> Self {
        Self {
            deck,
            slide_index: 0,
            clicks: 0,
        }
    }

    pub fn deck(&self) -> &Arc<Deck> {
        &self.deck
    }

    pub fn slide_index(&self) -> usize {
        self.slide_index
    }

    pub fn clicks(&self) -> usize {
        self.clicks
    }

    #[cfg(test)]
    pub fn max_clicks(&self) -> usize {
        self.deck.max_clicks(self.slide_index)
    }

    pub fn total_slides(&self) -> usize {
        self.deck.total()
    }

    pub fn position(&self) -> Position {
        Position::new(self.slide_index, self.clicks)
    }

    pub fn resync(&self) -> Resync {
        Resync::of(&self.deck, self.position())
    }

    pub fn next(&mut self) -> bool {
        let target = nav::next_position(&self.deck, self.position());
        self.set(target)
    }

    pub fn prev(&mut self) -> bool {
        let target = nav::prev_position(&self.deck, self.position());
        self.set(target)
    }

    /// Jump anywhere; out-of-range input is clamped, never rejected.
    pub fn goto_slide(&mut self, slide_index: i64, clicks: i64) -> bool {
        let target = nav::clamp_position(&self.deck, slide_index, clicks);
        self.set(target)
    }

    /// Swap in a freshly parsed deck and pull the position back inside it.
    pub fn reload_deck(&mut self, deck: Arc<Deck>) {
        self.deck = deck;
        let pos = nav::clamp_position(&self.deck, self.slide_index as i64, self.clicks as i64);
        self.slide_index = pos.slide_index;
        self.clicks = pos.clicks;
    }

    fn set(&mut self, target: Position) -> bool {
        if target == self.position() {
            return false;
        }
        self.slide_index = target.slide_index;
        self.clicks = target.clicks;
        true
    }
}
