//! The live presentation: shared position, annotations and the channels
//! that keep every connected viewer in step.
//!
//! [`LiveDeck`] is the single owner of that state. Handlers get it through
//! an `Arc`, never through a global, so tests build as many as they like.

pub mod drawing;
pub mod events;
pub mod nav;
pub mod relay;
pub mod reload;
pub mod state;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::error::ApiError;
use crate::parser::Deck;
use crate::render::Renderer;
use crate::render::page::END_OF_DECK;
use drawing::AnnotationStore;
use events::{DeckEvent, NEXT_PREVIEW_TARGET, NOTES_TARGET, SLIDE_TARGET};
use nav::Resync;
use relay::{Relay, Subscription};
use reload::{Fingerprint, ReloadOutcome};
use state::PresentationState;

pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
const DRAWING_CHANNEL_CAPACITY: usize = 256;

/// Which event stream a viewer gets. Presenters additionally receive the
/// next-slide preview and speaker notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Audience,
    Presenter,
}

/// Everything a freshly connected viewer reads from.
pub struct Viewer {
    pub events: Subscription<DeckEvent>,
    pub drawings: broadcast::Receiver<DeckEvent>,
}

pub struct LiveDeck {
    state: RwLock<PresentationState>,
    annotations: Mutex<AnnotationStore>,
    audience: Relay<DeckEvent>,
    presenters: Relay<DeckEvent>,
    drawing_tx: broadcast::Sender<DeckEvent>,
    renderer: Arc<dyn Renderer>,
}

impl LiveDeck {
    pub fn new(deck: Deck, renderer: Arc<dyn Renderer>, queue_capacity: usize) -> Self {
        let (drawing_tx, _) = broadcast::channel(DRAWING_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(PresentationState::new(Arc::new(deck))),
            annotations: Mutex::new(AnnotationStore::new()),
            audience: Relay::new(queue_capacity),
            presenters: Relay::new(queue_capacity),
            drawing_tx,
            renderer,
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, PresentationState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, PresentationState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn store(&self) -> MutexGuard<'_, AnnotationStore> {
        self.annotations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn deck(&self) -> Arc<Deck> {
        Arc::clone(self.read().deck())
    }

    pub fn resync(&self) -> Resync {
        self.read().resync()
    }

    /// Deck and position read together under one lock.
    pub fn view(&self) -> (Arc<Deck>, Resync) {
        let state = self.read();
        (Arc::clone(state.deck()), state.resync())
    }

    pub fn viewer_count(&self) -> usize {
        self.audience.subscriber_count() + self.presenters.subscriber_count()
    }

    pub fn next(&self) -> Resync {
        self.navigate(|s| s.next())
    }

    pub fn prev(&self) -> Resync {
        self.navigate(|s| s.prev())
    }

    pub fn goto(&self, slide_index: i64, clicks: i64) -> Resync {
        self.navigate(|s| s.goto_slide(slide_index, clicks))
    }

    /// Apply a transition and broadcast it while still holding the write
    /// lock, so viewers see transitions in the order they happened.
    fn navigate(&self, transition: impl FnOnce(&mut PresentationState) -> bool) -> Resync {
        let mut state = self.write();
        let before = state.slide_index();
        if transition(&mut *state) {
            let slide_changed = state.slide_index() != before;
            self.broadcast_position(&state, slide_changed);
            debug!(
                slide_index = state.slide_index(),
                clicks = state.clicks(),
                "presenter moved"
            );
        }
        state.resync()
    }

    fn broadcast_position(&self, state: &PresentationState, slide_changed: bool) {
        if slide_changed {
            self.broadcast_content(state);
        }
        let event = DeckEvent::state(state.resync());
        self.audience.emit(&event);
        self.presenters.emit(&event);
        if slide_changed {
            let snapshot = self.drawing_snapshot(state.slide_index());
            let _ = self.drawing_tx.send(snapshot);
        }
    }

    fn broadcast_content(&self, state: &PresentationState) {
        let slide = DeckEvent::content(SLIDE_TARGET, self.slide_html(state.deck(), state.slide_index()));
        self.audience.emit(&slide);
        self.presenters.emit(&slide);
        for event in self.presenter_extras(state.deck(), state.slide_index()) {
            self.presenters.emit(&event);
        }
    }

    pub fn slide_html(&self, deck: &Deck, index: usize) -> String {
        deck.slide(index)
            .map(|slide| self.renderer.render(slide, deck))
            .unwrap_or_default()
    }

    pub fn next_preview_html(&self, deck: &Deck, index: usize) -> String {
        match deck.slide(index + 1) {
            Some(next) => self.renderer.render(next, deck),
            None => END_OF_DECK.to_string(),
        }
    }

    pub fn notes_html(&self, deck: &Deck, index: usize) -> String {
        deck.slide(index)
            .map(|slide| self.renderer.render_notes(slide))
            .unwrap_or_default()
    }

    fn presenter_extras(&self, deck: &Deck, index: usize) -> [DeckEvent; 2] {
        [
            DeckEvent::content(NEXT_PREVIEW_TARGET, self.next_preview_html(deck, index)),
            DeckEvent::content(NOTES_TARGET, self.notes_html(deck, index)),
        ]
    }

    /// Register a viewer. Its queue starts with the current content, state
    /// and drawing so it never waits for the next transition to be correct.
    pub fn subscribe(&self, role: Role) -> Viewer {
        let drawings = self.drawing_tx.subscribe();

        // Hold the read lock across registration: no transition can be
        // emitted between building the snapshot and joining the relay.
        let state = self.read();
        let deck = state.deck();
        let index = state.slide_index();

        let mut initial = vec![DeckEvent::content(SLIDE_TARGET, self.slide_html(deck, index))];
        if role == Role::Presenter {
            initial.extend(self.presenter_extras(deck, index));
        }
        initial.push(DeckEvent::state(state.resync()));
        initial.push(self.drawing_snapshot(index));

        let relay = match role {
            Role::Audience => &self.audience,
            Role::Presenter => &self.presenters,
        };
        let events = relay.subscribe_with(initial);
        drop(state);

        info!(
            subscriber_id = events.id(),
            ?role,
            viewers = self.viewer_count(),
            "viewer connected"
        );
        Viewer { events, drawings }
    }

    pub fn drawing_snapshot(&self, slide_index: usize) -> DeckEvent {
        DeckEvent::Drawing {
            slide_index,
            changes: self.drawing_changes(slide_index),
            snapshot: true,
        }
    }

    /// Change list that rebuilds a slide's annotations from nothing.
    pub fn drawing_changes(&self, slide_index: usize) -> Vec<Value> {
        self.store().snapshot(slide_index)
    }

    /// Validate and apply a batch of drawing changes, then relay them. A
    /// batch with any malformed change is rejected whole.
    pub fn apply_drawing(&self, slide_index: usize, raw: &[Value]) -> Result<usize, ApiError> {
        let total = self.read().total_slides();
        if slide_index >= total {
            return Err(ApiError::BadRequest(format!(
                "slide_index {slide_index} out of range (deck has {total} slides)"
            )));
        }
        let changes = drawing::parse_changes(raw)?;

        let mut store = self.store();
        store.apply_changes(slide_index, &changes);
        let _ = self.drawing_tx.send(DeckEvent::Drawing {
            slide_index,
            changes: changes.iter().map(|c| c.to_value()).collect(),
            snapshot: false,
        });
        Ok(changes.len())
    }

    pub fn undo_drawing(&self, slide_index: usize) -> Option<Vec<Value>> {
        let mut store = self.store();
        let snapshot = store.undo(slide_index)?;
        self.send_drawing_snapshot(slide_index, &snapshot);
        Some(snapshot)
    }

    pub fn redo_drawing(&self, slide_index: usize) -> Option<Vec<Value>> {
        let mut store = self.store();
        let snapshot = store.redo(slide_index)?;
        self.send_drawing_snapshot(slide_index, &snapshot);
        Some(snapshot)
    }

    fn send_drawing_snapshot(&self, slide_index: usize, changes: &[Value]) {
        let _ = self.drawing_tx.send(DeckEvent::Drawing {
            slide_index,
            changes: changes.to_vec(),
            snapshot: true,
        });
    }

    /// Swap in a newly parsed deck. When the deck needs reveal steps the
    /// open pages were not built for, every viewer is told to reload;
    /// otherwise the visible regions are patched in place.
    pub fn reconcile(&self, deck: Deck) -> ReloadOutcome {
        let mut state = self.write();
        let old = Fingerprint::of(state.deck());
        let new = Fingerprint::of(&deck);
        let before = state.position();

        state.reload_deck(Arc::new(deck));

        if new.grows_beyond(&old) {
            let event = DeckEvent::full_reload();
            self.audience.emit(&event);
            self.presenters.emit(&event);
            info!(
                old_max_clicks = old.max_clicks,
                new_max_clicks = new.max_clicks,
                "reveal steps grew, asking viewers to reload"
            );
            return ReloadOutcome::FullReload;
        }

        self.broadcast_content(&state);
        let event = DeckEvent::state(state.resync());
        self.audience.emit(&event);
        self.presenters.emit(&event);
        if state.slide_index() != before.slide_index {
            let _ = self.drawing_tx.send(self.drawing_snapshot(state.slide_index()));
        }
        info!(
            total_slides = state.total_slides(),
            slide_index = state.slide_index(),
            clicks = state.clicks(),
            "deck patched in place"
        );
        ReloadOutcome::Patched
    }

    #[cfg(test)]
    pub fn position(&self) -> nav::Position {
        self.read().position()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{deck_with_clicks, parse};
    use nav::Position;
    use crate::render::HtmlRenderer;
    use serde_json::json;

    fn live(clicks: &[usize]) -> LiveDeck {
        LiveDeck::new(deck_with_clicks(clicks), Arc::new(HtmlRenderer), 16)
    }

    fn drain(sub: &mut Subscription<DeckEvent>) -> Vec<DeckEvent> {
        std::iter::from_fn(|| sub.try_recv()).collect()
    }

    fn states(events: &[DeckEvent]) -> Vec<(usize, usize)> {
        events
            .iter()
            .filter_map(|e| match e {
                DeckEvent::StatePatch {
                    slide_index, clicks, ..
                } => Some((*slide_index, *clicks)),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_subscribe_gets_synthetic_state_first() {
        let live = live(&[2, 0, 1]);
        live.goto(2, 1);
        let mut viewer = live.subscribe(Role::Audience);
        let initial = drain(&mut viewer.events);

        assert_eq!(states(&initial), vec![(2, 1)]);
        assert!(matches!(&initial[0], DeckEvent::ContentPatch { target, .. } if target == SLIDE_TARGET));
        assert!(matches!(initial.last(), Some(DeckEvent::Drawing { snapshot: true, slide_index: 2, .. })));
    }

    #[test]
    fn test_presenter_subscription_includes_preview_and_notes() {
        let live = live(&[0, 0]);
        let mut presenter = live.subscribe(Role::Presenter);
        let targets: Vec<String> = drain(&mut presenter.events)
            .into_iter()
            .filter_map(|e| match e {
                DeckEvent::ContentPatch { target, .. } => Some(target),
                _ => None,
            })
            .collect();
        assert_eq!(targets, vec![SLIDE_TARGET, NEXT_PREVIEW_TARGET, NOTES_TARGET]);
    }

    #[test]
    fn test_audience_never_gets_notes() {
        let live = live(&[0, 0, 0]);
        let mut audience = live.subscribe(Role::Audience);
        live.next();
        live.next();
        for event in drain(&mut audience.events) {
            if let DeckEvent::ContentPatch { target, .. } = event {
                assert_eq!(target, SLIDE_TARGET);
            }
        }
    }

    #[test]
    fn test_navigation_broadcasts_in_order() {
        let live = live(&[2, 0, 1]);
        let mut viewer = live.subscribe(Role::Audience);
        drain(&mut viewer.events);

        for _ in 0..6 {
            live.next();
        }
        let events = drain(&mut viewer.events);
        // The sixth call is a no-op and emits nothing.
        assert_eq!(states(&events), vec![(0, 1), (0, 2), (1, 0), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_click_step_sends_no_content() {
        let live = live(&[2]);
        let mut viewer = live.subscribe(Role::Audience);
        drain(&mut viewer.events);
        live.next();
        let events = drain(&mut viewer.events);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], DeckEvent::StatePatch { clicks: 1, max_clicks: 2, .. }));
    }

    #[test]
    fn test_slide_change_sends_content_before_state() {
        let live = live(&[0, 0]);
        let mut viewer = live.subscribe(Role::Audience);
        drain(&mut viewer.events);
        live.next();
        let events = drain(&mut viewer.events);
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], DeckEvent::ContentPatch { html, .. } if html.contains("slide-1")));
        assert!(matches!(events[1], DeckEvent::StatePatch { slide_index: 1, .. }));
    }

    #[test]
    fn test_goto_returns_clamped_resync() {
        let live = live(&[2, 0, 1]);
        let resync = live.goto(5, 10);
        assert_eq!((resync.slide_index, resync.clicks, resync.max_clicks), (2, 1, 1));
        assert_eq!(live.goto(-1, 0).slide_index, 0);
    }

    #[test]
    fn test_dropped_viewers_are_unregistered() {
        let live = live(&[0, 0]);
        let viewers: Vec<Viewer> = (0..50)
            .map(|i| live.subscribe(if i % 2 == 0 { Role::Audience } else { Role::Presenter }))
            .collect();
        assert_eq!(live.viewer_count(), 50);
        drop(viewers);
        assert_eq!(live.viewer_count(), 0);
        live.next();
        assert_eq!(live.viewer_count(), 0);
    }

    #[test]
    fn test_oversized_queue_capacity_still_subscribes() {
        let live = LiveDeck::new(deck_with_clicks(&[1]), Arc::new(HtmlRenderer), 1usize << 62);
        let mut viewer = live.subscribe(Role::Audience);
        live.next();
        let events = drain(&mut viewer.events);
        assert_eq!(states(&events), vec![(0, 0), (0, 1)]);
    }

    #[tokio::test]
    async fn test_drawing_changes_are_relayed() {
        let live = live(&[0, 0]);
        let mut viewer = live.subscribe(Role::Audience);
        live.apply_drawing(0, &[json!({ "type": "create", "element": { "id": "a" } })])
            .unwrap();

        match viewer.drawings.recv().await.unwrap() {
            DeckEvent::Drawing {
                slide_index,
                changes,
                snapshot,
            } => {
                assert_eq!(slide_index, 0);
                assert!(!snapshot);
                assert_eq!(changes[0]["element"]["id"], "a");
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_malformed_drawing_applies_nothing() {
        let live = live(&[0]);
        let err = live
            .apply_drawing(
                0,
                &[
                    json!({ "type": "create", "element": { "id": "a" } }),
                    json!({ "type": "create", "element": {} }),
                ],
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        assert!(matches!(live.drawing_snapshot(0), DeckEvent::Drawing { changes, .. } if changes.is_empty()));
    }

    #[test]
    fn test_drawing_on_missing_slide_rejected() {
        let live = live(&[0]);
        assert!(live.apply_drawing(3, &[]).is_err());
    }

    #[tokio::test]
    async fn test_slide_change_sends_drawing_snapshot() {
        let live = live(&[0, 0]);
        live.apply_drawing(1, &[json!({ "type": "create", "element": { "id": "b" } })])
            .unwrap();
        let mut viewer = live.subscribe(Role::Audience);
        live.next();
        match viewer.drawings.recv().await.unwrap() {
            DeckEvent::Drawing {
                slide_index,
                snapshot,
                changes,
            } => {
                assert_eq!(slide_index, 1);
                assert!(snapshot);
                assert_eq!(changes.len(), 2);
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_undo_redo_round_trip() {
        let live = live(&[0]);
        live.apply_drawing(0, &[json!({ "type": "create", "element": { "id": "a" } })])
            .unwrap();
        assert_eq!(live.undo_drawing(0), Some(vec![]));
        assert!(live.undo_drawing(0).is_none());
        assert_eq!(live.redo_drawing(0).map(|s| s.len()), Some(2));
    }

    #[test]
    fn test_reconcile_growth_forces_reload() {
        let live = LiveDeck::new(parse("# A\n---\n# B", false).unwrap(), Arc::new(HtmlRenderer), 16);
        let mut viewer = live.subscribe(Role::Audience);
        drain(&mut viewer.events);

        let grown = parse("# A\n---\n# B\n---\n# C\n<click>1</click>\n<click>2</click>", false).unwrap();
        assert_eq!(live.reconcile(grown), ReloadOutcome::FullReload);

        let events = drain(&mut viewer.events);
        assert_eq!(events.len(), 1);
        assert!(events[0].is_full_reload());
        assert_eq!(live.deck().total(), 3);
    }

    #[test]
    fn test_reconcile_shrink_patches_and_clamps() {
        let live = live(&[0, 0, 2]);
        live.goto(2, 2);
        let mut viewer = live.subscribe(Role::Audience);
        drain(&mut viewer.events);

        assert_eq!(live.reconcile(deck_with_clicks(&[0, 1])), ReloadOutcome::Patched);
        assert_eq!(live.position(), Position::new(1, 1));

        let events = drain(&mut viewer.events);
        assert!(events.iter().all(|e| !e.is_full_reload()));
        assert!(matches!(events[0], DeckEvent::ContentPatch { .. }));
        assert!(matches!(
            events.last(),
            Some(DeckEvent::StatePatch {
                slide_index: 1,
                clicks: 1,
                total_slides: 2,
                ..
            })
        ));
    }
}
