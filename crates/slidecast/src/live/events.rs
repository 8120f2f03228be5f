use axum::response::sse::Event;
use serde_json::{Value, json};

use super::nav::Resync;

/// DOM region ids patched by [`DeckEvent::ContentPatch`].
pub const SLIDE_TARGET: &str = "slide-content";
pub const NEXT_PREVIEW_TARGET: &str = "presenter-next";
pub const NOTES_TARGET: &str = "presenter-notes-content";

pub const RELOAD_SCRIPT: &str = "window.location.reload()";

/// Everything pushed to connected viewers.
///
/// Each variant carries complete values for the fields it touches, so a
/// viewer that missed earlier events is correct again after the next one.
#[derive(Debug, Clone, PartialEq)]
pub enum DeckEvent {
    StatePatch {
        slide_index: usize,
        clicks: usize,
        max_clicks: usize,
        total_slides: usize,
    },
    ContentPatch {
        target: String,
        html: String,
    },
    Script {
        code: String,
    },
    Drawing {
        slide_index: usize,
        changes: Vec<Value>,
        snapshot: bool,
    },
}

impl DeckEvent {
    pub fn state(resync: Resync) -> Self {
        DeckEvent::StatePatch {
            slide_index: resync.slide_index,
            clicks: resync.clicks,
            max_clicks: resync.max_clicks,
            total_slides: resync.total_slides,
        }
    }

    pub fn content(target: &str, html: impl Into<String>) -> Self {
        DeckEvent::ContentPatch {
            target: target.to_string(),
            html: html.into(),
        }
    }

    pub fn full_reload() -> Self {
        DeckEvent::Script {
            code: RELOAD_SCRIPT.to_string(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            DeckEvent::StatePatch { .. } => "state",
            DeckEvent::ContentPatch { .. } => "content",
            DeckEvent::Script { .. } => "script",
            DeckEvent::Drawing { .. } => "drawing",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            DeckEvent::StatePatch {
                slide_index,
                clicks,
                max_clicks,
                total_slides,
            } => json!({
                "slide_index": slide_index,
                "clicks": clicks,
                "max_clicks": max_clicks,
                "total_slides": total_slides,
            }),
            DeckEvent::ContentPatch { target, html } => json!({
                "target": target,
                "html": html,
            }),
            DeckEvent::Script { code } => json!({ "code": code }),
            DeckEvent::Drawing {
                slide_index,
                changes,
                snapshot,
            } => json!({
                "slide_index": slide_index,
                "changes": changes,
                "snapshot": snapshot,
            }),
        }
    }

    #[cfg(test)]
    pub fn is_full_reload(&self) -> bool {
        matches!(self, DeckEvent::Script { code } if code == RELOAD_SCRIPT)
    }

    /// Wire form: one named SSE event with a single JSON data line.
    pub fn to_sse(&self) -> Event {
        Event::default()
            .event(self.name())
            .data(self.payload().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_payload_has_all_fields() {
        let event = DeckEvent::StatePatch {
            slide_index: 2,
            clicks: 1,
            max_clicks: 3,
            total_slides: 5,
        };
        assert_eq!(event.name(), "state");
        let payload = event.payload();
        assert_eq!(payload["slide_index"], 2);
        assert_eq!(payload["clicks"], 1);
        assert_eq!(payload["max_clicks"], 3);
        assert_eq!(payload["total_slides"], 5);
    }

    #[test]
    fn test_event_names() {
        assert_eq!(DeckEvent::content(SLIDE_TARGET, "<p>x</p>").name(), "content");
        assert_eq!(DeckEvent::full_reload().name(), "script");
        let drawing = DeckEvent::Drawing {
            slide_index: 0,
            changes: vec![],
            snapshot: true,
        };
        assert_eq!(drawing.name(), "drawing");
        assert_eq!(drawing.payload()["snapshot"], true);
    }

    #[test]
    fn test_full_reload_detection() {
        assert!(DeckEvent::full_reload().is_full_reload());
        assert!(
            !DeckEvent::Script {
                code: "console.log(1)".into()
            }
            .is_full_reload()
        );
        assert!(!DeckEvent::content(SLIDE_TARGET, "").is_full_reload());
    }

    #[test]
    fn test_content_payload() {
        let payload = DeckEvent::content(NOTES_TARGET, "<p>n</p>").payload();
        assert_eq!(payload["target"], NOTES_TARGET);
        assert_eq!(payload["html"], "<p>n</p>");
    }
}
