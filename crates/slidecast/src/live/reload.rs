use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, warn};

use super::LiveDeck;
use crate::error::DeckError;
use crate::parser::{self, Deck};

/// The reveal-step shape a rendered page was built for.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fingerprint {
    pub max_clicks: usize,
    pub ranges: BTreeSet<(usize, usize)>,
}

impl Fingerprint {
    pub fn of(deck: &Deck) -> Self {
        Self {
            max_clicks: deck.slides.iter().map(|s| s.max_clicks).max().unwrap_or(0),
            ranges: deck
                .slides
                .iter()
                .flat_map(|s| s.range_clicks.iter().copied())
                .collect(),
        }
    }

    /// Whether `self` needs any step count or range that `old` lacked.
    pub fn grows_beyond(&self, old: &Fingerprint) -> bool {
        self.max_clicks > old.max_clicks || !self.ranges.is_subset(&old.ranges)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Content and slide count were patched into open pages.
    Patched,
    /// Viewers were told to reload the page.
    FullReload,
    /// The new source did not parse; the previous deck stays live.
    Failed,
}

/// Where decks come from.
pub trait DeckSource: Send + Sync {
    fn load(&self) -> Result<Deck, DeckError>;
}

pub struct FileSource {
    pub path: PathBuf,
    pub use_motion: bool,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>, use_motion: bool) -> Self {
        Self {
            path: path.into(),
            use_motion,
        }
    }
}

impl DeckSource for FileSource {
    fn load(&self) -> Result<Deck, DeckError> {
        parser::parse_deck(&self.path, self.use_motion)
    }
}

/// Re-reads the deck when told something changed and reconciles the live
/// presentation with it.
pub struct ReloadCoordinator {
    source: Box<dyn DeckSource>,
    live: Arc<LiveDeck>,
}

impl ReloadCoordinator {
    pub fn new(source: Box<dyn DeckSource>, live: Arc<LiveDeck>) -> Self {
        Self { source, live }
    }

    /// Parse first, without touching shared state; only a successful parse
    /// reaches the live deck.
    pub fn reload(&self) -> ReloadOutcome {
        let deck = match self.source.load() {
            Ok(deck) => deck,
            Err(e) => {
                warn!(error = %e, "reload failed, keeping previous deck");
                return ReloadOutcome::Failed;
            }
        };
        debug!(slides = deck.total(), "deck re-parsed");
        self.live.reconcile(deck)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::Role;
    use crate::live::events::DeckEvent;
    use crate::parser::deck_with_clicks;
    use crate::render::HtmlRenderer;

    fn fingerprint(clicks: &[usize], ranges: &[(usize, usize)]) -> Fingerprint {
        Fingerprint {
            max_clicks: clicks.iter().copied().max().unwrap_or(0),
            ranges: ranges.iter().copied().collect(),
        }
    }

    #[test]
    fn test_fingerprint_of_deck() {
        let deck = parser::parse("# A\n<click at=\"1-3\">x</click>\n---\n# B\n<click>y</click>", false).unwrap();
        let fp = Fingerprint::of(&deck);
        assert_eq!(fp.max_clicks, 3);
        assert_eq!(fp.ranges, BTreeSet::from([(1, 3)]));
    }

    #[test]
    fn test_growth_rules() {
        let old = fingerprint(&[2], &[(1, 2)]);
        assert!(!fingerprint(&[2], &[(1, 2)]).grows_beyond(&old));
        assert!(!fingerprint(&[1], &[]).grows_beyond(&old));
        assert!(fingerprint(&[3], &[(1, 2)]).grows_beyond(&old));
        assert!(fingerprint(&[2], &[(0, 1)]).grows_beyond(&old));
    }

    fn write(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("slides.md");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn setup(content: &str) -> (tempfile::TempDir, Arc<LiveDeck>, ReloadCoordinator) {
        let dir = tempfile::tempdir().unwrap();
        let path = write(&dir, content);
        let deck = parser::parse_deck(&path, false).unwrap();
        let live = Arc::new(LiveDeck::new(deck, Arc::new(HtmlRenderer), 16));
        let coordinator = ReloadCoordinator::new(Box::new(FileSource::new(path, false)), Arc::clone(&live));
        (dir, live, coordinator)
    }

    #[test]
    fn test_added_reveal_steps_force_full_reload() {
        let (dir, live, coordinator) = setup("# One\n---\n# Two");
        let mut viewer = live.subscribe(Role::Audience);
        while viewer.events.try_recv().is_some() {}

        write(&dir, "# One\n---\n# Two\n---\n# Three\n<click>a</click>\n<click>b</click>");
        assert_eq!(coordinator.reload(), ReloadOutcome::FullReload);
        assert!(viewer.events.try_recv().is_some_and(|e| e.is_full_reload()));
    }

    #[test]
    fn test_edit_without_new_steps_patches() {
        let (dir, live, coordinator) = setup("# One\n<click>a</click>\n---\n# Two");
        let mut viewer = live.subscribe(Role::Audience);
        while viewer.events.try_recv().is_some() {}

        write(&dir, "# One edited\n<click>a</click>\n---\n# Two\n---\n# Three");
        assert_eq!(coordinator.reload(), ReloadOutcome::Patched);

        let events: Vec<DeckEvent> = std::iter::from_fn(|| viewer.events.try_recv()).collect();
        assert!(matches!(&events[0], DeckEvent::ContentPatch { html, .. } if html.contains("One edited")));
        assert!(matches!(events.last(), Some(DeckEvent::StatePatch { total_slides: 3, .. })));
    }

    #[test]
    fn test_parse_failure_keeps_old_deck_and_stays_quiet() {
        let (dir, live, coordinator) = setup("# One\n---\n# Two");
        live.next();
        let mut viewer = live.subscribe(Role::Audience);
        while viewer.events.try_recv().is_some() {}

        write(&dir, "# One\n---\nlayout: [broken\n---\n# Two");
        assert_eq!(coordinator.reload(), ReloadOutcome::Failed);
        assert_eq!(live.deck().total(), 2);
        assert_eq!(live.resync().slide_index, 1);
        assert!(viewer.events.try_recv().is_none());
    }

    #[test]
    fn test_missing_file_fails_softly() {
        let (dir, live, coordinator) = setup("# One");
        drop(dir);
        assert_eq!(coordinator.reload(), ReloadOutcome::Failed);
        assert_eq!(live.deck().total(), 1);
    }

    struct Fixed(Vec<usize>);

    impl DeckSource for Fixed {
        fn load(&self) -> Result<Deck, DeckError> {
            Ok(deck_with_clicks(&self.0))
        }
    }

    #[test]
    fn test_removed_slides_only_clamp() {
        let live = Arc::new(LiveDeck::new(deck_with_clicks(&[0, 0, 0, 0]), Arc::new(HtmlRenderer), 16));
        live.goto(3, 0);
        let coordinator = ReloadCoordinator::new(Box::new(Fixed(vec![0, 0])), Arc::clone(&live));
        assert_eq!(coordinator.reload(), ReloadOutcome::Patched);
        assert_eq!(live.resync().slide_index, 1);
    }
}
