pub mod clicks;
pub mod frontmatter;
pub mod notes;
pub mod splitter;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::DeckError;
use clicks::ClickDefaults;
use frontmatter::Frontmatter;

/// An immutable, fully parsed presentation.
///
/// Replaced wholesale on reload; never mutated in place.
#[derive(Debug, Clone)]
pub struct Deck {
    pub config: DeckConfig,
    pub slides: Vec<Slide>,
    pub filepath: Option<PathBuf>,
}

/// Deck-wide settings, taken from the first slide's frontmatter.
#[derive(Debug, Clone)]
pub struct DeckConfig {
    pub title: String,
    pub theme: Option<String>,
    pub transition: String,
    pub aspect_ratio: String,
    pub click_animation: Option<String>,
    pub click_duration: Option<u32>,
}

impl Default for DeckConfig {
    fn default() -> Self {
        Self {
            title: "Untitled".to_string(),
            theme: None,
            transition: "fade".to_string(),
            aspect_ratio: "16/9".to_string(),
            click_animation: None,
            click_duration: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Slide {
    pub index: usize,
    /// Slide body after notes extraction and click-tag expansion.
    pub content: String,
    /// The original raw markdown source text for this slide.
    pub raw: String,
    pub start_line: usize,
    pub end_line: usize,
    pub frontmatter: Frontmatter,
    pub note: String,
    pub title: String,
    /// Number of discrete reveal steps this slide supports.
    pub max_clicks: usize,
    /// `(lo, hi)` pairs for content visible only during steps `[lo, hi)`.
    pub range_clicks: BTreeSet<(usize, usize)>,
}

impl Slide {
    pub fn layout(&self) -> String {
        self.frontmatter
            .get("layout")
            .unwrap_or_else(|| "default".to_string())
    }

    pub fn transition(&self) -> Option<String> {
        self.frontmatter.get("transition")
    }

    pub fn background(&self) -> Option<String> {
        self.frontmatter.get("background")
    }
}

impl Deck {
    pub fn total(&self) -> usize {
        self.slides.len()
    }

    pub fn slide(&self, index: usize) -> Option<&Slide> {
        self.slides.get(index)
    }

    /// Reveal-step budget of a slide; slides outside the deck have none.
    pub fn max_clicks(&self, index: usize) -> usize {
        self.slides.get(index).map(|s| s.max_clicks).unwrap_or(0)
    }

    pub fn last_index(&self) -> usize {
        self.total().saturating_sub(1)
    }
}

/// Read and parse a deck from disk.
pub fn parse_deck(path: &Path, use_motion: bool) -> Result<Deck, DeckError> {
    let content = std::fs::read_to_string(path).map_err(|source| DeckError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut deck = parse(&content, use_motion)?;
    deck.filepath = Some(path.to_path_buf());
    Ok(deck)
}

/// Parse markdown source into a deck. Always yields at least one slide.
pub fn parse(content: &str, use_motion: bool) -> Result<Deck, DeckError> {
    let raw_slides = splitter::split_slides(content);

    let mut config = DeckConfig::default();
    let mut slides = Vec::with_capacity(raw_slides.len());

    for (index, raw) in raw_slides.into_iter().enumerate() {
        let (fm, body) = frontmatter::parse(&raw.text).map_err(|source| DeckError::Frontmatter {
            slide: index + 1,
            source,
        })?;

        if index == 0 {
            apply_deck_config(&mut config, &fm);
        }

        let (body, note) = notes::extract(&body);
        let defaults = ClickDefaults::resolve(&config, &fm);
        let expanded = clicks::transform_clicks_wrapper(&body);
        let result = clicks::transform_click_tags(&expanded, &defaults, use_motion);
        let title = extract_title(&body);

        slides.push(Slide {
            index,
            content: result.content,
            raw: raw.text,
            start_line: raw.start_line,
            end_line: raw.end_line,
            frontmatter: fm,
            note,
            title,
            max_clicks: result.max_clicks,
            range_clicks: result.range_clicks,
        });
    }

    if slides.is_empty() {
        return Err(DeckError::Empty);
    }

    Ok(Deck {
        config,
        slides,
        filepath: None,
    })
}

fn apply_deck_config(config: &mut DeckConfig, fm: &Frontmatter) {
    if let Some(title) = fm.get("title") {
        config.title = title;
    }
    config.theme = fm.get("theme");
    if let Some(transition) = fm.get("transition") {
        config.transition = transition;
    }
    if let Some(aspect) = fm.get("aspect-ratio").or_else(|| fm.get("aspectRatio")) {
        config.aspect_ratio = aspect;
    }
    config.click_animation = fm.get("click-animation");
    config.click_duration = fm.get("click-duration").and_then(|d| d.parse().ok());
}

/// Text of the first level-one heading, if any.
fn extract_title(body: &str) -> String {
    body.lines()
        .find_map(|line| line.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .unwrap_or_default()
}

#[cfg(test)]
pub(crate) fn deck_with_clicks(max_clicks: &[usize]) -> Deck {
    let slides = max_clicks
        .iter()
        .enumerate()
        .map(|(index, &max_clicks)| Slide {
            index,
            content: format!("# Slide {}", index + 1),
            raw: format!("# Slide {}", index + 1),
            start_line: index,
            end_line: index,
            frontmatter: Frontmatter::default(),
            note: String::new(),
            title: format!("Slide {}", index + 1),
            max_clicks,
            range_clicks: BTreeSet::new(),
        })
        .collect();
    Deck {
        config: DeckConfig::default(),
        slides,
        filepath: None,
    }
}
