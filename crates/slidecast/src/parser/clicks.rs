//! Progressive-reveal tags.
//!
//! `<click>` claims the next sequential step, `<after>` shares the previous
//! one, `at="N"` pins an explicit step and `at="lo-hi"` shows content only
//! while `lo <= clicks < hi`. `hide` inverts visibility. `<clicks>` expands
//! every paragraph inside it into its own `<click>`.

use regex::{Captures, Regex};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use super::DeckConfig;
use super::frontmatter::Frontmatter;

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?ms)^[ \t]*(?:```|~~~)[^\n]*\n.*?^[ \t]*(?:```|~~~)[ \t]*$").expect("valid regex")
});
static INLINE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`[^`\n]+`").expect("valid regex"));
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{1}(\\d+)\u{1}").expect("valid regex"));
static CLICKS_WRAPPER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<clicks\b([^>]*)>(.*?)</clicks>").expect("valid regex"));
static PARAGRAPH_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));
static CLICK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(click|after)((?:\s[^>]*)?)>(.*?)</(?:click|after)>").expect("valid regex")
});
static ATTRIBUTE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"([\w-]+)(?:\s*=\s*"([^"]*)")?"#).expect("valid regex"));

const MOTION_KEYS: &[&str] = &["x", "y", "scale", "rotate", "opacity"];

/// Animation settings applied to reveals that don't override them inline.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickDefaults {
    pub animation: String,
    pub duration: Option<u32>,
    pub spring: Option<String>,
    pub ease: Option<String>,
    pub delay: Option<u32>,
}

impl Default for ClickDefaults {
    fn default() -> Self {
        Self {
            animation: "fade".to_string(),
            duration: None,
            spring: None,
            ease: None,
            delay: None,
        }
    }
}

impl ClickDefaults {
    /// Slide frontmatter wins over deck config, which wins over built-ins.
    pub fn resolve(config: &DeckConfig, fm: &Frontmatter) -> Self {
        let base = Self::default();
        Self {
            animation: fm
                .get("click-animation")
                .or_else(|| config.click_animation.clone())
                .unwrap_or(base.animation),
            duration: fm
                .get("click-duration")
                .and_then(|d| d.parse().ok())
                .or(config.click_duration),
            spring: fm.get("click-spring"),
            ease: fm.get("click-ease"),
            delay: fm.get("click-delay").and_then(|d| d.parse().ok()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClickResult {
    pub content: String,
    pub max_clicks: usize,
    pub range_clicks: BTreeSet<(usize, usize)>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Step {
    At(usize),
    Range(usize, usize),
}

impl Step {
    fn label(self) -> String {
        match self {
            Step::At(n) => n.to_string(),
            Step::Range(lo, hi) => format!("{lo}-{hi}"),
        }
    }

    fn condition(self) -> String {
        match self {
            Step::At(n) => format!("$clicks >= {n}"),
            Step::Range(lo, hi) => format!("$clicks >= {lo} && $clicks < {hi}"),
        }
    }

    fn signal(self) -> String {
        match self {
            Step::At(n) => format!("vis{n}"),
            Step::Range(lo, hi) => format!("vis_{lo}_{hi}"),
        }
    }

    fn parse_at(value: &str) -> Option<Step> {
        match value.split_once('-') {
            Some((lo, hi)) => {
                let lo = lo.trim().parse().ok()?;
                let hi = hi.trim().parse().ok()?;
                (lo < hi).then_some(Step::Range(lo, hi))
            }
            None => value.trim().parse().ok().map(Step::At),
        }
    }
}

struct Tag<'a> {
    start: usize,
    end: usize,
    is_after: bool,
    attrs: BTreeMap<String, Option<String>>,
    inner: &'a str,
}

impl Tag<'_> {
    fn hide(&self) -> bool {
        self.attrs.contains_key("hide")
    }

    fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).and_then(|v| v.as_deref())
    }
}

/// Expand `<clicks>` wrappers into one `<click>` per non-empty paragraph,
/// carrying the wrapper's attributes onto each.
pub fn transform_clicks_wrapper(content: &str) -> String {
    let (text, stash) = protect_code(content);
    let expanded = CLICKS_WRAPPER.replace_all(&text, |caps: &Captures| {
        let attrs = &caps[1];
        PARAGRAPH_BREAK
            .split(&caps[2])
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| format!("<click{attrs}>{p}</click>"))
            .collect::<Vec<_>>()
            .join("\n\n")
    });
    restore_code(&expanded, &stash)
}

/// Replace reveal tags with step-annotated wrappers and count the steps.
///
/// `max_clicks` is the larger of the sequential counter and the highest
/// explicit step (or range end) seen on the slide.
pub fn transform_click_tags(content: &str, defaults: &ClickDefaults, use_motion: bool) -> ClickResult {
    let (text, stash) = protect_code(content);
    let tags = scan_tags(&text);

    let mut out = String::with_capacity(text.len());
    let mut counter = 0usize;
    let mut highest = 0usize;
    let mut last: Option<Step> = None;
    let mut range_clicks = BTreeSet::new();
    let mut pending_hide: Option<String> = None;
    let mut cursor = 0usize;

    for tag in &tags {
        let step = if tag.is_after {
            *last.get_or_insert(Step::At(1))
        } else {
            let step = match tag.attr("at").and_then(Step::parse_at) {
                Some(step) => step,
                None => {
                    counter += 1;
                    Step::At(counter)
                }
            };
            last = Some(step);
            step
        };

        match step {
            Step::At(n) => highest = highest.max(n),
            Step::Range(lo, hi) => {
                highest = highest.max(hi);
                range_clicks.insert((lo, hi));
            }
        }

        let html = render_tag(tag, step, defaults, use_motion);
        let gap = &text[cursor..tag.start];
        cursor = tag.end;

        if let Some(hidden) = pending_hide.take() {
            if tag.is_after && !tag.hide() && gap.trim().is_empty() {
                out.push_str(&format!("<div class=\"click-swap\">{hidden}{gap}{html}</div>"));
                continue;
            }
            out.push_str(&hidden);
        }

        out.push_str(gap);
        if tag.hide() && !tag.is_after {
            pending_hide = Some(html);
        } else {
            out.push_str(&html);
        }
    }

    if let Some(hidden) = pending_hide {
        out.push_str(&hidden);
    }
    out.push_str(&text[cursor..]);

    ClickResult {
        content: restore_code(&out, &stash),
        max_clicks: counter.max(highest),
        range_clicks,
    }
}

fn scan_tags(text: &str) -> Vec<Tag<'_>> {
    CLICK_TAG
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let attrs = ATTRIBUTE
                .captures_iter(caps.get(2).map_or("", |m| m.as_str()))
                .map(|a| (a[1].to_string(), a.get(2).map(|v| v.as_str().to_string())))
                .collect();
            Some(Tag {
                start: whole.start(),
                end: whole.end(),
                is_after: &caps[1] == "after",
                attrs,
                inner: caps.get(3).map_or("", |m| m.as_str()),
            })
        })
        .collect()
}

fn render_tag(tag: &Tag<'_>, step: Step, defaults: &ClickDefaults, use_motion: bool) -> String {
    let label = step.label();
    let cond = step.condition();
    let inner = tag.inner.trim();

    // Hidden content always fades with CSS so it keeps its layout slot.
    if tag.hide() {
        return format!(
            "<div class=\"click-hide\" data-click=\"{label}\" data-class:click-hidden=\"{cond}\">\n\n{inner}\n\n</div>"
        );
    }

    if !use_motion {
        return format!(
            "<div class=\"click-reveal\" data-click=\"{label}\" data-class:revealed=\"{cond}\">\n\n{inner}\n\n</div>"
        );
    }

    format!(
        "<div class=\"click-motion\" data-click=\"{label}\" data-motion=\"{}\">\n\n{inner}\n\n</div>",
        motion_spec(tag, step, defaults)
    )
}

fn motion_spec(tag: &Tag<'_>, step: Step, defaults: &ClickDefaults) -> String {
    let preset = tag.attr("animation").unwrap_or(defaults.animation.as_str());
    let mut parts = vec![
        format!("enter_preset:{preset}"),
        format!("signal:${}", step.signal()),
    ];

    let duration = tag
        .attr("duration")
        .map(str::to_string)
        .or_else(|| defaults.duration.map(|d| d.to_string()));
    let spring = tag.attr("spring").map(str::to_string).or_else(|| defaults.spring.clone());
    let ease = tag.attr("ease").map(str::to_string).or_else(|| defaults.ease.clone());
    let delay = tag
        .attr("delay")
        .map(str::to_string)
        .or_else(|| defaults.delay.map(|d| d.to_string()));

    for (key, value) in [("duration", duration), ("spring", spring), ("ease", ease), ("delay", delay)] {
        if let Some(value) = value {
            parts.push(format!("{key}:{value}"));
        }
    }

    for key in MOTION_KEYS {
        if let Some(value) = tag.attr(key) {
            parts.push(format!("enter_{key}:{value}"));
        }
    }

    for (key, value) in &tag.attrs {
        if let (Some(rest), Some(value)) = (key.strip_prefix("exit-"), value) {
            parts.push(format!("exit_{rest}:{value}"));
        }
    }

    parts.join(",")
}

/// Swap fenced code and inline code spans for placeholders so tags inside
/// them are left alone.
fn protect_code(content: &str) -> (String, Vec<String>) {
    let mut stash = Vec::new();
    let fenced = CODE_FENCE
        .replace_all(content, |m: &Captures| stash_placeholder(&mut stash, &m[0]))
        .into_owned();
    let text = INLINE_CODE
        .replace_all(&fenced, |m: &Captures| stash_placeholder(&mut stash, &m[0]))
        .into_owned();
    (text, stash)
}

fn stash_placeholder(stash: &mut Vec<String>, code: &str) -> String {
    stash.push(code.to_string());
    format!("\u{1}{}\u{1}", stash.len() - 1)
}

fn restore_code(text: &str, stash: &[String]) -> String {
    if stash.is_empty() {
        return text.to_string();
    }
    PLACEHOLDER
        .replace_all(text, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|i| stash.get(i).cloned())
                .unwrap_or_default()
        })
        .into_owned()
}
