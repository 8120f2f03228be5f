use regex::Regex;
use std::sync::LazyLock;

static NOTES_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--\s*notes\b(.*?)-->").expect("valid regex"));

/// Remove `<!-- notes ... -->` blocks from a slide body.
///
/// Returns `(body, notes)`. Multiple blocks are joined with blank lines;
/// ordinary HTML comments stay in the body.
pub fn extract(content: &str) -> (String, String) {
    if !NOTES_BLOCK.is_match(content) {
        return (content.to_string(), String::new());
    }

    let notes: Vec<String> = NOTES_BLOCK
        .captures_iter(content)
        .map(|c| c[1].trim().to_string())
        .filter(|n| !n.is_empty())
        .collect();
    let body = NOTES_BLOCK.replace_all(content, "").trim_end().to_string();
    (body, notes.join("\n\n"))
}
