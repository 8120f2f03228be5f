use regex::Regex;
use std::sync::LazyLock;

static FRONTMATTER_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][\w-]*\s*:(\s.*)?$").expect("valid regex"));

/// One slide's source text with its line span in the original document.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSlide {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

struct Chunk {
    lines: Vec<String>,
    start_line: usize,
}

impl Chunk {
    fn text(&self) -> String {
        self.lines.join("\n")
    }

    fn end_line(&self) -> usize {
        (self.start_line + self.lines.len()).saturating_sub(1).max(self.start_line)
    }
}

/// Split a document into slides on lines that are exactly `---`.
///
/// A `---` / `key: value` / `---` sandwich between two slides is treated as
/// frontmatter for the following slide, not as an empty slide. A delimiter at
/// the very start of the document opens the first slide's frontmatter.
pub fn split_slides(content: &str) -> Vec<RawSlide> {
    let content = content.replace("\r\n", "\n");
    let chunks = split_on_delimiters(&content);

    let mut slides = Vec::new();
    let mut i = 0;
    while i < chunks.len() {
        let chunk = &chunks[i];

        // Leading empty chunk before an opening frontmatter block.
        if i == 0
            && chunk.lines.is_empty()
            && chunks.len() > 2
            && is_frontmatter_block(&chunks[1].lines)
        {
            i += 1;
            continue;
        }

        if i > 0 && i + 1 < chunks.len() && is_frontmatter_block(&chunk.lines) {
            let body = &chunks[i + 1];
            slides.push(RawSlide {
                text: format!("---\n{}\n---\n{}", chunk.text(), body.text()),
                start_line: chunk.start_line.saturating_sub(1),
                end_line: body.end_line(),
            });
            i += 2;
            continue;
        }

        slides.push(RawSlide {
            text: chunk.text(),
            start_line: chunk.start_line,
            end_line: chunk.end_line(),
        });
        i += 1;
    }

    if slides.is_empty() {
        slides.push(RawSlide {
            text: String::new(),
            start_line: 0,
            end_line: 0,
        });
    }
    slides
}

fn split_on_delimiters(content: &str) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current = Chunk {
        lines: Vec::new(),
        start_line: 0,
    };
    let mut in_code_fence = false;

    for (i, line) in content.split('\n').enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with("```") || trimmed.starts_with("~~~") {
            in_code_fence = !in_code_fence;
        }

        if !in_code_fence && is_delimiter(line) {
            let next = Chunk {
                lines: Vec::new(),
                start_line: i + 1,
            };
            chunks.push(std::mem::replace(&mut current, next));
        } else {
            current.lines.push(line.to_string());
        }
    }

    // A trailing delimiter does not open an empty final slide.
    if !current.lines.is_empty() || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn is_delimiter(line: &str) -> bool {
    line.starts_with("---") && line.trim_end() == "---"
}

/// Every non-blank line is a `key:` or `key: value` pair (or an indented
/// continuation of one), and there is at least one such pair.
fn is_frontmatter_block(lines: &[String]) -> bool {
    let mut saw_key = false;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        if FRONTMATTER_KEY.is_match(line) {
            saw_key = true;
        } else if !(saw_key && line.starts_with([' ', '\t'])) {
            return false;
        }
    }
    saw_key
}
