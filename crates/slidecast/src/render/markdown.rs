//! A deliberately small markdown renderer: enough for headings, prose,
//! lists, quotes and code, with raw HTML lines passed through untouched.

use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph { inlines: Vec<Inline> },
    List { ordered: bool, items: Vec<ListItem> },
    CodeBlock { language: Option<String>, code: String },
    BlockQuote { inlines: Vec<Inline> },
    Html(String),
    HorizontalRule,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Inline {
    Text(String),
    Bold(Vec<Inline>),
    Italic(Vec<Inline>),
    Strikethrough(Vec<Inline>),
    Code(String),
    Link { text: Vec<Inline>, url: String },
    Image { alt: String, url: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListItem {
    pub inlines: Vec<Inline>,
    pub sublist: Option<Block>,
}

pub fn to_html(source: &str) -> String {
    let mut html = String::new();
    for block in parse_blocks(source) {
        write_block(&mut html, &block);
    }
    html
}

pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Map a deck-relative asset reference to a URL served next to the deck.
pub fn resolve_asset_url(raw: &str) -> String {
    if raw.starts_with("http://")
        || raw.starts_with("https://")
        || raw.starts_with('/')
        || raw.starts_with("data:")
    {
        raw.to_string()
    } else if let Some(rest) = raw.strip_prefix("./") {
        format!("/{rest}")
    } else {
        format!("/{raw}")
    }
}

pub fn parse_blocks(source: &str) -> Vec<Block> {
    let lines: Vec<&str> = source.lines().collect();
    let mut blocks = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i];
        let trimmed = line.trim();

        if trimmed.is_empty() {
            i += 1;
            continue;
        }

        if let Some(fence) = fence_marker(trimmed) {
            let language = trimmed[fence.len()..].trim();
            let mut code = Vec::new();
            i += 1;
            while i < lines.len() && !lines[i].trim_start().starts_with(fence) {
                code.push(lines[i]);
                i += 1;
            }
            i += 1;
            blocks.push(Block::CodeBlock {
                language: (!language.is_empty()).then(|| language.to_string()),
                code: code.join("\n"),
            });
            continue;
        }

        if trimmed.starts_with('<') {
            let start = i;
            while i < lines.len() && !lines[i].trim().is_empty() {
                i += 1;
            }
            blocks.push(Block::Html(lines[start..i].join("\n")));
            continue;
        }

        if let Some((level, text)) = heading(trimmed) {
            blocks.push(Block::Heading {
                level,
                inlines: parse_inlines(text),
            });
            i += 1;
            continue;
        }

        if trimmed == "***" || trimmed == "___" {
            blocks.push(Block::HorizontalRule);
            i += 1;
            continue;
        }

        if trimmed.starts_with('>') {
            let mut quoted = Vec::new();
            while i < lines.len() {
                let Some(rest) = lines[i].trim_start().strip_prefix('>') else {
                    break;
                };
                quoted.push(rest.trim());
                i += 1;
            }
            blocks.push(Block::BlockQuote {
                inlines: parse_inlines(&quoted.join(" ")),
            });
            continue;
        }

        if list_marker(line).is_some() {
            let mut entries: Vec<(usize, bool, String)> = Vec::new();
            while i < lines.len() {
                let current = lines[i];
                if current.trim().is_empty() {
                    break;
                }
                if let Some((indent, ordered, text)) = list_marker(current) {
                    entries.push((indent, ordered, text.to_string()));
                } else if current.starts_with([' ', '\t']) {
                    if let Some(last) = entries.last_mut() {
                        last.2.push(' ');
                        last.2.push_str(current.trim());
                    }
                } else {
                    break;
                }
                i += 1;
            }
            blocks.push(build_list(&entries));
            continue;
        }

        let mut para = Vec::new();
        while i < lines.len() {
            let current = lines[i].trim();
            if current.is_empty() || (!para.is_empty() && starts_block(lines[i])) {
                break;
            }
            para.push(current);
            i += 1;
        }
        blocks.push(Block::Paragraph {
            inlines: parse_inlines(&para.join(" ")),
        });
    }

    blocks
}

fn fence_marker(trimmed: &str) -> Option<&'static str> {
    ["```", "~~~"].into_iter().find(|f| trimmed.starts_with(f))
}

fn heading(trimmed: &str) -> Option<(u8, &str)> {
    let level = trimmed.chars().take_while(|&c| c == '#').count();
    if !(1..=6).contains(&level) {
        return None;
    }
    let rest = &trimmed[level..];
    if rest.is_empty() {
        return Some((level as u8, ""));
    }
    rest.strip_prefix(' ').map(|t| (level as u8, t.trim()))
}

/// `(indent, ordered, text)` for a list item line.
fn list_marker(line: &str) -> Option<(usize, bool, &str)> {
    let indent = line.len() - line.trim_start().len();
    let body = line.trim_start();
    for bullet in ["- ", "* ", "+ "] {
        if let Some(text) = body.strip_prefix(bullet) {
            return Some((indent, false, text.trim()));
        }
    }
    let digits = body.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        if let Some(text) = body[digits..].strip_prefix(". ") {
            return Some((indent, true, text.trim()));
        }
    }
    None
}

fn starts_block(line: &str) -> bool {
    let trimmed = line.trim();
    fence_marker(trimmed).is_some()
        || trimmed.starts_with('<')
        || trimmed.starts_with('>')
        || heading(trimmed).is_some()
        || (list_marker(line).is_some() && !line.starts_with([' ', '\t']))
}

fn build_list(entries: &[(usize, bool, String)]) -> Block {
    let base = entries.first().map(|e| e.0).unwrap_or(0);
    let ordered = entries.first().map(|e| e.1).unwrap_or(false);
    let mut items: Vec<ListItem> = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let (_, _, text) = &entries[i];
        let mut j = i + 1;
        while j < entries.len() && entries[j].0 > base {
            j += 1;
        }
        let sublist = (j > i + 1).then(|| build_list(&entries[i + 1..j]));
        items.push(ListItem {
            inlines: parse_inlines(text),
            sublist,
        });
        i = j;
    }
    Block::List { ordered, items }
}

pub fn parse_inlines(text: &str) -> Vec<Inline> {
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut rest = text;

    while let Some(c) = rest.chars().next() {
        if let Some((inline, len)) = match_inline(rest) {
            if !buf.is_empty() {
                out.push(Inline::Text(std::mem::take(&mut buf)));
            }
            out.push(inline);
            rest = &rest[len..];
        } else {
            buf.push(c);
            rest = &rest[c.len_utf8()..];
        }
    }
    if !buf.is_empty() {
        out.push(Inline::Text(buf));
    }
    out
}

fn match_inline(s: &str) -> Option<(Inline, usize)> {
    if let Some(body) = s.strip_prefix('`') {
        let end = body.find('`')?;
        return Some((Inline::Code(body[..end].to_string()), end + 2));
    }
    let spans: [(&str, fn(Vec<Inline>) -> Inline); 3] = [
        ("**", Inline::Bold),
        ("~~", Inline::Strikethrough),
        ("*", Inline::Italic),
    ];
    for (marker, wrap) in spans {
        if let Some(body) = s.strip_prefix(marker) {
            let end = body.find(marker)?;
            if end == 0 {
                return None;
            }
            return Some((wrap(parse_inlines(&body[..end])), end + 2 * marker.len()));
        }
    }
    if let Some(link) = s.strip_prefix('!') {
        let (alt, url, len) = split_link(link)?;
        return Some((
            Inline::Image {
                alt: alt.to_string(),
                url: url.to_string(),
            },
            len + 1,
        ));
    }
    if s.starts_with('[') {
        let (text, url, len) = split_link(s)?;
        return Some((
            Inline::Link {
                text: parse_inlines(text),
                url: url.to_string(),
            },
            len,
        ));
    }
    None
}

/// Split `[text](url)` into its parts and total byte length.
fn split_link(s: &str) -> Option<(&str, &str, usize)> {
    if !s.starts_with('[') {
        return None;
    }
    let close = s.find("](")?;
    let after = &s[close + 2..];
    let end = after.find(')')?;
    Some((&s[1..close], &after[..end], close + 2 + end + 1))
}

fn write_block(out: &mut String, block: &Block) {
    match block {
        Block::Heading { level, inlines } => {
            let _ = writeln!(out, "<h{level}>{}</h{level}>", inlines_html(inlines));
        }
        Block::Paragraph { inlines } => {
            let _ = writeln!(out, "<p>{}</p>", inlines_html(inlines));
        }
        Block::List { ordered, items } => {
            let tag = if *ordered { "ol" } else { "ul" };
            let _ = writeln!(out, "<{tag}>");
            for item in items {
                out.push_str("<li>");
                out.push_str(&inlines_html(&item.inlines));
                if let Some(sublist) = &item.sublist {
                    out.push('\n');
                    write_block(out, sublist);
                }
                out.push_str("</li>\n");
            }
            let _ = writeln!(out, "</{tag}>");
        }
        Block::CodeBlock { language, code } => {
            let class = language
                .as_deref()
                .map(|l| format!(" class=\"language-{}\"", escape_html(l)))
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "<pre class=\"code-block\"><code{class}>{}</code></pre>",
                escape_html(code)
            );
        }
        Block::BlockQuote { inlines } => {
            let _ = writeln!(out, "<blockquote><p>{}</p></blockquote>", inlines_html(inlines));
        }
        Block::Html(raw) => {
            out.push_str(raw);
            out.push('\n');
        }
        Block::HorizontalRule => out.push_str("<hr>\n"),
    }
}

fn inlines_html(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(s) => out.push_str(&escape_html(s)),
            Inline::Bold(children) => {
                let _ = write!(out, "<strong>{}</strong>", inlines_html(children));
            }
            Inline::Italic(children) => {
                let _ = write!(out, "<em>{}</em>", inlines_html(children));
            }
            Inline::Strikethrough(children) => {
                let _ = write!(out, "<del>{}</del>", inlines_html(children));
            }
            Inline::Code(s) => {
                let _ = write!(out, "<code>{}</code>", escape_html(s));
            }
            Inline::Link { text, url } => {
                let _ = write!(
                    out,
                    "<a href=\"{}\">{}</a>",
                    escape_html(url),
                    inlines_html(text)
                );
            }
            Inline::Image { alt, url } => {
                let _ = write!(
                    out,
                    "<img src=\"{}\" alt=\"{}\">",
                    escape_html(&resolve_asset_url(url)),
                    escape_html(alt)
                );
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_and_paragraph() {
        let html = to_html("# Title\n\nSome text\ncontinues here");
        assert_eq!(html, "<h1>Title</h1>\n<p>Some text continues here</p>\n");
    }

    #[test]
    fn test_heading_needs_space() {
        assert_eq!(
            parse_blocks("#hashtag"),
            vec![Block::Paragraph {
                inlines: vec![Inline::Text("#hashtag".into())]
            }]
        );
    }

    #[test]
    fn test_inline_formatting() {
        let html = to_html("**bold** and *it* and `x < y` and ~~gone~~");
        assert!(html.contains("<strong>bold</strong>"));
        assert!(html.contains("<em>it</em>"));
        assert!(html.contains("<code>x &lt; y</code>"));
        assert!(html.contains("<del>gone</del>"));
    }

    #[test]
    fn test_link_and_image() {
        let html = to_html("[site](https://example.com) ![logo](./logo.png)");
        assert!(html.contains("<a href=\"https://example.com\">site</a>"));
        assert!(html.contains("<img src=\"/logo.png\" alt=\"logo\">"));
    }

    #[test]
    fn test_unclosed_markers_are_text() {
        let html = to_html("2 * 3 = 6 and [not a link");
        assert_eq!(html, "<p>2 * 3 = 6 and [not a link</p>\n");
    }

    #[test]
    fn test_text_is_escaped() {
        assert_eq!(to_html("a & b > c"), "<p>a &amp; b &gt; c</p>\n");
    }

    #[test]
    fn test_lists() {
        let html = to_html("- one\n- two\n  - nested\n- three");
        assert!(html.starts_with("<ul>\n<li>one</li>\n<li>two\n<ul>\n<li>nested</li>\n</ul>\n</li>"));
        assert!(html.contains("<li>three</li>"));

        let ordered = to_html("1. first\n2. second");
        assert!(ordered.starts_with("<ol>"));
    }

    #[test]
    fn test_code_block_escaped() {
        let html = to_html("```rust\nlet x = a < b;\n```");
        assert_eq!(
            html,
            "<pre class=\"code-block\"><code class=\"language-rust\">let x = a &lt; b;</code></pre>\n"
        );
    }

    #[test]
    fn test_raw_html_passthrough() {
        let src = "<div class=\"click-reveal\" data-click=\"1\">\n\nHello\n\n</div>";
        assert_eq!(
            to_html(src),
            "<div class=\"click-reveal\" data-click=\"1\">\n<p>Hello</p>\n</div>\n"
        );
    }

    #[test]
    fn test_blockquote() {
        assert_eq!(
            to_html("> quoted\n> text"),
            "<blockquote><p>quoted text</p></blockquote>\n"
        );
    }

    #[test]
    fn test_resolve_asset_url() {
        assert_eq!(resolve_asset_url("./bg.jpg"), "/bg.jpg");
        assert_eq!(resolve_asset_url("img/bg.jpg"), "/img/bg.jpg");
        assert_eq!(resolve_asset_url("https://x.io/a.png"), "https://x.io/a.png");
        assert_eq!(resolve_asset_url("/abs.png"), "/abs.png");
    }
}
