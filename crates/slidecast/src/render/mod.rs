pub mod markdown;
pub mod page;

use crate::parser::{Deck, Slide};

use markdown::{escape_html, resolve_asset_url};

const IMAGE_LAYOUTS: &[&str] = &["image-left", "image-right", "hero", "caption"];

/// Turns slides into markup the live view can patch in.
pub trait Renderer: Send + Sync {
    fn render(&self, slide: &Slide, deck: &Deck) -> String;

    fn render_notes(&self, slide: &Slide) -> String {
        markdown::to_html(&slide.note)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render(&self, slide: &Slide, deck: &Deck) -> String {
        render_slide(slide, deck)
    }
}

/// Wrap a slide's rendered body in its addressable container.
pub fn render_slide(slide: &Slide, deck: &Deck) -> String {
    let transition = slide
        .transition()
        .unwrap_or_else(|| deck.config.transition.clone());
    let layout = slide.layout();

    let mut classes = vec![
        "slide".to_string(),
        format!("slide-{}", slide.index),
        format!("layout-{layout}"),
        format!("transition-{transition}"),
    ];
    if let Some(user) = slide
        .frontmatter
        .get("class")
        .or_else(|| slide.frontmatter.get("cls"))
    {
        classes.extend(user.split_whitespace().map(str::to_string));
    }

    let mut style = String::new();
    if let Some(bg) = slide.background() {
        if bg.starts_with('#') || bg.starts_with("rgb") {
            style.push_str(&format!("background-color: {bg};"));
        } else {
            style.push_str(&format!(
                "background-image: url('{}'); background-size: cover; background-position: center;",
                resolve_asset_url(&bg)
            ));
        }
    }
    if layout == "grid" {
        if let Some(cols) = slide.frontmatter.get("cols").and_then(|c| c.parse::<u32>().ok()) {
            style.push_str(&format!(" --grid-cols: {cols};"));
        }
    }

    let body = markdown::to_html(&slide.content);
    let image = slide.frontmatter.get("image").filter(|i| !i.is_empty());
    let inner = match image {
        Some(url) if IMAGE_LAYOUTS.contains(&layout.as_str()) => format!(
            "<div class=\"slot-image\" style=\"background-image: url('{}'); background-size: cover; background-position: center;\"></div>\n<div class=\"slot-content\">\n{body}</div>",
            escape_html(&resolve_asset_url(&url))
        ),
        _ => body,
    };

    let style_attr = if style.is_empty() {
        String::new()
    } else {
        format!(" style=\"{}\"", escape_html(style.trim()))
    };

    format!(
        "<div id=\"slide-{index}\" class=\"{classes}\" data-slide-index=\"{index}\"{style_attr}>\n{inner}</div>",
        index = slide.index,
        classes = escape_html(&classes.join(" ")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_slide_wrapper() {
        let deck = parse("# One\n---\nlayout: cover\ntransition: slide-left\n---\n# Two", false).unwrap();
        let html = HtmlRenderer.render(&deck.slides[1], &deck);
        assert!(html.starts_with("<div id=\"slide-1\" class=\"slide slide-1 layout-cover transition-slide-left\""));
        assert!(html.contains("<h1>Two</h1>"));
    }

    #[test]
    fn test_deck_transition_default() {
        let deck = parse("# One", false).unwrap();
        let html = render_slide(&deck.slides[0], &deck);
        assert!(html.contains("layout-default transition-fade"));
        assert!(!html.contains("style="));
    }

    #[test]
    fn test_background_color_and_image() {
        let deck = parse("---\nbackground: \"#112233\"\n---\n# A\n---\nbackground: ./bg.jpg\n---\n# B", false).unwrap();
        assert!(render_slide(&deck.slides[0], &deck).contains("background-color: #112233;"));
        assert!(render_slide(&deck.slides[1], &deck).contains("url(&#39;/bg.jpg&#39;)"));
    }

    #[test]
    fn test_image_slot_layout() {
        let deck = parse("# A\n---\nlayout: image-left\nimage: pic.png\n---\n# B", false).unwrap();
        let html = render_slide(&deck.slides[1], &deck);
        assert!(html.contains("class=\"slot-image\""));
        assert!(html.contains("<div class=\"slot-content\">"));
    }

    #[test]
    fn test_user_classes() {
        let deck = parse("# A\n---\nclass: centered big\n---\n# B", false).unwrap();
        assert!(render_slide(&deck.slides[1], &deck).contains("transition-fade centered big\""));
    }

    #[test]
    fn test_click_markup_survives() {
        let deck = parse("# A\n<click>Shown later</click>", false).unwrap();
        let html = render_slide(&deck.slides[0], &deck);
        assert!(html.contains("data-click=\"1\""));
        assert!(html.contains("<p>Shown later</p>"));
    }

    #[test]
    fn test_notes_rendered() {
        let deck = parse("# A\n<!-- notes\nSay **this**\n-->", false).unwrap();
        assert_eq!(HtmlRenderer.render_notes(&deck.slides[0]), "<p>Say <strong>this</strong></p>\n");
    }
}
