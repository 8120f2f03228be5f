use serde_yaml::Value;
use std::collections::BTreeMap;

/// Per-slide `key: value` settings. Keys with no value are kept as present
/// but empty.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontmatter(BTreeMap<String, Value>);

impl Frontmatter {
    /// Scalar value rendered as a string; `None` for missing or empty keys.
    pub fn get(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Split a leading `---` fenced YAML block from a slide.
///
/// Slides without frontmatter come back untouched with an empty map.
pub fn parse(raw: &str) -> Result<(Frontmatter, String), serde_yaml::Error> {
    let Some(rest) = raw.strip_prefix("---\n") else {
        return Ok((Frontmatter::default(), raw.to_string()));
    };

    let (yaml, body) = if let Some(body) = rest.strip_prefix("---\n") {
        ("", body)
    } else if rest == "---" {
        ("", "")
    } else if let Some(end) = rest.find("\n---\n") {
        (&rest[..end], &rest[end + 5..])
    } else if let Some(yaml) = rest.strip_suffix("\n---") {
        (yaml, "")
    } else {
        return Ok((Frontmatter::default(), raw.to_string()));
    };

    let map: Option<BTreeMap<String, Value>> = if yaml.trim().is_empty() {
        None
    } else {
        serde_yaml::from_str(yaml)?
    };

    Ok((Frontmatter(map.unwrap_or_default()), body.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_single_key() {
        let (fm, content) = parse("---\nlayout: cover\n---\n# Title").unwrap();
        assert_eq!(fm.get("layout").as_deref(), Some("cover"));
        assert_eq!(content, "# Title");
    }

    #[test]
    fn test_parse_multiple_keys() {
        let raw = "---\nlayout: cover\ntransition: slide-left\nbackground: ./bg.jpg\n---\n# Content";
        let (fm, content) = parse(raw).unwrap();
        assert_eq!(fm.get("layout").as_deref(), Some("cover"));
        assert_eq!(fm.get("transition").as_deref(), Some("slide-left"));
        assert_eq!(fm.get("background").as_deref(), Some("./bg.jpg"));
        assert_eq!(content, "# Content");
    }

    #[test]
    fn test_no_frontmatter() {
        let raw = "# Just Content\nNo frontmatter here";
        let (fm, content) = parse(raw).unwrap();
        assert!(fm.is_empty());
        assert_eq!(content, raw);
    }

    #[test]
    fn test_empty_block() {
        let (fm, content) = parse("---\n---\n# Title").unwrap();
        assert!(fm.is_empty());
        assert_eq!(content, "# Title");
    }

    #[test]
    fn test_empty_value_is_present_but_none() {
        let (fm, content) = parse("---\nclass:\n---\n# Title").unwrap();
        assert!(fm.contains("class"));
        assert_eq!(fm.get("class"), None);
        assert_eq!(content.trim(), "# Title");
    }

    #[test]
    fn test_numeric_value_as_string() {
        let (fm, _) = parse("---\nclick-duration: 800\n---\n# S").unwrap();
        assert_eq!(fm.get("click-duration").as_deref(), Some("800"));
    }

    #[test]
    fn test_invalid_yaml_errors() {
        assert!(parse("---\nlayout: [unclosed\n---\n# S").is_err());
    }
}
