use std::fmt::Write;

pub const THEME_NAMES: &[&str] = &["light", "dark"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub u8, pub u8, pub u8);

impl Color {
    pub const WHITE: Color = Color(0xFF, 0xFF, 0xFF);

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.0, self.1, self.2)
    }
}

/// Palette and type scale, expressed for a 1920x1080 slide canvas.
#[derive(Debug, Clone)]
pub struct Theme {
    pub name: String,
    pub background: Color,
    pub foreground: Color,
    pub heading_color: Color,
    pub accent: Color,
    pub code_background: Color,
    pub code_foreground: Color,
    pub h1_size: f32,
    pub h2_size: f32,
    pub h3_size: f32,
    pub body_size: f32,
    pub code_size: f32,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark".to_string(),
            background: Color(0x1E, 0x1E, 0x1E),
            foreground: Color(0xC8, 0xC8, 0xC8),
            heading_color: Color::WHITE,
            accent: Color(0x4E, 0xC5, 0xD4),
            code_background: Color(0x2D, 0x2D, 0x2D),
            code_foreground: Color(0xD4, 0xD4, 0xD4),
            h1_size: 96.0,
            h2_size: 72.0,
            h3_size: 52.0,
            body_size: 44.0,
            code_size: 30.0,
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light".to_string(),
            background: Color::WHITE,
            foreground: Color(0x1A, 0x1A, 0x2E),
            heading_color: Color(0x16, 0x21, 0x3E),
            accent: Color(0x0F, 0x34, 0x60),
            code_background: Color(0xF5, 0xF5, 0xF5),
            code_foreground: Color(0x33, 0x33, 0x33),
            h1_size: 96.0,
            h2_size: 72.0,
            h3_size: 52.0,
            body_size: 44.0,
            code_size: 30.0,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name {
            "dark" => Self::dark(),
            _ => Self::light(),
        }
    }

    pub fn heading_size(&self, level: u8) -> f32 {
        match level {
            1 => self.h1_size,
            2 => self.h2_size,
            3 => self.h3_size,
            _ => self.body_size,
        }
    }

    /// CSS custom properties for a `:root` block. Sizes scale with the
    /// viewport through `--unit`.
    pub fn to_css_vars(&self) -> String {
        let mut css = String::from(":root {\n");
        let colors = [
            ("bg", self.background),
            ("fg", self.foreground),
            ("heading", self.heading_color),
            ("accent", self.accent),
            ("code-bg", self.code_background),
            ("code-fg", self.code_foreground),
        ];
        for (name, color) in colors {
            let _ = writeln!(css, "  --{name}: {};", color.to_hex());
        }
        let _ = writeln!(css, "  --unit: min(calc(100vw / 1920), calc(100vh / 1080));");
        for level in 1..=3u8 {
            let _ = writeln!(
                css,
                "  --h{level}-size: calc({} * var(--unit));",
                self.heading_size(level)
            );
        }
        let _ = writeln!(css, "  --body-size: calc({} * var(--unit));", self.body_size);
        let _ = writeln!(css, "  --code-size: calc({} * var(--unit));", self.code_size);
        css.push('}');
        css
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name() {
        assert_eq!(Theme::from_name("dark").name, "dark");
        assert_eq!(Theme::from_name("light").name, "light");
        assert_eq!(Theme::from_name("unknown").name, "light");
    }

    #[test]
    fn test_hex() {
        assert_eq!(Color(0x0F, 0x34, 0x60).to_hex(), "#0f3460");
        assert_eq!(Color::WHITE.to_hex(), "#ffffff");
    }

    #[test]
    fn test_css_vars() {
        let css = Theme::dark().to_css_vars();
        assert!(css.starts_with(":root {"));
        assert!(css.contains("--bg: #1e1e1e;"));
        assert!(css.contains("--h1-size: calc(96 * var(--unit));"));
        assert!(css.ends_with('}'));
    }
}
