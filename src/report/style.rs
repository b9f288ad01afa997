//! Console colors and indicator glyphs.

use crate::models::StatusType;

const RESET: &str = "\x1b[0m";

/// Indentation matching the width of an indicator.
pub const INDENT: &str = "     ";

/// Extra prefix for result lines nested under a control.
pub const NESTED: &str = "   ";

/// Lookup of colors and glyphs, optionally without ANSI escapes.
#[derive(Debug, Clone, Copy)]
pub struct Style {
    color: bool,
}

impl Style {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn color(&self, status_type: StatusType) -> &'static str {
        if !self.color {
            return "";
        }
        match status_type {
            StatusType::Critical | StatusType::Major | StatusType::Failed => "\x1b[0;1;31m",
            StatusType::Minor => "\x1b[0;36m",
            StatusType::Passed => "\x1b[0;1;32m",
            StatusType::Skipped => "\x1b[0;37m",
            StatusType::Unknown => "",
        }
    }

    pub fn reset(&self) -> &'static str {
        if self.color {
            RESET
        } else {
            ""
        }
    }

    /// Indicator glyph; `unknown` falls back to a question mark.
    pub fn indicator(&self, status_type: StatusType) -> &'static str {
        match status_type {
            StatusType::Critical | StatusType::Major | StatusType::Minor | StatusType::Failed => {
                "  \u{2716}  "
            }
            StatusType::Skipped => "  \u{21ba}  ",
            StatusType::Passed => "  \u{2714}  ",
            StatusType::Unknown => "  ?  ",
        }
    }

    /// Wrap `text` in the given status color.
    pub fn paint(&self, status_type: StatusType, text: &str) -> String {
        format!("{}{}{}", self.color(status_type), text, self.reset())
    }
}

/// Re-indent embedded newlines so continuation lines align with the text.
pub fn indent_lines(text: &str, indentation: &str) -> String {
    text.replace('\n', &format!("\n{}", indentation))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_style_has_no_escapes() {
        let style = Style::new(false);
        assert_eq!(style.paint(StatusType::Critical, "boom"), "boom");
        assert_eq!(style.reset(), "");
    }

    #[test]
    fn test_colored_style() {
        let style = Style::new(true);
        let painted = style.paint(StatusType::Passed, "ok");
        assert!(painted.starts_with("\x1b[0;1;32m"));
        assert!(painted.ends_with(RESET));
    }

    #[test]
    fn test_unknown_indicator() {
        let style = Style::new(false);
        assert_eq!(style.indicator(StatusType::Unknown), "  ?  ");
        assert_eq!(style.indicator(StatusType::Major), style.indicator(StatusType::Failed));
    }

    #[test]
    fn test_indent_lines() {
        assert_eq!(indent_lines("a\nb", INDENT), "a\n     b");
        assert_eq!(indent_lines("single", INDENT), "single");
    }
}
