//! Color schemes.

use crossterm::style::Color;

use crate::syntax::Highlight;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: &'static str,
    pub keyword: Color,
    pub type_name: Color,
    pub string: Color,
    pub number: Color,
    pub comment: Color,
    pub line_number: Color,
    pub lint_marker: Color,
    pub search_bg: Color,
    pub cursorline_bg: Color,
    pub colorcolumn_bg: Color,
    pub status_fg: Color,
    pub status_bg: Color,
    pub status_inactive_bg: Color,
    pub tab_active_bg: Color,
    pub unprintable: Color,
}

pub const SCHEME_NAMES: &[&str] = &["default", "vim", "emacs", "monokai"];

impl Theme {
    pub fn by_name(name: &str) -> Option<Theme> {
        match name {
            "default" => Some(Self::default_scheme()),
            "vim" => Some(Self::vim()),
            "emacs" => Some(Self::emacs()),
            "monokai" => Some(Self::monokai()),
            _ => None,
        }
    }

    fn default_scheme() -> Self {
        Self {
            name: "default",
            keyword: Color::Blue,
            type_name: Color::DarkYellow,
            string: Color::Green,
            number: Color::Magenta,
            comment: Color::DarkGrey,
            line_number: Color::DarkGrey,
            lint_marker: Color::Red,
            search_bg: Color::DarkYellow,
            cursorline_bg: Color::AnsiValue(236),
            colorcolumn_bg: Color::AnsiValue(235),
            status_fg: Color::White,
            status_bg: Color::DarkBlue,
            status_inactive_bg: Color::DarkGrey,
            tab_active_bg: Color::DarkBlue,
            unprintable: Color::DarkCyan,
        }
    }

    fn vim() -> Self {
        Self {
            name: "vim",
            keyword: Color::Yellow,
            type_name: Color::Green,
            string: Color::Magenta,
            number: Color::Magenta,
            comment: Color::Cyan,
            line_number: Color::Yellow,
            lint_marker: Color::Red,
            search_bg: Color::Yellow,
            cursorline_bg: Color::AnsiValue(237),
            colorcolumn_bg: Color::DarkRed,
            status_fg: Color::Black,
            status_bg: Color::White,
            status_inactive_bg: Color::Grey,
            tab_active_bg: Color::White,
            unprintable: Color::Blue,
        }
    }

    fn emacs() -> Self {
        Self {
            name: "emacs",
            keyword: Color::Magenta,
            type_name: Color::DarkGreen,
            string: Color::DarkRed,
            number: Color::DarkCyan,
            comment: Color::Red,
            line_number: Color::Grey,
            lint_marker: Color::Red,
            search_bg: Color::DarkMagenta,
            cursorline_bg: Color::AnsiValue(236),
            colorcolumn_bg: Color::AnsiValue(238),
            status_fg: Color::Black,
            status_bg: Color::Grey,
            status_inactive_bg: Color::DarkGrey,
            tab_active_bg: Color::Grey,
            unprintable: Color::DarkGrey,
        }
    }

    fn monokai() -> Self {
        Self {
            name: "monokai",
            keyword: Color::Rgb { r: 249, g: 38, b: 114 },
            type_name: Color::Rgb { r: 102, g: 217, b: 239 },
            string: Color::Rgb { r: 230, g: 219, b: 116 },
            number: Color::Rgb { r: 174, g: 129, b: 255 },
            comment: Color::Rgb { r: 117, g: 113, b: 94 },
            line_number: Color::Rgb { r: 144, g: 144, b: 138 },
            lint_marker: Color::Rgb { r: 249, g: 38, b: 114 },
            search_bg: Color::Rgb { r: 73, g: 72, b: 62 },
            cursorline_bg: Color::Rgb { r: 62, g: 61, b: 50 },
            colorcolumn_bg: Color::Rgb { r: 62, g: 61, b: 50 },
            status_fg: Color::Rgb { r: 248, g: 248, b: 242 },
            status_bg: Color::Rgb { r: 73, g: 72, b: 62 },
            status_inactive_bg: Color::Rgb { r: 39, g: 40, b: 34 },
            tab_active_bg: Color::Rgb { r: 117, g: 113, b: 94 },
            unprintable: Color::Rgb { r: 117, g: 113, b: 94 },
        }
    }

    /// Foreground for a token class; `None` keeps the terminal default.
    pub fn highlight(&self, hl: Highlight) -> Option<Color> {
        match hl {
            Highlight::Normal => None,
            Highlight::Keyword => Some(self.keyword),
            Highlight::Type => Some(self.type_name),
            Highlight::String => Some(self.string),
            Highlight::Number => Some(self.number),
            Highlight::Comment => Some(self.comment),
        }
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_listed_scheme_exists() {
        for name in SCHEME_NAMES {
            assert_eq!(Theme::by_name(name).map(|t| t.name), Some(*name));
        }
        assert!(Theme::by_name("solarized").is_none());
        assert_eq!(Theme::default().highlight(Highlight::Normal), None);
    }
}
