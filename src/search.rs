//! `/` and `?` searches over a buffer.

use regex::{Regex, RegexBuilder};
use ropey::Rope;
use tracing::debug;

use crate::error::{EditorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchDirection {
    Forward,
    Backward,
}

impl SearchDirection {
    pub fn reversed(self) -> Self {
        match self {
            SearchDirection::Forward => SearchDirection::Backward,
            SearchDirection::Backward => SearchDirection::Forward,
        }
    }

    pub fn prompt(self) -> char {
        match self {
            SearchDirection::Forward => '/',
            SearchDirection::Backward => '?',
        }
    }
}

/// The last search, reused by `n` and `N`.
#[derive(Debug, Clone)]
pub struct SearchState {
    pub pattern: String,
    pub direction: SearchDirection,
}

/// Compile `pattern`; when it is not a valid regex it is matched literally.
pub fn compile(pattern: &str, ignore_case: bool) -> Result<Regex> {
    let build = |p: &str| RegexBuilder::new(p).case_insensitive(ignore_case).build();
    match build(pattern) {
        Ok(regex) => Ok(regex),
        Err(err) => {
            debug!(target: "search", %pattern, %err, "literal_fallback");
            build(&regex::escape(pattern)).map_err(|e| EditorError::InvalidValue(e.to_string()))
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Char offset of the match.
    Found(usize),
    /// Found after wrapping around the end (or start) of the buffer.
    Wrapped(usize),
    NotFound,
}

/// Find the next match strictly after (or before) the char offset `from`.
pub fn find(
    text: &Rope,
    regex: &Regex,
    from: usize,
    direction: SearchDirection,
    wrapscan: bool,
) -> SearchOutcome {
    let haystack = text.to_string();
    let from_byte = text.char_to_byte(from.min(text.len_chars()));
    let to_char = |byte: usize| text.byte_to_char(byte);

    let starts = regex.find_iter(&haystack).map(|m| m.start());
    let found = match direction {
        SearchDirection::Forward => {
            let mut first = None;
            let mut after = None;
            for start in starts {
                first.get_or_insert(start);
                if start > from_byte {
                    after = Some(start);
                    break;
                }
            }
            (after, first)
        }
        SearchDirection::Backward => {
            let mut before = None;
            let mut last = None;
            for start in starts {
                if start < from_byte {
                    before = Some(start);
                }
                last = Some(start);
            }
            (before, last)
        }
    };

    match found {
        (Some(byte), _) => SearchOutcome::Found(to_char(byte)),
        (None, Some(byte)) if wrapscan => SearchOutcome::Wrapped(to_char(byte)),
        _ => SearchOutcome::NotFound,
    }
}

/// Char ranges of every match on one line, for highlighting.
pub fn line_matches(regex: &Regex, line: &str) -> Vec<(usize, usize)> {
    regex
        .find_iter(line)
        .filter(|m| !m.is_empty())
        .map(|m| {
            let start = line[..m.start()].chars().count();
            (start, start + m.as_str().chars().count())
        })
        .collect()
}

pub fn not_found_message(pattern: &str, direction: SearchDirection) -> String {
    match direction {
        SearchDirection::Forward => format!("Search hit BOTTOM without match for: {}", pattern),
        SearchDirection::Backward => format!("Search hit TOP without match for: {}", pattern),
    }
}

pub fn wrapped_message(direction: SearchDirection) -> &'static str {
    match direction {
        SearchDirection::Forward => "search hit BOTTOM, continuing at TOP",
        SearchDirection::Backward => "search hit TOP, continuing at BOTTOM",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn forward_search_wraps_only_with_wrapscan() {
        let text = Rope::from_str("foo bar\nbaz foo");
        let re = compile("foo", false).unwrap();
        assert_eq!(find(&text, &re, 0, SearchDirection::Forward, true), SearchOutcome::Found(12));
        assert_eq!(find(&text, &re, 12, SearchDirection::Forward, true), SearchOutcome::Wrapped(0));
        assert_eq!(find(&text, &re, 12, SearchDirection::Forward, false), SearchOutcome::NotFound);
    }

    #[test]
    fn backward_search() {
        let text = Rope::from_str("foo bar\nbaz foo");
        let re = compile("ba", false).unwrap();
        assert_eq!(find(&text, &re, 10, SearchDirection::Backward, true), SearchOutcome::Found(8));
        assert_eq!(find(&text, &re, 4, SearchDirection::Backward, true), SearchOutcome::Wrapped(8));
        assert_eq!(find(&text, &re, 4, SearchDirection::Backward, false), SearchOutcome::NotFound);
    }

    #[test]
    fn ignore_case_and_literal_fallback() {
        let text = Rope::from_str("x Hello (a");
        let re = compile("hello", true).unwrap();
        assert_eq!(find(&text, &re, 0, SearchDirection::Forward, false), SearchOutcome::Found(2));
        let re = compile("(a", false).unwrap();
        assert_eq!(find(&text, &re, 0, SearchDirection::Forward, false), SearchOutcome::Found(8));
    }

    #[test]
    fn offsets_are_chars_not_bytes() {
        let text = Rope::from_str("ééé x");
        let re = compile("x", false).unwrap();
        assert_eq!(find(&text, &re, 0, SearchDirection::Forward, false), SearchOutcome::Found(4));
        assert_eq!(line_matches(&re, "éx"), vec![(1, 2)]);
    }

    #[test]
    fn messages() {
        assert_eq!(
            not_found_message("xyz", SearchDirection::Forward),
            "Search hit BOTTOM without match for: xyz"
        );
        assert_eq!(
            not_found_message("xyz", SearchDirection::Backward),
            "Search hit TOP without match for: xyz"
        );
    }
}
