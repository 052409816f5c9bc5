//! Insert-mode word completion from the words already in the buffer.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use ropey::Rope;

use crate::buffer::EditorBuffer;

static WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").expect("word pattern compiles"));

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Start offset and text of the word that ends at `caret`.
pub fn word_before(text: &Rope, caret: usize) -> (usize, String) {
    let mut start = caret.min(text.len_chars());
    while start > 0 && is_word_char(text.char(start - 1)) {
        start -= 1;
    }
    (start, text.slice(start..caret).to_string())
}

/// Words of at least two chars that extend `prefix`, nearest to `caret` first.
pub fn candidates(text: &Rope, caret: usize, prefix: &str) -> Vec<String> {
    let haystack = text.to_string();
    let caret_byte = text.char_to_byte(caret.min(text.len_chars()));
    let mut nearest: HashMap<&str, usize> = HashMap::new();
    for m in WORD.find_iter(&haystack) {
        let word = m.as_str();
        if word.chars().count() < 2 || word == prefix || !word.starts_with(prefix) {
            continue;
        }
        let distance = m.start().abs_diff(caret_byte);
        nearest
            .entry(word)
            .and_modify(|d| *d = (*d).min(distance))
            .or_insert(distance);
    }
    let mut words: Vec<(&str, usize)> = nearest.into_iter().collect();
    words.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
    words.into_iter().map(|(w, _)| w.to_string()).collect()
}

/// An active `<C-n>`/`<C-p>` cycle.
#[derive(Debug, Clone)]
pub struct Completion {
    start: usize,
    typed: String,
    candidates: Vec<String>,
    index: Option<usize>,
}

impl Completion {
    pub fn begin(buffer: &EditorBuffer) -> Option<Self> {
        let caret = buffer.caret();
        let (start, typed) = word_before(&buffer.text, caret);
        let candidates = candidates(&buffer.text, start, &typed);
        if candidates.is_empty() {
            return None;
        }
        Some(Self {
            start,
            typed,
            candidates,
            index: None,
        })
    }

    /// Step through the candidates. Past either end the typed text comes back.
    pub fn step(&mut self, forward: bool, buffer: &mut EditorBuffer) {
        let len = self.candidates.len();
        self.index = match (self.index, forward) {
            (None, true) => Some(0),
            (None, false) => Some(len - 1),
            (Some(i), true) if i + 1 < len => Some(i + 1),
            (Some(i), false) if i > 0 => Some(i - 1),
            _ => None,
        };
        self.apply(buffer);
    }

    /// `<C-e>`: put back what was typed.
    pub fn cancel(&mut self, buffer: &mut EditorBuffer) {
        self.index = None;
        self.apply(buffer);
    }

    pub fn current(&self) -> &str {
        match self.index {
            Some(i) => &self.candidates[i],
            None => &self.typed,
        }
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn selected(&self) -> Option<usize> {
        self.index
    }

    fn apply(&self, buffer: &mut EditorBuffer) {
        let caret = buffer.caret();
        let replacement = self.current().to_string();
        if caret > self.start {
            buffer.text.remove(self.start..caret);
        }
        buffer.text.insert(self.start, &replacement);
        buffer.set_caret(self.start + replacement.chars().count());
    }
}
