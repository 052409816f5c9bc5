//! Command-line and search history, persisted one entry per line.

use std::collections::VecDeque;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::warn;

const MAX_ENTRIES: usize = 1000;

#[derive(Debug, Default)]
pub struct LineHistory {
    path: Option<PathBuf>,
    entries: VecDeque<String>,
    /// Position while browsing with `<Up>`/`<Down>`; `entries.len()` is the draft.
    index: usize,
    draft: String,
}

impl LineHistory {
    /// An in-memory history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load `path`; a missing or unreadable file gives an empty history.
    pub fn load(path: &Path) -> Self {
        let mut entries: VecDeque<String> = fs::read_to_string(path)
            .map(|text| {
                text.lines()
                    .filter(|l| !l.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        while entries.len() > MAX_ENTRIES {
            entries.pop_front();
        }
        Self {
            path: Some(path.to_path_buf()),
            index: entries.len(),
            entries,
            draft: String::new(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }

    /// Record an accepted line and append it to the file.
    pub fn push(&mut self, line: &str) {
        self.reset();
        if line.is_empty() || self.entries.back().map(String::as_str) == Some(line) {
            return;
        }
        if self.entries.len() == MAX_ENTRIES {
            self.entries.pop_front();
        }
        self.entries.push_back(line.to_string());
        self.index = self.entries.len();

        if let Some(path) = &self.path {
            if let Err(err) = append_line(path, line) {
                warn!(target: "history", file = %path.display(), %err, "history_write_failed");
            }
        }
    }

    /// Stop browsing; the next `previous` starts from the newest entry.
    pub fn reset(&mut self) {
        self.index = self.entries.len();
        self.draft.clear();
    }

    /// Older entry starting with what was typed before browsing began.
    pub fn previous(&mut self, current: &str) -> Option<&str> {
        if self.index == self.entries.len() {
            self.draft = current.to_string();
        }
        let found = (0..self.index)
            .rev()
            .find(|&i| self.entries[i].starts_with(&self.draft))?;
        self.index = found;
        Some(&self.entries[found])
    }

    /// Newer entry, or the typed text once past the newest.
    pub fn next(&mut self) -> Option<&str> {
        if self.index >= self.entries.len() {
            return None;
        }
        let found = (self.index + 1..self.entries.len()).find(|&i| self.entries[i].starts_with(&self.draft));
        match found {
            Some(i) => {
                self.index = i;
                Some(&self.entries[i])
            }
            None => {
                self.index = self.entries.len();
                Some(&self.draft)
            }
        }
    }
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    writeln!(file, "{}", line)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browsing_filters_by_typed_prefix() {
        let mut h = LineHistory::new();
        for line in ["set nu", "w", "set ts=2", "q"] {
            h.push(line);
        }
        assert_eq!(h.previous("set"), Some("set ts=2"));
        assert_eq!(h.previous("ignored"), Some("set nu"));
        assert_eq!(h.previous(""), None);
        assert_eq!(h.next(), Some("set ts=2"));
        assert_eq!(h.next(), Some("set"));
        assert_eq!(h.next(), None);
    }

    #[test]
    fn duplicates_in_a_row_are_kept_once() {
        let mut h = LineHistory::new();
        h.push("w");
        h.push("w");
        h.push("");
        assert_eq!(h.entries().count(), 1);
    }

    #[test]
    fn persists_across_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("commands_history");
        let mut h = LineHistory::load(&path);
        h.push("e foo.txt");
        h.push("ls");

        let mut again = LineHistory::load(&path);
        assert_eq!(again.entries().collect::<Vec<_>>(), vec!["e foo.txt", "ls"]);
        assert_eq!(again.previous(""), Some("ls"));
    }
}
