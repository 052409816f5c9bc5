//! One open location: its text, cursor, settings and save state.
//!
//! The caret is an absolute char index into the rope and is the single source
//! of truth for edits. `(cursor_row, cursor_gcol)` is the grapheme-aware
//! visual position derived from it after every change.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use ropey::Rope;
use tracing::{debug, trace, warn};

use crate::error::{EditorError, Result};
use crate::graphemes::{
    char_to_line_gcol, current_word_end, first_non_blank, indentation, last_row, line_gcol_to_char,
    line_gcount, line_span, line_text, next_grapheme, next_word_start, prev_grapheme,
    prev_word_start, word_end,
};
use crate::input::MAX_COUNT;
use crate::io::{backend_for, expand_tilde, EditorIo};
use crate::settings::BufferSettings;
use crate::tools::Report;

/// Yanked or deleted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Register {
    pub text: String,
    pub linewise: bool,
}

impl Register {
    pub fn chars(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            linewise: false,
        }
    }

    pub fn lines(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            linewise: true,
        }
    }
}

#[derive(Clone)]
struct Snapshot {
    text: Rope,
    caret: usize,
}

#[derive(Clone)]
pub struct EditorBuffer {
    pub text: Rope,
    pub cursor_row: usize,
    pub cursor_gcol: usize, // grapheme cluster column
    desired_gcol: Option<usize>,
    caret: usize,

    pub location: Option<PathBuf>,
    /// Shown instead of `[New file]` for buffers without a location, like help.
    pub title: Option<String>,
    /// The location does not exist in storage yet.
    pub is_new: bool,
    pub is_dir: bool,
    saved: String,

    pub settings: BufferSettings,
    pub filetype: Option<String>,
    pub marks: HashMap<char, usize>,
    pub reports: Vec<Report>,

    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl EditorBuffer {
    pub fn new(settings: BufferSettings) -> Self {
        Self::from_text("", settings)
    }

    pub fn from_text(text: &str, settings: BufferSettings) -> Self {
        Self {
            text: Rope::from_str(text),
            cursor_row: 0,
            cursor_gcol: 0,
            desired_gcol: None,
            caret: 0,
            location: None,
            title: None,
            is_new: true,
            is_dir: false,
            saved: text.to_string(),
            settings,
            filetype: None,
            marks: HashMap::new(),
            reports: Vec::new(),
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
        }
    }

    /// A buffer bound to `location` that has not been read.
    pub fn with_location(location: PathBuf, settings: BufferSettings) -> Self {
        let mut buffer = Self::new(settings);
        buffer.location = Some(location);
        buffer
    }

    /// Read `location` through the first backend that accepts it.
    pub fn open(
        location: &Path,
        backends: &[Box<dyn EditorIo>],
        settings: BufferSettings,
    ) -> Result<Self> {
        let mut buffer = Self::with_location(location.to_path_buf(), settings);
        let text = buffer.read(backends)?;
        buffer.text = Rope::from_str(&text);
        buffer.saved = text;
        Ok(buffer)
    }

    fn read(&mut self, backends: &[Box<dyn EditorIo>]) -> Result<String> {
        let location = self.location.clone().ok_or(EditorError::NoFileName)?;
        let io = backend_for(backends, &location)
            .ok_or_else(|| EditorError::Unwritable(location.display().to_string()))?;
        self.is_dir = io.is_dir(&location);
        if !io.exists(&location) {
            self.is_new = true;
            return Ok(String::new());
        }
        self.is_new = false;
        let mut text = io.read(&location)?.replace("\r\n", "\n");
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    /// Read the location again, keeping the caret where possible.
    pub fn reload(&mut self, backends: &[Box<dyn EditorIo>]) -> Result<()> {
        let text = self.read(backends)?;
        let caret = self.caret.min(text.chars().count());
        self.text = Rope::from_str(&text);
        self.saved = text;
        self.set_caret(caret);
        Ok(())
    }

    /// Write to `location` (or the current one) with a trailing newline.
    /// `force` temporarily grants write permission to read-only files.
    pub fn write(
        &mut self,
        location: Option<PathBuf>,
        force: bool,
        backends: &[Box<dyn EditorIo>],
    ) -> Result<()> {
        if let Some(location) = location {
            self.location = Some(location);
        }
        let location = self.location.clone().ok_or(EditorError::NoFileName)?;
        let io = backend_for(backends, &location)
            .ok_or_else(|| EditorError::Unwritable(location.display().to_string()))?;

        let mut data = self.text.to_string();
        data.push('\n');

        let target = expand_tilde(&location);
        let read_only = fs::metadata(&target)
            .map(|m| m.is_file() && m.permissions().readonly())
            .unwrap_or(false);

        if read_only && !force {
            return Err(EditorError::ReadOnly);
        }
        if read_only {
            set_readonly(&target, false)?;
            let written = io.write(&location, &data);
            if let Err(err) = set_readonly(&target, true) {
                warn!(target: "io", file = %target.display(), %err, "restore_readonly_failed");
            }
            written?;
        } else {
            io.write(&location, &data)?;
        }

        debug!(target: "io", file = %location.display(), size_bytes = data.len(), "file_write_ok");
        self.is_new = false;
        self.saved = self.text.to_string();
        Ok(())
    }

    /// True when some changes are not yet written.
    pub fn has_unsaved_changes(&self) -> bool {
        self.text != self.saved.as_str()
    }

    pub fn display_name(&self, short: bool) -> String {
        match &self.location {
            None => self.title.clone().unwrap_or_else(|| "[New file]".to_string()),
            Some(location) if short => location
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| location.display().to_string()),
            Some(location) => location.display().to_string(),
        }
    }

    // ── Caret bookkeeping ───────────────────────────────────────────────

    #[inline]
    pub fn caret(&self) -> usize {
        self.caret
    }

    #[inline]
    pub fn set_caret(&mut self, ci: usize) {
        self.caret = ci.min(self.text.len_chars());
        self.sync_visual_from_caret();
    }

    #[inline]
    fn sync_visual_from_caret(&mut self) {
        let (row, gcol) = char_to_line_gcol(&self.text, self.caret);
        self.cursor_row = row;
        self.cursor_gcol = gcol;
    }

    #[inline]
    fn sync_caret_from_visual(&mut self) {
        self.caret = line_gcol_to_char(&self.text, self.cursor_row, self.cursor_gcol);
    }

    #[inline]
    fn clear_desired_gcol(&mut self) {
        self.desired_gcol = None;
    }

    pub fn line_count(&self) -> usize {
        last_row(&self.text) + 1
    }

    pub fn line(&self, row: usize) -> String {
        line_text(&self.text, row)
    }

    pub fn current_line(&self) -> String {
        self.line(self.cursor_row)
    }

    /// Keep the caret on a character in normal mode: it may not rest past the
    /// last grapheme of a non-empty line.
    pub fn clamp_to_line_for_normal_mode(&mut self) {
        let (start, end) = line_span(&self.text, self.cursor_row);
        if self.caret >= end && end > start {
            self.caret = prev_grapheme(&self.text, end).max(start);
            self.sync_visual_from_caret();
        }
    }

    // ── Horizontal, grapheme-aware ──────────────────────────────────────

    pub fn move_left(&mut self, count: usize) {
        let (start, _) = line_span(&self.text, self.cursor_row);
        for _ in 0..count {
            if self.caret <= start {
                break;
            }
            self.caret = prev_grapheme(&self.text, self.caret).max(start);
        }
        self.sync_visual_from_caret();
        self.clear_desired_gcol();
        trace!(row = self.cursor_row, gcol = self.cursor_gcol, "after move left");
    }

    /// Move right within the line; `past_end` allows resting after the last grapheme.
    pub fn move_right(&mut self, count: usize, past_end: bool) {
        let (_, end) = line_span(&self.text, self.cursor_row);
        for _ in 0..count {
            let next = next_grapheme(&self.text, self.caret).min(end);
            if next >= end && !past_end {
                break;
            }
            if next == self.caret {
                break;
            }
            self.caret = next;
        }
        self.sync_visual_from_caret();
        self.clear_desired_gcol();
        trace!(row = self.cursor_row, gcol = self.cursor_gcol, "after move right");
    }

    // ── Vertical, grapheme-aware (keep desired_gcol like Vim) ───────────

    pub fn move_up(&mut self, count: usize) {
        if self.cursor_row == 0 {
            return;
        }
        let target = *self.desired_gcol.get_or_insert(self.cursor_gcol);
        self.cursor_row = self.cursor_row.saturating_sub(count);
        self.cursor_gcol = target.min(line_gcount(&self.text, self.cursor_row));
        self.sync_caret_from_visual();
        trace!(row = self.cursor_row, gcol = self.cursor_gcol, "after move up");
    }

    pub fn move_down(&mut self, count: usize) {
        let last = last_row(&self.text);
        if self.cursor_row >= last {
            return;
        }
        let target = *self.desired_gcol.get_or_insert(self.cursor_gcol);
        self.cursor_row = self.cursor_row.saturating_add(count).min(last);
        self.cursor_gcol = target.min(line_gcount(&self.text, self.cursor_row));
        self.sync_caret_from_visual();
        trace!(row = self.cursor_row, gcol = self.cursor_gcol, "after move down");
    }

    pub fn go_to_line(&mut self, row: usize) {
        let row = row.min(last_row(&self.text));
        self.set_caret(first_non_blank(&self.text, row));
        self.clear_desired_gcol();
    }

    pub fn go_to_last_line(&mut self) {
        self.go_to_line(last_row(&self.text));
    }

    pub fn line_start(&mut self) {
        let (start, _) = line_span(&self.text, self.cursor_row);
        self.set_caret(start);
        self.clear_desired_gcol();
    }

    pub fn first_non_blank(&mut self) {
        self.set_caret(first_non_blank(&self.text, self.cursor_row));
        self.clear_desired_gcol();
    }

    pub fn line_end(&mut self) {
        let (_, end) = line_span(&self.text, self.cursor_row);
        self.set_caret(end);
        self.desired_gcol = Some(usize::MAX);
    }

    pub fn word_forward(&mut self, count: usize) {
        for _ in 0..count {
            self.caret = next_word_start(&self.text, self.caret);
        }
        self.sync_visual_from_caret();
        self.clear_desired_gcol();
    }

    pub fn word_backward(&mut self, count: usize) {
        for _ in 0..count {
            self.caret = prev_word_start(&self.text, self.caret);
        }
        self.sync_visual_from_caret();
        self.clear_desired_gcol();
    }

    pub fn word_end(&mut self, count: usize) {
        for _ in 0..count {
            self.caret = word_end(&self.text, self.caret);
        }
        self.sync_visual_from_caret();
        self.clear_desired_gcol();
    }

    /// `f`, `F`, `t`, `T`: find `c` on the current line. Returns false when absent.
    pub fn find_char(&mut self, c: char, forward: bool, till: bool, count: usize) -> bool {
        let (start, end) = line_span(&self.text, self.cursor_row);
        let mut found = None;
        let mut seen = 0;
        if forward {
            for ci in (self.caret + 1)..end {
                if self.text.char(ci) == c {
                    seen += 1;
                    if seen == count {
                        found = Some(if till { ci - 1 } else { ci });
                        break;
                    }
                }
            }
        } else {
            for ci in (start..self.caret).rev() {
                if self.text.char(ci) == c {
                    seen += 1;
                    if seen == count {
                        found = Some(if till { ci + 1 } else { ci });
                        break;
                    }
                }
            }
        }
        match found {
            Some(ci) => {
                self.set_caret(ci);
                self.clear_desired_gcol();
                true
            }
            None => false,
        }
    }

    // ── Insert: cursor is grapheme-based; edits happen at char indices ──

    pub fn insert_char(&mut self, c: char) {
        let mut buf = [0u8; 4];
        self.insert_str(c.encode_utf8(&mut buf));
    }

    pub fn insert_str(&mut self, s: &str) {
        let at = self.caret;
        self.text.insert(at, s);
        self.caret = at + s.chars().count();
        self.sync_visual_from_caret();
        self.clear_desired_gcol();
        trace!(row = self.cursor_row, gcol = self.cursor_gcol, "after insert");
    }

    /// Insert a line break; `copy_margin` repeats the current indentation.
    pub fn newline(&mut self, copy_margin: bool) {
        let margin = if copy_margin {
            indentation(&self.text, self.cursor_row)
        } else {
            String::new()
        };
        self.insert_str(&format!("\n{}", margin));
    }

    /// Tab key in insert mode: spaces up to the next shiftwidth stop, or a tab.
    pub fn insert_tab(&mut self) {
        if self.settings.expandtab {
            let sw = self.settings.shiftwidth.max(1);
            let (start, _) = line_span(&self.text, self.cursor_row);
            let col = self.caret - start;
            let width = sw - col % sw;
            self.insert_str(&" ".repeat(width));
        } else {
            self.insert_char('\t');
        }
    }

    /// Overwrite the grapheme under the caret (replace mode).
    pub fn overwrite_char(&mut self, c: char) {
        let (_, end) = line_span(&self.text, self.cursor_row);
        if self.caret < end {
            let next = next_grapheme(&self.text, self.caret).min(end);
            self.text.remove(self.caret..next);
        }
        self.insert_char(c);
    }

    // ── Backspace: delete previous grapheme cluster ─────────────────────

    pub fn backspace(&mut self) {
        let here = self.caret;
        if here > 0 {
            let del = if self.text.char(here - 1) == '\n' {
                if here >= 2 && self.text.char(here - 2) == '\r' {
                    (here - 2, here)
                } else {
                    (here - 1, here)
                }
            } else {
                (prev_grapheme(&self.text, here), here)
            };
            self.text.remove(del.0..del.1);
            self.caret = del.0;
            self.sync_visual_from_caret();
        }
        self.clear_desired_gcol();
    }

    // ── Delete: delete next grapheme cluster ────────────────────────────

    pub fn delete_forward(&mut self) {
        let here = self.caret;
        let len = self.text.len_chars();
        if here < len {
            let end = if self.text.char(here) == '\r' && here + 1 < len && self.text.char(here + 1) == '\n' {
                here + 2
            } else if self.text.char(here) == '\n' {
                here + 1
            } else {
                next_grapheme(&self.text, here).max(here + 1)
            };
            self.text.remove(here..end);
            self.sync_visual_from_caret();
        }
        self.clear_desired_gcol();
    }

    /// `x`: delete up to `count` graphemes after the caret, within the line.
    pub fn delete_chars(&mut self, count: usize) -> String {
        let (_, end) = line_span(&self.text, self.cursor_row);
        let mut stop = self.caret;
        for _ in 0..count {
            if stop >= end {
                break;
            }
            stop = next_grapheme(&self.text, stop).min(end);
        }
        self.remove_range(self.caret, stop)
    }

    /// `X`: delete up to `count` graphemes before the caret, within the line.
    pub fn delete_chars_before(&mut self, count: usize) -> String {
        let (start, _) = line_span(&self.text, self.cursor_row);
        let mut from = self.caret;
        for _ in 0..count {
            if from <= start {
                break;
            }
            from = prev_grapheme(&self.text, from).max(start);
        }
        let removed = self.remove_range(from, self.caret);
        self.set_caret(from);
        removed
    }

    /// `D`, `C`: delete from the caret to the end of the line.
    pub fn delete_to_line_end(&mut self) -> String {
        let (_, end) = line_span(&self.text, self.cursor_row);
        self.remove_range(self.caret, end)
    }

    /// `dw`: delete to the next word start, never past the line end.
    pub fn delete_word(&mut self, count: usize) -> String {
        let (_, end) = line_span(&self.text, self.cursor_row);
        let mut stop = self.caret;
        for _ in 0..count {
            stop = next_word_start(&self.text, stop);
        }
        self.remove_range(self.caret, stop.min(end))
    }

    /// `cw`: delete to the end of the word, keeping trailing blanks.
    pub fn change_word(&mut self, count: usize) -> String {
        let mut stop = current_word_end(&self.text, self.caret);
        for _ in 1..count {
            stop = current_word_end(&self.text, next_word_start(&self.text, stop));
        }
        self.remove_range(self.caret, stop)
    }

    pub fn yank_word(&self, count: usize) -> String {
        let (_, end) = line_span(&self.text, self.cursor_row);
        let mut stop = self.caret;
        for _ in 0..count {
            stop = next_word_start(&self.text, stop);
        }
        self.text.slice(self.caret..stop.min(end).max(self.caret)).to_string()
    }

    fn remove_range(&mut self, from: usize, to: usize) -> String {
        if to <= from {
            return String::new();
        }
        let removed = self.text.slice(from..to).to_string();
        self.text.remove(from..to);
        self.set_caret(from);
        self.clear_desired_gcol();
        removed
    }

    // ── Linewise operations ─────────────────────────────────────────────

    /// `count` lines starting at the cursor row, joined by `\n`.
    pub fn yank_lines(&self, count: usize) -> String {
        let first = self.cursor_row;
        let last = first.saturating_add(count.max(1) - 1).min(last_row(&self.text));
        (first..=last).map(|row| self.line(row)).collect::<Vec<_>>().join("\n")
    }

    /// `dd`: delete `count` lines; the caret lands on the first non-blank of
    /// the line that follows.
    pub fn delete_lines(&mut self, count: usize) -> String {
        let first = self.cursor_row;
        let deleted = self.yank_lines(count);
        let last = first.saturating_add(count.max(1) - 1).min(last_row(&self.text));
        let from = self.text.line_to_char(first);
        let to = if last + 1 < self.text.len_lines() {
            self.text.line_to_char(last + 1)
        } else {
            self.text.len_chars()
        };
        // Deleting the tail of the buffer also removes the newline before it.
        let from = if to == self.text.len_chars() && from > 0 && last + 1 >= self.text.len_lines() {
            from - 1
        } else {
            from
        };
        self.text.remove(from..to);
        self.go_to_line(first);
        deleted
    }

    /// Replace rows `[first, last]` with `lines`.
    pub fn replace_lines(&mut self, first: usize, last: usize, lines: &[String]) {
        let last = last.min(last_row(&self.text));
        let (from, _) = line_span(&self.text, first);
        let (_, to) = line_span(&self.text, last);
        self.text.remove(from..to);
        self.text.insert(from, &lines.join("\n"));
        self.set_caret(self.caret);
    }

    /// Replace the whole text, moving the caret to `row`.
    pub fn set_text(&mut self, text: &str, row: usize) {
        self.text = Rope::from_str(text);
        self.go_to_line(row);
    }

    /// `J` / `gJ`: join the next line onto the current one.
    pub fn join_lines(&mut self, separator: &str) {
        let row = self.cursor_row;
        if row >= last_row(&self.text) {
            return;
        }
        let (_, end) = line_span(&self.text, row);
        let (next_start, _) = line_span(&self.text, row + 1);
        let content_start = first_non_blank(&self.text, row + 1);
        self.text.remove(end..content_start.max(next_start));
        self.text.insert(end, separator);
        self.set_caret(end);
        self.clear_desired_gcol();
    }

    pub fn open_line_below(&mut self, copy_margin: bool) {
        let (_, end) = line_span(&self.text, self.cursor_row);
        self.set_caret(end);
        self.newline(copy_margin);
    }

    pub fn open_line_above(&mut self, copy_margin: bool) {
        let margin = if copy_margin {
            indentation(&self.text, self.cursor_row)
        } else {
            String::new()
        };
        let (start, _) = line_span(&self.text, self.cursor_row);
        self.text.insert(start, &format!("{}\n", margin));
        self.set_caret(start + margin.chars().count());
        self.clear_desired_gcol();
    }

    /// `r`: replace `count` graphemes under the caret with `c`.
    pub fn replace_chars(&mut self, c: char, count: usize) -> bool {
        let (_, end) = line_span(&self.text, self.cursor_row);
        let mut stop = self.caret;
        for _ in 0..count {
            if stop >= end {
                return false;
            }
            stop = next_grapheme(&self.text, stop).min(end);
        }
        let from = self.caret;
        self.text.remove(from..stop);
        self.text.insert(from, &c.to_string().repeat(count));
        self.set_caret(from + count - 1);
        true
    }

    /// `~`: swap the case of the char under the caret and advance.
    pub fn toggle_case(&mut self, count: usize) {
        let (_, end) = line_span(&self.text, self.cursor_row);
        for _ in 0..count {
            if self.caret >= end {
                break;
            }
            let c = self.text.char(self.caret);
            let swapped: String = if c.is_lowercase() {
                c.to_uppercase().collect()
            } else {
                c.to_lowercase().collect()
            };
            self.text.remove(self.caret..self.caret + 1);
            self.text.insert(self.caret, &swapped);
            self.caret += swapped.chars().count();
        }
        self.sync_visual_from_caret();
    }

    pub fn transform_current_line(&mut self, f: impl Fn(&str) -> String) {
        let row = self.cursor_row;
        let transformed = f(&self.line(row));
        self.replace_lines(row, row, &[transformed]);
    }

    /// `>>`
    pub fn indent_line(&mut self) {
        let unit = if self.settings.expandtab {
            " ".repeat(self.settings.shiftwidth)
        } else {
            "\t".to_string()
        };
        let (start, _) = line_span(&self.text, self.cursor_row);
        let offset = self.caret - start;
        self.text.insert(start, &unit);
        self.set_caret(start + offset + unit.chars().count());
    }

    /// `<<` and `<C-d>`: remove one level of indentation.
    pub fn unindent_line(&mut self) {
        let (start, _) = line_span(&self.text, self.cursor_row);
        let line = self.current_line();
        let remove = if self.settings.expandtab {
            let spaces = line.len() - line.trim_start_matches(' ').len();
            let sw = self.settings.shiftwidth.max(1);
            if spaces == 0 {
                0
            } else if spaces % sw != 0 {
                spaces % sw
            } else {
                sw
            }
        } else {
            usize::from(line.starts_with('\t'))
        };
        if remove == 0 {
            return;
        }
        let offset = self.caret - start;
        self.text.remove(start..start + remove);
        self.set_caret(start + offset.saturating_sub(remove));
    }

    /// Paste `register` `count` times, after or before the caret.
    pub fn paste(&mut self, register: &Register, after: bool, count: usize) {
        let count = count.clamp(1, MAX_COUNT);
        if register.linewise {
            let block = vec![register.text.as_str(); count].join("\n");
            let row = self.cursor_row;
            if after {
                let (_, end) = line_span(&self.text, row);
                self.text.insert(end, &format!("\n{}", block));
                self.go_to_line(row + 1);
            } else {
                let (start, _) = line_span(&self.text, row);
                self.text.insert(start, &format!("{}\n", block));
                self.go_to_line(row);
            }
        } else {
            let (_, end) = line_span(&self.text, self.cursor_row);
            let at = if after && self.caret < end {
                next_grapheme(&self.text, self.caret).min(end)
            } else {
                self.caret
            };
            let block = register.text.repeat(count);
            self.text.insert(at, &block);
            let inserted = block.chars().count();
            self.set_caret((at + inserted).saturating_sub(1));
        }
        self.clear_desired_gcol();
    }

    // ── Undo / redo ─────────────────────────────────────────────────────

    pub fn save_to_undo_stack(&mut self) {
        let snapshot = Snapshot {
            text: self.text.clone(),
            caret: self.caret,
        };
        // Consecutive saves without a change in between collapse into one.
        if let Some(top) = self.undo_stack.last() {
            if top.text == snapshot.text {
                return;
            }
        }
        self.undo_stack.push(snapshot);
        self.redo_stack.clear();
    }

    pub fn undo(&mut self) -> bool {
        while let Some(snapshot) = self.undo_stack.pop() {
            if snapshot.text == self.text {
                continue;
            }
            self.redo_stack.push(Snapshot {
                text: self.text.clone(),
                caret: self.caret,
            });
            self.text = snapshot.text;
            self.set_caret(snapshot.caret);
            return true;
        }
        false
    }

    pub fn redo(&mut self) -> bool {
        match self.redo_stack.pop() {
            Some(snapshot) => {
                self.undo_stack.push(Snapshot {
                    text: self.text.clone(),
                    caret: self.caret,
                });
                self.text = snapshot.text;
                self.set_caret(snapshot.caret);
                true
            }
            None => false,
        }
    }

    /// Lint reports for the cursor row.
    pub fn report_at_cursor(&self) -> Option<&Report> {
        self.reports.iter().find(|r| r.line == self.cursor_row)
    }
}

fn set_readonly(path: &Path, readonly: bool) -> Result<()> {
    let mut permissions = fs::metadata(path)?.permissions();
    permissions.set_readonly(readonly);
    fs::set_permissions(path, permissions)?;
    Ok(())
}
