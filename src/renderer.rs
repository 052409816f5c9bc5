//! Screen drawing.
//!
//! Each frame is composed into a grid of cells and then written in one pass
//! over the rows, so the screen is never cleared between frames.

use std::io::{self, Write};

use crossterm::cursor::{self, MoveTo, SetCursorStyle};
use crossterm::queue;
use crossterm::style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;
use unicode_width::UnicodeWidthStr;

use crate::buffer::EditorBuffer;
use crate::editor::Editor;
use crate::graphemes::line_span;
use crate::input::Mode;
use crate::search;
use crate::settings::EditorSettings;
use crate::syntax::{Highlighter, Language};
use crate::window::{Rect, WindowLayout};

const MENU_ROWS: usize = 8;
const SHOWCMD_WIDTH: u16 = 11;

#[derive(Debug, Clone, PartialEq, Eq)]
struct Cell {
    /// Empty for the second column of a wide character.
    symbol: String,
    fg: Option<Color>,
    bg: Option<Color>,
}

impl Default for Cell {
    fn default() -> Self {
        Self {
            symbol: " ".to_string(),
            fg: None,
            bg: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Bar,
    Underline,
}

/// One composed screen.
pub struct Frame {
    width: u16,
    height: u16,
    cells: Vec<Cell>,
    pub cursor: (u16, u16),
    pub cursor_shape: CursorShape,
}

impl Frame {
    fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![Cell::default(); width as usize * height as usize],
            cursor: (0, 0),
            cursor_shape: CursorShape::Block,
        }
    }

    fn cell_mut(&mut self, x: u16, y: u16) -> Option<&mut Cell> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = y as usize * self.width as usize + x as usize;
        self.cells.get_mut(index)
    }

    fn put(&mut self, x: u16, y: u16, symbol: &str, width: usize, fg: Option<Color>, bg: Option<Color>) {
        if let Some(cell) = self.cell_mut(x, y) {
            *cell = Cell {
                symbol: symbol.to_string(),
                fg,
                bg,
            };
        }
        for i in 1..width {
            if let Some(cell) = self.cell_mut(x + i as u16, y) {
                *cell = Cell {
                    symbol: String::new(),
                    fg,
                    bg,
                };
            }
        }
    }

    /// Write `text` from `x`, stopping before column `end`. Returns the
    /// column after the last grapheme written.
    fn text(&mut self, x: u16, y: u16, end: u16, text: &str, fg: Option<Color>, bg: Option<Color>) -> u16 {
        let mut x = x;
        for g in text.graphemes(true) {
            let width = g.width().max(1) as u16;
            if x + width > end {
                break;
            }
            self.put(x, y, g, width as usize, fg, bg);
            x += width;
        }
        x
    }

    fn fill(&mut self, from: u16, y: u16, end: u16, bg: Option<Color>) {
        for x in from..end.min(self.width) {
            self.put(x, y, " ", 1, None, bg);
        }
    }

    /// The characters of row `y`, without trailing blanks.
    pub fn row_text(&self, y: u16) -> String {
        let start = y as usize * self.width as usize;
        let row = &self.cells[start..start + self.width as usize];
        let text: String = row.iter().map(|c| c.symbol.as_str()).collect();
        text.trim_end().to_string()
    }

    fn row_cells(&self, y: u16) -> &[Cell] {
        let start = y as usize * self.width as usize;
        &self.cells[start..start + self.width as usize]
    }
}

// ── Line layout ─────────────────────────────────────────────────────────

/// One drawn grapheme. Tabs become several one-column glyphs.
struct Glyph {
    symbol: String,
    width: usize,
    /// Char offset of the grapheme within its line.
    char_index: usize,
    unprintable: bool,
}

fn glyphs(line: &str, tabstop: usize, list: bool) -> Vec<Glyph> {
    let tabstop = tabstop.max(1);
    let mut out = Vec::new();
    let mut col = 0;
    let mut char_index = 0;
    for g in line.graphemes(true) {
        let first = g.chars().next().unwrap_or(' ');
        if g == "\t" {
            let width = tabstop - col % tabstop;
            for i in 0..width {
                let symbol = if list && i == 0 { ">" } else { " " };
                out.push(Glyph {
                    symbol: symbol.to_string(),
                    width: 1,
                    char_index,
                    unprintable: list,
                });
            }
            col += width;
        } else if first.is_control() {
            let symbol = match first as u32 {
                0x7f => "^?".to_string(),
                n if n < 0x20 => format!("^{}", char::from(n as u8 + b'@')),
                _ => "?".to_string(),
            };
            let width = symbol.len();
            out.push(Glyph {
                symbol,
                width,
                char_index,
                unprintable: true,
            });
            col += width;
        } else {
            let width = g.width().max(1);
            out.push(Glyph {
                symbol: g.to_string(),
                width,
                char_index,
                unprintable: false,
            });
            col += width;
        }
        char_index += g.chars().count();
    }
    out
}

/// Screen column of char offset `char_in_line`.
fn display_col(glyphs: &[Glyph], char_in_line: usize) -> usize {
    let mut col = 0;
    for g in glyphs {
        if g.char_index >= char_in_line {
            return col;
        }
        col += g.width;
    }
    col
}

fn line_width(glyphs: &[Glyph]) -> usize {
    glyphs.iter().map(|g| g.width).sum()
}

fn cursor_char_in_line(buffer: &EditorBuffer) -> usize {
    let (start, _) = line_span(&buffer.text, buffer.cursor_row);
    buffer.caret().saturating_sub(start)
}

fn gutter_width(settings: &EditorSettings, buffer: &EditorBuffer) -> usize {
    let mut width = 0;
    if !buffer.reports.is_empty() {
        width += 1;
    }
    if settings.show_line_numbers || settings.relative_number {
        width += buffer.line_count().to_string().len().max(3) + 1;
    }
    width
}

fn language(buffer: &EditorBuffer) -> Language {
    buffer
        .filetype
        .as_deref()
        .map_or(Language::Plain, Language::from_name)
}

/// Screen rows taken by `row` when lines wrap at `width`.
fn wrapped_rows(buffer: &EditorBuffer, row: usize, width: usize, list: bool) -> usize {
    let total = line_width(&glyphs(&buffer.line(row), buffer.settings.tabstop, list));
    (total.max(1) + width - 1) / width
}

fn text_area(editor: &Editor, width: u16, height: u16) -> Rect {
    let top = u16::from(editor.windows.tabs().len() > 1);
    Rect {
        x: 0,
        y: top,
        width,
        height: height.saturating_sub(top + 1),
    }
}

// ── Scrolling ───────────────────────────────────────────────────────────

/// First visible line so that `row` is on screen with `scrolloff` lines
/// of context where the window is tall enough.
fn scroll_to(scroll: usize, row: usize, rows: usize, scrolloff: usize) -> usize {
    if rows == 0 {
        return row;
    }
    let so = scrolloff.min(rows.saturating_sub(1) / 2);
    if row < scroll + so {
        row.saturating_sub(so)
    } else if row + so >= scroll + rows {
        row + so + 1 - rows
    } else {
        scroll
    }
}

/// Move every window of the active tab so its cursor is visible, and
/// record the active window's height for page motions.
pub fn prepare(editor: &mut Editor, width: u16, height: u16) {
    let layout = editor.windows.layout(text_area(editor, width, height));
    let active = editor.windows.active_window().id;
    let settings = &editor.settings;

    let mut updates = Vec::new();
    for wl in &layout.windows {
        let Some(window) = editor.windows.tab().windows().into_iter().find(|w| w.id == wl.id).cloned() else {
            continue;
        };
        let buffer = &editor.windows.buffers[wl.buffer];
        let rows = wl.area.height.saturating_sub(1) as usize;
        let cols = (wl.area.width as usize).saturating_sub(gutter_width(settings, buffer));
        let row = buffer.cursor_row;
        let list = settings.display_unprintable;

        let mut scroll = scroll_to(window.scroll, row, rows, settings.scroll_offset);
        let mut left_col = 0;
        if settings.wrap_lines && cols > 0 {
            while scroll < row
                && (scroll..=row).map(|r| wrapped_rows(buffer, r, cols, list)).sum::<usize>() > rows
            {
                scroll += 1;
            }
        } else if cols > 0 {
            let line = glyphs(&buffer.line(row), buffer.settings.tabstop, list);
            let dcol = display_col(&line, cursor_char_in_line(buffer));
            left_col = window.left_col;
            if dcol < left_col {
                left_col = dcol;
            } else if dcol >= left_col + cols {
                left_col = dcol + 1 - cols;
            }
        }
        updates.push((wl.id, scroll, left_col, rows));
    }

    for (id, scroll, left_col, rows) in updates {
        if let Some(window) = editor.windows.window_mut(id) {
            window.scroll = scroll;
            window.left_col = left_col;
        }
        if id == active {
            editor.set_page_height(rows);
        }
    }
}

// ── Composition ─────────────────────────────────────────────────────────

fn search_highlight(editor: &Editor) -> Option<Regex> {
    let ignore_case = editor.settings.ignore_case;
    if let Mode::Search(_) = editor.mode() {
        let (typed, _) = editor.command_line();
        if editor.settings.incsearch && !typed.is_empty() {
            return search::compile(typed, ignore_case).ok();
        }
    }
    if !editor.settings.highlight_search {
        return None;
    }
    let state = editor.search_state()?;
    search::compile(&state.pattern, ignore_case).ok()
}

/// Compose the whole screen for a terminal of `width` x `height`.
pub fn compose(editor: &Editor, width: u16, height: u16) -> Frame {
    let mut frame = Frame::new(width, height);
    if width == 0 || height < 2 {
        return frame;
    }

    if editor.windows.tabs().len() > 1 {
        draw_tab_bar(&mut frame, editor);
    }

    let layout = editor.windows.layout(text_area(editor, width, height));
    let highlight = search_highlight(editor);
    let active = editor.windows.active_window().id;
    for wl in &layout.windows {
        let cursor = draw_window(&mut frame, editor, wl, wl.id == active, highlight.as_ref());
        if let Some(cursor) = cursor {
            frame.cursor = cursor;
        }
    }
    let separator_bg = Some(editor.theme.status_inactive_bg);
    for sep in &layout.separators {
        for y in sep.y..sep.y + sep.height {
            frame.put(sep.x, y, "│", 1, Some(editor.theme.status_fg), separator_bg);
        }
    }

    draw_command_line(&mut frame, editor);
    if editor.mode() == Mode::Insert {
        draw_completion_menu(&mut frame, editor);
    }
    frame.cursor_shape = match editor.mode() {
        Mode::Insert | Mode::CommandLine | Mode::Search(_) => CursorShape::Bar,
        Mode::Replace => CursorShape::Underline,
        Mode::Normal => CursorShape::Block,
    };
    frame
}

fn draw_tab_bar(frame: &mut Frame, editor: &Editor) {
    let theme = &editor.theme;
    let mut x = 0;
    for (i, tab) in editor.windows.tabs().iter().enumerate() {
        let buffer = &editor.windows.buffers[tab.active_window().buffer];
        let modified = if buffer.has_unsaved_changes() { "+" } else { "" };
        let label = format!(" {} {}{} ", i + 1, buffer.display_name(true), modified);
        let bg = if i == editor.windows.active_tab_index() {
            theme.tab_active_bg
        } else {
            theme.status_inactive_bg
        };
        x = frame.text(x, 0, frame.width, &label, Some(theme.status_fg), Some(bg));
    }
    frame.fill(x, 0, frame.width, Some(theme.status_inactive_bg));
}

/// Draw one window and its status bar. Returns the screen cursor when the
/// window is active.
fn draw_window(
    frame: &mut Frame,
    editor: &Editor,
    wl: &WindowLayout,
    active: bool,
    highlight: Option<&Regex>,
) -> Option<(u16, u16)> {
    let theme = &editor.theme;
    let settings = &editor.settings;
    let window = editor.windows.tab().windows().into_iter().find(|w| w.id == wl.id)?;
    let buffer = editor.windows.buffers.get(wl.buffer)?;

    let area = wl.area;
    let text_rows = area.height.saturating_sub(1);
    let right = area.x + area.width;
    let gutter = gutter_width(settings, buffer) as u16;
    let text_x = (area.x + gutter).min(right);
    let text_width = (right - text_x) as usize;
    let numbers = settings.show_line_numbers || settings.relative_number;
    let number_width = (gutter as usize).saturating_sub(usize::from(!buffer.reports.is_empty()) + 1);
    let list = settings.display_unprintable;
    let line_count = buffer.line_count();

    let cursor_line = glyphs(&buffer.line(buffer.cursor_row), buffer.settings.tabstop, list);
    let cursor_dcol = display_col(&cursor_line, cursor_char_in_line(buffer));

    let mut highlighter = Highlighter::new(language(buffer));
    for row in 0..window.scroll.min(line_count) {
        highlighter.line(&buffer.line(row));
    }

    let mut cursor = None;
    let mut y = 0;
    let mut row = window.scroll;
    while y < text_rows {
        let sy = area.y + y;
        if row >= line_count {
            frame.put(area.x, sy, "~", 1, Some(theme.line_number), None);
            y += 1;
            continue;
        }

        let line = buffer.line(row);
        let classes = highlighter.line(&line);
        let matches = highlight.map(|re| search::line_matches(re, &line)).unwrap_or_default();
        let line_glyphs = glyphs(&line, buffer.settings.tabstop, list);
        let is_cursor_row = active && row == buffer.cursor_row;
        let row_bg = (is_cursor_row && settings.cursorline).then_some(theme.cursorline_bg);

        let total = line_width(&line_glyphs);
        let chunks: Vec<(usize, usize)> = if text_width == 0 {
            vec![(0, 0)]
        } else if settings.wrap_lines {
            (0..total.max(1))
                .step_by(text_width)
                .map(|from| (from, from + text_width))
                .collect()
        } else {
            vec![(window.left_col, window.left_col + text_width)]
        };

        for (i, &(from, to)) in chunks.iter().enumerate() {
            if y >= text_rows {
                break;
            }
            let sy = area.y + y;

            // Gutter
            let mut gx = area.x;
            if !buffer.reports.is_empty() {
                let marked = i == 0 && buffer.reports.iter().any(|r| r.line == row);
                let symbol = if marked { "!" } else { " " };
                frame.put(gx, sy, symbol, 1, Some(theme.lint_marker), None);
                gx += 1;
            }
            if numbers {
                let label = if i > 0 {
                    String::new()
                } else if settings.relative_number && row != buffer.cursor_row {
                    row.abs_diff(buffer.cursor_row).to_string()
                } else if settings.relative_number && !settings.show_line_numbers {
                    "0".to_string()
                } else {
                    (row + 1).to_string()
                };
                let text = format!("{:>width$} ", label, width = number_width);
                frame.text(gx, sy, text_x, &text, Some(theme.line_number), None);
            }

            // Backgrounds
            for x in text_x..right {
                let dcol = from + (x - text_x) as usize;
                let bg = if settings.colorcolumn.contains(&(dcol + 1)) {
                    Some(theme.colorcolumn_bg)
                } else if active && settings.cursorcolumn && dcol == cursor_dcol {
                    Some(theme.cursorline_bg)
                } else {
                    row_bg
                };
                frame.put(x, sy, " ", 1, None, bg);
            }

            // Text
            let mut dcol = 0;
            for glyph in &line_glyphs {
                let start = dcol;
                dcol += glyph.width;
                if start < from || start + glyph.width > to {
                    continue;
                }
                let x = text_x + (start - from) as u16;
                let fg = if glyph.unprintable {
                    Some(theme.unprintable)
                } else {
                    classes.get(glyph.char_index).and_then(|hl| theme.highlight(*hl))
                };
                let in_match = matches
                    .iter()
                    .any(|&(s, e)| glyph.char_index >= s && glyph.char_index < e);
                let bg = if in_match {
                    Some(theme.search_bg)
                } else {
                    frame.cell_mut(x, sy).and_then(|c| c.bg)
                };
                frame.put(x, sy, &glyph.symbol, glyph.width, fg, bg);
            }

            if is_cursor_row && text_width > 0 {
                let last = i + 1 == chunks.len();
                if (cursor_dcol >= from && cursor_dcol < to) || (last && cursor_dcol >= to) {
                    let offset = (cursor_dcol.saturating_sub(from)).min(text_width - 1);
                    cursor = Some((text_x + offset as u16, sy));
                }
            }
            y += 1;
        }
        row += 1;
    }

    draw_status_bar(frame, editor, buffer, area, active);
    if active {
        // A window too small to show text still gets a cursor.
        Some(cursor.unwrap_or((text_x.min(right.saturating_sub(1)), area.y)))
    } else {
        None
    }
}

fn draw_status_bar(frame: &mut Frame, editor: &Editor, buffer: &EditorBuffer, area: Rect, active: bool) {
    if area.height == 0 {
        return;
    }
    let theme = &editor.theme;
    let y = area.y + area.height - 1;
    let right = area.x + area.width;
    let bg = Some(if active {
        theme.status_bg
    } else {
        theme.status_inactive_bg
    });
    let fg = Some(theme.status_fg);

    let mut left = format!(" {}", buffer.display_name(false));
    if buffer.has_unsaved_changes() {
        left.push_str(" [+]");
    }
    if active {
        match editor.mode() {
            Mode::Insert => left.push_str("  -- INSERT --"),
            Mode::Replace => left.push_str("  -- REPLACE --"),
            _ => {}
        }
    }

    let mut right_text = String::new();
    if let Some(filetype) = &buffer.filetype {
        right_text.push_str(filetype);
        right_text.push_str("  ");
    }
    if editor.settings.show_ruler {
        right_text.push_str(&format!("{},{}", buffer.cursor_row + 1, buffer.cursor_gcol + 1));
    }
    right_text.push(' ');

    frame.fill(area.x, y, right, bg);
    let right_width = right_text.width() as u16;
    let left_end = right.saturating_sub(right_width + 1).max(area.x);
    frame.text(area.x, y, left_end, &left, fg, bg);
    if right_width < area.width {
        frame.text(right - right_width, y, right, &right_text, fg, bg);
    }
}

fn draw_command_line(frame: &mut Frame, editor: &Editor) {
    let y = frame.height - 1;
    let width = frame.width;
    match editor.mode() {
        Mode::CommandLine | Mode::Search(_) => {
            let prompt = match editor.mode() {
                Mode::Search(direction) => direction.prompt(),
                _ => ':',
            };
            let (text, cursor) = editor.command_line();
            let line = format!("{}{}", prompt, text);
            frame.text(0, y, width, &line, None, None);
            let before: String = text.chars().take(cursor).collect();
            let x = (1 + before.width()).min(width as usize - 1);
            frame.cursor = (x as u16, y);
        }
        _ => {
            if let Some(message) = editor.message() {
                let first = message.lines().next().unwrap_or("");
                frame.text(0, y, width, first, None, None);
            }
            let pending = editor.pending_keys();
            if !pending.is_empty() && width > SHOWCMD_WIDTH {
                let x = width - SHOWCMD_WIDTH;
                frame.fill(x, y, width, None);
                frame.text(x, y, width, &pending, None, None);
            }
        }
    }
}

/// Candidate list under (or over) the cursor while `<C-n>`/`<C-p>` cycles.
fn draw_completion_menu(frame: &mut Frame, editor: &Editor) {
    let Some(completion) = editor.completion() else {
        return;
    };
    let candidates = completion.candidates();
    if candidates.is_empty() {
        return;
    }
    let theme = &editor.theme;
    let (cx, cy) = frame.cursor;
    let bottom = frame.height.saturating_sub(1);

    let first = completion
        .selected()
        .map_or(0, |s| s.saturating_sub(MENU_ROWS - 1));
    let shown = &candidates[first..candidates.len().min(first + MENU_ROWS)];
    let rows = shown.len() as u16;
    let inner = shown.iter().map(|c| c.width()).max().unwrap_or(0) as u16 + 2;
    let width = inner.min(frame.width);
    let x = cx.min(frame.width.saturating_sub(width));
    let top = if cy + 1 + rows <= bottom {
        cy + 1
    } else {
        cy.saturating_sub(rows)
    };

    for (i, candidate) in shown.iter().enumerate() {
        let y = top + i as u16;
        let selected = completion.selected() == Some(first + i);
        let bg = Some(if selected {
            theme.tab_active_bg
        } else {
            theme.status_inactive_bg
        });
        frame.fill(x, y, x + width, bg);
        frame.text(x + 1, y, x + width, candidate, Some(theme.status_fg), bg);
    }
}

// ── Output ──────────────────────────────────────────────────────────────

/// Scroll, compose and draw one frame.
pub fn render(out: &mut impl Write, editor: &mut Editor, (width, height): (u16, u16)) -> io::Result<()> {
    prepare(editor, width, height);
    let frame = compose(editor, width, height);
    draw(out, &frame)
}

fn draw(out: &mut impl Write, frame: &Frame) -> io::Result<()> {
    queue!(out, cursor::Hide)?;
    for y in 0..frame.height {
        queue!(out, MoveTo(0, y), ResetColor)?;
        let mut fg = None;
        let mut bg = None;
        for cell in frame.row_cells(y) {
            if cell.symbol.is_empty() {
                continue;
            }
            if cell.fg != fg {
                queue!(out, SetForegroundColor(cell.fg.unwrap_or(Color::Reset)))?;
                fg = cell.fg;
            }
            if cell.bg != bg {
                queue!(out, SetBackgroundColor(cell.bg.unwrap_or(Color::Reset)))?;
                bg = cell.bg;
            }
            queue!(out, Print(&cell.symbol))?;
        }
    }
    let shape = match frame.cursor_shape {
        CursorShape::Block => SetCursorStyle::SteadyBlock,
        CursorShape::Bar => SetCursorStyle::SteadyBar,
        CursorShape::Underline => SetCursorStyle::SteadyUnderScore,
    };
    queue!(
        out,
        ResetColor,
        MoveTo(frame.cursor.0, frame.cursor.1),
        shape,
        cursor::Show
    )?;
    out.flush()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::parse_keys;
    use crate::tools::Report;

    fn editor_with(text: &str) -> Editor {
        let mut editor = Editor::new();
        *editor.active_buffer_mut() = EditorBuffer::from_text(text, editor.settings.buffer_defaults);
        editor
    }

    fn type_keys(editor: &mut Editor, notation: &str) {
        for key in parse_keys(notation).unwrap() {
            editor.handle_key(key);
        }
    }

    fn frame(editor: &mut Editor, width: u16, height: u16) -> Frame {
        prepare(editor, width, height);
        compose(editor, width, height)
    }

    #[test]
    fn text_rows_tildes_and_status() {
        let mut e = editor_with("hello\nworld");
        let f = frame(&mut e, 30, 6);
        assert_eq!(f.row_text(0), "hello");
        assert_eq!(f.row_text(1), "world");
        assert_eq!(f.row_text(2), "~");
        assert!(f.row_text(4).starts_with(" [New file]"));
        assert!(f.row_text(4).ends_with("1,1"));
        assert_eq!(f.row_text(5), "");
        assert_eq!(f.cursor, (0, 0));
        assert_eq!(f.cursor_shape, CursorShape::Block);
    }

    #[test]
    fn line_numbers_and_relative_numbers() {
        let mut e = editor_with("a\nb\nc");
        e.settings.show_line_numbers = true;
        let f = frame(&mut e, 20, 5);
        assert_eq!(f.row_text(0), "  1 a");
        assert_eq!(f.row_text(2), "  3 c");
        assert_eq!(f.cursor, (4, 0));

        e.settings.relative_number = true;
        type_keys(&mut e, "j");
        let f = frame(&mut e, 20, 5);
        assert_eq!(f.row_text(0), "  1 a");
        assert_eq!(f.row_text(1), "  2 b");
        assert_eq!(f.row_text(2), "  1 c");
    }

    #[test]
    fn lint_marker_column() {
        let mut e = editor_with("x = 1\ny");
        e.active_buffer_mut().reports = vec![Report {
            line: 1,
            column: None,
            message: "undefined name 'y'".into(),
        }];
        let f = frame(&mut e, 20, 4);
        assert_eq!(f.row_text(0), " x = 1");
        assert_eq!(f.row_text(1), "!y");
    }

    #[test]
    fn tabs_expand_to_tabstop() {
        let mut e = editor_with("\tx\nab\ty");
        let f = frame(&mut e, 20, 4);
        assert_eq!(f.row_text(0), "    x");
        assert_eq!(f.row_text(1), "ab  y");

        e.settings.display_unprintable = true;
        let f = frame(&mut e, 20, 4);
        assert_eq!(f.row_text(0), ">   x");
    }

    #[test]
    fn wide_characters_move_the_cursor_two_columns() {
        let mut e = editor_with("日本語");
        type_keys(&mut e, "l");
        let f = frame(&mut e, 20, 4);
        assert_eq!(f.row_text(0), "日本語");
        assert_eq!(f.cursor, (2, 0));
    }

    #[test]
    fn scrolling_keeps_cursor_visible_with_scrolloff() {
        let text: Vec<String> = (1..=30).map(|n| format!("line {}", n)).collect();
        let mut e = editor_with(&text.join("\n"));
        e.settings.scroll_offset = 2;
        type_keys(&mut e, "20G");
        let f = frame(&mut e, 20, 10);
        // 8 text rows: line 20 sits two rows above the bottom.
        assert_eq!(f.row_text(5), "line 20");
        assert_eq!(f.row_text(7), "line 22");
        assert_eq!(f.cursor, (0, 5));

        type_keys(&mut e, "gg");
        let f = frame(&mut e, 20, 10);
        assert_eq!(f.row_text(0), "line 1");
    }

    #[test]
    fn long_lines_wrap_or_scroll_sideways() {
        let mut e = editor_with("abcdefghijkl");
        type_keys(&mut e, "$");
        let f = frame(&mut e, 5, 5);
        assert_eq!(f.row_text(0), "abcde");
        assert_eq!(f.row_text(1), "fghij");
        assert_eq!(f.row_text(2), "kl");
        assert_eq!(f.cursor, (1, 2));

        e.settings.wrap_lines = false;
        let f = frame(&mut e, 5, 5);
        assert_eq!(f.row_text(0), "hijkl");
        assert_eq!(f.cursor, (4, 0));
    }

    #[test]
    fn modified_flag_and_mode_in_status_bar() {
        let mut e = editor_with("");
        type_keys(&mut e, "ihi");
        let f = frame(&mut e, 40, 4);
        assert!(f.row_text(2).starts_with(" [New file] [+]  -- INSERT --"));
        assert_eq!(f.cursor, (2, 0));
        assert_eq!(f.cursor_shape, CursorShape::Bar);
    }

    #[test]
    fn command_line_and_message() {
        let mut e = editor_with("x");
        type_keys(&mut e, ":set");
        let f = frame(&mut e, 20, 4);
        assert_eq!(f.row_text(3), ":set");
        assert_eq!(f.cursor, (4, 3));

        type_keys(&mut e, "<Esc>");
        e.show_message("Unknown option: x");
        let f = frame(&mut e, 30, 4);
        assert_eq!(f.row_text(3), "Unknown option: x");
    }

    #[test]
    fn pending_keys_show_on_the_right() {
        let mut e = editor_with("x");
        type_keys(&mut e, "2d");
        let f = frame(&mut e, 30, 4);
        assert!(f.row_text(3).ends_with("2d"));
    }

    #[test]
    fn splits_and_tabs() {
        let mut e = editor_with("left");
        e.execute_command("vsplit");
        let f = frame(&mut e, 21, 5);
        assert!(f.row_text(0).contains('│'));
        assert!(f.row_text(0).starts_with("left"));

        e.execute_command("tabnew");
        let f = frame(&mut e, 30, 5);
        assert!(f.row_text(0).starts_with(" 1 [New file]  2 [New file]"));
        assert_eq!(f.row_text(1), "");
    }

    #[test]
    fn search_matches_are_highlighted() {
        let mut e = editor_with("one two one");
        type_keys(&mut e, "/one<CR>");
        let f = frame(&mut e, 20, 4);
        let cells = f.row_cells(0);
        assert_eq!(cells[0].bg, Some(e.theme.search_bg));
        assert_eq!(cells[4].bg, None);
        assert_eq!(cells[8].bg, Some(e.theme.search_bg));

        e.settings.highlight_search = false;
        let f = frame(&mut e, 20, 4);
        assert_eq!(f.row_cells(0)[0].bg, None);
    }

    #[test]
    fn completion_menu_lists_candidates() {
        let mut e = editor_with("alphabet alpine\n");
        type_keys(&mut e, "Goal<C-n>");
        let f = frame(&mut e, 30, 8);
        assert_eq!(f.row_text(2), "alpine");
        assert!(f.row_text(3).contains("alpine"));
        assert!(f.row_text(4).contains("alphabet"));
    }

    #[test]
    fn draw_writes_every_row() {
        let mut e = editor_with("hello");
        let mut out = Vec::new();
        render(&mut out, &mut e, (10, 3)).unwrap();
        let written = String::from_utf8_lossy(&out);
        assert!(written.contains("hello"));
    }
}
