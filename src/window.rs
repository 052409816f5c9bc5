//! Tab pages, split trees and the buffers they show.
//!
//! The arrangement owns every open buffer; windows refer to them by index.
//! There is always at least one buffer, one tab and one window.

use std::path::Path;

use tracing::debug;

use crate::buffer::EditorBuffer;
use crate::io::expand_tilde;

pub type WindowId = usize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub id: WindowId,
    pub buffer: usize,
    /// First visible line.
    pub scroll: usize,
    /// First visible column when lines do not wrap.
    pub left_col: usize,
}

impl Window {
    fn new(id: WindowId, buffer: usize) -> Self {
        Self {
            id,
            buffer,
            scroll: 0,
            left_col: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitDirection {
    /// Windows stacked top to bottom (`:split`).
    Horizontal,
    /// Windows side by side (`:vsplit`).
    Vertical,
}

#[derive(Debug, Clone)]
pub enum Node {
    Window(Window),
    Split {
        direction: SplitDirection,
        children: Vec<Node>,
    },
}

impl Node {
    fn collect<'a>(&'a self, out: &mut Vec<&'a Window>) {
        match self {
            Node::Window(w) => out.push(w),
            Node::Split { children, .. } => children.iter().for_each(|c| c.collect(out)),
        }
    }

    fn collect_mut<'a>(&'a mut self, out: &mut Vec<&'a mut Window>) {
        match self {
            Node::Window(w) => out.push(w),
            Node::Split { children, .. } => children.iter_mut().for_each(|c| c.collect_mut(out)),
        }
    }

    /// Put `new` next to window `target`. Gives `new` back when `target` is not here.
    fn split(&mut self, target: WindowId, direction: SplitDirection, new: Window) -> Option<Window> {
        match self {
            Node::Window(w) if w.id == target => {
                let old = std::mem::replace(
                    self,
                    Node::Split {
                        direction,
                        children: Vec::new(),
                    },
                );
                if let Node::Split { children, .. } = self {
                    children.push(Node::Window(new));
                    children.push(old);
                }
                None
            }
            Node::Window(_) => Some(new),
            Node::Split {
                direction: own,
                children,
            } => {
                if *own == direction {
                    let pos = children
                        .iter()
                        .position(|c| matches!(c, Node::Window(w) if w.id == target));
                    if let Some(pos) = pos {
                        children.insert(pos, Node::Window(new));
                        return None;
                    }
                }
                let mut new = new;
                for child in children.iter_mut() {
                    match child.split(target, direction, new) {
                        None => return None,
                        Some(back) => new = back,
                    }
                }
                Some(new)
            }
        }
    }

    /// Remove window `target` below this split node.
    fn remove(&mut self, target: WindowId) -> bool {
        let Node::Split { children, .. } = self else {
            return false;
        };
        let pos = children
            .iter()
            .position(|c| matches!(c, Node::Window(w) if w.id == target));
        let removed = match pos {
            Some(pos) => {
                children.remove(pos);
                true
            }
            None => children.iter_mut().any(|c| c.remove(target)),
        };
        if removed {
            self.collapse();
        }
        removed
    }

    /// Replace single-child splits by their child.
    fn collapse(&mut self) {
        if let Node::Split { children, .. } = self {
            children.iter_mut().for_each(Node::collapse);
            if children.len() == 1 {
                if let Some(only) = children.pop() {
                    *self = only;
                }
            }
        }
    }

    fn layout(&self, area: Rect, out: &mut Layout) {
        match self {
            Node::Window(w) => out.windows.push(WindowLayout {
                id: w.id,
                buffer: w.buffer,
                area,
            }),
            Node::Split {
                direction: SplitDirection::Horizontal,
                children,
            } => {
                let n = children.len() as u16;
                let each = area.height / n.max(1);
                let mut y = area.y;
                for (i, child) in children.iter().enumerate() {
                    let height = if i as u16 == n - 1 {
                        area.y + area.height - y
                    } else {
                        each
                    };
                    child.layout(Rect { y, height, ..area }, out);
                    y += height;
                }
            }
            Node::Split {
                direction: SplitDirection::Vertical,
                children,
            } => {
                let n = children.len() as u16;
                let usable = area.width.saturating_sub(n.saturating_sub(1));
                let each = usable / n.max(1);
                let mut x = area.x;
                for (i, child) in children.iter().enumerate() {
                    let last = i as u16 == n - 1;
                    let width = if last {
                        (area.x + area.width).saturating_sub(x)
                    } else {
                        each
                    };
                    child.layout(Rect { x, width, ..area }, out);
                    x += width;
                    if !last {
                        out.separators.push(Rect {
                            x,
                            width: 1,
                            ..area
                        });
                        x += 1;
                    }
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowLayout {
    pub id: WindowId,
    pub buffer: usize,
    /// Text rows plus the status row at the bottom.
    pub area: Rect,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Layout {
    pub windows: Vec<WindowLayout>,
    /// One-column vertical separators.
    pub separators: Vec<Rect>,
}

#[derive(Debug, Clone)]
pub struct TabPage {
    root: Node,
    active: WindowId,
}

impl TabPage {
    fn new(window: Window) -> Self {
        Self {
            active: window.id,
            root: Node::Window(window),
        }
    }

    pub fn windows(&self) -> Vec<&Window> {
        let mut out = Vec::new();
        self.root.collect(&mut out);
        out
    }

    fn windows_mut(&mut self) -> Vec<&mut Window> {
        let mut out = Vec::new();
        self.root.collect_mut(&mut out);
        out
    }

    pub fn window_count(&self) -> usize {
        self.windows().len()
    }

    pub fn active_window(&self) -> &Window {
        let windows = self.windows();
        let fallback = windows[0];
        windows
            .into_iter()
            .find(|w| w.id == self.active)
            .unwrap_or(fallback)
    }

    fn active_window_mut(&mut self) -> &mut Window {
        let active = self.active;
        let mut windows = self.windows_mut();
        let pos = windows.iter().position(|w| w.id == active).unwrap_or(0);
        windows.swap_remove(pos)
    }
}

/// One row of `:ls`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenBufferInfo {
    pub index: usize,
    pub is_active: bool,
    pub is_visible: bool,
    pub name: String,
    pub row: usize,
}

/// What closing a window or tab left behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Closed {
    Window,
    Tab,
    /// It was the last window of the last tab; nothing was removed.
    LastWindow,
}

pub struct WindowArrangement {
    pub buffers: Vec<EditorBuffer>,
    tabs: Vec<TabPage>,
    active_tab: usize,
    next_id: WindowId,
}

impl WindowArrangement {
    pub fn new(first: EditorBuffer) -> Self {
        Self {
            buffers: vec![first],
            tabs: vec![TabPage::new(Window::new(0, 0))],
            active_tab: 0,
            next_id: 1,
        }
    }

    fn new_window(&mut self, buffer: usize) -> Window {
        let id = self.next_id;
        self.next_id += 1;
        Window::new(id, buffer)
    }

    // ── Buffers ─────────────────────────────────────────────────────────

    pub fn add_buffer(&mut self, buffer: EditorBuffer) -> usize {
        self.buffers.push(buffer);
        self.buffers.len() - 1
    }

    pub fn find_buffer(&self, location: &Path) -> Option<usize> {
        let wanted = expand_tilde(location);
        self.buffers.iter().position(|b| {
            b.location
                .as_deref()
                .map_or(false, |l| expand_tilde(l) == wanted)
        })
    }

    pub fn active_buffer_index(&self) -> usize {
        self.active_window().buffer
    }

    pub fn active_buffer(&self) -> &EditorBuffer {
        &self.buffers[self.active_buffer_index().min(self.buffers.len() - 1)]
    }

    pub fn active_buffer_mut(&mut self) -> &mut EditorBuffer {
        let index = self.active_buffer_index().min(self.buffers.len() - 1);
        &mut self.buffers[index]
    }

    /// Show buffer `index` in the active window.
    pub fn show_in_active_window(&mut self, index: usize) {
        let window = self.active_window_mut();
        if window.buffer != index {
            window.buffer = index;
            window.scroll = 0;
            window.left_col = 0;
        }
    }

    pub fn go_to_next_buffer(&mut self) {
        let next = (self.active_buffer_index() + 1) % self.buffers.len();
        self.show_in_active_window(next);
    }

    pub fn go_to_previous_buffer(&mut self) {
        let len = self.buffers.len();
        let prev = (self.active_buffer_index() + len - 1) % len;
        self.show_in_active_window(prev);
    }

    /// `:b name` or `:b N`. Numbers are one-based as in `:ls`; names match
    /// the full location or, if unique, a substring of it.
    pub fn go_to_buffer(&mut self, name: &str) -> bool {
        let index = match name.parse::<usize>() {
            Ok(n) if n >= 1 && n <= self.buffers.len() => Some(n - 1),
            Ok(_) => None,
            Err(_) => {
                let exact = self
                    .buffers
                    .iter()
                    .position(|b| b.location.as_deref().map_or(false, |l| l == Path::new(name)));
                exact.or_else(|| {
                    let partial: Vec<usize> = self
                        .buffers
                        .iter()
                        .enumerate()
                        .filter(|(_, b)| b.display_name(false).contains(name))
                        .map(|(i, _)| i)
                        .collect();
                    (partial.len() == 1).then(|| partial[0])
                })
            }
        };
        match index {
            Some(index) => {
                self.show_in_active_window(index);
                true
            }
            None => false,
        }
    }

    /// Drop the active buffer. Windows showing it move to a neighbour; the
    /// last buffer is replaced by `replacement`.
    pub fn close_buffer(&mut self, replacement: impl FnOnce() -> EditorBuffer) -> EditorBuffer {
        let index = self.active_buffer_index();
        if self.buffers.len() == 1 {
            return std::mem::replace(&mut self.buffers[0], replacement());
        }
        let removed = self.buffers.remove(index);
        let len = self.buffers.len();
        for tab in &mut self.tabs {
            for window in tab.windows_mut() {
                if window.buffer == index {
                    window.buffer = index.min(len - 1);
                    window.scroll = 0;
                    window.left_col = 0;
                } else if window.buffer > index {
                    window.buffer -= 1;
                }
            }
        }
        debug!(target: "window", index, remaining = len, "buffer_closed");
        removed
    }

    pub fn list_open_buffers(&self) -> Vec<OpenBufferInfo> {
        let active = self.active_buffer_index();
        let visible: Vec<usize> = self.tab().windows().iter().map(|w| w.buffer).collect();
        self.buffers
            .iter()
            .enumerate()
            .map(|(i, b)| OpenBufferInfo {
                index: i + 1,
                is_active: i == active,
                is_visible: visible.contains(&i),
                name: b.display_name(false),
                row: b.cursor_row + 1,
            })
            .collect()
    }

    /// Windows in any tab that show buffer `index`.
    pub fn windows_for_buffer(&self, index: usize) -> Vec<WindowId> {
        self.tabs
            .iter()
            .flat_map(|t| t.windows())
            .filter(|w| w.buffer == index)
            .map(|w| w.id)
            .collect()
    }

    // ── Windows ─────────────────────────────────────────────────────────

    pub fn tab(&self) -> &TabPage {
        &self.tabs[self.active_tab]
    }

    pub fn active_window(&self) -> &Window {
        self.tab().active_window()
    }

    pub fn active_window_mut(&mut self) -> &mut Window {
        self.tabs[self.active_tab].active_window_mut()
    }

    pub fn window_mut(&mut self, id: WindowId) -> Option<&mut Window> {
        self.tabs[self.active_tab]
            .windows_mut()
            .into_iter()
            .find(|w| w.id == id)
    }

    fn split(&mut self, direction: SplitDirection, buffer: usize) {
        let mut window = self.new_window(buffer);
        let current = self.active_window().clone();
        if current.buffer == buffer {
            window.scroll = current.scroll;
        }
        let id = window.id;
        let tab = &mut self.tabs[self.active_tab];
        if tab.root.split(current.id, direction, window).is_none() {
            tab.active = id;
        }
        debug!(target: "window", ?direction, window = id, buffer, "split");
    }

    /// Split the active window; the new window above shows `buffer` and gets focus.
    pub fn hsplit(&mut self, buffer: usize) {
        self.split(SplitDirection::Horizontal, buffer);
    }

    /// Split the active window; the new window on the left shows `buffer` and gets focus.
    pub fn vsplit(&mut self, buffer: usize) {
        self.split(SplitDirection::Vertical, buffer);
    }

    pub fn close_window(&mut self) -> Closed {
        let tab = &mut self.tabs[self.active_tab];
        if tab.window_count() == 1 {
            return self.close_tab();
        }
        let active = tab.active;
        let ids: Vec<WindowId> = tab.windows().iter().map(|w| w.id).collect();
        let pos = ids.iter().position(|id| *id == active).unwrap_or(0);
        tab.root.remove(active);
        let remaining: Vec<WindowId> = tab.windows().iter().map(|w| w.id).collect();
        tab.active = remaining[pos.saturating_sub(1).min(remaining.len() - 1)];
        Closed::Window
    }

    pub fn keep_only_current_window(&mut self) {
        let tab = &mut self.tabs[self.active_tab];
        let window = tab.active_window().clone();
        tab.active = window.id;
        tab.root = Node::Window(window);
    }

    pub fn cycle_focus(&mut self) {
        let tab = &mut self.tabs[self.active_tab];
        let ids: Vec<WindowId> = tab.windows().iter().map(|w| w.id).collect();
        let pos = ids.iter().position(|id| *id == tab.active).unwrap_or(0);
        tab.active = ids[(pos + 1) % ids.len()];
    }

    // ── Tabs ────────────────────────────────────────────────────────────

    pub fn tabs(&self) -> &[TabPage] {
        &self.tabs
    }

    pub fn active_tab_index(&self) -> usize {
        self.active_tab
    }

    /// Open a tab after the current one, showing `buffer`.
    pub fn create_tab(&mut self, buffer: usize) {
        let window = self.new_window(buffer);
        self.active_tab += 1;
        self.tabs.insert(self.active_tab, TabPage::new(window));
    }

    pub fn close_tab(&mut self) -> Closed {
        if self.tabs.len() == 1 {
            return Closed::LastWindow;
        }
        self.tabs.remove(self.active_tab);
        self.active_tab = self.active_tab.min(self.tabs.len() - 1);
        Closed::Tab
    }

    pub fn go_to_next_tab(&mut self) {
        self.active_tab = (self.active_tab + 1) % self.tabs.len();
    }

    pub fn go_to_previous_tab(&mut self) {
        let len = self.tabs.len();
        self.active_tab = (self.active_tab + len - 1) % len;
    }

    /// Window rectangles of the active tab within `area`.
    pub fn layout(&self, area: Rect) -> Layout {
        let mut out = Layout::default();
        self.tab().root.layout(area, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BufferSettings;
    use std::path::PathBuf;

    fn named(name: &str) -> EditorBuffer {
        EditorBuffer::with_location(PathBuf::from(name), BufferSettings::default())
    }

    fn arrangement() -> WindowArrangement {
        let mut wa = WindowArrangement::new(named("a.txt"));
        wa.add_buffer(named("b.txt"));
        wa.add_buffer(named("dir/c.txt"));
        wa
    }

    #[test]
    fn splits_focus_the_new_window() {
        let mut wa = arrangement();
        wa.hsplit(1);
        assert_eq!(wa.tab().window_count(), 2);
        assert_eq!(wa.active_buffer_index(), 1);
        wa.vsplit(2);
        assert_eq!(wa.tab().window_count(), 3);
        assert_eq!(wa.active_buffer_index(), 2);
        assert_eq!(wa.windows_for_buffer(0).len(), 1);
    }

    #[test]
    fn layout_divides_the_area() {
        let mut wa = arrangement();
        wa.vsplit(1);
        let layout = wa.layout(Rect {
            x: 0,
            y: 0,
            width: 81,
            height: 20,
        });
        assert_eq!(layout.windows.len(), 2);
        assert_eq!(layout.windows[0].area.width, 40);
        assert_eq!(layout.windows[1].area.x, 41);
        assert_eq!(layout.windows[1].area.width, 40);
        assert_eq!(layout.separators, vec![Rect { x: 40, y: 0, width: 1, height: 20 }]);

        wa.hsplit(2);
        let layout = wa.layout(Rect {
            x: 0,
            y: 0,
            width: 81,
            height: 21,
        });
        let left: Vec<&WindowLayout> = layout.windows.iter().filter(|w| w.area.x == 0).collect();
        assert_eq!(left.len(), 2);
        assert_eq!(left[0].area.height + left[1].area.height, 21);
    }

    #[test]
    fn close_window_collapses_and_refocuses() {
        let mut wa = arrangement();
        wa.hsplit(1);
        wa.vsplit(2);
        assert_eq!(wa.close_window(), Closed::Window);
        assert_eq!(wa.tab().window_count(), 2);
        assert_eq!(wa.close_window(), Closed::Window);
        assert_eq!(wa.tab().window_count(), 1);
        assert!(matches!(wa.tab().root, Node::Window(_)));
        assert_eq!(wa.close_window(), Closed::LastWindow);
    }

    #[test]
    fn only_and_cycle_focus() {
        let mut wa = arrangement();
        wa.hsplit(1);
        wa.hsplit(2);
        let first = wa.active_window().id;
        wa.cycle_focus();
        assert_ne!(wa.active_window().id, first);
        wa.cycle_focus();
        wa.cycle_focus();
        assert_eq!(wa.active_window().id, first);
        wa.keep_only_current_window();
        assert_eq!(wa.tab().window_count(), 1);
        assert_eq!(wa.active_buffer_index(), 2);
    }

    #[test]
    fn tabs_cycle_and_close() {
        let mut wa = arrangement();
        wa.create_tab(1);
        wa.create_tab(2);
        assert_eq!(wa.active_tab_index(), 2);
        wa.go_to_next_tab();
        assert_eq!(wa.active_buffer_index(), 0);
        wa.go_to_previous_tab();
        assert_eq!(wa.active_buffer_index(), 2);
        assert_eq!(wa.close_window(), Closed::Tab);
        assert_eq!(wa.tabs().len(), 2);
        assert_eq!(wa.close_tab(), Closed::Tab);
        assert_eq!(wa.close_tab(), Closed::LastWindow);
    }

    #[test]
    fn buffer_navigation_by_index_and_name() {
        let mut wa = arrangement();
        wa.go_to_next_buffer();
        assert_eq!(wa.active_buffer_index(), 1);
        wa.go_to_previous_buffer();
        wa.go_to_previous_buffer();
        assert_eq!(wa.active_buffer_index(), 2);
        assert!(wa.go_to_buffer("1"));
        assert_eq!(wa.active_buffer_index(), 0);
        assert!(wa.go_to_buffer("c.txt"));
        assert_eq!(wa.active_buffer_index(), 2);
        assert!(!wa.go_to_buffer(".txt"));
        assert!(!wa.go_to_buffer("9"));
        assert_eq!(wa.find_buffer(Path::new("b.txt")), Some(1));
    }

    #[test]
    fn closing_buffers_keeps_indices_valid() {
        let mut wa = arrangement();
        wa.hsplit(2);
        wa.cycle_focus();
        wa.show_in_active_window(1);
        wa.cycle_focus();
        let removed = wa.close_buffer(|| named("x"));
        assert_eq!(removed.display_name(true), "c.txt");
        assert_eq!(wa.buffers.len(), 2);
        assert!(wa.tab().windows().iter().all(|w| w.buffer < 2));

        wa.close_buffer(|| named("x"));
        wa.close_buffer(|| named("x"));
        assert_eq!(wa.buffers.len(), 1);
        assert_eq!(wa.active_buffer().display_name(false), "x");
    }

    #[test]
    fn ls_lists_every_buffer() {
        let mut wa = arrangement();
        wa.hsplit(1);
        let infos = wa.list_open_buffers();
        assert_eq!(infos.len(), 3);
        assert!(infos[1].is_active && infos[1].is_visible);
        assert!(infos[0].is_visible && !infos[0].is_active);
        assert!(!infos[2].is_visible);
        assert_eq!(infos[2].name, "dir/c.txt");
    }
}
