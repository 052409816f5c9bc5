//! The editor: buffers and windows, modes, key dispatch and the command line.

use std::collections::{HashMap, VecDeque};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::buffer::{EditorBuffer, Register};
use crate::commands;
use crate::completion::Completion;
use crate::error::Result;
use crate::filetype::{BufferOpenObserver, ExtensionTable};
use crate::graphemes::indentation;
use crate::history::LineHistory;
use crate::input::{default_bindings, flush_pending, map_key, EditorCommand, KeyMappingResult, Mode, Pending};
use crate::io::{default_backends, expand_tilde, EditorIo};
use crate::keymap::{format_keys, parse_patterns, Handler, Key, KeyBindings, KeyPressEvent, ModeFilter};
use crate::search::{self, SearchDirection, SearchOutcome, SearchState};
use crate::settings::{EditorSettings, OptionContext};
use crate::syntax::Language;
use crate::theme::Theme;
use crate::tools::{Linter, TerminalJob};
use crate::window::WindowArrangement;

const HELP_TITLE: &str = "[Help]";

const HELP_TEXT: &str = "\
vireo - a terminal editor with Vi key bindings

Normal mode
  h j k l, arrows       move            w b e           word motions
  0 ^ $                 line start/end  gg G            first/last line
  f{c} F{c} t{c} T{c}   find char       m{a-z} '{a-z}   set/jump to mark
  i a I A o O           insert          R               replace mode
  x X s S C D           delete/change   dd dw d$ cc cw  line/word edits
  yy yw p P \"xp        yank and paste  J gJ            join lines
  ~ guu gUU >> <<       case and indent r{c}            replace char
  u <C-r>               undo/redo       .               repeat last edit
  / ? n N               search          :               command line
  <C-w>w <C-w>s <C-w>v  windows         gt gT           tabs
  ZZ ZQ                 write and quit / quit without saving

Insert mode
  <C-n> <C-p>           complete word   <C-e>           cancel completion
  <Tab> <C-d>           indent/unindent <Esc>           back to normal mode

Commands
  :w [file] :wq :wa :x :q[!] :qa[!] :cq
  :e[!] [file] :e # :n :p :badd file :b name :bn :bp :bd[!] :ls
  :sp [file] :vsp [file] :new :vnew :only :hide
  :tabnew [file] :tabclose :tabn :tabp
  :[range]s/search/replace/[g] :[range]d :[range]ya :[range]co{line}
  :set option[=value] :set all :colorscheme name :pwd :cd dir :!cmd :help

Directory listings
  <CR> opens the entry under the cursor, - opens the parent directory.
";

/// How `load_initial_files` arranges several files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InitialLayout {
    /// First file shown, the others loaded in the background.
    #[default]
    Buffers,
    Tabs,
    HorizontalSplits,
    VerticalSplits,
}

/// The keys of the last change, replayed by `.`.
#[derive(Debug, Clone)]
struct LastEdit {
    keys: Vec<Key>,
    count: Option<usize>,
    register: Option<char>,
}

/// Text typed after `:`, `/` or `?`.
#[derive(Debug, Clone, Default)]
struct CommandLine {
    text: String,
    /// Char index.
    cursor: usize,
}

impl CommandLine {
    fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
    }

    fn byte_index(&self, char_index: usize) -> usize {
        self.text
            .char_indices()
            .nth(char_index)
            .map_or(self.text.len(), |(i, _)| i)
    }

    fn insert(&mut self, c: char) {
        let at = self.byte_index(self.cursor);
        self.text.insert(at, c);
        self.cursor += 1;
    }

    fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let at = self.byte_index(self.cursor);
            self.text.remove(at);
        }
    }

    fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }
}

pub struct Editor {
    pub settings: EditorSettings,
    pub theme: Theme,
    pub windows: WindowArrangement,
    pub linter: Linter,
    /// Files named on the command line, walked by `:n` and `:p`.
    pub locations: Vec<PathBuf>,
    pub current_location_index: usize,
    /// Every location opened, oldest first. `#` is the one before the last.
    pub location_history: Vec<PathBuf>,
    pub last_substitute: Option<String>,

    backends: Vec<Box<dyn EditorIo>>,
    bindings: KeyBindings,
    observers: Vec<Box<dyn BufferOpenObserver>>,

    mode: Mode,
    pending: Pending,
    registers: HashMap<char, Register>,
    search: Option<SearchState>,
    message: Option<String>,
    command_line: CommandLine,
    command_history: LineHistory,
    search_history: LineHistory,
    jobs: Vec<TerminalJob>,
    completion: Option<Completion>,

    recording: Option<LastEdit>,
    last_edit: Option<LastEdit>,
    replaying: bool,

    page_height: usize,
    exit_code: Option<i32>,
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}

impl Editor {
    pub fn new() -> Self {
        let settings = EditorSettings::default();
        let mut bindings = KeyBindings::new();
        if let Err(err) = default_bindings(&mut bindings) {
            error!(target: "keymap", %err, "default_bindings_invalid");
        }
        let theme = Theme::by_name(&settings.colorscheme).unwrap_or_default();
        Self {
            windows: WindowArrangement::new(EditorBuffer::new(settings.buffer_defaults)),
            settings,
            theme,
            linter: Linter::default(),
            locations: Vec::new(),
            current_location_index: 0,
            location_history: Vec::new(),
            last_substitute: None,
            backends: default_backends(),
            bindings,
            observers: vec![Box::new(ExtensionTable::builtin())],
            mode: Mode::Normal,
            pending: Pending::default(),
            registers: HashMap::new(),
            search: None,
            message: None,
            command_line: CommandLine::default(),
            command_history: LineHistory::new(),
            search_history: LineHistory::new(),
            jobs: Vec::new(),
            completion: None,
            recording: None,
            last_edit: None,
            replaying: false,
            page_height: 20,
            exit_code: None,
        }
    }

    /// Persist command and search history in `dir`.
    pub fn load_history(&mut self, dir: &Path) {
        self.command_history = LineHistory::load(&dir.join("commands_history"));
        self.search_history = LineHistory::load(&dir.join("search_history"));
    }

    // ── Accessors ───────────────────────────────────────────────────────

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn active_buffer(&self) -> &EditorBuffer {
        self.windows.active_buffer()
    }

    pub fn active_buffer_mut(&mut self) -> &mut EditorBuffer {
        self.windows.active_buffer_mut()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn show_message(&mut self, message: impl Into<String>) {
        let message = message.into();
        debug!(target: "editor", %message, "message");
        self.message = Some(message);
    }

    /// The command or search line and its cursor (char index).
    pub fn command_line(&self) -> (&str, usize) {
        (&self.command_line.text, self.command_line.cursor)
    }

    pub fn search_state(&self) -> Option<&SearchState> {
        self.search.as_ref()
    }

    /// Make `pattern` the last search, keeping the last direction.
    pub fn set_search_pattern(&mut self, pattern: &str) {
        let direction = self.search.as_ref().map_or(SearchDirection::Forward, |s| s.direction);
        self.search = Some(SearchState {
            pattern: pattern.to_string(),
            direction,
        });
    }

    pub fn completion(&self) -> Option<&Completion> {
        self.completion.as_ref()
    }

    pub fn register(&self, name: char) -> Option<&Register> {
        self.registers.get(&name)
    }

    /// Count, register and keys typed so far, for the status line.
    pub fn pending_keys(&self) -> String {
        let mut out = String::new();
        if let Some(register) = self.pending.register {
            out.push('"');
            out.push(register);
        }
        if let Some(count) = self.pending.count {
            out.push_str(&count.to_string());
        }
        out.push_str(&format_keys(&self.pending.prefix));
        out
    }

    pub fn set_page_height(&mut self, rows: usize) {
        self.page_height = rows.max(1);
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    pub fn request_exit(&mut self, code: i32) {
        info!(target: "editor", code, "exit_requested");
        self.exit_code = Some(code);
    }

    /// Borrow every option scope `:set` can reach for the active buffer.
    pub fn options(&mut self) -> OptionContext<'_> {
        let buffer = self.windows.active_buffer_mut();
        OptionContext {
            editor: &mut self.settings,
            buffer: &mut buffer.settings,
            filetype: &mut buffer.filetype,
        }
    }

    /// `:set` from the rc file: buffer options become the defaults for new
    /// buffers and apply to buffers that have no location yet.
    pub fn set_default_option(&mut self, option: &str, value: Option<&str>) -> Result<Option<String>> {
        let mut defaults = self.settings.buffer_defaults;
        let mut filetype = None;
        let shown = OptionContext {
            editor: &mut self.settings,
            buffer: &mut defaults,
            filetype: &mut filetype,
        }
        .set(option, value)?;
        self.settings.buffer_defaults = defaults;
        for buffer in self.windows.buffers.iter_mut().filter(|b| b.location.is_none()) {
            buffer.settings = defaults;
        }
        Ok(shown)
    }

    pub fn use_colorscheme(&mut self, name: &str) {
        match Theme::by_name(name) {
            Some(theme) => {
                self.theme = theme;
                self.settings.colorscheme = name.to_string();
            }
            None => self.show_message(format!("Cannot find color scheme: {}", name)),
        }
    }

    // ── Extension points ────────────────────────────────────────────────

    /// Bind `keys` (key notation) in the user layer.
    pub fn add_key_binding(&mut self, keys: &str, filter: ModeFilter, handler: Handler) -> Result<()> {
        let patterns = parse_patterns(keys)?;
        self.bindings.add(patterns, filter, handler)
    }

    /// Run `observer` for every file buffer created from now on, after the
    /// ones already registered.
    pub fn add_open_buffer_observer(&mut self, observer: Box<dyn BufferOpenObserver>) {
        self.observers.push(observer);
    }

    // ── Jobs ────────────────────────────────────────────────────────────

    pub fn schedule(&mut self, job: TerminalJob) {
        debug!(target: "tools", ?job, "job_scheduled");
        self.jobs.push(job);
    }

    pub fn take_jobs(&mut self) -> Vec<TerminalJob> {
        std::mem::take(&mut self.jobs)
    }

    // ── Buffers ─────────────────────────────────────────────────────────

    /// Read `location` into a new buffer and run the open observers on it.
    /// Unreadable locations give an empty buffer bound to the location.
    fn create_buffer(&mut self, location: &Path) -> EditorBuffer {
        let defaults = self.settings.buffer_defaults;
        let mut buffer = match EditorBuffer::open(location, &self.backends, defaults) {
            Ok(buffer) => buffer,
            Err(err) => {
                warn!(target: "io", file = %location.display(), %err, "file_read_failed");
                self.show_message(format!("Cannot read {}: {}", location.display(), err));
                EditorBuffer::with_location(location.to_path_buf(), defaults)
            }
        };
        if !buffer.is_dir {
            buffer.filetype = Language::detect(location).filetype();
            for observer in &self.observers {
                observer.on_open_buffer(location, &mut buffer);
            }
            buffer.reports = self.linter.lint(&buffer);
        }
        info!(
            target: "io",
            file = %location.display(),
            lines = buffer.line_count(),
            is_new = buffer.is_new,
            "buffer_opened"
        );
        buffer
    }

    /// An untouched buffer without a location, as at startup.
    fn is_scratch(&self, index: usize) -> bool {
        let buffer = &self.windows.buffers[index];
        buffer.location.is_none()
            && buffer.title.is_none()
            && buffer.text.len_chars() == 0
            && self.windows.windows_for_buffer(index).len() <= 1
    }

    /// Open `location`, reusing its buffer when it is already open. Returns
    /// the buffer index.
    pub fn open_location(&mut self, location: &Path, show_in_current_window: bool) -> usize {
        let index = match self.windows.find_buffer(location) {
            Some(index) => index,
            None => {
                let buffer = self.create_buffer(location);
                let active = self.windows.active_buffer_index();
                if show_in_current_window && self.is_scratch(active) {
                    self.windows.buffers[active] = buffer;
                    active
                } else {
                    self.windows.add_buffer(buffer)
                }
            }
        };
        if show_in_current_window {
            self.windows.show_in_active_window(index);
        }
        self.location_history.push(location.to_path_buf());
        index
    }

    /// A buffer with no location, for `:new` and `<C-w>n`.
    pub fn new_buffer(&mut self) -> usize {
        self.windows
            .add_buffer(EditorBuffer::new(self.settings.buffer_defaults))
    }

    pub fn load_initial_files(&mut self, locations: &[PathBuf], layout: InitialLayout) {
        let Some((first, rest)) = locations.split_first() else {
            return;
        };
        match layout {
            InitialLayout::Buffers => {
                self.open_location(first, true);
                for location in rest {
                    self.open_location(location, false);
                }
            }
            InitialLayout::Tabs => {
                self.open_location(first, true);
                for location in rest {
                    let index = self.open_location(location, false);
                    self.windows.create_tab(index);
                }
                if !rest.is_empty() {
                    self.windows.go_to_next_tab();
                }
            }
            InitialLayout::HorizontalSplits | InitialLayout::VerticalSplits => {
                // New windows open before the current one, so go backwards.
                let mut reversed = locations.iter().rev();
                if let Some(last) = reversed.next() {
                    self.open_location(last, true);
                }
                for location in reversed {
                    let index = self.open_location(location, false);
                    if layout == InitialLayout::HorizontalSplits {
                        self.windows.hsplit(index);
                    } else {
                        self.windows.vsplit(index);
                    }
                }
            }
        }
        if locations.len() > 1 {
            self.show_message(format!("{} files loaded.", locations.len()));
        }
        self.locations = locations.to_vec();
        self.current_location_index = 0;
    }

    /// Write the active buffer, then lint it again.
    pub fn write_active_buffer(&mut self, location: Option<PathBuf>, force: bool) -> Result<()> {
        let buffer = self.windows.active_buffer_mut();
        buffer.write(location, force, &self.backends)?;
        if buffer.filetype.is_none() {
            if let Some(location) = &buffer.location {
                buffer.filetype = Language::detect(location).filetype();
            }
        }
        buffer.reports = self.linter.lint(buffer);
        Ok(())
    }

    /// Write buffer `index` to its own location.
    pub fn write_buffer(&mut self, index: usize, force: bool) -> Result<()> {
        let buffer = &mut self.windows.buffers[index];
        buffer.write(None, force, &self.backends)?;
        buffer.reports = self.linter.lint(buffer);
        Ok(())
    }

    pub fn reload_active_buffer(&mut self) -> Result<()> {
        let buffer = self.windows.active_buffer_mut();
        buffer.reload(&self.backends)?;
        buffer.reports = self.linter.lint(buffer);
        Ok(())
    }

    /// Show the help text in a window above the current one.
    pub fn show_help(&mut self) {
        let existing = self
            .windows
            .buffers
            .iter()
            .position(|b| b.location.is_none() && b.title.as_deref() == Some(HELP_TITLE));
        let index = match existing {
            Some(index) => index,
            None => {
                let mut buffer = EditorBuffer::from_text(HELP_TEXT.trim_end(), self.settings.buffer_defaults);
                buffer.title = Some(HELP_TITLE.to_string());
                self.windows.add_buffer(buffer)
            }
        };
        self.windows.hsplit(index);
    }

    // ── Command line ────────────────────────────────────────────────────

    pub fn enter_command_mode(&mut self) {
        self.mode = Mode::CommandLine;
        self.command_line.clear();
        self.command_history.reset();
    }

    pub fn leave_command_mode(&mut self) {
        self.mode = Mode::Normal;
        self.command_line.clear();
        self.command_history.reset();
        self.search_history.reset();
    }

    fn enter_search_mode(&mut self, direction: SearchDirection) {
        self.mode = Mode::Search(direction);
        self.command_line.clear();
        self.search_history.reset();
    }

    /// Run one `:` command line.
    pub fn execute_command(&mut self, input: &str) {
        commands::execute(self, input);
    }

    fn accept_command_line(&mut self) {
        let text = self.command_line.text.clone();
        match self.mode {
            Mode::Search(direction) => {
                self.search_history.push(&text);
                self.leave_command_mode();
                let pattern = if text.is_empty() {
                    match &self.search {
                        Some(last) => last.pattern.clone(),
                        None => {
                            self.show_message("No previous regular expression");
                            return;
                        }
                    }
                } else {
                    text
                };
                self.search = Some(SearchState { pattern, direction });
                self.search_again(false, 1);
            }
            _ => {
                self.command_history.push(&text);
                self.leave_command_mode();
                self.execute_command(&text);
            }
        }
    }

    fn browse_history(&mut self, older: bool) {
        let history = match self.mode {
            Mode::Search(_) => &mut self.search_history,
            _ => &mut self.command_history,
        };
        let found = if older {
            history.previous(&self.command_line.text)
        } else {
            history.next()
        };
        if let Some(line) = found.map(str::to_string) {
            self.command_line.set(&line);
        }
    }

    // ── Search ──────────────────────────────────────────────────────────

    /// `n` (or `N` with `reverse`), `count` times.
    pub fn search_again(&mut self, reverse: bool, count: usize) {
        let Some(state) = self.search.clone() else {
            self.show_message("No previous regular expression");
            return;
        };
        let direction = if reverse {
            state.direction.reversed()
        } else {
            state.direction
        };
        let regex = match search::compile(&state.pattern, self.settings.ignore_case) {
            Ok(regex) => regex,
            Err(err) => {
                self.show_message(err.to_string());
                return;
            }
        };

        let wrapscan = self.settings.wrapscan;
        let buffer = self.windows.active_buffer_mut();
        let mut at = buffer.caret();
        let mut wrapped = false;
        for _ in 0..count.max(1) {
            match search::find(&buffer.text, &regex, at, direction, wrapscan) {
                SearchOutcome::Found(ci) => at = ci,
                SearchOutcome::Wrapped(ci) => {
                    at = ci;
                    wrapped = true;
                }
                SearchOutcome::NotFound => {
                    debug!(target: "search", pattern = %state.pattern, "not_found");
                    self.show_message(search::not_found_message(&state.pattern, direction));
                    return;
                }
            }
        }
        buffer.set_caret(at);
        if wrapped {
            self.show_message(search::wrapped_message(direction));
        }
    }

    // ── Key dispatch ────────────────────────────────────────────────────

    /// One key press from the terminal.
    pub fn handle_key(&mut self, key: Key) {
        self.message = None;
        self.feed_keys([key]);
        self.after_keys();
    }

    /// Typing paused: resolve keys that were waiting for a longer binding.
    pub fn flush_pending_keys(&mut self) {
        if self.pending.prefix.is_empty() {
            return;
        }
        let result = flush_pending(self.mode, &mut self.pending, &self.bindings);
        let replay = self.apply(result);
        self.feed_keys(replay);
        self.after_keys();
    }

    fn feed_keys(&mut self, keys: impl IntoIterator<Item = Key>) {
        let mut queue: VecDeque<Key> = keys.into_iter().collect();
        while let Some(key) = queue.pop_front() {
            let result = map_key(key, self.mode, &mut self.pending, &self.bindings);
            for key in self.apply(result).into_iter().rev() {
                queue.push_front(key);
            }
        }
    }

    /// Run a fired binding; gives back the keys to dispatch again.
    fn apply(&mut self, result: KeyMappingResult) -> Vec<Key> {
        match result {
            KeyMappingResult::Fire {
                handler,
                keys,
                arg,
                register,
                replay,
            } => {
                self.fire(handler, keys, arg, register);
                replay
            }
            KeyMappingResult::UpdatePending | KeyMappingResult::Noop => Vec::new(),
        }
    }

    fn after_keys(&mut self) {
        if self.mode != Mode::Normal || self.message.is_some() {
            return;
        }
        if let Some(report) = self.windows.active_buffer().report_at_cursor() {
            self.message = Some(report.message.clone());
        }
    }

    fn fire(&mut self, handler: Handler, keys: Vec<Key>, arg: Option<usize>, register: Option<char>) {
        self.record(&handler, &keys, arg, register);
        match handler {
            Handler::Command(command) => self.run(command, &keys, arg, register),
            Handler::Custom(callback) => {
                let mut event = KeyPressEvent {
                    editor: &mut *self,
                    keys,
                    arg,
                };
                callback(&mut event);
            }
        }
        if !self.replaying && self.mode == Mode::Normal {
            if let Some(edit) = self.recording.take() {
                self.last_edit = Some(edit);
            }
        }
    }

    fn record(&mut self, handler: &Handler, keys: &[Key], arg: Option<usize>, register: Option<char>) {
        if self.replaying {
            return;
        }
        match self.mode {
            Mode::Normal => {
                if matches!(handler, Handler::Command(command) if command.is_edit()) {
                    self.recording = Some(LastEdit {
                        keys: keys.to_vec(),
                        count: arg,
                        register,
                    });
                }
            }
            Mode::Insert | Mode::Replace => {
                if let Some(edit) = &mut self.recording {
                    edit.keys.extend_from_slice(keys);
                }
            }
            Mode::CommandLine | Mode::Search(_) => {}
        }
    }

    fn repeat_last_edit(&mut self, arg: Option<usize>) {
        let Some(edit) = self.last_edit.clone() else {
            return;
        };
        debug!(target: "keymap", keys = %format_keys(&edit.keys), "repeat_last_edit");
        self.replaying = true;
        self.pending.clear();
        self.pending.count = arg.or(edit.count);
        self.pending.register = edit.register;
        self.feed_keys(edit.keys);
        self.replaying = false;
    }

    /// Store into `name`, or the unnamed register. Uppercase names append.
    pub fn store_register(&mut self, name: Option<char>, value: Register) {
        if value.text.is_empty() {
            return;
        }
        match name {
            Some(upper) if upper.is_ascii_uppercase() => {
                let lower = upper.to_ascii_lowercase();
                match self.registers.get_mut(&lower) {
                    Some(existing) => {
                        if existing.linewise || value.linewise {
                            existing.text.push('\n');
                            existing.linewise = true;
                        }
                        existing.text.push_str(&value.text);
                    }
                    None => {
                        self.registers.insert(lower, value);
                    }
                }
            }
            Some(name) if name.is_ascii_alphanumeric() => {
                self.registers.insert(name, value);
            }
            _ => {
                self.registers.insert('"', value);
            }
        }
    }

    fn read_register(&self, name: Option<char>) -> Option<Register> {
        let name = name.map_or('"', |c| c.to_ascii_lowercase());
        self.registers.get(&name).cloned()
    }

    /// Execute one built-in command.
    pub fn run(&mut self, command: EditorCommand, keys: &[Key], arg: Option<usize>, register: Option<char>) {
        use EditorCommand::*;

        let count = arg.unwrap_or(1).max(1);
        let typed = keys.last().and_then(Key::printable);
        let mode = self.mode;
        let copy_margin = self.active_buffer().settings.autoindent && !self.settings.paste_mode;

        if !matches!(command, CompleteNext | CompletePrevious | CompleteCancel) {
            self.completion = None;
        }
        if mode == Mode::Normal && command.is_edit() {
            self.active_buffer_mut().save_to_undo_stack();
        }

        match command {
            // ── Movement ────────────────────────────────────────────────
            MoveLeft => match mode {
                Mode::CommandLine | Mode::Search(_) => self.command_line.left(),
                Mode::Normal => self.active_buffer_mut().move_left(count),
                _ => self.active_buffer_mut().move_left(1),
            },
            MoveRight => match mode {
                Mode::CommandLine | Mode::Search(_) => self.command_line.right(),
                Mode::Normal => self.active_buffer_mut().move_right(count, false),
                _ => self.active_buffer_mut().move_right(1, true),
            },
            MoveUp => self.active_buffer_mut().move_up(count),
            MoveDown => self.active_buffer_mut().move_down(count),
            WordForward => self.active_buffer_mut().word_forward(count),
            WordBackward => self.active_buffer_mut().word_backward(count),
            WordEnd => self.active_buffer_mut().word_end(count),
            LineStart => match mode {
                Mode::CommandLine | Mode::Search(_) => self.command_line.cursor = 0,
                _ => self.active_buffer_mut().line_start(),
            },
            FirstNonBlank => self.active_buffer_mut().first_non_blank(),
            LineEnd => match mode {
                Mode::CommandLine | Mode::Search(_) => {
                    self.command_line.cursor = self.command_line.text.chars().count()
                }
                _ => {
                    let buffer = self.active_buffer_mut();
                    buffer.move_down(count - 1);
                    buffer.line_end();
                }
            },
            GoToFirstLine => self.active_buffer_mut().go_to_line(arg.map_or(0, |n| n.saturating_sub(1))),
            GoToLastLine => match arg {
                Some(n) => self.active_buffer_mut().go_to_line(n.saturating_sub(1)),
                None => self.active_buffer_mut().go_to_last_line(),
            },
            NextLineStart => {
                let buffer = self.active_buffer_mut();
                buffer.move_down(count);
                buffer.first_non_blank();
            }
            PreviousLineStart => {
                let buffer = self.active_buffer_mut();
                buffer.move_up(count);
                buffer.first_non_blank();
            }
            PageDown => {
                let rows = self.page_height.saturating_mul(count);
                self.active_buffer_mut().move_down(rows);
            }
            PageUp => {
                let rows = self.page_height.saturating_mul(count);
                self.active_buffer_mut().move_up(rows);
            }
            FindChar { forward, till } => {
                if let Some(c) = typed {
                    self.active_buffer_mut().find_char(c, forward, till, count);
                }
            }
            SetMark => {
                if let Some(c) = typed.filter(char::is_ascii_lowercase) {
                    let buffer = self.active_buffer_mut();
                    let row = buffer.cursor_row + 1;
                    buffer.marks.insert(c, row);
                }
            }
            GoToMark => {
                let row = typed.and_then(|c| self.active_buffer().marks.get(&c).copied());
                match row {
                    Some(row) => self.active_buffer_mut().go_to_line(row.saturating_sub(1)),
                    None => self.show_message("Mark not set"),
                }
            }

            // ── Entering insert mode ────────────────────────────────────
            InsertBefore => self.mode = Mode::Insert,
            Append => {
                self.active_buffer_mut().move_right(1, true);
                self.mode = Mode::Insert;
            }
            InsertAtLineStart => {
                self.active_buffer_mut().first_non_blank();
                self.mode = Mode::Insert;
            }
            AppendAtLineEnd => {
                self.active_buffer_mut().line_end();
                self.mode = Mode::Insert;
            }
            OpenBelow => {
                self.active_buffer_mut().open_line_below(copy_margin);
                self.mode = Mode::Insert;
            }
            OpenAbove => {
                self.active_buffer_mut().open_line_above(copy_margin);
                self.mode = Mode::Insert;
            }

            // ── Typing ──────────────────────────────────────────────────
            SelfInsert => {
                if let Some(c) = typed {
                    match mode {
                        Mode::Insert => self.active_buffer_mut().insert_char(c),
                        Mode::Replace => self.active_buffer_mut().overwrite_char(c),
                        Mode::CommandLine | Mode::Search(_) => self.command_line.insert(c),
                        Mode::Normal => {}
                    }
                }
            }
            Newline => self.active_buffer_mut().newline(copy_margin),
            Backspace => match mode {
                Mode::CommandLine | Mode::Search(_) => {
                    if self.command_line.text.is_empty() {
                        self.leave_command_mode();
                    } else {
                        self.command_line.backspace();
                    }
                }
                Mode::Replace => self.active_buffer_mut().move_left(1),
                _ => self.active_buffer_mut().backspace(),
            },
            Delete => match mode {
                Mode::CommandLine | Mode::Search(_) => self.command_line.delete(),
                _ => self.active_buffer_mut().delete_forward(),
            },
            InsertTab => {
                if self.settings.paste_mode {
                    self.active_buffer_mut().insert_char('\t');
                } else {
                    self.active_buffer_mut().insert_tab();
                }
            }
            UnindentInsert => self.active_buffer_mut().unindent_line(),

            // ── Normal-mode edits ───────────────────────────────────────
            DeleteChar => {
                let text = self.active_buffer_mut().delete_chars(count);
                self.store_register(register, Register::chars(text));
            }
            DeleteCharBefore => {
                let text = self.active_buffer_mut().delete_chars_before(count);
                self.store_register(register, Register::chars(text));
            }
            SubstituteChar => {
                let text = self.active_buffer_mut().delete_chars(count);
                self.store_register(register, Register::chars(text));
                self.mode = Mode::Insert;
            }
            ChangeLine => {
                let buffer = self.active_buffer_mut();
                let row = buffer.cursor_row;
                let last = row.saturating_add(count.max(1) - 1).min(buffer.line_count() - 1);
                let text = buffer.yank_lines(count);
                let margin = if copy_margin {
                    indentation(&buffer.text, row)
                } else {
                    String::new()
                };
                buffer.replace_lines(row, last, &[margin]);
                buffer.go_to_line(row);
                buffer.line_end();
                self.store_register(register, Register::lines(text));
                self.mode = Mode::Insert;
            }
            ChangeToLineEnd => {
                let text = self.active_buffer_mut().delete_to_line_end();
                self.store_register(register, Register::chars(text));
                self.mode = Mode::Insert;
            }
            DeleteToLineEnd => {
                let text = self.active_buffer_mut().delete_to_line_end();
                self.store_register(register, Register::chars(text));
            }
            DeleteLine => {
                let text = self.active_buffer_mut().delete_lines(count);
                self.store_register(register, Register::lines(text));
            }
            DeleteWord => {
                let text = self.active_buffer_mut().delete_word(count);
                self.store_register(register, Register::chars(text));
            }
            ChangeWord => {
                let text = self.active_buffer_mut().change_word(count);
                self.store_register(register, Register::chars(text));
                self.mode = Mode::Insert;
            }
            YankLine => {
                let text = self.active_buffer().yank_lines(count);
                self.store_register(register, Register::lines(text));
            }
            YankWord => {
                let text = self.active_buffer().yank_word(count);
                self.store_register(register, Register::chars(text));
            }
            PasteAfter | PasteBefore => match self.read_register(register) {
                Some(value) => self
                    .active_buffer_mut()
                    .paste(&value, command == PasteAfter, count),
                None => {
                    if let Some(name) = register {
                        self.show_message(format!("Nothing in register {}", name));
                    }
                }
            },
            JoinLines | JoinLinesNoSpace => {
                let separator = if command == JoinLines { " " } else { "" };
                let buffer = self.active_buffer_mut();
                for _ in 0..count.saturating_sub(1).max(1) {
                    buffer.join_lines(separator);
                }
            }
            ToggleCase => self.active_buffer_mut().toggle_case(count),
            LowercaseLine => self
                .active_buffer_mut()
                .transform_current_line(|line| line.to_lowercase()),
            UppercaseLine => self
                .active_buffer_mut()
                .transform_current_line(|line| line.to_uppercase()),
            Indent | Unindent => {
                let buffer = self.active_buffer_mut();
                let row = buffer.cursor_row;
                let last = row.saturating_add(count.max(1) - 1).min(buffer.line_count() - 1);
                for r in row..=last {
                    buffer.go_to_line(r);
                    if command == Indent {
                        buffer.indent_line();
                    } else {
                        buffer.unindent_line();
                    }
                }
                buffer.go_to_line(row);
            }
            ReplaceChar => {
                if let Some(c) = typed {
                    self.active_buffer_mut().replace_chars(c, count);
                }
            }
            EnterReplaceMode => self.mode = Mode::Replace,
            Undo => {
                let mut undone = false;
                for _ in 0..count {
                    undone |= self.active_buffer_mut().undo();
                }
                if !undone {
                    self.show_message("Already at oldest change");
                }
            }
            Redo => {
                let mut redone = false;
                for _ in 0..count {
                    redone |= self.active_buffer_mut().redo();
                }
                if !redone {
                    self.show_message("Already at newest change");
                }
            }
            RepeatLastEdit => self.repeat_last_edit(arg),

            // ── Completion ──────────────────────────────────────────────
            CompleteNext | CompletePrevious => {
                if self.settings.enable_completion {
                    if self.completion.is_none() {
                        self.completion = Completion::begin(self.windows.active_buffer());
                    }
                    if let Some(completion) = &mut self.completion {
                        completion.step(command == CompleteNext, self.windows.active_buffer_mut());
                    }
                }
            }
            CompleteCancel => {
                if let Some(mut completion) = self.completion.take() {
                    completion.cancel(self.windows.active_buffer_mut());
                }
            }

            // ── Command and search line ─────────────────────────────────
            EnterCommandLine => self.enter_command_mode(),
            EnterSearch(direction) => self.enter_search_mode(direction),
            SearchNext => self.search_again(false, count),
            SearchPrevious => self.search_again(true, count),
            Accept => self.accept_command_line(),
            HistoryPrevious => self.browse_history(true),
            HistoryNext => self.browse_history(false),

            // ── Windows, tabs, files ────────────────────────────────────
            CycleFocus => self.windows.cycle_focus(),
            NewWindow => {
                let index = self.new_buffer();
                self.windows.hsplit(index);
            }
            HSplit => {
                let index = self.windows.active_buffer_index();
                self.windows.hsplit(index);
            }
            VSplit => {
                let index = self.windows.active_buffer_index();
                self.windows.vsplit(index);
            }
            OnlyWindow => self.windows.keep_only_current_window(),
            NextTab => self.windows.go_to_next_tab(),
            PreviousTab => self.windows.go_to_previous_tab(),
            Help => self.show_help(),
            OpenEntryUnderCursor => {
                if self.active_buffer().is_dir {
                    self.open_directory_entry();
                } else {
                    self.run(NextLineStart, keys, arg, register);
                }
            }
            OpenParentDirectory => {
                if self.active_buffer().is_dir {
                    if let Some(dir) = self.active_buffer().location.clone() {
                        let parent = parent_directory(&dir);
                        self.open_location(&parent, true);
                    }
                } else {
                    self.run(PreviousLineStart, keys, arg, register);
                }
            }

            // ── Control ─────────────────────────────────────────────────
            Escape => match mode {
                Mode::Insert | Mode::Replace => {
                    self.mode = Mode::Normal;
                    self.active_buffer_mut().move_left(1);
                }
                Mode::CommandLine | Mode::Search(_) => self.leave_command_mode(),
                Mode::Normal => {}
            },
            WriteAndQuit => self.execute_command("x"),
            QuitWithoutSaving => self.execute_command("q!"),
        }

        if self.mode == Mode::Normal {
            self.active_buffer_mut().clamp_to_line_for_normal_mode();
        }
    }

    fn open_directory_entry(&mut self) {
        let buffer = self.active_buffer();
        let Some(dir) = buffer.location.clone() else {
            return;
        };
        let entry = buffer.current_line();
        let target = match entry.as_str() {
            "" => return,
            e if e.starts_with('"') => return,
            "./" => dir,
            "../" => parent_directory(&dir),
            e => dir.join(e.trim_end_matches('/')),
        };
        debug!(target: "io", entry = %target.display(), "open_directory_entry");
        self.open_location(&target, true);
    }
}

fn parent_directory(dir: &Path) -> PathBuf {
    let absolute = fs::canonicalize(expand_tilde(dir)).unwrap_or_else(|_| dir.to_path_buf());
    match absolute.parent() {
        Some(parent) => parent.to_path_buf(),
        None => absolute,
    }
}
