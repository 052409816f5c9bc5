//! Editor options and the `:set` vocabulary.
//!
//! Options are split in two scopes: process-wide [`EditorSettings`] and the
//! per-buffer [`BufferSettings`]. Both are plain structs handed around by
//! reference; [`OptionContext`] borrows one of each to resolve a `:set`.

use std::fmt;

use crate::error::{EditorError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferSettings {
    /// Number of columns a tab character occupies.
    pub tabstop: usize,
    /// Number of columns used by indent/unindent.
    pub shiftwidth: usize,
    /// Insert spaces instead of tab characters.
    pub expandtab: bool,
    /// Copy the indentation of the current line on newline.
    pub autoindent: bool,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            tabstop: 4,
            shiftwidth: 4,
            expandtab: true,
            autoindent: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorSettings {
    pub show_line_numbers: bool,
    pub highlight_search: bool,
    pub paste_mode: bool,
    pub show_ruler: bool,
    pub show_wildmenu: bool,
    pub incsearch: bool,
    pub ignore_case: bool,
    pub enable_completion: bool,
    pub wrapscan: bool,
    pub scroll_offset: usize,
    pub relative_number: bool,
    pub wrap_lines: bool,
    pub cursorline: bool,
    pub cursorcolumn: bool,
    pub colorcolumn: Vec<usize>,
    pub display_unprintable: bool,
    pub mouse: bool,
    pub colorscheme: String,
    /// Settings given to every newly created buffer.
    pub buffer_defaults: BufferSettings,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            show_line_numbers: false,
            highlight_search: true,
            paste_mode: false,
            show_ruler: true,
            show_wildmenu: true,
            incsearch: true,
            ignore_case: false,
            enable_completion: true,
            wrapscan: true,
            scroll_offset: 0,
            relative_number: false,
            wrap_lines: true,
            cursorline: false,
            cursorcolumn: false,
            colorcolumn: Vec::new(),
            display_unprintable: false,
            mouse: false,
            colorscheme: "default".to_string(),
            buffer_defaults: BufferSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OptionName {
    Number,
    HlSearch,
    Paste,
    Ruler,
    WildMenu,
    IncSearch,
    IgnoreCase,
    AutoComplete,
    WrapScan,
    ScrollOff,
    RelativeNumber,
    Wrap,
    CursorLine,
    CursorColumn,
    ColorColumn,
    List,
    Mouse,
    TabStop,
    ShiftWidth,
    ExpandTab,
    AutoIndent,
    FileType,
}

const OPTIONS: &[(OptionName, &str, Option<&str>)] = &[
    (OptionName::Number, "number", Some("nu")),
    (OptionName::HlSearch, "hlsearch", Some("hls")),
    (OptionName::Paste, "paste", None),
    (OptionName::Ruler, "ruler", Some("ru")),
    (OptionName::WildMenu, "wildmenu", Some("wmnu")),
    (OptionName::IncSearch, "incsearch", Some("is")),
    (OptionName::IgnoreCase, "ignorecase", Some("ic")),
    (OptionName::AutoComplete, "autocomplete", Some("ac")),
    (OptionName::WrapScan, "wrapscan", Some("ws")),
    (OptionName::ScrollOff, "scrolloff", Some("so")),
    (OptionName::RelativeNumber, "relativenumber", Some("rnu")),
    (OptionName::Wrap, "wrap", None),
    (OptionName::CursorLine, "cursorline", Some("cul")),
    (OptionName::CursorColumn, "cursorcolumn", Some("cuc")),
    (OptionName::ColorColumn, "colorcolumn", Some("cc")),
    (OptionName::List, "list", None),
    (OptionName::Mouse, "mouse", None),
    (OptionName::TabStop, "tabstop", Some("ts")),
    (OptionName::ShiftWidth, "shiftwidth", Some("sw")),
    (OptionName::ExpandTab, "expandtab", Some("et")),
    (OptionName::AutoIndent, "autoindent", Some("ai")),
    (OptionName::FileType, "filetype", Some("ft")),
];

impl OptionName {
    fn find(name: &str) -> Option<OptionName> {
        OPTIONS
            .iter()
            .find(|(_, full, short)| *full == name || *short == Some(name))
            .map(|(opt, _, _)| *opt)
    }

    /// Resolve a `:set` argument. Returns the option and whether it was
    /// given in its negated `no...` form.
    pub fn lookup(name: &str) -> Option<(OptionName, bool)> {
        if let Some(opt) = Self::find(name) {
            return Some((opt, false));
        }
        let stripped = name.strip_prefix("no")?;
        match Self::find(stripped) {
            Some(opt) if opt.is_boolean() => Some((opt, true)),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        OPTIONS
            .iter()
            .find(|(opt, _, _)| *opt == self)
            .map(|(_, full, _)| *full)
            .unwrap_or("")
    }

    pub fn is_boolean(self) -> bool {
        !matches!(
            self,
            OptionName::ScrollOff
                | OptionName::ColorColumn
                | OptionName::TabStop
                | OptionName::ShiftWidth
                | OptionName::FileType
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Bool(bool),
    Number(usize),
    Text(String),
    List(Vec<usize>),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Number(n) => write!(f, "{}", n),
            OptionValue::Text(s) => write!(f, "{}", s),
            OptionValue::List(items) => {
                let joined: Vec<String> = items.iter().map(|n| n.to_string()).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

/// Borrowed view over every option scope a `:set` can reach.
pub struct OptionContext<'a> {
    pub editor: &'a mut EditorSettings,
    pub buffer: &'a mut BufferSettings,
    pub filetype: &'a mut Option<String>,
}

impl OptionContext<'_> {
    /// Apply `:set option[=value]`. Also takes `option?` to show a value
    /// and `option!` to toggle a boolean. Returns a message to display when
    /// the option was queried rather than assigned.
    pub fn set(&mut self, option: &str, value: Option<&str>) -> Result<Option<String>> {
        if let Some(queried) = option.strip_suffix('?') {
            let (name, negated) = Self::resolve(queried)?;
            if negated || value.is_some() {
                return Err(invalid_argument(option, value));
            }
            return Ok(Some(self.show(name)));
        }
        if let Some(toggled) = option.strip_suffix('!') {
            let (name, negated) = Self::resolve(toggled)?;
            if negated || value.is_some() || !name.is_boolean() {
                return Err(invalid_argument(option, value));
            }
            let on = self.get(name) != OptionValue::Bool(true);
            self.set_bool(name, on);
            return Ok(None);
        }

        let (name, negated) = Self::resolve(option)?;
        if name.is_boolean() {
            if value.is_some() {
                return Err(invalid_argument(option, value));
            }
            self.set_bool(name, !negated);
            return Ok(None);
        }

        let value = match value {
            Some(v) => v,
            None => return Ok(Some(self.show(name))),
        };

        match name {
            OptionName::TabStop => self.buffer.tabstop = parse_positive(value)?,
            OptionName::ShiftWidth => self.buffer.shiftwidth = parse_positive(value)?,
            OptionName::ScrollOff => {
                let n = parse_number(value)?;
                if n < 0 {
                    return Err(EditorError::InvalidValue("Argument must be positive".into()));
                }
                self.editor.scroll_offset = n as usize;
            }
            OptionName::ColorColumn => self.editor.colorcolumn = parse_list(value)?,
            OptionName::FileType => *self.filetype = Some(value.to_string()),
            _ => {}
        }
        Ok(None)
    }

    fn resolve(option: &str) -> Result<(OptionName, bool)> {
        OptionName::lookup(option).ok_or_else(|| EditorError::UnknownOption(option.to_string()))
    }

    /// `nu`/`nonu` for booleans, `ts=4` for the rest.
    fn show(&self, name: OptionName) -> String {
        match self.get(name) {
            OptionValue::Bool(true) => name.name().to_string(),
            OptionValue::Bool(false) => format!("no{}", name.name()),
            value => format!("{}={}", name.name(), value),
        }
    }

    fn set_bool(&mut self, name: OptionName, on: bool) {
        let e = &mut *self.editor;
        match name {
            OptionName::Number => e.show_line_numbers = on,
            OptionName::HlSearch => e.highlight_search = on,
            OptionName::Paste => e.paste_mode = on,
            OptionName::Ruler => e.show_ruler = on,
            OptionName::WildMenu => e.show_wildmenu = on,
            OptionName::IncSearch => e.incsearch = on,
            OptionName::IgnoreCase => e.ignore_case = on,
            OptionName::AutoComplete => e.enable_completion = on,
            OptionName::WrapScan => e.wrapscan = on,
            OptionName::RelativeNumber => e.relative_number = on,
            OptionName::Wrap => e.wrap_lines = on,
            OptionName::CursorLine => e.cursorline = on,
            OptionName::CursorColumn => e.cursorcolumn = on,
            OptionName::List => e.display_unprintable = on,
            OptionName::Mouse => e.mouse = on,
            OptionName::ExpandTab => self.buffer.expandtab = on,
            OptionName::AutoIndent => self.buffer.autoindent = on,
            OptionName::ScrollOff
            | OptionName::ColorColumn
            | OptionName::TabStop
            | OptionName::ShiftWidth
            | OptionName::FileType => {}
        }
    }

    pub fn get(&self, name: OptionName) -> OptionValue {
        let e = &*self.editor;
        match name {
            OptionName::Number => OptionValue::Bool(e.show_line_numbers),
            OptionName::HlSearch => OptionValue::Bool(e.highlight_search),
            OptionName::Paste => OptionValue::Bool(e.paste_mode),
            OptionName::Ruler => OptionValue::Bool(e.show_ruler),
            OptionName::WildMenu => OptionValue::Bool(e.show_wildmenu),
            OptionName::IncSearch => OptionValue::Bool(e.incsearch),
            OptionName::IgnoreCase => OptionValue::Bool(e.ignore_case),
            OptionName::AutoComplete => OptionValue::Bool(e.enable_completion),
            OptionName::WrapScan => OptionValue::Bool(e.wrapscan),
            OptionName::ScrollOff => OptionValue::Number(e.scroll_offset),
            OptionName::RelativeNumber => OptionValue::Bool(e.relative_number),
            OptionName::Wrap => OptionValue::Bool(e.wrap_lines),
            OptionName::CursorLine => OptionValue::Bool(e.cursorline),
            OptionName::CursorColumn => OptionValue::Bool(e.cursorcolumn),
            OptionName::ColorColumn => OptionValue::List(e.colorcolumn.clone()),
            OptionName::List => OptionValue::Bool(e.display_unprintable),
            OptionName::Mouse => OptionValue::Bool(e.mouse),
            OptionName::TabStop => OptionValue::Number(self.buffer.tabstop),
            OptionName::ShiftWidth => OptionValue::Number(self.buffer.shiftwidth),
            OptionName::ExpandTab => OptionValue::Bool(self.buffer.expandtab),
            OptionName::AutoIndent => OptionValue::Bool(self.buffer.autoindent),
            OptionName::FileType => {
                OptionValue::Text(self.filetype.clone().unwrap_or_default())
            }
        }
    }

    /// Lines for `:set all`, sorted by option name.
    pub fn listing(&self) -> Vec<String> {
        let mut names: Vec<OptionName> = OPTIONS.iter().map(|(opt, _, _)| *opt).collect();
        names.sort_by_key(|opt| opt.name());
        names
            .into_iter()
            .map(|opt| match self.get(opt) {
                OptionValue::Bool(true) => format!("  {}", opt.name()),
                OptionValue::Bool(false) => format!("no{}", opt.name()),
                value => format!("  {}={}", opt.name(), value),
            })
            .collect()
    }
}

fn invalid_argument(option: &str, value: Option<&str>) -> EditorError {
    match value {
        Some(value) => EditorError::InvalidValue(format!("Invalid argument: {}={}", option, value)),
        None => EditorError::InvalidValue(format!("Invalid argument: {}", option)),
    }
}

fn parse_number(value: &str) -> Result<i64> {
    value
        .parse::<i64>()
        .map_err(|_| EditorError::InvalidValue("Number required after =".into()))
}

fn parse_positive(value: &str) -> Result<usize> {
    let n = parse_number(value)?;
    if n <= 0 {
        return Err(EditorError::InvalidValue("Argument must be positive".into()));
    }
    Ok(n as usize)
}

fn parse_list(value: &str) -> Result<Vec<usize>> {
    if value.is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|part| part.trim().parse::<usize>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|_| {
            EditorError::InvalidValue(
                "Invalid value. Expecting comma separated list of integers".into(),
            )
        })
}
