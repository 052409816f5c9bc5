use tracing::trace;

use crate::error::Result;
use crate::keymap::{parse_patterns, Handler, Key, KeyBindings, ModeFilter};
use crate::search::SearchDirection;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Insert,
    Replace,
    CommandLine,
    Search(SearchDirection),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditorCommand {
    // Movement
    MoveUp,
    MoveDown,
    MoveLeft,
    MoveRight,
    WordForward,
    WordBackward,
    WordEnd,
    LineStart,
    FirstNonBlank,
    LineEnd,
    GoToFirstLine,
    GoToLastLine,
    NextLineStart,
    PreviousLineStart,
    PageDown,
    PageUp,
    FindChar { forward: bool, till: bool },
    SetMark,
    GoToMark,

    // Entering insert mode
    InsertBefore,
    Append,
    InsertAtLineStart,
    AppendAtLineEnd,
    OpenBelow,
    OpenAbove,

    // Editing
    SelfInsert,
    Newline,
    Backspace,
    Delete,
    InsertTab,
    UnindentInsert,
    DeleteChar,
    DeleteCharBefore,
    SubstituteChar,
    ChangeLine,
    ChangeToLineEnd,
    DeleteToLineEnd,
    DeleteLine,
    DeleteWord,
    ChangeWord,
    YankLine,
    YankWord,
    PasteAfter,
    PasteBefore,
    JoinLines,
    JoinLinesNoSpace,
    ToggleCase,
    LowercaseLine,
    UppercaseLine,
    Indent,
    Unindent,
    ReplaceChar,
    EnterReplaceMode,
    Undo,
    Redo,
    RepeatLastEdit,

    // Completion
    CompleteNext,
    CompletePrevious,
    CompleteCancel,

    // Command and search line
    EnterCommandLine,
    EnterSearch(SearchDirection),
    SearchNext,
    SearchPrevious,
    Accept,
    HistoryPrevious,
    HistoryNext,

    // Windows, tabs, files
    CycleFocus,
    NewWindow,
    HSplit,
    VSplit,
    OnlyWindow,
    NextTab,
    PreviousTab,
    Help,
    OpenEntryUnderCursor,
    OpenParentDirectory,

    // Control
    Escape,
    WriteAndQuit,
    QuitWithoutSaving,
}

impl EditorCommand {
    /// Commands that change text from normal mode and can be repeated with `.`.
    pub fn is_edit(&self) -> bool {
        use EditorCommand::*;
        matches!(
            self,
            InsertBefore
                | Append
                | InsertAtLineStart
                | AppendAtLineEnd
                | OpenBelow
                | OpenAbove
                | DeleteChar
                | DeleteCharBefore
                | SubstituteChar
                | ChangeLine
                | ChangeToLineEnd
                | DeleteToLineEnd
                | DeleteLine
                | DeleteWord
                | ChangeWord
                | PasteAfter
                | PasteBefore
                | JoinLines
                | JoinLinesNoSpace
                | ToggleCase
                | LowercaseLine
                | UppercaseLine
                | Indent
                | Unindent
                | ReplaceChar
                | EnterReplaceMode
        )
    }
}

/// Largest count prefix; further digits are ignored.
pub const MAX_COUNT: usize = 99_999;

#[derive(Debug, Clone, Default)]
pub struct Pending {
    pub count: Option<usize>,
    pub register: Option<char>,
    pub prefix: Vec<Key>,
    awaiting_register: bool,
}

impl Pending {
    pub fn clear(&mut self) {
        self.count = None;
        self.register = None;
        self.prefix.clear();
        self.awaiting_register = false;
    }

    pub fn is_empty(&self) -> bool {
        self.count.is_none() && self.register.is_none() && self.prefix.is_empty() && !self.awaiting_register
    }
}

pub enum KeyMappingResult {
    Fire {
        handler: Handler,
        keys: Vec<Key>,
        arg: Option<usize>,
        register: Option<char>,
        /// Keys typed after the fired binding, to be dispatched again.
        replay: Vec<Key>,
    },
    UpdatePending,
    Noop,
}

const NORMAL: &[(&str, EditorCommand)] = &[
    ("h", EditorCommand::MoveLeft),
    ("<Left>", EditorCommand::MoveLeft),
    ("<BS>", EditorCommand::MoveLeft),
    ("l", EditorCommand::MoveRight),
    ("<Right>", EditorCommand::MoveRight),
    ("<Space>", EditorCommand::MoveRight),
    ("j", EditorCommand::MoveDown),
    ("<Down>", EditorCommand::MoveDown),
    ("k", EditorCommand::MoveUp),
    ("<Up>", EditorCommand::MoveUp),
    ("w", EditorCommand::WordForward),
    ("b", EditorCommand::WordBackward),
    ("e", EditorCommand::WordEnd),
    ("0", EditorCommand::LineStart),
    ("<Home>", EditorCommand::LineStart),
    ("^", EditorCommand::FirstNonBlank),
    ("$", EditorCommand::LineEnd),
    ("<End>", EditorCommand::LineEnd),
    ("gg", EditorCommand::GoToFirstLine),
    ("G", EditorCommand::GoToLastLine),
    ("+", EditorCommand::NextLineStart),
    ("<CR>", EditorCommand::OpenEntryUnderCursor),
    ("-", EditorCommand::OpenParentDirectory),
    ("<C-f>", EditorCommand::PageDown),
    ("<PageDown>", EditorCommand::PageDown),
    ("<C-b>", EditorCommand::PageUp),
    ("<PageUp>", EditorCommand::PageUp),
    ("f<Any>", EditorCommand::FindChar { forward: true, till: false }),
    ("F<Any>", EditorCommand::FindChar { forward: false, till: false }),
    ("t<Any>", EditorCommand::FindChar { forward: true, till: true }),
    ("T<Any>", EditorCommand::FindChar { forward: false, till: true }),
    ("m<Any>", EditorCommand::SetMark),
    ("'<Any>", EditorCommand::GoToMark),
    ("i", EditorCommand::InsertBefore),
    ("<Insert>", EditorCommand::InsertBefore),
    ("a", EditorCommand::Append),
    ("I", EditorCommand::InsertAtLineStart),
    ("A", EditorCommand::AppendAtLineEnd),
    ("o", EditorCommand::OpenBelow),
    ("O", EditorCommand::OpenAbove),
    ("x", EditorCommand::DeleteChar),
    ("<Del>", EditorCommand::DeleteChar),
    ("X", EditorCommand::DeleteCharBefore),
    ("s", EditorCommand::SubstituteChar),
    ("S", EditorCommand::ChangeLine),
    ("cc", EditorCommand::ChangeLine),
    ("C", EditorCommand::ChangeToLineEnd),
    ("c$", EditorCommand::ChangeToLineEnd),
    ("D", EditorCommand::DeleteToLineEnd),
    ("d$", EditorCommand::DeleteToLineEnd),
    ("dd", EditorCommand::DeleteLine),
    ("dw", EditorCommand::DeleteWord),
    ("cw", EditorCommand::ChangeWord),
    ("yy", EditorCommand::YankLine),
    ("Y", EditorCommand::YankLine),
    ("yw", EditorCommand::YankWord),
    ("p", EditorCommand::PasteAfter),
    ("P", EditorCommand::PasteBefore),
    ("J", EditorCommand::JoinLines),
    ("gJ", EditorCommand::JoinLinesNoSpace),
    ("~", EditorCommand::ToggleCase),
    ("guu", EditorCommand::LowercaseLine),
    ("gUU", EditorCommand::UppercaseLine),
    (">>", EditorCommand::Indent),
    ("<lt><lt>", EditorCommand::Unindent),
    ("r<Any>", EditorCommand::ReplaceChar),
    ("R", EditorCommand::EnterReplaceMode),
    ("u", EditorCommand::Undo),
    ("<C-r>", EditorCommand::Redo),
    (".", EditorCommand::RepeatLastEdit),
    (":", EditorCommand::EnterCommandLine),
    ("/", EditorCommand::EnterSearch(SearchDirection::Forward)),
    ("?", EditorCommand::EnterSearch(SearchDirection::Backward)),
    ("n", EditorCommand::SearchNext),
    ("N", EditorCommand::SearchPrevious),
    ("ZZ", EditorCommand::WriteAndQuit),
    ("ZQ", EditorCommand::QuitWithoutSaving),
    ("<C-w><C-w>", EditorCommand::CycleFocus),
    ("<C-w>w", EditorCommand::CycleFocus),
    ("<C-w>n", EditorCommand::NewWindow),
    ("<C-w>s", EditorCommand::HSplit),
    ("<C-w>v", EditorCommand::VSplit),
    ("<C-w>o", EditorCommand::OnlyWindow),
    ("gt", EditorCommand::NextTab),
    ("gT", EditorCommand::PreviousTab),
    ("<F1>", EditorCommand::Help),
];

/// Shared by insert and replace mode.
const TYPING: &[(&str, EditorCommand)] = &[
    ("<Any>", EditorCommand::SelfInsert),
    ("<CR>", EditorCommand::Newline),
    ("<BS>", EditorCommand::Backspace),
    ("<Del>", EditorCommand::Delete),
    ("<Tab>", EditorCommand::InsertTab),
    ("<C-d>", EditorCommand::UnindentInsert),
    ("<C-n>", EditorCommand::CompleteNext),
    ("<C-p>", EditorCommand::CompletePrevious),
    ("<C-e>", EditorCommand::CompleteCancel),
    ("<Left>", EditorCommand::MoveLeft),
    ("<Right>", EditorCommand::MoveRight),
    ("<Up>", EditorCommand::MoveUp),
    ("<Down>", EditorCommand::MoveDown),
    ("<Home>", EditorCommand::LineStart),
    ("<End>", EditorCommand::LineEnd),
];

const COMMAND_LINE: &[(&str, EditorCommand)] = &[
    ("<Any>", EditorCommand::SelfInsert),
    ("<BS>", EditorCommand::Backspace),
    ("<Del>", EditorCommand::Delete),
    ("<Left>", EditorCommand::MoveLeft),
    ("<Right>", EditorCommand::MoveRight),
    ("<Home>", EditorCommand::LineStart),
    ("<End>", EditorCommand::LineEnd),
    ("<CR>", EditorCommand::Accept),
    ("<Up>", EditorCommand::HistoryPrevious),
    ("<Down>", EditorCommand::HistoryNext),
    ("<C-c>", EditorCommand::Escape),
];

/// Register the built-in bindings in the default layer.
pub fn default_bindings(bindings: &mut KeyBindings) -> Result<()> {
    let tables = [
        (ModeFilter::Normal, NORMAL),
        (ModeFilter::Insert, TYPING),
        (ModeFilter::Replace, TYPING),
        (ModeFilter::CommandLine, COMMAND_LINE),
    ];
    for (filter, table) in tables {
        for (notation, command) in table {
            bindings.add_default(
                parse_patterns(notation)?,
                filter,
                Handler::Command(command.clone()),
            )?;
        }
    }
    bindings.add_default(
        parse_patterns("<Esc>")?,
        ModeFilter::Any,
        Handler::Command(EditorCommand::Escape),
    )?;
    Ok(())
}

/// Feed one key. Normal mode takes a `[1-9][0-9]*` count and a `"x`
/// register before the keys of a binding.
pub fn map_key(
    key: Key,
    mode: Mode,
    pending: &mut Pending,
    bindings: &KeyBindings,
) -> KeyMappingResult {
    if mode == Mode::Normal && pending.prefix.is_empty() {
        if pending.awaiting_register {
            pending.awaiting_register = false;
            return match key.printable() {
                Some(c) => {
                    pending.register = Some(c);
                    KeyMappingResult::UpdatePending
                }
                None => {
                    pending.clear();
                    KeyMappingResult::Noop
                }
            };
        }
        if key == Key::char('"') {
            pending.awaiting_register = true;
            return KeyMappingResult::UpdatePending;
        }
        if let Some(digit) = key.printable().and_then(|c| c.to_digit(10)) {
            if digit != 0 || pending.count.is_some() {
                let count = pending.count.unwrap_or(0);
                pending.count = Some((count * 10 + digit as usize).min(MAX_COUNT));
                return KeyMappingResult::UpdatePending;
            }
        }
    }

    pending.prefix.push(key);
    let lookup = bindings.lookup(mode, &pending.prefix);
    if lookup.has_longer {
        trace!(pending = pending.prefix.len(), "waiting for more keys");
        return KeyMappingResult::UpdatePending;
    }
    if let Some(binding) = lookup.exact {
        let handler = binding.handler.clone();
        let keys = pending.prefix.len();
        return fire(handler, keys, pending);
    }
    flush(mode, pending, bindings, 1)
}

/// Resolve pending keys without waiting for more: fire the longest prefix
/// that is bound and hand back the rest. Called when typing pauses.
pub fn flush_pending(mode: Mode, pending: &mut Pending, bindings: &KeyBindings) -> KeyMappingResult {
    flush(mode, pending, bindings, 0)
}

fn flush(mode: Mode, pending: &mut Pending, bindings: &KeyBindings, skip: usize) -> KeyMappingResult {
    let len = pending.prefix.len();
    for used in (1..=len.saturating_sub(skip)).rev() {
        if let Some(binding) = bindings.lookup(mode, &pending.prefix[..used]).exact {
            let handler = binding.handler.clone();
            return fire(handler, used, pending);
        }
    }
    pending.clear();
    KeyMappingResult::Noop
}

fn fire(handler: Handler, used: usize, pending: &mut Pending) -> KeyMappingResult {
    let replay = pending.prefix.split_off(used);
    let keys = std::mem::take(&mut pending.prefix);
    let result = KeyMappingResult::Fire {
        handler,
        keys,
        arg: pending.count,
        register: pending.register,
        replay,
    };
    pending.clear();
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keymap::parse_keys;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn defaults() -> KeyBindings {
        let mut bindings = KeyBindings::new();
        default_bindings(&mut bindings).unwrap();
        bindings
    }

    fn feed(bindings: &KeyBindings, mode: Mode, notation: &str) -> (Option<EditorCommand>, Pending) {
        let mut pending = Pending::default();
        let mut fired = None;
        for key in parse_keys(notation).unwrap() {
            if let KeyMappingResult::Fire {
                handler: Handler::Command(cmd),
                arg,
                register,
                ..
            } = map_key(key, mode, &mut pending, bindings)
            {
                fired = Some(cmd);
                pending.count = arg;
                pending.register = register;
            }
        }
        (fired, pending)
    }

    #[test]
    fn test_escape_key() {
        let bindings = defaults();
        let key = Key::from(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        for mode in [Mode::Normal, Mode::Insert, Mode::CommandLine] {
            let mut pending = Pending::default();
            assert!(matches!(
                map_key(key, mode, &mut pending, &bindings),
                KeyMappingResult::Fire { handler: Handler::Command(EditorCommand::Escape), .. }
            ));
        }
    }

    #[test]
    fn test_insert_char() {
        let bindings = defaults();
        let (cmd, _) = feed(&bindings, Mode::Insert, "a");
        assert_eq!(cmd, Some(EditorCommand::SelfInsert));
        let (cmd, _) = feed(&bindings, Mode::Normal, "a");
        assert_eq!(cmd, Some(EditorCommand::Append));
    }

    #[test]
    fn count_and_register_prefixes() {
        let bindings = defaults();
        let (cmd, pending) = feed(&bindings, Mode::Normal, "12dd");
        assert_eq!(cmd, Some(EditorCommand::DeleteLine));
        assert_eq!(pending.count, Some(12));

        let (cmd, pending) = feed(&bindings, Mode::Normal, "\"a3p");
        assert_eq!(cmd, Some(EditorCommand::PasteAfter));
        assert_eq!(pending.register, Some('a'));
        assert_eq!(pending.count, Some(3));

        let (cmd, _) = feed(&bindings, Mode::Normal, "0");
        assert_eq!(cmd, Some(EditorCommand::LineStart));
    }

    #[test]
    fn long_counts_stop_at_the_maximum() {
        let bindings = defaults();
        let (cmd, pending) = feed(&bindings, Mode::Normal, "99999999999999999999dd");
        assert_eq!(cmd, Some(EditorCommand::DeleteLine));
        assert_eq!(pending.count, Some(MAX_COUNT));
    }

    #[test]
    fn multi_key_sequences_wait_then_fire() {
        let bindings = defaults();
        let mut pending = Pending::default();
        assert!(matches!(
            map_key(Key::ctrl('w'), Mode::Normal, &mut pending, &bindings),
            KeyMappingResult::UpdatePending
        ));
        assert!(matches!(
            map_key(Key::char('v'), Mode::Normal, &mut pending, &bindings),
            KeyMappingResult::Fire { handler: Handler::Command(EditorCommand::VSplit), .. }
        ));
        assert!(pending.is_empty());
    }

    #[test]
    fn unmatched_sequence_is_dropped() {
        let bindings = defaults();
        let mut pending = Pending::default();
        map_key(Key::char('d'), Mode::Normal, &mut pending, &bindings);
        assert!(matches!(
            map_key(Key::char('q'), Mode::Normal, &mut pending, &bindings),
            KeyMappingResult::Noop
        ));
        assert!(pending.is_empty());
    }

    #[test]
    fn shorter_binding_fires_and_rest_is_replayed() {
        let mut bindings = defaults();
        bindings
            .add(
                parse_patterns("jj").unwrap(),
                ModeFilter::Insert,
                Handler::Command(EditorCommand::Escape),
            )
            .unwrap();
        let mut pending = Pending::default();
        assert!(matches!(
            map_key(Key::char('j'), Mode::Insert, &mut pending, &bindings),
            KeyMappingResult::UpdatePending
        ));
        match map_key(Key::char('x'), Mode::Insert, &mut pending, &bindings) {
            KeyMappingResult::Fire { handler: Handler::Command(cmd), keys, replay, .. } => {
                assert_eq!(cmd, EditorCommand::SelfInsert);
                assert_eq!(keys, vec![Key::char('j')]);
                assert_eq!(replay, vec![Key::char('x')]);
            }
            _ => panic!("expected the single j to fire"),
        }

        map_key(Key::char('j'), Mode::Insert, &mut pending, &bindings);
        assert!(matches!(
            flush_pending(Mode::Insert, &mut pending, &bindings),
            KeyMappingResult::Fire { handler: Handler::Command(EditorCommand::SelfInsert), .. }
        ));
    }

    #[test]
    fn defaults_have_no_conflicts() {
        assert!(default_bindings(&mut KeyBindings::new()).is_ok());
    }
}
