//! Key sequences, mode filters and the two-layer binding table.

use std::fmt;
use std::rc::Rc;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::debug;

use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::input::{EditorCommand, Mode};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Key {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl Key {
    pub const fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub const fn char(c: char) -> Self {
        Self::new(KeyCode::Char(c))
    }

    pub const fn ctrl(c: char) -> Self {
        Self {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
        }
    }

    /// The character this key types, if it is a plain printable key.
    pub fn printable(&self) -> Option<char> {
        match self.code {
            KeyCode::Char(c)
                if !self
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT)
                    && !c.is_control() =>
            {
                Some(c)
            }
            _ => None,
        }
    }
}

impl From<KeyEvent> for Key {
    fn from(event: KeyEvent) -> Self {
        match event.code {
            // Shift is already folded into the character.
            KeyCode::Char(c) => {
                let modifiers = event.modifiers & (KeyModifiers::CONTROL | KeyModifiers::ALT);
                let c = if modifiers.contains(KeyModifiers::CONTROL) {
                    c.to_ascii_lowercase()
                } else {
                    c
                };
                Key {
                    code: KeyCode::Char(c),
                    modifiers,
                }
            }
            code => Key {
                code,
                modifiers: event.modifiers
                    & (KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SHIFT),
            },
        }
    }
}

const NAMED_KEYS: &[(&str, KeyCode)] = &[
    ("esc", KeyCode::Esc),
    ("cr", KeyCode::Enter),
    ("enter", KeyCode::Enter),
    ("return", KeyCode::Enter),
    ("tab", KeyCode::Tab),
    ("bs", KeyCode::Backspace),
    ("backspace", KeyCode::Backspace),
    ("del", KeyCode::Delete),
    ("delete", KeyCode::Delete),
    ("up", KeyCode::Up),
    ("down", KeyCode::Down),
    ("left", KeyCode::Left),
    ("right", KeyCode::Right),
    ("home", KeyCode::Home),
    ("end", KeyCode::End),
    ("pageup", KeyCode::PageUp),
    ("pagedown", KeyCode::PageDown),
    ("insert", KeyCode::Insert),
    ("space", KeyCode::Char(' ')),
    ("lt", KeyCode::Char('<')),
];

fn parse_named(name: &str) -> Result<Key> {
    let invalid = || EditorError::KeyNotation(format!("<{}>", name));
    let lower = name.to_ascii_lowercase();

    if let Some(rest) = lower.strip_prefix("c-") {
        let inner = if rest.chars().count() == 1 {
            rest.chars().next().map(Key::char).ok_or_else(invalid)?
        } else {
            parse_named(&name[2..])?
        };
        return Ok(Key {
            modifiers: inner.modifiers | KeyModifiers::CONTROL,
            ..inner
        });
    }
    if let Some(rest) = lower.strip_prefix("a-").or_else(|| lower.strip_prefix("m-")) {
        let inner = if rest.chars().count() == 1 {
            // Alt keeps the case of the letter.
            name[2..].chars().next().map(Key::char).ok_or_else(invalid)?
        } else {
            parse_named(&name[2..])?
        };
        return Ok(Key {
            modifiers: inner.modifiers | KeyModifiers::ALT,
            ..inner
        });
    }
    if let Some(n) = lower.strip_prefix('f').and_then(|n| n.parse::<u8>().ok()) {
        if (1..=12).contains(&n) {
            return Ok(Key::new(KeyCode::F(n)));
        }
        return Err(invalid());
    }
    NAMED_KEYS
        .iter()
        .find(|(n, _)| *n == lower)
        .map(|(_, code)| Key::new(*code))
        .ok_or_else(invalid)
}

/// Parse key notation such as `dd`, `<C-w>v` or `<Esc>`.
pub fn parse_keys(notation: &str) -> Result<Vec<Key>> {
    let mut keys = Vec::new();
    let mut rest = notation;
    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(close) = rest.find('>') {
                if close > 1 {
                    keys.push(parse_named(&rest[1..close])?);
                    rest = &rest[close + 1..];
                    continue;
                }
            }
        }
        keys.push(Key::char(c));
        rest = &rest[c.len_utf8()..];
    }
    if keys.is_empty() {
        return Err(EditorError::KeyNotation(notation.to_string()));
    }
    Ok(keys)
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self.code {
            KeyCode::Char('<') => "lt".to_string(),
            KeyCode::Char(' ') => "Space".to_string(),
            KeyCode::Char(c) => c.to_string(),
            KeyCode::F(n) => format!("F{}", n),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Enter => "CR".to_string(),
            KeyCode::Tab => "Tab".to_string(),
            KeyCode::Backspace => "BS".to_string(),
            KeyCode::Delete => "Del".to_string(),
            KeyCode::Up => "Up".to_string(),
            KeyCode::Down => "Down".to_string(),
            KeyCode::Left => "Left".to_string(),
            KeyCode::Right => "Right".to_string(),
            KeyCode::Home => "Home".to_string(),
            KeyCode::End => "End".to_string(),
            KeyCode::PageUp => "PageUp".to_string(),
            KeyCode::PageDown => "PageDown".to_string(),
            KeyCode::Insert => "Insert".to_string(),
            other => format!("{:?}", other),
        };
        let mut prefix = String::new();
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            prefix.push_str("C-");
        }
        if self.modifiers.contains(KeyModifiers::ALT) {
            prefix.push_str("A-");
        }
        if self.modifiers.contains(KeyModifiers::SHIFT) {
            prefix.push_str("S-");
        }
        let bare = matches!(self.code, KeyCode::Char(c) if c != '<' && c != ' ');
        if prefix.is_empty() && bare {
            write!(f, "{}", name)
        } else {
            write!(f, "<{}{}>", prefix, name)
        }
    }
}

pub fn format_keys(keys: &[Key]) -> String {
    keys.iter().map(|k| k.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyPattern {
    Key(Key),
    /// Any printable character.
    Any,
}

impl KeyPattern {
    pub fn matches(&self, key: &Key) -> bool {
        match self {
            KeyPattern::Key(k) => k == key,
            KeyPattern::Any => key.printable().is_some(),
        }
    }
}

impl fmt::Display for KeyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPattern::Key(k) => write!(f, "{}", k),
            KeyPattern::Any => write!(f, "<Any>"),
        }
    }
}

/// Parse notation where `<Any>` stands for any printable character.
pub fn parse_patterns(notation: &str) -> Result<Vec<KeyPattern>> {
    let mut patterns = Vec::new();
    for (i, part) in notation.split("<Any>").enumerate() {
        if i > 0 {
            patterns.push(KeyPattern::Any);
        }
        if !part.is_empty() {
            patterns.extend(parse_keys(part)?.into_iter().map(KeyPattern::Key));
        }
    }
    if patterns.is_empty() {
        return Err(EditorError::KeyNotation(notation.to_string()));
    }
    Ok(patterns)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeFilter {
    Any,
    Normal,
    Insert,
    Replace,
    /// The `:` command line and the `/` `?` search line.
    CommandLine,
}

impl ModeFilter {
    pub fn matches(self, mode: Mode) -> bool {
        match self {
            ModeFilter::Any => true,
            ModeFilter::Normal => mode == Mode::Normal,
            ModeFilter::Insert => mode == Mode::Insert,
            ModeFilter::Replace => mode == Mode::Replace,
            ModeFilter::CommandLine => matches!(mode, Mode::CommandLine | Mode::Search(_)),
        }
    }
}

impl FromStr for ModeFilter {
    type Err = EditorError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "any" => Ok(ModeFilter::Any),
            "normal" | "n" => Ok(ModeFilter::Normal),
            "insert" | "i" => Ok(ModeFilter::Insert),
            "replace" | "r" => Ok(ModeFilter::Replace),
            "command" | "c" => Ok(ModeFilter::CommandLine),
            other => Err(EditorError::Config(format!("Unknown mode: {}", other))),
        }
    }
}

impl fmt::Display for ModeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModeFilter::Any => "any",
            ModeFilter::Normal => "normal",
            ModeFilter::Insert => "insert",
            ModeFilter::Replace => "replace",
            ModeFilter::CommandLine => "command",
        };
        f.write_str(name)
    }
}

/// What a user handler receives when its binding fires.
pub struct KeyPressEvent<'a> {
    pub editor: &'a mut Editor,
    pub keys: Vec<Key>,
    /// The count typed before the keys, if any.
    pub arg: Option<usize>,
}

pub type CustomHandler = Rc<dyn Fn(&mut KeyPressEvent<'_>)>;

#[derive(Clone)]
pub enum Handler {
    Command(EditorCommand),
    Custom(CustomHandler),
}

impl Handler {
    pub fn custom(callback: impl Fn(&mut KeyPressEvent<'_>) + 'static) -> Self {
        Handler::Custom(Rc::new(callback))
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Handler::Command(cmd) => write!(f, "Command({:?})", cmd),
            Handler::Custom(_) => f.write_str("Custom"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layer {
    Default,
    User,
}

#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub keys: Vec<KeyPattern>,
    pub filter: ModeFilter,
    pub handler: Handler,
}

impl KeyBinding {
    fn matches(&self, mode: Mode, pending: &[Key]) -> bool {
        self.filter.matches(mode)
            && self.keys.len() == pending.len()
            && self.keys.iter().zip(pending).all(|(p, k)| p.matches(k))
    }

    fn extends(&self, mode: Mode, pending: &[Key]) -> bool {
        self.filter.matches(mode)
            && self.keys.len() > pending.len()
            && self.keys.iter().zip(pending).all(|(p, k)| p.matches(k))
    }

    fn concrete_keys(&self) -> usize {
        self.keys
            .iter()
            .filter(|p| matches!(p, KeyPattern::Key(_)))
            .count()
    }
}

/// Result of matching the pending keys.
pub struct Lookup<'a> {
    pub exact: Option<&'a KeyBinding>,
    /// Some binding is longer than the pending keys and still matches them.
    pub has_longer: bool,
}

#[derive(Default)]
pub struct KeyBindings {
    defaults: Vec<KeyBinding>,
    user: Vec<KeyBinding>,
}

impl KeyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    fn layer_mut(&mut self, layer: Layer) -> &mut Vec<KeyBinding> {
        match layer {
            Layer::Default => &mut self.defaults,
            Layer::User => &mut self.user,
        }
    }

    fn insert(
        &mut self,
        layer: Layer,
        keys: Vec<KeyPattern>,
        filter: ModeFilter,
        handler: Handler,
    ) -> Result<()> {
        let bindings = self.layer_mut(layer);
        if bindings.iter().any(|b| b.keys == keys && b.filter == filter) {
            let shown: String = keys.iter().map(|p| p.to_string()).collect();
            return Err(EditorError::BindingConflict {
                keys: shown,
                filter: filter.to_string(),
            });
        }
        debug!(target: "keymap", ?layer, %filter, count = keys.len(), "binding_added");
        bindings.push(KeyBinding {
            keys,
            filter,
            handler,
        });
        Ok(())
    }

    /// Register a built-in binding.
    pub fn add_default(
        &mut self,
        keys: Vec<KeyPattern>,
        filter: ModeFilter,
        handler: Handler,
    ) -> Result<()> {
        self.insert(Layer::Default, keys, filter, handler)
    }

    /// Register a user binding. It shadows a built-in with the same keys and
    /// filter, but may not duplicate another user binding.
    pub fn add(&mut self, keys: Vec<KeyPattern>, filter: ModeFilter, handler: Handler) -> Result<()> {
        self.insert(Layer::User, keys, filter, handler)
    }

    /// Register a user binding, dropping any user binding it duplicates.
    pub fn replace(&mut self, keys: Vec<KeyPattern>, filter: ModeFilter, handler: Handler) {
        self.user.retain(|b| !(b.keys == keys && b.filter == filter));
        self.user.push(KeyBinding {
            keys,
            filter,
            handler,
        });
    }

    pub fn lookup(&self, mode: Mode, pending: &[Key]) -> Lookup<'_> {
        let has_longer = self
            .user
            .iter()
            .chain(self.defaults.iter())
            .any(|b| b.extends(mode, pending));
        let exact = best_match(&self.user, mode, pending)
            .or_else(|| best_match(&self.defaults, mode, pending));
        Lookup { exact, has_longer }
    }

    pub fn len(&self) -> usize {
        self.defaults.len() + self.user.len()
    }
}

/// Among matching bindings of one layer, the one with the most concrete keys
/// wins; ties go to the earliest registered.
fn best_match<'a>(layer: &'a [KeyBinding], mode: Mode, pending: &[Key]) -> Option<&'a KeyBinding> {
    let mut best: Option<&KeyBinding> = None;
    for binding in layer.iter().filter(|b| b.matches(mode, pending)) {
        match best {
            Some(current) if current.concrete_keys() >= binding.concrete_keys() => {}
            _ => best = Some(binding),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn keys(notation: &str) -> Vec<KeyPattern> {
        parse_patterns(notation).unwrap()
    }

    fn cmd(c: EditorCommand) -> Handler {
        Handler::Command(c)
    }

    fn fired(bindings: &KeyBindings, mode: Mode, notation: &str) -> Option<EditorCommand> {
        let pending = parse_keys(notation).unwrap();
        match bindings.lookup(mode, &pending).exact.map(|b| &b.handler) {
            Some(Handler::Command(c)) => Some(c.clone()),
            _ => None,
        }
    }

    #[test]
    fn notation_parses_named_and_control_keys() {
        assert_eq!(
            parse_keys("<C-w>v").unwrap(),
            vec![Key::ctrl('w'), Key::char('v')]
        );
        assert_eq!(parse_keys("<Esc>").unwrap(), vec![Key::new(KeyCode::Esc)]);
        assert_eq!(parse_keys("<F5>").unwrap(), vec![Key::new(KeyCode::F(5))]);
        assert_eq!(parse_keys("<lt>").unwrap(), vec![Key::char('<')]);
        assert_eq!(parse_keys("<<").unwrap(), vec![Key::char('<'), Key::char('<')]);
        assert!(parse_keys("<Bogus>").is_err());
        assert!(parse_keys("").is_err());
    }

    #[test]
    fn display_round_trips_notation() {
        for notation in ["dd", "<C-w><C-w>", "<F1>", "g<CR>", "<lt>x"] {
            let parsed = parse_keys(notation).unwrap();
            assert_eq!(format_keys(&parsed), notation);
        }
    }

    #[test]
    fn key_events_fold_shift_into_chars() {
        let event = KeyEvent::new_with_kind(
            KeyCode::Char('A'),
            KeyModifiers::SHIFT,
            KeyEventKind::Press,
        );
        assert_eq!(Key::from(event), Key::char('A'));
        let event = KeyEvent::new(KeyCode::Char('R'), KeyModifiers::CONTROL | KeyModifiers::SHIFT);
        assert_eq!(Key::from(event), Key::ctrl('r'));
    }

    #[test]
    fn duplicate_in_same_layer_is_a_conflict() {
        let mut bindings = KeyBindings::new();
        bindings
            .add(keys("dd"), ModeFilter::Normal, cmd(EditorCommand::DeleteLine))
            .unwrap();
        let err = bindings
            .add(keys("dd"), ModeFilter::Normal, cmd(EditorCommand::Undo))
            .unwrap_err();
        assert!(matches!(err, EditorError::BindingConflict { .. }));

        bindings
            .add_default(keys("dd"), ModeFilter::Normal, cmd(EditorCommand::Undo))
            .unwrap();
        assert!(bindings
            .add_default(keys("dd"), ModeFilter::Normal, cmd(EditorCommand::Undo))
            .is_err());
        // Different filters do not collide.
        bindings
            .add(keys("dd"), ModeFilter::Insert, cmd(EditorCommand::Undo))
            .unwrap();
    }

    #[test]
    fn user_binding_shadows_default() {
        let mut bindings = KeyBindings::new();
        bindings
            .add_default(keys("x"), ModeFilter::Normal, cmd(EditorCommand::DeleteChar))
            .unwrap();
        assert_eq!(
            fired(&bindings, Mode::Normal, "x"),
            Some(EditorCommand::DeleteChar)
        );
        bindings
            .add(keys("x"), ModeFilter::Normal, cmd(EditorCommand::Undo))
            .unwrap();
        assert_eq!(fired(&bindings, Mode::Normal, "x"), Some(EditorCommand::Undo));
    }

    #[test]
    fn replace_is_last_wins() {
        let mut bindings = KeyBindings::new();
        bindings.replace(keys("Q"), ModeFilter::Normal, cmd(EditorCommand::Undo));
        bindings.replace(keys("Q"), ModeFilter::Normal, cmd(EditorCommand::Redo));
        assert_eq!(bindings.len(), 1);
        assert_eq!(fired(&bindings, Mode::Normal, "Q"), Some(EditorCommand::Redo));
    }

    #[test]
    fn prefix_waits_and_wildcards_match_printables() {
        let mut bindings = KeyBindings::new();
        bindings
            .add_default(keys("r<Any>"), ModeFilter::Normal, cmd(EditorCommand::ReplaceChar))
            .unwrap();
        bindings
            .add_default(keys("<Any>"), ModeFilter::Insert, cmd(EditorCommand::SelfInsert))
            .unwrap();
        bindings
            .add_default(keys("<Tab>"), ModeFilter::Insert, cmd(EditorCommand::InsertTab))
            .unwrap();

        let r = parse_keys("r").unwrap();
        let lookup = bindings.lookup(Mode::Normal, &r);
        assert!(lookup.exact.is_none());
        assert!(lookup.has_longer);

        assert_eq!(
            fired(&bindings, Mode::Normal, "rx"),
            Some(EditorCommand::ReplaceChar)
        );
        assert_eq!(fired(&bindings, Mode::Normal, "r<C-a>"), None);
        assert_eq!(
            fired(&bindings, Mode::Insert, "<Tab>"),
            Some(EditorCommand::InsertTab)
        );
        assert_eq!(fired(&bindings, Mode::Insert, "q"), Some(EditorCommand::SelfInsert));
        assert_eq!(fired(&bindings, Mode::Normal, "q"), None);
    }

    #[test]
    fn concrete_keys_beat_wildcards_in_one_layer() {
        let mut bindings = KeyBindings::new();
        bindings
            .add_default(keys("<Any>"), ModeFilter::Insert, cmd(EditorCommand::SelfInsert))
            .unwrap();
        bindings
            .add_default(keys("j"), ModeFilter::Insert, cmd(EditorCommand::MoveDown))
            .unwrap();
        assert_eq!(fired(&bindings, Mode::Insert, "j"), Some(EditorCommand::MoveDown));
    }

    #[test]
    fn mode_filter_parses_and_matches() {
        assert_eq!("Normal".parse::<ModeFilter>().unwrap(), ModeFilter::Normal);
        assert!("visual".parse::<ModeFilter>().is_err());
        assert!(ModeFilter::CommandLine.matches(Mode::CommandLine));
        assert!(!ModeFilter::Insert.matches(Mode::Normal));
        assert!(ModeFilter::Any.matches(Mode::Replace));
    }
}
