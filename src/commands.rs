//! Execution of `:` commands against the editor.

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::buffer::{EditorBuffer, Register};
use crate::command::{parse, replacement_template, ExCommand, LineRange, LineSpec};
use crate::editor::Editor;
use crate::error::{EditorError, Result};
use crate::io::expand_tilde;
use crate::search;
use crate::tools::TerminalJob;
use crate::window::Closed;

pub const NO_WRITE_SINCE_LAST_CHANGE: &str = "No write since last change (add ! to override)";
pub const NO_FILE_NAME: &str = "No file name";
const FILE_EXISTS: &str = "File exists (add ! to override)";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Named {
    Write,
    WriteQuit,
    WriteAll,
    WriteQuitAll,
    Exit,
    Quit,
    QuitAll,
    QuitWithError,
    Edit,
    Next,
    Previous,
    BufferAdd,
    Buffer,
    BufferNext,
    BufferPrevious,
    BufferDelete,
    List,
    Split,
    VSplit,
    New,
    VNew,
    Only,
    Hide,
    TabNew,
    TabClose,
    TabNext,
    TabPrevious,
    Help,
    Pwd,
    Cd,
}

/// Name, command, and whether `!` is accepted.
const NAMED: &[(&str, Named, bool)] = &[
    ("w", Named::Write, true),
    ("write", Named::Write, true),
    ("wq", Named::WriteQuit, true),
    ("wa", Named::WriteAll, false),
    ("wall", Named::WriteAll, false),
    ("wqa", Named::WriteQuitAll, true),
    ("wqall", Named::WriteQuitAll, true),
    ("x", Named::Exit, false),
    ("xit", Named::Exit, false),
    ("q", Named::Quit, true),
    ("quit", Named::Quit, true),
    ("qa", Named::QuitAll, true),
    ("qall", Named::QuitAll, true),
    ("cq", Named::QuitWithError, false),
    ("e", Named::Edit, true),
    ("edit", Named::Edit, true),
    ("o", Named::Edit, true),
    ("open", Named::Edit, true),
    ("n", Named::Next, true),
    ("next", Named::Next, true),
    ("p", Named::Previous, true),
    ("previous", Named::Previous, true),
    ("badd", Named::BufferAdd, false),
    ("b", Named::Buffer, true),
    ("buffer", Named::Buffer, true),
    ("bn", Named::BufferNext, true),
    ("bnext", Named::BufferNext, true),
    ("bp", Named::BufferPrevious, true),
    ("bprevious", Named::BufferPrevious, true),
    ("bd", Named::BufferDelete, true),
    ("bdelete", Named::BufferDelete, true),
    ("bw", Named::BufferDelete, true),
    ("bwipeout", Named::BufferDelete, true),
    ("ls", Named::List, false),
    ("files", Named::List, false),
    ("buffers", Named::List, false),
    ("sp", Named::Split, false),
    ("split", Named::Split, false),
    ("vsp", Named::VSplit, false),
    ("vsplit", Named::VSplit, false),
    ("new", Named::New, false),
    ("vnew", Named::VNew, false),
    ("only", Named::Only, false),
    ("hide", Named::Hide, false),
    ("tabe", Named::TabNew, false),
    ("tabedit", Named::TabNew, false),
    ("tabnew", Named::TabNew, false),
    ("tabc", Named::TabClose, false),
    ("tabclose", Named::TabClose, false),
    ("tabn", Named::TabNext, false),
    ("tabnext", Named::TabNext, false),
    ("tabp", Named::TabPrevious, false),
    ("tabprevious", Named::TabPrevious, false),
    ("h", Named::Help, false),
    ("help", Named::Help, false),
    ("pwd", Named::Pwd, false),
    ("cd", Named::Cd, false),
];

/// Parse and run one command line. Failures end up in the message line.
pub fn execute(editor: &mut Editor, input: &str) {
    let command = match parse(input) {
        Ok(command) => command,
        Err(err) => {
            editor.show_message(err.to_string());
            return;
        }
    };
    debug!(target: "editor", ?command, "execute_command");

    let outcome = match command {
        ExCommand::Empty => Ok(()),
        ExCommand::GoToLine(line) => {
            editor.active_buffer_mut().go_to_line(line.saturating_sub(1));
            Ok(())
        }
        ExCommand::Shell(command) => {
            editor.schedule(TerminalJob::Shell(command));
            Ok(())
        }
        ExCommand::Set { option, value } => set(editor, option.as_deref(), value.as_deref()),
        ExCommand::Colorscheme(Some(name)) => {
            editor.use_colorscheme(&name);
            Ok(())
        }
        ExCommand::Colorscheme(None) => {
            let name = editor.settings.colorscheme.clone();
            editor.show_message(name);
            Ok(())
        }
        ExCommand::Substitute {
            range,
            search,
            replace,
            global,
        } => substitute(editor, range, &search, replace, global),
        ExCommand::Yank { range } => yank(editor, range),
        ExCommand::Delete { range } => delete(editor, range),
        ExCommand::Copy { range, target } => copy(editor, range, target),
        ExCommand::Named { name, force, arg } => run_named(editor, input, &name, force, arg.as_deref()),
    };
    if let Err(err) = outcome {
        editor.show_message(err.to_string());
    }
}

fn run_named(editor: &mut Editor, input: &str, name: &str, force: bool, arg: Option<&str>) -> Result<()> {
    let Some(&(_, command, accepts_force)) = NAMED.iter().find(|(n, _, _)| *n == name) else {
        return Err(EditorError::CommandParse(input.trim().to_string()));
    };
    if force && !accepts_force {
        editor.show_message("No ! allowed");
        return Ok(());
    }

    match command {
        Named::Write => {
            write(editor, arg, force)?;
        }
        Named::WriteQuit => {
            write(editor, arg, force)?;
            quit(editor, false);
        }
        Named::WriteAll => write_all(editor, false)?,
        Named::WriteQuitAll => {
            write_all(editor, force)?;
            quit_all(editor, force);
        }
        Named::Exit => {
            if editor.active_buffer().has_unsaved_changes() {
                write(editor, None, false)?;
            }
            quit(editor, false);
        }
        Named::Quit => quit(editor, force),
        Named::QuitAll => quit_all(editor, force),
        Named::QuitWithError => editor.request_exit(1),
        Named::Edit => edit(editor, arg, force)?,
        Named::Next | Named::Previous => {
            let current = editor.current_location_index as isize;
            let step = if command == Named::Next { 1 } else { -1 };
            open_location_at(editor, current + step);
        }
        Named::BufferAdd => match arg {
            Some(location) => {
                editor.open_location(Path::new(location), false);
            }
            None => editor.show_message("Argument required"),
        },
        Named::Buffer => {
            if let Some(name) = arg {
                if guard_unsaved(editor, force) && !editor.windows.go_to_buffer(name) {
                    editor.show_message(format!("No matching buffer for {}", name));
                }
            }
        }
        Named::BufferNext => {
            if guard_unsaved(editor, force) {
                editor.windows.go_to_next_buffer();
            }
        }
        Named::BufferPrevious => {
            if guard_unsaved(editor, force) {
                editor.windows.go_to_previous_buffer();
            }
        }
        Named::BufferDelete => {
            if guard_unsaved(editor, force) {
                let defaults = editor.settings.buffer_defaults;
                let closed = editor.windows.close_buffer(|| EditorBuffer::new(defaults));
                info!(target: "editor", buffer = %closed.display_name(false), "buffer_deleted");
            }
        }
        Named::List => {
            let listing = list_buffers(editor);
            editor.schedule(TerminalJob::Print(listing));
        }
        Named::Split | Named::VSplit => {
            let index = match arg {
                Some(location) => editor.open_location(Path::new(location), false),
                None => editor.windows.active_buffer_index(),
            };
            if command == Named::Split {
                editor.windows.hsplit(index);
            } else {
                editor.windows.vsplit(index);
            }
        }
        Named::New => {
            let index = editor.new_buffer();
            editor.windows.hsplit(index);
        }
        Named::VNew => {
            let index = editor.new_buffer();
            editor.windows.vsplit(index);
        }
        Named::Only => editor.windows.keep_only_current_window(),
        Named::Hide => {
            if editor.windows.close_window() == Closed::LastWindow {
                editor.show_message("Cannot close last window");
            }
        }
        Named::TabNew => {
            let index = match arg {
                Some(location) => editor.open_location(Path::new(location), false),
                None => editor.new_buffer(),
            };
            editor.windows.create_tab(index);
        }
        Named::TabClose => {
            if editor.windows.close_tab() == Closed::LastWindow {
                editor.show_message("Cannot close last tab page");
            }
        }
        Named::TabNext => editor.windows.go_to_next_tab(),
        Named::TabPrevious => editor.windows.go_to_previous_tab(),
        Named::Help => editor.show_help(),
        Named::Pwd => {
            let cwd = env::current_dir()?;
            editor.show_message(cwd.display().to_string());
        }
        Named::Cd => {
            let target = match arg {
                Some(location) => expand_tilde(Path::new(location)),
                None => dirs::home_dir().unwrap_or_else(|| PathBuf::from("/")),
            };
            env::set_current_dir(&target)?;
            info!(target: "editor", dir = %target.display(), "cd");
        }
    }
    Ok(())
}

/// False (with a message) when the active buffer has changes and `force`
/// is not given.
fn guard_unsaved(editor: &mut Editor, force: bool) -> bool {
    if !force && editor.active_buffer().has_unsaved_changes() {
        editor.show_message(NO_WRITE_SINCE_LAST_CHANGE);
        return false;
    }
    true
}

fn write(editor: &mut Editor, location: Option<&str>, force: bool) -> Result<()> {
    if let Some(location) = location {
        let path = PathBuf::from(location);
        let own = editor
            .active_buffer()
            .location
            .as_deref()
            .map_or(false, |current| expand_tilde(current) == expand_tilde(&path));
        if !force && !own && expand_tilde(&path).exists() {
            return Err(EditorError::InvalidValue(FILE_EXISTS.to_string()));
        }
        editor.write_active_buffer(Some(path), force)?;
    } else {
        if editor.active_buffer().location.is_none() {
            return Err(EditorError::NoFileName);
        }
        editor.write_active_buffer(None, force)?;
    }
    let buffer = editor.active_buffer();
    let written = format!("\"{}\" {}L written", buffer.display_name(false), buffer.line_count());
    editor.show_message(written);
    Ok(())
}

/// `:wa` writes every changed buffer that belongs to a file.
/// `force` also overwrites read-only files.
fn write_all(editor: &mut Editor, force: bool) -> Result<()> {
    for index in 0..editor.windows.buffers.len() {
        let buffer = &editor.windows.buffers[index];
        if buffer.title.is_some() || !buffer.has_unsaved_changes() {
            continue;
        }
        if buffer.location.is_none() {
            return Err(EditorError::NoFileName);
        }
        editor.write_buffer(index, force)?;
    }
    Ok(())
}

fn quit(editor: &mut Editor, force: bool) {
    let index = editor.windows.active_buffer_index();
    let shown_elsewhere = editor.windows.windows_for_buffer(index).len() > 1;
    if !force && !shown_elsewhere && editor.active_buffer().has_unsaved_changes() {
        editor.show_message(NO_WRITE_SINCE_LAST_CHANGE);
        return;
    }
    if editor.windows.close_window() == Closed::LastWindow {
        editor.request_exit(0);
    }
}

fn quit_all(editor: &mut Editor, force: bool) {
    if !force && editor.windows.buffers.iter().any(|b| b.has_unsaved_changes()) {
        editor.show_message(NO_WRITE_SINCE_LAST_CHANGE);
        return;
    }
    editor.request_exit(0);
}

fn edit(editor: &mut Editor, location: Option<&str>, force: bool) -> Result<()> {
    let Some(location) = location else {
        if editor.active_buffer().location.is_none() {
            return Err(EditorError::NoFileName);
        }
        if guard_unsaved(editor, force) {
            editor.reload_active_buffer()?;
        }
        return Ok(());
    };

    let history = &editor.location_history;
    let location = match history.len().checked_sub(2).map(|i| &history[i]) {
        Some(alternate) if location.contains('#') => {
            PathBuf::from(location.replace('#', &alternate.display().to_string()))
        }
        _ => PathBuf::from(location),
    };
    editor.open_location(&location, true);
    Ok(())
}

/// `:n` and `:p` over the files given at startup.
fn open_location_at(editor: &mut Editor, index: isize) {
    if editor.locations.len() <= 1 {
        editor.show_message("There is only one file to edit");
        return;
    }
    if index < 0 || index as usize >= editor.locations.len() {
        editor.show_message("No more file");
        return;
    }
    let index = index as usize;
    let location = editor.locations[index].clone();
    editor.open_location(&location, true);
    editor.current_location_index = index;
}

fn list_buffers(editor: &Editor) -> String {
    editor
        .windows
        .list_open_buffers()
        .iter()
        .map(|info| {
            let flags = match (info.is_active, info.is_visible) {
                (true, _) => "%a",
                (false, true) => " a",
                _ => "",
            };
            format!(
                " {:>3} {:<2} {:<20}  line {}",
                info.index,
                flags,
                format!("\"{}\"", info.name),
                info.row
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn set(editor: &mut Editor, option: Option<&str>, value: Option<&str>) -> Result<()> {
    match option {
        None | Some("all") => {
            let listing = editor.options().listing().join("\n");
            editor.schedule(TerminalJob::Print(listing));
        }
        Some(option) => {
            let shown = editor.options().set(option, value)?;
            if let Some(shown) = shown {
                editor.show_message(shown);
            }
        }
    }
    Ok(())
}

// ── Line ranges ─────────────────────────────────────────────────────────

fn row_of(buffer: &EditorBuffer, spec: LineSpec) -> Result<usize> {
    let last = buffer.line_count().saturating_sub(1);
    let row = match spec {
        LineSpec::Number(n) => n.saturating_sub(1),
        LineSpec::Current => buffer.cursor_row,
        LineSpec::Last => last,
        LineSpec::Mark(c) => buffer
            .marks
            .get(&c)
            .ok_or_else(|| EditorError::InvalidValue("Mark not set".to_string()))?
            .saturating_sub(1),
    };
    Ok(row.min(last))
}

/// First and last row of `range`, ordered. No range means the cursor line.
fn rows(buffer: &EditorBuffer, range: Option<LineRange>) -> Result<(usize, usize)> {
    let Some(range) = range else {
        return Ok((buffer.cursor_row, buffer.cursor_row));
    };
    let start = row_of(buffer, range.start)?;
    let end = match range.end {
        Some(end) => row_of(buffer, end)?,
        None => start,
    };
    Ok((start.min(end), start.max(end)))
}

fn lines(buffer: &EditorBuffer, first: usize, last: usize) -> Vec<String> {
    (first..=last).map(|row| buffer.line(row)).collect()
}

fn substitute(
    editor: &mut Editor,
    range: Option<LineRange>,
    search: &str,
    replace: Option<String>,
    global: bool,
) -> Result<()> {
    let pattern = if search.is_empty() {
        match editor.search_state() {
            Some(state) => state.pattern.clone(),
            None => {
                editor.show_message("No previous regular expression");
                return Ok(());
            }
        }
    } else {
        search.to_string()
    };
    let replace = replace
        .or_else(|| editor.last_substitute.clone())
        .unwrap_or_default();
    let regex = search::compile(&pattern, editor.settings.ignore_case)?;
    let template = replacement_template(&replace);

    editor.set_search_pattern(&pattern);
    editor.last_substitute = Some(replace);

    let buffer = editor.active_buffer_mut();
    let (first, last) = rows(buffer, range)?;
    let original = lines(buffer, first, last);
    if !original.iter().any(|line| regex.is_match(line)) {
        editor.show_message(format!("Pattern not found: {}", pattern));
        return Ok(());
    }
    let replaced: Vec<String> = original
        .iter()
        .map(|line| {
            if global {
                regex.replace_all(line, template.as_str()).into_owned()
            } else {
                regex.replace(line, template.as_str()).into_owned()
            }
        })
        .collect();
    let added = replaced.iter().map(|l| l.matches('\n').count()).sum::<usize>();

    buffer.save_to_undo_stack();
    buffer.replace_lines(first, last, &replaced);
    buffer.go_to_line(last + added);
    debug!(target: "search", %pattern, first, last, "substitute");
    Ok(())
}

fn yank(editor: &mut Editor, range: Option<LineRange>) -> Result<()> {
    let buffer = editor.active_buffer();
    let (first, last) = rows(buffer, range)?;
    let text = lines(buffer, first, last).join("\n");
    editor.store_register(None, Register::lines(text));
    Ok(())
}

fn delete(editor: &mut Editor, range: Option<LineRange>) -> Result<()> {
    let buffer = editor.active_buffer_mut();
    let (first, last) = rows(buffer, range)?;
    buffer.save_to_undo_stack();
    buffer.go_to_line(first);
    let deleted = buffer.delete_lines(last - first + 1);
    editor.store_register(None, Register::lines(deleted));
    Ok(())
}

/// `:co` puts the lines below `target`; line 0 means above the first line.
fn copy(editor: &mut Editor, range: Option<LineRange>, target: LineSpec) -> Result<()> {
    let buffer = editor.active_buffer_mut();
    let (first, last) = rows(buffer, range)?;
    let register = Register::lines(lines(buffer, first, last).join("\n"));
    let above_first = target == LineSpec::Number(0);
    let target = row_of(buffer, target)?;
    buffer.save_to_undo_stack();
    buffer.go_to_line(target);
    buffer.paste(&register, !above_first, 1);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{OptionName, OptionValue};
    use std::fs;

    fn editor_with(text: &str) -> Editor {
        let mut editor = Editor::new();
        *editor.active_buffer_mut() = EditorBuffer::from_text(text, editor.settings.buffer_defaults);
        editor
    }

    fn text(editor: &Editor) -> String {
        editor.active_buffer().text.to_string()
    }

    fn modify(editor: &mut Editor) {
        editor.active_buffer_mut().insert_str("changed ");
    }

    #[test]
    fn set_then_read_back() {
        let mut e = Editor::new();
        execute(&mut e, "set ts=2");
        execute(&mut e, ":set nu");
        execute(&mut e, "set noic");
        execute(&mut e, "set cc=80");
        assert_eq!(e.options().get(OptionName::TabStop), OptionValue::Number(2));
        assert_eq!(e.options().get(OptionName::Number), OptionValue::Bool(true));
        assert_eq!(e.options().get(OptionName::IgnoreCase), OptionValue::Bool(false));
        assert_eq!(e.options().get(OptionName::ColorColumn), OptionValue::List(vec![80]));
        assert!(e.settings.show_line_numbers);

        execute(&mut e, "set ts");
        assert_eq!(e.message(), Some("tabstop=2"));
    }

    #[test]
    fn set_errors_go_to_the_message_line() {
        let mut e = Editor::new();
        execute(&mut e, "set bogus");
        assert_eq!(e.message(), Some("Unknown option: bogus"));
        execute(&mut e, "set ts=x");
        assert_eq!(e.message(), Some("Number required after ="));
        assert_eq!(e.active_buffer().settings.tabstop, 4);
    }

    #[test]
    fn set_all_prints_the_listing() {
        let mut e = Editor::new();
        execute(&mut e, "set all");
        execute(&mut e, "set");
        let jobs = e.take_jobs();
        assert_eq!(jobs.len(), 2);
        assert!(matches!(&jobs[0], TerminalJob::Print(text) if text.contains("  tabstop=4")));
        assert_eq!(jobs[0], jobs[1]);
    }

    #[test]
    fn unknown_commands_and_misplaced_bang() {
        let mut e = Editor::new();
        execute(&mut e, "frobnicate");
        assert_eq!(e.message(), Some("Not an editor command: frobnicate"));
        execute(&mut e, "ls!");
        assert_eq!(e.message(), Some("No ! allowed"));
        assert!(e.take_jobs().is_empty());
    }

    #[test]
    fn quit_rules() {
        let mut e = editor_with("a");
        modify(&mut e);
        execute(&mut e, "q");
        assert_eq!(e.message(), Some(NO_WRITE_SINCE_LAST_CHANGE));
        assert_eq!(e.exit_code(), None);

        // A second window on the same buffer closes freely.
        execute(&mut e, "sp");
        assert_eq!(e.windows.tab().window_count(), 2);
        execute(&mut e, "q");
        assert_eq!(e.windows.tab().window_count(), 1);
        assert_eq!(e.exit_code(), None);

        execute(&mut e, "qa");
        assert_eq!(e.exit_code(), None);
        execute(&mut e, "q!");
        assert_eq!(e.exit_code(), Some(0));
    }

    #[test]
    fn cq_exits_with_error() {
        let mut e = Editor::new();
        execute(&mut e, "cq");
        assert_eq!(e.exit_code(), Some(1));
    }

    #[test]
    fn write_needs_a_name_and_respects_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let mut e = editor_with("one\ntwo");
        execute(&mut e, "w");
        assert_eq!(e.message(), Some(NO_FILE_NAME));

        execute(&mut e, &format!("w {}", path.display()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "one\ntwo\n");
        assert!(!e.active_buffer().has_unsaved_changes());
        assert_eq!(e.message(), Some(format!("\"{}\" 2L written", path.display()).as_str()));

        let mut other = editor_with("other");
        execute(&mut other, &format!("w {}", path.display()));
        assert_eq!(other.message(), Some(FILE_EXISTS));
        execute(&mut other, &format!("w! {}", path.display()));
        assert_eq!(fs::read_to_string(&path).unwrap(), "other\n");
    }

    #[test]
    fn write_quit_and_exit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");

        let mut e = Editor::new();
        e.open_location(&path, true);
        execute(&mut e, "x");
        assert!(!path.exists());
        assert_eq!(e.exit_code(), Some(0));

        let mut e = Editor::new();
        e.open_location(&path, true);
        modify(&mut e);
        execute(&mut e, "wq");
        assert_eq!(fs::read_to_string(&path).unwrap(), "changed \n");
        assert_eq!(e.exit_code(), Some(0));
    }

    #[test]
    fn write_all_stops_at_unnamed_buffers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let mut e = Editor::new();
        e.open_location(&path, true);
        modify(&mut e);
        execute(&mut e, "wa");
        assert_eq!(fs::read_to_string(&path).unwrap(), "changed \n");

        execute(&mut e, "new");
        modify(&mut e);
        execute(&mut e, "wqa");
        assert_eq!(e.message(), Some(NO_FILE_NAME));
        assert_eq!(e.exit_code(), None);
    }

    #[test]
    fn write_quit_all_with_bang_overrides_read_only() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ro.txt");
        fs::write(&path, "old\n").unwrap();
        let mut permissions = fs::metadata(&path).unwrap().permissions();
        permissions.set_readonly(true);
        fs::set_permissions(&path, permissions.clone()).unwrap();

        let mut e = Editor::new();
        e.open_location(&path, true);
        modify(&mut e);
        execute(&mut e, "wqa");
        assert_eq!(e.exit_code(), None);
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");

        execute(&mut e, "wqa!");
        assert_eq!(e.exit_code(), Some(0));
        assert_ne!(fs::read_to_string(&path).unwrap(), "old\n");

        permissions.set_readonly(false);
        fs::set_permissions(&path, permissions).unwrap();
    }

    #[test]
    fn edit_reloads_and_guards_changes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "disk\n").unwrap();

        let mut e = Editor::new();
        execute(&mut e, "e");
        assert_eq!(e.message(), Some(NO_FILE_NAME));

        execute(&mut e, &format!("e {}", path.display()));
        assert_eq!(text(&e), "disk");
        modify(&mut e);
        execute(&mut e, "e");
        assert_eq!(e.message(), Some(NO_WRITE_SINCE_LAST_CHANGE));
        execute(&mut e, "e!");
        assert_eq!(text(&e), "disk");
    }

    #[test]
    fn edit_hash_opens_the_alternate_file() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let mut e = Editor::new();
        e.open_location(&a, true);
        e.open_location(&b, true);
        execute(&mut e, "e #");
        assert_eq!(e.active_buffer().location.as_deref(), Some(a.as_path()));
    }

    #[test]
    fn next_and_previous_walk_the_argument_list() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.txt");
        let b = dir.path().join("b.txt");
        let mut e = Editor::new();
        e.load_initial_files(&[a.clone(), b.clone()], crate::editor::InitialLayout::Buffers);

        execute(&mut e, "n");
        assert_eq!(e.active_buffer().location.as_deref(), Some(b.as_path()));
        assert_eq!(e.current_location_index, 1);
        execute(&mut e, "n");
        assert_eq!(e.message(), Some("No more file"));
        execute(&mut e, "p");
        assert_eq!(e.active_buffer().location.as_deref(), Some(a.as_path()));

        let mut single = Editor::new();
        single.load_initial_files(&[a], crate::editor::InitialLayout::Buffers);
        execute(&mut single, "n");
        assert_eq!(single.message(), Some("There is only one file to edit"));
    }

    #[test]
    fn buffer_commands() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        let mut e = Editor::new();
        execute(&mut e, &format!("badd {}", path.display()));
        assert_eq!(e.windows.buffers.len(), 2);
        assert_eq!(e.windows.active_buffer_index(), 0);

        execute(&mut e, "b notes");
        assert_eq!(e.windows.active_buffer_index(), 1);
        execute(&mut e, "b nothing");
        assert_eq!(e.message(), Some("No matching buffer for nothing"));

        execute(&mut e, "ls");
        let jobs = e.take_jobs();
        let TerminalJob::Print(listing) = &jobs[0] else {
            panic!("expected a listing, got {:?}", jobs);
        };
        let rows: Vec<&str> = listing.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].starts_with("   1    \"[New file]\""));
        assert!(rows[1].starts_with("   2 %a \""));
        assert!(rows[1].ends_with("line 1"));

        modify(&mut e);
        execute(&mut e, "bd");
        assert_eq!(e.message(), Some(NO_WRITE_SINCE_LAST_CHANGE));
        execute(&mut e, "bd!");
        assert_eq!(e.windows.buffers.len(), 1);
    }

    #[test]
    fn window_and_tab_commands() {
        let mut e = Editor::new();
        execute(&mut e, "vsp");
        execute(&mut e, "new");
        assert_eq!(e.windows.tab().window_count(), 3);
        execute(&mut e, "only");
        assert_eq!(e.windows.tab().window_count(), 1);
        execute(&mut e, "hide");
        assert_eq!(e.message(), Some("Cannot close last window"));

        execute(&mut e, "tabnew");
        assert_eq!(e.windows.tabs().len(), 2);
        assert_eq!(e.windows.active_tab_index(), 1);
        execute(&mut e, "tabp");
        assert_eq!(e.windows.active_tab_index(), 0);
        execute(&mut e, "tabclose");
        execute(&mut e, "tabclose");
        assert_eq!(e.windows.tabs().len(), 1);
        assert_eq!(e.message(), Some("Cannot close last tab page"));
    }

    #[test]
    fn go_to_line_shell_and_colorscheme() {
        let mut e = editor_with("a\n  b\nc");
        execute(&mut e, "2");
        assert_eq!((e.active_buffer().cursor_row, e.active_buffer().cursor_gcol), (1, 2));
        execute(&mut e, "99");
        assert_eq!(e.active_buffer().cursor_row, 2);

        execute(&mut e, "!make test");
        assert_eq!(e.take_jobs(), vec![TerminalJob::Shell("make test".into())]);

        execute(&mut e, "colorscheme");
        assert_eq!(e.message(), Some("default"));
        execute(&mut e, "colo nosuch");
        assert_eq!(e.message(), Some("Cannot find color scheme: nosuch"));
    }

    #[test]
    fn substitute_current_line_and_whole_buffer() {
        let mut e = editor_with("foo bar foo\nfoo");
        execute(&mut e, "s/foo/baz/");
        assert_eq!(text(&e), "baz bar foo\nfoo");
        execute(&mut e, "%s/foo/qux/g");
        assert_eq!(text(&e), "baz bar qux\nqux");
        assert_eq!(e.search_state().map(|s| s.pattern.as_str()), Some("foo"));
        assert_eq!(e.active_buffer().cursor_row, 1);

        assert!(e.active_buffer_mut().undo());
        assert_eq!(text(&e), "baz bar foo\nfoo");
    }

    #[test]
    fn substitute_groups_and_reuse() {
        let mut e = editor_with("hello world\nhello there");
        execute(&mut e, r"1s/(\w+) (\w+)/\2 \1/");
        assert_eq!(text(&e), "world hello\nhello there");

        execute(&mut e, "2s/hello/hi/");
        execute(&mut e, "%s//");
        assert_eq!(text(&e), "world hi\nhi there");

        execute(&mut e, "s/absent/x/");
        assert_eq!(e.message(), Some("Pattern not found: absent"));
    }

    #[test]
    fn substitute_with_marks() {
        let mut e = editor_with("x\nx\nx\nx");
        e.active_buffer_mut().marks.insert('a', 2);
        execute(&mut e, "'a,$s/x/y/");
        assert_eq!(text(&e), "x\ny\ny\ny");
        execute(&mut e, "'b,.s/x/y/");
        assert_eq!(e.message(), Some("Mark not set"));
    }

    #[test]
    fn delete_yank_and_copy_ranges() {
        let mut e = editor_with("a\nb\nc\nd");
        execute(&mut e, "2,3d");
        assert_eq!(text(&e), "a\nd");
        let register = e.register('"').unwrap();
        assert_eq!(register.text, "b\nc");
        assert!(register.linewise);

        execute(&mut e, "1,2ya");
        assert_eq!(e.register('"').unwrap().text, "a\nd");

        execute(&mut e, "1co$");
        assert_eq!(text(&e), "a\nd\na");
        execute(&mut e, "2co0");
        assert_eq!(text(&e), "d\na\nd\na");
    }
}
