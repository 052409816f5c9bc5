//! External programs: lint checkers, shell commands and save-and-execute.

use std::collections::HashMap;
use std::io::{self, BufRead, Write};
use std::process::Command;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::buffer::EditorBuffer;
use crate::editor::Editor;
use crate::io::expand_tilde;

pub const NO_FILENAME_MESSAGE: &str = "File doesn't have a filename. Please save first.";
pub const PRESS_ENTER: &str = "Press ENTER to continue...";

/// A problem reported by a lint checker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    /// Zero-based row.
    pub line: usize,
    /// Zero-based column, when the checker gives one.
    pub column: Option<usize>,
    pub message: String,
}

static REPORT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?P<path>[^:]+):(?P<line>\d+):(?:(?P<col>\d+):)?\s*(?P<msg>.*)$")
        .expect("report pattern compiles")
});

/// Parse `path:line[:col]: message` lines. Other lines are ignored.
pub fn parse_reports(output: &str) -> Vec<Report> {
    output
        .lines()
        .filter_map(|line| {
            let caps = REPORT_LINE.captures(line.trim_end())?;
            let row: usize = caps["line"].parse().ok()?;
            let column = caps
                .name("col")
                .and_then(|c| c.as_str().parse::<usize>().ok())
                .map(|c| c.saturating_sub(1));
            Some(Report {
                line: row.saturating_sub(1),
                column,
                message: caps["msg"].to_string(),
            })
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LintCommand {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// Lint checkers per file type.
#[derive(Debug, Clone)]
pub struct Linter {
    commands: HashMap<String, LintCommand>,
}

impl Default for Linter {
    fn default() -> Self {
        let mut commands = HashMap::new();
        commands.insert(
            "python".to_string(),
            LintCommand {
                program: "pyflakes".to_string(),
                args: Vec::new(),
            },
        );
        Self { commands }
    }
}

impl Linter {
    pub fn set(&mut self, filetype: &str, command: LintCommand) {
        self.commands.insert(filetype.to_string(), command);
    }

    pub fn command_for(&self, filetype: &str) -> Option<&LintCommand> {
        self.commands.get(filetype)
    }

    /// Run the checker for the buffer's file type on its saved file.
    /// A missing checker, program or file yields no reports.
    pub fn lint(&self, buffer: &EditorBuffer) -> Vec<Report> {
        let (Some(filetype), Some(location)) = (&buffer.filetype, &buffer.location) else {
            return Vec::new();
        };
        if buffer.is_new || buffer.is_dir {
            return Vec::new();
        }
        let Some(command) = self.command_for(filetype) else {
            return Vec::new();
        };

        let path = expand_tilde(location);
        let output = match Command::new(&command.program)
            .args(&command.args)
            .arg(&path)
            .output()
        {
            Ok(output) => output,
            Err(err) => {
                debug!(target: "lint", program = %command.program, %err, "lint_unavailable");
                return Vec::new();
            }
        };
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        let reports = parse_reports(&text);
        debug!(target: "lint", file = %path.display(), count = reports.len(), "lint_done");
        reports
    }
}

/// Work that needs the real terminal, run between frames by the main loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalJob {
    /// Run a program with arguments.
    Run { program: String, args: Vec<String> },
    /// `sh -c <command>`
    Shell(String),
    /// Print text, as `:ls` and `:set all` do.
    Print(String),
}

/// Hands the terminal back to the shell and takes it again.
pub trait Suspend {
    fn suspend(&mut self) -> io::Result<()>;
    fn resume(&mut self) -> io::Result<()>;
}

/// Suspend the UI, run `job` in the foreground, wait for ENTER and resume.
/// The terminal is resumed even when the job fails.
pub fn run_job(
    job: &TerminalJob,
    terminal: &mut dyn Suspend,
    out: &mut dyn Write,
    input: &mut dyn BufRead,
) -> anyhow::Result<()> {
    terminal.suspend()?;
    let result = run_suspended(job, out, input);
    let resumed = terminal.resume();
    result?;
    resumed?;
    Ok(())
}

fn run_suspended(job: &TerminalJob, out: &mut dyn Write, input: &mut dyn BufRead) -> io::Result<()> {
    let status = match job {
        TerminalJob::Run { program, args } => Some(Command::new(program).args(args).status()),
        TerminalJob::Shell(command) => Some(Command::new("sh").arg("-c").arg(command).status()),
        TerminalJob::Print(text) => {
            writeln!(out, "{}", text)?;
            None
        }
    };
    match status {
        Some(Ok(status)) => info!(target: "tools", ?job, code = ?status.code(), "job_finished"),
        Some(Err(err)) => {
            warn!(target: "tools", ?job, %err, "job_failed");
            writeln!(out, "{}", err)?;
        }
        None => {}
    }

    write!(out, "\n{}", PRESS_ENTER)?;
    out.flush()?;
    let mut line = String::new();
    input.read_line(&mut line)?;
    Ok(())
}

/// Write the active buffer and schedule `program <path>` in the terminal.
pub fn save_and_execute(editor: &mut Editor, program: &str) {
    let Some(location) = editor.active_buffer().location.clone() else {
        editor.show_message(NO_FILENAME_MESSAGE);
        return;
    };
    if let Err(err) = editor.write_active_buffer(None, false) {
        editor.show_message(err.to_string());
        return;
    }
    let path = expand_tilde(&location).display().to_string();
    info!(target: "tools", %program, %path, "save_and_execute");
    editor.schedule(TerminalJob::Run {
        program: program.to_string(),
        args: vec![path],
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::BufferSettings;
    use std::fs;
    use std::io::Cursor;

    #[derive(Default)]
    struct RecordingTerminal {
        events: Vec<&'static str>,
    }

    impl Suspend for RecordingTerminal {
        fn suspend(&mut self) -> io::Result<()> {
            self.events.push("suspend");
            Ok(())
        }

        fn resume(&mut self) -> io::Result<()> {
            self.events.push("resume");
            Ok(())
        }
    }

    #[test]
    fn parses_pyflakes_output() {
        let output = "x.py:3:1: 'os' imported but unused\nx.py:10: undefined name 'y'\nnoise\n";
        assert_eq!(
            parse_reports(output),
            vec![
                Report {
                    line: 2,
                    column: Some(0),
                    message: "'os' imported but unused".into()
                },
                Report {
                    line: 9,
                    column: None,
                    message: "undefined name 'y'".into()
                },
            ]
        );
    }

    #[test]
    fn missing_lint_program_yields_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.py");
        fs::write(&path, "import os\n").unwrap();
        let mut buffer = EditorBuffer::open(&path, &crate::io::default_backends(), BufferSettings::default()).unwrap();
        buffer.filetype = Some("python".into());

        let mut linter = Linter::default();
        linter.set(
            "python",
            LintCommand {
                program: "definitely-not-a-lint-program".into(),
                args: vec![],
            },
        );
        assert!(linter.lint(&buffer).is_empty());
        assert_eq!(Linter::default().command_for("python").map(|c| c.program.as_str()), Some("pyflakes"));
    }

    #[test]
    fn print_job_suspends_waits_and_resumes() {
        let mut terminal = RecordingTerminal::default();
        let mut out = Vec::new();
        let mut input = Cursor::new(b"\n".to_vec());
        run_job(
            &TerminalJob::Print("  1 %a  notes.txt".into()),
            &mut terminal,
            &mut out,
            &mut input,
        )
        .unwrap();
        assert_eq!(terminal.events, vec!["suspend", "resume"]);
        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("  1 %a  notes.txt\n"));
        assert!(printed.ends_with(PRESS_ENTER));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_output_still_resumes() {
        let mut terminal = RecordingTerminal::default();
        let mut input = Cursor::new(b"\n".to_vec());
        let result = run_job(
            &TerminalJob::Print("listing".into()),
            &mut terminal,
            &mut BrokenPipe,
            &mut input,
        );
        assert!(result.is_err());
        assert_eq!(terminal.events, vec!["suspend", "resume"]);
    }

    #[test]
    fn shell_job_runs_in_between() {
        let dir = tempfile::tempdir().unwrap();
        let marker = dir.path().join("ran");
        let mut terminal = RecordingTerminal::default();
        let mut out = Vec::new();
        let mut input = Cursor::new(b"\n".to_vec());
        let job = TerminalJob::Shell(format!("touch '{}'", marker.display()));
        run_job(&job, &mut terminal, &mut out, &mut input).unwrap();
        assert!(marker.exists());
        assert_eq!(terminal.events, vec!["suspend", "resume"]);
    }

    #[test]
    fn save_and_execute_without_location_schedules_nothing() {
        let mut editor = Editor::new();
        save_and_execute(&mut editor, "python3");
        assert!(editor.take_jobs().is_empty());
        assert_eq!(editor.message(), Some(NO_FILENAME_MESSAGE));
    }

    #[test]
    fn save_and_execute_writes_before_scheduling() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.py");
        let mut editor = Editor::new();
        editor.open_location(&path, true);
        editor.active_buffer_mut().insert_str("print(1)");
        assert!(editor.take_jobs().is_empty());

        save_and_execute(&mut editor, "python3");

        assert_eq!(fs::read_to_string(&path).unwrap(), "print(1)\n");
        assert!(!editor.active_buffer().has_unsaved_changes());
        assert_eq!(
            editor.take_jobs(),
            vec![TerminalJob::Run {
                program: "python3".into(),
                args: vec![path.display().to_string()],
            }]
        );
    }

    #[test]
    fn failed_write_aborts_save_and_execute() {
        let dir = tempfile::tempdir().unwrap();
        let mut editor = Editor::new();
        editor.open_location(dir.path(), true);
        save_and_execute(&mut editor, "python3");
        assert!(editor.take_jobs().is_empty());
        assert!(editor.message().is_some());
    }
}
