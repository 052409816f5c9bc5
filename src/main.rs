use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Once;
use std::time::{Duration, Instant};

use anyhow::Result;
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod buffer;
mod command;
mod commands;
mod completion;
mod config;
mod editor;
mod error;
mod filetype;
mod graphemes;
mod history;
mod input;
mod io;
mod keymap;
mod renderer;
mod search;
mod settings;
mod syntax;
mod terminal;
mod theme;
mod tools;
mod window;

use crate::config::{run_rc_file, RcSource};
use crate::editor::{Editor, InitialLayout};
use crate::keymap::Key;
use crate::terminal::TerminalSession;

const POLL_INTERVAL: Duration = Duration::from_millis(250);
/// Keys waiting for a longer binding resolve after this much idle time.
const PENDING_TIMEOUT: Duration = Duration::from_secs(1);

/// A terminal text editor with Vi key bindings.
#[derive(Parser, Debug)]
#[command(name = "vireo", version, about)]
struct Args {
    /// Files to open.
    files: Vec<PathBuf>,
    /// Open one tab page per file.
    #[arg(short = 'p', conflicts_with_all = ["horizontal", "vertical"])]
    tabs: bool,
    /// Open the files in horizontal splits.
    #[arg(short = 'o', conflicts_with = "vertical")]
    horizontal: bool,
    /// Open the files in vertical splits.
    #[arg(short = 'O')]
    vertical: bool,
    /// Configuration file to use instead of the default; NONE skips it.
    #[arg(short = 'u', value_name = "RCFILE")]
    rc: Option<String>,
    /// Log file; defaults to vireo.log in the data directory.
    #[arg(long, value_name = "FILE")]
    log: Option<PathBuf>,
}

impl Args {
    fn layout(&self) -> InitialLayout {
        if self.tabs {
            InitialLayout::Tabs
        } else if self.horizontal {
            InitialLayout::HorizontalSplits
        } else if self.vertical {
            InitialLayout::VerticalSplits
        } else {
            InitialLayout::Buffers
        }
    }
}

fn data_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("vireo"))
}

/// Logs go to a file because the terminal belongs to the editor.
fn configure_logging(path: Option<&Path>) -> Option<WorkerGuard> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => data_dir()?.join("vireo.log"),
    };
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or(Path::new("."));
    let name = path.file_name()?;
    fs::create_dir_all(dir).ok()?;

    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;
    Some(guard)
}

fn install_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        let default_panic = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            terminal::restore();
            error!(target: "editor", ?info, "panic");
            default_panic(info);
        }));
    });
}

fn main() -> Result<()> {
    let args = Args::parse();
    let log_guard = configure_logging(args.log.as_deref());
    install_panic_hook();
    info!(target: "editor", files = args.files.len(), "startup");

    let mut editor = Editor::new();
    if let Some(dir) = data_dir() {
        editor.load_history(&dir);
    }
    run_rc_file(&mut editor, &RcSource::from_arg(args.rc.as_deref()));
    editor.load_initial_files(&args.files, args.layout());

    let code = run(&mut editor)?;
    info!(target: "editor", code, "shutdown");
    drop(log_guard);
    std::process::exit(code);
}

/// The event loop. Returns the exit code once a command asks to quit.
fn run(editor: &mut Editor) -> Result<i32> {
    let mut session = TerminalSession::enter()?;
    let stdin = std::io::stdin();
    let mut last_key = Instant::now();
    let mut dirty = true;

    loop {
        if dirty {
            renderer::render(session.stdout(), editor, crossterm::terminal::size()?)?;
            dirty = false;
        }
        if let Some(code) = editor.exit_code() {
            return Ok(code);
        }

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    editor.handle_key(Key::from(key));
                    last_key = Instant::now();
                    dirty = true;
                }
                Event::Resize(..) => dirty = true,
                _ => {}
            }
        } else if last_key.elapsed() >= PENDING_TIMEOUT && !editor.pending_keys().is_empty() {
            editor.flush_pending_keys();
            dirty = true;
        }

        for job in editor.take_jobs() {
            let mut out = std::io::stdout();
            if let Err(err) = tools::run_job(&job, &mut session, &mut out, &mut stdin.lock()) {
                error!(target: "tools", ?job, %err, "job_error");
                editor.show_message(err.to_string());
            }
            dirty = true;
        }
    }
}
