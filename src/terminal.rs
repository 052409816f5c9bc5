use std::io::{self, Stdout};

use crossterm::cursor::Show;
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen,
};
use tracing::debug;

use crate::tools::Suspend;

/// Raw mode plus the alternate screen for as long as the session lives.
pub struct TerminalSession {
    stdout: Stdout,
    active: bool,
}

impl TerminalSession {
    pub fn enter() -> io::Result<Self> {
        let mut session = Self {
            stdout: io::stdout(),
            active: false,
        };
        session.resume()?;
        Ok(session)
    }

    pub fn stdout(&mut self) -> &mut Stdout {
        &mut self.stdout
    }
}

impl Suspend for TerminalSession {
    fn suspend(&mut self) -> io::Result<()> {
        if self.active {
            execute!(self.stdout, Show, LeaveAlternateScreen)?;
            disable_raw_mode()?;
            self.active = false;
            debug!(target: "terminal", "suspended");
        }
        Ok(())
    }

    fn resume(&mut self) -> io::Result<()> {
        if !self.active {
            enable_raw_mode()?;
            execute!(self.stdout, EnterAlternateScreen, Clear(ClearType::All))?;
            self.active = true;
            debug!(target: "terminal", "resumed");
        }
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.suspend();
    }
}

/// Best-effort restore when the session cannot be reached, e.g. from a panic hook.
pub fn restore() {
    let _ = execute!(io::stdout(), Show, LeaveAlternateScreen);
    let _ = disable_raw_mode();
}
