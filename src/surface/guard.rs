//! Terminal state guard for RAII cleanup.
//!
//! [`TerminalGuard::enter`] puts the terminal into the state the surface
//! needs (raw mode, alternate screen); dropping the guard restores it, even
//! when the presentation thread panics or the editor dies mid-session.

use std::io;

use crossterm::{
    cursor, execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};

/// Restores the terminal on drop.
///
/// When dropped, this guard:
/// - Disables raw mode
/// - Leaves the alternate screen
/// - Shows the cursor
#[derive(Debug)]
pub struct TerminalGuard {
    _private: (),
}

impl TerminalGuard {
    /// Enable raw mode and switch to the alternate screen.
    ///
    /// If switching screens fails, raw mode is turned back off before the
    /// error is returned.
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let guard = Self { _private: () };
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(guard)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Best effort; nothing useful to do with errors here.
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
    }
}

/// Restore the terminal without a guard, for use from the panic hook.
pub fn restore_terminal() {
    let _ = disable_raw_mode();
    let _ = execute!(io::stdout(), LeaveAlternateScreen, cursor::Show);
}
