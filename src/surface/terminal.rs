//! ratatui/crossterm presentation surface.
//!
//! # Event loop
//!
//! ```text
//! loop {
//!     drain SurfaceInbox      → redraw batches mutate the Grid, Quit stops
//!     render (if dirty)       → GridWidget + cursor position
//!     check shutdown flag     → one BridgeHandle::disconnect
//!     poll crossterm input    → send_input / send_resize
//! }
//! ```
//!
//! Headless surfaces (tests, or a future detached mode) skip input polling
//! and sleep for the same interval instead, so the loop behaves identically
//! on a `TestBackend`.

// Rust guideline compliant 2026-02

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossterm::event::{self, Event};
use ratatui::backend::Backend;
use ratatui::layout::Position;
use ratatui::Terminal;
use serde_json::Value;

use super::events::RedrawEvent;
use super::grid::Grid;
use super::keys::key_to_notation;
use super::widget::{DefaultColors, GridWidget};
use super::{inbox, PresentationSurface, SurfaceHandle, SurfaceInbox, SurfaceMessage};
use crate::bridge::BridgeHandle;
use crate::constants::INPUT_POLL_INTERVAL;
use crate::error::BridgeError;
use crate::profiling;

/// Where user input comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputMode {
    /// Read crossterm events from the controlling terminal.
    Terminal,
    /// No input; the loop only applies updates and renders.
    Headless,
}

/// Presentation surface drawing the editor grid with ratatui.
pub struct TerminalSurface<B: Backend> {
    terminal: Terminal<B>,
    grid: Grid,
    inbox: SurfaceInbox<Self>,
    handle: SurfaceHandle<Self>,
    input: InputMode,
    shutdown: Option<Arc<AtomicBool>>,
    defaults: DefaultColors,
    /// Cursor as of the last `cursor_refresh`; `None` while hidden.
    cursor: Option<(u16, u16)>,
    title: Option<String>,
    mode: String,
    busy: bool,
    mouse: bool,
    dirty: bool,
    frames: u64,
}

impl<B: Backend> std::fmt::Debug for TerminalSurface<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalSurface")
            .field("grid_size", &self.grid.size())
            .field("input", &self.input)
            .field("cursor", &self.cursor)
            .field("mode", &self.mode)
            .field("busy", &self.busy)
            .field("frames", &self.frames)
            .finish_non_exhaustive()
    }
}

impl<B> TerminalSurface<B>
where
    B: Backend,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    /// Create a surface that reads input from the controlling terminal.
    ///
    /// The grid starts empty; the editor's first `resize` update sizes it.
    pub fn new(terminal: Terminal<B>) -> Self {
        let (handle, inbox) = inbox();
        Self {
            terminal,
            grid: Grid::new(0, 0),
            inbox,
            handle,
            input: InputMode::Terminal,
            shutdown: None,
            defaults: DefaultColors::default(),
            cursor: None,
            title: None,
            mode: String::new(),
            busy: false,
            mouse: false,
            dirty: true,
            frames: 0,
        }
    }

    /// Create a surface that never reads terminal input.
    pub fn headless(terminal: Terminal<B>) -> Self {
        Self {
            input: InputMode::Headless,
            ..Self::new(terminal)
        }
    }

    /// Disconnect once `flag` becomes true (e.g. set by a signal handler).
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }

    /// The editor grid as last updated.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Rendered cursor position `(row, col)`, `None` while hidden.
    pub fn cursor(&self) -> Option<(u16, u16)> {
        self.cursor
    }

    /// Title set by the editor.
    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Editor mode name from the last `mode_change`.
    pub fn mode(&self) -> &str {
        &self.mode
    }

    /// Whether the editor asked for mouse events.
    pub fn mouse_enabled(&self) -> bool {
        self.mouse
    }

    /// Whether applied updates are waiting to be drawn.
    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    /// Frames drawn so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The ratatui backend (for inspecting a `TestBackend`).
    pub fn backend(&self) -> &B {
        self.terminal.backend()
    }

    /// Run queued work. Returns `true` once quit was requested.
    fn drain_inbox(&mut self) -> Result<bool, BridgeError> {
        while let Some(message) = self.inbox.try_next() {
            match message {
                SurfaceMessage::Work(work) => work(self)?,
                SurfaceMessage::Quit => return Ok(true),
            }
        }
        Ok(false)
    }

    fn render(&mut self) -> Result<(), BridgeError> {
        let grid = &self.grid;
        let defaults = self.defaults;
        let cursor = self.cursor;
        self.terminal
            .draw(|frame| {
                frame.render_widget(GridWidget::new(grid).defaults(defaults), frame.area());
                if let Some((row, col)) = cursor {
                    frame.set_cursor_position(Position { x: col, y: row });
                }
            })
            .map_err(|e| BridgeError::PresentationFailed(e.to_string()))?;
        self.frames += 1;
        self.dirty = false;
        Ok(())
    }

    fn poll_input(&mut self, bridge: &BridgeHandle) -> Result<(), BridgeError> {
        if self.input == InputMode::Headless {
            thread::sleep(INPUT_POLL_INTERVAL);
            return Ok(());
        }
        if !event::poll(INPUT_POLL_INTERVAL)? {
            return Ok(());
        }
        match event::read()? {
            Event::Key(key) => {
                if let Some(keys) = key_to_notation(&key) {
                    bridge.send_input(keys);
                }
            }
            Event::Paste(text) => bridge.send_input(text.replace('<', "<lt>")),
            Event::Resize(columns, rows) => {
                log::debug!("Terminal resized to {columns}x{rows}");
                bridge.send_resize(columns, rows);
            }
            _ => {}
        }
        Ok(())
    }

    fn apply_event(&mut self, event: RedrawEvent) {
        match event {
            RedrawEvent::Resize { columns, rows } => self.grid.resize(columns, rows),
            RedrawEvent::Clear => self.grid.clear(),
            RedrawEvent::EolClear => self.grid.eol_clear(),
            RedrawEvent::CursorGoto { row, col } => self.grid.cursor_goto(row, col),
            RedrawEvent::Put { text } => self.grid.put(&text),
            RedrawEvent::HighlightSet(highlight) => self.grid.set_highlight(highlight),
            RedrawEvent::SetScrollRegion {
                top,
                bottom,
                left,
                right,
            } => self.grid.set_scroll_region(top, bottom, left, right),
            RedrawEvent::Scroll { count } => self.grid.scroll(count),
            RedrawEvent::UpdateFg(color) => self.defaults.foreground = color,
            RedrawEvent::UpdateBg(color) => self.defaults.background = color,
            RedrawEvent::UpdateSp(color) => self.defaults.special = color,
            RedrawEvent::ModeChange { mode } => self.mode = mode,
            RedrawEvent::BusyStart => self.busy = true,
            RedrawEvent::BusyStop => self.busy = false,
            RedrawEvent::MouseOn => self.mouse = true,
            RedrawEvent::MouseOff => self.mouse = false,
            RedrawEvent::Bell | RedrawEvent::VisualBell => log::debug!("Editor bell"),
            RedrawEvent::SetTitle(title) => self.set_title(title),
            RedrawEvent::SetIcon(_) | RedrawEvent::Flush | RedrawEvent::Informational => {}
        }
    }

    fn set_title(&mut self, title: String) {
        if self.input == InputMode::Terminal {
            if let Err(e) = crossterm::execute!(
                std::io::stdout(),
                crossterm::terminal::SetTitle(title.as_str())
            ) {
                log::debug!("Failed to set terminal title: {e}");
            }
        }
        self.title = Some(title);
    }
}

impl<B> PresentationSurface for TerminalSurface<B>
where
    B: Backend + Send + 'static,
    B::Error: std::error::Error + Send + Sync + 'static,
{
    fn handle(&self) -> SurfaceHandle<Self> {
        self.handle.clone()
    }

    fn start(&mut self, bridge: BridgeHandle) -> Result<(), BridgeError> {
        log::info!("Terminal surface loop starting ({:?} input)", self.input);
        let mut shutdown_forwarded = false;

        if self.input == InputMode::Terminal {
            let size = self
                .terminal
                .size()
                .map_err(|e| BridgeError::PresentationFailed(e.to_string()))?;
            bridge.send_resize(size.width, size.height);
        }

        loop {
            if self.drain_inbox()? {
                break;
            }
            if self.dirty {
                profiling::scope("render", || self.render())?;
            }
            if !shutdown_forwarded
                && self
                    .shutdown
                    .as_ref()
                    .is_some_and(|flag| flag.load(Ordering::SeqCst))
            {
                log::info!("Shutdown requested, disconnecting editor");
                bridge.disconnect();
                shutdown_forwarded = true;
            }
            profiling::scope("poll_input", || self.poll_input(&bridge))?;
        }

        log::info!("Terminal surface loop exiting after {} frames", self.frames);
        Ok(())
    }

    fn apply_update(&mut self, name: &str, args: &[Value]) -> Result<(), BridgeError> {
        let event = RedrawEvent::decode(name, args)?;
        self.apply_event(event);
        self.dirty = true;
        Ok(())
    }

    fn cursor_refresh(&mut self) -> Result<(), BridgeError> {
        self.cursor = (!self.busy).then(|| self.grid.cursor());
        self.dirty = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use serde_json::json;

    fn surface() -> TerminalSurface<TestBackend> {
        TerminalSurface::headless(Terminal::new(TestBackend::new(8, 3)).unwrap())
    }

    #[test]
    fn test_updates_mutate_grid() {
        let mut surface = surface();
        surface.apply_update("resize", &[json!(8), json!(3)]).unwrap();
        surface.apply_update("cursor_goto", &[json!(1), json!(2)]).unwrap();
        surface.apply_update("put", &[json!("o")]).unwrap();
        surface.apply_update("put", &[json!("k")]).unwrap();
        assert_eq!(surface.grid().row_text(1), "  ok    ");
    }

    #[test]
    fn test_cursor_refresh_snapshots_position() {
        let mut surface = surface();
        surface.apply_update("resize", &[json!(8), json!(3)]).unwrap();
        surface.apply_update("cursor_goto", &[json!(2), json!(5)]).unwrap();
        assert_eq!(surface.cursor(), None);
        surface.cursor_refresh().unwrap();
        assert_eq!(surface.cursor(), Some((2, 5)));
    }

    #[test]
    fn test_busy_hides_cursor() {
        let mut surface = surface();
        surface.apply_update("resize", &[json!(8), json!(3)]).unwrap();
        surface.apply_update("busy_start", &[]).unwrap();
        surface.cursor_refresh().unwrap();
        assert_eq!(surface.cursor(), None);
        surface.apply_update("busy_stop", &[]).unwrap();
        surface.cursor_refresh().unwrap();
        assert_eq!(surface.cursor(), Some((0, 0)));
    }

    #[test]
    fn test_unknown_update_is_an_error() {
        let mut surface = surface();
        let result = surface.apply_update("win_float_pos", &[]);
        assert!(matches!(result, Err(BridgeError::UnsupportedUpdate { .. })));
    }

    #[test]
    fn test_title_mode_and_mouse_are_tracked() {
        let mut surface = surface();
        surface.apply_update("set_title", &[json!("notes.txt")]).unwrap();
        surface.apply_update("mode_change", &[json!("insert")]).unwrap();
        surface.apply_update("mouse_on", &[]).unwrap();
        assert_eq!(surface.title(), Some("notes.txt"));
        assert_eq!(surface.mode(), "insert");
        assert!(surface.mouse_enabled());
    }
}
