//! Presentation surface - the UI side of the bridge.
//!
//! A surface runs its own blocking loop ([`PresentationSurface::start`]) on
//! the presentation thread. Other threads reach it only through a
//! [`SurfaceHandle`]:
//!
//! ```text
//! remote-event loop ──schedule_screen_update(work)──┐
//! remote-event loop ──quit()────────────────────────┼─► SurfaceInbox ─► start() loop
//!                                                   │   (FIFO, one queue)
//! ```
//!
//! Work and quit share one FIFO queue, so every batch scheduled before
//! `quit` is applied before the loop stops.
//!
//! # Modules
//!
//! - [`events`] - Tagged redraw events understood by [`TerminalSurface`]
//! - [`grid`] - Character grid model
//! - [`guard`] - Terminal state RAII guard
//! - [`keys`] - Key event → editor key notation
//! - [`terminal`] - ratatui/crossterm surface
//! - [`widget`] - Grid → ratatui buffer

// Rust guideline compliant 2026-02

pub mod events;
pub mod grid;
pub mod guard;
pub mod keys;
pub mod terminal;
pub mod widget;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

use crate::bridge::BridgeHandle;
use crate::error::BridgeError;

#[doc(inline)]
pub use events::RedrawEvent;
#[doc(inline)]
pub use grid::Grid;
#[doc(inline)]
pub use guard::TerminalGuard;
#[doc(inline)]
pub use terminal::TerminalSurface;

/// A UI that can be driven by the bridge.
///
/// `Send + 'static` because the bridge moves the surface onto the
/// presentation thread before calling [`start`](Self::start).
pub trait PresentationSurface: Send + Sized + 'static {
    /// Handle for scheduling work and requesting quit from other threads.
    fn handle(&self) -> SurfaceHandle<Self>;

    /// Run the UI loop until quit is requested or the UI decides to stop.
    ///
    /// `bridge` is the forwarding target for user input, resizes and
    /// disconnect requests.
    fn start(&mut self, bridge: BridgeHandle) -> Result<(), BridgeError>;

    /// Apply one update of kind `name` with one argument tuple.
    ///
    /// Unknown kinds must fail with [`BridgeError::UnsupportedUpdate`].
    fn apply_update(&mut self, name: &str, args: &[Value]) -> Result<(), BridgeError>;

    /// Finalize a batch: bring the cursor back to its editor position.
    fn cursor_refresh(&mut self) -> Result<(), BridgeError>;
}

/// Work executed on the surface's own thread.
pub type ScreenWork<S> = Box<dyn FnOnce(&mut S) -> Result<(), BridgeError> + Send>;

/// Items in a surface's inbox.
pub enum SurfaceMessage<S> {
    /// Run this work item.
    Work(ScreenWork<S>),
    /// Stop the surface loop.
    Quit,
}

impl<S> std::fmt::Debug for SurfaceMessage<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Work(_) => f.write_str("Work(..)"),
            Self::Quit => f.write_str("Quit"),
        }
    }
}

/// Cross-thread handle to a surface.
pub struct SurfaceHandle<S> {
    tx: mpsc::UnboundedSender<SurfaceMessage<S>>,
}

impl<S> Clone for SurfaceHandle<S> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<S> std::fmt::Debug for SurfaceHandle<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceHandle")
            .field("closed", &self.tx.is_closed())
            .finish()
    }
}

impl<S> SurfaceHandle<S> {
    /// Enqueue `work` for execution on the surface's thread.
    ///
    /// Returns `false` if the surface loop is gone; the work is dropped.
    pub fn schedule_screen_update(&self, work: ScreenWork<S>) -> bool {
        if self.tx.send(SurfaceMessage::Work(work)).is_ok() {
            true
        } else {
            log::debug!("Surface inbox closed, dropping screen update");
            false
        }
    }

    /// Ask the surface loop to stop after the work already queued.
    pub fn quit(&self) {
        if self.tx.send(SurfaceMessage::Quit).is_err() {
            log::debug!("Surface inbox closed, quit not delivered");
        }
    }
}

/// Receiving side of a surface's queue, drained by the surface loop.
pub struct SurfaceInbox<S> {
    rx: mpsc::UnboundedReceiver<SurfaceMessage<S>>,
}

impl<S> std::fmt::Debug for SurfaceInbox<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SurfaceInbox")
            .field("queued", &self.rx.len())
            .finish()
    }
}

impl<S> SurfaceInbox<S> {
    /// Next queued message without blocking.
    ///
    /// A closed and drained queue reads as [`SurfaceMessage::Quit`]: nobody
    /// can schedule work any more.
    pub fn try_next(&mut self) -> Option<SurfaceMessage<S>> {
        match self.rx.try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(SurfaceMessage::Quit),
        }
    }

    /// Block until the next message. Same closed-queue rule as [`try_next`](Self::try_next).
    pub fn next_blocking(&mut self) -> SurfaceMessage<S> {
        self.rx.blocking_recv().unwrap_or(SurfaceMessage::Quit)
    }
}

/// Create a surface queue.
pub fn inbox<S>() -> (SurfaceHandle<S>, SurfaceInbox<S>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SurfaceHandle { tx }, SurfaceInbox { rx })
}
