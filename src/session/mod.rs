//! Remote session - the connection to the editor process.
//!
//! A session exposes three things to the bridge:
//!
//! - [`RemoteSession::run`] - a blocking run-loop that feeds a
//!   [`SessionHandler`] with setup, request and notification callbacks.
//! - [`SessionCaller`] - a cloneable, `Send` handle for queueing calls onto
//!   the run-loop's thread from anywhere ("threadsafe call").
//! - [`EditorControl`] - the editor operations those queued calls (and the
//!   setup callback) may perform.
//!
//! # Event Queue
//!
//! ```text
//! SessionCaller::threadsafe_call ──┐
//! reader thread (decoded Message) ─┼─► SessionEvents ─► run-loop thread
//! reader thread (EOF → Closed) ────┘
//! ```
//!
//! The queue is unbounded and exists from the moment the session is created,
//! so calls submitted before the run-loop starts are buffered and executed
//! in submission order once it does.

// Rust guideline compliant 2026-02

pub mod child;
pub mod protocol;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::BridgeError;

#[doc(inline)]
pub use child::ChildSession;
#[doc(inline)]
pub use protocol::{Message, WireFormat};

/// Editor operations available on the run-loop's thread.
///
/// None of these wait for the editor's reply.
pub trait EditorControl {
    /// Ask the editor to exit.
    fn quit(&mut self) -> Result<(), BridgeError>;

    /// Send keys, in the editor's key notation (e.g. `"i"`, `"<Esc>"`).
    fn input(&mut self, keys: &str) -> Result<(), BridgeError>;

    /// Request a new grid size. The editor may pick a different one.
    fn ui_try_resize(&mut self, columns: u16, rows: u16) -> Result<(), BridgeError>;

    /// Register this process as a UI with the given grid size.
    fn ui_attach(&mut self, columns: u16, rows: u16) -> Result<(), BridgeError>;
}

/// Callbacks invoked by [`RemoteSession::run`], always on the run-loop's thread.
pub trait SessionHandler {
    /// Called exactly once, before any request or notification.
    fn on_setup(&mut self, editor: &mut dyn EditorControl) -> Result<(), BridgeError>;

    /// Called for requests that expect a reply. An error ends the run-loop
    /// and is returned from [`RemoteSession::run`].
    fn on_request(&mut self, method: &str, args: Vec<Value>) -> Result<Value, BridgeError>;

    /// Called for each notification. An error ends the run-loop.
    fn on_notification(&mut self, method: &str, args: Vec<Value>) -> Result<(), BridgeError>;
}

/// A connection to the editor.
pub trait RemoteSession {
    /// Handle for submitting calls onto the run-loop from any thread.
    fn caller(&self) -> SessionCaller;

    /// Run the message loop until the editor goes away.
    ///
    /// May be called once per session; a second call fails with
    /// [`BridgeError::AlreadyRunning`].
    fn run(&mut self, handler: &mut dyn SessionHandler) -> Result<(), BridgeError>;
}

/// A call queued for execution on the run-loop's thread.
pub type SessionCall = Box<dyn FnOnce(&mut dyn EditorControl) -> Result<(), BridgeError> + Send>;

/// Items consumed by a session's run-loop.
pub enum SessionEvent {
    /// A call submitted through [`SessionCaller::threadsafe_call`].
    Call(SessionCall),
    /// A message decoded from the editor.
    Message(Message),
    /// The editor's output stream ended.
    Closed,
}

impl std::fmt::Debug for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call(_) => f.write_str("Call(..)"),
            Self::Message(msg) => f.debug_tuple("Message").field(msg).finish(),
            Self::Closed => f.write_str("Closed"),
        }
    }
}

/// Thread-safe submission handle for a session's run-loop.
#[derive(Debug, Clone)]
pub struct SessionCaller {
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl SessionCaller {
    /// Queue `call` for execution on the run-loop's thread.
    ///
    /// Never blocks. Calls from one thread run in the order submitted.
    /// Fails only once the session (and its queue) has been dropped.
    pub fn threadsafe_call<F>(&self, call: F) -> Result<(), BridgeError>
    where
        F: FnOnce(&mut dyn EditorControl) -> Result<(), BridgeError> + Send + 'static,
    {
        self.deliver(SessionEvent::Call(Box::new(call)))
    }

    /// Push a raw event into the queue (reader threads, tests).
    pub fn deliver(&self, event: SessionEvent) -> Result<(), BridgeError> {
        self.tx.send(event).map_err(|e| {
            log::debug!("Session queue closed, dropping {:?}", e.0);
            BridgeError::SessionClosed
        })
    }
}

/// Receiving end of a session's event queue, owned by the run-loop.
#[derive(Debug)]
pub struct SessionEvents {
    rx: mpsc::UnboundedReceiver<SessionEvent>,
}

impl SessionEvents {
    /// Block until the next event.
    ///
    /// Returns `None` once every [`SessionCaller`] is gone and the queue is
    /// drained. Must not be called from inside an async runtime.
    pub fn next_blocking(&mut self) -> Option<SessionEvent> {
        self.rx.blocking_recv()
    }
}

/// Create a session event queue.
pub fn event_queue() -> (SessionCaller, SessionEvents) {
    let (tx, rx) = mpsc::unbounded_channel();
    (SessionCaller { tx }, SessionEvents { rx })
}
