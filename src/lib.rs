//! Editor Bridge - drive an embedded editor from a terminal UI.
//!
//! This crate keeps a remote editor session and a presentation surface in
//! sync: screen updates flow from the editor to the UI, user input and
//! resizes flow back.
//!
//! # Architecture
//!
//! Two loops on two threads, joined by queues:
//!
//! - **Remote-event loop** - runs on the caller's thread inside
//!   [`UiBridge::connect`], dispatching editor requests and notifications
//! - **Presentation loop** - runs on a dedicated thread, applying redraw
//!   batches and forwarding input through a [`BridgeHandle`]
//!
//! # Modules
//!
//! - [`bridge`] - The synchronization bridge and update batches
//! - [`session`] - Remote session contract, wire protocol, child-process session
//! - [`surface`] - Presentation surface contract and the ratatui surface
//! - [`profiling`] - Scoped presentation-loop profiler
//! - [`config`] - Configuration loading/saving

pub mod bridge;
pub mod config;
pub mod constants;
pub mod error;
pub mod profiling;
pub mod session;
pub mod surface;

// Re-export commonly used types
pub use bridge::{BridgeHandle, UiBridge, UpdateBatch};
pub use config::Config;
pub use error::{BridgeError, ConnectError};
pub use profiling::{ProfileMetric, ProfileReport};
pub use session::child::ChildSession;
pub use session::{EditorControl, RemoteSession, SessionCaller, SessionHandler, WireFormat};
pub use surface::{PresentationSurface, SurfaceHandle, TerminalSurface};
