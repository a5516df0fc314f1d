//! Error taxonomy for the bridge and its collaborators.
//!
//! Errors are never retried. The bridge only needs to tell apart the
//! failures that end a connection:
//!
//! - [`BridgeError::UnimplementedCapability`] - the editor sent a request the
//!   UI cannot answer. Ends the remote run-loop.
//! - [`BridgeError::UnsupportedUpdate`] - a redraw batch named an update kind
//!   the surface has no handler for. A contract mismatch, never recovered.
//! - [`BridgeError::PresentationFailed`] / [`BridgeError::PresentationPanicked`] -
//!   the presentation loop stopped abnormally.

// Rust guideline compliant 2026-02

use std::fmt;
use std::io;

use crate::profiling::ProfileReport;

/// Errors that end (or refuse to start) a bridge connection.
#[derive(Debug)]
pub enum BridgeError {
    /// The editor issued a request the UI does not implement.
    UnimplementedCapability {
        /// Request method name.
        method: String,
    },
    /// A redraw batch referenced an update kind the surface cannot apply.
    UnsupportedUpdate {
        /// Update name as sent by the editor.
        name: String,
    },
    /// An update was recognized but its arguments had the wrong shape.
    MalformedUpdate(String),
    /// The RPC stream carried something that is not a valid message.
    Protocol(String),
    /// I/O failure talking to the editor process or the terminal.
    Io(io::Error),
    /// The session's run-loop is gone; queued calls can no longer run.
    SessionClosed,
    /// `run` was called on a session that already ran.
    AlreadyRunning,
    /// The presentation loop returned an error.
    PresentationFailed(String),
    /// The presentation thread panicked.
    PresentationPanicked(String),
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnimplementedCapability { method } => {
                write!(f, "Not implemented: editor request '{method}'")
            }
            Self::UnsupportedUpdate { name } => {
                write!(f, "Surface has no handler for update '{name}'")
            }
            Self::MalformedUpdate(msg) => write!(f, "Malformed update: {msg}"),
            Self::Protocol(msg) => write!(f, "Protocol error: {msg}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::SessionClosed => write!(f, "Session closed"),
            Self::AlreadyRunning => write!(f, "Session run-loop already started"),
            Self::PresentationFailed(msg) => write!(f, "Presentation loop failed: {msg}"),
            Self::PresentationPanicked(msg) => write!(f, "Presentation thread panicked: {msg}"),
        }
    }
}

impl std::error::Error for BridgeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for BridgeError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

/// A failed [`UiBridge::connect`](crate::UiBridge::connect).
///
/// Carries the profiling report so it is not lost when either loop fails.
#[derive(Debug)]
pub struct ConnectError {
    /// Remote-loop error, or the presentation error if the remote loop ended cleanly.
    pub error: BridgeError,
    /// Report of the presentation loop, when profiling was requested.
    pub report: Option<ProfileReport>,
}

impl fmt::Display for ConnectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.error, f)
    }
}

impl std::error::Error for ConnectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unimplemented_capability_names_method() {
        let err = BridgeError::UnimplementedCapability {
            method: "vim_get_clipboard".to_string(),
        };
        assert!(err.to_string().contains("vim_get_clipboard"));
    }

    #[test]
    fn test_io_error_keeps_source() {
        use std::error::Error;

        let err = BridgeError::from(io::Error::new(io::ErrorKind::BrokenPipe, "pipe"));
        assert!(err.source().is_some());
        assert!(BridgeError::SessionClosed.source().is_none());
    }

    #[test]
    fn test_connect_error_displays_inner_error() {
        use std::error::Error;

        let err = ConnectError {
            error: BridgeError::SessionClosed,
            report: None,
        };
        assert_eq!(err.to_string(), "Session closed");
        assert!(err.source().is_some());
    }
}
