//! Thread-safe forwarding handle.

use crate::session::SessionCaller;

/// Forwarding target handed to the surface.
///
/// Every method queues a call onto the remote-event loop's thread and
/// returns immediately. Calls made before the run-loop starts are buffered
/// and run once it does; calls made after it ended are dropped.
#[derive(Debug, Clone)]
pub struct BridgeHandle {
    caller: SessionCaller,
}

impl BridgeHandle {
    /// Wrap a session's call-submission handle.
    pub fn new(caller: SessionCaller) -> Self {
        Self { caller }
    }

    /// Ask the editor to exit, which ends the connection.
    pub fn disconnect(&self) {
        log::debug!("Forwarding disconnect");
        let _ = self.caller.threadsafe_call(|editor| editor.quit());
    }

    /// Send keys (editor key notation) to the editor.
    pub fn send_input(&self, keys: impl Into<String>) {
        let keys = keys.into();
        let _ = self.caller.threadsafe_call(move |editor| editor.input(&keys));
    }

    /// Ask the editor to resize its grid.
    pub fn send_resize(&self, columns: u16, rows: u16) {
        log::debug!("Forwarding resize {columns}x{rows}");
        let _ = self
            .caller
            .threadsafe_call(move |editor| editor.ui_try_resize(columns, rows));
    }
}
