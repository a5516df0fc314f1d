//! Session backed by an embedded editor child process.
//!
//! The editor is launched with piped stdio and spoken to in one
//! [`WireFormat`]. Two helper threads feed the session's event queue and
//! the log:
//!
//! ```text
//! editor stdout ─► editor-reader thread ─► SessionEvent::Message / Closed
//! editor stderr ─► editor-stderr thread ─► log::warn!
//! editor stdin  ◄─ run-loop thread (requests, responses)
//! ```
//!
//! Only the run-loop thread writes to the editor, so no lock guards stdin.

// Rust guideline compliant 2026-02

use std::collections::HashMap;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};

use serde_json::{json, Value};

use super::protocol::{Message, WireFormat};
use super::{
    event_queue, EditorControl, RemoteSession, SessionCaller, SessionEvent, SessionEvents,
    SessionHandler,
};
use crate::constants;
use crate::error::BridgeError;

/// Editor RPC methods used by [`EditorControl`].
mod method {
    pub const COMMAND: &str = "nvim_command";
    pub const INPUT: &str = "nvim_input";
    pub const UI_TRY_RESIZE: &str = "nvim_ui_try_resize";
    pub const UI_ATTACH: &str = "nvim_ui_attach";
}

/// A running editor process speaking RPC on stdio.
pub struct ChildSession {
    child: Child,
    stdin: BufWriter<ChildStdin>,
    wire: WireFormat,
    caller: SessionCaller,
    /// Taken by the first `run`.
    events: Option<SessionEvents>,
    next_request_id: u64,
    /// In-flight requests (id → method), for error reporting.
    pending: HashMap<u64, &'static str>,
}

impl std::fmt::Debug for ChildSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChildSession")
            .field("pid", &self.child.id())
            .field("wire", &self.wire)
            .field("running", &self.events.is_none())
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

impl ChildSession {
    /// Launch `argv[0]` with the remaining arguments and start the reader threads.
    pub fn spawn(argv: &[String], wire: WireFormat) -> Result<Self, BridgeError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            BridgeError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty editor command",
            ))
        })?;

        log::info!("Launching editor ({wire}): {}", argv.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| missing_pipe("stdin"))?;
        let stdout = child.stdout.take().ok_or_else(|| missing_pipe("stdout"))?;
        let stderr = child.stderr.take().ok_or_else(|| missing_pipe("stderr"))?;

        let (caller, events) = event_queue();

        let reader_caller = caller.clone();
        std::thread::Builder::new()
            .name(constants::READER_THREAD_NAME.to_owned())
            .spawn(move || forward_messages(BufReader::new(stdout), wire, &reader_caller))?;

        std::thread::Builder::new()
            .name(constants::STDERR_THREAD_NAME.to_owned())
            .spawn(move || {
                for line in BufReader::new(stderr).lines().map_while(Result::ok) {
                    log::warn!("[editor] {line}");
                }
            })?;

        Ok(Self {
            child,
            stdin: BufWriter::new(stdin),
            wire,
            caller,
            events: Some(events),
            next_request_id: 0,
            pending: HashMap::new(),
        })
    }

    /// Editor process id.
    pub fn pid(&self) -> u32 {
        self.child.id()
    }

    fn write(&mut self, message: &Message) -> Result<(), BridgeError> {
        let bytes = self.wire.encode(message)?;
        self.stdin.write_all(&bytes)?;
        self.stdin.flush()?;
        Ok(())
    }

    /// Send a request without waiting for its response.
    fn request(&mut self, method: &'static str, params: Vec<Value>) -> Result<(), BridgeError> {
        let id = self.next_request_id;
        self.next_request_id += 1;
        self.write(&Message::Request {
            id,
            method: method.to_string(),
            params,
        })?;
        self.pending.insert(id, method);
        Ok(())
    }

    fn dispatch(
        &mut self,
        message: Message,
        handler: &mut dyn SessionHandler,
    ) -> Result<(), BridgeError> {
        match message {
            Message::Request { id, method, params } => match handler.on_request(&method, params) {
                Ok(result) => self.write(&Message::Response {
                    id,
                    error: None,
                    result,
                }),
                Err(e) => {
                    // Answer first so the editor is not left waiting, then end the loop.
                    let _ = self.write(&Message::Response {
                        id,
                        error: Some(json!(e.to_string())),
                        result: Value::Null,
                    });
                    Err(e)
                }
            },
            Message::Notification { method, params } => handler.on_notification(&method, params),
            Message::Response { id, error, .. } => {
                let method = self.pending.remove(&id).unwrap_or("<unknown>");
                if let Some(error) = error {
                    log::warn!("Editor rejected {method} (request {id}): {error}");
                }
                Ok(())
            }
        }
    }
}

impl EditorControl for ChildSession {
    fn quit(&mut self) -> Result<(), BridgeError> {
        // The editor exits without answering; the reader thread sees EOF.
        self.request(method::COMMAND, vec![json!("qa!")])
    }

    fn input(&mut self, keys: &str) -> Result<(), BridgeError> {
        self.request(method::INPUT, vec![json!(keys)])
    }

    fn ui_try_resize(&mut self, columns: u16, rows: u16) -> Result<(), BridgeError> {
        self.request(method::UI_TRY_RESIZE, vec![json!(columns), json!(rows)])
    }

    fn ui_attach(&mut self, columns: u16, rows: u16) -> Result<(), BridgeError> {
        self.request(
            method::UI_ATTACH,
            vec![json!(columns), json!(rows), json!({ "rgb": true })],
        )
    }
}

impl RemoteSession for ChildSession {
    fn caller(&self) -> SessionCaller {
        self.caller.clone()
    }

    fn run(&mut self, handler: &mut dyn SessionHandler) -> Result<(), BridgeError> {
        let mut events = self.events.take().ok_or(BridgeError::AlreadyRunning)?;
        log::info!("Editor run-loop starting (pid {})", self.child.id());

        handler.on_setup(self)?;

        // `self.caller` keeps the queue open, so only `Closed` ends the loop.
        while let Some(event) = events.next_blocking() {
            match event {
                SessionEvent::Call(call) => {
                    if let Err(e) = call(self) {
                        log::warn!("Queued editor call failed: {e}");
                    }
                }
                SessionEvent::Message(message) => self.dispatch(message, handler)?,
                SessionEvent::Closed => break,
            }
        }

        log::info!("Editor run-loop exiting");
        Ok(())
    }
}

impl Drop for ChildSession {
    fn drop(&mut self) {
        match self.child.try_wait() {
            Ok(Some(status)) => log::debug!("Editor exited with {status}"),
            _ => {
                log::info!("Killing editor process {}", self.child.id());
                let _ = self.child.kill();
                let _ = self.child.wait();
            }
        }
    }
}

fn missing_pipe(name: &str) -> BridgeError {
    BridgeError::Io(io::Error::other(format!("editor {name} was not captured")))
}

/// Decode messages from `reader` into session events until EOF.
///
/// Undecodable messages are logged and skipped. EOF (or a broken stream)
/// always ends with a [`SessionEvent::Closed`].
fn forward_messages<R: BufRead>(mut reader: R, wire: WireFormat, caller: &SessionCaller) {
    loop {
        match wire.read(&mut reader) {
            Ok(Some(Ok(message))) => {
                if caller.deliver(SessionEvent::Message(message)).is_err() {
                    return;
                }
            }
            Ok(Some(Err(e))) => log::warn!("[editor-reader] skipping message: {e}"),
            Ok(None) => break,
            Err(e) => {
                log::warn!("[editor-reader] read error: {e}");
                break;
            }
        }
    }
    log::debug!("[editor-reader] editor output closed");
    let _ = caller.deliver(SessionEvent::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn drain(events: &mut SessionEvents) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        while let Some(event) = events.next_blocking() {
            let closed = matches!(event, SessionEvent::Closed);
            out.push(event);
            if closed {
                break;
            }
        }
        out
    }

    #[test]
    fn test_forward_messages_skips_garbage_and_ends_closed() {
        let input = "[2, \"redraw\", []]\n\nnot json\n[1, 0, null, true]\n";
        let (caller, mut events) = event_queue();
        forward_messages(Cursor::new(input), WireFormat::JsonLines, &caller);

        let events = drain(&mut events);
        assert_eq!(events.len(), 3);
        assert!(matches!(
            &events[0],
            SessionEvent::Message(Message::Notification { method, .. }) if method == "redraw"
        ));
        assert!(matches!(
            &events[1],
            SessionEvent::Message(Message::Response { id: 0, .. })
        ));
        assert!(matches!(events[2], SessionEvent::Closed));
    }

    #[test]
    fn test_spawn_rejects_empty_command() {
        assert!(matches!(
            ChildSession::spawn(&[], WireFormat::MessagePack),
            Err(BridgeError::Io(e)) if e.kind() == io::ErrorKind::InvalidInput
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_sets_up_once_and_stops_at_eof() {
        struct Counting {
            setups: usize,
            notifications: Vec<String>,
        }

        impl SessionHandler for Counting {
            fn on_setup(&mut self, editor: &mut dyn EditorControl) -> Result<(), BridgeError> {
                self.setups += 1;
                editor.ui_attach(10, 5)
            }

            fn on_request(
                &mut self,
                method: &str,
                _args: Vec<Value>,
            ) -> Result<Value, BridgeError> {
                Err(BridgeError::UnimplementedCapability {
                    method: method.to_string(),
                })
            }

            fn on_notification(
                &mut self,
                method: &str,
                _args: Vec<Value>,
            ) -> Result<(), BridgeError> {
                self.notifications.push(method.to_string());
                Ok(())
            }
        }

        // Emits two notifications after reading the attach request, then exits.
        let script = "read line; printf '[2, \"redraw\", []]\\n[2, \"bell\", []]\\n'";
        let argv = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let mut session = ChildSession::spawn(&argv, WireFormat::JsonLines).unwrap();
        let mut handler = Counting {
            setups: 0,
            notifications: Vec::new(),
        };

        session.run(&mut handler).unwrap();
        assert_eq!(handler.setups, 1);
        assert_eq!(handler.notifications, vec!["redraw", "bell"]);
        assert!(matches!(
            session.run(&mut handler),
            Err(BridgeError::AlreadyRunning)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_request_from_editor_ends_run_with_error() {
        struct Refusing;

        impl SessionHandler for Refusing {
            fn on_setup(&mut self, _editor: &mut dyn EditorControl) -> Result<(), BridgeError> {
                Ok(())
            }

            fn on_request(
                &mut self,
                method: &str,
                _args: Vec<Value>,
            ) -> Result<Value, BridgeError> {
                Err(BridgeError::UnimplementedCapability {
                    method: method.to_string(),
                })
            }

            fn on_notification(
                &mut self,
                _method: &str,
                _args: Vec<Value>,
            ) -> Result<(), BridgeError> {
                Ok(())
            }
        }

        let script = "printf '[0, 1, \"clipboard_get\", []]\\n'; read line";
        let argv = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let mut session = ChildSession::spawn(&argv, WireFormat::JsonLines).unwrap();

        let result = session.run(&mut Refusing);
        assert!(matches!(
            result,
            Err(BridgeError::UnimplementedCapability { method }) if method == "clipboard_get"
        ));
    }

    #[test]
    fn test_forward_messages_msgpack_stops_on_broken_stream() {
        let mut input = WireFormat::MessagePack
            .encode(&Message::Notification {
                method: "redraw".to_string(),
                params: vec![],
            })
            .unwrap();
        // 0xc1 is never a valid MessagePack marker.
        input.extend([0xc1, 0x93, 0x02]);
        let (caller, mut events) = event_queue();
        forward_messages(Cursor::new(input), WireFormat::MessagePack, &caller);

        let events = drain(&mut events);
        assert_eq!(events.len(), 2);
        assert!(matches!(
            &events[0],
            SessionEvent::Message(Message::Notification { method, .. }) if method == "redraw"
        ));
        assert!(matches!(events[1], SessionEvent::Closed));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_speaks_msgpack_with_editor() {
        struct Collecting {
            notifications: Vec<String>,
        }

        impl SessionHandler for Collecting {
            fn on_setup(&mut self, editor: &mut dyn EditorControl) -> Result<(), BridgeError> {
                editor.ui_attach(80, 24)
            }

            fn on_request(
                &mut self,
                method: &str,
                _args: Vec<Value>,
            ) -> Result<Value, BridgeError> {
                Err(BridgeError::UnimplementedCapability {
                    method: method.to_string(),
                })
            }

            fn on_notification(
                &mut self,
                method: &str,
                _args: Vec<Value>,
            ) -> Result<(), BridgeError> {
                self.notifications.push(method.to_string());
                Ok(())
            }
        }

        // Waits for the first byte of the attach request, then sends
        // [2, "redraw", []] and exits.
        let script = r"head -c 1 >/dev/null; printf '\223\002\246redraw\220'";
        let argv = vec!["sh".to_string(), "-c".to_string(), script.to_string()];
        let mut session = ChildSession::spawn(&argv, WireFormat::MessagePack).unwrap();
        let mut handler = Collecting {
            notifications: Vec::new(),
        };

        session.run(&mut handler).unwrap();
        assert_eq!(handler.notifications, vec!["redraw"]);
    }
}
