//! UI bridge - keeps an editor session and a presentation surface in sync.
//!
//! # Architecture
//!
//! ```text
//! caller thread (remote-event loop)          ui-presentation thread
//! ├── session.run(RemoteEvents)              ├── surface.start(BridgeHandle)
//! │   ├── on_setup → ui_attach(153, 39)      │   ├── drains SurfaceInbox
//! │   ├── on_request → error (unsupported)   │   │   └── UpdateBatch::apply
//! │   └── on_notification("redraw")          │   └── user input → BridgeHandle
//! │       └── schedule_screen_update ────────┼──►     └── SessionCaller ──┐
//! ├── surface_handle.quit() ─────────────────┼──►                        │
//! └── join ◄─────────────────────────────────┘   session queue ◄─────────┘
//! ```
//!
//! The bridge itself owns no shared mutable state. The two threads talk only
//! through the session's call queue and the surface's work queue.
//!
//! # Shutdown
//!
//! 1. The editor exits (or is told to quit) and `session.run` returns.
//! 2. The surface is told to quit; batches already queued are applied first.
//! 3. The presentation thread is joined, then `connect` returns.
//!
//! If the presentation loop stops first (error, panic, or the UI closing),
//! its exit guard forwards a disconnect so the editor quits and step 1 follows.

// Rust guideline compliant 2026-02

pub mod batch;
pub mod handle;

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use serde_json::Value;

use crate::constants;
use crate::error::{BridgeError, ConnectError};
use crate::profiling::{self, ProfileMetric, ProfileReport};
use crate::session::{EditorControl, RemoteSession, SessionHandler};
use crate::surface::{PresentationSurface, SurfaceHandle};

#[doc(inline)]
pub use batch::{Update, UpdateBatch};
#[doc(inline)]
pub use handle::BridgeHandle;

/// The only notification the bridge acts on.
pub const REDRAW: &str = "redraw";

/// Pairs one remote session with one presentation surface.
#[derive(Debug)]
pub struct UiBridge<R, S> {
    session: R,
    surface: S,
    profile: Option<ProfileMetric>,
    initial_size: (u16, u16),
}

impl<R: RemoteSession, S: PresentationSurface> UiBridge<R, S> {
    /// Create a bridge with the default initial geometry and no profiling.
    pub fn new(session: R, surface: S) -> Self {
        Self {
            session,
            surface,
            profile: None,
            initial_size: (constants::DEFAULT_COLUMNS, constants::DEFAULT_ROWS),
        }
    }

    /// Profile the presentation loop, ordering the report by `metric`.
    pub fn profile(mut self, metric: Option<ProfileMetric>) -> Self {
        self.profile = metric;
        self
    }

    /// Grid size requested when attaching to the editor.
    pub fn initial_size(mut self, columns: u16, rows: u16) -> Self {
        self.initial_size = (columns, rows);
        self
    }

    /// Forwarding handle for this bridge's session.
    ///
    /// Usable before and during [`connect`](Self::connect).
    pub fn handle(&self) -> BridgeHandle {
        BridgeHandle::new(self.session.caller())
    }

    /// Run both loops until the editor session ends.
    ///
    /// Blocks the calling thread on the remote-event loop. Returns after the
    /// presentation thread has been joined, with the profiling report if
    /// profiling was requested. A remote-loop error takes precedence over a
    /// presentation error; either way the report travels in [`ConnectError`].
    pub fn connect(self) -> Result<Option<ProfileReport>, ConnectError> {
        let Self {
            mut session,
            surface,
            profile,
            initial_size,
        } = self;

        let bridge = BridgeHandle::new(session.caller());
        let surface_handle = surface.handle();

        let presentation = thread::Builder::new()
            .name(constants::PRESENTATION_THREAD_NAME.to_string())
            .spawn(move || presentation_loop(surface, bridge, profile))
            .map_err(|e| ConnectError {
                error: e.into(),
                report: None,
            })?;
        log::info!("Presentation loop spawned in dedicated thread");

        let mut events = RemoteEvents::new(surface_handle.clone(), initial_size);
        let remote_result = session.run(&mut events);
        match &remote_result {
            Ok(()) => log::info!("Remote event loop finished"),
            Err(e) => log::error!("Remote event loop failed: {e}"),
        }

        surface_handle.quit();

        log::info!("Waiting for presentation thread to finish...");
        let (report, presentation_result) = match presentation.join() {
            Ok(outcome) => outcome,
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                log::error!("Presentation thread panicked: {message}");
                (None, Err(BridgeError::PresentationPanicked(message)))
            }
        };

        if let Some(report) = &report {
            log::info!("Presentation loop profile:\n{report}");
        }
        match remote_result.and(presentation_result) {
            Ok(()) => Ok(report),
            Err(error) => Err(ConnectError { error, report }),
        }
    }
}

/// Body of the presentation thread.
///
/// The report is built on every exit path, including a panicking surface.
fn presentation_loop<S: PresentationSurface>(
    mut surface: S,
    bridge: BridgeHandle,
    profile: Option<ProfileMetric>,
) -> (Option<ProfileReport>, Result<(), BridgeError>) {
    // Runs on every exit path, unwinding included.
    let _disconnect = scopeguard::guard(bridge.clone(), |bridge| {
        log::debug!("Presentation loop ended, forwarding disconnect");
        bridge.disconnect();
    });

    log::info!("Presentation loop starting");
    let run = move || match panic::catch_unwind(AssertUnwindSafe(|| surface.start(bridge))) {
        Ok(result) => result,
        Err(panic) => Err(BridgeError::PresentationPanicked(panic_message(
            panic.as_ref(),
        ))),
    };

    let (report, result) = match profile {
        None => (None, run()),
        Some(metric) => {
            let session = profiling::Session::begin();
            let result = profiling::scope("start", run);
            let stats = session.finish();
            (
                Some(stats.report(metric, constants::PROFILE_REPORT_LIMIT)),
                result,
            )
        }
    };
    if let Err(e) = &result {
        log::error!("Presentation loop failed: {e}");
    }
    (report, result)
}

/// Session callbacks of the remote-event loop.
struct RemoteEvents<S> {
    surface: SurfaceHandle<S>,
    initial_size: (u16, u16),
    attached: bool,
}

impl<S> RemoteEvents<S> {
    fn new(surface: SurfaceHandle<S>, initial_size: (u16, u16)) -> Self {
        Self {
            surface,
            initial_size,
            attached: false,
        }
    }
}

impl<S: PresentationSurface> SessionHandler for RemoteEvents<S> {
    fn on_setup(&mut self, editor: &mut dyn EditorControl) -> Result<(), BridgeError> {
        if self.attached {
            log::warn!("Session setup fired twice, already attached");
            return Ok(());
        }
        self.attached = true;
        let (columns, rows) = self.initial_size;
        log::info!("Attaching UI at {columns}x{rows}");
        editor.ui_attach(columns, rows)
    }

    fn on_request(&mut self, method: &str, _args: Vec<Value>) -> Result<Value, BridgeError> {
        Err(BridgeError::UnimplementedCapability {
            method: method.to_string(),
        })
    }

    fn on_notification(&mut self, method: &str, args: Vec<Value>) -> Result<(), BridgeError> {
        if method != REDRAW {
            log::trace!("Ignoring notification '{method}'");
            return Ok(());
        }
        let batch = match UpdateBatch::from_redraw(args) {
            Ok(batch) => batch,
            Err(e) => {
                log::warn!("Dropping redraw: {e}");
                return Ok(());
            }
        };
        log::trace!("Scheduling redraw batch of {} updates", batch.len());
        self.surface
            .schedule_screen_update(Box::new(move |surface: &mut S| batch.apply(surface)));
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::event_queue;
    use crate::surface::{inbox, SurfaceInbox, SurfaceMessage};
    use serde_json::json;

    #[derive(Default)]
    struct Recorder {
        calls: Vec<String>,
    }

    impl EditorControl for Recorder {
        fn quit(&mut self) -> Result<(), BridgeError> {
            self.calls.push("quit".to_string());
            Ok(())
        }

        fn input(&mut self, keys: &str) -> Result<(), BridgeError> {
            self.calls.push(format!("input {keys}"));
            Ok(())
        }

        fn ui_try_resize(&mut self, columns: u16, rows: u16) -> Result<(), BridgeError> {
            self.calls.push(format!("resize {columns}x{rows}"));
            Ok(())
        }

        fn ui_attach(&mut self, columns: u16, rows: u16) -> Result<(), BridgeError> {
            self.calls.push(format!("attach {columns}x{rows}"));
            Ok(())
        }
    }

    /// Surface that only records; never started in these tests.
    struct Passive {
        applied: Vec<String>,
    }

    impl PresentationSurface for Passive {
        fn handle(&self) -> SurfaceHandle<Self> {
            unreachable!("not used by handler tests")
        }

        fn start(&mut self, _bridge: BridgeHandle) -> Result<(), BridgeError> {
            Ok(())
        }

        fn apply_update(&mut self, name: &str, args: &[Value]) -> Result<(), BridgeError> {
            self.applied.push(format!("{name}{args:?}"));
            Ok(())
        }

        fn cursor_refresh(&mut self) -> Result<(), BridgeError> {
            self.applied.push("cursor".to_string());
            Ok(())
        }
    }

    fn handler() -> (RemoteEvents<Passive>, SurfaceInbox<Passive>) {
        let (handle, inbox) = inbox();
        (RemoteEvents::new(handle, (153, 39)), inbox)
    }

    fn run_queued(inbox: &mut SurfaceInbox<Passive>, surface: &mut Passive) {
        while let Some(SurfaceMessage::Work(work)) = inbox.try_next() {
            work(surface).unwrap();
        }
    }

    #[test]
    fn test_setup_attaches_once_with_initial_size() {
        let (mut events, _inbox) = handler();
        let mut editor = Recorder::default();
        events.on_setup(&mut editor).unwrap();
        events.on_setup(&mut editor).unwrap();
        assert_eq!(editor.calls, vec!["attach 153x39"]);
    }

    #[test]
    fn test_request_is_unimplemented() {
        let (mut events, _inbox) = handler();
        let result = events.on_request("clipboard_get", vec![]);
        assert!(matches!(
            result,
            Err(BridgeError::UnimplementedCapability { method }) if method == "clipboard_get"
        ));
    }

    #[test]
    fn test_non_redraw_notification_schedules_nothing() {
        let (mut events, mut inbox) = handler();
        events.on_notification("bufenter", vec![json!(1)]).unwrap();
        assert!(inbox.try_next().is_none());
    }

    #[test]
    fn test_malformed_redraw_is_dropped() {
        let (mut events, mut inbox) = handler();
        events.on_notification(REDRAW, vec![json!("put")]).unwrap();
        assert!(inbox.try_next().is_none());
    }

    #[test]
    fn test_redraw_is_deferred_to_surface_thread() {
        let (mut events, mut inbox) = handler();
        let mut surface = Passive { applied: vec![] };

        events
            .on_notification(REDRAW, vec![json!(["put", ["a"], ["b"]])])
            .unwrap();
        assert!(surface.applied.is_empty());

        run_queued(&mut inbox, &mut surface);
        assert_eq!(
            surface.applied,
            vec![r#"put[String("a")]"#, r#"put[String("b")]"#, "cursor"]
        );
    }

    #[test]
    fn test_presentation_exit_forwards_disconnect() {
        let (caller, mut queue) = event_queue();
        let surface = Passive { applied: vec![] };
        let (report, result) = presentation_loop(surface, BridgeHandle::new(caller), None);
        result.unwrap();
        assert!(report.is_none());

        let mut editor = Recorder::default();
        if let Some(crate::session::SessionEvent::Call(call)) = queue.next_blocking() {
            call(&mut editor).unwrap();
        }
        assert_eq!(editor.calls, vec!["quit"]);
    }

    /// Surface whose loop panics as soon as it starts.
    struct Exploding;

    impl PresentationSurface for Exploding {
        fn handle(&self) -> SurfaceHandle<Self> {
            unreachable!("not used by handler tests")
        }

        fn start(&mut self, _bridge: BridgeHandle) -> Result<(), BridgeError> {
            panic!("boom");
        }

        fn apply_update(&mut self, _name: &str, _args: &[Value]) -> Result<(), BridgeError> {
            Ok(())
        }

        fn cursor_refresh(&mut self) -> Result<(), BridgeError> {
            Ok(())
        }
    }

    #[test]
    fn test_panicking_surface_still_yields_report() {
        let (caller, mut queue) = event_queue();
        let (report, result) = presentation_loop(
            Exploding,
            BridgeHandle::new(caller),
            Some(ProfileMetric::CallCount),
        );

        assert!(matches!(
            result,
            Err(BridgeError::PresentationPanicked(msg)) if msg == "boom"
        ));
        let report = report.expect("profiling enabled");
        assert!(report.as_str().contains("start"));
        assert_eq!(report.recorded_count(), 1);

        // The disconnect is still forwarded.
        assert!(matches!(
            queue.next_blocking(),
            Some(crate::session::SessionEvent::Call(_))
        ));
    }

    #[test]
    fn test_panic_message_extracts_payload() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u8), "unknown panic payload");
    }
}
