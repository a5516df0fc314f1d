//! Application-wide constants for editor-bridge.
//!
//! # Categories
//!
//! - **Geometry**: Initial grid size requested when attaching
//! - **Profiling**: Report sizing
//! - **Polling**: Presentation loop intervals
//! - **Threads**: Names given to spawned threads (visible in debuggers and panics)

use std::time::Duration;

// ============================================================================
// Geometry
// ============================================================================

/// Columns requested from the editor when the UI attaches.
///
/// Only the initial size; the surface sends a resize as soon as it knows
/// the real terminal dimensions.
pub const DEFAULT_COLUMNS: u16 = 153;

/// Rows requested from the editor when the UI attaches.
pub const DEFAULT_ROWS: u16 = 39;

// ============================================================================
// Profiling
// ============================================================================

/// Maximum number of entries in a profiling report.
pub const PROFILE_REPORT_LIMIT: usize = 30;

// ============================================================================
// Polling
// ============================================================================

/// How long the terminal surface waits for keyboard input per iteration.
///
/// Bounds the latency between a scheduled batch arriving and it being
/// applied (60 FPS max).
pub const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(16);

// ============================================================================
// Threads
// ============================================================================

/// Thread running the presentation loop.
pub const PRESENTATION_THREAD_NAME: &str = "ui-presentation";

/// Thread decoding the editor's stdout.
pub const READER_THREAD_NAME: &str = "editor-reader";

/// Thread forwarding the editor's stderr to the log.
pub const STDERR_THREAD_NAME: &str = "editor-stderr";
