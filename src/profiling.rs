//! Presentation loop profiling.
//!
//! Profiling is a scoped, per-thread measurement session:
//!
//! ```text
//! let session = Session::begin();          // install collector on this thread
//! scope("start", || surface.start(...));   // instrumented code records calls
//! let stats = session.finish();            // uninstall, keep the numbers
//! stats.report(ProfileMetric::CumulativeTime, 30)
//! ```
//!
//! [`scope`] is the only instrumentation point. Without an active session on
//! the current thread it just calls the closure, so instrumented code pays
//! one thread-local lookup when profiling is off.
//!
//! Times follow the usual profiler split: `tottime` excludes time spent in
//! nested scopes, `cumtime` includes it.

// Rust guideline compliant 2026-02

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt::{self, Write as _};
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::{Duration, Instant};

/// Sort key for a profiling report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProfileMetric {
    /// Number of calls (`ncalls`).
    CallCount,
    /// Time spent in the scope itself (`tottime`).
    TotalTime,
    /// `tottime` divided by call count (`percall`).
    PerCallTime,
    /// Time including nested scopes (`cumtime`).
    CumulativeTime,
    /// Scope name, ascending (`name`).
    Name,
}

impl ProfileMetric {
    /// Every metric, in command-line order.
    pub const ALL: [Self; 5] = [
        Self::CallCount,
        Self::TotalTime,
        Self::PerCallTime,
        Self::CumulativeTime,
        Self::Name,
    ];

    /// Short name used on the command line.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CallCount => "ncalls",
            Self::TotalTime => "tottime",
            Self::PerCallTime => "percall",
            Self::CumulativeTime => "cumtime",
            Self::Name => "name",
        }
    }

    /// Human-readable label for the report header.
    pub fn description(self) -> &'static str {
        match self {
            Self::CallCount => "call count",
            Self::TotalTime => "internal time",
            Self::PerCallTime => "internal time per call",
            Self::CumulativeTime => "cumulative time",
            Self::Name => "function name",
        }
    }
}

impl fmt::Display for ProfileMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProfileMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|metric| metric.as_str() == s)
            .ok_or_else(|| format!("unknown profile metric '{s}'"))
    }
}

thread_local! {
    static ACTIVE: RefCell<Option<Collector>> = const { RefCell::new(None) };
}

/// Open scope on the collector's stack.
struct Frame {
    name: String,
    started: Instant,
    /// Time spent in nested scopes so far.
    nested: Duration,
}

struct Collector {
    started: Instant,
    stack: Vec<Frame>,
    entries: HashMap<String, Entry>,
}

impl Collector {
    fn new() -> Self {
        Self {
            started: Instant::now(),
            stack: Vec::new(),
            entries: HashMap::new(),
        }
    }

    fn enter(&mut self, name: &str) {
        self.stack.push(Frame {
            name: name.to_string(),
            started: Instant::now(),
            nested: Duration::ZERO,
        });
    }

    fn exit(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };
        let elapsed = frame.started.elapsed();
        // Recursive scopes count toward cumtime once, at the outermost level.
        let recursive = self.stack.iter().any(|open| open.name == frame.name);

        let entry = self
            .entries
            .entry(frame.name.clone())
            .or_insert_with(|| Entry::named(frame.name));
        entry.calls += 1;
        entry.total_time += elapsed.saturating_sub(frame.nested);
        if !recursive {
            entry.cumulative_time += elapsed;
        }

        if let Some(parent) = self.stack.last_mut() {
            parent.nested += elapsed;
        }
    }
}

/// Run `f` as a profiled scope called `name`.
///
/// Records nothing unless a [`Session`] is active on the current thread.
/// The scope is closed even if `f` panics.
pub fn scope<T>(name: &str, f: impl FnOnce() -> T) -> T {
    let entered = ACTIVE.with(|active| match active.borrow_mut().as_mut() {
        Some(collector) => {
            collector.enter(name);
            true
        }
        None => false,
    });
    if !entered {
        return f();
    }

    let _exit = scopeguard::guard((), |()| {
        let _ = ACTIVE.try_with(|active| {
            if let Some(collector) = active.borrow_mut().as_mut() {
                collector.exit();
            }
        });
    });
    f()
}

/// Returns `true` if a session is collecting on this thread.
pub fn is_active() -> bool {
    ACTIVE.with(|active| active.borrow().is_some())
}

/// An active measurement session on the current thread.
///
/// Dropping the session without [`finish`](Self::finish) (e.g. while
/// unwinding) still stops collection; the numbers are discarded.
#[derive(Debug)]
pub struct Session {
    /// Bound to the thread whose thread-local it installed.
    _not_send: PhantomData<*const ()>,
}

impl Session {
    /// Start collecting on the current thread, replacing any previous session.
    pub fn begin() -> Self {
        ACTIVE.with(|active| *active.borrow_mut() = Some(Collector::new()));
        log::debug!("Profiling session started");
        Self {
            _not_send: PhantomData,
        }
    }

    /// Stop collecting and return the statistics.
    pub fn finish(self) -> Stats {
        let collector = take_collector();
        drop(self);
        let Some(collector) = collector else {
            return Stats::default();
        };
        let mut entries: Vec<Entry> = collector.entries.into_values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        log::debug!("Profiling session finished ({} entries)", entries.len());
        Stats {
            entries,
            wall_time: collector.started.elapsed(),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = take_collector();
    }
}

fn take_collector() -> Option<Collector> {
    ACTIVE
        .try_with(|active| active.borrow_mut().take())
        .ok()
        .flatten()
}

/// Accumulated numbers for one scope name.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Scope name.
    pub name: String,
    /// Number of completed calls.
    pub calls: u64,
    /// Time inside the scope minus nested scopes.
    pub total_time: Duration,
    /// Time inside the scope including nested scopes.
    pub cumulative_time: Duration,
}

impl Entry {
    fn named(name: String) -> Self {
        Self {
            name,
            calls: 0,
            total_time: Duration::ZERO,
            cumulative_time: Duration::ZERO,
        }
    }

    /// `total_time / calls` in seconds.
    pub fn per_call_total(&self) -> f64 {
        per_call(self.total_time, self.calls)
    }

    /// `cumulative_time / calls` in seconds.
    pub fn per_call_cumulative(&self) -> f64 {
        per_call(self.cumulative_time, self.calls)
    }
}

#[allow(clippy::cast_precision_loss, reason = "call counts stay far below 2^52")]
fn per_call(time: Duration, calls: u64) -> f64 {
    if calls == 0 {
        0.0
    } else {
        time.as_secs_f64() / calls as f64
    }
}

/// Finished profiling data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Stats {
    entries: Vec<Entry>,
    wall_time: Duration,
}

impl Stats {
    /// All entries, sorted by name.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Total number of recorded calls.
    pub fn total_calls(&self) -> u64 {
        self.entries.iter().map(|e| e.calls).sum()
    }

    /// Entries ordered by `metric` (largest first, names ascending).
    pub fn sorted_by(&self, metric: ProfileMetric) -> Vec<&Entry> {
        let mut sorted: Vec<&Entry> = self.entries.iter().collect();
        match metric {
            ProfileMetric::CallCount => sorted.sort_by(|a, b| b.calls.cmp(&a.calls)),
            ProfileMetric::TotalTime => sorted.sort_by(|a, b| b.total_time.cmp(&a.total_time)),
            ProfileMetric::PerCallTime => {
                sorted.sort_by(|a, b| b.per_call_total().total_cmp(&a.per_call_total()));
            }
            ProfileMetric::CumulativeTime => {
                sorted.sort_by(|a, b| b.cumulative_time.cmp(&a.cumulative_time));
            }
            ProfileMetric::Name => sorted.sort_by(|a, b| a.name.cmp(&b.name)),
        }
        sorted
    }

    /// Format the top `limit` entries ordered by `metric`.
    pub fn report(&self, metric: ProfileMetric, limit: usize) -> ProfileReport {
        let sorted = self.sorted_by(metric);
        let shown = sorted.len().min(limit);

        let mut text = String::new();
        let _ = writeln!(
            text,
            "         {} calls in {:.3} seconds",
            self.total_calls(),
            self.wall_time.as_secs_f64()
        );
        let _ = writeln!(text);
        let _ = writeln!(text, "   Ordered by: {}", metric.description());
        if shown < sorted.len() {
            let _ = writeln!(
                text,
                "   List reduced from {} to {} due to restriction <{}>",
                sorted.len(),
                shown,
                limit
            );
        }
        let _ = writeln!(text);
        let _ = writeln!(
            text,
            "{:>9} {:>8} {:>8} {:>8} {:>8} name",
            "ncalls", "tottime", "percall", "cumtime", "percall"
        );
        for entry in sorted.iter().take(shown) {
            let _ = writeln!(
                text,
                "{:>9} {:>8.3} {:>8.3} {:>8.3} {:>8.3} {}",
                entry.calls,
                entry.total_time.as_secs_f64(),
                entry.per_call_total(),
                entry.cumulative_time.as_secs_f64(),
                entry.per_call_cumulative(),
                entry.name
            );
        }

        ProfileReport {
            text,
            shown,
            available: sorted.len(),
        }
    }
}

/// Formatted profiling output, produced once the presentation loop ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileReport {
    text: String,
    shown: usize,
    available: usize,
}

impl ProfileReport {
    /// Report text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of entry rows in the report.
    pub fn entry_count(&self) -> usize {
        self.shown
    }

    /// Number of distinct scopes recorded (before the limit).
    pub fn recorded_count(&self) -> usize {
        self.available
    }
}

impl fmt::Display for ProfileReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
