//! Logging facilities for plait.
//!
//! plait uses the `tracing` crate for instrumentation. To see logs, install a
//! tracing subscriber in your application:
//!
//! ```ignore
//! fn main() {
//!     tracing_subscriber::fmt()
//!         .with_env_filter("plait::tree=trace")
//!         .init();
//! }
//! ```
//!
//! Expand/collapse operations log at `debug`. Group rebuilds and change
//! translation log at `trace`.

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Core infrastructure target.
    pub const CORE: &str = "plait_core";
    /// Signal dispatch target.
    pub const SIGNAL: &str = "plait_core::signal";
    /// Leaf sequences and change notification.
    pub const SEQUENCE: &str = "plait::sequence";
    /// Hierarchical flattening.
    pub const TREE: &str = "plait::tree";
    /// Divider decoration.
    pub const DIVIDER: &str = "plait::divider";
    /// Concatenation.
    pub const CONCAT: &str = "plait::concat";
    /// Loading and empty state delegates.
    pub const LOADING: &str = "plait::loading";
    /// Performance spans.
    pub const PERF: &str = "plait::perf";
}

/// A guard that keeps a tracing span entered until dropped.
///
/// Used to time group index rebuilds and other bookkeeping passes.
#[derive(Debug)]
pub struct PerfSpan {
    #[allow(dead_code)]
    span: tracing::span::EnteredSpan,
}

impl PerfSpan {
    /// Create a new performance span.
    ///
    /// The span will be active until the guard is dropped.
    pub fn new(name: &'static str) -> Self {
        let span = tracing::trace_span!(target: "plait::perf", "perf", operation = name);
        Self {
            span: span.entered(),
        }
    }
}

/// Macros for common tracing patterns.
///
/// These are thin wrappers around the `tracing` macros with the core target.
#[macro_export]
macro_rules! plait_trace {
    ($($arg:tt)*) => {
        tracing::trace!(target: "plait_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! plait_debug {
    ($($arg:tt)*) => {
        tracing::debug!(target: "plait_core", $($arg)*)
    };
}

#[macro_export]
macro_rules! plait_warn {
    ($($arg:tt)*) => {
        tracing::warn!(target: "plait_core", $($arg)*)
    };
}
