//! Error types for plait.
//!
//! Only one condition is recoverable: asking for a position outside
//! `[0, len)`. Everything else that can go wrong inside a composed sequence is
//! a broken bookkeeping invariant, which aborts through [`invariant_violation`]
//! instead of being returned.

/// The main error type for plait operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaitError {
    /// A position outside `[0, len)` was queried or mutated.
    #[error("Index: {position}, total size: {len}")]
    OutOfRange {
        /// The offending position.
        position: usize,
        /// The length of the sequence at the time of the call.
        len: usize,
    },
}

impl PlaitError {
    /// Create an out-of-range error.
    pub fn out_of_range(position: usize, len: usize) -> Self {
        Self::OutOfRange { position, len }
    }
}

/// A specialized Result type for plait operations.
pub type Result<T> = std::result::Result<T, PlaitError>;

/// Returns `Ok(())` if `position` lies in `[0, len)`.
#[inline]
pub fn check_position(position: usize, len: usize) -> Result<()> {
    if position < len {
        Ok(())
    } else {
        Err(PlaitError::out_of_range(position, len))
    }
}

/// Returns `Ok(())` if `[start, start + count)` lies within `[0, len]`.
#[inline]
pub fn check_range(start: usize, count: usize, len: usize) -> Result<()> {
    match start.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(PlaitError::out_of_range(start.saturating_add(count), len)),
    }
}

/// Aborts after a bookkeeping invariant was found broken.
///
/// Continuing would desynchronize outer positions from the underlying data and
/// corrupt every subsequent change notification, so this always panics.
#[cold]
#[inline(never)]
#[doc(hidden)]
pub fn invariant_violation(msg: &str, file: &str, line: u32) -> ! {
    tracing::error!(target: crate::logging::targets::CORE, file, line, "{msg}");
    panic!(
        "\n\
        ══════════════════════════════════════════════════════════════════════\n\
        INVARIANT VIOLATION\n\
        ══════════════════════════════════════════════════════════════════════\n\
        \n\
        {msg}\n\
        \n\
        Location: {file}:{line}\n\
        \n\
        A composed sequence no longer agrees with its sources. This is a\n\
        programming error: a source mutated without notifying, notified\n\
        with a range it never had, or delivered changes out of order.\n\
        \n\
        ══════════════════════════════════════════════════════════════════════"
    )
}

/// Panics with a descriptive message when `cond` does not hold.
///
/// Always active, in both debug and release builds.
///
/// # Example
///
/// ```should_panic
/// use plait_core::invariant;
///
/// let cached: usize = 1;
/// let removed: usize = 2;
/// invariant!(removed <= cached, "removed {} items from a count of {}", removed, cached);
/// ```
#[macro_export]
macro_rules! invariant {
    ($cond:expr) => {
        $crate::invariant!($cond, "invariant failed: {}", stringify!($cond))
    };
    ($cond:expr, $msg:expr) => {
        if !$cond {
            $crate::error::invariant_violation($msg, file!(), line!());
        }
    };
    ($cond:expr, $fmt:expr, $($arg:tt)*) => {
        if !$cond {
            $crate::error::invariant_violation(&format!($fmt, $($arg)*), file!(), line!());
        }
    };
}
