//! Plait - composable, observable sequences for virtualized lists.
//!
//! A renderer that only draws what is on screen needs three things from its
//! data: a length, random access by position, and precise notifications when
//! positions change. Plait provides those through the
//! [`Sequence`](sequence::Sequence) contract and builds flat lists out of
//! smaller sequences: trees with expandable children, divider decoration and
//! concatenation, all of which keep their change streams exact.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use plait::prelude::*;
//!
//! let items = Arc::new(ArraySequence::new(vec!["a", "b"]));
//! let decorated = DividerBuilder::new()
//!     .leading(ViewType::new())
//!     .trailing(ViewType::new())
//!     .empty_policy(EmptyPolicy::show_leading_and_trailing())
//!     .build(items.clone());
//!
//! let recorder = ChangeRecorder::attach(decorated.clone());
//! items.push("c");
//!
//! assert_eq!(decorated.len(), 3);
//! assert_eq!(recorder.net_len_delta(), 1);
//! ```
//!
//! # Crates
//!
//! - `plait-core`: signal dispatch, errors, logging and thread checks
//! - `plait`: the sequence layer (this crate)

pub use plait_core::{
    ConnectionId, PerfSpan, PlaitError, Result, Signal, ThreadAffinity, check_position,
    check_range, invariant,
};

/// Logging targets and helpers, re-exported from `plait-core`.
pub mod logging {
    pub use plait_core::logging::*;
}

pub mod prelude;
pub mod sequence;
pub mod testing;
