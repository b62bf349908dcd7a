//! Prelude module for Plait.
//!
//! ```ignore
//! use plait::prelude::*;
//! ```
//!
//! This provides access to:
//! - The sequence contract (`Sequence`, `Observable`, `SequenceChange`)
//! - Leaf and composite sequences
//! - Loading state delegates
//! - Change stream test helpers

// ============================================================================
// Sequence Contract
// ============================================================================

pub use crate::sequence::{
    ChangeNotifier, Holder, HolderHandle, ItemId, Observable, Sequence, SequenceChange,
    Subscription, ViewType,
};

// ============================================================================
// Sequences
// ============================================================================

pub use crate::sequence::{
    ArraySequence, ConcatSequence, Divided, DividerBuilder, DividerSequence, Dividers,
    EmptyPolicy, OffsetSequence, Transform, TreePosition, TreeSequence,
};

// ============================================================================
// Loading State
// ============================================================================

pub use crate::sequence::{
    EmptyStateDelegate, LoadError, LoadingPolicy, LoadingSequence, LoadingStateDelegate,
};

// ============================================================================
// Errors and Signals
// ============================================================================

pub use crate::{ConnectionId, PlaitError, Result, Signal};

// ============================================================================
// Testing
// ============================================================================

pub use crate::testing::{ChangeRecorder, Mirror};
