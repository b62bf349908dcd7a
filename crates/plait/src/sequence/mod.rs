//! Composable, observable sequences.
//!
//! Everything a virtualized list renders comes through the [`Sequence`]
//! contract: a length, positional queries, and a stream of
//! [`SequenceChange`]s delivered to observers. Sequences compose:
//!
//! - [`ArraySequence`]: in-memory leaf
//! - [`OffsetSequence`]: maps one inner sequence into an outer coordinate
//!   space
//! - [`TreeSequence`]: flattens a root sequence with expandable per-item child
//!   sequences into one flat list
//! - [`DividerSequence`]: decorates items with leading, inner and trailing
//!   dividers, with standalone markers while empty
//! - [`ConcatSequence`]: concatenates parts end to end
//!
//! Composites are built with `Arc` and subscribe to what they wrap only while
//! they are observed themselves. An unobserved composite answers from the
//! live lengths of its parts.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use plait::sequence::{ArraySequence, Sequence, TreeSequence};
//!
//! let root = Arc::new(ArraySequence::new(vec!["fruit", "veg"]));
//! let tree = TreeSequence::new(root, |position: usize| -> Arc<dyn Sequence<Item = &'static str>> {
//!     let children = if position == 0 { vec!["apple", "pear"] } else { vec!["leek"] };
//!     Arc::new(ArraySequence::new(children))
//! });
//!
//! tree.expand(0).unwrap();
//! let flat: Vec<_> = (0..tree.len()).map(|p| tree.item(p).unwrap()).collect();
//! assert_eq!(flat, ["fruit", "apple", "pear", "veg"]);
//! ```
//!
//! # Threading
//!
//! Sequences are `Send + Sync`, but every change notification is expected on
//! the thread that created the sequence. Debug builds assert this.

mod array;
mod change;
mod concat;
mod divider;
mod loading;
mod offset;
mod traits;
mod tree;

pub use array::{ArraySequence, Binder, EnabledExtractor, IdExtractor};
pub use change::{ChangeNotifier, SequenceChange};
pub use concat::ConcatSequence;
pub use divider::{
    CountPredicate, Divided, DividerBuilder, DividerSequence, Dividers, EmptyPolicy,
};
pub use loading::{
    EmptyStateDelegate, LoadError, LoadingPolicy, LoadingSequence, LoadingStateDelegate,
};
pub use offset::{OffsetHolder, OffsetSequence, PositionFn, Transform};
pub use traits::{
    Holder, HolderHandle, ItemId, Observable, Observer, Sequence, Subscription, ViewType,
};
pub use tree::{ChildSource, TreePosition, TreeSequence};
