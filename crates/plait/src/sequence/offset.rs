//! Position-translating decorator.
//!
//! [`OffsetSequence`] maps positions in an outer coordinate space onto one
//! inner sequence and maps the inner sequence's changes back out. Composites
//! such as [`TreeSequence`](super::TreeSequence) and
//! [`ConcatSequence`](super::ConcatSequence) use it in two ways:
//!
//! - **Transient**: configured for one query with the accounting of the
//!   segment that owns the queried position, then discarded or
//!   [reconfigured](OffsetSequence::set).
//! - **Forwarding**: a dedicated instance per inner sequence whose offset the
//!   owner keeps current, used to [`translate`](OffsetSequence::translate)
//!   every change the inner sequence emits.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

use plait_core::{PlaitError, Result};

use super::change::SequenceChange;
use super::traits::{Holder, HolderHandle, ItemId, Sequence, ViewType};

/// A position function from outer to inner coordinates.
pub type PositionFn = Arc<dyn Fn(usize) -> Option<usize> + Send + Sync>;

/// How a holder's outer position is mapped into inner coordinates.
#[derive(Clone, Default)]
pub enum Transform {
    /// Subtract the decorator's offset.
    #[default]
    Offset,
    /// Ask a caller-provided function. The function is evaluated every time
    /// the holder's position is read, so it can follow later mutations.
    Map(PositionFn),
}

impl Transform {
    /// Creates a [`Transform::Map`] from a closure.
    pub fn map<F>(f: F) -> Self
    where
        F: Fn(usize) -> Option<usize> + Send + Sync + 'static,
    {
        Self::Map(Arc::new(f))
    }

    /// Applies the transform to `outer`.
    pub fn apply(&self, outer: usize, offset: usize) -> Option<usize> {
        match self {
            Self::Offset => outer.checked_sub(offset),
            Self::Map(f) => f(outer),
        }
    }
}

impl fmt::Debug for Transform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Offset => f.write_str("Offset"),
            Self::Map(_) => f.write_str("Map(..)"),
        }
    }
}

/// A holder that reports its position in inner coordinates.
///
/// Wraps the holder the rendering layer handed to the outer sequence. The
/// mapping is updated on every bind, so one `OffsetHolder` per
/// [`HolderHandle`] can be kept in a side table and reused while the slot
/// travels between segments.
pub struct OffsetHolder {
    holder: Arc<dyn Holder>,
    mapping: RwLock<(Transform, usize)>,
}

impl OffsetHolder {
    /// Wraps `holder` with an identity mapping.
    pub fn new(holder: Arc<dyn Holder>) -> Self {
        Self {
            holder,
            mapping: RwLock::new((Transform::Offset, 0)),
        }
    }

    /// Replaces the mapping.
    pub fn remap(&self, transform: Transform, offset: usize) {
        *self.mapping.write() = (transform, offset);
    }
}

impl Holder for OffsetHolder {
    fn handle(&self) -> HolderHandle {
        self.holder.handle()
    }

    fn position(&self) -> Option<usize> {
        let outer = self.holder.position()?;
        let (transform, offset) = self.mapping.read().clone();
        transform.apply(outer, offset)
    }
}

/// Wraps one inner sequence, translating positions by an offset.
///
/// Outer position `p` maps to inner position `p - offset` for every query.
/// Inner changes map back to outer changes at `p + offset`.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plait::sequence::{ArraySequence, OffsetSequence, SequenceChange, Transform};
///
/// let inner = Arc::new(ArraySequence::new(vec!['x', 'y']));
/// let offset = OffsetSequence::new(inner, Transform::Offset, 3);
///
/// assert_eq!(offset.item(4).unwrap(), 'y');
/// assert_eq!(
///     offset.translate(SequenceChange::Inserted { start: 1, count: 2 }),
///     SequenceChange::Inserted { start: 4, count: 2 },
/// );
/// ```
pub struct OffsetSequence<T> {
    inner: Arc<dyn Sequence<Item = T>>,
    transform: Transform,
    offset: usize,
}

impl<T> Clone for OffsetSequence<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            transform: self.transform.clone(),
            offset: self.offset,
        }
    }
}

impl<T> OffsetSequence<T> {
    /// Creates a decorator over `inner`.
    pub fn new(inner: Arc<dyn Sequence<Item = T>>, transform: Transform, offset: usize) -> Self {
        Self {
            inner,
            transform,
            offset,
        }
    }

    /// Reconfigures the decorator in place.
    pub fn set(
        &mut self,
        inner: Arc<dyn Sequence<Item = T>>,
        transform: Transform,
        offset: usize,
    ) -> &mut Self {
        self.inner = inner;
        self.transform = transform;
        self.offset = offset;
        self
    }

    /// Changes only the offset.
    pub fn set_offset(&mut self, offset: usize) {
        self.offset = offset;
    }

    /// The wrapped sequence.
    pub fn inner(&self) -> &Arc<dyn Sequence<Item = T>> {
        &self.inner
    }

    /// The current offset.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Maps an inner position to an outer one.
    pub fn to_outer(&self, inner: usize) -> usize {
        inner + self.offset
    }

    /// Translates a change emitted by the inner sequence into outer
    /// coordinates.
    pub fn translate(&self, change: SequenceChange) -> SequenceChange {
        change.shifted(self.offset)
    }
}

impl<T: Clone + 'static> OffsetSequence<T> {
    /// Maps an outer position to an inner one.
    pub fn to_inner(&self, outer: usize) -> Result<usize> {
        outer
            .checked_sub(self.offset)
            .ok_or_else(|| PlaitError::out_of_range(outer, self.offset + self.inner.len()))
    }

    /// The item at outer position `outer`.
    pub fn item(&self, outer: usize) -> Result<T> {
        self.inner.item(self.to_inner(outer)?)
    }

    /// The view type at outer position `outer`.
    pub fn view_type(&self, outer: usize) -> Result<ViewType> {
        self.inner.view_type(self.to_inner(outer)?)
    }

    /// The item id at outer position `outer`.
    pub fn item_id(&self, outer: usize) -> Result<Option<ItemId>> {
        self.inner.item_id(self.to_inner(outer)?)
    }

    /// The enabled state at outer position `outer`.
    pub fn is_enabled(&self, outer: usize) -> Result<bool> {
        self.inner.is_enabled(self.to_inner(outer)?)
    }

    /// Points `holder` at this decorator's mapping and binds it through the
    /// inner sequence.
    pub fn bind(&self, holder: &Arc<OffsetHolder>) -> Result<()> {
        holder.remap(self.transform.clone(), self.offset);
        let holder: Arc<dyn Holder> = holder.clone();
        self.inner.bind(&holder)
    }
}
