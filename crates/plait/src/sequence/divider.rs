//! Divider decoration around a sequence.
//!
//! [`DividerSequence`] decorates every item of an inner sequence with the
//! dividers it should be drawn with: a leading divider before the first item,
//! a trailing divider after the last one, and inner dividers between items.
//! While the inner sequence is empty, the leading and trailing dividers can be
//! shown on their own as standalone marker items.
//!
//! Whether each divider shows is decided by an [`EmptyPolicy`] from item
//! counts alone.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

use plait_core::logging::targets;
use plait_core::{ConnectionId, PlaitError, Result, check_position, invariant};

use super::change::{ChangeNotifier, SequenceChange};
use super::traits::{Holder, HolderHandle, ItemId, Observable, Sequence, ViewType};

/// Predicate over an item count.
pub type CountPredicate = Arc<dyn Fn(usize) -> bool + Send + Sync>;

/// Decides which dividers show, given item counts.
///
/// `leading` and `trailing` receive the inner item count, `inner` receives
/// the outer item count. Inner dividers additionally need at least two items.
#[derive(Clone)]
pub struct EmptyPolicy {
    leading: CountPredicate,
    trailing: CountPredicate,
    inner: CountPredicate,
}

impl EmptyPolicy {
    /// Leading and trailing dividers only around a non-empty sequence.
    pub fn show_nothing() -> Self {
        Self::custom(|count| count > 0, |count| count > 0, |_| true)
    }

    /// The leading divider shows even while empty.
    pub fn show_leading() -> Self {
        Self::custom(|_| true, |count| count > 0, |_| true)
    }

    /// The trailing divider shows even while empty.
    pub fn show_trailing() -> Self {
        Self::custom(|count| count > 0, |_| true, |_| true)
    }

    /// Both leading and trailing dividers show even while empty.
    pub fn show_leading_and_trailing() -> Self {
        Self::custom(|_| true, |_| true, |_| true)
    }

    /// A policy from three predicates.
    pub fn custom<L, R, I>(leading: L, trailing: R, inner: I) -> Self
    where
        L: Fn(usize) -> bool + Send + Sync + 'static,
        R: Fn(usize) -> bool + Send + Sync + 'static,
        I: Fn(usize) -> bool + Send + Sync + 'static,
    {
        Self {
            leading: Arc::new(leading),
            trailing: Arc::new(trailing),
            inner: Arc::new(inner),
        }
    }

    /// Whether the leading divider shows for `inner_count` items.
    pub fn shows_leading(&self, inner_count: usize) -> bool {
        (self.leading)(inner_count)
    }

    /// Whether the trailing divider shows for `inner_count` items.
    pub fn shows_trailing(&self, inner_count: usize) -> bool {
        (self.trailing)(inner_count)
    }

    /// Whether inner dividers show for `total_count` outer items.
    pub fn shows_inner(&self, total_count: usize) -> bool {
        (self.inner)(total_count)
    }
}

impl Default for EmptyPolicy {
    fn default() -> Self {
        Self::show_nothing()
    }
}

impl fmt::Debug for EmptyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmptyPolicy")
            .field("empty_leading", &self.shows_leading(0))
            .field("empty_trailing", &self.shows_trailing(0))
            .finish_non_exhaustive()
    }
}

/// Which dividers an item is drawn with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Dividers {
    /// A divider before the item.
    pub leading: bool,
    /// A divider between the item and the next one.
    pub inner: bool,
    /// A divider after the item.
    pub trailing: bool,
}

/// An item of a [`DividerSequence`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Divided<T> {
    /// The standalone leading marker of an empty sequence.
    Leading,
    /// The standalone trailing marker of an empty sequence.
    Trailing,
    /// An inner item with its decorations.
    Item {
        /// The inner item.
        item: T,
        /// The dividers to draw with it.
        dividers: Dividers,
    },
}

impl<T> Divided<T> {
    /// The inner item, unless this is a marker.
    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Item { item, .. } => Some(item),
            Self::Leading | Self::Trailing => None,
        }
    }

    /// Returns `true` for standalone markers.
    pub fn is_marker(&self) -> bool {
        !matches!(self, Self::Item { .. })
    }
}

/// Builder for [`DividerSequence`].
///
/// A divider kind is only ever shown if a view type was configured for it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plait::sequence::{ArraySequence, DividerBuilder, EmptyPolicy, Sequence, ViewType};
///
/// let inner = Arc::new(ArraySequence::<u32>::empty());
/// let dividers = DividerBuilder::new()
///     .leading(ViewType::new())
///     .trailing(ViewType::new())
///     .empty_policy(EmptyPolicy::show_leading_and_trailing())
///     .build(inner.clone());
///
/// assert_eq!(dividers.len(), 2);
/// inner.push(7);
/// assert_eq!(dividers.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct DividerBuilder {
    leading: Option<ViewType>,
    trailing: Option<ViewType>,
    inner: Option<ViewType>,
    policy: EmptyPolicy,
}

impl DividerBuilder {
    /// Creates a builder with no dividers and [`EmptyPolicy::show_nothing`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables the leading divider, rendered with `view_type` as a marker.
    pub fn leading(mut self, view_type: ViewType) -> Self {
        self.leading = Some(view_type);
        self
    }

    /// Enables the trailing divider, rendered with `view_type` as a marker.
    pub fn trailing(mut self, view_type: ViewType) -> Self {
        self.trailing = Some(view_type);
        self
    }

    /// Enables inner dividers.
    pub fn inner(mut self, view_type: ViewType) -> Self {
        self.inner = Some(view_type);
        self
    }

    /// Sets the policy.
    pub fn empty_policy(mut self, policy: EmptyPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Wraps `inner`.
    pub fn build<T: Clone + Send + Sync + 'static>(
        self,
        inner: Arc<dyn Sequence<Item = T>>,
    ) -> Arc<DividerSequence<T>> {
        Arc::new_cyclic(|this| DividerSequence {
            this: this.clone(),
            inner,
            config: self,
            state: Mutex::new(DividerState::default()),
            notifier: ChangeNotifier::new(),
        })
    }
}

#[derive(Debug, Default)]
struct DividerState {
    /// Outer length as implied by the changes emitted so far.
    item_count: usize,
    /// Inner length as implied by the changes received so far.
    inner_count: usize,
    connection: Option<ConnectionId>,
}

/// A sequence decorated with leading, trailing and inner dividers.
///
/// Items of the inner sequence keep their view types. Markers use the view
/// types given to the [`DividerBuilder`].
pub struct DividerSequence<T> {
    this: Weak<Self>,
    inner: Arc<dyn Sequence<Item = T>>,
    config: DividerBuilder,
    state: Mutex<DividerState>,
    notifier: ChangeNotifier,
}

impl<T: Clone + Send + Sync + 'static> DividerSequence<T> {
    /// The decorated sequence.
    pub fn inner(&self) -> &Arc<dyn Sequence<Item = T>> {
        &self.inner
    }

    /// The dividers the item at `position` is drawn with.
    pub fn dividers(&self, position: usize) -> Result<Dividers> {
        let inner_count = self.inner_count();
        check_position(position, inner_count)?;
        Ok(self.dividers_at(position, inner_count))
    }

    fn leading_visible(&self, inner_count: usize) -> bool {
        self.config.leading.is_some() && self.config.policy.shows_leading(inner_count)
    }

    fn trailing_visible(&self, inner_count: usize) -> bool {
        self.config.trailing.is_some() && self.config.policy.shows_trailing(inner_count)
    }

    fn inner_visible(&self, inner_count: usize) -> bool {
        let total = self.outer_len(inner_count);
        total > 1 && self.config.inner.is_some() && self.config.policy.shows_inner(total)
    }

    /// Number of standalone markers shown for `inner_count` items.
    fn marker_count(&self, inner_count: usize) -> usize {
        if inner_count > 0 {
            return 0;
        }
        usize::from(self.leading_visible(0)) + usize::from(self.trailing_visible(0))
    }

    fn outer_len(&self, inner_count: usize) -> usize {
        inner_count + self.marker_count(inner_count)
    }

    fn dividers_at(&self, position: usize, inner_count: usize) -> Dividers {
        Dividers {
            leading: position == 0 && self.leading_visible(inner_count),
            inner: position + 1 < inner_count && self.inner_visible(inner_count),
            trailing: position + 1 == inner_count && self.trailing_visible(inner_count),
        }
    }

    /// The inner count the outer positions currently refer to.
    fn inner_count(&self) -> usize {
        let state = self.state.lock();
        if state.connection.is_some() {
            state.inner_count
        } else {
            drop(state);
            self.inner.len()
        }
    }

    /// The marker at `position` of an empty inner sequence.
    fn marker(&self, position: usize) -> Result<(Divided<T>, ViewType)> {
        if position == 0 {
            if let Some(view_type) = self.config.leading.filter(|_| self.leading_visible(0)) {
                return Ok((Divided::Leading, view_type));
            }
        }
        let len = self.outer_len(0);
        if position + 1 == len {
            if let Some(view_type) = self.config.trailing.filter(|_| self.trailing_visible(0)) {
                return Ok((Divided::Trailing, view_type));
            }
        }
        Err(PlaitError::out_of_range(position, len))
    }

    /// Computes the outer changes for one inner change, updating the counts.
    fn translate(&self, state: &mut DividerState, change: SequenceChange) -> Vec<SequenceChange> {
        let before = state.inner_count;
        let Some(after) = change.apply_to_len(before) else {
            plait_core::error::invariant_violation(
                &format!(
                    "inner sequence removed {} items from a count of {}",
                    change.count(),
                    before
                ),
                file!(),
                line!(),
            );
        };
        invariant!(
            state.item_count == self.outer_len(before),
            "cached item count {} disagrees with {} inner items",
            state.item_count,
            before
        );

        let mut changes = Vec::with_capacity(3);
        if matches!(change, SequenceChange::Inserted { .. }) && before == 0 {
            let markers = self.marker_count(0);
            if markers > 0 {
                changes.push(SequenceChange::Removed {
                    start: 0,
                    count: markers,
                });
            }
        }
        changes.push(change);
        if after == 0 && before > 0 {
            let markers = self.marker_count(0);
            if markers > 0 {
                changes.push(SequenceChange::Inserted {
                    start: 0,
                    count: markers,
                });
            }
        }
        changes.extend(self.redecorated(change, before, after));

        state.inner_count = after;
        state.item_count = self.outer_len(after);
        changes
    }

    /// `Changed` runs covering the surviving items whose dividers differ
    /// after `change`, in post-change positions.
    ///
    /// Without a policy flip only the old and new boundary items can differ.
    /// Flipping inner visibility touches every item.
    fn redecorated(&self, change: SequenceChange, before: usize, after: usize) -> Vec<SequenceChange> {
        if before == 0 || after == 0 {
            return Vec::new();
        }
        let mut candidates: Vec<usize> = if self.inner_visible(before) != self.inner_visible(after) {
            (0..after).collect()
        } else {
            let mut edges = vec![0, after - 1];
            edges.extend(next_position(change, 0));
            edges.extend(next_position(change, before - 1));
            edges.sort_unstable();
            edges.dedup();
            edges
        };
        candidates.retain(|&position| {
            previous_position(change, position).is_some_and(|previous| {
                self.dividers_at(previous, before) != self.dividers_at(position, after)
            })
        });

        let mut runs: Vec<SequenceChange> = Vec::new();
        for position in candidates {
            match runs.last_mut() {
                Some(SequenceChange::Changed { start, count }) if *start + *count == position => {
                    *count += 1;
                }
                _ => runs.push(SequenceChange::Changed {
                    start: position,
                    count: 1,
                }),
            }
        }
        runs
    }

    fn on_inner_change(&self, change: SequenceChange) {
        let changes = {
            let mut state = self.state.lock();
            if state.connection.is_none() {
                return;
            }
            self.translate(&mut state, change)
        };
        tracing::trace!(target: targets::DIVIDER, ?change, ?changes, "inner change");
        for change in changes {
            self.notifier.notify(change);
        }
    }
}

/// Where the item at `position` ends up after moving `count` items from
/// `from` to `to`.
fn moved_position(position: usize, from: usize, to: usize, count: usize) -> usize {
    if (from..from + count).contains(&position) {
        position - from + to
    } else if from < to && (from + count..to + count).contains(&position) {
        position - count
    } else if to < from && (to..from).contains(&position) {
        position + count
    } else {
        position
    }
}

/// Pre-change position of the item at `position` after `change`, or `None`
/// if `change` inserted it.
fn previous_position(change: SequenceChange, position: usize) -> Option<usize> {
    match change {
        SequenceChange::Inserted { start, count } => {
            if position < start {
                Some(position)
            } else if position < start + count {
                None
            } else {
                Some(position - count)
            }
        }
        SequenceChange::Removed { start, count } => {
            Some(if position < start { position } else { position + count })
        }
        SequenceChange::Moved { from, to, count } => Some(moved_position(position, to, from, count)),
        SequenceChange::Changed { .. } => Some(position),
    }
}

/// Post-change position of the item at `position` before `change`, or `None`
/// if `change` removed it.
fn next_position(change: SequenceChange, position: usize) -> Option<usize> {
    match change {
        SequenceChange::Inserted { start, count } => {
            Some(if position < start { position } else { position + count })
        }
        SequenceChange::Removed { start, count } => {
            if position < start {
                Some(position)
            } else if position < start + count {
                None
            } else {
                Some(position - count)
            }
        }
        SequenceChange::Moved { from, to, count } => Some(moved_position(position, from, to, count)),
        SequenceChange::Changed { .. } => Some(position),
    }
}

impl<T: Clone + Send + Sync + 'static> Observable for DividerSequence<T> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn on_first_observer(&self) {
        let this = self.this.clone();
        let id = self.inner.observe(Box::new(move |change| {
            if let Some(this) = this.upgrade() {
                this.on_inner_change(*change);
            }
        }));
        let inner_count = self.inner.len();
        let mut state = self.state.lock();
        state.connection = Some(id);
        state.inner_count = inner_count;
        state.item_count = self.outer_len(inner_count);
    }

    fn on_last_observer(&self) {
        let connection = {
            let mut state = self.state.lock();
            state.item_count = 0;
            state.inner_count = 0;
            state.connection.take()
        };
        if let Some(id) = connection {
            self.inner.unobserve(id);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Sequence for DividerSequence<T> {
    type Item = Divided<T>;

    fn len(&self) -> usize {
        let state = self.state.lock();
        if state.connection.is_some() {
            return state.item_count;
        }
        drop(state);
        self.outer_len(self.inner.len())
    }

    fn item(&self, position: usize) -> Result<Divided<T>> {
        let inner_count = self.inner_count();
        if inner_count == 0 {
            return self.marker(position).map(|(marker, _)| marker);
        }
        check_position(position, inner_count)?;
        Ok(Divided::Item {
            item: self.inner.item(position)?,
            dividers: self.dividers_at(position, inner_count),
        })
    }

    fn view_type(&self, position: usize) -> Result<ViewType> {
        if self.inner_count() == 0 {
            return self.marker(position).map(|(_, view_type)| view_type);
        }
        self.inner.view_type(position)
    }

    fn item_id(&self, position: usize) -> Result<Option<ItemId>> {
        if self.inner_count() == 0 {
            return self.marker(position).map(|_| None);
        }
        self.inner.item_id(position)
    }

    fn has_stable_ids(&self) -> bool {
        self.inner.has_stable_ids()
    }

    fn is_enabled(&self, position: usize) -> Result<bool> {
        if self.inner_count() == 0 {
            return self.marker(position).map(|_| false);
        }
        self.inner.is_enabled(position)
    }

    fn bind(&self, holder: &Arc<dyn Holder>) -> Result<()> {
        if self.inner_count() == 0 {
            return Ok(());
        }
        self.inner.bind(holder)
    }

    fn recycle(&self, handle: HolderHandle) {
        self.inner.recycle(handle);
    }
}

impl<T> Drop for DividerSequence<T> {
    fn drop(&mut self) {
        if let Some(id) = self.state.get_mut().connection.take() {
            self.inner.unobserve(id);
        }
    }
}

static_assertions::assert_impl_all!(DividerSequence<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::ArraySequence;
    use crate::testing::Mirror;

    struct Fixture {
        inner: Arc<ArraySequence<u32>>,
        dividers: Arc<DividerSequence<u32>>,
        leading: ViewType,
        trailing: ViewType,
    }

    fn fixture(items: Vec<u32>, policy: EmptyPolicy) -> Fixture {
        let inner = Arc::new(ArraySequence::new(items));
        let leading = ViewType::new();
        let trailing = ViewType::new();
        let dividers = DividerBuilder::new()
            .leading(leading)
            .trailing(trailing)
            .inner(ViewType::new())
            .empty_policy(policy)
            .build(inner.clone());
        Fixture {
            inner,
            dividers,
            leading,
            trailing,
        }
    }

    fn record(dividers: &Arc<DividerSequence<u32>>) -> Arc<Mutex<Vec<SequenceChange>>> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let recv = received.clone();
        dividers.observe(Box::new(move |change| recv.lock().push(*change)));
        received
    }

    fn plain(dividers: Dividers) -> (bool, bool, bool) {
        (dividers.leading, dividers.inner, dividers.trailing)
    }

    #[test]
    fn test_policy_presets() {
        let nothing = EmptyPolicy::show_nothing();
        assert!(!nothing.shows_leading(0) && !nothing.shows_trailing(0));
        assert!(nothing.shows_leading(1) && nothing.shows_trailing(1));

        let leading = EmptyPolicy::show_leading();
        assert!(leading.shows_leading(0) && !leading.shows_trailing(0));

        let trailing = EmptyPolicy::show_trailing();
        assert!(!trailing.shows_leading(0) && trailing.shows_trailing(0));

        let both = EmptyPolicy::show_leading_and_trailing();
        assert!(both.shows_leading(0) && both.shows_trailing(0));
        assert!(both.shows_inner(2));
    }

    #[test]
    fn test_empty_shows_markers() {
        let f = fixture(vec![], EmptyPolicy::show_leading_and_trailing());
        assert_eq!(f.dividers.len(), 2);
        assert_eq!(f.dividers.item(0).unwrap(), Divided::Leading);
        assert_eq!(f.dividers.item(1).unwrap(), Divided::Trailing);
        assert_eq!(f.dividers.view_type(0).unwrap(), f.leading);
        assert_eq!(f.dividers.view_type(1).unwrap(), f.trailing);
        assert!(!f.dividers.is_enabled(0).unwrap());
        assert_eq!(f.dividers.item_id(1).unwrap(), None);
        assert_eq!(f.dividers.item(2), Err(PlaitError::out_of_range(2, 2)));

        let trailing_only = fixture(vec![], EmptyPolicy::show_trailing());
        assert_eq!(trailing_only.dividers.len(), 1);
        assert_eq!(trailing_only.dividers.item(0).unwrap(), Divided::Trailing);

        let none = fixture(vec![], EmptyPolicy::show_nothing());
        assert_eq!(none.dividers.len(), 0);
        assert!(none.dividers.item(0).is_err());
    }

    #[test]
    fn test_items_carry_their_dividers() {
        let f = fixture(vec![1, 2, 3], EmptyPolicy::show_nothing());
        assert_eq!(f.dividers.len(), 3);
        assert_eq!(plain(f.dividers.dividers(0).unwrap()), (true, true, false));
        assert_eq!(plain(f.dividers.dividers(1).unwrap()), (false, true, false));
        assert_eq!(plain(f.dividers.dividers(2).unwrap()), (false, false, true));
        assert_eq!(
            f.dividers.item(1).unwrap().into_item(),
            Some(2)
        );
        assert_eq!(f.dividers.view_type(1).unwrap(), f.inner.item_view_type());

        let single = fixture(vec![9], EmptyPolicy::show_nothing());
        assert_eq!(plain(single.dividers.dividers(0).unwrap()), (true, false, true));
    }

    #[test]
    fn test_becoming_non_empty_removes_markers_first() {
        let f = fixture(vec![], EmptyPolicy::show_leading_and_trailing());
        let events = record(&f.dividers);

        f.inner.push(1);

        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Removed { start: 0, count: 2 },
                SequenceChange::Inserted { start: 0, count: 1 },
            ]
        );
        assert_eq!(f.dividers.len(), 1);
        assert!(!f.dividers.item(0).unwrap().is_marker());
    }

    #[test]
    fn test_becoming_empty_inserts_markers_after() {
        let f = fixture(vec![1, 2], EmptyPolicy::show_leading());
        let events = record(&f.dividers);

        f.inner.clear();

        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Removed { start: 0, count: 2 },
                SequenceChange::Inserted { start: 0, count: 1 },
            ]
        );
        assert_eq!(f.dividers.len(), 1);
        assert_eq!(f.dividers.item(0).unwrap(), Divided::Leading);
    }

    #[test]
    fn test_policy_without_markers_forwards_only() {
        let f = fixture(vec![], EmptyPolicy::show_nothing());
        let events = record(&f.dividers);

        f.inner.push(1);
        f.inner.remove(0).unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Inserted { start: 0, count: 1 },
                SequenceChange::Removed { start: 0, count: 1 },
            ]
        );
        assert_eq!(f.dividers.len(), 0);
    }

    #[test]
    fn test_boundary_insertions_change_neighbours() {
        let f = fixture(vec![5], EmptyPolicy::show_nothing());
        let events = record(&f.dividers);

        f.inner.insert(0, 4).unwrap();
        f.inner.push(6);
        f.inner.insert(1, 7).unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Inserted { start: 0, count: 1 },
                SequenceChange::Changed { start: 1, count: 1 },
                SequenceChange::Inserted { start: 2, count: 1 },
                SequenceChange::Changed { start: 1, count: 1 },
                SequenceChange::Inserted { start: 1, count: 1 },
            ]
        );
        assert_eq!(f.dividers.len(), 4);
    }

    #[test]
    fn test_boundary_removals_change_neighbours() {
        let f = fixture(vec![1, 2, 3, 4], EmptyPolicy::show_nothing());
        let events = record(&f.dividers);

        f.inner.remove(0).unwrap();
        f.inner.remove(2).unwrap();
        f.inner.remove(0).unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Removed { start: 0, count: 1 },
                SequenceChange::Changed { start: 0, count: 1 },
                SequenceChange::Removed { start: 2, count: 1 },
                SequenceChange::Changed { start: 1, count: 1 },
                SequenceChange::Removed { start: 0, count: 1 },
                SequenceChange::Changed { start: 0, count: 1 },
            ]
        );
        assert_eq!(f.dividers.len(), 1);
        assert_eq!(plain(f.dividers.dividers(0).unwrap()), (true, false, true));
    }

    #[test]
    fn test_moves_refresh_boundary_items() {
        let f = fixture(vec![1, 2, 3, 4], EmptyPolicy::show_nothing());
        let events = record(&f.dividers);

        f.inner.move_range(0, 2, 1).unwrap();
        f.inner.move_range(1, 2, 1).unwrap();

        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Moved { from: 0, to: 2, count: 1 },
                SequenceChange::Changed { start: 0, count: 1 },
                SequenceChange::Changed { start: 2, count: 1 },
                SequenceChange::Moved { from: 1, to: 2, count: 1 },
            ]
        );
    }

    #[test]
    fn test_inner_dividers_follow_policy() {
        let f = fixture(
            vec![1, 2],
            EmptyPolicy::custom(|_| false, |_| false, |total| total > 2),
        );
        assert_eq!(plain(f.dividers.dividers(0).unwrap()), (false, false, false));
        f.inner.push(3);
        assert_eq!(plain(f.dividers.dividers(0).unwrap()), (false, true, false));
        assert_eq!(plain(f.dividers.dividers(2).unwrap()), (false, false, false));
    }

    #[test]
    fn test_inner_visibility_flip_changes_every_survivor() {
        let f = fixture(
            vec![1, 2],
            EmptyPolicy::custom(|_| true, |_| true, |total| total > 2),
        );
        let mirror = Mirror::attach(f.dividers.clone());
        let events = record(&f.dividers);

        f.inner.push(3);
        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Inserted { start: 2, count: 1 },
                SequenceChange::Changed { start: 0, count: 2 },
            ]
        );
        mirror.assert_consistent();

        events.lock().clear();
        f.inner.remove(1).unwrap();
        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Removed { start: 1, count: 1 },
                SequenceChange::Changed { start: 0, count: 1 },
            ]
        );
        mirror.assert_consistent();
    }

    #[test]
    fn test_count_dependent_boundaries_keep_mirror() {
        let f = fixture(
            vec![1, 2],
            EmptyPolicy::custom(|count| count >= 3, |count| count % 2 == 0, |total| total < 5),
        );
        let mirror = Mirror::attach(f.dividers.clone());
        let events = record(&f.dividers);

        f.inner.insert(1, 9).unwrap();
        assert_eq!(
            *events.lock(),
            vec![
                SequenceChange::Inserted { start: 1, count: 1 },
                SequenceChange::Changed { start: 0, count: 1 },
                SequenceChange::Changed { start: 2, count: 1 },
            ]
        );
        mirror.assert_consistent();

        f.inner.insert_all(1, vec![4, 5]).unwrap();
        mirror.assert_consistent();
        f.inner.move_range(0, 3, 2).unwrap();
        mirror.assert_consistent();
        f.inner.remove_range(0, 3).unwrap();
        mirror.assert_consistent();
        f.inner.clear();
        mirror.assert_consistent();
        assert_eq!(f.dividers.len(), 1);
        assert_eq!(f.dividers.item(0).unwrap(), Divided::Trailing);
    }

    #[test]
    fn test_unobserved_reads_live_counts() {
        let f = fixture(vec![], EmptyPolicy::show_leading());
        f.inner.push(1);
        assert_eq!(f.dividers.len(), 1);
        assert_eq!(f.inner.observer_count(), 0);

        let events = record(&f.dividers);
        assert_eq!(f.inner.observer_count(), 1);
        f.inner.clear();
        assert_eq!(f.dividers.len(), 1);
        assert_eq!(events.lock().len(), 2);

        drop(f.dividers);
        assert_eq!(f.inner.observer_count(), 0);
    }
}
