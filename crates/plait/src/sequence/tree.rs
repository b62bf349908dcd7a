//! Hierarchical flattening of a root sequence and expandable child sequences.
//!
//! A [`TreeSequence`] presents a root sequence with some of its positions
//! *expanded*: every expanded root item is followed by the items of a child
//! sequence obtained from a [`ChildSource`]. Both the root and the children
//! keep mutating independently; the tree translates each of their changes
//! into a change of the flattened sequence.
//!
//! # Group index
//!
//! Outer positions are resolved through a group index with one record per
//! root item: where the root item sits in outer space and how many child
//! items follow it. The index is derived from the root length and the cached
//! child counts, marked dirty by every structural change, and rebuilt lazily
//! on the next query. Any number of queries between two mutations share one
//! rebuild.
//!
//! Change translation never forces a rebuild. While the index is dirty, a root
//! position maps to `position + Σ child counts of expanded positions before
//! it`, which only needs the entry map.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use plait::sequence::{ArraySequence, Sequence, TreeSequence};
//!
//! let root = Arc::new(ArraySequence::new(vec!["A", "B", "C"]));
//! let tree = TreeSequence::new(root, |_position: usize| -> Arc<dyn Sequence<Item = &'static str>> {
//!     Arc::new(ArraySequence::new(vec!["x", "y"]))
//! });
//!
//! tree.expand(1).unwrap();
//! assert_eq!(tree.len(), 5);
//! assert_eq!(tree.item(2).unwrap(), "x");
//! assert_eq!(tree.outer_to_root(4).unwrap(), 2);
//! ```

use parking_lot::{Mutex, MutexGuard};
use slotmap::{SlotMap, new_key_type};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Weak};

use plait_core::error::invariant_violation;
use plait_core::logging::targets;
use plait_core::{ConnectionId, PerfSpan, Result, check_position, invariant};

use super::change::{ChangeNotifier, SequenceChange};
use super::offset::{OffsetHolder, OffsetSequence, Transform};
use super::traits::{Holder, HolderHandle, ItemId, Observable, Observer, Sequence, ViewType};

new_key_type! {
    /// Identifies one expansion for as long as it lives, independent of the
    /// root position it currently belongs to.
    struct EntryKey;
}

/// Supplies the child sequence shown below an expanded root item.
///
/// Called once per expansion, outside of any tree lock. Root items without
/// children should return an empty sequence.
pub trait ChildSource<T>: Send + Sync {
    /// Returns the children of the root item at `root_position`.
    fn child_sequence(&self, root_position: usize) -> Arc<dyn Sequence<Item = T>>;
}

impl<T, F> ChildSource<T> for F
where
    F: Fn(usize) -> Arc<dyn Sequence<Item = T>> + Send + Sync,
{
    fn child_sequence(&self, root_position: usize) -> Arc<dyn Sequence<Item = T>> {
        self(root_position)
    }
}

/// What an outer position of a tree refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TreePosition {
    /// The root item at this root position.
    Root(usize),
    /// A child of an expanded root item.
    Child {
        /// Root position of the owning root item.
        root: usize,
        /// Position within the child sequence.
        index: usize,
    },
}

impl TreePosition {
    /// The root position that owns this position.
    pub fn root(&self) -> usize {
        match *self {
            Self::Root(root) | Self::Child { root, .. } => root,
        }
    }
}

/// One expanded root position.
struct Entry<T> {
    /// Forwards the child's changes; its inner sequence is the child.
    forward: OffsetSequence<T>,
    root_position: usize,
    /// Child length as implied by the changes seen so far.
    item_count: usize,
    connection: Option<ConnectionId>,
}

/// Accounting for one root item's slice of outer space.
#[derive(Debug, Clone, Copy)]
struct Group {
    root_position: usize,
    outer_start: usize,
    /// Child items of earlier groups, so that `outer_start - root_start` is
    /// the root position.
    root_start: usize,
    entry: Option<EntryKey>,
    entry_count: usize,
}

impl Group {
    fn size(&self) -> usize {
        1 + self.entry_count
    }

    fn entry_start(&self) -> usize {
        self.outer_start + 1
    }
}

/// A holder bound through the tree, with the sequence it was last bound to.
struct BoundHolder<T> {
    holder: Arc<OffsetHolder>,
    sequence: Arc<dyn Sequence<Item = T>>,
}

/// Observer registrations to release once the state lock is dropped.
type Detached<T> = Vec<(Arc<dyn Sequence<Item = T>>, ConnectionId)>;

struct TreeState<T> {
    /// Root length as implied by the root changes seen so far.
    root_len: usize,
    /// Whether the root and all entries are currently observed.
    observing: bool,
    root_connection: Option<ConnectionId>,
    entries: SlotMap<EntryKey, Entry<T>>,
    expanded: BTreeMap<usize, EntryKey>,
    /// Group index, one group per root position. Cleared and refilled on
    /// rebuild so its allocation is reused.
    groups: Vec<Group>,
    dirty: bool,
    rebuilds: usize,
    view_types: HashMap<ViewType, Arc<dyn Sequence<Item = T>>>,
    holders: HashMap<HolderHandle, BoundHolder<T>>,
}

impl<T> TreeState<T> {
    fn new(root_len: usize) -> Self {
        Self {
            root_len,
            observing: false,
            root_connection: None,
            entries: SlotMap::with_key(),
            expanded: BTreeMap::new(),
            groups: Vec::new(),
            dirty: true,
            rebuilds: 0,
            view_types: HashMap::new(),
            holders: HashMap::new(),
        }
    }

    fn rebuild_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        let _perf = PerfSpan::new("tree::rebuild");

        self.groups.clear();
        let mut outer_start = 0;
        let mut root_start = 0;
        let mut expanded = self.expanded.range(..self.root_len).peekable();
        for root_position in 0..self.root_len {
            let entry = expanded
                .next_if(|(position, _)| **position == root_position)
                .map(|(_, key)| *key);
            let entry_count = entry.map_or(0, |key| self.entries[key].item_count);
            self.groups.push(Group {
                root_position,
                outer_start,
                root_start,
                entry,
                entry_count,
            });
            outer_start += 1 + entry_count;
            root_start += entry_count;
        }

        self.dirty = false;
        self.rebuilds += 1;
        tracing::trace!(
            target: targets::TREE,
            groups = self.groups.len(),
            len = outer_start,
            "rebuilt group index"
        );
    }

    fn len(&mut self) -> usize {
        self.rebuild_if_dirty();
        self.groups
            .last()
            .map_or(0, |group| group.outer_start + group.size())
    }

    /// Outer position of the root item at `root_position`, or of the slot a
    /// root item inserted at `root_position` would take.
    fn root_to_outer(&self, root_position: usize) -> usize {
        if !self.dirty && root_position < self.groups.len() {
            return self.groups[root_position].outer_start;
        }
        root_position
            + self
                .expanded
                .range(..root_position)
                .map(|(_, key)| self.entries[*key].item_count)
                .sum::<usize>()
    }

    fn group_for(&mut self, outer: usize) -> Result<Group> {
        let len = self.len();
        check_position(outer, len)?;
        let index = self.groups.partition_point(|group| group.outer_start <= outer);
        Ok(self.groups[index - 1])
    }

    /// Refreshes cached lengths from live values read while unobserved.
    fn sync_counts(&mut self, root_len: usize, counts: &[(EntryKey, usize)]) {
        if self.root_len != root_len {
            self.root_len = root_len;
            self.dirty = true;
        }
        for &(key, count) in counts {
            if let Some(entry) = self.entries.get_mut(key) {
                if entry.item_count != count {
                    entry.item_count = count;
                    self.dirty = true;
                }
            }
        }
    }

    /// Removes an entry and any view-type routes only it contributed.
    fn dispose(&mut self, key: EntryKey) -> Entry<T> {
        let Some(entry) = self.entries.remove(key) else {
            invariant_violation("disposing an entry that does not exist", file!(), line!());
        };
        self.expanded.remove(&entry.root_position);
        let sequence = entry.forward.inner();
        let shared = self
            .entries
            .values()
            .any(|other| same_sequence(other.forward.inner(), sequence));
        if !shared {
            self.view_types
                .retain(|_, routed| !same_sequence(routed, sequence));
        }
        self.dirty = true;
        entry
    }

    /// Shifts every expanded position at or after `from` by `delta`.
    fn shift_from(&mut self, from: usize, delta: isize) {
        let tail = self.expanded.split_off(&from);
        for (position, key) in tail {
            let Some(shifted) = position.checked_add_signed(delta) else {
                invariant_violation("expanded position shifted below zero", file!(), line!());
            };
            self.entries[key].root_position = shifted;
            self.expanded.insert(shifted, key);
        }
    }

    fn apply_root_change(&mut self, change: SequenceChange) -> (Vec<SequenceChange>, Detached<T>) {
        let mut detached = Vec::new();
        let changes = match change {
            SequenceChange::Changed { start, count } => {
                invariant!(
                    start + count <= self.root_len,
                    "root changed [{}, {}) beyond its length {}",
                    start,
                    start + count,
                    self.root_len
                );
                self.changed_runs(start, count)
            }
            SequenceChange::Inserted { start, count } => {
                invariant!(
                    start <= self.root_len,
                    "root inserted at {} beyond its length {}",
                    start,
                    self.root_len
                );
                let outer = self.root_to_outer(start);
                self.shift_from(start, count as isize);
                self.root_len += count;
                self.dirty = true;
                vec![SequenceChange::Inserted {
                    start: outer,
                    count,
                }]
            }
            SequenceChange::Removed { start, count } => {
                invariant!(
                    start + count <= self.root_len,
                    "root removed [{}, {}) beyond its length {}",
                    start,
                    start + count,
                    self.root_len
                );
                let outer = self.root_to_outer(start);
                let doomed: Vec<EntryKey> = self
                    .expanded
                    .range(start..start + count)
                    .map(|(_, key)| *key)
                    .collect();
                let mut removed = count;
                for key in doomed {
                    let entry = self.dispose(key);
                    removed += entry.item_count;
                    if let Some(id) = entry.connection {
                        detached.push((entry.forward.inner().clone(), id));
                    }
                }
                self.shift_from(start + count, -(count as isize));
                self.root_len -= count;
                self.dirty = true;
                vec![SequenceChange::Removed {
                    start: outer,
                    count: removed,
                }]
            }
            SequenceChange::Moved { from, to, count } => {
                invariant!(
                    from + count <= self.root_len && to + count <= self.root_len,
                    "root moved {} items from {} to {} with length {}",
                    count,
                    from,
                    to,
                    self.root_len
                );
                let outer_from = self.root_to_outer(from);
                let block = count
                    + self
                        .expanded
                        .range(from..from + count)
                        .map(|(_, key)| self.entries[*key].item_count)
                        .sum::<usize>();

                let previous = std::mem::take(&mut self.expanded);
                for (position, key) in previous {
                    let moved = if (from..from + count).contains(&position) {
                        position - from + to
                    } else if from < to && (from + count..to + count).contains(&position) {
                        position - count
                    } else if to < from && (to..from).contains(&position) {
                        position + count
                    } else {
                        position
                    };
                    self.entries[key].root_position = moved;
                    self.expanded.insert(moved, key);
                }
                self.dirty = true;

                let outer_to = self.root_to_outer(to);
                vec![SequenceChange::Moved {
                    from: outer_from,
                    to: outer_to,
                    count: block,
                }]
            }
        };
        (changes, detached)
    }

    /// Splits a root change into runs that are contiguous in outer space.
    fn changed_runs(&self, start: usize, count: usize) -> Vec<SequenceChange> {
        let end = start + count;
        let mut runs = Vec::new();
        let mut run_start = self.root_to_outer(start);
        let mut run_len = 0;
        let mut next = start;
        for (&position, key) in self.expanded.range(start..end) {
            run_len += position + 1 - next;
            next = position + 1;
            let children = self.entries[*key].item_count;
            if children > 0 && next < end {
                runs.push(SequenceChange::Changed {
                    start: run_start,
                    count: run_len,
                });
                run_start += run_len + children;
                run_len = 0;
            }
        }
        run_len += end - next;
        if run_len > 0 {
            runs.push(SequenceChange::Changed {
                start: run_start,
                count: run_len,
            });
        }
        runs
    }
}

fn same_sequence<T>(a: &Arc<dyn Sequence<Item = T>>, b: &Arc<dyn Sequence<Item = T>>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// A root sequence flattened together with its expanded children.
///
/// Every expanded root item is immediately followed by its child items. The
/// tree observes its root and children only while it is observed itself;
/// while unobserved it reads their live lengths on every query instead.
///
/// Positions given to [`expand`](Self::expand) and friends are root
/// positions. Positions given to [`Sequence`] methods are outer positions.
pub struct TreeSequence<T> {
    this: Weak<Self>,
    root: Arc<dyn Sequence<Item = T>>,
    children: Box<dyn ChildSource<T>>,
    root_transform: Transform,
    state: Mutex<TreeState<T>>,
    notifier: ChangeNotifier,
}

impl<T: Clone + Send + Sync + 'static> TreeSequence<T> {
    /// Creates a tree over `root`, expanding positions into the sequences
    /// `children` supplies. Nothing is expanded initially.
    pub fn new<C>(root: Arc<dyn Sequence<Item = T>>, children: C) -> Arc<Self>
    where
        C: ChildSource<T> + 'static,
    {
        let root_len = root.len();
        Arc::new_cyclic(|this: &Weak<Self>| {
            let tree = this.clone();
            Self {
                this: this.clone(),
                root,
                children: Box::new(children),
                root_transform: Transform::map(move |outer| {
                    tree.upgrade()?.outer_to_root(outer).ok()
                }),
                state: Mutex::new(TreeState::new(root_len)),
                notifier: ChangeNotifier::new(),
            }
        })
    }

    /// The root sequence.
    pub fn root(&self) -> &Arc<dyn Sequence<Item = T>> {
        &self.root
    }

    /// Expands the root item at `root_position`.
    ///
    /// Emits one insertion covering the child items, directly after the root
    /// item. Does nothing if the position is already expanded.
    pub fn expand(&self, root_position: usize) -> Result<()> {
        let root_len = {
            let state = self.synced_state();
            if state.expanded.contains_key(&root_position) {
                return Ok(());
            }
            state.root_len
        };
        check_position(root_position, root_len)?;

        let sequence = self.children.child_sequence(root_position);
        let item_count = sequence.len();

        let (key, outer, observing) = {
            let mut state = self.state.lock();
            if state.expanded.contains_key(&root_position) {
                return Ok(());
            }
            let key = state.entries.insert_with_key(|key| Entry {
                forward: OffsetSequence::new(sequence.clone(), self.entry_transform(key), 0),
                root_position,
                item_count,
                connection: None,
            });
            state.expanded.insert(root_position, key);
            state.dirty = true;
            (key, state.root_to_outer(root_position), state.observing)
        };

        tracing::debug!(target: targets::TREE, root_position, item_count, "expand");
        self.notifier.notify_inserted(outer + 1, item_count);

        if observing {
            self.attach_entry(key, &sequence);
        }
        Ok(())
    }

    /// Collapses the root item at `root_position`.
    ///
    /// Emits one removal covering the child items. Does nothing if the
    /// position is not expanded.
    pub fn collapse(&self, root_position: usize) {
        let (outer, entry) = {
            let mut state = self.synced_state();
            let Some(&key) = state.expanded.get(&root_position) else {
                return;
            };
            let outer = state.root_to_outer(root_position);
            (outer, state.dispose(key))
        };

        if let Some(id) = entry.connection {
            entry.forward.inner().unobserve(id);
        }
        tracing::debug!(
            target: targets::TREE,
            root_position,
            item_count = entry.item_count,
            "collapse"
        );
        self.notifier.notify_removed(outer + 1, entry.item_count);
    }

    /// Expands or collapses the root item at `root_position`.
    pub fn set_expanded(&self, root_position: usize, expanded: bool) -> Result<()> {
        if expanded {
            self.expand(root_position)
        } else {
            self.collapse(root_position);
            Ok(())
        }
    }

    /// Flips the expansion state, returning the new one.
    pub fn toggle(&self, root_position: usize) -> Result<bool> {
        let expanded = !self.is_expanded(root_position);
        self.set_expanded(root_position, expanded)?;
        Ok(expanded)
    }

    /// Returns `true` if the root item at `root_position` is expanded.
    pub fn is_expanded(&self, root_position: usize) -> bool {
        self.state.lock().expanded.contains_key(&root_position)
    }

    /// Expanded root positions in ascending order.
    pub fn expanded_positions(&self) -> Vec<usize> {
        self.state.lock().expanded.keys().copied().collect()
    }

    /// The child sequence shown below `root_position`, if expanded.
    pub fn expanded_sequence(&self, root_position: usize) -> Option<Arc<dyn Sequence<Item = T>>> {
        let state = self.state.lock();
        let key = state.expanded.get(&root_position)?;
        Some(state.entries[*key].forward.inner().clone())
    }

    /// Collapses every expanded root item, last first.
    pub fn collapse_all(&self) {
        for root_position in self.expanded_positions().into_iter().rev() {
            self.collapse(root_position);
        }
    }

    /// Outer position of the root item at `root_position`.
    pub fn root_to_outer(&self, root_position: usize) -> Result<usize> {
        let mut state = self.synced_state();
        check_position(root_position, state.root_len)?;
        state.rebuild_if_dirty();
        Ok(state.root_to_outer(root_position))
    }

    /// Root position that owns the outer position `outer`.
    pub fn outer_to_root(&self, outer: usize) -> Result<usize> {
        Ok(self.synced_state().group_for(outer)?.root_position)
    }

    /// Resolves the outer position `outer` to a root item or a child.
    pub fn resolve(&self, outer: usize) -> Result<TreePosition> {
        let group = self.synced_state().group_for(outer)?;
        Ok(if outer == group.outer_start {
            TreePosition::Root(group.root_position)
        } else {
            TreePosition::Child {
                root: group.root_position,
                index: outer - group.entry_start(),
            }
        })
    }

    /// The sequence a renderer for `view_type` should be created by.
    ///
    /// View types are routed to the sequence that reported them from
    /// [`view_type`](Sequence::view_type). Unknown view types go to the root.
    pub fn sequence_for_view_type(&self, view_type: ViewType) -> Arc<dyn Sequence<Item = T>> {
        self.state
            .lock()
            .view_types
            .get(&view_type)
            .cloned()
            .unwrap_or_else(|| self.root.clone())
    }

    /// How many times the group index has been rebuilt.
    pub fn rebuild_count(&self) -> usize {
        self.state.lock().rebuilds
    }

    /// Locks the state, first refreshing cached lengths from the live
    /// sequences if nothing is observing them.
    fn synced_state(&self) -> MutexGuard<'_, TreeState<T>> {
        let state = self.state.lock();
        if state.observing {
            return state;
        }
        let sequences: Vec<(EntryKey, Arc<dyn Sequence<Item = T>>)> = state
            .entries
            .iter()
            .map(|(key, entry)| (key, entry.forward.inner().clone()))
            .collect();
        drop(state);

        let root_len = self.root.len();
        let counts: Vec<(EntryKey, usize)> = sequences
            .into_iter()
            .map(|(key, sequence)| (key, sequence.len()))
            .collect();

        let mut state = self.state.lock();
        state.sync_counts(root_len, &counts);
        state
    }

    /// Configures a decorator for the segment owning `outer`.
    fn locate(&self, outer: usize) -> Result<OffsetSequence<T>> {
        let mut state = self.synced_state();
        let group = state.group_for(outer)?;
        if outer == group.outer_start {
            return Ok(OffsetSequence::new(
                self.root.clone(),
                self.root_transform.clone(),
                group.root_start,
            ));
        }
        let Some(entry) = group.entry.and_then(|key| state.entries.get(key)) else {
            invariant_violation("child position in a group without an entry", file!(), line!());
        };
        let mut forward = entry.forward.clone();
        forward.set_offset(group.entry_start());
        Ok(forward)
    }

    /// Maps an outer holder position into the child space of `key`.
    fn entry_position(&self, key: EntryKey, outer: usize) -> Option<usize> {
        let group = self.synced_state().group_for(outer).ok()?;
        (group.entry == Some(key) && outer > group.outer_start).then(|| outer - group.entry_start())
    }

    fn entry_transform(&self, key: EntryKey) -> Transform {
        let tree = self.this.clone();
        Transform::map(move |outer| tree.upgrade()?.entry_position(key, outer))
    }

    fn root_observer(&self) -> Observer {
        let tree = self.this.clone();
        Box::new(move |change| {
            if let Some(tree) = tree.upgrade() {
                tree.on_root_change(*change);
            }
        })
    }

    fn entry_observer(&self, key: EntryKey) -> Observer {
        let tree = self.this.clone();
        Box::new(move |change| {
            if let Some(tree) = tree.upgrade() {
                tree.on_entry_change(key, *change);
            }
        })
    }

    fn attach_entry(&self, key: EntryKey, sequence: &Arc<dyn Sequence<Item = T>>) {
        let id = sequence.observe(self.entry_observer(key));
        let mut state = self.state.lock();
        match state.entries.get_mut(key) {
            Some(entry) if entry.connection.is_none() => entry.connection = Some(id),
            _ => {
                // Collapsed while subscribing.
                drop(state);
                sequence.unobserve(id);
            }
        }
    }

    fn on_root_change(&self, change: SequenceChange) {
        tracing::trace!(target: targets::TREE, ?change, "root change");
        let (changes, detached) = self.state.lock().apply_root_change(change);
        for (sequence, id) in detached {
            sequence.unobserve(id);
        }
        for change in changes {
            self.notifier.notify(change);
        }
    }

    fn on_entry_change(&self, key: EntryKey, change: SequenceChange) {
        let translated = {
            let mut state = self.state.lock();
            let Some(entry) = state.entries.get(key) else {
                tracing::trace!(target: targets::TREE, ?change, "ignoring change of a disposed entry");
                return;
            };
            let root_position = entry.root_position;
            let Some(item_count) = change.apply_to_len(entry.item_count) else {
                invariant_violation(
                    &format!(
                        "child of root position {} removed {} items from a count of {}",
                        root_position,
                        change.count(),
                        entry.item_count
                    ),
                    file!(),
                    line!(),
                );
            };

            let entry_start = state.root_to_outer(root_position) + 1;
            let entry = &mut state.entries[key];
            entry.forward.set_offset(entry_start);
            let translated = entry.forward.translate(change);
            if entry.item_count != item_count {
                entry.item_count = item_count;
                state.dirty = true;
            }
            translated
        };
        tracing::trace!(target: targets::TREE, ?change, ?translated, "entry change");
        self.notifier.notify(translated);
    }
}

impl<T: Clone + Send + Sync + 'static> Observable for TreeSequence<T> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn on_first_observer(&self) {
        let sequences: Vec<(EntryKey, Arc<dyn Sequence<Item = T>>)> = self
            .state
            .lock()
            .entries
            .iter()
            .map(|(key, entry)| (key, entry.forward.inner().clone()))
            .collect();

        let root_connection = self.root.observe(self.root_observer());
        let root_len = self.root.len();
        let connections: Vec<_> = sequences
            .into_iter()
            .map(|(key, sequence)| {
                let id = sequence.observe(self.entry_observer(key));
                let count = sequence.len();
                (key, sequence, id, count)
            })
            .collect();

        let mut stale = Vec::new();
        {
            let mut state = self.state.lock();
            state.observing = true;
            state.root_connection = Some(root_connection);
            state.root_len = root_len;
            for (key, sequence, id, count) in connections {
                match state.entries.get_mut(key) {
                    Some(entry) => {
                        entry.connection = Some(id);
                        entry.item_count = count;
                    }
                    None => stale.push((sequence, id)),
                }
            }
            state.dirty = true;
        }
        for (sequence, id) in stale {
            sequence.unobserve(id);
        }
        tracing::debug!(target: targets::TREE, "observing root and entries");
    }

    fn on_last_observer(&self) {
        let (root_connection, detached) = {
            let mut state = self.state.lock();
            state.observing = false;
            let detached: Detached<T> = state
                .entries
                .values_mut()
                .filter_map(|entry| {
                    entry
                        .connection
                        .take()
                        .map(|id| (entry.forward.inner().clone(), id))
                })
                .collect();
            (state.root_connection.take(), detached)
        };
        if let Some(id) = root_connection {
            self.root.unobserve(id);
        }
        for (sequence, id) in detached {
            sequence.unobserve(id);
        }
        tracing::debug!(target: targets::TREE, "stopped observing root and entries");
    }
}

impl<T: Clone + Send + Sync + 'static> Sequence for TreeSequence<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.synced_state().len()
    }

    fn item(&self, position: usize) -> Result<T> {
        self.locate(position)?.item(position)
    }

    fn view_type(&self, position: usize) -> Result<ViewType> {
        let adapter = self.locate(position)?;
        let view_type = adapter.view_type(position)?;
        self.state
            .lock()
            .view_types
            .insert(view_type, adapter.inner().clone());
        Ok(view_type)
    }

    fn item_id(&self, position: usize) -> Result<Option<ItemId>> {
        self.locate(position)?.item_id(position)
    }

    fn is_enabled(&self, position: usize) -> Result<bool> {
        self.locate(position)?.is_enabled(position)
    }

    fn bind(&self, holder: &Arc<dyn Holder>) -> Result<()> {
        let Some(position) = holder.position() else {
            return Ok(());
        };
        let adapter = self.locate(position)?;
        let offset_holder = {
            let mut state = self.state.lock();
            let bound = state
                .holders
                .entry(holder.handle())
                .or_insert_with(|| BoundHolder {
                    holder: Arc::new(OffsetHolder::new(holder.clone())),
                    sequence: adapter.inner().clone(),
                });
            bound.sequence = adapter.inner().clone();
            bound.holder.clone()
        };
        adapter.bind(&offset_holder)
    }

    fn recycle(&self, handle: HolderHandle) {
        let bound = self.state.lock().holders.remove(&handle);
        if let Some(bound) = bound {
            bound.sequence.recycle(handle);
        }
    }
}

impl<T> Drop for TreeSequence<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        if let Some(id) = state.root_connection.take() {
            self.root.unobserve(id);
        }
        for entry in state.entries.values_mut() {
            if let Some(id) = entry.connection.take() {
                entry.forward.inner().unobserve(id);
            }
        }
    }
}

static_assertions::assert_impl_all!(TreeSequence<String>: Send, Sync);
