//! Concatenation of sequences.

use parking_lot::{Mutex, MutexGuard};
use slotmap::{SlotMap, new_key_type};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

use plait_core::logging::targets;
use plait_core::{ConnectionId, PlaitError, Result, check_position, invariant};

use super::change::{ChangeNotifier, SequenceChange};
use super::offset::{OffsetHolder, OffsetSequence, Transform};
use super::traits::{Holder, HolderHandle, ItemId, Observable, Sequence, ViewType};

new_key_type! {
    struct PartKey;
}

struct Part<T> {
    /// Offset is the part's first outer position.
    forward: OffsetSequence<T>,
    item_count: usize,
    connection: Option<ConnectionId>,
}

struct ConcatState<T> {
    parts: SlotMap<PartKey, Part<T>>,
    order: Vec<PartKey>,
    observing: bool,
    holders: HashMap<HolderHandle, (Arc<OffsetHolder>, Arc<dyn Sequence<Item = T>>)>,
}

impl<T: Clone + 'static> ConcatState<T> {
    fn len(&self) -> usize {
        self.order.last().map_or(0, |key| {
            let part = &self.parts[*key];
            part.forward.offset() + part.item_count
        })
    }

    /// Recomputes offsets from the part at `index` on.
    fn reflow(&mut self, index: usize) {
        let mut offset = match index.checked_sub(1) {
            Some(previous) => {
                let part = &self.parts[self.order[previous]];
                part.forward.offset() + part.item_count
            }
            None => 0,
        };
        for key in &self.order[index..] {
            let part = &mut self.parts[*key];
            part.forward.set_offset(offset);
            offset += part.item_count;
        }
    }

    /// Index into `order` of the part holding `outer`.
    fn part_index(&self, outer: usize) -> Result<usize> {
        check_position(outer, self.len())?;
        Ok(self
            .order
            .partition_point(|key| self.parts[*key].forward.offset() <= outer)
            - 1)
    }
}

/// Parts shown one after another as a single sequence.
///
/// Each part is wrapped in its own [`OffsetSequence`] whose offset is the
/// part's first outer position; the part's changes are forwarded through it.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plait::sequence::{ArraySequence, ConcatSequence, Sequence};
///
/// let header: Arc<dyn Sequence<Item = &str>> = Arc::new(ArraySequence::new(vec!["title"]));
/// let body = Arc::new(ArraySequence::new(vec!["a", "b"]));
/// let page = ConcatSequence::new(vec![header]);
/// page.push_part(body.clone());
///
/// body.push("c");
/// assert_eq!(page.len(), 4);
/// assert_eq!(page.item(3).unwrap(), "c");
/// ```
pub struct ConcatSequence<T> {
    this: Weak<Self>,
    state: Mutex<ConcatState<T>>,
    notifier: ChangeNotifier,
}

impl<T: Clone + Send + Sync + 'static> ConcatSequence<T> {
    /// Concatenates `parts` in order.
    pub fn new(parts: Vec<Arc<dyn Sequence<Item = T>>>) -> Arc<Self> {
        let concat = Arc::new_cyclic(|this| Self {
            this: this.clone(),
            state: Mutex::new(ConcatState {
                parts: SlotMap::with_key(),
                order: Vec::new(),
                observing: false,
                holders: HashMap::new(),
            }),
            notifier: ChangeNotifier::new(),
        });
        {
            let mut state = concat.state.lock();
            for sequence in parts {
                let item_count = sequence.len();
                let key = state.parts.insert_with_key(|key| Part {
                    forward: OffsetSequence::new(sequence, concat.part_transform(key), 0),
                    item_count,
                    connection: None,
                });
                state.order.push(key);
            }
            state.reflow(0);
        }
        concat
    }

    /// Number of parts.
    pub fn part_count(&self) -> usize {
        self.state.lock().order.len()
    }

    /// The part at `index`.
    pub fn part(&self, index: usize) -> Option<Arc<dyn Sequence<Item = T>>> {
        let state = self.state.lock();
        let key = state.order.get(index)?;
        Some(state.parts[*key].forward.inner().clone())
    }

    /// Appends a part.
    pub fn push_part(&self, sequence: Arc<dyn Sequence<Item = T>>) {
        self.place(None, sequence);
    }

    /// Inserts a part so that it becomes the part at `index`.
    pub fn insert_part(&self, index: usize, sequence: Arc<dyn Sequence<Item = T>>) -> Result<()> {
        let parts = self.part_count();
        if index > parts {
            return Err(PlaitError::out_of_range(index, parts));
        }
        self.place(Some(index), sequence);
        Ok(())
    }

    /// Inserts `sequence` at `index`, or after the last part.
    fn place(&self, index: Option<usize>, sequence: Arc<dyn Sequence<Item = T>>) {
        let item_count = sequence.len();
        let (index, key, start, observing) = {
            let mut state = self.synced_state();
            let index = index.unwrap_or(state.order.len());
            invariant!(
                index <= state.order.len(),
                "part index {} beyond {} parts",
                index,
                state.order.len()
            );
            let key = state.parts.insert_with_key(|key| Part {
                forward: OffsetSequence::new(sequence.clone(), self.part_transform(key), 0),
                item_count,
                connection: None,
            });
            state.order.insert(index, key);
            state.reflow(index);
            (index, key, state.parts[key].forward.offset(), state.observing)
        };
        tracing::debug!(target: targets::CONCAT, index, item_count, "insert part");
        self.notifier.notify_inserted(start, item_count);
        if observing {
            self.attach(key, &sequence);
        }
    }

    /// Removes the part at `index`, returning it.
    pub fn remove_part(&self, index: usize) -> Result<Arc<dyn Sequence<Item = T>>> {
        let part = {
            let mut state = self.synced_state();
            check_position(index, state.order.len())?;
            let key = state.order.remove(index);
            let Some(part) = state.parts.remove(key) else {
                plait_core::error::invariant_violation("ordered part is missing", file!(), line!());
            };
            state.reflow(index);
            part
        };
        let sequence = part.forward.inner().clone();
        if let Some(id) = part.connection {
            sequence.unobserve(id);
        }
        tracing::debug!(target: targets::CONCAT, index, item_count = part.item_count, "remove part");
        self.notifier
            .notify_removed(part.forward.offset(), part.item_count);
        Ok(sequence)
    }

    fn part_transform(&self, key: PartKey) -> Transform {
        let concat = self.this.clone();
        Transform::map(move |outer| {
            let concat = concat.upgrade()?;
            let state = concat.synced_state();
            let part = state.parts.get(key)?;
            let inner = outer.checked_sub(part.forward.offset())?;
            (inner < part.item_count).then_some(inner)
        })
    }

    fn synced_state(&self) -> MutexGuard<'_, ConcatState<T>> {
        let state = self.state.lock();
        if state.observing {
            return state;
        }
        let sequences: Vec<_> = state
            .order
            .iter()
            .map(|key| (*key, state.parts[*key].forward.inner().clone()))
            .collect();
        drop(state);
        let counts: Vec<_> = sequences
            .into_iter()
            .map(|(key, sequence)| (key, sequence.len()))
            .collect();

        let mut state = self.state.lock();
        let mut changed = false;
        for (key, count) in counts {
            if let Some(part) = state.parts.get_mut(key) {
                changed |= part.item_count != count;
                part.item_count = count;
            }
        }
        if changed {
            state.reflow(0);
        }
        state
    }

    fn locate(&self, outer: usize) -> Result<OffsetSequence<T>> {
        let state = self.synced_state();
        let index = state.part_index(outer)?;
        Ok(state.parts[state.order[index]].forward.clone())
    }

    fn attach(&self, key: PartKey, sequence: &Arc<dyn Sequence<Item = T>>) {
        let concat = self.this.clone();
        let id = sequence.observe(Box::new(move |change| {
            if let Some(concat) = concat.upgrade() {
                concat.on_part_change(key, *change);
            }
        }));
        let mut state = self.state.lock();
        match state.parts.get_mut(key) {
            Some(part) if part.connection.is_none() => part.connection = Some(id),
            _ => {
                drop(state);
                sequence.unobserve(id);
            }
        }
    }

    fn on_part_change(&self, key: PartKey, change: SequenceChange) {
        let translated = {
            let mut state = self.state.lock();
            let Some(index) = state.order.iter().position(|ordered| *ordered == key) else {
                tracing::trace!(target: targets::CONCAT, ?change, "ignoring change of a removed part");
                return;
            };
            let part = &mut state.parts[key];
            let Some(item_count) = change.apply_to_len(part.item_count) else {
                plait_core::error::invariant_violation(
                    &format!(
                        "part {} removed {} items from a count of {}",
                        index,
                        change.count(),
                        part.item_count
                    ),
                    file!(),
                    line!(),
                );
            };
            let translated = part.forward.translate(change);
            if part.item_count != item_count {
                part.item_count = item_count;
                state.reflow(index + 1);
            }
            translated
        };
        tracing::trace!(target: targets::CONCAT, ?change, ?translated, "part change");
        self.notifier.notify(translated);
    }
}

impl<T: Clone + Send + Sync + 'static> Observable for ConcatSequence<T> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    fn on_first_observer(&self) {
        let sequences: Vec<_> = {
            let state = self.state.lock();
            state
                .order
                .iter()
                .map(|key| (*key, state.parts[*key].forward.inner().clone()))
                .collect()
        };
        // Counts are refreshed before the flag flips so they start out live.
        drop(self.synced_state());
        self.state.lock().observing = true;
        for (key, sequence) in sequences {
            self.attach(key, &sequence);
        }
    }

    fn on_last_observer(&self) {
        let detached: Vec<_> = {
            let mut state = self.state.lock();
            state.observing = false;
            state
                .parts
                .values_mut()
                .filter_map(|part| {
                    part.connection
                        .take()
                        .map(|id| (part.forward.inner().clone(), id))
                })
                .collect()
        };
        for (sequence, id) in detached {
            sequence.unobserve(id);
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Sequence for ConcatSequence<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.synced_state().len()
    }

    fn item(&self, position: usize) -> Result<T> {
        self.locate(position)?.item(position)
    }

    fn view_type(&self, position: usize) -> Result<ViewType> {
        self.locate(position)?.view_type(position)
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
            let (offset_holder, sequence) = state
                .holders
                .entry(holder.handle())
                .or_insert_with(|| {
                    (
                        Arc::new(OffsetHolder::new(holder.clone())),
                        adapter.inner().clone(),
                    )
                });
            *sequence = adapter.inner().clone();
            offset_holder.clone()
        };
        adapter.bind(&offset_holder)
    }

    fn recycle(&self, handle: HolderHandle) {
        let bound = self.state.lock().holders.remove(&handle);
        if let Some((_, sequence)) = bound {
            sequence.recycle(handle);
        }
    }
}

impl<T> Drop for ConcatSequence<T> {
    fn drop(&mut self) {
        for part in self.state.get_mut().parts.values_mut() {
            if let Some(id) = part.connection.take() {
                part.forward.inner().unobserve(id);
            }
        }
    }
}

static_assertions::assert_impl_all!(ConcatSequence<String>: Send, Sync);
