//! In-memory leaf sequence.
//!
//! `ArraySequence<T>` is the simplest [`Sequence`]: a vector of items that
//! announces each of its mutations as a single range change.

use parking_lot::RwLock;
use std::sync::Arc;

use plait_core::{PlaitError, Result, check_position, check_range};

use super::change::ChangeNotifier;
use super::traits::{Holder, ItemId, Observable, Sequence, ViewType};

/// Type alias for an item id extractor.
pub type IdExtractor<T> = Arc<dyn Fn(&T) -> ItemId + Send + Sync>;

/// Type alias for an enabled-state extractor.
pub type EnabledExtractor<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Type alias for a binder invoked by [`Sequence::bind`].
pub type Binder<T> = Arc<dyn Fn(&T, &Arc<dyn Holder>) + Send + Sync>;

/// A vector-backed sequence.
///
/// # Example
///
/// ```
/// use plait::sequence::{ArraySequence, Sequence};
///
/// let fruits = ArraySequence::new(vec!["apple", "banana"]);
/// fruits.push("cherry");
/// assert_eq!(fruits.len(), 3);
/// assert_eq!(fruits.item(2).unwrap(), "cherry");
/// ```
pub struct ArraySequence<T> {
    items: RwLock<Vec<T>>,
    view_type: ViewType,
    id_extractor: Option<IdExtractor<T>>,
    enabled_extractor: Option<EnabledExtractor<T>>,
    binder: Option<Binder<T>>,
    notifier: ChangeNotifier,
}

impl<T: Clone + Send + Sync + 'static> ArraySequence<T> {
    /// Creates a sequence holding `items`, rendered with a fresh view type.
    pub fn new(items: Vec<T>) -> Self {
        Self {
            items: RwLock::new(items),
            view_type: ViewType::new(),
            id_extractor: None,
            enabled_extractor: None,
            binder: None,
            notifier: ChangeNotifier::new(),
        }
    }

    /// Creates an empty sequence.
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Uses `view_type` for every item.
    pub fn with_view_type(mut self, view_type: ViewType) -> Self {
        self.view_type = view_type;
        self
    }

    /// Derives stable item ids with `extractor`.
    pub fn with_id_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&T) -> ItemId + Send + Sync + 'static,
    {
        self.id_extractor = Some(Arc::new(extractor));
        self
    }

    /// Derives the enabled state of each item with `extractor`.
    pub fn with_enabled_extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.enabled_extractor = Some(Arc::new(extractor));
        self
    }

    /// Binds items to renderer holders with `binder`.
    pub fn with_binder<F>(mut self, binder: F) -> Self
    where
        F: Fn(&T, &Arc<dyn Holder>) + Send + Sync + 'static,
    {
        self.binder = Some(Arc::new(binder));
        self
    }

    /// The view type shared by all items.
    pub fn item_view_type(&self) -> ViewType {
        self.view_type
    }

    /// Appends an item to the end of the sequence.
    pub fn push(&self, item: T) {
        let position = {
            let mut items = self.items.write();
            items.push(item);
            items.len() - 1
        };
        self.notifier.notify_inserted(position, 1);
    }

    /// Inserts an item at `position`.
    pub fn insert(&self, position: usize, item: T) -> Result<()> {
        self.insert_all(position, std::iter::once(item))
    }

    /// Inserts all `new_items` so that the first one lands at `position`.
    pub fn insert_all<I>(&self, position: usize, new_items: I) -> Result<()>
    where
        I: IntoIterator<Item = T>,
    {
        let count = {
            let mut items = self.items.write();
            if position > items.len() {
                return Err(PlaitError::out_of_range(position, items.len()));
            }
            let tail = items.split_off(position);
            items.extend(new_items);
            let count = items.len() - position;
            items.extend(tail);
            count
        };
        self.notifier.notify_inserted(position, count);
        Ok(())
    }

    /// Removes and returns the item at `position`.
    pub fn remove(&self, position: usize) -> Result<T> {
        let item = {
            let mut items = self.items.write();
            check_position(position, items.len())?;
            items.remove(position)
        };
        self.notifier.notify_removed(position, 1);
        Ok(item)
    }

    /// Removes `count` items starting at `start`.
    pub fn remove_range(&self, start: usize, count: usize) -> Result<Vec<T>> {
        let removed: Vec<T> = {
            let mut items = self.items.write();
            check_range(start, count, items.len())?;
            items.drain(start..start + count).collect()
        };
        self.notifier.notify_removed(start, count);
        Ok(removed)
    }

    /// Replaces the item at `position`, returning the previous one.
    pub fn set(&self, position: usize, item: T) -> Result<T> {
        let previous = {
            let mut items = self.items.write();
            check_position(position, items.len())?;
            std::mem::replace(&mut items[position], item)
        };
        self.notifier.notify_changed(position, 1);
        Ok(previous)
    }

    /// Provides mutable access to an item via a closure, then announces the
    /// change.
    pub fn modify<F, R>(&self, position: usize, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        let result = {
            let mut items = self.items.write();
            check_position(position, items.len())?;
            f(&mut items[position])
        };
        self.notifier.notify_changed(position, 1);
        Ok(result)
    }

    /// Moves `count` items starting at `from` so that the first one ends up
    /// at `to`.
    pub fn move_range(&self, from: usize, to: usize, count: usize) -> Result<()> {
        {
            let mut items = self.items.write();
            let len = items.len();
            check_range(from, count, len)?;
            check_range(to, count, len)?;
            let block: Vec<T> = items.drain(from..from + count).collect();
            let tail = items.split_off(to);
            items.extend(block);
            items.extend(tail);
        }
        self.notifier.notify_moved(from, to, count);
        Ok(())
    }

    /// Replaces every item.
    ///
    /// Announced as a removal of the old contents followed by an insertion
    /// of the new ones.
    pub fn replace_all(&self, new_items: Vec<T>) {
        self.clear();
        let count = new_items.len();
        *self.items.write() = new_items;
        self.notifier.notify_inserted(0, count);
    }

    /// Removes every item.
    pub fn clear(&self) {
        let count = {
            let mut items = self.items.write();
            let count = items.len();
            items.clear();
            count
        };
        self.notifier.notify_removed(0, count);
    }

    /// Returns a reference to the items (read-only access).
    pub fn items(&self) -> impl std::ops::Deref<Target = Vec<T>> + '_ {
        self.items.read()
    }

    /// Returns a copy of the items.
    pub fn to_vec(&self) -> Vec<T> {
        self.items.read().clone()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable for ArraySequence<T> {
    fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }
}

impl<T: Clone + Send + Sync + 'static> Sequence for ArraySequence<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.items.read().len()
    }

    fn item(&self, position: usize) -> Result<T> {
        let items = self.items.read();
        check_position(position, items.len())?;
        Ok(items[position].clone())
    }

    fn view_type(&self, position: usize) -> Result<ViewType> {
        check_position(position, self.len())?;
        Ok(self.view_type)
    }

    fn item_id(&self, position: usize) -> Result<Option<ItemId>> {
        let items = self.items.read();
        check_position(position, items.len())?;
        Ok(self.id_extractor.as_ref().map(|extract| extract(&items[position])))
    }

    fn has_stable_ids(&self) -> bool {
        self.id_extractor.is_some()
    }

    fn is_enabled(&self, position: usize) -> Result<bool> {
        let items = self.items.read();
        check_position(position, items.len())?;
        Ok(self
            .enabled_extractor
            .as_ref()
            .is_none_or(|enabled| enabled(&items[position])))
    }

    fn bind(&self, holder: &Arc<dyn Holder>) -> Result<()> {
        let Some(binder) = &self.binder else {
            return Ok(());
        };
        let Some(position) = holder.position() else {
            return Ok(());
        };
        let item = self.item(position)?;
        binder(&item, holder);
        Ok(())
    }
}

static_assertions::assert_impl_all!(ArraySequence<String>: Send, Sync);
