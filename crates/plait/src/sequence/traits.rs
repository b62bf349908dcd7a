//! Core traits for composable sequences.
//!
//! This module defines the contract every sequence implements, leaf or
//! decorator, together with the small identity types that travel alongside
//! items: view types, item ids and renderer holders.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use plait_core::{ConnectionId, Result, check_position};

use super::change::{ChangeNotifier, SequenceChange};

/// Counter for generating unique view types.
static VIEW_TYPE_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Opaque token identifying how an item should be rendered.
///
/// View types are compared by identity. A decorator that resurfaces an item
/// from an inner sequence keeps the inner view type so that a later request
/// to create a renderer for it can be routed back to that sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewType(u64);

impl ViewType {
    /// Allocates a new, unique view type.
    pub fn new() -> Self {
        Self(VIEW_TYPE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ViewType {
    fn default() -> Self {
        Self::new()
    }
}

/// Stable identity of an item, used for animation and diffing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemId(pub u64);

/// Stable integer handle issued by the rendering layer for one renderer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HolderHandle(pub u64);

/// A renderer slot as seen by a sequence during binding.
///
/// The position is read lazily: a binder may keep the holder and ask for its
/// position later (for example from a click handler), after items around it
/// have been inserted or removed without rebinding.
pub trait Holder: Send + Sync {
    /// The handle the rendering layer issued for this slot.
    fn handle(&self) -> HolderHandle;

    /// Current position of the slot in the coordinate space of the sequence
    /// it was handed to, or `None` if it no longer has one.
    fn position(&self) -> Option<usize>;
}

/// Boxed observer callback.
pub type Observer = Box<dyn Fn(&SequenceChange) + Send + Sync>;

/// Observer registration for a sequence.
///
/// The 0→1 and 1→0 observer transitions are the hook points where a sequence
/// may become active, e.g. subscribe to its own sources or start loading.
pub trait Observable: Send + Sync {
    /// The notifier observers are connected to.
    fn notifier(&self) -> &ChangeNotifier;

    /// Called after the first observer was registered.
    ///
    /// Invoked by [`observe`](Observable::observe); not meant to be called directly.
    fn on_first_observer(&self) {}

    /// Called after the last observer was unregistered.
    ///
    /// Invoked by [`unobserve`](Observable::unobserve); not meant to be called directly.
    fn on_last_observer(&self) {}

    /// Registers an observer, returning its connection id.
    fn observe(&self, observer: Observer) -> ConnectionId {
        let id = self.notifier().connect(observer);
        if self.notifier().observer_count() == 1 {
            self.on_first_observer();
        }
        id
    }

    /// Unregisters an observer. Returns `true` if it was registered.
    fn unobserve(&self, id: ConnectionId) -> bool {
        let removed = self.notifier().disconnect(id);
        if removed && self.notifier().observer_count() == 0 {
            self.on_last_observer();
        }
        removed
    }

    /// Number of registered observers.
    fn observer_count(&self) -> usize {
        self.notifier().observer_count()
    }

    /// Returns `true` while at least one observer is registered.
    fn is_observed(&self) -> bool {
        self.observer_count() > 0
    }
}

/// An ordered, randomly indexable, observable collection.
///
/// # Implementation Requirements
///
/// At minimum, implement:
/// - [`len`](Sequence::len) - Number of items
/// - [`item`](Sequence::item) - Item at a position
/// - [`view_type`](Sequence::view_type) - How the item at a position renders
///
/// Every positional method fails with `OutOfRange` for positions outside
/// `[0, len)`. Mutations must be announced through the notifier before the
/// next query observes them, so that `len()` always equals the sum implied
/// by the changes emitted so far.
///
/// # Example
///
/// ```
/// use plait::sequence::{ChangeNotifier, Observable, Sequence, ViewType};
/// use plait_core::{Result, check_position};
///
/// struct Digits {
///     notifier: ChangeNotifier,
///     view_type: ViewType,
/// }
///
/// impl Observable for Digits {
///     fn notifier(&self) -> &ChangeNotifier {
///         &self.notifier
///     }
/// }
///
/// impl Sequence for Digits {
///     type Item = u8;
///
///     fn len(&self) -> usize {
///         10
///     }
///
///     fn item(&self, position: usize) -> Result<u8> {
///         check_position(position, 10)?;
///         Ok(position as u8)
///     }
///
///     fn view_type(&self, position: usize) -> Result<ViewType> {
///         check_position(position, 10)?;
///         Ok(self.view_type)
///     }
/// }
/// ```
pub trait Sequence: Observable {
    /// The item type.
    type Item: Clone;

    /// Returns the number of items.
    fn len(&self) -> usize;

    /// Returns `true` if there are no items.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the item at `position`.
    fn item(&self, position: usize) -> Result<Self::Item>;

    /// Returns the view type of the item at `position`.
    fn view_type(&self, position: usize) -> Result<ViewType>;

    /// Returns the stable identity of the item at `position`, or `None` if
    /// the sequence has no stable identities.
    fn item_id(&self, position: usize) -> Result<Option<ItemId>> {
        check_position(position, self.len())?;
        Ok(None)
    }

    /// Returns `true` if [`item_id`](Sequence::item_id) yields stable ids.
    fn has_stable_ids(&self) -> bool {
        false
    }

    /// Returns `true` if the item at `position` can be interacted with.
    fn is_enabled(&self, position: usize) -> Result<bool> {
        check_position(position, self.len())?;
        Ok(true)
    }

    /// Binds the item at the holder's current position to the holder.
    ///
    /// The default does nothing.
    fn bind(&self, _holder: &Arc<dyn Holder>) -> Result<()> {
        Ok(())
    }

    /// Releases any per-holder state after the rendering layer recycled the
    /// slot identified by `handle`.
    fn recycle(&self, _handle: HolderHandle) {}
}

/// RAII observer registration that unobserves when dropped.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plait::sequence::{ArraySequence, Subscription};
///
/// let list = Arc::new(ArraySequence::new(vec![1, 2, 3]));
/// let subscription = Subscription::new(list.clone(), |change| {
///     println!("{:?}", change);
/// });
/// list.push(4);
/// drop(subscription);
/// ```
pub struct Subscription {
    target: Weak<dyn Observable>,
    id: Option<ConnectionId>,
}

impl Subscription {
    /// Registers `observer` on `target` for as long as the subscription lives.
    pub fn new<F>(target: Arc<dyn Observable>, observer: F) -> Self
    where
        F: Fn(&SequenceChange) + Send + Sync + 'static,
    {
        let id = target.observe(Box::new(observer));
        Self {
            target: Arc::downgrade(&target),
            id: Some(id),
        }
    }

    /// The connection id of the registration.
    pub fn id(&self) -> Option<ConnectionId> {
        self.id
    }

    /// Unobserves now instead of on drop.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(id) = self.id.take() {
            if let Some(target) = self.target.upgrade() {
                target.unobserve(id);
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::AtomicUsize;

    struct Hooked {
        notifier: ChangeNotifier,
        first: AtomicUsize,
        last: AtomicUsize,
    }

    impl Observable for Hooked {
        fn notifier(&self) -> &ChangeNotifier {
            &self.notifier
        }

        fn on_first_observer(&self) {
            self.first.fetch_add(1, Ordering::SeqCst);
        }

        fn on_last_observer(&self) {
            self.last.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn hooked() -> Arc<Hooked> {
        Arc::new(Hooked {
            notifier: ChangeNotifier::new(),
            first: AtomicUsize::new(0),
            last: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_view_types_are_unique() {
        let a = ViewType::new();
        let b = ViewType::new();
        assert_ne!(a, b);
        assert_eq!(a, a);
    }

    #[test]
    fn test_observer_transition_hooks() {
        let target = hooked();

        let a = target.observe(Box::new(|_| {}));
        let b = target.observe(Box::new(|_| {}));
        assert_eq!(target.first.load(Ordering::SeqCst), 1);
        assert!(target.is_observed());

        assert!(target.unobserve(a));
        assert_eq!(target.last.load(Ordering::SeqCst), 0);
        assert!(target.unobserve(b));
        assert_eq!(target.last.load(Ordering::SeqCst), 1);
        assert!(!target.unobserve(b));
        assert_eq!(target.last.load(Ordering::SeqCst), 1);

        target.observe(Box::new(|_| {}));
        assert_eq!(target.first.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_subscription_unobserves_on_drop() {
        let target = hooked();
        let received = Arc::new(Mutex::new(Vec::new()));

        let recv = received.clone();
        let subscription = Subscription::new(target.clone(), move |change| recv.lock().push(*change));
        assert!(subscription.id().is_some());
        target.notifier().notify_inserted(0, 1);

        drop(subscription);
        target.notifier().notify_inserted(0, 1);

        assert_eq!(received.lock().len(), 1);
        assert_eq!(target.observer_count(), 0);
        assert_eq!(target.last.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscription_outliving_target() {
        let target = hooked();
        let subscription = Subscription::new(target.clone(), |_| {});
        drop(target);
        subscription.cancel();
    }
}
