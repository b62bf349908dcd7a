//! Loading collaborator boundary.
//!
//! Sequences that fill themselves in the background implement
//! [`LoadingSequence`] on top of the plain [`Sequence`] contract. Nothing in
//! the composites depends on it: loading and error state is consumed by the
//! independent delegates in this module, which decide whether an empty-state
//! or loading indicator should be visible.
//!
//! Errors travel through [`LoadingSequence::errors`] untouched. They never
//! pass through position translation.

use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};

use plait_core::logging::targets;
use plait_core::{ConnectionId, Signal};

use super::traits::Sequence;

/// An error reported by a loading sequence.
pub type LoadError = Arc<dyn std::error::Error + Send + Sync>;

/// A sequence whose contents arrive asynchronously.
///
/// Implementations marshal their change notifications onto the owner thread
/// before delivering them; the same holds for the two signals here.
pub trait LoadingSequence: Sequence {
    /// Whether a load is in progress.
    fn is_loading(&self) -> bool;

    /// Emitted with the new value whenever [`is_loading`](Self::is_loading)
    /// flips.
    fn loading_changed(&self) -> &Signal<bool>;

    /// Emitted for every load failure.
    fn errors(&self) -> &Signal<LoadError>;
}

/// Whether the empty-state indicator shows while a load is running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadingPolicy {
    /// Show it whenever the data is empty.
    Show,
    /// Show it only when the data is empty and not loading.
    #[default]
    Hide,
}

impl LoadingPolicy {
    /// Whether the empty indicator should be visible for `data`.
    pub fn should_show<S: LoadingSequence + ?Sized>(self, data: &S) -> bool {
        match self {
            Self::Show => data.is_empty(),
            Self::Hide => !data.is_loading() && data.is_empty(),
        }
    }
}

type Predicate<T> = Box<dyn Fn(&dyn LoadingSequence<Item = T>) -> bool + Send + Sync>;

struct Watch<T: Clone> {
    data: Arc<dyn LoadingSequence<Item = T>>,
    predicate: Predicate<T>,
    visible: Mutex<bool>,
    changed: Signal<bool>,
    label: &'static str,
}

impl<T: Clone> Watch<T> {
    fn refresh(&self) {
        let now = (self.predicate)(self.data.as_ref());
        {
            let mut visible = self.visible.lock();
            if *visible == now {
                return;
            }
            *visible = now;
        }
        tracing::debug!(target: targets::LOADING, delegate = self.label, visible = now, "visibility changed");
        self.changed.emit(now);
    }
}

/// Tracks one visibility predicate over a loading sequence.
///
/// Subscribes to the data's change stream and its loading signal, and
/// re-evaluates the predicate on either.
struct VisibilityWatch<T: Clone> {
    watch: Arc<Watch<T>>,
    data_connection: ConnectionId,
    loading_connection: ConnectionId,
}

impl<T: Clone + 'static> VisibilityWatch<T> {
    fn new(
        data: Arc<dyn LoadingSequence<Item = T>>,
        label: &'static str,
        predicate: Predicate<T>,
    ) -> Self {
        let initial = predicate(data.as_ref());
        let watch = Arc::new(Watch {
            data,
            predicate,
            visible: Mutex::new(initial),
            changed: Signal::new(),
            label,
        });

        let weak: Weak<Watch<T>> = Arc::downgrade(&watch);
        let data_connection = watch.data.observe(Box::new(move |_| {
            if let Some(watch) = weak.upgrade() {
                watch.refresh();
            }
        }));
        let weak: Weak<Watch<T>> = Arc::downgrade(&watch);
        let loading_connection = watch.data.loading_changed().connect(move |_| {
            if let Some(watch) = weak.upgrade() {
                watch.refresh();
            }
        });

        Self {
            watch,
            data_connection,
            loading_connection,
        }
    }
}

impl<T: Clone> VisibilityWatch<T> {
    fn is_visible(&self) -> bool {
        *self.watch.visible.lock()
    }
}

impl<T: Clone> Drop for VisibilityWatch<T> {
    fn drop(&mut self) {
        self.watch.data.unobserve(self.data_connection);
        self.watch
            .data
            .loading_changed()
            .disconnect(self.loading_connection);
    }
}

/// Decides whether an empty-state indicator should be shown for a loading
/// sequence.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plait::sequence::{EmptyStateDelegate, LoadingPolicy};
/// use plait::testing::ScriptedLoader;
///
/// let loader = Arc::new(ScriptedLoader::<u32>::new());
/// loader.set_loading(true);
///
/// let empty = EmptyStateDelegate::new(loader.clone(), LoadingPolicy::Hide);
/// assert!(!empty.is_visible());
///
/// loader.set_loading(false);
/// assert!(empty.is_visible());
/// ```
pub struct EmptyStateDelegate<T: Clone> {
    policy: LoadingPolicy,
    watch: VisibilityWatch<T>,
}

impl<T: Clone + 'static> EmptyStateDelegate<T> {
    /// Starts watching `data`.
    pub fn new(data: Arc<dyn LoadingSequence<Item = T>>, policy: LoadingPolicy) -> Self {
        let watch = VisibilityWatch::new(
            data,
            "empty",
            Box::new(move |data| policy.should_show(data)),
        );
        Self { policy, watch }
    }
}

impl<T: Clone> EmptyStateDelegate<T> {
    /// The configured policy.
    pub fn policy(&self) -> LoadingPolicy {
        self.policy
    }

    /// Whether the empty indicator is currently visible.
    pub fn is_visible(&self) -> bool {
        self.watch.is_visible()
    }

    /// Emitted with the new visibility on every transition.
    pub fn visibility_changed(&self) -> &Signal<bool> {
        &self.watch.watch.changed
    }

    /// The watched data.
    pub fn data(&self) -> &Arc<dyn LoadingSequence<Item = T>> {
        &self.watch.watch.data
    }
}

impl<T: Clone> fmt::Debug for EmptyStateDelegate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmptyStateDelegate")
            .field("policy", &self.policy)
            .field("visible", &self.is_visible())
            .finish()
    }
}

/// Decides whether a loading indicator should be shown.
pub struct LoadingStateDelegate<T: Clone> {
    watch: VisibilityWatch<T>,
}

impl<T: Clone + 'static> LoadingStateDelegate<T> {
    /// Starts watching `data`.
    pub fn new(data: Arc<dyn LoadingSequence<Item = T>>) -> Self {
        let watch = VisibilityWatch::new(data, "loading", Box::new(|data| data.is_loading()));
        Self { watch }
    }
}

impl<T: Clone> LoadingStateDelegate<T> {
    /// Whether the loading indicator is currently visible.
    pub fn is_visible(&self) -> bool {
        self.watch.is_visible()
    }

    /// Emitted with the new visibility on every transition.
    pub fn visibility_changed(&self) -> &Signal<bool> {
        &self.watch.watch.changed
    }

    /// The watched data.
    pub fn data(&self) -> &Arc<dyn LoadingSequence<Item = T>> {
        &self.watch.watch.data
    }
}

impl<T: Clone> fmt::Debug for LoadingStateDelegate<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadingStateDelegate")
            .field("visible", &self.is_visible())
            .finish()
    }
}

static_assertions::assert_impl_all!(EmptyStateDelegate<String>: Send, Sync);
static_assertions::assert_impl_all!(LoadingStateDelegate<String>: Send, Sync);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequence::Observable;
    use crate::testing::ScriptedLoader;

    fn record(signal: &Signal<bool>) -> Arc<Mutex<Vec<bool>>> {
        let received = Arc::new(Mutex::new(Vec::new()));
        let recv = received.clone();
        signal.connect(move |visible| recv.lock().push(*visible));
        received
    }

    #[test]
    fn test_policy_truth_table() {
        let loader = ScriptedLoader::<u32>::new();
        assert!(LoadingPolicy::Show.should_show(&loader));
        assert!(LoadingPolicy::Hide.should_show(&loader));

        loader.set_loading(true);
        assert!(LoadingPolicy::Show.should_show(&loader));
        assert!(!LoadingPolicy::Hide.should_show(&loader));

        loader.data().push(1);
        assert!(!LoadingPolicy::Show.should_show(&loader));
        assert!(!LoadingPolicy::Hide.should_show(&loader));
        assert_eq!(LoadingPolicy::default(), LoadingPolicy::Hide);
    }

    #[test]
    fn test_empty_state_follows_load_cycle() {
        let loader = Arc::new(ScriptedLoader::<u32>::new());
        let empty = EmptyStateDelegate::new(loader.clone(), LoadingPolicy::Hide);
        let events = record(empty.visibility_changed());
        assert!(empty.is_visible());

        loader.set_loading(true);
        assert!(!empty.is_visible());

        loader.data().insert_all(0, vec![1, 2]).unwrap();
        loader.set_loading(false);
        assert!(!empty.is_visible());

        loader.data().clear();
        assert!(empty.is_visible());

        assert_eq!(*events.lock(), vec![false, true]);
    }

    #[test]
    fn test_show_policy_ignores_loading() {
        let loader = Arc::new(ScriptedLoader::<u32>::new());
        let empty = EmptyStateDelegate::new(loader.clone(), LoadingPolicy::Show);
        let events = record(empty.visibility_changed());

        loader.set_loading(true);
        loader.set_loading(false);
        assert!(empty.is_visible());
        assert!(events.lock().is_empty());
        assert_eq!(empty.policy(), LoadingPolicy::Show);
    }

    #[test]
    fn test_loading_state_emits_only_transitions() {
        let loader = Arc::new(ScriptedLoader::<u32>::new());
        let loading = LoadingStateDelegate::new(loader.clone());
        let events = record(loading.visibility_changed());
        assert!(!loading.is_visible());

        loader.set_loading(true);
        loader.data().push(7);
        loader.set_loading(true);
        loader.set_loading(false);

        assert_eq!(*events.lock(), vec![true, false]);
    }

    #[test]
    fn test_errors_pass_through() {
        let loader = Arc::new(ScriptedLoader::<u32>::new());
        let _empty = EmptyStateDelegate::new(loader.clone(), LoadingPolicy::Hide);
        let received = Arc::new(Mutex::new(Vec::new()));
        let recv = received.clone();
        loader
            .errors()
            .connect(move |error| recv.lock().push(error.to_string()));

        loader.fail("connection reset");
        assert_eq!(*received.lock(), vec!["connection reset".to_string()]);
        assert!(!loader.is_loading());
    }

    #[test]
    fn test_drop_detaches_from_data() {
        let loader = Arc::new(ScriptedLoader::<u32>::new());
        let empty = EmptyStateDelegate::new(loader.clone(), LoadingPolicy::Hide);
        let loading = LoadingStateDelegate::new(loader.clone());
        assert_eq!(loader.observer_count(), 2);
        assert_eq!(loader.loading_changed().connection_count(), 2);

        drop(empty);
        drop(loading);
        assert_eq!(loader.observer_count(), 0);
        assert_eq!(loader.loading_changed().connection_count(), 0);
    }

    #[test]
    fn test_delegates_over_owned_items() {
        let loader = Arc::new(ScriptedLoader::<String>::new());
        let data: Arc<dyn LoadingSequence<Item = String>> = loader.clone();
        let empty = EmptyStateDelegate::new(data.clone(), LoadingPolicy::Show);
        let loading = LoadingStateDelegate::new(data);

        loader.set_loading(true);
        assert!(loading.is_visible());
        assert!(empty.is_visible());

        loader.complete(vec!["a".to_string()]).unwrap();
        assert!(!loading.is_visible());
        assert!(!empty.is_visible());
        assert_eq!(empty.data().item(0).unwrap(), "a");
        assert_eq!(loading.data().len(), 1);
    }
}
