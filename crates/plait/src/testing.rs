//! Helpers for verifying change streams.
//!
//! - [`ChangeRecorder`] records everything a sequence emits.
//! - [`Mirror`] replays the stream onto a shadow list, so a test can check
//!   that the notifications alone are enough to reproduce the sequence.
//! - [`ScriptedLoader`] is a [`LoadingSequence`] driven by hand.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use plait_core::logging::targets;
use plait_core::{Result, Signal};
use thiserror::Error;

use crate::sequence::{
    ArraySequence, ChangeNotifier, Holder, HolderHandle, ItemId, LoadError, LoadingSequence,
    Observable, Sequence, SequenceChange, Subscription, ViewType,
};

/// Records the changes emitted by an observable for as long as it lives.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use plait::sequence::{ArraySequence, SequenceChange};
/// use plait::testing::ChangeRecorder;
///
/// let list = Arc::new(ArraySequence::new(vec![1, 2]));
/// let recorder = ChangeRecorder::attach(list.clone());
/// list.push(3);
///
/// assert_eq!(recorder.take(), vec![SequenceChange::Inserted { start: 2, count: 1 }]);
/// ```
pub struct ChangeRecorder {
    changes: Arc<Mutex<Vec<SequenceChange>>>,
    _subscription: Subscription,
}

impl ChangeRecorder {
    /// Starts recording `target`.
    pub fn attach(target: Arc<dyn Observable>) -> Self {
        let changes = Arc::new(Mutex::new(Vec::new()));
        let sink = changes.clone();
        let subscription = Subscription::new(target, move |change| sink.lock().push(*change));
        Self {
            changes,
            _subscription: subscription,
        }
    }

    /// A copy of everything recorded so far.
    pub fn changes(&self) -> Vec<SequenceChange> {
        self.changes.lock().clone()
    }

    /// Drains the recorded changes.
    pub fn take(&self) -> Vec<SequenceChange> {
        std::mem::take(&mut *self.changes.lock())
    }

    /// The number of recorded changes.
    pub fn len(&self) -> usize {
        self.changes.lock().len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }

    /// The sum of the recorded insertion and removal counts.
    pub fn net_len_delta(&self) -> isize {
        self.changes.lock().iter().map(SequenceChange::len_delta).sum()
    }
}

impl fmt::Debug for ChangeRecorder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeRecorder")
            .field("changes", &*self.changes.lock())
            .finish()
    }
}

/// A disagreement between a [`Mirror`] and its live sequence.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorMismatch {
    /// The shadow list has the wrong length.
    #[error("shadow holds {shadow} items but the sequence holds {live}")]
    Length {
        /// Shadow length.
        shadow: usize,
        /// Live length.
        live: usize,
    },
    /// An item differs.
    #[error("position {position}: shadow has {shadow} but the sequence has {live}")]
    Item {
        /// Position of the first difference.
        position: usize,
        /// Debug rendering of the shadow item.
        shadow: String,
        /// Debug rendering of the live item.
        live: String,
    },
}

/// Replays a change stream onto a shadow list.
///
/// Inserted and changed items are read from the live sequence at the moment
/// the change is delivered. Everything else is derived from the change
/// itself, so a missing or misplaced notification leaves the shadow list out
/// of step with the sequence and [`verify`](Self::verify) reports it.
pub struct Mirror<T> {
    live: Arc<dyn Sequence<Item = T>>,
    shadow: Arc<Mutex<Vec<Option<T>>>>,
    _subscription: Subscription,
}

impl<T> Mirror<T>
where
    T: Clone + PartialEq + fmt::Debug + Send + Sync + 'static,
{
    /// Snapshots `live` and starts following its changes.
    pub fn attach(live: Arc<dyn Sequence<Item = T>>) -> Self {
        let shadow = Arc::new(Mutex::new(Vec::new()));
        let weak: Weak<dyn Sequence<Item = T>> = Arc::downgrade(&live);
        let sink = shadow.clone();
        let target: Arc<dyn Observable> = live.clone();
        let subscription = Subscription::new(target, move |change| {
            if let Some(live) = weak.upgrade() {
                replay(&mut sink.lock(), live.as_ref(), *change);
            }
        });
        // The first observer may have activated the sequence, so the
        // snapshot is taken after subscribing.
        *shadow.lock() = (0..live.len()).map(|p| live.item(p).ok()).collect();
        Self {
            live,
            shadow,
            _subscription: subscription,
        }
    }

    /// The shadow list. `None` marks an item the sequence refused to return
    /// when it was announced.
    pub fn shadow(&self) -> Vec<Option<T>> {
        self.shadow.lock().clone()
    }

    /// Compares the shadow list with the live sequence.
    pub fn verify(&self) -> std::result::Result<(), MirrorMismatch> {
        let shadow = self.shadow.lock();
        let live_len = self.live.len();
        if shadow.len() != live_len {
            return Err(MirrorMismatch::Length {
                shadow: shadow.len(),
                live: live_len,
            });
        }
        for (position, expected) in shadow.iter().enumerate() {
            let actual = self.live.item(position).ok();
            if *expected != actual {
                return Err(MirrorMismatch::Item {
                    position,
                    shadow: format!("{expected:?}"),
                    live: format!("{actual:?}"),
                });
            }
        }
        Ok(())
    }

    /// Panics if [`verify`](Self::verify) fails.
    #[track_caller]
    pub fn assert_consistent(&self) {
        if let Err(mismatch) = self.verify() {
            panic!("mirror out of step: {mismatch}");
        }
    }
}

fn replay<T>(shadow: &mut Vec<Option<T>>, live: &dyn Sequence<Item = T>, change: SequenceChange)
where
    T: Clone,
{
    tracing::trace!(target: targets::SEQUENCE, ?change, shadow_len = shadow.len(), "mirror replay");
    match change {
        SequenceChange::Changed { start, count } => {
            for position in start..start + count {
                if let Some(slot) = shadow.get_mut(position) {
                    *slot = live.item(position).ok();
                }
            }
        }
        SequenceChange::Inserted { start, count } => {
            let start = start.min(shadow.len());
            let items: Vec<Option<T>> = (start..start + count).map(|p| live.item(p).ok()).collect();
            shadow.splice(start..start, items);
        }
        SequenceChange::Removed { start, count } => {
            let start = start.min(shadow.len());
            let end = (start + count).min(shadow.len());
            shadow.drain(start..end);
        }
        SequenceChange::Moved { from, to, count } => {
            if from + count > shadow.len() {
                return;
            }
            let block: Vec<Option<T>> = shadow.drain(from..from + count).collect();
            let to = to.min(shadow.len());
            shadow.splice(to..to, block);
        }
    }
}

/// The error a [`ScriptedLoader`] reports from [`fail`](ScriptedLoader::fail).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ScriptedFailure(pub String);

/// A [`LoadingSequence`] whose loading state and failures are driven by the
/// test.
pub struct ScriptedLoader<T> {
    data: ArraySequence<T>,
    loading: AtomicBool,
    loading_changed: Signal<bool>,
    errors: Signal<LoadError>,
}

impl<T: Clone + Send + Sync + 'static> ScriptedLoader<T> {
    /// An empty loader that is not loading.
    pub fn new() -> Self {
        Self::with_data(ArraySequence::empty())
    }

    /// A loader over existing data.
    pub fn with_data(data: ArraySequence<T>) -> Self {
        Self {
            data,
            loading: AtomicBool::new(false),
            loading_changed: Signal::new(),
            errors: Signal::new(),
        }
    }

    /// The backing data, for mutating it the way a load would.
    pub fn data(&self) -> &ArraySequence<T> {
        &self.data
    }

    /// Sets the loading flag, emitting `loading_changed` if it flips.
    pub fn set_loading(&self, loading: bool) {
        if self.loading.swap(loading, Ordering::SeqCst) != loading {
            self.loading_changed.emit(loading);
        }
    }

    /// Appends `items` and ends the load.
    pub fn complete(&self, items: Vec<T>) -> Result<()> {
        self.data.insert_all(self.data.len(), items)?;
        self.set_loading(false);
        Ok(())
    }

    /// Ends the load with an error.
    pub fn fail(&self, message: &str) {
        self.set_loading(false);
        self.errors
            .emit(Arc::new(ScriptedFailure(message.to_string())));
    }
}

impl<T: Clone + Send + Sync + 'static> Default for ScriptedLoader<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone + Send + Sync + 'static> Observable for ScriptedLoader<T> {
    fn notifier(&self) -> &ChangeNotifier {
        self.data.notifier()
    }
}

impl<T: Clone + Send + Sync + 'static> Sequence for ScriptedLoader<T> {
    type Item = T;

    fn len(&self) -> usize {
        self.data.len()
    }

    fn item(&self, position: usize) -> Result<T> {
        self.data.item(position)
    }

    fn view_type(&self, position: usize) -> Result<ViewType> {
        self.data.view_type(position)
    }

    fn item_id(&self, position: usize) -> Result<Option<ItemId>> {
        self.data.item_id(position)
    }

    fn has_stable_ids(&self) -> bool {
        self.data.has_stable_ids()
    }

    fn is_enabled(&self, position: usize) -> Result<bool> {
        self.data.is_enabled(position)
    }

    fn bind(&self, holder: &Arc<dyn Holder>) -> Result<()> {
        self.data.bind(holder)
    }

    fn recycle(&self, handle: HolderHandle) {
        self.data.recycle(handle);
    }
}

impl<T: Clone + Send + Sync + 'static> LoadingSequence for ScriptedLoader<T> {
    fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    fn loading_changed(&self) -> &Signal<bool> {
        &self.loading_changed
    }

    fn errors(&self) -> &Signal<LoadError> {
        &self.errors
    }
}
