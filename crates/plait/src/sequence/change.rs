//! Change vocabulary and notification for sequences.
//!
//! Every mutation of a sequence is described by a [`SequenceChange`] in the
//! emitter's own coordinate space, at the time of emission. Observers must
//! apply changes in emission order; a decorator that forwards changes may
//! translate positions and split or widen ranges, but never reorder, skip or
//! merge them.

use plait_core::logging::targets;
use plait_core::{ConnectionId, Signal, ThreadAffinity};

/// A single range mutation of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceChange {
    /// `count` items starting at `start` changed in place.
    Changed {
        /// First changed position.
        start: usize,
        /// Number of changed items.
        count: usize,
    },
    /// `count` items were inserted so that the first occupies `start`.
    Inserted {
        /// Position of the first inserted item.
        start: usize,
        /// Number of inserted items.
        count: usize,
    },
    /// `count` items previously starting at `start` were removed.
    Removed {
        /// Position of the first removed item, before removal.
        start: usize,
        /// Number of removed items.
        count: usize,
    },
    /// `count` items starting at `from` were moved so that the first one now
    /// occupies `to`.
    Moved {
        /// Position of the first moved item, before the move.
        from: usize,
        /// Position of the first moved item, after the move.
        to: usize,
        /// Number of moved items.
        count: usize,
    },
}

impl SequenceChange {
    /// Number of items the change covers.
    pub fn count(&self) -> usize {
        match *self {
            Self::Changed { count, .. }
            | Self::Inserted { count, .. }
            | Self::Removed { count, .. }
            | Self::Moved { count, .. } => count,
        }
    }

    /// How much the change alters the length of the emitter.
    pub fn len_delta(&self) -> isize {
        match *self {
            Self::Inserted { count, .. } => count as isize,
            Self::Removed { count, .. } => -(count as isize),
            Self::Changed { .. } | Self::Moved { .. } => 0,
        }
    }

    /// Returns the same change with every position shifted by `offset`.
    pub fn shifted(self, offset: usize) -> Self {
        match self {
            Self::Changed { start, count } => Self::Changed {
                start: start + offset,
                count,
            },
            Self::Inserted { start, count } => Self::Inserted {
                start: start + offset,
                count,
            },
            Self::Removed { start, count } => Self::Removed {
                start: start + offset,
                count,
            },
            Self::Moved { from, to, count } => Self::Moved {
                from: from + offset,
                to: to + offset,
                count,
            },
        }
    }

    /// Applies `len_delta` to `len`, returning `None` if the change removes
    /// more items than `len` holds.
    pub fn apply_to_len(&self, len: usize) -> Option<usize> {
        match *self {
            Self::Inserted { count, .. } => len.checked_add(count),
            Self::Removed { count, .. } => len.checked_sub(count),
            Self::Changed { .. } | Self::Moved { .. } => Some(len),
        }
    }
}

/// Emits [`SequenceChange`]s to the observers of one sequence.
///
/// Zero-count notifications are dropped. Notifications must be delivered on
/// the thread that created the notifier.
pub struct ChangeNotifier {
    signal: Signal<SequenceChange>,
    affinity: ThreadAffinity,
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeNotifier {
    /// Creates a notifier owned by the current thread.
    pub fn new() -> Self {
        Self {
            signal: Signal::new(),
            affinity: ThreadAffinity::current(),
        }
    }

    /// Connects an observer.
    pub fn connect<F>(&self, observer: F) -> ConnectionId
    where
        F: Fn(&SequenceChange) + Send + Sync + 'static,
    {
        self.signal.connect(observer)
    }

    /// Disconnects an observer, returning `true` if it was connected.
    pub fn disconnect(&self, id: ConnectionId) -> bool {
        self.signal.disconnect(id)
    }

    /// Number of connected observers.
    pub fn observer_count(&self) -> usize {
        self.signal.connection_count()
    }

    /// Suppresses delivery while `blocked` is set. Changes made in the
    /// meantime are lost to observers.
    pub fn set_blocked(&self, blocked: bool) {
        self.signal.set_blocked(blocked);
    }

    /// Delivers `change` to every observer.
    pub fn notify(&self, change: SequenceChange) {
        if change.count() == 0 {
            return;
        }
        self.affinity
            .debug_assert_owner("sequence changes must be delivered on the owner thread");
        tracing::trace!(target: targets::SEQUENCE, ?change, "notify");
        self.signal.emit(change);
    }

    /// Notifies that `count` items starting at `start` changed.
    pub fn notify_changed(&self, start: usize, count: usize) {
        self.notify(SequenceChange::Changed { start, count });
    }

    /// Notifies that `count` items were inserted at `start`.
    pub fn notify_inserted(&self, start: usize, count: usize) {
        self.notify(SequenceChange::Inserted { start, count });
    }

    /// Notifies that `count` items were removed from `start`.
    pub fn notify_removed(&self, start: usize, count: usize) {
        self.notify(SequenceChange::Removed { start, count });
    }

    /// Notifies that `count` items moved from `from` to `to`.
    pub fn notify_moved(&self, from: usize, to: usize, count: usize) {
        if from == to {
            return;
        }
        self.notify(SequenceChange::Moved { from, to, count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;

    #[test]
    fn test_change_accessors() {
        let inserted = SequenceChange::Inserted { start: 2, count: 3 };
        assert_eq!(inserted.count(), 3);
        assert_eq!(inserted.len_delta(), 3);
        assert_eq!(inserted.apply_to_len(1), Some(4));

        let removed = SequenceChange::Removed { start: 0, count: 2 };
        assert_eq!(removed.len_delta(), -2);
        assert_eq!(removed.apply_to_len(1), None);

        let moved = SequenceChange::Moved { from: 0, to: 4, count: 1 };
        assert_eq!(moved.len_delta(), 0);
        assert_eq!(
            moved.shifted(3),
            SequenceChange::Moved { from: 3, to: 7, count: 1 }
        );
    }

    #[test]
    fn test_notifier_drops_empty_changes() {
        let notifier = ChangeNotifier::new();
        let received = Arc::new(Mutex::new(Vec::new()));

        let recv = received.clone();
        notifier.connect(move |change| recv.lock().push(*change));

        notifier.notify_inserted(0, 0);
        notifier.notify_moved(3, 3, 2);
        notifier.notify_removed(1, 2);

        assert_eq!(
            *received.lock(),
            vec![SequenceChange::Removed { start: 1, count: 2 }]
        );
    }

    #[test]
    fn test_notifier_observer_count() {
        let notifier = ChangeNotifier::new();
        assert_eq!(notifier.observer_count(), 0);
        let id = notifier.connect(|_| {});
        assert_eq!(notifier.observer_count(), 1);
        assert!(notifier.disconnect(id));
        assert_eq!(notifier.observer_count(), 0);
    }

    #[cfg(debug_assertions)]
    #[test]
    fn test_notify_off_owner_thread_panics() {
        let notifier = Arc::new(ChangeNotifier::new());
        notifier.connect(|_| {});

        let remote = notifier.clone();
        let result = std::thread::spawn(move || remote.notify_inserted(0, 1)).join();
        assert!(result.is_err());

        // Dropped before delivery, so never checked.
        let remote = notifier.clone();
        std::thread::spawn(move || remote.notify_removed(0, 0))
            .join()
            .unwrap();
    }
}
