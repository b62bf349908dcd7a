//! Owner-thread verification for change delivery.
//!
//! A composed sequence has a single logical owner thread. Its mutations, its
//! observer callbacks and the bookkeeping of every composite stacked on it
//! all happen there, and nothing in plait locks across that boundary on
//! purpose. Background loaders marshal their notifications back onto the
//! owner thread before delivering them.
//!
//! [`ThreadAffinity`] records the thread a notifier was created on. In debug
//! builds, delivering from any other thread panics at the point of delivery
//! rather than corrupting the position bookkeeping of a downstream composite
//! later on.

use std::thread::ThreadId;

/// The thread a notifier belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreadAffinity {
    owner: ThreadId,
}

impl Default for ThreadAffinity {
    fn default() -> Self {
        Self::current()
    }
}

impl ThreadAffinity {
    /// Binds to the calling thread.
    #[inline]
    pub fn current() -> Self {
        Self {
            owner: std::thread::current().id(),
        }
    }

    /// Returns `true` when called from the owner thread.
    #[inline]
    pub fn is_owner_thread(&self) -> bool {
        std::thread::current().id() == self.owner
    }

    /// Panics in debug builds unless called from the owner thread.
    ///
    /// `what` names the operation in the panic message. Release builds skip
    /// the check.
    #[inline]
    pub fn debug_assert_owner(&self, what: &str) {
        #[cfg(debug_assertions)]
        if !self.is_owner_thread() {
            self.wrong_thread(what);
        }
        #[cfg(not(debug_assertions))]
        let _ = what;
    }

    #[cold]
    #[inline(never)]
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    fn wrong_thread(&self, what: &str) -> ! {
        let current = std::thread::current();
        let name = current.name().unwrap_or("<unnamed>");
        crate::plait_warn!(owner = ?self.owner, current = ?current.id(), "{what}");

        panic!(
            "\n\
            ══════════════════════════════════════════════════════════════════════\n\
            THREAD AFFINITY VIOLATION\n\
            ══════════════════════════════════════════════════════════════════════\n\
            \n\
            {what}\n\
            \n\
            Owner thread: {:?}\n\
            Current thread: \"{name}\" (ID: {:?})\n\
            \n\
            Compute on a background thread if you must, then deliver the\n\
            inserted/removed/changed notifications from the owner thread.\n\
            \n\
            ══════════════════════════════════════════════════════════════════════",
            self.owner,
            current.id()
        )
    }
}
