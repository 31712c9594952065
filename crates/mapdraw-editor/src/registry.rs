//! Mutual exclusion between drawing sessions.
//!
//! Sessions that share a registry never draw at the same time: opening one,
//! or switching its mode, closes the others. The registry holds weak
//! references, so dropping a session is enough to leave it.

use crate::session::SessionCore;
use std::cell::RefCell;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub(crate) fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        SessionId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

struct Entry {
    id: SessionId,
    core: Weak<RefCell<SessionCore>>,
    open: bool,
    /// Another session opened while this one was borrowed; close it as soon
    /// as the borrow ends.
    close_pending: bool,
}

/// Cheaply cloneable handle to a shared set of sessions.
#[derive(Clone, Default)]
pub struct SessionRegistry {
    entries: Rc<RefCell<Vec<Entry>>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn register(&self, id: SessionId, core: &Rc<RefCell<SessionCore>>) {
        let mut entries = self.entries.borrow_mut();
        entries.retain(|e| e.core.strong_count() > 0);
        entries.push(Entry {
            id,
            core: Rc::downgrade(core),
            open: false,
            close_pending: false,
        });
    }

    pub fn unregister(&self, id: SessionId) {
        self.entries.borrow_mut().retain(|e| e.id != id);
    }

    fn update(&self, id: SessionId, f: impl FnOnce(&mut Entry)) {
        if let Some(entry) = self.entries.borrow_mut().iter_mut().find(|e| e.id == id) {
            f(entry);
        }
    }

    /// Record an open/close transition of `id`.
    pub(crate) fn set_open(&self, id: SessionId, open: bool) {
        self.update(id, |e| {
            e.open = open;
            e.close_pending = false;
        });
    }

    /// Whether a close was requested for `id` while it was busy. Clears the
    /// request.
    pub(crate) fn take_close_pending(&self, id: SessionId) -> bool {
        let mut pending = false;
        self.update(id, |e| pending = std::mem::take(&mut e.close_pending));
        pending
    }

    fn live_except(&self, id: SessionId) -> Vec<(SessionId, Rc<RefCell<SessionCore>>)> {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.id != id && e.open)
            .filter_map(|e| e.core.upgrade().map(|core| (e.id, core)))
            .collect()
    }

    /// Close every registered session except `id`.
    ///
    /// A session that is mid-dispatch is closed when its dispatch returns.
    pub fn close_all_except(&self, id: SessionId) {
        for (other, core) in self.live_except(id) {
            match core.try_borrow_mut() {
                Ok(mut core) => {
                    if core.close() {
                        log::debug!("closed {other:?} in favour of {id:?}");
                    }
                }
                Err(_) => {
                    log::debug!("{other:?} busy; closing after its dispatch in favour of {id:?}");
                    self.update(other, |e| e.close_pending = true);
                }
            }
        }
    }

    /// Number of sessions currently open, not counting those about to close.
    pub fn open_count(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.open && !e.close_pending && e.core.strong_count() > 0)
            .count()
    }

    /// Number of live registered sessions.
    pub fn len(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .filter(|e| e.core.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
