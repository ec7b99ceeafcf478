//! Values with observable construction and destruction.
//!
//! - [`DropTracker`] — shared counters and a drop log.
//! - [`Tracked`] — a value registered with a tracker on creation and
//!   unregistered when dropped.
//!
//! Used to check that typed arena allocation runs destructors exactly once
//! and in the expected order.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

#[derive(Default)]
struct TrackerState {
    live: Cell<usize>,
    created: Cell<usize>,
    dropped: RefCell<Vec<u32>>,
}

/// Shared record of [`Tracked`] values created and dropped.
///
/// Cloning gives another handle to the same record.
#[derive(Clone, Default)]
pub struct DropTracker {
    state: Rc<TrackerState>,
}

impl DropTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a value registered with this tracker.
    pub fn track(&self, id: u32) -> Tracked {
        self.state.live.set(self.state.live.get() + 1);
        self.state.created.set(self.state.created.get() + 1);
        Tracked {
            id,
            tracker: self.clone(),
        }
    }

    /// Values created but not yet dropped.
    pub fn live(&self) -> usize {
        self.state.live.get()
    }

    /// Values created so far.
    pub fn created(&self) -> usize {
        self.state.created.get()
    }

    /// Ids of dropped values, in drop order.
    pub fn drop_order(&self) -> Vec<u32> {
        self.state.dropped.borrow().clone()
    }
}

/// Value whose lifetime is recorded by a [`DropTracker`].
pub struct Tracked {
    id: u32,
    tracker: DropTracker,
}

impl Tracked {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn set_id(&mut self, id: u32) {
        self.id = id;
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        let state = &self.tracker.state;
        state.live.set(state.live.get() - 1);
        state.dropped.borrow_mut().push(self.id);
    }
}
