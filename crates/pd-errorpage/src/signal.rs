//! Transient per-view handler bookkeeping.
//!
//! Each handler the coordinator connects for the duration of an error cycle is
//! represented by a [`Subscription`]. Dropping the handle disconnects it, so a
//! cycle that is torn down on any path cannot leave a handler behind.

use pd_core::ViewId;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::rc::Weak;

/// Handlers that only exist while an error page is pending or shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Signal {
    /// Counts `finished` notifications for the synthetic load.
    FinishWatch,
    /// Waits for the first `provisional` notification after the page is shown.
    NavigateAway,
    /// Accepts button presses from the content process.
    Clicks,
}

type HandlerTable = RefCell<BTreeMap<(ViewId, Signal), usize>>;

#[derive(Debug, Default)]
pub struct SignalBus {
    handlers: Rc<HandlerTable>,
}

impl SignalBus {
    pub fn connect(&self, view: ViewId, signal: Signal) -> Subscription {
        *self
            .handlers
            .borrow_mut()
            .entry((view, signal))
            .or_insert(0) += 1;
        log::trace!("connected {signal:?} handler for {view}");
        Subscription {
            view,
            signal,
            handlers: Rc::downgrade(&self.handlers),
        }
    }

    pub fn is_connected(&self, view: ViewId, signal: Signal) -> bool {
        self.handlers.borrow().contains_key(&(view, signal))
    }

    /// Number of live handlers for `view` across all signals.
    pub fn connected(&self, view: ViewId) -> usize {
        self.handlers
            .borrow()
            .iter()
            .filter(|((owner, _), _)| *owner == view)
            .map(|(_, count)| *count)
            .sum()
    }
}

/// Live handler registration; disconnects on drop.
#[derive(Debug)]
pub struct Subscription {
    view: ViewId,
    signal: Signal,
    handlers: Weak<HandlerTable>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(handlers) = self.handlers.upgrade() else {
            return;
        };
        let mut handlers = handlers.borrow_mut();
        let key = (self.view, self.signal);
        if let Some(count) = handlers.get_mut(&key) {
            *count -= 1;
            if *count == 0 {
                handlers.remove(&key);
            }
        }
        log::trace!("disconnected {:?} handler for {}", self.signal, self.view);
    }
}
