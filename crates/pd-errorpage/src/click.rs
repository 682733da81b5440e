//! Routes button presses from the content process to registered callbacks.

use crate::host::ViewHost;
use crate::page::ButtonCallback;
use crate::signal::Subscription;
use core::fmt;
use pd_core::ViewId;
use std::collections::BTreeMap;
use std::collections::HashMap;
use std::rc::Rc;

/// Button callbacks of one rendered error page, keyed by button index.
#[derive(Default)]
pub struct ClickTable {
    callbacks: BTreeMap<usize, ButtonCallback>,
}

impl ClickTable {
    pub fn from_registrations(registrations: Vec<(usize, ButtonCallback)>) -> Self {
        Self {
            callbacks: registrations.into_iter().collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

impl fmt::Debug for ClickTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.callbacks.keys()).finish()
    }
}

/// Outcome of routing one click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    Invoked,
    /// No live view matches the identity carried by the click.
    UnknownView,
    /// The view has no active error page.
    NoRegistrations,
    /// The page has no button with that index.
    UnknownButton,
}

#[derive(Debug)]
struct ActivePage {
    table: Rc<ClickTable>,
    _subscription: Subscription,
}

/// Active click registrations, one set per view.
#[derive(Debug, Default)]
pub struct ClickRouter {
    active: HashMap<ViewId, ActivePage>,
}

impl ClickRouter {
    /// Replaces whatever was registered for `view`.
    pub fn register(&mut self, view: ViewId, table: Rc<ClickTable>, subscription: Subscription) {
        self.active.insert(
            view,
            ActivePage {
                table,
                _subscription: subscription,
            },
        );
    }

    /// Drops the registrations for `view`; returns whether any existed.
    pub fn invalidate(&mut self, view: ViewId) -> bool {
        self.active.remove(&view).is_some()
    }

    pub fn route(&self, host: &mut dyn ViewHost, view: ViewId, button_index: usize) -> ClickOutcome {
        let Some(page) = self.active.get(&view) else {
            log::trace!("dropping click on button {button_index} of {view}: no active error page");
            return ClickOutcome::NoRegistrations;
        };
        let Some(callback) = page.table.callbacks.get(&button_index) else {
            log::trace!("dropping click on unknown button {button_index} of {view}");
            return ClickOutcome::UnknownButton;
        };

        if let Err(error) = callback(host, view) {
            log::warn!("error page button {button_index} of {view} failed: {error}");
        }
        ClickOutcome::Invoked
    }
}
