//! History freezing and error-page marks for one view.

use crate::click::ClickTable;
use crate::host::ViewHost;
use pd_core::ViewId;
use std::collections::BTreeMap;
use std::rc::Rc;

/// Tracks which back/forward positions of a view hold error pages.
///
/// A mark keeps the button table of the page it marks so that returning to the
/// position restores working buttons.
#[derive(Debug, Default)]
pub struct HistoryGuard {
    frozen: bool,
    marks: BTreeMap<usize, Rc<ClickTable>>,
}

impl HistoryGuard {
    pub fn freeze(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        if !self.frozen {
            host.set_history_frozen(view, true);
            self.frozen = true;
        }
    }

    pub fn thaw(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        if self.frozen {
            host.set_history_frozen(view, false);
            self.frozen = false;
        }
    }

    pub fn mark(&mut self, index: usize, table: Rc<ClickTable>) {
        self.marks.insert(index, table);
    }

    /// Removes the mark at `index`; returns whether one existed.
    pub fn clear(&mut self, index: usize) -> bool {
        self.marks.remove(&index).is_some()
    }

    pub fn marked(&self, index: usize) -> Option<Rc<ClickTable>> {
        self.marks.get(&index).map(Rc::clone)
    }

    pub fn is_marked(&self, index: usize) -> bool {
        self.marks.contains_key(&index)
    }
}
