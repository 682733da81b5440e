//! Per-view load-lifecycle state machine.
//!
//! The engine reports every load of a view through `load-status`
//! notifications. When a load fails the coordinator replaces the view's
//! content with a generated page, which itself produces one (or, when the
//! failed load was still in flight, two) `finished` notifications that must be
//! consumed before the page counts as shown. Only then are button presses
//! accepted and the first `provisional` notification treated as the user
//! leaving the page.

use crate::classify::build_error_page;
use crate::click::ClickOutcome;
use crate::click::ClickRouter;
use crate::click::ClickTable;
use crate::config::ErrorPageConfig;
use crate::history::HistoryGuard;
use crate::host::ContentOverrides;
use crate::host::LoadFailure;
use crate::host::LoadStatus;
use crate::host::ViewHost;
use crate::render::render_page;
use crate::signal::Signal;
use crate::signal::SignalBus;
use crate::signal::Subscription;
use core::fmt;
use pd_core::BrowserResult;
use pd_core::RequestHandle;
use pd_core::ViewId;
use std::collections::HashMap;
use std::rc::Rc;

/// Error-page phase of one view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Normal,
    /// Waiting for `remaining` more `finished` notifications.
    ErrorPending { remaining: u8 },
    ErrorShown,
}

/// Monotonic identifier of one error cycle, unique per coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct CycleId(u64);

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "error cycle #{}", self.0)
    }
}

#[derive(Debug)]
struct ErrorCycle {
    id: CycleId,
    clicks: Rc<ClickTable>,
    finish_watch: Option<Subscription>,
    navigate_away: Option<Subscription>,
}

#[derive(Debug)]
struct ViewState {
    phase: Phase,
    is_error_page: bool,
    overrides_applied: bool,
    history: HistoryGuard,
    cycle: Option<ErrorCycle>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            phase: Phase::Normal,
            is_error_page: false,
            overrides_applied: false,
            history: HistoryGuard::default(),
            cycle: None,
        }
    }
}

impl ViewState {
    fn apply_overrides(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        if !self.overrides_applied {
            host.set_content_overrides(view, Some(ContentOverrides::ERROR_PAGE));
            self.overrides_applied = true;
        }
    }

    fn clear_overrides(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        if self.overrides_applied {
            host.set_content_overrides(view, None);
            self.overrides_applied = false;
        }
    }
}

/// Drives error pages for every view of a browser window.
#[derive(Debug)]
pub struct ErrorPageCoordinator {
    config: ErrorPageConfig,
    views: HashMap<ViewId, ViewState>,
    router: ClickRouter,
    bus: SignalBus,
    next_cycle: u64,
}

impl ErrorPageCoordinator {
    pub fn new(config: ErrorPageConfig) -> BrowserResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            views: HashMap::new(),
            router: ClickRouter::default(),
            bus: SignalBus::default(),
            next_cycle: 1,
        })
    }

    pub fn config(&self) -> &ErrorPageConfig {
        &self.config
    }

    /// Starts tracking `view`. Views are also tracked on their first notification.
    pub fn attach_view(&mut self, view: ViewId) {
        self.views.entry(view).or_default();
    }

    /// Forgets everything about a destroyed view, releasing its handlers.
    pub fn on_view_destroyed(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        self.retire_shown_page(host, view);
        if self.views.remove(&view).is_some() {
            log::debug!("dropped error-page state of destroyed {view}");
        }
    }

    pub fn on_load_status(&mut self, host: &mut dyn ViewHost, view: ViewId, status: LoadStatus) {
        match status {
            LoadStatus::Provisional => self.navigated_away(host, view),
            LoadStatus::Committed => {}
            LoadStatus::Finished => self.load_finished(host, view),
            LoadStatus::Failed {
                uri,
                error,
                request,
            } => self.handle_failure(host, view, LoadFailure::Load(error), &uri, request),
        }
    }

    pub fn on_crashed(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        let uri = host.uri(view);
        self.handle_failure(host, view, LoadFailure::Crash, &uri, None);
    }

    /// A new navigation is starting; stale clicks must not reach the old page.
    pub fn on_navigation_request(&mut self, view: ViewId) {
        if self.router.invalidate(view) {
            log::debug!("navigation requested in {view}; error page buttons disabled");
        }
    }

    /// Re-arms the coordinator when history navigation lands on an error page.
    pub fn on_go_back_forward(&mut self, host: &mut dyn ViewHost, view: ViewId, delta: isize) {
        let Some(target) = host.history_index(view).checked_add_signed(delta) else {
            return;
        };
        let Some(clicks) = self
            .views
            .get(&view)
            .and_then(|state| state.history.marked(target))
        else {
            return;
        };

        self.resolve_pending(host, view);
        self.retire_shown_page(host, view);
        let id = self.next_cycle_id();
        let state = self.views.entry(view).or_default();
        state.apply_overrides(host, view);
        state.is_error_page = true;
        state.cycle = Some(ErrorCycle {
            id,
            clicks,
            finish_watch: Some(self.bus.connect(view, Signal::FinishWatch)),
            navigate_away: None,
        });
        state.phase = Phase::ErrorPending { remaining: 1 };
        log::debug!("{id} re-armed in {view} for history index {target}");
    }

    /// Delivers a button press reported by the content process.
    pub fn on_click(
        &mut self,
        host: &mut dyn ViewHost,
        view: ViewId,
        button_index: usize,
    ) -> ClickOutcome {
        if !self.views.contains_key(&view) {
            log::debug!("dropping click on button {button_index}: {view} is not open");
            return ClickOutcome::UnknownView;
        }
        self.router.route(host, view, button_index)
    }

    /// Classifies `failure` and, unless it is ignorable, starts an error cycle.
    pub fn handle_failure(
        &mut self,
        host: &mut dyn ViewHost,
        view: ViewId,
        failure: LoadFailure,
        uri: &str,
        request: Option<RequestHandle>,
    ) {
        let Some(page) = build_error_page(failure, uri, request, &self.config) else {
            return;
        };

        self.resolve_pending(host, view);
        self.retire_shown_page(host, view);

        let remaining = if host.is_loading(view) && page.request.is_none() {
            2
        } else {
            1
        };
        let rendered = render_page(page, self.config.max_substitution_passes);
        let id = self.next_cycle_id();

        let state = self.views.entry(view).or_default();
        state.history.freeze(host, view);
        let injected = match rendered.request {
            Some(request) => host.finish_request(request, &rendered.content),
            None => host.load_content(view, &rendered.content, &rendered.uri),
        };
        if let Err(error) = injected {
            log::warn!("could not inject error page into {view}: {error}");
            state.history.thaw(host, view);
            state.clear_overrides(host, view);
            state.is_error_page = false;
            state.phase = Phase::Normal;
            return;
        }

        state.apply_overrides(host, view);
        state.is_error_page = true;
        state.cycle = Some(ErrorCycle {
            id,
            clicks: Rc::new(ClickTable::from_registrations(rendered.registrations)),
            finish_watch: Some(self.bus.connect(view, Signal::FinishWatch)),
            navigate_away: None,
        });
        state.phase = Phase::ErrorPending { remaining };
        log::debug!("{id} started in {view} for `{uri}`, expecting {remaining} finished");
    }

    pub fn phase(&self, view: ViewId) -> Phase {
        self.views
            .get(&view)
            .map_or(Phase::Normal, |state| state.phase)
    }

    pub fn is_error_page(&self, view: ViewId) -> bool {
        self.views
            .get(&view)
            .is_some_and(|state| state.is_error_page)
    }

    pub fn pending_finish_count(&self, view: ViewId) -> u8 {
        match self.phase(view) {
            Phase::ErrorPending { remaining } => remaining,
            Phase::Normal | Phase::ErrorShown => 0,
        }
    }

    pub fn is_history_marked(&self, view: ViewId, index: usize) -> bool {
        self.views
            .get(&view)
            .is_some_and(|state| state.history.is_marked(index))
    }

    pub fn current_cycle(&self, view: ViewId) -> Option<CycleId> {
        self.views
            .get(&view)
            .and_then(|state| state.cycle.as_ref())
            .map(|cycle| cycle.id)
    }

    /// Number of transient handlers currently connected for `view`.
    pub fn active_subscriptions(&self, view: ViewId) -> usize {
        self.bus.connected(view)
    }

    fn next_cycle_id(&mut self) -> CycleId {
        let id = CycleId(self.next_cycle);
        self.next_cycle += 1;
        id
    }

    fn load_finished(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        let Some(state) = self.views.get_mut(&view) else {
            return;
        };

        let phase = state.phase;
        match phase {
            Phase::Normal => {
                let index = host.history_index(view);
                if state.history.clear(index) {
                    log::debug!("content replaced error page at history index {index} of {view}");
                }
            }
            Phase::ErrorShown => {}
            Phase::ErrorPending { remaining } => {
                if !self.bus.is_connected(view, Signal::FinishWatch) {
                    log::warn!("{view} is pending without a finish watcher");
                }
                let remaining = remaining.saturating_sub(1);
                if remaining > 0 {
                    state.phase = Phase::ErrorPending { remaining };
                    return;
                }
                self.show_error_page(host, view, false);
            }
        }
    }

    /// Marks and thaws history for the pending page. A `forced` page is
    /// about to be replaced, so its buttons are never connected.
    fn show_error_page(&mut self, host: &mut dyn ViewHost, view: ViewId, forced: bool) {
        let Some(state) = self.views.get_mut(&view) else {
            return;
        };
        let Some(cycle) = state.cycle.as_mut() else {
            log::warn!("{view} finished an error load without an active cycle");
            state.phase = Phase::Normal;
            return;
        };

        cycle.finish_watch = None;
        let index = host.history_index(view);
        state.history.mark(index, Rc::clone(&cycle.clicks));
        state.history.thaw(host, view);
        state.phase = Phase::ErrorShown;
        if forced {
            log::debug!(
                "{} resolved in {view} at history index {index} without being shown",
                cycle.id
            );
            return;
        }

        self.router.register(
            view,
            Rc::clone(&cycle.clicks),
            self.bus.connect(view, Signal::Clicks),
        );
        cycle.navigate_away = Some(self.bus.connect(view, Signal::NavigateAway));
        log::info!(
            "{} shown in {view} at history index {index} with {} buttons",
            cycle.id,
            cycle.clicks.len()
        );

        if let Err(error) = host.listen_for_clicks(view) {
            log::warn!("could not enable error page buttons in {view}: {error}");
        }
    }

    /// First `provisional` after the page is shown: the user left it.
    fn navigated_away(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        let Some(state) = self.views.get_mut(&view) else {
            return;
        };
        let Some(id) = state
            .cycle
            .as_ref()
            .filter(|cycle| cycle.navigate_away.is_some())
            .map(|cycle| cycle.id)
        else {
            return;
        };
        if state.phase != Phase::ErrorShown {
            return;
        }

        state.is_error_page = false;
        state.clear_overrides(host, view);
        state.phase = Phase::Normal;
        self.retire_shown_page(host, view);
        log::debug!("{view} navigated away from {id}");
    }

    /// Forces a pending cycle to its shown state before another one starts.
    fn resolve_pending(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        let Some(state) = self.views.get_mut(&view) else {
            return;
        };
        let Phase::ErrorPending { remaining } = state.phase else {
            return;
        };

        log::warn!("{view} had {remaining} unfinished error loads; resolving before a new cycle");
        self.show_error_page(host, view, true);
    }

    /// Ends the current cycle and disables the buttons of a page being replaced.
    fn retire_shown_page(&mut self, host: &mut dyn ViewHost, view: ViewId) {
        let was_shown = self
            .views
            .get_mut(&view)
            .and_then(|state| state.cycle.take())
            .is_some_and(|cycle| cycle.navigate_away.is_some());
        let had_buttons = self.router.invalidate(view);
        if !was_shown && !had_buttons {
            return;
        }
        if let Err(error) = host.release_clicks(view) {
            log::warn!("could not release error page buttons in {view}: {error}");
        }
    }
}
