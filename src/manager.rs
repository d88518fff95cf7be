//! Contextual Search orchestrator
//!
//! [`ContextualSearchManager`] composes the selection controller, the internal
//! state controller and the external collaborators. It is the
//! [`SelectionHandler`] for the selection controller and lends its services to
//! the state controller as the state handler.
//!
//! ## Architecture
//!
//! - `bridge`: page and panel interfaces
//! - `resolver`: search term resolution (HTTP by default)
//! - `state_work`: the work performed in each state
//! - `event_loop`: events and the loop that applies them in order

pub mod bridge;
pub mod event_loop;
pub mod resolver;
mod state_work;


pub use bridge::{ContextSelection, ContextualSearchObserver, ObserverId, PageBridge, SearchPanel};
pub use event_loop::{run_event_loop, ManagerEvent};
pub use resolver::{HttpSearchTermResolver, ResolveRequest, SearchTermResolver};

use std::collections::VecDeque;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::core::context::SearchContext;
use crate::core::heuristics::TapSuppressionHeuristics;
use crate::core::policy::ContextualSearchPolicy;
use crate::core::selection::{SelectionController, SelectionEvent, SelectionHandler};
use crate::core::state::InternalStateController;
use crate::shared::error::{SearchError, SearchResult};
use crate::shared::settings::SearchSettings;
use crate::shared::types::{
    InternalState, ResolvedSearchTerm, SearchRequest, SelectAroundCaretResult, SelectionEventType,
    SelectionType, StateChangeReason,
};
use state_work::{Deferred, Services, StateWork};

/// Shown in the bar when a resolve could not reach the network.
pub const NETWORK_UNAVAILABLE_MESSAGE: &str = "Can't connect to the network";

/// Separates a definition from its pronunciation in resolved terms.
const DEFINITION_MID_DOT: char = '\u{00B7}';

pub struct ContextualSearchManager {
    state: InternalStateController,
    selection: SelectionController,
    services: Services,
}

impl ContextualSearchManager {
    /// Builds a manager on the current tokio runtime. The receiver yields the
    /// completions of the manager's own timers and resolves, plus whatever the
    /// host sends through [`sender`](Self::sender).
    pub fn new(
        settings: SearchSettings,
        page: Box<dyn PageBridge>,
        panel: Box<dyn SearchPanel>,
        resolver: Arc<dyn SearchTermResolver>,
    ) -> SearchResult<(Self, UnboundedReceiver<ManagerEvent>)> {
        settings.validate()?;
        let runtime = Handle::try_current()
            .map_err(|e| SearchError::Config(format!("Contextual search needs a tokio runtime: {}", e)))?;
        let (events, events_rx) = mpsc::unbounded_channel();

        let policy = ContextualSearchPolicy::new(settings);
        let state = InternalStateController::new(policy.retry_states());
        let selection = SelectionController::new(policy.suppression().clone(), policy.long_press_resolves());

        let services = Services {
            policy,
            page,
            panel,
            resolver,
            events,
            runtime,
            context: None,
            search_request: None,
            did_load_search_request: false,
            were_search_results_seen: false,
            observers: Vec::new(),
            next_observer_id: 0,
            is_search_observed: false,
            select_around_caret_counter: 0,
            async_generation: 0,
            last_heuristics: None,
            was_activated_by_tap: false,
            is_accessibility_mode_enabled: false,
            is_bottom_sheet_visible: false,
            deferred: VecDeque::new(),
        };

        info!("contextual search manager created");
        Ok((
            Self {
                state,
                selection,
                services,
            },
            events_rx,
        ))
    }

    pub fn sender(&self) -> UnboundedSender<ManagerEvent> {
        self.services.events.clone()
    }

    pub fn state(&self) -> InternalState {
        self.state.state()
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn context(&self) -> Option<&SearchContext> {
        self.services.context.as_ref()
    }

    pub fn search_request(&self) -> Option<&SearchRequest> {
        self.services.search_request.as_ref()
    }

    pub fn policy(&self) -> &ContextualSearchPolicy {
        &self.services.policy
    }

    /// Gestures are ignored entirely while this holds.
    pub fn is_suppressed(&self) -> bool {
        self.services.is_suppressed()
    }

    pub fn add_observer(&mut self, observer: Box<dyn ContextualSearchObserver>) -> ObserverId {
        let id = ObserverId(self.services.next_observer_id);
        self.services.next_observer_id += 1;
        self.services.observers.push((id, observer));
        id
    }

    /// Returns false when `id` was not registered.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.services.observers.len();
        self.services.observers.retain(|(observer_id, _)| *observer_id != id);
        self.services.observers.len() != before
    }

    pub fn process(&mut self, event: ManagerEvent) {
        match event {
            ManagerEvent::SelectionChanged(text) => self.on_selection_changed(&text),
            ManagerEvent::SelectionEvent { event_type, x, y } => self.on_selection_event(event_type, x, y),
            ManagerEvent::UnhandledTap { x, y } => self.on_show_unhandled_tap_ui_if_needed(x, y),
            ManagerEvent::ScrollStarted => self.on_scroll_started(),
            ManagerEvent::ScrollEnded => self.on_scroll_ended(),
            ManagerEvent::FocusedNodeChanged { editable } => self.on_focused_node_changed(editable),
            ManagerEvent::SurroundingTextAvailable {
                encoding,
                text,
                start,
                end,
            } => self.on_surrounding_text_available(&encoding, &text, start, end),
            ManagerEvent::SelectAroundCaretAck(result) => self.on_select_around_caret_ack(result),
            ManagerEvent::BasePageLoadStarted => self.on_base_page_load_started(),
            ManagerEvent::TabSwitched => self.on_tab_switched(),
            ManagerEvent::ContextMenuShown => self.on_context_menu_shown(),
            ManagerEvent::AccessibilityModeChanged(enabled) => self.on_accessibility_mode_changed(enabled),
            ManagerEvent::BottomSheetVisible(visible) => self.on_bottom_sheet_visible(visible),
            ManagerEvent::SettingsChanged(settings) => {
                if let Err(e) = self.on_settings_changed(*settings) {
                    warn!(error = %e, "rejected settings change");
                }
            }
            ManagerEvent::ContentVisible => self.on_content_visible(),
            ManagerEvent::Hide(reason) => self.hide_contextual_search(reason),
            ManagerEvent::Shutdown => self.destroy(),
            ManagerEvent::WaitElapsed { state, generation } => self.on_wait_elapsed(state, generation),
            ManagerEvent::ResolveResponse { term, generation } => self.on_resolve_response(term, generation),
        }
    }

    // ---- page notifications ----

    pub fn on_selection_changed(&mut self, text: &str) {
        if let Some(event) = self.selection.on_selection_changed(text) {
            self.dispatch(event);
        }
    }

    pub fn on_selection_event(&mut self, event_type: SelectionEventType, x: f32, y: f32) {
        if let Some(event) = self.selection.on_selection_event(event_type, x, y) {
            self.dispatch(event);
        }
    }

    pub fn on_show_unhandled_tap_ui_if_needed(&mut self, x: f32, y: f32) {
        let event = self.selection.on_show_unhandled_tap_ui_if_needed(x, y);
        self.dispatch(event);
    }

    pub fn on_scroll_started(&mut self) {
        let event = self.selection.on_scroll_started();
        self.dispatch(event);
    }

    pub fn on_scroll_ended(&mut self) {
        let event = self.selection.on_scroll_ended(Instant::now());
        self.dispatch(event);
    }

    pub fn on_focused_node_changed(&mut self, editable: bool) {
        self.selection.set_focused_node_editable(editable);
    }

    pub fn on_surrounding_text_available(&mut self, encoding: &str, text: &str, start: usize, end: usize) {
        if !self.state.is_still_working_on(InternalState::GatheringSurroundings) {
            debug!(state = %self.state.state(), "stale surrounding text ignored");
            return;
        }
        // An empty answer means the gesture fizzled in the page.
        if text.is_empty() {
            self.hide_contextual_search(StateChangeReason::Unknown);
            return;
        }
        let Some(context) = self.services.context.as_mut() else {
            self.hide_contextual_search(StateChangeReason::Unknown);
            return;
        };
        context.set_surrounding_text(encoding, text, start, end);
        self.services.notify_context_selection_changed();
        self.with_work(|state, work| state.notify_finished_work_on(InternalState::GatheringSurroundings, work));
    }

    /// Only the answer to the most recent request counts.
    pub fn on_select_around_caret_ack(&mut self, result: Option<SelectAroundCaretResult>) {
        let counter = &mut self.services.select_around_caret_counter;
        *counter = counter.saturating_sub(1);
        if *counter > 0 || !self.state.is_still_working_on(InternalState::StartShowingTapUi) {
            return;
        }

        let Some(result) = result else {
            self.hide_contextual_search(StateChangeReason::Unknown);
            return;
        };

        let adjusted = self.services.context.as_mut().and_then(|context| {
            context.on_selection_adjusted(result.extended_start_adjust, result.extended_end_adjust);
            context.selection()
        });
        self.services.notify_context_selection_changed();
        // The ack may win the race against the selection-changed notification.
        if let Some(adjusted) = adjusted.filter(|s| !s.is_empty()) {
            self.selection.set_selected_text(&adjusted);
        }
        let selected = self.selection.selected_text().unwrap_or_default().to_string();
        self.show_selection_as_search_in_bar(&selected);
        self.with_work(|state, work| state.notify_finished_work_on(InternalState::StartShowingTapUi, work));
    }

    // ---- host notifications ----

    pub fn on_base_page_load_started(&mut self) {
        self.hide_contextual_search(StateChangeReason::Navigation);
        self.selection.reset_all_states();
    }

    pub fn on_tab_switched(&mut self) {
        self.hide_contextual_search(StateChangeReason::TabSwitch);
        self.selection.reset_all_states();
    }

    pub fn on_context_menu_shown(&mut self) {
        self.hide_contextual_search(StateChangeReason::ContextMenu);
        self.selection.reset_all_states();
    }

    pub fn on_accessibility_mode_changed(&mut self, enabled: bool) {
        self.services.is_accessibility_mode_enabled = enabled;
        if enabled {
            self.hide_contextual_search(StateChangeReason::Unknown);
        }
    }

    pub fn on_bottom_sheet_visible(&mut self, visible: bool) {
        self.services.is_bottom_sheet_visible = visible;
        if visible {
            self.hide_contextual_search(StateChangeReason::Reset);
        }
    }

    /// Swaps in a new settings snapshot and abandons the current sequence.
    pub fn on_settings_changed(&mut self, settings: SearchSettings) -> SearchResult<()> {
        settings.validate()?;
        let policy = ContextualSearchPolicy::new(settings);
        self.selection
            .update_settings(policy.suppression().clone(), policy.long_press_resolves());
        self.state.set_retry_states(policy.retry_states());
        self.services.policy = policy;
        info!("contextual search settings changed");
        self.hide_contextual_search(StateChangeReason::SettingsChanged);
        Ok(())
    }

    /// The panel content became visible. Loads the pending search, making up
    /// a verbatim one from the selection when the gesture never resolves.
    pub fn on_content_visible(&mut self) {
        let services = &mut self.services;
        services.were_search_results_seen = true;

        let gesture = self.selection.selection_type();
        let selected = self.selection.selected_text().filter(|s| !s.is_empty());
        if services.search_request.is_none() && services.policy.should_create_verbatim_request(gesture) {
            if let Some(selected) = selected {
                debug!(selection = %selected, "loading verbatim search");
                services.search_request = Some(SearchRequest::literal(selected, false));
                services.did_load_search_request = false;
            }
        }
        services.load_pending_search_request();
    }

    pub fn hide_contextual_search(&mut self, reason: StateChangeReason) {
        self.with_work(|state, work| state.reset(reason, work));
    }

    pub fn destroy(&mut self) {
        self.hide_contextual_search(StateChangeReason::Destroyed);
        self.with_work(|state, work| state.enter(InternalState::Undefined, work));
        info!("contextual search manager destroyed");
    }

    // ---- completions ----

    fn is_current(&self, state: InternalState, generation: u64) -> bool {
        generation == self.services.async_generation && self.state.is_still_working_on(state)
    }

    fn on_wait_elapsed(&mut self, state: InternalState, generation: u64) {
        if !self.is_current(state, generation) {
            debug!(%state, generation, "stale wait ignored");
            return;
        }
        if state == InternalState::WaitingForPossibleTapNearPrevious {
            self.services.panel.hide_caption();
        }
        self.with_work(|controller, work| controller.notify_finished_work_on(state, work));
    }

    fn on_resolve_response(&mut self, term: ResolvedSearchTerm, generation: u64) {
        if !self.is_current(InternalState::Resolving, generation) {
            debug!(generation, "stale resolve response ignored");
            return;
        }

        let selected = self.selection.selected_text().unwrap_or_default().to_string();
        let (message, do_literal_search) = if term.is_network_unavailable {
            (NETWORK_UNAVAILABLE_MESSAGE.to_string(), false)
        } else if !term.is_http_failure() && !term.display_text.is_empty() {
            (term.display_text.clone(), false)
        } else if !self.services.policy.should_show_error_code_in_bar() {
            (selected.clone(), true)
        } else {
            (format!("Error: {}", term.response_code), true)
        };
        if term.is_network_unavailable || term.is_http_failure() {
            warn!(code = term.response_code, offline = term.is_network_unavailable, "resolve failed");
        }

        self.display_resolved_search_term(&term, message, do_literal_search, &selected);
        self.adjust_selection_after_resolve(&term);
        self.with_work(|state, work| state.notify_finished_work_on(InternalState::Resolving, work));
    }

    fn display_resolved_search_term(
        &mut self,
        term: &ResolvedSearchTerm,
        mut message: String,
        do_literal_search: bool,
        selected: &str,
    ) {
        let (mut search_term, prevent_preload) = if do_literal_search {
            (selected.to_string(), true)
        } else {
            (term.search_term.clone(), term.do_prevent_preload)
        };

        let mut pronunciation = None;
        if let Some((word, rest)) = search_term.split_once(DEFINITION_MID_DOT) {
            if !word.is_empty() {
                pronunciation = Some(format!("{}{}", DEFINITION_MID_DOT, rest));
                message = word.to_string();
                search_term = word.to_string();
            }
        }

        let services = &mut self.services;
        services
            .panel
            .on_search_term_resolved(&message, pronunciation.as_deref(), term);
        if !term.caption.is_empty() {
            services.panel.set_caption(&term.caption);
        }

        if search_term.is_empty() {
            return;
        }
        let should_preload = !prevent_preload && services.policy.should_prefetch_search_result();
        let request = if do_literal_search {
            SearchRequest::literal(&search_term, should_preload)
        } else {
            SearchRequest::resolved(term, &search_term, should_preload)
        };
        services.store_search_request(request, should_preload);
    }

    /// Expands the selection as the server suggested, unless the user changed
    /// it while the resolve was in flight.
    fn adjust_selection_after_resolve(&mut self, term: &ResolvedSearchTerm) {
        let eligible = matches!(
            self.selection.selection_type(),
            SelectionType::Tap | SelectionType::ResolvingLongPress
        );
        if !term.has_selection_adjustments() || !eligible {
            return;
        }

        let services = &mut self.services;
        let Some(context) = services.context.as_mut() else {
            return;
        };
        let original = context.selection_being_resolved().map(str::trim);
        let current = self.selection.selected_text().map(str::trim);
        if original.is_none() || original != current {
            debug!("selection changed during resolve; not adjusting");
            return;
        }

        let (start, end) = (term.selection_start_adjust, term.selection_end_adjust);
        self.selection.expect_selection_adjustment();
        services.page.adjust_selection(start, end);
        context.on_selection_adjusted(start, end);
        services.notify_context_selection_changed();
    }

    // ---- plumbing ----

    /// Runs `f` with the state controller and a handler borrowing the rest of
    /// the manager, then runs any work the handler deferred.
    fn with_work<R>(&mut self, f: impl FnOnce(&mut InternalStateController, &mut StateWork<'_>) -> R) -> R {
        let result = {
            let mut work = StateWork::new(&mut self.selection, &mut self.services);
            f(&mut self.state, &mut work)
        };
        self.drain_deferred();
        result
    }

    fn drain_deferred(&mut self) {
        while let Some(deferred) = self.services.deferred.pop_front() {
            match deferred {
                Deferred::DecideSuppression => self.decide_suppression(),
            }
        }
    }

    fn decide_suppression(&mut self) {
        if !self.state.is_still_working_on(InternalState::DecidingSuppression) {
            return;
        }
        let tapped_word = self
            .services
            .context
            .as_ref()
            .and_then(|context| context.tapped_word().cloned());
        let verdict = self
            .selection
            .handle_should_suppress_tap(tapped_word.as_ref(), Instant::now());
        for event in verdict.into_events() {
            self.dispatch(event);
        }
    }

    fn dispatch(&mut self, event: SelectionEvent) {
        event.dispatch_to(self);
    }

    fn show_selection_as_search_in_bar(&mut self, selection: &str) {
        if self.services.panel.is_showing() {
            self.services.panel.set_search_term(selection);
        }
    }

    fn enter(&mut self, state: InternalState) {
        self.with_work(|controller, work| controller.enter(state, work));
    }
}

impl SelectionHandler for ContextualSearchManager {
    fn handle_scroll_start(&mut self) {
        if self.is_suppressed() {
            return;
        }
        self.hide_contextual_search(StateChangeReason::BasePageScroll);
    }

    fn handle_scroll_end(&mut self) {
        if self.selection.selection_type() == SelectionType::ResolvingLongPress {
            self.services.panel.request_panel_show(StateChangeReason::BasePageScroll);
        }
    }

    fn handle_valid_tap(&mut self) {
        if self.is_suppressed() {
            return;
        }
        self.enter(InternalState::TapRecognized);
    }

    fn handle_invalid_tap(&mut self) {
        if self.is_suppressed() {
            return;
        }
        self.hide_contextual_search(StateChangeReason::BasePageTap);
    }

    fn handle_suppressed_tap(&mut self) {
        if self.is_suppressed() {
            return;
        }
        self.hide_contextual_search(StateChangeReason::TapSuppress);
    }

    fn handle_non_suppressed_tap(&mut self, tap_time: Instant) {
        if self.is_suppressed() {
            return;
        }
        debug!(elapsed_ms = tap_time.elapsed().as_millis() as u64, "tap not suppressed");
        if self.state.is_still_working_on(InternalState::DecidingSuppression) {
            self.with_work(|state, work| state.notify_finished_work_on(InternalState::DecidingSuppression, work));
        }
    }

    fn handle_valid_resolving_longpress(&mut self) {
        if self.is_suppressed() {
            return;
        }
        self.enter(InternalState::ResolvingLongPressRecognized);
    }

    fn handle_selection(&mut self, text: &str, valid: bool, selection_type: SelectionType, _x: f32, _y: f32) {
        if self.is_suppressed() || text.is_empty() {
            return;
        }
        if !valid {
            self.hide_contextual_search(StateChangeReason::InvalidSelection);
            return;
        }

        self.show_selection_as_search_in_bar(text);
        match selection_type {
            SelectionType::LongPress => self.enter(InternalState::LongPressRecognized),
            SelectionType::ResolvingLongPress => self.enter(InternalState::ResolvingLongPressRecognized),
            SelectionType::Tap | SelectionType::Undetermined => {}
        }
    }

    fn handle_selection_modification(&mut self, text: &str, valid: bool, _x: f32, _y: f32) {
        if self.is_suppressed() || !self.services.panel.is_showing() {
            return;
        }
        if !valid {
            self.hide_contextual_search(StateChangeReason::InvalidSelection);
            return;
        }

        let services = &mut self.services;
        services.panel.set_search_term(text);
        services.panel.hide_caption();
        if services.search_request.is_some() {
            let prefetch = services.policy.should_prefetch_search_result();
            services.store_search_request(SearchRequest::literal(text, prefetch), false);
        }
    }

    fn handle_selection_dismissal(&mut self) {
        if self.is_suppressed() {
            return;
        }
        if self.services.panel.is_showing() && self.services.panel.is_peeking() {
            self.hide_contextual_search(StateChangeReason::ClearedSelection);
        }
    }

    fn handle_selection_cleared(&mut self) {
        self.enter(InternalState::SelectionClearedRecognized);
    }

    fn handle_metrics_for_would_suppress_tap(&mut self, heuristics: &TapSuppressionHeuristics) {
        debug!(features = ?heuristics.ranker_features(), "tap heuristics");
        self.services.last_heuristics = Some(heuristics.clone());
    }
}
