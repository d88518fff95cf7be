//! State work for the manager
//!
//! [`StateWork`] borrows the selection controller and the manager's services
//! for the length of one state-controller call and performs the work of each
//! state against the page, the panel and the resolver.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use super::bridge::{ContextSelection, ContextualSearchObserver, ObserverId, PageBridge, SearchPanel};
use super::event_loop::ManagerEvent;
use super::resolver::{failure_response, ResolveRequest, SearchTermResolver};
use crate::core::context::SearchContext;
use crate::core::heuristics::TapSuppressionHeuristics;
use crate::core::policy::ContextualSearchPolicy;
use crate::core::selection::SelectionController;
use crate::core::state::{InternalStateHandler, WorkOutcome};
use crate::shared::types::{InternalState, SearchRequest, SelectionType, StateChangeReason};

/// Work that needs the whole manager and runs once the current call unwinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Deferred {
    DecideSuppression,
}

/// Everything the manager owns besides the two controllers.
pub(super) struct Services {
    pub policy: ContextualSearchPolicy,
    pub page: Box<dyn PageBridge>,
    pub panel: Box<dyn SearchPanel>,
    pub resolver: Arc<dyn SearchTermResolver>,
    pub events: UnboundedSender<ManagerEvent>,
    pub runtime: Handle,
    /// Context of the attempt in progress; rebuilt on every gather.
    pub context: Option<SearchContext>,
    pub search_request: Option<SearchRequest>,
    /// The stored request was handed to the panel.
    pub did_load_search_request: bool,
    /// The panel content became visible during this search.
    pub were_search_results_seen: bool,
    pub observers: Vec<(ObserverId, Box<dyn ContextualSearchObserver>)>,
    pub next_observer_id: u64,
    /// Observers were told about a showing search and still await its end.
    pub is_search_observed: bool,
    pub select_around_caret_counter: u32,
    /// Bumped for every timer or resolve dispatched; late answers carry an old value.
    pub async_generation: u64,
    pub last_heuristics: Option<TapSuppressionHeuristics>,
    pub was_activated_by_tap: bool,
    pub is_accessibility_mode_enabled: bool,
    pub is_bottom_sheet_visible: bool,
    pub deferred: VecDeque<Deferred>,
}

impl Services {
    pub fn is_suppressed(&self) -> bool {
        self.is_accessibility_mode_enabled || self.is_bottom_sheet_visible
    }

    /// Stores `request` as the current search. It is loaded right away when
    /// asked to, or when the user is already looking at the results.
    pub fn store_search_request(&mut self, request: SearchRequest, load: bool) {
        let load = load || self.were_search_results_seen;
        if load {
            self.panel.load_search(&request);
        }
        self.search_request = Some(request);
        self.did_load_search_request = load;
    }

    /// Loads the stored request unless the panel already has it.
    pub fn load_pending_search_request(&mut self) {
        if self.did_load_search_request {
            return;
        }
        if let Some(request) = &self.search_request {
            self.panel.load_search(request);
            self.did_load_search_request = true;
        }
    }

    /// Reports the current context selection to every observer.
    pub fn notify_context_selection_changed(&mut self) {
        let Some(context) = self.context.as_ref() else {
            return;
        };
        let (Some(text), Some(start), Some(end)) =
            (context.surrounding_text(), context.selection_start(), context.selection_end())
        else {
            return;
        };
        let selection = ContextSelection {
            encoding: context.encoding().to_string(),
            surrounding_text: text.to_string(),
            start,
            end,
        };
        let shared = self.policy.can_send_surroundings().then_some(&selection);
        for (_, observer) in &mut self.observers {
            observer.on_show_contextual_search(shared);
        }
        self.is_search_observed = true;
    }

    fn notify_hide(&mut self) {
        if !std::mem::take(&mut self.is_search_observed) {
            return;
        }
        for (_, observer) in &mut self.observers {
            observer.on_hide_contextual_search();
        }
    }

    fn next_generation(&mut self) -> u64 {
        self.async_generation += 1;
        self.async_generation
    }

    fn schedule_wait(&mut self, state: InternalState, delay: Duration) {
        let generation = self.next_generation();
        let events = self.events.clone();
        self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(ManagerEvent::WaitElapsed { state, generation }).is_err() {
                debug!(%state, "manager gone before wait elapsed");
            }
        });
    }

    fn dispatch_resolve(&mut self, request: ResolveRequest) {
        let generation = self.next_generation();
        let events = self.events.clone();
        let resolver = Arc::clone(&self.resolver);
        self.runtime.spawn(async move {
            let term = match resolver.resolve(request).await {
                Ok(term) => term,
                Err(err) => failure_response(&err),
            };
            if events.send(ManagerEvent::ResolveResponse { term, generation }).is_err() {
                debug!("manager gone before resolve response");
            }
        });
    }
}

pub(super) struct StateWork<'a> {
    pub selection: &'a mut SelectionController,
    pub services: &'a mut Services,
}

impl<'a> StateWork<'a> {
    pub fn new(selection: &'a mut SelectionController, services: &'a mut Services) -> Self {
        Self { selection, services }
    }

    /// Shows the panel for the current selection. Non-resolving gestures
    /// get a literal search right away.
    fn show_contextual_search(&mut self, reason: StateChangeReason) -> WorkOutcome {
        if !self.should_resolve_gesture() {
            let selection = self.selection.selected_text().unwrap_or_default().to_string();
            if selection.is_empty() {
                return WorkOutcome::Abandon(StateChangeReason::Unknown);
            }
            let prefetch = self.services.policy.should_prefetch_search_result();
            self.services.panel.set_search_term(&selection);
            self.services
                .store_search_request(SearchRequest::literal(&selection, prefetch), prefetch);
        }

        self.services.panel.request_panel_show(reason);
        self.services.was_activated_by_tap = self.selection.is_tap_selection();
        WorkOutcome::Finished
    }
}

impl InternalStateHandler for StateWork<'_> {
    fn hide_ui(&mut self, reason: StateChangeReason) {
        let services = &mut *self.services;
        services.context = None;

        if services.panel.is_showing() {
            if let Some(heuristics) = services.last_heuristics.take() {
                heuristics.log_results_seen(
                    services.panel.was_search_content_viewed(),
                    services.was_activated_by_tap,
                );
            }
            services.panel.close_panel(reason);
            // The user acted on a selection whose results were seen.
            if services.were_search_results_seen && reason != StateChangeReason::InvalidSelection {
                services.page.clear_selection();
                self.selection.clear_selection();
            }
        } else if self.selection.is_tap_selection() {
            services.page.clear_selection();
            self.selection.clear_selection();
        }

        services.search_request = None;
        services.did_load_search_request = false;
        services.were_search_results_seen = false;
        services.was_activated_by_tap = false;
        services.notify_hide();
        info!(%reason, "contextual search hidden");
    }

    fn show_literal_search_ui(&mut self) -> WorkOutcome {
        let reason = if self.selection.selection_type() == SelectionType::LongPress {
            StateChangeReason::TextSelectLongPress
        } else {
            StateChangeReason::TextSelectTap
        };
        self.show_contextual_search(reason)
    }

    fn show_resolving_ui(&mut self) -> WorkOutcome {
        match self.selection.selection_type() {
            SelectionType::Undetermined => WorkOutcome::Abandon(StateChangeReason::InvalidSelection),
            SelectionType::Tap => self.show_contextual_search(StateChangeReason::TextSelectTap),
            _ => self.show_contextual_search(StateChangeReason::TextSelectLongPress),
        }
    }

    fn tap_gesture_commit(&mut self) -> WorkOutcome {
        if !self.services.policy.is_tap_supported()
            || self.selection.selection_type() == SelectionType::ResolvingLongPress
        {
            return WorkOutcome::Abandon(StateChangeReason::Unknown);
        }
        WorkOutcome::Finished
    }

    fn gather_surrounding_text(&mut self) -> WorkOutcome {
        let mut context = SearchContext::new();
        if self.should_resolve_gesture() {
            context.set_resolve_properties(self.services.policy.resolve_properties());
        }
        self.services.context = Some(context);

        if !self.services.page.is_available() {
            return WorkOutcome::Abandon(StateChangeReason::Unknown);
        }
        self.services.page.gather_surrounding_text();
        WorkOutcome::Pending
    }

    fn decide_suppression(&mut self) -> WorkOutcome {
        self.services.deferred.push_back(Deferred::DecideSuppression);
        WorkOutcome::Pending
    }

    fn start_showing_tap_ui(&mut self) -> WorkOutcome {
        if !self.services.page.is_available() {
            return WorkOutcome::Abandon(StateChangeReason::Unknown);
        }
        self.services.select_around_caret_counter += 1;
        self.services.page.select_around_caret();
        WorkOutcome::Pending
    }

    fn wait_for_possible_tap_near_previous(&mut self) -> WorkOutcome {
        let delay = self.services.policy.tap_near_previous_delay();
        self.services
            .schedule_wait(InternalState::WaitingForPossibleTapNearPrevious, delay);
        WorkOutcome::Pending
    }

    fn wait_for_possible_tap_on_tap_selection(&mut self) -> WorkOutcome {
        let delay = self.services.policy.tap_on_tap_selection_delay();
        self.services
            .schedule_wait(InternalState::WaitingForPossibleTapOnTapSelection, delay);
        WorkOutcome::Pending
    }

    fn resolve_search_term(&mut self) -> WorkOutcome {
        let is_exact_resolve = self.selection.is_adjusted_selection();
        let available = self.services.page.is_available();
        let Some(context) = self.services.context.as_mut().filter(|c| available && c.can_resolve()) else {
            return WorkOutcome::Abandon(StateChangeReason::Unknown);
        };

        context.prepare_to_resolve(is_exact_resolve);
        let Some(request) = ResolveRequest::from_context(context) else {
            return WorkOutcome::Abandon(StateChangeReason::Unknown);
        };
        let following = context.text_content_following_selection().unwrap_or_default();
        let selection = self.selection.selected_text().unwrap_or_default().to_string();

        self.services.dispatch_resolve(request);
        self.services.panel.set_context_details(&selection, &following);
        WorkOutcome::Pending
    }

    fn showing_tap_search(&mut self) -> WorkOutcome {
        debug!("showing tap search");
        WorkOutcome::Finished
    }

    fn showing_intelligent_longpress(&mut self) -> WorkOutcome {
        debug!("showing resolved long-press search");
        WorkOutcome::Finished
    }

    fn complete_search(&mut self) -> WorkOutcome {
        if self.services.policy.should_force_caption() {
            self.services.panel.ensure_caption();
        }
        WorkOutcome::Finished
    }

    fn should_resolve_gesture(&self) -> bool {
        self.services.policy.should_resolve(self.selection.selection_type())
    }

    fn is_ui_out_of_sync(&self, _state: InternalState) -> bool {
        self.services.panel.is_showing()
    }
}
