use tracing::{debug, warn};

use super::transitions::{transition_from, Transition};
use super::{InternalStateHandler, WorkOutcome};
use crate::shared::types::{InternalState, SelectionType, StateChangeReason};

/// Sequences the pipeline from gesture recognition to search completion.
///
/// The handler is passed into every call instead of being owned, so that the
/// orchestrator can lend out its own state for the duration of a cascade.
/// Synchronous work cascades in a loop; the loop stops at the first state whose
/// work is pending.
#[derive(Debug)]
pub struct InternalStateController {
    state: InternalState,
    previous_state: InternalState,
    did_start_work: bool,
    gesture: SelectionType,
    reset_reason: StateChangeReason,
    retry_states: Vec<InternalState>,
}

impl InternalStateController {
    pub fn new(retry_states: Vec<InternalState>) -> Self {
        Self {
            state: InternalState::Undefined,
            previous_state: InternalState::Undefined,
            did_start_work: false,
            gesture: SelectionType::Undetermined,
            reset_reason: StateChangeReason::Unknown,
            retry_states,
        }
    }

    pub fn state(&self) -> InternalState {
        self.state
    }

    pub fn previous_state(&self) -> InternalState {
        self.previous_state
    }

    /// Gesture that started the current sequence.
    pub fn gesture(&self) -> SelectionType {
        self.gesture
    }

    pub fn did_start_work(&self) -> bool {
        self.did_start_work
    }

    pub fn set_retry_states(&mut self, retry_states: Vec<InternalState>) {
        self.retry_states = retry_states;
    }

    /// Abandon whatever is in progress and hide the UI.
    pub fn reset<H: InternalStateHandler + ?Sized>(&mut self, reason: StateChangeReason, handler: &mut H) {
        self.gesture = SelectionType::Undetermined;
        self.reset_reason = reason;
        // Idle has nowhere to go, so its completion is not advanced.
        let _ = self.transition_to(InternalState::Idle, handler);
    }

    /// Start a new sequence at one of the start states.
    ///
    /// # Panics
    ///
    /// When `state` is not a start state.
    pub fn enter<H: InternalStateHandler + ?Sized>(&mut self, state: InternalState, handler: &mut H) {
        assert!(state.is_start_state(), "cannot enter non-start state {}", state);
        debug!(from = %self.state, to = %state, "enter");

        self.previous_state = self.state;
        self.state = state;
        self.gesture = match state {
            InternalState::TapRecognized => SelectionType::Tap,
            InternalState::LongPressRecognized => SelectionType::LongPress,
            InternalState::ResolvingLongPressRecognized => SelectionType::ResolvingLongPress,
            _ => SelectionType::Undetermined,
        };

        self.notify_starting_work_on(state);
        self.notify_finished_work_on(state, handler);
    }

    /// # Panics
    ///
    /// When `state` is not the current state.
    pub fn notify_starting_work_on(&mut self, state: InternalState) {
        assert_eq!(
            state, self.state,
            "starting work on {} while in {}",
            state, self.state
        );
        self.did_start_work = true;
    }

    /// Report that the work for `state` is done and move on.
    ///
    /// Completions for a state the controller has already left are ignored.
    pub fn notify_finished_work_on<H: InternalStateHandler + ?Sized>(&mut self, state: InternalState, handler: &mut H) {
        if state != self.state {
            debug!(finished = %state, current = %self.state, "stale completion ignored");
            return;
        }
        self.did_start_work = false;

        let mut finished = state;
        loop {
            let should_resolve = handler.should_resolve_gesture();
            let next = match transition_from(finished, self.previous_state, self.gesture, should_resolve) {
                Transition::To(next) => next,
                Transition::Reset(reason) => {
                    self.reset(reason, handler);
                    return;
                }
                Transition::Rest => return,
                Transition::Abort => {
                    warn!(state = %finished, "work aborted while idle");
                    return;
                }
            };
            match self.transition_to(next, handler) {
                Some(done) => finished = done,
                None => return,
            }
        }
    }

    pub fn is_still_working_on(&self, state: InternalState) -> bool {
        self.state == state
    }

    /// Enters `state` and runs its work. Returns the state when its work
    /// finished synchronously and the cascade should continue.
    fn transition_to<H: InternalStateHandler + ?Sized>(&mut self, state: InternalState, handler: &mut H) -> Option<InternalState> {
        if state == self.state && !self.should_retry_current_state(state, handler) {
            debug!(%state, "self-transition skipped");
            return None;
        }

        debug!(from = %self.state, to = %state, "state_transition");
        self.previous_state = self.state;
        self.state = state;
        self.notify_starting_work_on(state);

        match self.start_work(state, handler) {
            WorkOutcome::Finished => {
                self.did_start_work = false;
                Some(state)
            }
            WorkOutcome::Pending => None,
            WorkOutcome::Abandon(reason) => {
                debug!(%state, %reason, "work abandoned");
                self.reset(reason, handler);
                None
            }
        }
    }

    fn should_retry_current_state<H: InternalStateHandler + ?Sized>(&self, state: InternalState, handler: &H) -> bool {
        self.retry_states.contains(&state) && handler.is_ui_out_of_sync(state)
    }

    fn start_work<H: InternalStateHandler + ?Sized>(&mut self, state: InternalState, handler: &mut H) -> WorkOutcome {
        use InternalState::*;

        match state {
            Idle => {
                handler.hide_ui(self.reset_reason);
                WorkOutcome::Finished
            }
            Undefined
            | LongPressRecognized
            | ResolvingLongPressRecognized
            | TapRecognized
            | SelectionClearedRecognized => WorkOutcome::Finished,
            ShowingLiteralSearch => handler.show_literal_search_ui(),
            WaitingForPossibleTapNearPrevious => handler.wait_for_possible_tap_near_previous(),
            WaitingForPossibleTapOnTapSelection => handler.wait_for_possible_tap_on_tap_selection(),
            TapGestureCommit => handler.tap_gesture_commit(),
            GatheringSurroundings => handler.gather_surrounding_text(),
            DecidingSuppression => handler.decide_suppression(),
            StartShowingTapUi => handler.start_showing_tap_ui(),
            ShowResolvingUi => handler.show_resolving_ui(),
            Resolving => handler.resolve_search_term(),
            ShowingTapSearch => handler.showing_tap_search(),
            ShowingResolvedLongPressSearch => handler.showing_intelligent_longpress(),
            SearchCompleted => handler.complete_search(),
        }
    }
}

impl Default for InternalStateController {
    fn default() -> Self {
        Self::new(vec![InternalState::Idle])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use InternalState::*;

    /// Records every call; states listed in `pending` suspend the cascade.
    #[derive(Default)]
    struct FakeHandler {
        calls: Vec<String>,
        hides: Vec<StateChangeReason>,
        pending: HashSet<InternalState>,
        abandon: Option<(InternalState, StateChangeReason)>,
        should_resolve: bool,
        ui_showing: bool,
    }

    impl FakeHandler {
        fn with_pending(states: &[InternalState]) -> Self {
            Self {
                pending: states.iter().copied().collect(),
                ..Self::default()
            }
        }

        fn work(&mut self, state: InternalState, name: &str) -> WorkOutcome {
            self.calls.push(name.to_string());
            if let Some((abandon_state, reason)) = self.abandon {
                if abandon_state == state {
                    return WorkOutcome::Abandon(reason);
                }
            }
            if self.pending.contains(&state) {
                WorkOutcome::Pending
            } else {
                WorkOutcome::Finished
            }
        }
    }

    impl InternalStateHandler for FakeHandler {
        fn hide_ui(&mut self, reason: StateChangeReason) {
            self.calls.push("hide_ui".to_string());
            self.hides.push(reason);
            self.ui_showing = false;
        }
        fn show_literal_search_ui(&mut self) -> WorkOutcome {
            self.work(ShowingLiteralSearch, "show_literal_search_ui")
        }
        fn show_resolving_ui(&mut self) -> WorkOutcome {
            self.work(ShowResolvingUi, "show_resolving_ui")
        }
        fn tap_gesture_commit(&mut self) -> WorkOutcome {
            self.work(TapGestureCommit, "tap_gesture_commit")
        }
        fn gather_surrounding_text(&mut self) -> WorkOutcome {
            self.work(GatheringSurroundings, "gather_surrounding_text")
        }
        fn decide_suppression(&mut self) -> WorkOutcome {
            self.work(DecidingSuppression, "decide_suppression")
        }
        fn start_showing_tap_ui(&mut self) -> WorkOutcome {
            self.work(StartShowingTapUi, "start_showing_tap_ui")
        }
        fn wait_for_possible_tap_near_previous(&mut self) -> WorkOutcome {
            self.work(WaitingForPossibleTapNearPrevious, "wait_for_possible_tap_near_previous")
        }
        fn wait_for_possible_tap_on_tap_selection(&mut self) -> WorkOutcome {
            self.work(WaitingForPossibleTapOnTapSelection, "wait_for_possible_tap_on_tap_selection")
        }
        fn resolve_search_term(&mut self) -> WorkOutcome {
            self.work(Resolving, "resolve_search_term")
        }
        fn showing_tap_search(&mut self) -> WorkOutcome {
            self.work(ShowingTapSearch, "showing_tap_search")
        }
        fn showing_intelligent_longpress(&mut self) -> WorkOutcome {
            self.work(ShowingResolvedLongPressSearch, "showing_intelligent_longpress")
        }
        fn complete_search(&mut self) -> WorkOutcome {
            self.work(SearchCompleted, "complete_search")
        }
        fn should_resolve_gesture(&self) -> bool {
            self.should_resolve
        }
        fn is_ui_out_of_sync(&self, _state: InternalState) -> bool {
            self.ui_showing
        }
    }

    fn idle_controller(handler: &mut FakeHandler) -> InternalStateController {
        let mut controller = InternalStateController::default();
        controller.reset(StateChangeReason::Reset, handler);
        handler.calls.clear();
        handler.hides.clear();
        controller
    }

    #[test]
    fn test_tap_cascade_stops_at_gathering() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings]);
        let mut controller = idle_controller(&mut handler);

        controller.enter(TapRecognized, &mut handler);

        assert_eq!(controller.state(), GatheringSurroundings);
        assert_eq!(controller.gesture(), SelectionType::Tap);
        assert!(controller.did_start_work());
        assert_eq!(handler.calls, vec!["tap_gesture_commit", "gather_surrounding_text"]);
    }

    #[test]
    fn test_tap_end_to_end_without_resolve() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings, StartShowingTapUi]);
        let mut controller = idle_controller(&mut handler);

        controller.enter(TapRecognized, &mut handler);
        assert_eq!(controller.state(), GatheringSurroundings);

        controller.notify_finished_work_on(GatheringSurroundings, &mut handler);
        assert_eq!(controller.state(), StartShowingTapUi);

        controller.notify_finished_work_on(StartShowingTapUi, &mut handler);
        assert_eq!(controller.state(), SearchCompleted);
        assert!(!controller.did_start_work());

        assert_eq!(
            handler.calls,
            vec![
                "tap_gesture_commit",
                "gather_surrounding_text",
                "decide_suppression",
                "start_showing_tap_ui",
                "show_resolving_ui",
                "showing_tap_search",
                "complete_search",
            ]
        );
    }

    #[test]
    fn test_tap_with_resolve_suspends_at_resolving() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings, Resolving]);
        handler.should_resolve = true;
        let mut controller = idle_controller(&mut handler);

        controller.enter(TapRecognized, &mut handler);
        controller.notify_finished_work_on(GatheringSurroundings, &mut handler);
        assert_eq!(controller.state(), Resolving);

        controller.notify_finished_work_on(Resolving, &mut handler);
        assert_eq!(controller.state(), SearchCompleted);
        assert!(handler.calls.contains(&"showing_tap_search".to_string()));
    }

    #[test]
    fn test_stale_completion_is_a_no_op() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings, Resolving]);
        handler.should_resolve = true;
        let mut controller = idle_controller(&mut handler);

        controller.enter(ResolvingLongPressRecognized, &mut handler);
        controller.notify_finished_work_on(GatheringSurroundings, &mut handler);
        assert_eq!(controller.state(), Resolving);

        controller.reset(StateChangeReason::BasePageTap, &mut handler);
        assert_eq!(controller.state(), Idle);
        let calls_before = handler.calls.clone();

        controller.notify_finished_work_on(Resolving, &mut handler);
        assert_eq!(controller.state(), Idle);
        assert_eq!(handler.calls, calls_before);
        assert!(!controller.is_still_working_on(Resolving));
    }

    #[test]
    fn test_repeated_reset_hides_once() {
        let mut handler = FakeHandler::default();
        let mut controller = idle_controller(&mut handler);

        controller.reset(StateChangeReason::Reset, &mut handler);
        controller.reset(StateChangeReason::Reset, &mut handler);
        assert!(handler.hides.is_empty());

        let mut handler = FakeHandler::default();
        let mut controller = InternalStateController::default();
        controller.reset(StateChangeReason::Reset, &mut handler);
        controller.reset(StateChangeReason::Reset, &mut handler);
        assert_eq!(handler.hides, vec![StateChangeReason::Reset]);
    }

    #[test]
    fn test_reset_retries_when_ui_out_of_sync() {
        let mut handler = FakeHandler::default();
        let mut controller = idle_controller(&mut handler);

        handler.ui_showing = true;
        controller.reset(StateChangeReason::BasePageScroll, &mut handler);
        assert_eq!(handler.hides, vec![StateChangeReason::BasePageScroll]);

        // No retry once Idle is no longer a retry state.
        controller.set_retry_states(Vec::new());
        handler.ui_showing = true;
        controller.reset(StateChangeReason::BasePageScroll, &mut handler);
        assert_eq!(handler.hides.len(), 1);
    }

    #[test]
    fn test_long_press_shows_literal_search() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings]);
        let mut controller = idle_controller(&mut handler);

        controller.enter(LongPressRecognized, &mut handler);
        controller.notify_finished_work_on(GatheringSurroundings, &mut handler);

        assert_eq!(controller.state(), SearchCompleted);
        assert_eq!(
            handler.calls,
            vec!["gather_surrounding_text", "show_literal_search_ui", "complete_search"]
        );
    }

    #[test]
    fn test_resolving_long_press_shows_intelligent_search() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings, Resolving]);
        handler.should_resolve = true;
        let mut controller = idle_controller(&mut handler);

        controller.enter(ResolvingLongPressRecognized, &mut handler);
        controller.notify_finished_work_on(GatheringSurroundings, &mut handler);
        controller.notify_finished_work_on(Resolving, &mut handler);

        assert_eq!(controller.state(), SearchCompleted);
        assert!(handler.calls.contains(&"showing_intelligent_longpress".to_string()));
        assert!(!handler.calls.contains(&"decide_suppression".to_string()));
    }

    #[test]
    fn test_tap_on_showing_search_waits_first() {
        let mut handler = FakeHandler::with_pending(&[WaitingForPossibleTapOnTapSelection, GatheringSurroundings]);
        let mut controller = idle_controller(&mut handler);
        controller.enter(LongPressRecognized, &mut handler);
        controller.notify_finished_work_on(GatheringSurroundings, &mut handler);
        assert_eq!(controller.state(), SearchCompleted);

        handler.calls.clear();
        controller.enter(TapRecognized, &mut handler);
        assert_eq!(controller.state(), WaitingForPossibleTapOnTapSelection);
        assert_eq!(controller.previous_state(), TapRecognized);

        controller.notify_finished_work_on(WaitingForPossibleTapOnTapSelection, &mut handler);
        assert_eq!(controller.state(), GatheringSurroundings);
    }

    #[test]
    fn test_cleared_selection_waits_then_resets() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings, WaitingForPossibleTapNearPrevious]);
        let mut controller = idle_controller(&mut handler);
        controller.enter(LongPressRecognized, &mut handler);
        controller.notify_finished_work_on(GatheringSurroundings, &mut handler);

        controller.enter(SelectionClearedRecognized, &mut handler);
        assert_eq!(controller.state(), WaitingForPossibleTapNearPrevious);

        controller.notify_finished_work_on(WaitingForPossibleTapNearPrevious, &mut handler);
        assert_eq!(controller.state(), Idle);
        assert_eq!(handler.hides, vec![StateChangeReason::BasePageTap]);
    }

    #[test]
    fn test_cleared_selection_while_idle_resets_directly() {
        let mut handler = FakeHandler::default();
        let mut controller = idle_controller(&mut handler);
        handler.ui_showing = true;

        controller.enter(SelectionClearedRecognized, &mut handler);
        assert_eq!(controller.state(), Idle);
        assert_eq!(handler.hides, vec![StateChangeReason::ClearedSelection]);
    }

    #[test]
    fn test_abandoned_work_resets() {
        let mut handler = FakeHandler::with_pending(&[GatheringSurroundings]);
        handler.abandon = Some((TapGestureCommit, StateChangeReason::Unknown));
        let mut controller = idle_controller(&mut handler);

        controller.enter(TapRecognized, &mut handler);
        assert_eq!(controller.state(), Idle);
        assert_eq!(controller.gesture(), SelectionType::Undetermined);
        assert!(!handler.calls.contains(&"gather_surrounding_text".to_string()));
    }

    #[test]
    fn test_finishing_idle_is_ignored() {
        let mut handler = FakeHandler::default();
        let mut controller = idle_controller(&mut handler);
        controller.notify_finished_work_on(Idle, &mut handler);
        assert_eq!(controller.state(), Idle);
        assert!(handler.calls.is_empty());
    }

    #[test]
    #[should_panic(expected = "cannot enter non-start state")]
    fn test_enter_non_start_state_panics() {
        let mut handler = FakeHandler::default();
        let mut controller = InternalStateController::default();
        controller.enter(Resolving, &mut handler);
    }

    #[test]
    #[should_panic(expected = "starting work on")]
    fn test_starting_work_on_other_state_panics() {
        let mut controller = InternalStateController::default();
        controller.notify_starting_work_on(Resolving);
    }
}
