//! Gesture-to-search state machine
//!
//! [`InternalStateController`] owns the current [`InternalState`] and decides
//! every transition through [`transition_from`]. The work for each state is
//! done by an [`InternalStateHandler`]; asynchronous work reports back with
//! [`InternalStateController::notify_finished_work_on`], which is dropped when
//! the controller has moved on in the meantime.

pub mod controller;
pub mod transitions;

pub use controller::InternalStateController;
pub use transitions::{transition_from, Transition};

use crate::shared::types::{InternalState, StateChangeReason};

/// What happened to the work started for a state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkOutcome {
    /// Done synchronously; the controller transitions right away.
    Finished,
    /// Dispatched; the handler calls `notify_finished_work_on` when it completes.
    Pending,
    /// Cannot continue; the controller resets to `Idle` with this reason.
    Abandon(StateChangeReason),
}

/// The work performed in each state.
///
/// The controller marks work as started before calling a work method, so
/// implementations only report how it ended.
pub trait InternalStateHandler {
    fn hide_ui(&mut self, reason: StateChangeReason);

    fn show_literal_search_ui(&mut self) -> WorkOutcome;

    fn show_resolving_ui(&mut self) -> WorkOutcome;

    fn tap_gesture_commit(&mut self) -> WorkOutcome;

    fn gather_surrounding_text(&mut self) -> WorkOutcome;

    fn decide_suppression(&mut self) -> WorkOutcome;

    fn start_showing_tap_ui(&mut self) -> WorkOutcome;

    fn wait_for_possible_tap_near_previous(&mut self) -> WorkOutcome;

    fn wait_for_possible_tap_on_tap_selection(&mut self) -> WorkOutcome;

    fn resolve_search_term(&mut self) -> WorkOutcome;

    fn showing_tap_search(&mut self) -> WorkOutcome;

    fn showing_intelligent_longpress(&mut self) -> WorkOutcome;

    fn complete_search(&mut self) -> WorkOutcome;

    /// Whether the current gesture should go through a server resolve.
    fn should_resolve_gesture(&self) -> bool;

    /// Whether the visible UI disagrees with `state`, so re-entering it must redo its work.
    fn is_ui_out_of_sync(&self, _state: InternalState) -> bool {
        false
    }
}
