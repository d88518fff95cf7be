use tokio::time::Instant;
use tracing::debug;

use super::validation::is_valid_selection;
use super::SelectionEvent;
use crate::core::context::TappedWord;
use crate::core::heuristics::{TapInputs, TapSuppressionHeuristics};
use crate::shared::settings::SuppressionSettings;
use crate::shared::types::{SelectionEventType, SelectionType, TapState};

/// Outcome of running the suppression heuristics for the current tap.
#[derive(Debug, Clone)]
pub struct TapSuppressionVerdict {
    pub heuristics: TapSuppressionHeuristics,
    pub suppressed: bool,
    pub tap_time: Instant,
}

impl TapSuppressionVerdict {
    /// The metrics report followed by the decision itself.
    pub fn into_events(self) -> [SelectionEvent; 2] {
        let decision = if self.suppressed {
            SelectionEvent::SuppressedTap
        } else {
            SelectionEvent::NonSuppressedTap {
                tap_time: self.tap_time,
            }
        };
        [SelectionEvent::WouldSuppressTapMetrics(self.heuristics), decision]
    }
}

/// Tracks what is selected on the page and how it got selected.
///
/// Every input returns at most one [`SelectionEvent`]; the caller dispatches
/// it to its [`SelectionHandler`](super::SelectionHandler).
#[derive(Debug)]
pub struct SelectionController {
    selected_text: Option<String>,
    selection_type: SelectionType,
    is_adjusted_selection: bool,
    are_handles_shown: bool,
    is_dragging_handles: bool,
    was_tap_gesture_detected: bool,
    /// Handles appeared before the selected text was known.
    awaiting_long_press_text: bool,
    /// The next selection change is our own expansion and must not be reported.
    did_expand_selection: bool,
    is_focused_node_editable: bool,
    long_press_resolves: bool,
    x: f32,
    y: f32,
    last_tap: Option<TapState>,
    last_scroll_end: Option<Instant>,
    suppression: SuppressionSettings,
}

impl SelectionController {
    pub fn new(suppression: SuppressionSettings, long_press_resolves: bool) -> Self {
        Self {
            selected_text: None,
            selection_type: SelectionType::Undetermined,
            is_adjusted_selection: false,
            are_handles_shown: false,
            is_dragging_handles: false,
            was_tap_gesture_detected: false,
            awaiting_long_press_text: false,
            did_expand_selection: false,
            is_focused_node_editable: false,
            long_press_resolves,
            x: 0.0,
            y: 0.0,
            last_tap: None,
            last_scroll_end: None,
            suppression,
        }
    }

    pub fn update_settings(&mut self, suppression: SuppressionSettings, long_press_resolves: bool) {
        self.suppression = suppression;
        self.long_press_resolves = long_press_resolves;
    }

    // ---- page inputs ----

    pub fn on_scroll_started(&mut self) -> SelectionEvent {
        SelectionEvent::ScrollStart
    }

    pub fn on_scroll_ended(&mut self, now: Instant) -> SelectionEvent {
        self.last_scroll_end = Some(now);
        SelectionEvent::ScrollEnd
    }

    /// A tap landed on non-editable content that the page did not consume.
    pub fn on_show_unhandled_tap_ui_if_needed(&mut self, x: f32, y: f32) -> SelectionEvent {
        self.was_tap_gesture_detected = false;
        let is_long_press_selection = matches!(
            self.selection_type,
            SelectionType::LongPress | SelectionType::ResolvingLongPress
        );
        if is_long_press_selection && self.are_handles_shown {
            self.last_tap = None;
            return SelectionEvent::InvalidTap;
        }

        self.selection_type = SelectionType::Tap;
        self.is_adjusted_selection = false;
        self.was_tap_gesture_detected = true;
        self.x = x;
        self.y = y;
        SelectionEvent::ValidTap
    }

    pub fn on_selection_changed(&mut self, selection: &str) -> Option<SelectionEvent> {
        if self.did_expand_selection {
            self.did_expand_selection = false;
            self.selected_text = Some(selection.to_string());
            return None;
        }

        if selection.is_empty() {
            let had_selection = self.selected_text.as_deref().map_or(false, |s| !s.is_empty());
            self.selected_text = None;
            if !had_selection {
                return None;
            }
            self.selection_type = SelectionType::Undetermined;
            self.is_adjusted_selection = false;
            self.awaiting_long_press_text = false;
            return Some(SelectionEvent::Cleared);
        }

        self.selected_text = Some(selection.to_string());

        if self.was_tap_gesture_detected {
            self.was_tap_gesture_detected = false;
            return Some(self.established(selection));
        }

        if self.awaiting_long_press_text {
            self.awaiting_long_press_text = false;
            let valid = self.is_valid(selection);
            if valid && self.selection_type == SelectionType::ResolvingLongPress {
                return Some(SelectionEvent::ValidResolvingLongpress);
            }
            return Some(self.established(selection));
        }

        Some(SelectionEvent::Modified {
            text: selection.to_string(),
            valid: self.is_valid(selection),
            x: self.x,
            y: self.y,
        })
    }

    pub fn on_selection_event(&mut self, event: SelectionEventType, x: f32, y: f32) -> Option<SelectionEvent> {
        match event {
            SelectionEventType::HandlesShown => {
                self.are_handles_shown = true;
                self.was_tap_gesture_detected = false;
                self.is_adjusted_selection = false;
                self.selection_type = if self.long_press_resolves {
                    SelectionType::ResolvingLongPress
                } else {
                    SelectionType::LongPress
                };
                self.x = x;
                self.y = y;
                match self.selected_text.clone().filter(|s| !s.is_empty()) {
                    Some(text) => Some(self.established(&text)),
                    None => {
                        self.awaiting_long_press_text = true;
                        None
                    }
                }
            }
            SelectionEventType::HandlesCleared => {
                self.clear_selection();
                Some(SelectionEvent::Dismissed)
            }
            SelectionEventType::HandleDragStarted => {
                self.is_dragging_handles = true;
                None
            }
            SelectionEventType::HandleDragStopped => {
                self.is_dragging_handles = false;
                self.is_adjusted_selection = true;
                self.x = x;
                self.y = y;
                let text = self.selected_text.clone().filter(|s| !s.is_empty())?;
                Some(self.established(&text))
            }
        }
    }

    /// Runs the suppression heuristics for the tap being processed and
    /// remembers it as the previous tap.
    pub fn handle_should_suppress_tap(&mut self, tapped_word: Option<&TappedWord>, now: Instant) -> TapSuppressionVerdict {
        let inputs = TapInputs {
            x: self.x,
            y: self.y,
            now,
            previous_tap: self.last_tap.as_ref(),
            last_scroll_end: self.last_scroll_end,
            tapped_word,
        };
        let heuristics = TapSuppressionHeuristics::new(&inputs, &self.suppression);
        heuristics.log_condition_state();

        self.last_tap = Some(TapState::new(self.x, self.y, now));
        let suppressed = heuristics.should_suppress_tap();
        debug!(suppressed, x = self.x, y = self.y, "tap suppression decided");
        TapSuppressionVerdict {
            heuristics,
            suppressed,
            tap_time: now,
        }
    }

    fn established(&self, text: &str) -> SelectionEvent {
        SelectionEvent::Established {
            text: text.to_string(),
            valid: self.is_valid(text),
            selection_type: self.selection_type,
            x: self.x,
            y: self.y,
        }
    }

    fn is_valid(&self, text: &str) -> bool {
        is_valid_selection(text, self.is_focused_node_editable)
    }

    // ---- commands from the orchestrator ----

    /// Overrides the selected text, used when a caret expansion ack races the
    /// selection-changed notification.
    pub fn set_selected_text(&mut self, text: &str) {
        self.selected_text = Some(text.to_string());
    }

    /// Marks the next selection change as our own expansion.
    pub fn expect_selection_adjustment(&mut self) {
        self.did_expand_selection = true;
    }

    /// Forgets the current selection; the caller collapses it in the page.
    /// The previous tap is kept for the next suppression decision.
    pub fn clear_selection(&mut self) {
        self.selected_text = None;
        self.selection_type = SelectionType::Undetermined;
        self.is_adjusted_selection = false;
        self.are_handles_shown = false;
        self.is_dragging_handles = false;
        self.was_tap_gesture_detected = false;
        self.awaiting_long_press_text = false;
        self.did_expand_selection = false;
    }

    /// Forgets everything, including the previous tap. Used on navigation,
    /// tab switches and context menus.
    pub fn reset_all_states(&mut self) {
        self.clear_selection();
        self.last_tap = None;
        self.last_scroll_end = None;
    }

    pub fn set_focused_node_editable(&mut self, editable: bool) {
        self.is_focused_node_editable = editable;
    }

    // ---- queries ----

    pub fn selected_text(&self) -> Option<&str> {
        self.selected_text.as_deref()
    }

    pub fn selection_type(&self) -> SelectionType {
        self.selection_type
    }

    pub fn is_tap_selection(&self) -> bool {
        self.selection_type == SelectionType::Tap
    }

    /// True once the user moved a handle; resolves must then match exactly.
    pub fn is_adjusted_selection(&self) -> bool {
        self.is_adjusted_selection
    }

    pub fn are_handles_shown(&self) -> bool {
        self.are_handles_shown
    }

    pub fn is_dragging_handles(&self) -> bool {
        self.is_dragging_handles
    }

    pub fn last_tap(&self) -> Option<&TapState> {
        self.last_tap.as_ref()
    }
}
