use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::time::Instant;

/// States of the gesture-to-search pipeline.
///
/// Start states may be entered from outside the state controller; transitional
/// states are only reached through the transition table; `SearchCompleted` is
/// the resting state at the end of every successful sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InternalState {
    // Start states
    Undefined,
    Idle,
    LongPressRecognized,
    ResolvingLongPressRecognized,
    TapRecognized,
    SelectionClearedRecognized,

    // Transitional states
    ShowingLiteralSearch,
    WaitingForPossibleTapNearPrevious,
    WaitingForPossibleTapOnTapSelection,
    TapGestureCommit,
    GatheringSurroundings,
    DecidingSuppression,
    StartShowingTapUi,
    ShowResolvingUi,
    Resolving,
    ShowingTapSearch,
    ShowingResolvedLongPressSearch,

    // Resting state
    SearchCompleted,
}

impl InternalState {
    pub const ALL: [InternalState; 18] = [
        InternalState::Undefined,
        InternalState::Idle,
        InternalState::LongPressRecognized,
        InternalState::ResolvingLongPressRecognized,
        InternalState::TapRecognized,
        InternalState::SelectionClearedRecognized,
        InternalState::ShowingLiteralSearch,
        InternalState::WaitingForPossibleTapNearPrevious,
        InternalState::WaitingForPossibleTapOnTapSelection,
        InternalState::TapGestureCommit,
        InternalState::GatheringSurroundings,
        InternalState::DecidingSuppression,
        InternalState::StartShowingTapUi,
        InternalState::ShowResolvingUi,
        InternalState::Resolving,
        InternalState::ShowingTapSearch,
        InternalState::ShowingResolvedLongPressSearch,
        InternalState::SearchCompleted,
    ];

    /// States that may be passed to `InternalStateController::enter`.
    pub fn is_start_state(self) -> bool {
        matches!(
            self,
            InternalState::Undefined
                | InternalState::Idle
                | InternalState::LongPressRecognized
                | InternalState::ResolvingLongPressRecognized
                | InternalState::TapRecognized
                | InternalState::SelectionClearedRecognized
        )
    }

    pub fn is_idle(self) -> bool {
        matches!(self, InternalState::Undefined | InternalState::Idle)
    }
}

impl fmt::Display for InternalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// How the current selection was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SelectionType {
    #[default]
    Undetermined,
    Tap,
    LongPress,
    /// A long-press whose selection is eligible for server resolution.
    ResolvingLongPress,
}

/// Low-level selection notifications coming from the page renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionEventType {
    HandlesShown,
    HandlesCleared,
    HandleDragStarted,
    HandleDragStopped,
}

/// Why the UI is being shown or hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StateChangeReason {
    Unknown,
    Reset,
    BasePageTap,
    BasePageScroll,
    TextSelectTap,
    TextSelectLongPress,
    InvalidSelection,
    ClearedSelection,
    TapSuppress,
    Navigation,
    TabSwitch,
    ContextMenu,
    SettingsChanged,
    Destroyed,
}

impl fmt::Display for StateChangeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Position and time of a tap that already went through the suppression decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TapState {
    pub x: f32,
    pub y: f32,
    pub timestamp: Instant,
}

impl TapState {
    pub fn new(x: f32, y: f32, timestamp: Instant) -> Self {
        Self { x, y, timestamp }
    }

    pub fn distance_to(&self, x: f32, y: f32) -> f32 {
        ((self.x - x).powi(2) + (self.y - y).powi(2)).sqrt()
    }
}

/// Result of expanding a caret to the surrounding word in the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectAroundCaretResult {
    /// Characters the selection start moved by (negative expands to the left).
    pub extended_start_adjust: i32,
    /// Characters the selection end moved by (positive expands to the right).
    pub extended_end_adjust: i32,
}

/// Opaque result bundle of a resolve round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResolvedSearchTerm {
    pub is_network_unavailable: bool,
    pub response_code: u16,
    pub search_term: String,
    pub display_text: String,
    pub alternate_term: String,
    pub mid: String,
    pub do_prevent_preload: bool,
    pub selection_start_adjust: i32,
    pub selection_end_adjust: i32,
    pub context_language: String,
    pub thumbnail_url: String,
    pub caption: String,
    pub quick_action_uri: String,
    pub search_url_full: String,
    pub search_url_preload: String,
    /// Related Searches payload, kept verbatim.
    pub related_searches_json: String,
}

impl ResolvedSearchTerm {
    pub fn network_unavailable() -> Self {
        Self {
            is_network_unavailable: true,
            ..Self::default()
        }
    }

    pub fn http_failure(response_code: u16) -> Self {
        Self {
            response_code,
            ..Self::default()
        }
    }

    pub fn is_http_failure(&self) -> bool {
        self.response_code == 0 || self.response_code >= 400
    }

    pub fn has_selection_adjustments(&self) -> bool {
        self.selection_start_adjust != 0 || self.selection_end_adjust != 0
    }
}

/// A search the panel should show or prefetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchRequest {
    pub search_term: String,
    pub alternate_term: Option<String>,
    pub mid: Option<String>,
    pub should_prefetch: bool,
    /// True when the verbatim selection is searched instead of a resolved term.
    pub is_literal: bool,
}

impl SearchRequest {
    pub fn literal(selection: &str, should_prefetch: bool) -> Self {
        Self {
            search_term: selection.to_string(),
            alternate_term: None,
            mid: None,
            should_prefetch,
            is_literal: true,
        }
    }

    pub fn resolved(term: &ResolvedSearchTerm, search_term: &str, should_prefetch: bool) -> Self {
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        Self {
            search_term: search_term.to_string(),
            alternate_term: non_empty(&term.alternate_term),
            mid: non_empty(&term.mid),
            should_prefetch,
            is_literal: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_six_start_states() {
        let starts: Vec<_> = InternalState::ALL
            .iter()
            .filter(|s| s.is_start_state())
            .collect();
        assert_eq!(starts.len(), 6);
        assert!(!InternalState::SearchCompleted.is_start_state());
    }

    #[test]
    fn test_resolved_term_parses_partial_json() {
        let term: ResolvedSearchTerm =
            serde_json::from_str(r#"{"responseCode":200,"searchTerm":"fox","selectionEndAdjust":3}"#)
                .unwrap();
        assert_eq!(term.search_term, "fox");
        assert!(!term.is_http_failure());
        assert!(term.has_selection_adjustments());
        assert!(term.display_text.is_empty());
    }

    #[test]
    fn test_http_failure_codes() {
        assert!(ResolvedSearchTerm::http_failure(404).is_http_failure());
        assert!(ResolvedSearchTerm::network_unavailable().is_http_failure());
    }
}
