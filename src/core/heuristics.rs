//! Tap suppression heuristics
//!
//! Each heuristic evaluates its condition once, when built from the inputs
//! of a tap. The aggregate suppresses the tap if any enabled heuristic holds.
//! New heuristics only need a variant in [`TapHeuristic`]; suppression call
//! sites go through [`TapSuppressionHeuristics`] and never change.

use enum_dispatch::enum_dispatch;
use std::collections::BTreeMap;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::core::context::TappedWord;
use crate::shared::settings::SuppressionSettings;
use crate::shared::types::TapState;

pub mod near_previous;
pub mod recent_scroll;
pub mod word_edge;
pub mod word_length;

pub use near_previous::TapNearPreviousSuppression;
pub use recent_scroll::RecentScrollTapSuppression;
pub use word_edge::TapWordEdgeSuppression;
pub use word_length::TapWordLengthSuppression;

/// Everything a heuristic may look at when judging a tap.
#[derive(Debug, Clone, Copy)]
pub struct TapInputs<'a> {
    pub x: f32,
    pub y: f32,
    pub now: Instant,
    pub previous_tap: Option<&'a TapState>,
    pub last_scroll_end: Option<Instant>,
    pub tapped_word: Option<&'a TappedWord>,
}

#[enum_dispatch]
pub trait SuppressionHeuristic {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    /// Whether the condition held for the tap, regardless of enablement.
    fn is_condition_satisfied(&self) -> bool;

    fn is_condition_satisfied_and_enabled(&self) -> bool {
        self.is_enabled() && self.is_condition_satisfied()
    }

    fn log_condition_state(&self) {
        debug!(
            heuristic = self.name(),
            satisfied = self.is_condition_satisfied(),
            enabled = self.is_enabled(),
            "suppression condition"
        );
    }

    /// Correlates the condition with whether the user ended up seeing results.
    fn log_results_seen(&self, was_search_content_viewed: bool, was_activated_by_tap: bool) {
        if !was_activated_by_tap {
            return;
        }
        info!(
            heuristic = self.name(),
            condition = self.is_condition_satisfied(),
            results_seen = was_search_content_viewed,
            "suppression results seen"
        );
    }
}

#[enum_dispatch(SuppressionHeuristic)]
#[derive(Debug, Clone)]
pub enum TapHeuristic {
    NearPrevious(TapNearPreviousSuppression),
    RecentScroll(RecentScrollTapSuppression),
    WordLength(TapWordLengthSuppression),
    WordEdge(TapWordEdgeSuppression),
}

/// Ordered collection of heuristics evaluated for one tap.
#[derive(Debug, Clone, Default)]
pub struct TapSuppressionHeuristics {
    heuristics: Vec<TapHeuristic>,
}

impl TapSuppressionHeuristics {
    pub fn new(inputs: &TapInputs<'_>, settings: &SuppressionSettings) -> Self {
        Self::from_heuristics(vec![
            TapNearPreviousSuppression::new(inputs, settings).into(),
            RecentScrollTapSuppression::new(inputs, settings).into(),
            TapWordLengthSuppression::new(inputs, settings).into(),
            TapWordEdgeSuppression::new(inputs, settings).into(),
        ])
    }

    pub fn from_heuristics(heuristics: Vec<TapHeuristic>) -> Self {
        Self { heuristics }
    }

    pub fn should_suppress_tap(&self) -> bool {
        self.heuristics
            .iter()
            .any(|h| h.is_condition_satisfied_and_enabled())
    }

    pub fn log_condition_state(&self) {
        for heuristic in &self.heuristics {
            heuristic.log_condition_state();
        }
    }

    pub fn log_results_seen(&self, was_search_content_viewed: bool, was_activated_by_tap: bool) {
        for heuristic in &self.heuristics {
            heuristic.log_results_seen(was_search_content_viewed, was_activated_by_tap);
        }
    }

    /// Condition of every heuristic, enabled or not, keyed by name.
    pub fn ranker_features(&self) -> BTreeMap<&'static str, bool> {
        self.heuristics
            .iter()
            .map(|h| (h.name(), h.is_condition_satisfied()))
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TapHeuristic> {
        self.heuristics.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn all_disabled() -> SuppressionSettings {
        SuppressionSettings {
            near_previous_enabled: false,
            recent_scroll_enabled: false,
            word_length_enabled: false,
            word_edge_enabled: false,
            ..SuppressionSettings::default()
        }
    }

    #[test]
    fn test_first_tap_is_not_suppressed_by_defaults() {
        let inputs = TapInputs {
            x: 10.0,
            y: 10.0,
            now: Instant::now(),
            previous_tap: None,
            last_scroll_end: None,
            tapped_word: None,
        };
        let heuristics = TapSuppressionHeuristics::new(&inputs, &SuppressionSettings::default());
        assert!(!heuristics.should_suppress_tap());
        assert_eq!(heuristics.ranker_features().len(), 4);
    }

    #[test]
    fn test_condition_without_enablement_does_not_suppress() {
        let now = Instant::now();
        let previous = TapState::new(10.0, 10.0, now - Duration::from_millis(50));
        let inputs = TapInputs {
            x: 12.0,
            y: 10.0,
            now,
            previous_tap: Some(&previous),
            last_scroll_end: None,
            tapped_word: None,
        };
        let heuristics = TapSuppressionHeuristics::new(&inputs, &all_disabled());
        assert!(!heuristics.should_suppress_tap());
        assert_eq!(heuristics.ranker_features()["tap_near_previous"], true);

        let heuristics = TapSuppressionHeuristics::new(&inputs, &SuppressionSettings::default());
        assert!(heuristics.should_suppress_tap());
    }

    #[test]
    fn test_any_enabled_heuristic_suppresses() {
        let now = Instant::now();
        let inputs = TapInputs {
            x: 0.0,
            y: 0.0,
            now,
            previous_tap: None,
            last_scroll_end: Some(now - Duration::from_millis(100)),
            tapped_word: None,
        };
        let settings = SuppressionSettings {
            recent_scroll_enabled: true,
            ..all_disabled()
        };
        assert!(TapSuppressionHeuristics::new(&inputs, &settings).should_suppress_tap());
    }
}
