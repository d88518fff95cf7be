use unicode_segmentation::UnicodeSegmentation;

use super::{SuppressionHeuristic, TapInputs};
use crate::shared::settings::SuppressionSettings;

/// Suppresses taps on the first or last grapheme of a long word, where a tap
/// is more likely aimed at the gap between words.
#[derive(Debug, Clone)]
pub struct TapWordEdgeSuppression {
    enabled: bool,
    satisfied: bool,
}

impl TapWordEdgeSuppression {
    pub fn new(inputs: &TapInputs<'_>, settings: &SuppressionSettings) -> Self {
        let satisfied = inputs.tapped_word.map_or(false, |tapped| {
            let graphemes = tapped.word.graphemes(true).count();
            // Offsets count chars; the word was cut on char boundaries.
            let chars = tapped.word.chars().count();
            graphemes >= settings.edge_min_word_graphemes
                && (tapped.offset_within_word == 0 || tapped.offset_within_word + 1 >= chars)
        });
        Self {
            enabled: settings.word_edge_enabled,
            satisfied,
        }
    }
}

impl SuppressionHeuristic for TapWordEdgeSuppression {
    fn name(&self) -> &'static str {
        "tap_word_edge"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_condition_satisfied(&self) -> bool {
        self.satisfied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::analyze_tap;
    use tokio::time::Instant;

    fn satisfied(text: &str, offset: usize) -> bool {
        let chars: Vec<char> = text.chars().collect();
        let tapped = analyze_tap(&chars, offset);
        let inputs = TapInputs {
            x: 0.0,
            y: 0.0,
            now: Instant::now(),
            previous_tap: None,
            last_scroll_end: None,
            tapped_word: tapped.as_ref(),
        };
        TapWordEdgeSuppression::new(&inputs, &SuppressionSettings::default()).is_condition_satisfied()
    }

    #[test]
    fn test_edges_of_long_word() {
        assert!(satisfied(" elephant ", 1));
        assert!(satisfied(" elephant ", 8));
        assert!(!satisfied(" elephant ", 4));
    }

    #[test]
    fn test_short_word_edges_ignored() {
        assert!(!satisfied(" cat ", 1));
    }

    #[test]
    fn test_disabled_by_default() {
        let inputs = TapInputs {
            x: 0.0,
            y: 0.0,
            now: Instant::now(),
            previous_tap: None,
            last_scroll_end: None,
            tapped_word: None,
        };
        let h = TapWordEdgeSuppression::new(&inputs, &SuppressionSettings::default());
        assert!(!h.is_enabled());
    }
}
