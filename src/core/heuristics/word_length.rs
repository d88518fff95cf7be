use unicode_segmentation::UnicodeSegmentation;

use super::{SuppressionHeuristic, TapInputs};
use crate::shared::settings::SuppressionSettings;

/// Suppresses taps on very short words ("a", "of", ...), which rarely carry intent.
#[derive(Debug, Clone)]
pub struct TapWordLengthSuppression {
    enabled: bool,
    satisfied: bool,
}

impl TapWordLengthSuppression {
    pub fn new(inputs: &TapInputs<'_>, settings: &SuppressionSettings) -> Self {
        let satisfied = inputs.tapped_word.map_or(false, |tapped| {
            tapped.word.graphemes(true).count() < settings.min_word_graphemes
        });
        Self {
            enabled: settings.word_length_enabled,
            satisfied,
        }
    }
}

impl SuppressionHeuristic for TapWordLengthSuppression {
    fn name(&self) -> &'static str {
        "tap_word_length"
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

    fn judge(text: &str, offset: usize) -> bool {
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
        let settings = SuppressionSettings {
            word_length_enabled: true,
            ..SuppressionSettings::default()
        };
        TapWordLengthSuppression::new(&inputs, &settings).is_condition_satisfied_and_enabled()
    }

    #[test]
    fn test_short_word() {
        assert!(judge("one of many", 5));
    }

    #[test]
    fn test_long_word() {
        assert!(!judge("one of many", 8));
    }
}
