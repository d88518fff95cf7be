use std::time::Duration;

use super::{SuppressionHeuristic, TapInputs};
use crate::shared::settings::SuppressionSettings;

/// Suppresses a tap that lands close, in both time and space, to the previous one.
#[derive(Debug, Clone)]
pub struct TapNearPreviousSuppression {
    enabled: bool,
    satisfied: bool,
}

impl TapNearPreviousSuppression {
    pub fn new(inputs: &TapInputs<'_>, settings: &SuppressionSettings) -> Self {
        let satisfied = inputs.previous_tap.map_or(false, |previous| {
            let elapsed = inputs.now.saturating_duration_since(previous.timestamp);
            elapsed <= Duration::from_millis(settings.near_previous_ms)
                && previous.distance_to(inputs.x, inputs.y) <= settings.near_previous_px
        });
        Self {
            enabled: settings.near_previous_enabled,
            satisfied,
        }
    }
}

impl SuppressionHeuristic for TapNearPreviousSuppression {
    fn name(&self) -> &'static str {
        "tap_near_previous"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_condition_satisfied(&self) -> bool {
        self.satisfied
    }
}
