use std::time::Duration;

use super::{SuppressionHeuristic, TapInputs};
use crate::shared::settings::SuppressionSettings;

/// Suppresses taps that follow a scroll too closely; these are usually the
/// user stopping a fling, not asking for a search.
#[derive(Debug, Clone)]
pub struct RecentScrollTapSuppression {
    enabled: bool,
    satisfied: bool,
}

impl RecentScrollTapSuppression {
    pub fn new(inputs: &TapInputs<'_>, settings: &SuppressionSettings) -> Self {
        let satisfied = inputs.last_scroll_end.map_or(false, |scrolled| {
            inputs.now.saturating_duration_since(scrolled)
                <= Duration::from_millis(settings.recent_scroll_ms)
        });
        Self {
            enabled: settings.recent_scroll_enabled,
            satisfied,
        }
    }
}

impl SuppressionHeuristic for RecentScrollTapSuppression {
    fn name(&self) -> &'static str {
        "recent_scroll"
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn is_condition_satisfied(&self) -> bool {
        self.satisfied
    }
}
