//! Feature policy
//!
//! An explicit snapshot of the settings that gate the pipeline. It is built
//! once and swapped as a whole when settings change, so no decision reads
//! process-wide state.

use std::time::Duration;

use crate::core::context::ResolveProperties;
use crate::shared::settings::{SearchSettings, SuppressionSettings};
use crate::shared::types::{InternalState, SelectionType};

#[derive(Debug, Clone, Default)]
pub struct ContextualSearchPolicy {
    settings: SearchSettings,
}

impl ContextualSearchPolicy {
    pub fn new(settings: SearchSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    pub fn is_tap_supported(&self) -> bool {
        self.settings.policy.tap_enabled
    }

    /// Whether a gesture of this type goes through a server resolve.
    pub fn should_resolve(&self, gesture: SelectionType) -> bool {
        match gesture {
            SelectionType::Tap => self.settings.policy.resolve_taps,
            SelectionType::ResolvingLongPress => true,
            SelectionType::LongPress | SelectionType::Undetermined => false,
        }
    }

    pub fn long_press_resolves(&self) -> bool {
        self.settings.policy.long_press_resolves
    }

    pub fn should_prefetch_search_result(&self) -> bool {
        self.settings.policy.prefetch_results
    }

    /// Whether observers may see the surrounding text of a search.
    pub fn can_send_surroundings(&self) -> bool {
        self.settings.policy.send_surroundings
    }

    /// A verbatim request may be made up on the spot only for gestures that
    /// never wait for a resolve.
    pub fn should_create_verbatim_request(&self, gesture: SelectionType) -> bool {
        gesture == SelectionType::LongPress || !self.should_resolve(gesture)
    }

    pub fn should_show_error_code_in_bar(&self) -> bool {
        self.settings.policy.show_error_code_in_bar
    }

    pub fn should_force_caption(&self) -> bool {
        self.settings.policy.force_caption
    }

    pub fn resolve_properties(&self) -> ResolveProperties {
        ResolveProperties {
            home_country: self.settings.policy.home_country.clone(),
            may_send_base_page_url: self.settings.policy.send_base_page_url,
            target_language: self.settings.translate.target_language.clone(),
            fluent_languages: self.settings.translate.fluent_languages.clone(),
        }
    }

    pub fn tap_near_previous_delay(&self) -> Duration {
        Duration::from_millis(self.settings.timing.tap_near_previous_delay_ms)
    }

    pub fn tap_on_tap_selection_delay(&self) -> Duration {
        Duration::from_millis(self.settings.timing.tap_on_tap_selection_delay_ms)
    }

    pub fn suppression(&self) -> &SuppressionSettings {
        &self.settings.suppression
    }

    pub fn retry_states(&self) -> Vec<InternalState> {
        self.settings.retry_states.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_should_resolve_by_gesture() {
        let mut settings = SearchSettings::default();
        settings.policy.resolve_taps = false;
        let policy = ContextualSearchPolicy::new(settings);

        assert!(!policy.should_resolve(SelectionType::Tap));
        assert!(policy.should_resolve(SelectionType::ResolvingLongPress));
        assert!(!policy.should_resolve(SelectionType::LongPress));
        assert!(!policy.should_resolve(SelectionType::Undetermined));
    }

    #[test]
    fn test_verbatim_request_only_for_non_resolving_gestures() {
        let policy = ContextualSearchPolicy::default();
        assert!(policy.should_create_verbatim_request(SelectionType::LongPress));
        assert!(!policy.should_create_verbatim_request(SelectionType::ResolvingLongPress));
        assert!(!policy.should_create_verbatim_request(SelectionType::Tap));
        assert!(policy.can_send_surroundings());

        let mut settings = SearchSettings::default();
        settings.policy.resolve_taps = false;
        settings.policy.send_surroundings = false;
        let policy = ContextualSearchPolicy::new(settings);
        assert!(policy.should_create_verbatim_request(SelectionType::Tap));
        assert!(!policy.can_send_surroundings());
    }

    #[test]
    fn test_resolve_properties_from_settings() {
        let mut settings = SearchSettings::default();
        settings.policy.home_country = "US".to_string();
        settings.translate.fluent_languages = vec!["de".to_string()];
        let props = ContextualSearchPolicy::new(settings).resolve_properties();

        assert_eq!(props.home_country, "US");
        assert_eq!(props.target_language, "en");
        assert_eq!(props.fluent_languages, vec!["de".to_string()]);
        assert!(!props.may_send_base_page_url);
    }

    #[test]
    fn test_default_delays() {
        let policy = ContextualSearchPolicy::default();
        assert_eq!(policy.tap_near_previous_delay(), Duration::from_millis(100));
        assert_eq!(policy.tap_on_tap_selection_delay(), Duration::from_millis(100));
        assert_eq!(policy.retry_states(), vec![InternalState::Idle]);
    }
}
