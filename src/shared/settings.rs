use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

use crate::shared::error::{SearchError, SearchResult};
use crate::shared::types::InternalState;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub policy: PolicySettings,
    pub timing: TimingSettings,
    pub suppression: SuppressionSettings,
    pub translate: TranslateSettings,
    pub resolve: ResolveSettings,
    /// States whose self-transition re-runs their work when the UI is out of sync.
    pub retry_states: Vec<InternalState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicySettings {
    pub tap_enabled: bool,
    pub resolve_taps: bool,
    /// Classify handle-shown selections as resolving long-presses.
    pub long_press_resolves: bool,
    pub prefetch_results: bool,
    pub show_error_code_in_bar: bool,
    pub force_caption: bool,
    pub send_base_page_url: bool,
    /// Share surrounding text and offsets with registered observers.
    pub send_surroundings: bool,
    pub home_country: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingSettings {
    pub tap_near_previous_delay_ms: u64,
    pub tap_on_tap_selection_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuppressionSettings {
    pub near_previous_enabled: bool,
    pub near_previous_ms: u64,
    pub near_previous_px: f32,
    pub recent_scroll_enabled: bool,
    pub recent_scroll_ms: u64,
    pub word_length_enabled: bool,
    pub min_word_graphemes: usize,
    pub word_edge_enabled: bool,
    pub edge_min_word_graphemes: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslateSettings {
    pub target_language: String,
    pub fluent_languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolveSettings {
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            policy: PolicySettings::default(),
            timing: TimingSettings::default(),
            suppression: SuppressionSettings::default(),
            translate: TranslateSettings::default(),
            resolve: ResolveSettings::default(),
            retry_states: vec![InternalState::Idle],
        }
    }
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            tap_enabled: true,
            resolve_taps: true,
            long_press_resolves: true,
            prefetch_results: true,
            show_error_code_in_bar: false,
            force_caption: false,
            send_base_page_url: false,
            send_surroundings: true,
            home_country: String::new(),
        }
    }
}

impl Default for TimingSettings {
    fn default() -> Self {
        Self {
            tap_near_previous_delay_ms: 100,
            tap_on_tap_selection_delay_ms: 100,
        }
    }
}

impl Default for SuppressionSettings {
    fn default() -> Self {
        Self {
            near_previous_enabled: true,
            near_previous_ms: 300,
            near_previous_px: 24.0,
            recent_scroll_enabled: true,
            recent_scroll_ms: 300,
            word_length_enabled: false,
            min_word_graphemes: 3,
            word_edge_enabled: false,
            edge_min_word_graphemes: 6,
        }
    }
}

impl Default for TranslateSettings {
    fn default() -> Self {
        Self {
            target_language: "en".to_string(),
            fluent_languages: Vec::new(),
        }
    }
}

impl Default for ResolveSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 3000,
        }
    }
}

impl SearchSettings {
    pub fn settings_path() -> SearchResult<PathBuf> {
        ProjectDirs::from("com", "antigravity", "contextual-search")
            .map(|dirs| dirs.config_dir().join("settings.json"))
            .ok_or_else(|| SearchError::Config("Failed to determine config directory".to_string()))
    }

    /// Load settings from the platform config directory, writing defaults when absent.
    pub async fn load() -> SearchResult<Self> {
        Self::load_from(&Self::settings_path()?).await
    }

    pub async fn load_from(path: &Path) -> SearchResult<Self> {
        if !path.exists() {
            let settings = Self::default();
            settings.save_to(path).await?;
            info!(path = %path.display(), "wrote default settings");
            return Ok(settings);
        }

        let content = fs::read_to_string(path).await?;
        let settings: Self = serde_json::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    pub async fn save_to(&self, path: &Path) -> SearchResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content).await?;
        Ok(())
    }

    /// Reject language codes that are not ISO 639-1 and retry states that can never be current.
    pub fn validate(&self) -> SearchResult<()> {
        let target = &self.translate.target_language;
        if !target.is_empty() && isolang::Language::from_639_1(target).is_none() {
            return Err(SearchError::InvalidLanguage(target.clone()));
        }
        for lang in &self.translate.fluent_languages {
            if isolang::Language::from_639_1(lang).is_none() {
                return Err(SearchError::InvalidLanguage(lang.clone()));
            }
        }
        if let Some(state) = self.retry_states.iter().find(|s| **s == InternalState::Undefined) {
            warn!(%state, "retry policy on Undefined has no effect");
        }
        if let Some(endpoint) = &self.resolve.endpoint {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(SearchError::Config(format!("Resolve endpoint must be http(s): {}", endpoint)));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let settings = SearchSettings::default();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.retry_states, vec![InternalState::Idle]);
        assert_eq!(settings.timing.tap_near_previous_delay_ms, 100);
    }

    #[test]
    fn test_rejects_unknown_language() {
        let mut settings = SearchSettings::default();
        settings.translate.fluent_languages = vec!["de".to_string(), "zz".to_string()];
        assert_eq!(
            settings.validate(),
            Err(SearchError::InvalidLanguage("zz".to_string()))
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let settings: SearchSettings =
            serde_json::from_str(r#"{"policy":{"resolve_taps":false}}"#).unwrap();
        assert!(!settings.policy.resolve_taps);
        assert!(settings.policy.tap_enabled);
        assert_eq!(settings.suppression.recent_scroll_ms, 300);
    }

    #[tokio::test]
    async fn test_load_writes_defaults_then_round_trips() {
        let dir = std::env::temp_dir().join(format!("contextual-search-test-{}", std::process::id()));
        let path = dir.join("settings.json");
        let _ = tokio::fs::remove_file(&path).await;

        let first = SearchSettings::load_from(&path).await.unwrap();
        assert_eq!(first, SearchSettings::default());
        assert!(path.exists());

        let mut changed = first.clone();
        changed.policy.home_country = "us".to_string();
        changed.save_to(&path).await.unwrap();
        let loaded = SearchSettings::load_from(&path).await.unwrap();
        assert_eq!(loaded.policy.home_country, "us");

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
