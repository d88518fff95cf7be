use serde::Serialize;
use tracing::debug;

use super::detection::detect_language;
use super::word_scan::{analyze_tap, TappedWord};

/// Resolve-time properties that do not come from the page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveProperties {
    pub home_country: String,
    pub may_send_base_page_url: bool,
    pub target_language: String,
    pub fluent_languages: Vec<String>,
}

/// Accumulates everything known about one in-flight search attempt.
///
/// A fresh context is built each time surroundings are gathered and dropped
/// when the attempt ends. Offsets count Unicode scalar values.
#[derive(Debug, Default)]
pub struct SearchContext {
    encoding: String,
    surrounding_text: Option<String>,
    chars: Vec<char>,
    selection: Option<(usize, usize)>,
    detected_language: Option<String>,
    tapped_word: Option<TappedWord>,
    resolve_properties: Option<ResolveProperties>,
    is_exact_resolve: bool,
    selection_being_resolved: Option<String>,
}

impl SearchContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the page text around the selection. Offsets are clamped to the
    /// text and ordered so that `start <= end`.
    pub fn set_surrounding_text(&mut self, encoding: &str, text: &str, start: usize, end: usize) {
        self.encoding = encoding.to_string();
        self.chars = text.chars().collect();
        self.surrounding_text = Some(text.to_string());
        self.detected_language = None;

        let len = self.chars.len();
        let (start, end) = (start.min(len), end.min(len));
        self.selection = Some((start.min(end), start.max(end)));
        self.analyze_tap_if_caret();
    }

    fn analyze_tap_if_caret(&mut self) {
        self.tapped_word = match self.selection {
            Some((start, end)) if start == end => analyze_tap(&self.chars, start),
            _ => None,
        };
        if let Some(tapped) = &self.tapped_word {
            debug!(word = %tapped.word, offset = tapped.offset_within_word, "tapped word");
        }
    }

    pub fn has_surrounding_text(&self) -> bool {
        self.surrounding_text.is_some()
    }

    pub fn surrounding_text(&self) -> Option<&str> {
        self.surrounding_text.as_deref()
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }

    pub fn selection_start(&self) -> Option<usize> {
        self.selection.map(|(start, _)| start)
    }

    pub fn selection_end(&self) -> Option<usize> {
        self.selection.map(|(_, end)| end)
    }

    /// The selected substring, empty for a caret.
    pub fn selection(&self) -> Option<String> {
        let (start, end) = self.selection?;
        Some(self.chars[start..end].iter().collect())
    }

    pub fn text_content_following_selection(&self) -> Option<String> {
        let (_, end) = self.selection?;
        Some(self.chars[end..].iter().collect())
    }

    /// Moves the selection edges; negative start and positive end expand it.
    pub fn on_selection_adjusted(&mut self, start_adjust: i32, end_adjust: i32) {
        let Some((start, end)) = self.selection else {
            return;
        };
        let len = self.chars.len() as i64;
        let new_start = (start as i64 + start_adjust as i64).clamp(0, len) as usize;
        let new_end = (end as i64 + end_adjust as i64).clamp(0, len) as usize;
        self.selection = Some((new_start.min(new_end), new_start.max(new_end)));
        self.analyze_tap_if_caret();
    }

    /// Cached language of the surrounding text; empty when unknown.
    pub fn detected_language(&mut self) -> &str {
        if self.detected_language.is_none() {
            let detected = self
                .surrounding_text
                .as_deref()
                .and_then(detect_language)
                .unwrap_or_default();
            self.detected_language = Some(detected.to_string());
        }
        self.detected_language.as_deref().unwrap_or_default()
    }

    pub fn tapped_word(&self) -> Option<&TappedWord> {
        self.tapped_word.as_ref()
    }

    pub fn set_resolve_properties(&mut self, properties: ResolveProperties) {
        self.resolve_properties = Some(properties);
    }

    pub fn resolve_properties(&self) -> Option<&ResolveProperties> {
        self.resolve_properties.as_ref()
    }

    pub fn has_resolve_properties(&self) -> bool {
        self.resolve_properties.is_some()
    }

    /// Target language for translation, unless the page is already in a language
    /// the user reads fluently.
    pub fn translation_target(&mut self) -> Option<String> {
        let props = self.resolve_properties.clone()?;
        let detected = self.detected_language().to_string();
        if detected.is_empty()
            || detected == props.target_language
            || props.fluent_languages.iter().any(|l| *l == detected)
        {
            return None;
        }
        Some(props.target_language)
    }

    pub fn can_resolve(&self) -> bool {
        self.has_resolve_properties()
            && self.selection.map_or(false, |(start, end)| start < end)
    }

    pub fn prepare_to_resolve(&mut self, is_exact_resolve: bool) {
        self.is_exact_resolve = is_exact_resolve;
        self.selection_being_resolved = self.selection();
    }

    pub fn is_exact_resolve(&self) -> bool {
        self.is_exact_resolve
    }

    pub fn selection_being_resolved(&self) -> Option<&str> {
        self.selection_being_resolved.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(text: &str, start: usize, end: usize) -> SearchContext {
        let mut ctx = SearchContext::new();
        ctx.set_surrounding_text("UTF-8", text, start, end);
        ctx
    }

    #[test]
    fn test_caret_analyses_tap() {
        let ctx = context("The quick fox", 4, 4);
        assert_eq!(ctx.tapped_word().unwrap().word, "quick");
        assert_eq!(ctx.selection().as_deref(), Some(""));
        assert!(!ctx.can_resolve());
    }

    #[test]
    fn test_offsets_are_clamped_and_ordered() {
        let ctx = context("short", 9, 2);
        assert_eq!(ctx.selection_start(), Some(2));
        assert_eq!(ctx.selection_end(), Some(5));
    }

    #[test]
    fn test_selection_adjusted_to_word() {
        let mut ctx = context("The quick fox", 4, 4);
        ctx.on_selection_adjusted(0, 5);
        assert_eq!(ctx.selection().as_deref(), Some("quick"));
        assert_eq!(ctx.text_content_following_selection().as_deref(), Some(" fox"));
        assert!(ctx.tapped_word().is_none());
    }

    #[test]
    fn test_can_resolve_needs_properties() {
        let mut ctx = context("The quick fox", 4, 9);
        assert!(!ctx.can_resolve());
        ctx.set_resolve_properties(ResolveProperties::default());
        assert!(ctx.can_resolve());
        ctx.prepare_to_resolve(true);
        assert_eq!(ctx.selection_being_resolved(), Some("quick"));
        assert!(ctx.is_exact_resolve());
    }

    #[test]
    fn test_detected_language_cached_and_unknown_is_empty() {
        let mut ctx = context("quick fox", 0, 5);
        assert_eq!(ctx.detected_language(), "");
        let mut ctx = context("こんにちは", 0, 2);
        assert_eq!(ctx.detected_language(), "ja");
        assert_eq!(ctx.detected_language(), "ja");
    }

    #[test]
    fn test_translation_target_skips_fluent_languages() {
        let mut ctx = context("Der Hund und die Katze", 4, 8);
        ctx.set_resolve_properties(ResolveProperties {
            target_language: "en".to_string(),
            fluent_languages: vec!["de".to_string()],
            ..ResolveProperties::default()
        });
        assert_eq!(ctx.translation_target(), None);

        ctx.set_resolve_properties(ResolveProperties {
            target_language: "en".to_string(),
            ..ResolveProperties::default()
        });
        assert_eq!(ctx.translation_target().as_deref(), Some("en"));
    }
}
