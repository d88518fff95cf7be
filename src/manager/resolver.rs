//! Search term resolution
//!
//! A resolve maps the selection and its surroundings to a refined search term.
//! The request/response schema is owned by the server; the response is kept
//! as an opaque [`ResolvedSearchTerm`] bundle.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::context::SearchContext;
use crate::shared::error::{SearchError, SearchResult};
use crate::shared::settings::ResolveSettings;
use crate::shared::types::ResolvedSearchTerm;

/// Everything the server gets to see about one resolve.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResolveRequest {
    pub selection: String,
    pub surrounding_text: String,
    pub encoding: String,
    pub selection_start: usize,
    pub selection_end: usize,
    /// The user adjusted the selection, so it must not be expanded.
    pub is_exact_resolve: bool,
    pub detected_language: String,
    pub translation_target: Option<String>,
    pub home_country: String,
    pub may_send_base_page_url: bool,
    pub fluent_languages: Vec<String>,
}

impl ResolveRequest {
    /// Snapshot of a context that is ready to resolve.
    pub fn from_context(context: &mut SearchContext) -> Option<Self> {
        if !context.can_resolve() {
            return None;
        }
        let properties = context.resolve_properties().cloned().unwrap_or_default();
        Some(Self {
            selection: context.selection_being_resolved().unwrap_or_default().to_string(),
            surrounding_text: context.surrounding_text().unwrap_or_default().to_string(),
            encoding: context.encoding().to_string(),
            selection_start: context.selection_start().unwrap_or_default(),
            selection_end: context.selection_end().unwrap_or_default(),
            is_exact_resolve: context.is_exact_resolve(),
            detected_language: context.detected_language().to_string(),
            translation_target: context.translation_target(),
            home_country: properties.home_country,
            may_send_base_page_url: properties.may_send_base_page_url,
            fluent_languages: properties.fluent_languages,
        })
    }
}

#[async_trait]
pub trait SearchTermResolver: Send + Sync {
    async fn resolve(&self, request: ResolveRequest) -> SearchResult<ResolvedSearchTerm>;
}

/// Turns a failed resolve into the bundle the pipeline displays.
pub fn failure_response(err: &SearchError) -> ResolvedSearchTerm {
    match err {
        SearchError::NetworkUnavailable => ResolvedSearchTerm::network_unavailable(),
        SearchError::Http(code) => ResolvedSearchTerm::http_failure(*code),
        other => {
            warn!(error = %other, "resolve failed");
            ResolvedSearchTerm::http_failure(0)
        }
    }
}

/// Resolves over HTTP with a GET against a configured endpoint.
pub struct HttpSearchTermResolver {
    client: Client,
    endpoint: String,
}

impl HttpSearchTermResolver {
    pub fn from_settings(settings: &ResolveSettings) -> SearchResult<Self> {
        let endpoint = settings
            .endpoint
            .clone()
            .ok_or_else(|| SearchError::Config("No resolve endpoint configured".to_string()))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(settings.timeout_ms))
            .build()
            .map_err(|e| SearchError::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, endpoint })
    }

    fn request_url(&self, request: &ResolveRequest) -> String {
        let mut url = format!(
            "{}?q={}&ctx={}&start={}&end={}&exact={}",
            self.endpoint,
            urlencoding::encode(&request.selection),
            urlencoding::encode(&request.surrounding_text),
            request.selection_start,
            request.selection_end,
            request.is_exact_resolve as u8,
        );
        if !request.detected_language.is_empty() {
            url.push_str(&format!("&lang={}", urlencoding::encode(&request.detected_language)));
        }
        if let Some(target) = &request.translation_target {
            url.push_str(&format!("&tl={}", urlencoding::encode(target)));
        }
        if !request.home_country.is_empty() {
            url.push_str(&format!("&gl={}", urlencoding::encode(&request.home_country)));
        }
        url
    }
}

#[async_trait]
impl SearchTermResolver for HttpSearchTermResolver {
    async fn resolve(&self, request: ResolveRequest) -> SearchResult<ResolvedSearchTerm> {
        let url = self.request_url(&request);
        debug!(selection = %request.selection, "resolving search term");

        let response = self.client.get(&url).send().await?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(SearchError::Http(status));
        }

        let body = response.text().await?;
        let mut term: ResolvedSearchTerm = serde_json::from_str(&body)?;
        if term.response_code == 0 {
            term.response_code = status;
        }
        Ok(term)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::context::ResolveProperties;

    fn resolver() -> HttpSearchTermResolver {
        HttpSearchTermResolver::from_settings(&ResolveSettings {
            endpoint: Some("https://resolve.example.com/s".to_string()),
            timeout_ms: 1000,
        })
        .unwrap()
    }

    #[test]
    fn test_missing_endpoint_is_config_error() {
        let err = HttpSearchTermResolver::from_settings(&ResolveSettings::default()).err();
        assert!(matches!(err, Some(SearchError::Config(_))));
    }

    #[test]
    fn test_request_from_context() {
        let mut context = SearchContext::new();
        context.set_surrounding_text("UTF-8", "The quick fox", 4, 9);
        assert!(ResolveRequest::from_context(&mut context).is_none());

        context.set_resolve_properties(ResolveProperties {
            home_country: "US".to_string(),
            target_language: "en".to_string(),
            ..ResolveProperties::default()
        });
        context.prepare_to_resolve(true);
        let request = ResolveRequest::from_context(&mut context).unwrap();
        assert_eq!(request.selection, "quick");
        assert_eq!((request.selection_start, request.selection_end), (4, 9));
        assert!(request.is_exact_resolve);
        assert_eq!(request.home_country, "US");
    }

    #[test]
    fn test_request_url_is_encoded() {
        let request = ResolveRequest {
            selection: "quick fox".to_string(),
            surrounding_text: "The quick fox & co".to_string(),
            selection_start: 4,
            selection_end: 13,
            home_country: "US".to_string(),
            ..ResolveRequest::default()
        };
        let url = resolver().request_url(&request);
        assert!(url.starts_with("https://resolve.example.com/s?q=quick%20fox"));
        assert!(url.contains("ctx=The%20quick%20fox%20%26%20co"));
        assert!(url.contains("&exact=0"));
        assert!(url.ends_with("&gl=US"));
        assert!(!url.contains("&lang="));
    }

    #[test]
    fn test_failure_response() {
        assert!(failure_response(&SearchError::NetworkUnavailable).is_network_unavailable);
        assert_eq!(failure_response(&SearchError::Http(503)).response_code, 503);
        assert!(failure_response(&SearchError::Parse("bad".to_string())).is_http_failure());
    }
}
