use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedSender};
use tracing::{error, info, warn};

use contextual_search::manager::{ContextSelection, ContextualSearchObserver, ResolveRequest};
use contextual_search::shared::types::SelectAroundCaretResult;
use contextual_search::{
    run_event_loop, telemetry, ContextualSearchManager, HttpSearchTermResolver, ManagerEvent, PageBridge,
    ResolvedSearchTerm, SearchPanel, SearchRequest, SearchResult, SearchSettings, SearchTermResolver,
    StateChangeReason,
};

const DEMO_TEXT: &str = "The quick brown fox jumps over the lazy dog";
const DEMO_CARET: usize = 10;

enum PageRequest {
    GatherSurroundingText,
    SelectAroundCaret,
}

/// A page with a single paragraph and the caret parked inside "brown".
struct DemoPage {
    requests: UnboundedSender<PageRequest>,
}

impl PageBridge for DemoPage {
    fn is_available(&self) -> bool {
        !self.requests.is_closed()
    }

    fn gather_surrounding_text(&mut self) {
        let _ = self.requests.send(PageRequest::GatherSurroundingText);
    }

    fn select_around_caret(&mut self) {
        let _ = self.requests.send(PageRequest::SelectAroundCaret);
    }

    fn clear_selection(&mut self) {
        info!("page: clear selection");
    }

    fn adjust_selection(&mut self, start_adjust: i32, end_adjust: i32) {
        info!(start_adjust, end_adjust, "page: adjust selection");
    }
}

#[derive(Default)]
struct ConsolePanel {
    showing: bool,
}

impl SearchPanel for ConsolePanel {
    fn is_showing(&self) -> bool {
        self.showing
    }

    fn is_peeking(&self) -> bool {
        self.showing
    }

    fn request_panel_show(&mut self, reason: StateChangeReason) {
        self.showing = true;
        info!(%reason, "panel: show");
    }

    fn close_panel(&mut self, reason: StateChangeReason) {
        self.showing = false;
        info!(%reason, "panel: close");
    }

    fn set_search_term(&mut self, term: &str) {
        info!(term, "panel: search term");
    }

    fn set_context_details(&mut self, selection: &str, following_text: &str) {
        info!(selection, following_text, "panel: context");
    }

    fn on_search_term_resolved(&mut self, message: &str, pronunciation: Option<&str>, term: &ResolvedSearchTerm) {
        info!(message, ?pronunciation, code = term.response_code, "panel: resolved");
    }

    fn load_search(&mut self, request: &SearchRequest) {
        info!(term = %request.search_term, literal = request.is_literal, "panel: load search");
    }

    fn set_caption(&mut self, caption: &str) {
        info!(caption, "panel: caption");
    }

    fn hide_caption(&mut self) {}

    fn ensure_caption(&mut self) {}

    fn was_search_content_viewed(&self) -> bool {
        false
    }
}

struct LoggingObserver;

impl ContextualSearchObserver for LoggingObserver {
    fn on_show_contextual_search(&mut self, selection: Option<&ContextSelection>) {
        match selection {
            Some(selection) => info!(start = selection.start, end = selection.end, "observer: show"),
            None => info!("observer: show without surroundings"),
        }
    }

    fn on_hide_contextual_search(&mut self) {
        info!("observer: hide");
    }
}

/// Offline stand-in used when no resolve endpoint is configured.
struct EchoResolver;

#[async_trait]
impl SearchTermResolver for EchoResolver {
    async fn resolve(&self, request: ResolveRequest) -> SearchResult<ResolvedSearchTerm> {
        Ok(ResolvedSearchTerm {
            response_code: 200,
            search_term: request.selection.clone(),
            display_text: request.selection.to_uppercase(),
            ..ResolvedSearchTerm::default()
        })
    }
}

fn build_resolver(settings: &SearchSettings) -> Arc<dyn SearchTermResolver> {
    if settings.resolve.endpoint.is_none() {
        return Arc::new(EchoResolver);
    }
    match HttpSearchTermResolver::from_settings(&settings.resolve) {
        Ok(resolver) => Arc::new(resolver),
        Err(e) => {
            warn!(error = %e, "falling back to offline resolver");
            Arc::new(EchoResolver)
        }
    }
}

#[tokio::main]
async fn main() {
    telemetry::init_tracing();

    let settings = SearchSettings::load().await.unwrap_or_else(|e| {
        warn!(error = %e, "failed to load settings, using defaults");
        SearchSettings::default()
    });
    let resolver = build_resolver(&settings);

    let (page_tx, mut page_rx) = mpsc::unbounded_channel();
    let page = Box::new(DemoPage { requests: page_tx });
    let panel = Box::new(ConsolePanel::default());

    let (mut manager, mut events) = match ContextualSearchManager::new(settings, page, panel, resolver) {
        Ok(parts) => parts,
        Err(e) => {
            error!(error = %e, "failed to start contextual search");
            return;
        }
    };

    let sender = manager.sender();
    let page_sender = sender.clone();
    tokio::spawn(async move {
        while let Some(request) = page_rx.recv().await {
            let event = match request {
                PageRequest::GatherSurroundingText => ManagerEvent::SurroundingTextAvailable {
                    encoding: "UTF-8".to_string(),
                    text: DEMO_TEXT.to_string(),
                    start: DEMO_CARET,
                    end: DEMO_CARET,
                },
                PageRequest::SelectAroundCaret => ManagerEvent::SelectAroundCaretAck(Some(SelectAroundCaretResult {
                    extended_start_adjust: 0,
                    extended_end_adjust: 5,
                })),
            };
            if page_sender.send(event).is_err() {
                break;
            }
        }
    });

    tokio::spawn(async move {
        let _ = sender.send(ManagerEvent::UnhandledTap { x: 120.0, y: 48.0 });
        tokio::time::sleep(Duration::from_millis(200)).await;
        let _ = sender.send(ManagerEvent::ContentVisible);
        tokio::time::sleep(Duration::from_millis(300)).await;
        let _ = sender.send(ManagerEvent::Shutdown);
    });

    manager.add_observer(Box::new(LoggingObserver));

    run_event_loop(&mut manager, &mut events).await;
    info!(state = %manager.state(), "demo finished");
}
