//! Collaborators of the manager
//!
//! The page (renderer/native layer) and the panel (UI) are external. Their
//! asynchronous answers come back as [`ManagerEvent`](super::ManagerEvent)s.

use serde::Serialize;

use crate::shared::types::{ResolvedSearchTerm, SearchRequest, StateChangeReason};

/// Text and selection access in the host page.
pub trait PageBridge: Send {
    /// Whether a page is attached that can answer requests.
    fn is_available(&self) -> bool;

    /// Request the text around the current selection. Answered with
    /// `ManagerEvent::SurroundingTextAvailable`.
    fn gather_surrounding_text(&mut self);

    /// Expand the caret to the word under it. Answered with
    /// `ManagerEvent::SelectAroundCaretAck`.
    fn select_around_caret(&mut self);

    fn clear_selection(&mut self);

    /// Move the selection edges by the given number of characters.
    fn adjust_selection(&mut self, start_adjust: i32, end_adjust: i32);
}

/// The sliding search panel.
pub trait SearchPanel: Send {
    fn is_showing(&self) -> bool;

    /// Showing in its collapsed form.
    fn is_peeking(&self) -> bool;

    fn request_panel_show(&mut self, reason: StateChangeReason);

    fn close_panel(&mut self, reason: StateChangeReason);

    /// Show `term` in the bar before anything is resolved.
    fn set_search_term(&mut self, term: &str);

    fn set_context_details(&mut self, selection: &str, following_text: &str);

    fn on_search_term_resolved(&mut self, message: &str, pronunciation: Option<&str>, term: &ResolvedSearchTerm);

    /// Start loading results, possibly as a prefetch.
    fn load_search(&mut self, request: &SearchRequest);

    fn set_caption(&mut self, caption: &str);

    fn hide_caption(&mut self);

    fn ensure_caption(&mut self);

    fn was_search_content_viewed(&self) -> bool;
}

/// The selection of a search together with the page text around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContextSelection {
    pub encoding: String,
    pub surrounding_text: String,
    pub start: usize,
    pub end: usize,
}

/// Gets told when a search starts showing for a selection and when it ends.
pub trait ContextualSearchObserver: Send {
    /// `None` when surroundings may not be shared.
    fn on_show_contextual_search(&mut self, selection: Option<&ContextSelection>);

    fn on_hide_contextual_search(&mut self);
}

/// Handle returned by `ContextualSearchManager::add_observer`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(pub(crate) u64);
