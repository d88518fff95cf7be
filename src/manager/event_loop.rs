//! Manager events
//!
//! Page notifications, panel notifications and completions of the manager's
//! own timers and resolves all arrive as [`ManagerEvent`]s and are applied one
//! at a time, in arrival order.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info};

use super::ContextualSearchManager;
use crate::shared::settings::SearchSettings;
use crate::shared::types::{
    InternalState, ResolvedSearchTerm, SelectAroundCaretResult, SelectionEventType, StateChangeReason,
};

#[derive(Debug, Clone)]
pub enum ManagerEvent {
    // Page
    SelectionChanged(String),
    SelectionEvent {
        event_type: SelectionEventType,
        x: f32,
        y: f32,
    },
    UnhandledTap {
        x: f32,
        y: f32,
    },
    ScrollStarted,
    ScrollEnded,
    FocusedNodeChanged {
        editable: bool,
    },
    SurroundingTextAvailable {
        encoding: String,
        text: String,
        start: usize,
        end: usize,
    },
    /// `None` when the page could not select around the caret.
    SelectAroundCaretAck(Option<SelectAroundCaretResult>),

    // Host
    BasePageLoadStarted,
    TabSwitched,
    ContextMenuShown,
    AccessibilityModeChanged(bool),
    BottomSheetVisible(bool),
    SettingsChanged(Box<SearchSettings>),
    /// The panel content became visible to the user.
    ContentVisible,
    Hide(StateChangeReason),
    Shutdown,

    // Internal completions
    WaitElapsed {
        state: InternalState,
        generation: u64,
    },
    ResolveResponse {
        term: ResolvedSearchTerm,
        generation: u64,
    },
}

/// Applies events to the manager until `Shutdown` arrives or every sender is gone.
pub async fn run_event_loop(manager: &mut ContextualSearchManager, events: &mut UnboundedReceiver<ManagerEvent>) {
    info!("contextual search event loop started");
    while let Some(event) = events.recv().await {
        let shutdown = matches!(event, ManagerEvent::Shutdown);
        debug!(?event, "manager event");
        manager.process(event);
        if shutdown {
            break;
        }
    }
    info!("contextual search event loop stopped");
}
