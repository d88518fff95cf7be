pub mod core;
pub mod manager;
pub mod shared;
pub mod telemetry;

pub use crate::core::selection::{SelectionController, SelectionEvent, SelectionHandler};
pub use crate::core::state::{InternalStateController, InternalStateHandler};
pub use manager::{
    run_event_loop, ContextSelection, ContextualSearchManager, ContextualSearchObserver, HttpSearchTermResolver,
    ManagerEvent, ObserverId, PageBridge, SearchPanel, SearchTermResolver,
};
pub use shared::settings::SearchSettings;
pub use shared::types::{InternalState, ResolvedSearchTerm, SearchRequest, SelectionType, StateChangeReason};
pub use shared::{SearchError, SearchResult};
