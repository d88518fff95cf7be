//! Selection tracking
//!
//! The [`SelectionController`] turns raw page notifications into typed
//! [`SelectionEvent`]s. Each event maps to exactly one [`SelectionHandler`]
//! call via [`SelectionEvent::dispatch_to`].

pub mod controller;
pub mod validation;

pub use controller::{SelectionController, TapSuppressionVerdict};
pub use validation::{is_valid_selection, validate_selection, SelectionRejection, MAX_SELECTION_LENGTH};

use tokio::time::Instant;

use crate::core::heuristics::TapSuppressionHeuristics;
use crate::shared::types::SelectionType;

/// Consumer of high-level selection events.
pub trait SelectionHandler {
    fn handle_scroll_start(&mut self);

    fn handle_scroll_end(&mut self);

    fn handle_valid_tap(&mut self);

    fn handle_invalid_tap(&mut self);

    fn handle_suppressed_tap(&mut self);

    fn handle_non_suppressed_tap(&mut self, tap_time: Instant);

    fn handle_valid_resolving_longpress(&mut self);

    fn handle_selection(&mut self, text: &str, valid: bool, selection_type: SelectionType, x: f32, y: f32);

    fn handle_selection_modification(&mut self, text: &str, valid: bool, x: f32, y: f32);

    fn handle_selection_dismissal(&mut self);

    fn handle_selection_cleared(&mut self);

    fn handle_metrics_for_would_suppress_tap(&mut self, heuristics: &TapSuppressionHeuristics);
}

#[derive(Debug, Clone)]
pub enum SelectionEvent {
    ScrollStart,
    ScrollEnd,
    ValidTap,
    InvalidTap,
    SuppressedTap,
    NonSuppressedTap {
        tap_time: Instant,
    },
    ValidResolvingLongpress,
    Established {
        text: String,
        valid: bool,
        selection_type: SelectionType,
        x: f32,
        y: f32,
    },
    Modified {
        text: String,
        valid: bool,
        x: f32,
        y: f32,
    },
    Dismissed,
    Cleared,
    WouldSuppressTapMetrics(TapSuppressionHeuristics),
}

impl SelectionEvent {
    pub fn dispatch_to<H: SelectionHandler + ?Sized>(&self, handler: &mut H) {
        match self {
            SelectionEvent::ScrollStart => handler.handle_scroll_start(),
            SelectionEvent::ScrollEnd => handler.handle_scroll_end(),
            SelectionEvent::ValidTap => handler.handle_valid_tap(),
            SelectionEvent::InvalidTap => handler.handle_invalid_tap(),
            SelectionEvent::SuppressedTap => handler.handle_suppressed_tap(),
            SelectionEvent::NonSuppressedTap { tap_time } => handler.handle_non_suppressed_tap(*tap_time),
            SelectionEvent::ValidResolvingLongpress => handler.handle_valid_resolving_longpress(),
            SelectionEvent::Established {
                text,
                valid,
                selection_type,
                x,
                y,
            } => handler.handle_selection(text, *valid, *selection_type, *x, *y),
            SelectionEvent::Modified { text, valid, x, y } => {
                handler.handle_selection_modification(text, *valid, *x, *y)
            }
            SelectionEvent::Dismissed => handler.handle_selection_dismissal(),
            SelectionEvent::Cleared => handler.handle_selection_cleared(),
            SelectionEvent::WouldSuppressTapMetrics(heuristics) => {
                handler.handle_metrics_for_would_suppress_tap(heuristics)
            }
        }
    }
}
