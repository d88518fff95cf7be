//! Selection validation
//!
//! A selection can only be searched when it is short enough, contains at
//! least one letter or digit, and does not sit in an editable node.

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// Longest selection, in characters, that may start a search.
pub const MAX_SELECTION_LENGTH: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SelectionRejection {
    Empty,
    TooLong,
    NoWordCharacters,
    EditableNode,
}

fn contains_word_regex() -> &'static Regex {
    static CONTAINS_WORD: OnceLock<Regex> = OnceLock::new();
    CONTAINS_WORD.get_or_init(|| Regex::new(r"[\p{L}\p{N}]").expect("valid word regex"))
}

/// Validate a candidate selection, reporting the first rule it breaks.
pub fn validate_selection(selection: &str, is_focused_node_editable: bool) -> Result<(), SelectionRejection> {
    if selection.is_empty() {
        return Err(SelectionRejection::Empty);
    }
    if selection.chars().count() > MAX_SELECTION_LENGTH {
        return Err(SelectionRejection::TooLong);
    }
    if !contains_word_regex().is_match(selection) {
        return Err(SelectionRejection::NoWordCharacters);
    }
    if is_focused_node_editable {
        return Err(SelectionRejection::EditableNode);
    }
    Ok(())
}

pub fn is_valid_selection(selection: &str, is_focused_node_editable: bool) -> bool {
    validate_selection(selection, is_focused_node_editable).is_ok()
}
