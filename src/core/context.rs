//! Per-gesture search context
//!
//! Holds the surrounding text of one search attempt, the tapped-word
//! analysis and language detection used to decide and resolve the search.

pub mod detection;
pub mod search_context;
pub mod word_scan;

pub use detection::detect_language;
pub use search_context::{ResolveProperties, SearchContext};
pub use word_scan::{analyze_tap, find_word_end, find_word_start, is_word_break, TappedWord};
