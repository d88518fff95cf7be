//! Word-boundary scanning over surrounding text
//!
//! Offsets are indices into a slice of `char`s (Unicode scalar values).

use serde::Serialize;

/// Soft hyphens sit inside words and never break them.
pub const SOFT_HYPHEN: char = '\u{00AD}';

pub fn is_word_break(c: char) -> bool {
    !c.is_alphanumeric() && c != SOFT_HYPHEN
}

/// Start of the word containing `offset`: one past the nearest break before it.
///
/// Returns `None` when the scan reaches the start of the text without seeing an
/// explicit break, since the word may continue outside the captured window.
pub fn find_word_start(chars: &[char], offset: usize) -> Option<usize> {
    let limit = offset.min(chars.len());
    (0..limit)
        .rev()
        .find(|&i| is_word_break(chars[i]))
        .map(|i| i + 1)
}

/// End (exclusive) of the word containing `offset`. The end of the text counts
/// as a boundary.
pub fn find_word_end(chars: &[char], offset: usize) -> Option<usize> {
    if offset > chars.len() {
        return None;
    }
    Some(
        (offset..chars.len())
            .find(|&i| is_word_break(chars[i]))
            .unwrap_or(chars.len()),
    )
}

/// A word located by [`analyze_tap`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TappedWord {
    pub word: String,
    pub start: usize,
    /// Position of the tap relative to `start`.
    pub offset_within_word: usize,
    pub previous_word: Option<String>,
    pub following_word: Option<String>,
}

/// Finds the word under a tap at `tap_offset`, if the tap landed inside one.
pub fn analyze_tap(chars: &[char], tap_offset: usize) -> Option<TappedWord> {
    let start = find_word_start(chars, tap_offset)?;
    let end = find_word_end(chars, tap_offset)?;
    if end <= start {
        return None;
    }

    Some(TappedWord {
        word: chars[start..end].iter().collect(),
        start,
        offset_within_word: tap_offset - start,
        previous_word: word_before(chars, start),
        following_word: word_after(chars, end),
    })
}

fn word_before(chars: &[char], word_start: usize) -> Option<String> {
    let mut end = word_start;
    while end > 0 && is_word_break(chars[end - 1]) {
        end -= 1;
    }
    if end == 0 || end == word_start {
        return None;
    }
    let start = find_word_start(chars, end - 1)?;
    Some(chars[start..end].iter().collect())
}

fn word_after(chars: &[char], word_end: usize) -> Option<String> {
    let mut start = word_end;
    while start < chars.len() && is_word_break(chars[start]) {
        start += 1;
    }
    if start >= chars.len() || start == word_end {
        return None;
    }
    let end = find_word_end(chars, start)?;
    Some(chars[start..end].iter().collect())
}
