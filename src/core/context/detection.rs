use unicode_segmentation::UnicodeSegmentation;

/// Common function words for Latin-script languages we can tell apart cheaply.
const STOP_WORDS: &[(&str, &[&str])] = &[
    ("en", &["the", "and", "of", "to", "is", "in", "that", "with", "for", "it"]),
    ("es", &["el", "la", "de", "que", "y", "en", "los", "las", "por", "una"]),
    ("fr", &["le", "la", "les", "des", "et", "est", "une", "dans", "que", "pour"]),
    ("de", &["der", "die", "und", "das", "ist", "nicht", "mit", "ein", "eine", "zu"]),
    ("it", &["il", "che", "di", "della", "per", "una", "sono", "non", "gli", "nel"]),
    ("pt", &["o", "que", "de", "não", "uma", "os", "com", "para", "do", "da"]),
];

/// Longest prefix of the surrounding text that is inspected.
const MAX_INPUT_CHARS: usize = 1000;

/// Detect the language of `text` as an ISO 639-1 code.
///
/// Non-Latin scripts are recognised by code point ranges. Latin text is scored
/// against short stop-word lists and needs at least two hits to be trusted.
pub fn detect_language(text: &str) -> Option<&'static str> {
    let text: String = text.chars().take(MAX_INPUT_CHARS).collect();

    let has_japanese = text.chars().any(|c| {
        ('\u{3040}'..='\u{309F}').contains(&c) || // Hiragana
        ('\u{30A0}'..='\u{30FF}').contains(&c)    // Katakana
    });
    let has_chinese = text.chars().any(|c| {
        ('\u{4E00}'..='\u{9FFF}').contains(&c) || // CJK Unified Ideographs
        ('\u{3400}'..='\u{4DBF}').contains(&c)    // CJK Extension A
    });
    let has_korean = text.chars().any(|c| ('\u{AC00}'..='\u{D7AF}').contains(&c));
    let has_arabic = text.chars().any(|c| {
        ('\u{0600}'..='\u{06FF}').contains(&c) || ('\u{0750}'..='\u{077F}').contains(&c)
    });
    let has_cyrillic = text.chars().any(|c| ('\u{0400}'..='\u{04FF}').contains(&c));

    if has_japanese {
        return Some("ja");
    }
    if has_chinese {
        return Some("zh");
    }
    if has_korean {
        return Some("ko");
    }
    if has_arabic {
        return Some("ar");
    }
    if has_cyrillic {
        return Some("ru");
    }

    detect_latin_language(&text)
}

fn detect_latin_language(text: &str) -> Option<&'static str> {
    let words: Vec<String> = text.unicode_words().map(|w| w.to_lowercase()).collect();
    if words.is_empty() {
        return None;
    }

    let (best, score) = STOP_WORDS
        .iter()
        .map(|(code, stops)| {
            let hits = words.iter().filter(|w| stops.contains(&w.as_str())).count();
            (*code, hits)
        })
        .max_by_key(|(_, hits)| *hits)?;

    (score >= 2).then_some(best)
}
