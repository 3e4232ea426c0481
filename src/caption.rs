//! Caption and tag derivation from free-text metadata.
//!
//! Photographers describe a shot in one line, usually listing what is in the
//! frame with common names followed by the scientific name in parentheses:
//!
//! ```text
//! Carangue vorace, Carangue à gros yeux (Caranx sexfasciatus), Carangue balo (Carangoides gymnostethus)
//! ```
//!
//! Two grammars run over each text:
//!
//! | Grammar | Delimiters | Keeps | Example output |
//! |---|---|---|---|
//! | single terms | space `(` `)` `,` `'` | segments of 3+ chars | `carangue`, `vorace`, `gros`, … |
//! | composite terms | `(` `)` `,` | every non-empty segment | `carangue à gros yeux`, … |
//!
//! Both lowercase their output. The composite terms, in order and with
//! duplicates, become the caption; the union of both, deduplicated, becomes the
//! tag list. The caption is padded with one space on each side so the catalog
//! can match whole terms with a plain substring search (`" balo "`).
//!
//! Everything here is pure and synchronous, safe to call from any task.

use std::collections::HashSet;

const SINGLE_TERM_DELIMITERS: [char; 5] = [' ', '(', ')', ',', '\''];
const COMPOSITE_TERM_DELIMITERS: [char; 3] = [',', '(', ')'];

/// Shortest single term kept, counted in characters.
pub const MIN_SINGLE_TERM_LEN: usize = 3;

/// Searchable caption and tags derived from an image's title and description.
///
/// Only produced when both grammars found something, so a `Caption` always
/// carries a non-empty caption and a non-empty tag list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Composite terms joined by spaces, padded with a space on both ends.
    pub caption: String,
    /// Single and composite terms, first occurrence wins.
    pub tags: Vec<String>,
}

/// Individual words of at least [`MIN_SINGLE_TERM_LEN`] characters, lowercased.
///
/// ```
/// use photosub_indexer::caption::single_terms;
///
/// let terms: Vec<String> = single_terms("Carangue à gros yeux").collect();
/// assert_eq!(terms, ["carangue", "gros", "yeux"]);
/// ```
pub fn single_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(SINGLE_TERM_DELIMITERS)
        .map(str::trim)
        .filter(|segment| segment.chars().count() >= MIN_SINGLE_TERM_LEN)
        .map(str::to_lowercase)
}

/// Comma and parenthesis separated phrases, trimmed and lowercased.
///
/// A whitespace-only segment still counts and yields `""`.
///
/// ```
/// use photosub_indexer::caption::composite_terms;
///
/// let terms: Vec<String> = composite_terms("Carangue balo (Carangoides gymnostethus)").collect();
/// assert_eq!(terms, ["carangue balo", "carangoides gymnostethus"]);
/// ```
pub fn composite_terms(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(COMPOSITE_TERM_DELIMITERS)
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.trim().to_lowercase())
}

/// Derive the caption and tags from texts taken in order (title, then description).
///
/// `None` and empty texts are skipped. Returns `None` unless both grammars
/// produced at least one term across all texts.
pub fn analyze(texts: &[Option<&str>]) -> Option<Caption> {
    let mut single = Vec::new();
    let mut composed = Vec::new();

    for text in texts.iter().flatten().filter(|t| !t.is_empty()) {
        single.extend(single_terms(text));
        composed.extend(composite_terms(text));
    }

    if single.is_empty() || composed.is_empty() {
        return None;
    }

    let caption = format!(" {} ", composed.join(" "));
    let tags = dedup_in_order(single.into_iter().chain(composed));

    Some(Caption { caption, tags })
}

fn dedup_in_order(terms: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    terms.filter(|term| seen.insert(term.clone())).collect()
}
