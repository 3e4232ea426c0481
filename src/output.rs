//! CLI output formatting.
//!
//! Output is **item-centric**: each object is shown by its catalog identity
//! first, with the fields that would be sent indented beneath it. Objects that
//! would not reach the catalog get a single line saying why.
//!
//! # Output Format
//!
//! ## Scan / Inspect
//!
//! ```text
//! 001 2014/misool/DSC_1378.jpg
//!     Title: Carangues
//!     Description: Carangue vorace, Carangue balo (Carangoides gymn...
//!     Tags: misool, raja ampat
//!     Caption: carangues carangue vorace carangue balo carangoides...
//!     Caption tags: 9
//! 002 2014/misool/blank.jpg (no metadata)
//! 003 notes.txt (not an image)
//!
//! 3 files: 1 indexable, 1 without metadata, 1 not an image, 0 failed
//! ```
//!
//! ## Analyze
//!
//! ```text
//! Caption: " misool raja ampat "
//! Tags:
//!     misool
//!     raja
//!     ampat
//!     raja ampat
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::caption::Caption;
use crate::handler::Outcome;
use crate::scan::{Preview, ScanEntry};
use crate::types::ImageItem;

const PREVIEW_WIDTH: usize = 60;

// ============================================================================
// Shared helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// The indented field lines of an item. Empty fields are omitted.
fn item_lines(item: &ImageItem) -> Vec<String> {
    let mut lines = Vec::new();
    if !item.title.is_empty() {
        lines.push(format!("    Title: {}", truncate(&item.title, PREVIEW_WIDTH)));
    }
    if !item.description.is_empty() {
        lines.push(format!(
            "    Description: {}",
            truncate(&item.description, PREVIEW_WIDTH)
        ));
    }
    if let Some(tags) = &item.tags {
        lines.push(format!("    Tags: {}", tags.join(", ")));
    }
    match (&item.caption, &item.caption_tags) {
        (Some(caption), Some(tags)) => {
            lines.push(format!(
                "    Caption: {}",
                truncate(caption.trim(), PREVIEW_WIDTH)
            ));
            lines.push(format!("    Caption tags: {}", tags.len()));
        }
        _ => lines.push("    Caption: none".to_string()),
    }
    lines
}

// ============================================================================
// Scan / Inspect
// ============================================================================

/// Format the dry-run preview of a list of files.
pub fn format_scan_output(entries: &[ScanEntry]) -> Vec<String> {
    let mut lines = Vec::new();
    let (mut items, mut no_metadata, mut not_image, mut failed) = (0, 0, 0, 0);

    for (i, entry) in entries.iter().enumerate() {
        let header = format!("{} {}", format_index(i + 1), entry.key);
        match &entry.preview {
            Preview::Item(item) => {
                items += 1;
                lines.push(header);
                lines.extend(item_lines(item));
            }
            Preview::NoMetadata => {
                no_metadata += 1;
                lines.push(format!("{header} (no metadata)"));
            }
            Preview::NotImage => {
                not_image += 1;
                lines.push(format!("{header} (not an image)"));
            }
            Preview::Failed(error) => {
                failed += 1;
                lines.push(format!("{header} (failed)"));
                lines.push(format!("    Error: {error}"));
            }
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "{} files: {} indexable, {} without metadata, {} not an image, {} failed",
        entries.len(),
        items,
        no_metadata,
        not_image,
        failed
    ));
    lines
}

pub fn print_scan_output(entries: &[ScanEntry]) {
    for line in format_scan_output(entries) {
        println!("{}", line);
    }
}

/// The full JSON body that would be POSTed for an item.
pub fn format_item_json(item: &ImageItem) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(item)
}

// ============================================================================
// Analyze
// ============================================================================

pub fn format_analysis(analysis: Option<&Caption>) -> Vec<String> {
    let Some(analysis) = analysis else {
        return vec!["Caption: none".to_string(), "Tags: none".to_string()];
    };
    let mut lines = vec![format!("Caption: {:?}", analysis.caption), "Tags:".to_string()];
    lines.extend(analysis.tags.iter().map(|tag| format!("    {tag}")));
    lines
}

pub fn print_analysis(analysis: Option<&Caption>) {
    for line in format_analysis(analysis) {
        println!("{}", line);
    }
}

// ============================================================================
// Single events
// ============================================================================

pub fn format_outcome(key: &str, outcome: Outcome) -> String {
    match outcome {
        Outcome::Skipped => format!("{key}: skipped (not an image)"),
        Outcome::Indexed => format!("{key}: indexed"),
        Outcome::Removed => format!("{key}: removed"),
        Outcome::Failed(stage) => format!("{key}: failed at {stage}"),
    }
}
