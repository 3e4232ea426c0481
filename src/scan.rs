//! Local dry runs over image files.
//!
//! Backfilling a catalog means replaying every object already in the bucket.
//! A mirror of the bucket on disk can be previewed first: each file goes
//! through the same decisions the finalize handler makes, minus the download
//! and the catalog call.
//!
//! ```text
//! photos/                       key
//! ├── 2014/misool/DSC_1378.jpg  2014/misool/DSC_1378.jpg
//! ├── 2019/mola.tif             2019/mola.tif
//! └── notes.txt                 notes.txt (not an image)
//! ```
//!
//! Files are read from disk, so there is no declared content type. It is
//! sniffed from the magic bytes instead. Hidden files and directories are
//! skipped.

use crate::event::{EventKind, ImageEvent};
use crate::handler::build_item;
use crate::metadata::{MetadataExtractor, RawMetadata};
use crate::types::ImageItem;
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// What the finalize handler would do with a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Preview {
    /// Would be sent to the catalog.
    Item(ImageItem),
    /// Would be skipped as not an image.
    NotImage,
    /// Would stop at extraction: no metadata block.
    NoMetadata,
    /// Would stop at extraction with this error.
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanEntry {
    pub key: String,
    pub preview: Preview,
}

/// Sniff a MIME type from the magic bytes.
pub fn sniff_content_type(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|f| f.to_mime_type())
}

/// Preview one object given its key and content.
pub fn preview_bytes(key: &str, bytes: &[u8], extractor: &impl MetadataExtractor) -> Preview {
    let event = ImageEvent {
        bucket: String::new(),
        object_key: key.to_string(),
        content_type: sniff_content_type(bytes).map(String::from),
        kind: EventKind::Finalized,
    };
    if !event.is_image() {
        return Preview::NotImage;
    }
    match extractor.parse(bytes) {
        Ok(Some(embedded)) => Preview::Item(build_item(&event, RawMetadata::from(embedded))),
        Ok(None) => Preview::NoMetadata,
        Err(e) => Preview::Failed(e.to_string()),
    }
}

/// Preview a single file. Its key is `path` with `/` separators.
pub fn inspect(path: &Path, extractor: &impl MetadataExtractor) -> Result<ScanEntry, ScanError> {
    let bytes = fs::read(path)?;
    let key = object_key(path);
    let preview = preview_bytes(&key, &bytes, extractor);
    Ok(ScanEntry { key, preview })
}

/// Preview every file under `root`, keyed relative to `root`, in name order.
pub fn scan(root: &Path, extractor: &impl MetadataExtractor) -> Result<Vec<ScanEntry>, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::NotADirectory(root.to_path_buf()));
    }

    let mut entries = Vec::new();
    let walker = WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e));

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "Skipping inaccessible entry.");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let key = object_key(relative);
        let bytes = fs::read(entry.path())?;
        let preview = preview_bytes(&key, &bytes, extractor);
        entries.push(ScanEntry { key, preview });
    }
    Ok(entries)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

/// Object keys always use `/`, whatever the platform separator, and never
/// start with one.
fn object_key(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
