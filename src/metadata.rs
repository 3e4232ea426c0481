//! Metadata extraction contract and field defaulting.
//!
//! The extractor is a collaborator: it turns downloaded bytes into whatever
//! [`EmbeddedMetadata`] the file carries, or nothing. The handler then needs
//! concrete values to build an [`ImageItem`](crate::types::ImageItem), and the
//! catalog distinguishes two kinds of "missing":
//!
//! | Field | Missing becomes | Why it matters downstream |
//! |---|---|---|
//! | title | `""` | always a string in the catalog |
//! | description | `""` | always a string in the catalog |
//! | subject tags | `None` (`null` on the wire) | "no tags recorded" is not "tagged with nothing" |
//!
//! An explicitly empty subject list (`<rdf:Bag/>`) stays `Some(vec![])`.

use crate::extract::{EmbeddedMetadata, ExtractError};

/// Parses embedded metadata out of raw image bytes.
///
/// `Ok(None)` means the file carries no metadata block at all. The handler
/// treats that exactly like an error: log and stop.
pub trait MetadataExtractor: Send + Sync {
    fn parse(&self, bytes: &[u8]) -> Result<Option<EmbeddedMetadata>, ExtractError>;
}

/// Title, description and subject tags with the catalog's defaults applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMetadata {
    pub title: String,
    pub description: String,
    pub subject_tags: Option<Vec<String>>,
}

impl From<EmbeddedMetadata> for RawMetadata {
    fn from(meta: EmbeddedMetadata) -> Self {
        Self {
            title: meta.title.unwrap_or_default(),
            description: meta.description.unwrap_or_default(),
            subject_tags: meta.subject,
        }
    }
}

impl RawMetadata {
    /// The free-text fields fed to the caption analyzer, title first.
    pub fn caption_sources(&self) -> [Option<&str>; 2] {
        [Some(self.title.as_str()), Some(self.description.as_str())]
    }
}
