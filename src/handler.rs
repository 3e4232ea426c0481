//! Event handlers: one invocation per storage notification.
//!
//! ```text
//! finalized:  content type → download → extract → analyze → POST item
//! deleted:    object key → DELETE {name, path}
//! ```
//!
//! Steps run strictly in sequence. The first failing step ends the
//! invocation: it is logged with the object key and the error, and nothing
//! after it runs. Nothing is retried and handlers never return an error; the
//! [`Outcome`] only tells the caller how far the invocation got.
//!
//! [`Indexer`] holds no mutable state, so one instance can serve any number
//! of concurrent invocations.

use crate::caption;
use crate::catalog::Catalog;
use crate::event::ImageEvent;
use crate::metadata::{MetadataExtractor, RawMetadata};
use crate::storage::ObjectStore;
use crate::types::{DeleteRequest, ImageItem};
use std::fmt;
use tracing::{error, info, warn};

/// The step at which an invocation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Download,
    Extract,
    Catalog,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Download => write!(f, "download"),
            Self::Extract => write!(f, "extract"),
            Self::Catalog => write!(f, "catalog"),
        }
    }
}

/// How an invocation ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Not an image; nothing was done.
    Skipped,
    /// The item was accepted by the catalog.
    Indexed,
    /// The catalog entry was removed.
    Removed,
    /// Stopped at the given step; the failure has been logged.
    Failed(Stage),
}

impl Outcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}

/// Wires the three collaborators together.
pub struct Indexer<S, M, C> {
    store: S,
    extractor: M,
    catalog: C,
}

impl<S, M, C> Indexer<S, M, C>
where
    S: ObjectStore,
    M: MetadataExtractor,
    C: Catalog,
{
    pub fn new(store: S, extractor: M, catalog: C) -> Self {
        Self {
            store,
            extractor,
            catalog,
        }
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Index a newly written object.
    pub async fn on_object_finalized(&self, event: &ImageEvent) -> Outcome {
        let key = event.object_key.as_str();

        if !event.is_image() {
            info!(
                key,
                content_type = event.content_type.as_deref().unwrap_or(""),
                "{key} is not an image."
            );
            return Outcome::Skipped;
        }

        let bytes = match self.store.fetch(&event.bucket, key).await {
            Ok(bytes) => bytes,
            Err(e) => {
                error!(key, bucket = %event.bucket, error = %e, "Failed to download image {key}.");
                return Outcome::Failed(Stage::Download);
            }
        };

        let embedded = match self.extractor.parse(&bytes) {
            Ok(Some(embedded)) => embedded,
            Ok(None) => {
                error!(key, "Embedded metadata for {key} is undefined.");
                return Outcome::Failed(Stage::Extract);
            }
            Err(e) => {
                error!(key, error = %e, "Failed to extract metadata from {key}.");
                return Outcome::Failed(Stage::Extract);
            }
        };

        let item = build_item(event, RawMetadata::from(embedded));
        info!(
            key,
            title = %item.title,
            caption = item.caption.as_deref().unwrap_or(""),
            caption_tags = item.caption_tags.as_ref().map_or(0, Vec::len),
            "Built image details for {key}."
        );

        match self.catalog.insert(&item).await {
            Ok(()) => {
                info!(key, "{key} has been inserted.");
                Outcome::Indexed
            }
            Err(e) => {
                error!(key, error = %e, "Failed to insert new image {key}.");
                Outcome::Failed(Stage::Catalog)
            }
        }
    }

    /// Remove the catalog entry of a deleted object.
    pub async fn on_object_deleted(&self, event: &ImageEvent) -> Outcome {
        let key = event.object_key.as_str();
        let request = DeleteRequest::from(event.object_path());
        if request.name.is_empty() {
            warn!(key, "Deleting an object key without a file name.");
        }

        match self.catalog.delete(&request).await {
            Ok(()) => {
                info!(key, "{key} has been removed.");
                Outcome::Removed
            }
            Err(e) => {
                error!(key, error = %e, "Failed to delete image {key}.");
                Outcome::Failed(Stage::Catalog)
            }
        }
    }

    /// Dispatch on the event kind.
    pub async fn handle(&self, event: &ImageEvent) -> Outcome {
        match event.kind {
            crate::event::EventKind::Finalized => self.on_object_finalized(event).await,
            crate::event::EventKind::Deleted => self.on_object_deleted(event).await,
        }
    }
}

/// Assemble the catalog item for an object from its metadata.
pub fn build_item(event: &ImageEvent, metadata: RawMetadata) -> ImageItem {
    let analysis = caption::analyze(&metadata.caption_sources());
    ImageItem::new(event.object_path(), metadata, analysis)
}
