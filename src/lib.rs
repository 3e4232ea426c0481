//! # photosub-indexer
//!
//! Keeps a photo catalog in sync with a storage bucket. Every time an image is
//! written to the bucket its embedded title, description and keywords are read
//! and a searchable catalog entry is created; every time an object is deleted
//! its entry is removed.
//!
//! # Architecture: One Invocation per Event
//!
//! ```text
//! storage notification
//!   └─ event      decode {name, bucket, contentType} + event type
//!       └─ handler
//!           finalized: is image? → storage → extract → caption → catalog POST
//!           deleted:   naming → catalog DELETE
//! ```
//!
//! Invocations are independent. Each runs its steps strictly in order and
//! stops at the first failure, which is logged and never retried.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`caption`] | Pure text analyzer: composite and single search terms from title and description |
//! | [`extract`] | XMP packet scanner with an IPTC-IIM fallback for JPEG and TIFF |
//! | [`metadata`] | Extractor contract and the catalog's field defaults |
//! | [`naming`] | Object key → `(name, path)` catalog identity |
//! | [`types`] | Records sent to the catalog (`ImageItem`, `DeleteRequest`) |
//! | [`event`] | Storage notification decoding |
//! | [`storage`] | Object download: storage JSON API or local directory |
//! | [`catalog`] | Catalog API client |
//! | [`handler`] | The two event handlers and their outcomes |
//! | [`server`] | axum receiver for push-delivered events |
//! | [`scan`] | Dry-run previews of local files |
//! | [`config`] | Layered TOML + environment configuration |
//! | [`logging`] | tracing subscriber setup |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Collaborators Behind Traits
//!
//! Download ([`storage::ObjectStore`]), extraction
//! ([`metadata::MetadataExtractor`]) and the catalog ([`catalog::Catalog`]) are
//! traits. The handler is generic over all three, so tests swap in in-memory
//! fakes and local runs swap the bucket for a directory.
//!
//! ## Metadata Without an Image Decoder
//!
//! XMP is stored uncompressed in every container that carries it, so it is
//! found by searching the raw bytes. The IPTC fallback walks only JPEG
//! segments and TIFF IFDs. Pixels are never decoded.
//!
//! ## Failures Are Terminal
//!
//! A handler returns an [`handler::Outcome`], never an error. The HTTP receiver
//! acknowledges every well-formed event, failed or not, so the push
//! subscription does not redeliver it.

pub mod caption;
pub mod catalog;
pub mod config;
pub mod event;
pub mod extract;
pub mod handler;
pub mod logging;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod scan;
pub mod server;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
