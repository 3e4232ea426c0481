//! Shared test utilities for the indexer test suite.
//!
//! Two kinds of helpers:
//!
//! - **Byte builders** that produce minimal but well-formed files carrying
//!   embedded metadata (`jpeg_with_xmp`, `jpeg_with_iptc`, `tiff_with_iptc`).
//!   They contain no pixel data; the extractor never decodes pixels.
//! - **In-memory collaborators** for handler and server tests: a store backed
//!   by a map, a store that always fails, and a catalog that records calls.
//!
//! # Usage
//!
//! ```rust,ignore
//! use crate::test_helpers::*;
//!
//! let packet = xmp_packet(Some("Mola mola"), None, Some(&["bali"][..]));
//! let store = MemoryStore::default().with_object("photos", "2019/mola.jpg", jpeg_with_xmp(&packet));
//! let indexer = Indexer::new(store, EmbeddedExtractor, RecordingCatalog::default());
//! ```

use crate::catalog::{Catalog, CatalogError};
use crate::storage::{ObjectStore, StorageError};
use crate::types::{DeleteRequest, ImageItem};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::Mutex;

// =========================================================================
// XMP
// =========================================================================

fn escape_xml(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// An XMP packet with the given Dublin Core properties. `None` omits the
/// property entirely.
pub fn xmp_packet(
    title: Option<&str>,
    description: Option<&str>,
    subject: Option<&[&str]>,
) -> String {
    let mut body = String::new();
    if let Some(title) = title {
        body.push_str(&format!(
            "<dc:title><rdf:Alt><rdf:li xml:lang=\"x-default\">{}</rdf:li></rdf:Alt></dc:title>\n",
            escape_xml(title)
        ));
    }
    if let Some(description) = description {
        body.push_str(&format!(
            "<dc:description><rdf:Alt><rdf:li xml:lang=\"x-default\">{}</rdf:li></rdf:Alt></dc:description>\n",
            escape_xml(description)
        ));
    }
    if let Some(subject) = subject {
        body.push_str("<dc:subject><rdf:Bag>");
        for tag in subject {
            body.push_str(&format!("<rdf:li>{}</rdf:li>", escape_xml(tag)));
        }
        body.push_str("</rdf:Bag></dc:subject>\n");
    }

    format!(
        "<x:xmpmeta xmlns:x=\"adobe:ns:meta/\">\n\
         <rdf:RDF xmlns:rdf=\"http://www.w3.org/1999/02/22-rdf-syntax-ns#\">\n\
         <rdf:Description rdf:about=\"\" xmlns:dc=\"http://purl.org/dc/elements/1.1/\">\n\
         {body}\
         </rdf:Description>\n\
         </rdf:RDF>\n\
         </x:xmpmeta>"
    )
}

/// A JPEG made of SOI, one APP1 segment holding `packet`, and EOI.
pub fn jpeg_with_xmp(packet: &str) -> Vec<u8> {
    let mut payload = b"http://ns.adobe.com/xap/1.0/\0".to_vec();
    payload.extend_from_slice(packet.as_bytes());

    let mut jpeg = vec![0xFF, 0xD8];
    push_segment(&mut jpeg, 0xE1, &payload);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

// =========================================================================
// IPTC-IIM
// =========================================================================

/// One Record 2 dataset: `0x1C 0x02 dataset len(u16 BE) value`.
pub fn iim_dataset(dataset: u8, value: &str) -> Vec<u8> {
    let len = u16::try_from(value.len()).unwrap();
    let mut out = vec![0x1C, 0x02, dataset];
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    out
}

fn iim_record(datasets: &[(u8, &str)]) -> Vec<u8> {
    datasets
        .iter()
        .flat_map(|(dataset, value)| iim_dataset(*dataset, value))
        .collect()
}

fn push_segment(out: &mut Vec<u8>, marker: u8, payload: &[u8]) {
    let len = u16::try_from(payload.len() + 2).unwrap();
    out.extend_from_slice(&[0xFF, marker]);
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(payload);
}

/// A JPEG whose APP13 segment carries the datasets in an 8BIM 0x0404 resource.
pub fn jpeg_with_iptc(datasets: &[(u8, &str)]) -> Vec<u8> {
    let record = iim_record(datasets);

    let mut payload = b"Photoshop 3.0\0".to_vec();
    payload.extend_from_slice(b"8BIM");
    payload.extend_from_slice(&0x0404u16.to_be_bytes());
    // Empty Pascal name, padded to even length
    payload.extend_from_slice(&[0x00, 0x00]);
    payload.extend_from_slice(&(record.len() as u32).to_be_bytes());
    payload.extend_from_slice(&record);
    if record.len() % 2 == 1 {
        payload.push(0);
    }

    let mut jpeg = vec![0xFF, 0xD8];
    push_segment(&mut jpeg, 0xED, &payload);
    // Empty scan
    jpeg.extend_from_slice(&[0xFF, 0xDA, 0x00, 0x02]);
    jpeg.extend_from_slice(&[0xFF, 0xD9]);
    jpeg
}

/// A TIFF with a single IFD whose only entry is tag 33723 (IPTC-NAA).
pub fn tiff_with_iptc(datasets: &[(u8, &str)], big_endian: bool) -> Vec<u8> {
    let record = iim_record(datasets);
    let u16_bytes = |v: u16| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };
    let u32_bytes = |v: u32| {
        if big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        }
    };

    // header (8) + entry count (2) + one entry (12) + next IFD (4)
    let value_offset = 8 + 2 + 12 + 4;

    let mut tiff = if big_endian {
        b"MM\0*".to_vec()
    } else {
        b"II*\0".to_vec()
    };
    tiff.extend_from_slice(&u32_bytes(8));
    tiff.extend_from_slice(&u16_bytes(1));
    tiff.extend_from_slice(&u16_bytes(33723));
    // UNDEFINED
    tiff.extend_from_slice(&u16_bytes(7));
    tiff.extend_from_slice(&u32_bytes(record.len() as u32));
    tiff.extend_from_slice(&u32_bytes(value_offset));
    tiff.extend_from_slice(&u32_bytes(0));
    tiff.extend_from_slice(&record);
    tiff
}

// =========================================================================
// Collaborators
// =========================================================================

/// Objects held in memory, keyed by `(bucket, key)`.
#[derive(Default)]
pub struct MemoryStore {
    objects: HashMap<(String, String), Vec<u8>>,
}

impl MemoryStore {
    pub fn with_object(mut self, bucket: &str, key: &str, bytes: Vec<u8>) -> Self {
        self.objects
            .insert((bucket.to_string(), key.to_string()), bytes);
        self
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn fetch(&self, bucket: &str, key: &str) -> Result<Vec<u8>, StorageError> {
        self.objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound {
                bucket: bucket.to_string(),
                key: key.to_string(),
            })
    }
}

/// A store whose every download fails.
pub struct FailingStore;

#[async_trait]
impl ObjectStore for FailingStore {
    async fn fetch(&self, _bucket: &str, _key: &str) -> Result<Vec<u8>, StorageError> {
        Err(StorageError::UnexpectedStatus {
            status: StatusCode::SERVICE_UNAVAILABLE,
            text: "storage unavailable".into(),
        })
    }
}

/// Records every catalog call; optionally rejects them all.
#[derive(Default)]
pub struct RecordingCatalog {
    fail: bool,
    inserted: Mutex<Vec<ImageItem>>,
    deleted: Mutex<Vec<DeleteRequest>>,
}

impl RecordingCatalog {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn inserted(&self) -> Vec<ImageItem> {
        self.inserted.lock().unwrap().clone()
    }

    pub fn deleted(&self) -> Vec<DeleteRequest> {
        self.deleted.lock().unwrap().clone()
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.fail {
            return Err(CatalogError::UnexpectedStatus {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                text: "catalog unavailable".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl Catalog for RecordingCatalog {
    async fn insert(&self, item: &ImageItem) -> Result<(), CatalogError> {
        self.inserted.lock().unwrap().push(item.clone());
        self.check()
    }

    async fn delete(&self, request: &DeleteRequest) -> Result<(), CatalogError> {
        self.deleted.lock().unwrap().push(request.clone());
        self.check()
    }
}
