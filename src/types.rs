//! Records sent to the catalog API.
//!
//! Field names are camelCase on the wire and every optional field is written
//! as an explicit `null` when absent; the catalog treats a missing key and a
//! `null` differently.

use crate::caption::Caption;
use crate::metadata::RawMetadata;
use crate::naming::ObjectPath;
use serde::{Deserialize, Serialize};

/// One stored image as the catalog indexes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageItem {
    /// File name, e.g. `DSC_1378.jpg`
    pub name: String,
    /// Directory part of the object key, e.g. `2014/misool`
    pub path: String,
    pub title: String,
    pub description: String,
    /// Subject tags as written in the file, unrelated to `caption_tags`
    pub tags: Option<Vec<String>>,
    /// Space-padded composite terms for substring search
    pub caption: Option<String>,
    pub caption_tags: Option<Vec<String>>,
}

impl ImageItem {
    pub fn new(object: ObjectPath, metadata: RawMetadata, caption: Option<Caption>) -> Self {
        let (caption, caption_tags) = match caption {
            Some(c) => (Some(c.caption), Some(c.tags)),
            None => (None, None),
        };
        Self {
            name: object.name,
            path: object.path,
            title: metadata.title,
            description: metadata.description,
            tags: metadata.subject_tags,
            caption,
            caption_tags,
        }
    }
}

/// Identifies the catalog entry to remove.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub name: String,
    pub path: String,
}

impl From<ObjectPath> for DeleteRequest {
    fn from(object: ObjectPath) -> Self {
        Self {
            name: object.name,
            path: object.path,
        }
    }
}
