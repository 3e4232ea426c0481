//! Storage lifecycle events.
//!
//! The storage service notifies on two object transitions. Depending on the
//! delivery channel the event type has one of two spellings:
//!
//! | Kind | Background-function type | CloudEvents type |
//! |---|---|---|
//! | Finalized | `google.storage.object.finalize` | `google.cloud.storage.object.v1.finalized` |
//! | Deleted | `google.storage.object.delete` | `google.cloud.storage.object.v1.deleted` |
//!
//! The payload is the object resource; only `name`, `bucket` and
//! `contentType` are read, everything else is ignored.

use crate::naming::{ObjectPath, parse_object_key};
use serde::Deserialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum EventError {
    #[error("Unknown storage event type: {0}")]
    UnknownEventType(String),
    #[error("Missing storage event type")]
    MissingEventType,
}

/// Which lifecycle transition triggered the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    Finalized,
    Deleted,
}

impl FromStr for EventKind {
    type Err = EventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "google.storage.object.finalize" | "google.cloud.storage.object.v1.finalized" => {
                Ok(Self::Finalized)
            }
            "google.storage.object.delete" | "google.cloud.storage.object.v1.deleted" => {
                Ok(Self::Deleted)
            }
            other => Err(EventError::UnknownEventType(other.to_string())),
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Finalized => write!(f, "finalized"),
            Self::Deleted => write!(f, "deleted"),
        }
    }
}

/// The object resource delivered with a notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageObject {
    pub name: String,
    pub bucket: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// One storage notification, ready for a handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageEvent {
    pub bucket: String,
    /// Full `/`-separated object key, e.g. `2014/misool/DSC_1378.jpg`
    pub object_key: String,
    /// Declared content type; notifications for some objects omit it
    pub content_type: Option<String>,
    pub kind: EventKind,
}

impl ImageEvent {
    pub fn new(object: StorageObject, kind: EventKind) -> Self {
        Self {
            bucket: object.bucket,
            object_key: object.name,
            content_type: object.content_type,
            kind,
        }
    }

    /// Build an event from an event type string and the object payload.
    pub fn from_notification(event_type: &str, object: StorageObject) -> Result<Self, EventError> {
        Ok(Self::new(object, event_type.parse()?))
    }

    /// Whether the declared content type is `image/*`.
    pub fn is_image(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|t| t.starts_with("image/"))
    }

    /// Catalog identity derived from the object key.
    pub fn object_path(&self) -> ObjectPath {
        parse_object_key(&self.object_key)
    }
}
